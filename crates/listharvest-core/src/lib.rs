// Copyright 2026 Listharvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Listharvest core — load-stability detection, entry normalization, payload
//! decoding and record storage for incrementally loaded list pages.
//!
//! Nothing in this crate touches a browser; see `listharvest-runtime` for the
//! page-driving side.

pub mod dates;
pub mod normalize;
pub mod oldest;
pub mod payload;
pub mod stability;
pub mod storage;
pub mod types;

pub use dates::{parse_list_date, resolve_two_digit_year};
pub use normalize::normalize;
pub use oldest::{merge_oldest, oldest_in, OldestMarker};
pub use payload::{decode_payload, PayloadFields};
pub use stability::{
    decide, decide_confirmation, AcquireOutcome, DriverState, LoadState, Observation,
    StabilityTracker, StabilityWindow, StepDecision, TerminationReason,
};
pub use storage::{persist, FileStore, MemoryStore, PersistSummary, RecordStore};
pub use types::*;
