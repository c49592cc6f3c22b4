// Copyright 2026 Listharvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Listharvest runtime — drives list pages to a stable state in a browser and
//! extracts their entries.
//!
//! The stability rules, normalization and storage live in `listharvest-core`;
//! this crate supplies the page engines, the acquisition loop, the extraction
//! sources, site presets and the `listharvest` binary's commands.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod extraction;
pub mod logging;
pub mod profiles;
pub mod progress;
pub mod renderer;
pub mod session;
pub mod wait;
