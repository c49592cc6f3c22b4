// Copyright 2026 Listharvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for live harvesting telemetry.
//!
//! The driver and session runner emit `ProgressEvent`s, which flow through a
//! `tokio::sync::broadcast` channel to all subscribers (the CLI spinner,
//! tests). When no subscriber exists, events are silently dropped.

use listharvest_core::TerminationReason;
use serde::{Deserialize, Serialize};

/// A progress event emitted during a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The session this event belongs to.
    pub session_id: String,
    /// Monotonically increasing sequence number within the session.
    pub seq: u64,
    /// The kind of progress event.
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// Navigation is about to start.
    SessionStarted { username: String, url: String },
    /// A step counted the items in the target section.
    StepObserved { step: u32, count: usize },
    /// The target section has not rendered yet.
    SectionMissing { step: u32 },
    /// The load-more control could not be used this step.
    LoadMoreFailed { step: u32, message: String },
    /// The count did not change; waiting longer before deciding.
    ConfirmRequested { step: u32, count: usize },
    /// The acquisition loop terminated.
    AcquisitionFinished {
        reason: TerminationReason,
        final_count: usize,
        steps: u32,
        elapsed_ms: u64,
    },
    /// Extraction produced its result.
    ExtractionFinished { records: usize, dropped: usize },
    /// A non-fatal warning occurred.
    Warning { message: String },
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}

/// Per-session emitter that stamps events with the session id and sequence.
#[derive(Debug, Clone)]
pub struct Reporter {
    tx: Option<ProgressSender>,
    session_id: String,
    seq: u64,
}

impl Reporter {
    pub fn new(tx: Option<ProgressSender>, session_id: impl Into<String>) -> Self {
        Self {
            tx,
            session_id: session_id.into(),
            seq: 0,
        }
    }

    /// A reporter that discards everything.
    pub fn silent() -> Self {
        Self::new(None, "")
    }

    /// Emit an event, ignoring send errors (no receivers listening).
    pub fn emit(&mut self, event: ProgressEventKind) {
        if let Some(ref sender) = self.tx {
            self.seq += 1;
            let _ = sender.send(ProgressEvent {
                session_id: self.session_id.clone(),
                seq: self.seq,
                event,
            });
        }
    }
}
