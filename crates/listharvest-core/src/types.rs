//! Core data types for harvested list entries and their normalized form.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::normalize::normalize;

/// Marker stored in place of a missing alternate title.
///
/// Downstream consumers expect the field to always be populated, so an
/// absent or blank alternate title becomes this literal instead of `None`.
pub const NO_ALT_TITLE: &str = "null";

/// One item as read from the source document, before validation.
///
/// Every field may be missing or malformed; nothing is trimmed yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    pub title: Option<String>,
    pub alt_title: Option<String>,
    pub tags: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RawEntry {
    /// Entry with only a title, as produced by sparse DOM renders.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

/// A validated output record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Trimmed, never empty.
    pub title: String,
    /// Trimmed alternate title, or [`NO_ALT_TITLE`].
    pub alt_title: String,
    /// Trimmed tags in source order, without empties or repeats.
    pub tags: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl NormalizedRecord {
    /// Whether the source supplied a real alternate title.
    pub fn has_alt_title(&self) -> bool {
        self.alt_title != NO_ALT_TITLE
    }
}

/// The final record set for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub records: Vec<NormalizedRecord>,
    pub count: usize,
    /// Entries dropped for lacking a usable title.
    pub dropped: usize,
}

impl ExtractionResult {
    /// Normalize raw entries into a result, dropping invalid ones.
    pub fn from_raw<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = RawEntry>,
    {
        let mut records = Vec::new();
        let mut dropped = 0usize;
        for entry in entries {
            match normalize(&entry) {
                Some(record) => records.push(record),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "dropped entries without a title");
        }
        let count = records.len();
        Self {
            records,
            count,
            dropped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Titles in record order.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.title.as_str())
    }
}

/// Errors that can occur while harvesting a list.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("Section not found: no element matched `{selector}`")]
    SectionNotFound { selector: String },

    #[error("Payload decode error: {reason}")]
    PayloadDecode { reason: String },

    #[error("Session timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

impl HarvestError {
    pub fn payload(reason: impl Into<String>) -> Self {
        Self::PayloadDecode {
            reason: reason.into(),
        }
    }

    pub fn section_not_found(selector: impl Into<String>) -> Self {
        Self::SectionNotFound {
            selector: selector.into(),
        }
    }
}

/// Convenience result type.
pub type HarvestResult<T> = Result<T, HarvestError>;
