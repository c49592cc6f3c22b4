//! Canonicalize raw entries into validated records.
//!
//! The same rules apply no matter which source adapter produced the entry.

use crate::dates::parse_list_date;
use crate::types::{NormalizedRecord, RawEntry, NO_ALT_TITLE};

/// Normalize one raw entry. Returns `None` when the title is missing or blank.
pub fn normalize(entry: &RawEntry) -> Option<NormalizedRecord> {
    let title = entry.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return None;
    }

    let alt_title = match entry.alt_title.as_deref().map(str::trim) {
        Some(alt) if !alt.is_empty() => alt.to_string(),
        _ => NO_ALT_TITLE.to_string(),
    };

    Some(NormalizedRecord {
        title: title.to_string(),
        alt_title,
        tags: normalize_tags(&entry.tags),
        start_date: entry.start_date.as_deref().and_then(parse_list_date),
        end_date: entry.end_date.as_deref().and_then(parse_list_date),
    })
}

/// Trim tags, drop empties and repeats, keep first-seen order.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}
