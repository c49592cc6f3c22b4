//! Decode the serialized entry list some list pages embed in an attribute.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{HarvestError, HarvestResult, RawEntry};

/// Field names to read from each object of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadFields {
    pub title: String,
    pub alt_title: String,
    /// Either an array of `{ "name": .. }` objects, an array of strings, or a string.
    pub tags: String,
    pub start_date: String,
    pub end_date: String,
}

impl Default for PayloadFields {
    fn default() -> Self {
        Self {
            title: "anime_title".into(),
            alt_title: "anime_title_eng".into(),
            tags: "genres".into(),
            start_date: "anime_start_date_string".into(),
            end_date: "anime_end_date_string".into(),
        }
    }
}

/// Parse a payload into raw entries.
///
/// The payload must be a JSON array. Items that are not objects come back as
/// empty entries so normalization drops and counts them; anything else
/// malformed aborts with [`HarvestError::PayloadDecode`].
pub fn decode_payload(text: &str, fields: &PayloadFields) -> HarvestResult<Vec<RawEntry>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| HarvestError::payload(format!("invalid JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(HarvestError::payload(format!(
            "expected a JSON array, found {}",
            kind(&value)
        )));
    };

    let entries = items
        .iter()
        .map(|item| match item {
            Value::Object(map) => entry_from_map(map, fields),
            other => {
                tracing::debug!(kind = kind(other), "non-object payload item");
                RawEntry::default()
            }
        })
        .collect();
    Ok(entries)
}

fn entry_from_map(map: &Map<String, Value>, fields: &PayloadFields) -> RawEntry {
    RawEntry {
        title: string_field(map, &fields.title),
        alt_title: string_field(map, &fields.alt_title),
        tags: tags_field(map.get(&fields.tags)),
        start_date: string_field(map, &fields.start_date),
        end_date: string_field(map, &fields.end_date),
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn tags_field(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(String::from),
                Value::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
