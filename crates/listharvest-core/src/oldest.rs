//! Track the record with the earliest start date across runs.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::parse_list_date;
use crate::types::{ExtractionResult, HarvestError};

/// The oldest known record: a title and its start date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OldestMarker {
    pub title: String,
    pub date: NaiveDate,
}

impl OldestMarker {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date,
        }
    }
}

impl fmt::Display for OldestMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.title, self.date.format("%Y-%m-%d"))
    }
}

impl FromStr for OldestMarker {
    type Err = HarvestError;

    /// Parse `<title> <date>`. Titles may contain spaces, so the date is
    /// whatever follows the last one. Accepts ISO dates and `MM-DD-YY`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let (title, date) = line
            .rsplit_once(' ')
            .ok_or_else(|| HarvestError::InvalidInput(format!("malformed oldest marker: {line:?}")))?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .ok()
            .or_else(|| parse_list_date(date))
            .ok_or_else(|| HarvestError::InvalidInput(format!("bad date in oldest marker: {date:?}")))?;
        let title = title.trim();
        if title.is_empty() {
            return Err(HarvestError::InvalidInput("oldest marker has no title".into()));
        }
        Ok(Self::new(title, date))
    }
}

/// The record with the earliest start date. Records without a date are
/// ignored; on ties the first record wins.
pub fn oldest_in(result: &ExtractionResult) -> Option<OldestMarker> {
    let mut oldest: Option<(&str, NaiveDate)> = None;
    for record in &result.records {
        let Some(date) = record.start_date else {
            continue;
        };
        if oldest.map_or(true, |(_, current)| date < current) {
            oldest = Some((&record.title, date));
        }
    }
    oldest.map(|(title, date)| OldestMarker::new(title, date))
}

/// Merge a candidate into the stored marker. The candidate wins only when it
/// is strictly older; ties keep what was stored.
pub fn merge_oldest(
    stored: Option<OldestMarker>,
    candidate: Option<OldestMarker>,
) -> Option<OldestMarker> {
    match (stored, candidate) {
        (Some(stored), Some(candidate)) if candidate.date < stored.date => Some(candidate),
        (Some(stored), _) => Some(stored),
        (None, candidate) => candidate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawEntry;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dated(title: &str, date: Option<&str>) -> RawEntry {
        RawEntry {
            start_date: date.map(String::from),
            ..RawEntry::titled(title)
        }
    }

    #[test]
    fn merge_prefers_strictly_older() {
        let stored = OldestMarker::new("A", ymd(2010, 1, 1));
        let older = OldestMarker::new("B", ymd(2009, 6, 1));
        let tie = OldestMarker::new("C", ymd(2010, 1, 1));

        assert_eq!(
            merge_oldest(Some(stored.clone()), Some(older.clone())),
            Some(older)
        );
        assert_eq!(
            merge_oldest(Some(stored.clone()), Some(tie)),
            Some(stored.clone())
        );
        assert_eq!(merge_oldest(Some(stored.clone()), None), Some(stored.clone()));
        assert_eq!(merge_oldest(None, Some(stored.clone())), Some(stored));
        assert_eq!(merge_oldest(None, None), None);
    }

    #[test]
    fn oldest_skips_undated_records() {
        let result = ExtractionResult::from_raw(vec![
            dated("No Date", None),
            dated("Broken", Some("??-??-??")),
            dated("Akira", Some("07-16-88")),
            dated("Also 88", Some("07-16-88")),
            dated("Newer", Some("01-01-20")),
        ]);
        assert_eq!(
            oldest_in(&result),
            Some(OldestMarker::new("Akira", ymd(1988, 7, 16)))
        );
        assert_eq!(oldest_in(&ExtractionResult::from_raw(vec![dated("x", None)])), None);
    }

    #[test]
    fn marker_text_round_trip() {
        let marker = OldestMarker::new("Ghost in the Shell", ymd(1995, 11, 18));
        assert_eq!(marker.to_string(), "Ghost in the Shell 1995-11-18");
        assert_eq!(marker.to_string().parse::<OldestMarker>().unwrap(), marker);
    }

    #[test]
    fn marker_accepts_legacy_dates() {
        let marker: OldestMarker = "Astro Boy 01-01-63\n".parse().unwrap();
        assert_eq!(marker, OldestMarker::new("Astro Boy", ymd(1963, 1, 1)));
        assert!("NoDate".parse::<OldestMarker>().is_err());
        assert!("Title garbage".parse::<OldestMarker>().is_err());
        assert!(" 2001-01-01".parse::<OldestMarker>().is_err());
    }
}
