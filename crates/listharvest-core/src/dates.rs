//! Date parsing for list sources that use `MM-DD-YY` strings.
//!
//! Two-digit years are resolved with a fixed pivot: values up to and
//! including [`TWO_DIGIT_YEAR_PIVOT`] belong to the 2000s, everything else
//! to the 1900s. The window is not rolling; a year like `30` resolves to 1930.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// Highest two-digit year that still resolves into the 2000s.
pub const TWO_DIGIT_YEAR_PIVOT: u32 = 25;

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{2}|\d{4})$").expect("date pattern is valid")
    })
}

/// Resolve a two-digit year to a four-digit one.
pub fn resolve_two_digit_year(year: u32) -> i32 {
    if year <= TWO_DIGIT_YEAR_PIVOT {
        2000 + year as i32
    } else {
        1900 + year as i32
    }
}

/// Parse a `MM-DD-YY` (or `MM-DD-YYYY`) date string.
///
/// Returns `None` for anything that is not a real calendar date, including
/// the zeroed placeholders some sources emit for unknown days.
pub fn parse_list_date(raw: &str) -> Option<NaiveDate> {
    let caps = date_pattern().captures(raw.trim())?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year_str = &caps[3];
    let year_val: u32 = year_str.parse().ok()?;
    let year = if year_str.len() == 2 {
        resolve_two_digit_year(year_val)
    } else {
        year_val as i32
    };
    NaiveDate::from_ymd_opt(year, month, day)
}
