//! Date parsing for warehouse extracts.
//!
//! Encounter dates arrive as text in whichever shape the extraction query
//! produced: ISO dates, slashed dates, US-style dates, or full datetimes.
//! The window filter only needs calendar days, so datetime values are cut
//! at the date/time boundary before parsing.

use chrono::NaiveDate;

/// Accepted date shapes, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a calendar date from an extract cell.
///
/// Returns `None` for empty or unrecognized values; the window filter
/// treats both as "outside the window".
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let date_part = trimmed
        .split_once([' ', 'T'])
        .map_or(trimmed, |(date, _)| date);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

/// Inclusive window membership check.
pub fn date_in_window(note: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    start <= note && note <= end
}
