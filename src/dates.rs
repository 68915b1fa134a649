//! Calendar arithmetic used by every due-date derivation.
//!
//! All comparisons downstream work on `NaiveDate` values. Timestamps are
//! reduced to the local calendar day first, so a "due today" check never
//! drifts by one because of clock time or time-zone offsets.

use chrono::{DateTime, Datelike, Local, Months, NaiveDate, Utc};

/// Storage and wire format for calendar dates (`yyyy-MM-dd`).
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Add `months` calendar months to `date`.
///
/// The day is clamped to the end of the target month, so Jan 31 + 1 month
/// lands on Feb 28 (or Feb 29 in a leap year).
pub fn add_cycle(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Signed number of days from `from` to `to`. Negative when `to` is earlier.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Current local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Strip the time of day from a stored timestamp, in local time.
pub fn start_of_day(ts: &DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Local).date_naive()
}

/// Parse a strict `yyyy-MM-dd` date.
///
/// Shorter forms like `2025-1-5` are rejected: stored dates must sort
/// lexically in chronological order.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT).ok()
}

/// Whether `date` fits the four-digit `yyyy-MM-dd` form. chrono writes years
/// past 9999 with a sign (`+10000-01-01`), which [`parse_iso_date`] rejects.
pub fn is_storable(date: NaiveDate) -> bool {
    (1..=9999).contains(&date.year())
}

pub fn format_iso(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}
