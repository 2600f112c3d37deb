//! Calendar facts derived from a wall-clock instant.
//!
//! All policy arithmetic works on the same `DateTime<FixedOffset>`, so the
//! weekday, month and month length always agree with the epoch milliseconds.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};

/// Milliseconds in one day.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Milliseconds in one hour.
pub const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Epoch milliseconds of `now`.
#[must_use]
pub fn epoch_millis(now: &DateTime<FixedOffset>) -> i64 {
    now.timestamp_millis()
}

/// ISO weekday code of `now`: Monday = 1 … Sunday = 7.
#[must_use]
pub fn weekday_code(now: &DateTime<FixedOffset>) -> u8 {
    // number_from_monday is 1..=7
    now.weekday().number_from_monday() as u8
}

/// Calendar month of `now`, 1 = January … 12 = December.
#[must_use]
pub fn month_code(now: &DateTime<FixedOffset>) -> u8 {
    now.month() as u8
}

/// Number of days in `month` of `year`.
///
/// Returns 0 for a month outside 1..=12.
#[must_use]
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.map(|n| n.signed_duration_since(first).num_days() as u32)
        .unwrap_or(31)
}

/// Length of the month containing `now`, in milliseconds.
#[must_use]
pub fn month_length_millis(now: &DateTime<FixedOffset>) -> i64 {
    i64::from(days_in_month(now.year(), now.month())) * MILLIS_PER_DAY
}
