//! UTC calendar helpers.
//!
//! Grant idempotency keys are derived from UTC calendar boundaries: daily
//! grants from the UTC day, subscription grants from monthly boundaries
//! anchored at the subscription start date.

use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Utc};

/// Midnight UTC of the given instant's calendar day.
#[must_use]
pub fn start_of_day_utc(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(at.year(), at.month(), at.day(), 0, 0, 0)
        .single()
        .unwrap_or(at)
}

/// The last representable instant of the given instant's UTC calendar day
/// (23:59:59.999).
#[must_use]
pub fn end_of_day_utc(at: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day_utc(at) + Duration::days(1) - Duration::milliseconds(1)
}

/// Add calendar months, clamping the day where the target month is shorter
/// (Jan 31 + 1 month = Feb 28/29).
#[must_use]
pub fn add_months(at: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    at.checked_add_months(Months::new(months)).unwrap_or(at)
}

/// `YYYY-MM-DD` key for a UTC instant, used inside `source_ref` values.
#[must_use]
pub fn date_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// The start of the current billing cycle: the latest monthly boundary at or
/// before `now`, walking forward from the anchor's UTC day.
///
/// Deriving the boundary from the anchor (rather than incrementing a stored
/// counter) means a lazy "ensure this cycle's grant exists" call lands on
/// the correct cycle even after issuance has been skipped for a while.
#[must_use]
pub fn current_cycle_start(cycle_anchor: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let mut cycle_start = start_of_day_utc(cycle_anchor);
    while add_months(cycle_start, 1) <= now {
        cycle_start = add_months(cycle_start, 1);
    }
    cycle_start
}
