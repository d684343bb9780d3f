//! Rolling lookback window of months to query.
//!
//! The police API publishes each month's data some weeks after it ends, so
//! the window stops a month short of today: `end = today - 1 month`. It
//! then covers the 36 months up to and including the month of
//! `end - 1 day`, all of which fall after `start = end - 37 months`.

use chrono::{Months, NaiveDate};
use crime_hotspots_incident_models::MonthToken;

/// Number of months in the default window.
pub const WINDOW_MONTHS: u32 = 36;

/// Plans the default 36-month window for `today`.
#[must_use]
pub fn plan(today: NaiveDate) -> Vec<MonthToken> {
    plan_with_len(today, WINDOW_MONTHS)
}

/// Plans a window of `len` months ending at the latest month the API is
/// expected to have published on `today`.
///
/// Tokens are contiguous and in ascending order.
#[must_use]
pub fn plan_with_len(today: NaiveDate, len: u32) -> Vec<MonthToken> {
    let end = today.checked_sub_months(Months::new(1)).unwrap_or(today);
    let last = MonthToken::from_date(end.pred_opt().unwrap_or(end));

    let mut months = Vec::with_capacity(len as usize);
    let mut month = last;
    for _ in 0..len {
        months.push(month);
        month = month.pred();
    }
    months.reverse();

    months
}
