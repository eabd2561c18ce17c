//! Calendar helpers for building inclusive date windows.

use std::ops::RangeInclusive;

use time::{Date, Duration, Month};

/// The first to the last day of `month` in `year`.
///
/// Returns `None` if the dates fall outside the range supported by [Date].
pub fn month_range(year: i32, month: Month) -> Option<RangeInclusive<Date>> {
    let start = Date::from_calendar_date(year, month, 1).ok()?;
    let (next_year, next_month) = match month {
        Month::December => (year.checked_add(1)?, Month::January),
        month => (year, month.next()),
    };
    let end = Date::from_calendar_date(next_year, next_month, 1)
        .ok()?
        .previous_day()?;

    Some(start..=end)
}

/// The `days` days ending on and including `end`.
///
/// An empty window (`start > end`) is returned when `days` is zero.
pub fn trailing_days(end: Date, days: u16) -> RangeInclusive<Date> {
    let start = end
        .checked_sub(Duration::days(i64::from(days)))
        .and_then(|date| date.next_day())
        .unwrap_or(Date::MIN);

    start..=end
}

/// Every calendar day in `window`, ascending.
pub fn days_in(window: &RangeInclusive<Date>) -> impl Iterator<Item = Date> {
    let end = *window.end();

    std::iter::successors(Some(*window.start()), |date| date.next_day())
        .take_while(move |date| *date <= end)
}
