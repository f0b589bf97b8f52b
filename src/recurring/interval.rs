use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

use crate::ledger::models::RecurrenceInterval;

/// Advances a date by one interval step. Pure UTC calendar math; the
/// time of day carries over unchanged and the result is always strictly
/// after the input.
pub fn advance(date: DateTime<Utc>, interval: RecurrenceInterval) -> DateTime<Utc> {
    let day = date.date_naive();
    let shifted = match interval {
        RecurrenceInterval::Daily => day + Duration::days(1),
        RecurrenceInterval::Weekly => day + Duration::days(7),
        RecurrenceInterval::Monthly => shift_month(day),
        RecurrenceInterval::Yearly => shift_year(day),
    };
    Utc.from_utc_datetime(&shifted.and_time(date.time()))
}

/// One calendar month forward. The day of month is preserved, clamped to
/// the shorter month; a date already on the last day of its month lands on
/// the last day of the next month, so Jan 31 -> Feb 28 -> Mar 31.
fn shift_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };

    let day = if date.day() == days_in_month(date.year(), date.month()) {
        days_in_month(year, month)
    } else {
        date.day().min(days_in_month(year, month))
    };

    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

/// One calendar year forward, clamping Feb 29 to Feb 28.
fn shift_year(date: NaiveDate) -> NaiveDate {
    let year = date.year() + 1;
    let day = date.day().min(days_in_month(year, date.month()));
    NaiveDate::from_ymd_opt(year, date.month(), day).unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 28).unwrap());
    (first_of_next - Duration::days(1)).day()
}
