//! Helper functions and utilities
//!
//! Calendar arithmetic shared by the scheduler and the lifecycle services.

use chrono::{DateTime, Datelike, Duration, LocalResult, Months, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use crate::utils::errors::{CourseDeskError, Result};

/// Parse an "HH:MM" (or "HH:MM:SS") wall-clock time
pub fn parse_start_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| CourseDeskError::Validation(format!("Invalid start time: {}", value)))
}

/// Parse an IANA timezone name
pub fn parse_timezone(value: &str) -> Result<Tz> {
    value
        .parse::<Tz>()
        .map_err(|_| CourseDeskError::Validation(format!("Invalid timezone: {}", value)))
}

/// Convert an ISO weekday number (1 = Monday .. 7 = Sunday)
pub fn weekday_from_iso(day: i16) -> Result<Weekday> {
    match day {
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        7 => Ok(Weekday::Sun),
        _ => Err(CourseDeskError::Validation(format!("Invalid weekly day: {}", day))),
    }
}

/// First date on or after `from` falling on `weekday`
pub fn next_weekday_on_or_after(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() as i64 - from.weekday().num_days_from_monday() as i64) % 7;
    from + Duration::days(ahead)
}

/// First day of the month containing `date`
pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month `months_ahead` months after the one containing `date`
pub fn end_of_month_ahead(date: NaiveDate, months_ahead: u32) -> Result<NaiveDate> {
    months_ahead
        .checked_add(1)
        .and_then(|months| start_of_month(date).checked_add_months(Months::new(months)))
        .and_then(|first_of_next| first_of_next.pred_opt())
        .ok_or_else(|| {
            CourseDeskError::Validation(format!("{} months after {} is out of calendar range", months_ahead, date))
        })
}

/// Combine a local date and wall-clock time in `tz` into a UTC instant.
///
/// Ambiguous local times (DST fall-back) resolve to the earlier instant; times inside a
/// DST gap are shifted forward by the gap.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, tz: Tz) -> Result<DateTime<Utc>> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| CourseDeskError::Validation(format!("Nonexistent local time {} in {}", naive, tz))),
    }
}

/// Start and end instants of a lesson
pub fn lesson_bounds(date: NaiveDate, start: NaiveTime, duration_minutes: i32, tz: Tz) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    if duration_minutes <= 0 {
        return Err(CourseDeskError::Validation(format!("Invalid duration: {} minutes", duration_minutes)));
    }
    let start_at = local_to_utc(date, start, tz)?;
    Ok((start_at, start_at + Duration::minutes(duration_minutes as i64)))
}

/// Truncate text to a maximum number of characters with ellipsis
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
