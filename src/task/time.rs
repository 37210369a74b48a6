//! Clamped work-time arithmetic against a fixed working day.
//!
//! Work is counted between 09:00 and 23:00 on the start date. Anything after
//! 16:00 is overtime. A start logged before 09:00 is moved to 09:00 and an end
//! past 23:00 is cut at 23:00, so a malformed record still yields a bounded,
//! non-negative number of minutes.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::date_util::{minutes_between, parse_datetime};

pub const WORK_START_HOUR: u32 = 9;
pub const WORK_END_HOUR: u32 = 16;
pub const WORK_CAP_HOUR: u32 = 23;

fn at_hour(date: NaiveDate, hour: u32) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time)
}

/// Start and end clamped to the 09:00-23:00 window of the start date, or
/// `None` when the clamped span is empty.
fn clamped_span(
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let day = start.date();
    let effective_start = start.max(at_hour(day, WORK_START_HOUR));
    let effective_end = end.min(at_hour(day, WORK_CAP_HOUR));
    if effective_start >= effective_end {
        None
    } else {
        Some((effective_start, effective_end))
    }
}

fn parse_pair(
    start: Option<&str>,
    end: Option<&str>,
    created: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let start = parse_datetime(start, created, today)?;
    let end = parse_datetime(end, created, today)?;
    Some((start, end))
}

/// Effective work minutes between two parsed instants.
pub fn duration_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    clamped_span(start, end).map_or(0, |(s, e)| minutes_between(s, e))
}

/// Minutes of the effective span that fall after 16:00.
pub fn overtime_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let Some((effective_start, effective_end)) = clamped_span(start, end) else {
        return 0;
    };
    let work_end = at_hour(start.date(), WORK_END_HOUR);
    if effective_end <= work_end {
        0
    } else if effective_start >= work_end {
        minutes_between(effective_start, effective_end)
    } else {
        minutes_between(work_end, effective_end)
    }
}

/// Effective work minutes for raw start/end strings. Unparseable or missing
/// values yield 0.
pub fn duration_minutes(
    start: Option<&str>,
    end: Option<&str>,
    created: Option<NaiveDate>,
    today: NaiveDate,
) -> i64 {
    parse_pair(start, end, created, today).map_or(0, |(s, e)| duration_between(s, e))
}

/// Overtime minutes for raw start/end strings. Unparseable or missing values
/// yield 0.
pub fn overtime_minutes(
    start: Option<&str>,
    end: Option<&str>,
    created: Option<NaiveDate>,
    today: NaiveDate,
) -> i64 {
    parse_pair(start, end, created, today).map_or(0, |(s, e)| overtime_between(s, e))
}

/// Whether the task was started in the `[16:00, 23:00)` window. Needs no end.
pub fn is_overtime_start(
    start: Option<&str>,
    created: Option<NaiveDate>,
    today: NaiveDate,
) -> bool {
    parse_datetime(start, created, today)
        .map(|s| (WORK_END_HOUR..WORK_CAP_HOUR).contains(&s.hour()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 3, 10)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn work(start: &str, end: &str) -> i64 {
        duration_minutes(Some(start), Some(end), day(), today())
    }

    fn overtime(start: &str, end: &str) -> i64 {
        overtime_minutes(Some(start), Some(end), day(), today())
    }

    #[test]
    fn test_start_before_work_day_is_clamped() {
        assert_eq!(work("08:00:00", "18:00:00"), 540);
        assert_eq!(overtime("08:00:00", "18:00:00"), 120);
    }

    #[test]
    fn test_evening_task_is_all_overtime() {
        assert_eq!(work("20:00:00", "22:30:00"), 150);
        assert_eq!(overtime("20:00:00", "22:30:00"), 150);
    }

    #[test]
    fn test_end_past_cap_is_clamped() {
        let d = duration_minutes(
            Some("2025-03-10 22:00:00"),
            Some("2025-03-11 01:00:00"),
            None,
            today(),
        );
        assert_eq!(d, 60);
    }

    #[test]
    fn test_reversed_span_is_zero() {
        assert_eq!(work("15:00:00", "10:00:00"), 0);
        assert_eq!(overtime("18:00:00", "17:00:00"), 0);
    }

    #[test]
    fn test_span_entirely_outside_window() {
        assert_eq!(work("06:00:00", "08:30:00"), 0);
        assert_eq!(work("23:10:00", "23:50:00"), 0);
    }

    #[test]
    fn test_day_shift_has_no_overtime() {
        assert_eq!(overtime("10:00:00", "16:00:00"), 0);
        assert_eq!(work("10:00:00", "16:00:00"), 360);
    }

    #[test]
    fn test_missing_or_garbage_is_zero() {
        assert_eq!(duration_minutes(None, Some("10:00:00"), day(), today()), 0);
        assert_eq!(duration_minutes(Some("10:00:00"), None, day(), today()), 0);
        assert_eq!(work("soon", "later"), 0);
        assert_eq!(overtime("soon", "later"), 0);
        assert!(!is_overtime_start(None, day(), today()));
        assert!(!is_overtime_start(Some("soon"), day(), today()));
    }

    #[test]
    fn test_overtime_start_window() {
        assert!(is_overtime_start(Some("16:00:00"), day(), today()));
        assert!(is_overtime_start(Some("22:59:59"), day(), today()));
        assert!(!is_overtime_start(Some("23:00:00"), day(), today()));
        assert!(!is_overtime_start(Some("15:59:59"), day(), today()));
    }

    #[test]
    fn test_time_only_without_creation_date_uses_today() {
        let d = duration_minutes(Some("10:00:00"), Some("11:00:00"), None, today());
        assert_eq!(d, 60);
    }
}
