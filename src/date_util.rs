use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::error::{Error, Result};

static RE_TIME_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}$").unwrap());

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// True when the field is absent or only whitespace.
pub fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|s| s.trim().is_empty())
}

/// Parse a task timestamp.
///
/// Accepts:
/// - empty / absent → `None`
/// - a bare `HH:MM:SS` time, combined with `fallback_date` (or `today`)
/// - a full datetime (`YYYY-MM-DD HH:MM[:SS[.fff]]`, ISO `T` separator, RFC 3339)
/// - a bare `YYYY-MM-DD` date, read as midnight
///
/// Anything else is `None`. RFC 3339 offsets are dropped in favour of the
/// wall-clock time they carry.
pub fn parse_datetime(
    value: Option<&str>,
    fallback_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<NaiveDateTime> {
    let s = value?.trim();
    if s.is_empty() {
        return None;
    }

    if RE_TIME_ONLY.is_match(s) {
        let time = NaiveTime::parse_from_str(s, "%H:%M:%S").ok()?;
        return Some(fallback_date.unwrap_or(today).and_time(time));
    }

    parse_full(s)
}

fn parse_full(s: &str) -> Option<NaiveDateTime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Calendar date carried by a datetime string, used as the base date for
/// time-only siblings. Falls back to the first whitespace-separated token.
pub fn date_part(value: Option<&str>) -> Option<NaiveDate> {
    let s = value?.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(dt) = parse_full(s) {
        return Some(dt.date());
    }
    s.split_whitespace()
        .next()
        .and_then(|token| NaiveDate::parse_from_str(token, "%Y-%m-%d").ok())
}

/// Whole minutes between two instants, rounded half-up, never negative.
pub fn minutes_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let ms = (end - start).num_milliseconds();
    if ms <= 0 {
        return 0;
    }
    (ms as f64 / 60_000.0).round() as i64
}

/// `YYYY-MM` key for a date.
pub fn month_key(d: NaiveDate) -> String {
    format!("{}-{:02}", d.year(), d.month())
}

/// Render minutes as `0m`, `45m`, `2h` or `2h 5m`.
pub fn format_duration(minutes: i64) -> String {
    if minutes <= 0 {
        return "0m".to_string();
    }
    let hours = minutes / 60;
    let mins = minutes % 60;
    match (hours, mins) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Parse a reference timestamp supplied by a caller (e.g. the CLI `--now`).
pub fn parse_reference_time(s: &str) -> Result<NaiveDateTime> {
    parse_full(s.trim()).ok_or_else(|| Error::Timestamp(s.to_string()))
}

/// Round to one decimal place.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_parse_blank() {
        let today = date(2025, 3, 10);
        assert_eq!(parse_datetime(None, None, today), None);
        assert_eq!(parse_datetime(Some(""), None, today), None);
        assert_eq!(parse_datetime(Some("   "), None, today), None);
    }

    #[test]
    fn test_parse_time_only_uses_fallback_date() {
        let today = date(2025, 3, 10);
        assert_eq!(
            parse_datetime(Some("14:30:00"), Some(date(2025, 1, 5)), today),
            Some(dt("2025-01-05 14:30:00"))
        );
        assert_eq!(
            parse_datetime(Some("14:30:00"), None, today),
            Some(dt("2025-03-10 14:30:00"))
        );
    }

    #[test]
    fn test_parse_time_only_out_of_range() {
        let today = date(2025, 3, 10);
        assert_eq!(parse_datetime(Some("25:61:00"), None, today), None);
    }

    #[test]
    fn test_parse_full_formats() {
        let today = date(2025, 3, 10);
        let parse = |value: &str| parse_datetime(Some(value), None, today);
        let expected = Some(dt("2025-01-05 09:15:00"));
        assert_eq!(parse("2025-01-05 09:15:00"), expected);
        assert_eq!(parse("2025-01-05T09:15:00"), expected);
        assert_eq!(parse("2025-01-05 09:15"), expected);
        assert_eq!(parse("2025-01-05T09:15:00.000"), expected);
        assert_eq!(parse("2025-01-05T09:15:00+03:00"), expected);
        assert_eq!(parse("2025-01-05"), Some(dt("2025-01-05 00:00:00")));
    }

    #[test]
    fn test_parse_garbage() {
        let today = date(2025, 3, 10);
        assert_eq!(parse_datetime(Some("yesterday-ish"), None, today), None);
        let out_of_range = parse_datetime(Some("2025-13-40 10:00:00"), None, today);
        assert_eq!(out_of_range, None);
    }

    #[test]
    fn test_date_part() {
        let fifth = Some(date(2025, 1, 5));
        assert_eq!(date_part(Some("2025-01-05 09:15:00")), fifth);
        assert_eq!(date_part(Some("2025-01-05 bogus")), fifth);
        assert_eq!(date_part(Some("09:15:00")), None);
        assert_eq!(date_part(None), None);
    }

    #[test]
    fn test_minutes_between() {
        let span = |from: &str, to: &str| minutes_between(dt(from), dt(to));
        assert_eq!(span("2025-01-05 09:00:00", "2025-01-05 10:30:00"), 90);
        assert_eq!(span("2025-01-05 10:00:00", "2025-01-05 09:00:00"), 0);
        // 90 seconds rounds up to 2 minutes
        assert_eq!(span("2025-01-05 09:00:00", "2025-01-05 09:01:30"), 2);
    }

    #[test]
    fn test_month_key() {
        assert_eq!(month_key(date(2025, 1, 31)), "2025-01");
        assert_eq!(month_key(date(2024, 12, 1)), "2024-12");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0m");
        assert_eq!(format_duration(45), "45m");
        assert_eq!(format_duration(120), "2h");
        assert_eq!(format_duration(125), "2h 5m");
    }

    #[test]
    fn test_parse_reference_time() {
        assert_eq!(
            parse_reference_time("2025-03-10 12:00:00").unwrap(),
            dt("2025-03-10 12:00:00")
        );
        assert_eq!(
            parse_reference_time("2025-03-10").unwrap(),
            dt("2025-03-10 00:00:00")
        );
        assert!(parse_reference_time("noon").is_err());
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(1.25), 1.3);
        assert_eq!(round1(2.0), 2.0);
    }
}
