use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::date_util::{month_key, parse_datetime};
use crate::error::{Error, Result};
use crate::task::RawTask;

static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());

/// Month scope applied to the raw snapshot before normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MonthFilter {
    #[default]
    All,
    Month(i32, u32),
}

impl MonthFilter {
    /// Parse a month scope.
    ///
    /// Supported formats:
    /// - `all`: no month restriction
    /// - `2025-01`: a calendar month
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(MonthFilter::All);
        }

        if let Some(caps) = RE_MONTH.captures(s) {
            let year: i32 = caps[1]
                .parse()
                .map_err(|_| Error::MonthParse(format!("invalid year: {s}")))?;
            let month: u32 = caps[2]
                .parse()
                .map_err(|_| Error::MonthParse(format!("invalid month: {s}")))?;
            if (1..=12).contains(&month) {
                return Ok(MonthFilter::Month(year, month));
            }
        }

        Err(Error::MonthParse(format!("unrecognized month: {s}")))
    }

    /// The month containing `now`.
    pub fn current(now: NaiveDateTime) -> Self {
        MonthFilter::Month(now.year(), now.month())
    }

    /// Canonical key: `all` or `YYYY-MM`.
    pub fn to_key(&self) -> String {
        match self {
            MonthFilter::All => "all".to_string(),
            MonthFilter::Month(y, m) => format!("{y}-{m:02}"),
        }
    }

    /// Human-readable name, e.g. `March 2025`.
    pub fn label(&self) -> String {
        match self {
            MonthFilter::All => "All months".to_string(),
            MonthFilter::Month(y, m) => NaiveDate::from_ymd_opt(*y, *m, 1)
                .map(|d| d.format("%B %Y").to_string())
                .unwrap_or_else(|| self.to_key()),
        }
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        match self {
            MonthFilter::All => true,
            MonthFilter::Month(y, m) => d.year() == *y && d.month() == *m,
        }
    }
}

impl std::fmt::Display for MonthFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

impl Serialize for MonthFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_key())
    }
}

/// Date used to place a task in a month: creation time, else an end or start
/// value that carries a date (time-only values are ignored).
fn month_source(task: &RawTask, today: NaiveDate) -> Option<NaiveDate> {
    let source = task
        .created_at
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| with_date(task.ended_at.as_deref()))
        .or_else(|| with_date(task.started_at.as_deref()))?;
    parse_datetime(Some(source), None, today).map(|dt| dt.date())
}

fn with_date(value: Option<&str>) -> Option<&str> {
    value.filter(|s| s.contains('-'))
}

/// Restrict a raw snapshot to one month. Tasks with no resolvable date only
/// survive the `All` scope.
pub fn filter_by_month(tasks: &[RawTask], month: &MonthFilter, now: NaiveDateTime) -> Vec<RawTask> {
    if *month == MonthFilter::All {
        return tasks.to_vec();
    }
    let today = now.date();
    tasks
        .iter()
        .filter(|t| month_source(t, today).is_some_and(|d| month.contains(d)))
        .cloned()
        .collect()
}

/// Distinct `YYYY-MM` keys present in the snapshot, newest first.
pub fn available_months(tasks: &[RawTask], now: NaiveDateTime) -> Vec<String> {
    let today = now.date();
    let months: BTreeSet<String> = tasks
        .iter()
        .filter_map(|t| month_source(t, today))
        .map(month_key)
        .collect();
    months.into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-03-20 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_parse_month() {
        let january = MonthFilter::parse("2025-01").unwrap();
        assert_eq!(january, MonthFilter::Month(2025, 1));
        let december = MonthFilter::parse("2025-12").unwrap();
        assert_eq!(december, MonthFilter::Month(2025, 12));
    }

    #[test]
    fn test_parse_all() {
        assert_eq!(MonthFilter::parse("all").unwrap(), MonthFilter::All);
        assert_eq!(MonthFilter::parse("ALL").unwrap(), MonthFilter::All);
        assert_eq!(MonthFilter::parse("").unwrap(), MonthFilter::All);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(MonthFilter::parse("garbage").is_err());
        assert!(MonthFilter::parse("2025-13").is_err());
        assert!(MonthFilter::parse("2025-00").is_err());
        assert!(MonthFilter::parse("2025-1").is_err());
    }

    #[test]
    fn test_to_key_and_label() {
        assert_eq!(MonthFilter::Month(2025, 3).to_key(), "2025-03");
        assert_eq!(MonthFilter::All.to_key(), "all");
        assert_eq!(MonthFilter::Month(2025, 3).label(), "March 2025");
        assert_eq!(MonthFilter::current(now()), MonthFilter::Month(2025, 3));
    }

    #[test]
    fn test_filter_by_month_source_priority() {
        let tasks = vec![
            RawTask::new(1, "created in march", "a").created("2025-03-02 10:00:00"),
            RawTask::new(2, "created in feb", "a")
                .created("2025-02-27 10:00:00")
                .ended("2025-03-01 10:00:00"),
            RawTask::new(3, "only end", "a").ended("2025-03-05 12:00:00"),
            RawTask::new(4, "time only", "a").started("10:00:00"),
            RawTask::new(5, "no dates", "a"),
        ];
        let march = filter_by_month(&tasks, &MonthFilter::Month(2025, 3), now());
        let ids: Vec<i64> = march.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);

        let all = filter_by_month(&tasks, &MonthFilter::All, now());
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_available_months() {
        let tasks = vec![
            RawTask::new(1, "t", "a").created("2025-01-02 10:00:00"),
            RawTask::new(2, "t", "a").created("2025-03-02 10:00:00"),
            RawTask::new(3, "t", "a").created("2025-01-20 10:00:00"),
            RawTask::new(4, "t", "a"),
        ];
        assert_eq!(available_months(&tasks, now()), vec!["2025-03", "2025-01"]);
    }
}
