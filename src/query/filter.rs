use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::date_util::parse_datetime;
use crate::error::{Error, Result};
use crate::task::{dedupe_by_id, NormalizedTask, RawTask, TaskStatus};

/// Lifecycle restriction for [`FilterSpec`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    InProgress,
    NotStarted,
}

impl StatusFilter {
    pub fn matches(&self, status: TaskStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => status == TaskStatus::Completed,
            StatusFilter::InProgress => status == TaskStatus::InProgress,
            StatusFilter::NotStarted => status == TaskStatus::NotStarted,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "completed" | "done" => Ok(StatusFilter::Completed),
            "inprogress" => Ok(StatusFilter::InProgress),
            "notstarted" => Ok(StatusFilter::NotStarted),
            _ => Err(Error::Filter(format!("unknown task status: {s}"))),
        }
    }
}

/// Predicate set over normalized tasks. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSpec {
    /// Case-insensitive substring of title, id, assignee or identifier.
    pub search_term: Option<String>,
    pub created_by: Option<String>,
    pub task_identifier: Option<String>,
    /// Inclusive lower bound on clamped duration, in minutes. Zero or a
    /// negative value leaves the bound unset.
    pub min_duration: Option<f64>,
    /// Inclusive upper bound, unset when not positive like `min_duration`.
    pub max_duration: Option<f64>,
    pub date_from: Option<NaiveDate>,
    /// Inclusive through the end of this day.
    pub date_to: Option<NaiveDate>,
    pub task_status: StatusFilter,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: &str) -> Self {
        self.search_term = Some(term.to_string());
        self
    }

    pub fn created_by(mut self, name: &str) -> Self {
        self.created_by = Some(name.to_string());
        self
    }

    pub fn task_identifier(mut self, identifier: &str) -> Self {
        self.task_identifier = Some(identifier.to_string());
        self
    }

    pub fn min_duration(mut self, minutes: f64) -> Self {
        self.min_duration = Some(minutes);
        self
    }

    pub fn max_duration(mut self, minutes: f64) -> Self {
        self.max_duration = Some(minutes);
        self
    }

    pub fn date_from(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }

    pub fn date_to(mut self, date: NaiveDate) -> Self {
        self.date_to = Some(date);
        self
    }

    pub fn status(mut self, status: StatusFilter) -> Self {
        self.task_status = status;
        self
    }

    /// True when no predicate is set.
    pub fn is_empty(&self) -> bool {
        *self == FilterSpec::default()
    }

    fn duration_bounds(&self) -> (Option<f64>, Option<f64>) {
        (positive(self.min_duration), positive(self.max_duration))
    }

    /// Reject ranges that can never match.
    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = self.duration_bounds() {
            if min > max {
                return Err(Error::Filter(format!(
                    "min duration {min} exceeds max duration {max}"
                )));
            }
        }
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(Error::Filter(format!("date range {from}..{to} is empty")));
            }
        }
        Ok(())
    }

    /// Whether a single task passes every populated predicate.
    pub fn matches(&self, task: &NormalizedTask, now: NaiveDateTime) -> bool {
        let raw = &task.raw;

        if let Some(term) = non_blank(self.search_term.as_deref()) {
            let needle = term.to_lowercase();
            let hit = raw.title.to_lowercase().contains(&needle)
                || raw.id.to_string().contains(&needle)
                || raw.assignee.to_lowercase().contains(&needle)
                || raw
                    .identifier
                    .as_deref()
                    .is_some_and(|i| i.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(creator) = non_blank(self.created_by.as_deref()) {
            if raw.created_by.as_deref() != Some(creator) {
                return false;
            }
        }

        if let Some(identifier) = non_blank(self.task_identifier.as_deref()) {
            if raw.identifier.as_deref() != Some(identifier) {
                return false;
            }
        }

        let minutes = task.duration_minutes as f64;
        let (min_duration, max_duration) = self.duration_bounds();
        if min_duration.is_some_and(|min| minutes < min) {
            return false;
        }
        if max_duration.is_some_and(|max| minutes > max) {
            return false;
        }

        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(task_date) = filter_date(raw, now) else {
                return false;
            };
            if let Some(from) = self.date_from {
                if task_date < from.and_time(NaiveTime::MIN) {
                    return false;
                }
            }
            if let Some(to) = self.date_to {
                let next_day = to.and_time(NaiveTime::MIN) + Duration::days(1);
                if task_date >= next_day {
                    return false;
                }
            }
        }

        self.task_status.matches(task.status)
    }

    /// Deduplicate by id, then keep the tasks that match.
    pub fn apply(&self, tasks: &[NormalizedTask], now: NaiveDateTime) -> Vec<NormalizedTask> {
        let unique = dedupe_by_id(tasks);
        let filtered: Vec<NormalizedTask> = unique
            .into_iter()
            .filter(|t| self.matches(t, now))
            .collect();
        log::debug!("Filter kept {} of {} tasks", filtered.len(), tasks.len());
        filtered
    }
}

/// Apply a filter spec to normalized tasks.
pub fn apply_filters(
    tasks: &[NormalizedTask],
    spec: &FilterSpec,
    now: NaiveDateTime,
) -> Vec<NormalizedTask> {
    spec.apply(tasks, now)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

/// Creation time, else start time.
fn filter_date(raw: &RawTask, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let today = now.date();
    match non_blank(raw.created_at.as_deref()) {
        Some(created) => parse_datetime(Some(created), None, today),
        None => raw.parsed_start(today),
    }
}

/// Distinct non-blank creators, sorted.
pub fn available_creators(tasks: &[RawTask]) -> Vec<String> {
    distinct(tasks.iter().map(|t| t.created_by.as_deref()))
}

/// Distinct non-blank task identifiers, sorted.
pub fn available_identifiers(tasks: &[RawTask]) -> Vec<String> {
    distinct(tasks.iter().map(|t| t.identifier.as_deref()))
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let set: BTreeSet<String> = values
        .filter_map(non_blank)
        .map(|s| s.to_string())
        .collect();
    set.into_iter().collect()
}
