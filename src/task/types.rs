use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::date_util::{date_part, is_blank, parse_datetime};

/// A task record as supplied by the caller.
///
/// Field names follow this crate's conventions; the names used by the
/// tracker's JSON export (`taskid`, `assignee_username`, `createTask`,
/// `time_start`, `time_end`, ...) are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTask {
    #[serde(alias = "taskid")]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(
        default,
        alias = "assignee_username",
        deserialize_with = "string_or_null"
    )]
    pub assignee: String,
    #[serde(default, alias = "created_by_name", alias = "createdBy")]
    pub created_by: Option<String>,
    #[serde(
        default,
        alias = "task_identifier",
        alias = "tast_identifier",
        alias = "taskIdentifier"
    )]
    pub identifier: Option<String>,
    #[serde(default, alias = "createTask", alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default, alias = "time_start", alias = "startedAt")]
    pub started_at: Option<String>,
    #[serde(default, alias = "time_end", alias = "endedAt")]
    pub ended_at: Option<String>,
}

fn string_or_null<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

impl RawTask {
    pub fn new(id: i64, title: &str, assignee: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            assignee: assignee.to_string(),
            created_by: None,
            identifier: None,
            created_at: None,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn created(mut self, value: &str) -> Self {
        self.created_at = Some(value.to_string());
        self
    }

    pub fn started(mut self, value: &str) -> Self {
        self.started_at = Some(value.to_string());
        self
    }

    pub fn ended(mut self, value: &str) -> Self {
        self.ended_at = Some(value.to_string());
        self
    }

    pub fn created_by(mut self, value: &str) -> Self {
        self.created_by = Some(value.to_string());
        self
    }

    pub fn identifier(mut self, value: &str) -> Self {
        self.identifier = Some(value.to_string());
        self
    }

    pub fn has_assignee(&self) -> bool {
        !self.assignee.trim().is_empty()
    }

    pub fn has_start(&self) -> bool {
        !is_blank(self.started_at.as_deref())
    }

    pub fn has_end(&self) -> bool {
        !is_blank(self.ended_at.as_deref())
    }

    /// Base date for time-only start/end values.
    pub fn creation_date(&self) -> Option<NaiveDate> {
        date_part(self.created_at.as_deref())
    }

    pub fn parsed_created(&self, today: NaiveDate) -> Option<NaiveDateTime> {
        parse_datetime(self.created_at.as_deref(), None, today)
    }

    pub fn parsed_start(&self, today: NaiveDate) -> Option<NaiveDateTime> {
        parse_datetime(self.started_at.as_deref(), self.creation_date(), today)
    }

    pub fn parsed_end(&self, today: NaiveDate) -> Option<NaiveDateTime> {
        parse_datetime(self.ended_at.as_deref(), self.creation_date(), today)
    }
}

/// Lifecycle state derived from the start/end timestamps.
///
/// A record with an end but no start has no coherent lifecycle and is
/// classified as `NotStarted`, so the three states always partition a task set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn from_flags(has_start: bool, has_end: bool) -> Self {
        match (has_start, has_end) {
            (true, true) => TaskStatus::Completed,
            (true, false) => TaskStatus::InProgress,
            _ => TaskStatus::NotStarted,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not started",
            TaskStatus::InProgress => "in progress",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Duration-based size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeCategory {
    /// 30 minutes or less.
    Quick,
    /// More than 30, at most 120 minutes.
    Medium,
    /// More than 300 minutes.
    Long,
    Normal,
}

pub const QUICK_TASK_MAX_MINUTES: i64 = 30;
pub const MEDIUM_TASK_MAX_MINUTES: i64 = 120;
pub const LONG_TASK_MIN_MINUTES: i64 = 300;

impl SizeCategory {
    pub fn from_minutes(minutes: i64) -> Self {
        if minutes <= QUICK_TASK_MAX_MINUTES {
            SizeCategory::Quick
        } else if minutes <= MEDIUM_TASK_MAX_MINUTES {
            SizeCategory::Medium
        } else if minutes > LONG_TASK_MIN_MINUTES {
            SizeCategory::Long
        } else {
            SizeCategory::Normal
        }
    }
}

/// A deduplicated task with derived timing and classification fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTask {
    #[serde(flatten)]
    pub raw: RawTask,
    pub duration_minutes: i64,
    pub overtime_minutes: i64,
    pub is_completed: bool,
    pub status: TaskStatus,
    pub size_category: SizeCategory,
    pub is_overtime_start: bool,
    pub has_overtime_minutes: bool,
}

impl NormalizedTask {
    pub fn id(&self) -> i64 {
        self.raw.id
    }

    pub fn assignee(&self) -> &str {
        &self.raw.assignee
    }

    pub fn is_quick(&self) -> bool {
        self.size_category == SizeCategory::Quick
    }

    pub fn is_medium(&self) -> bool {
        self.size_category == SizeCategory::Medium
    }

    pub fn is_long_running(&self) -> bool {
        self.size_category == SizeCategory::Long
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == TaskStatus::InProgress
    }

    pub fn is_not_started(&self) -> bool {
        self.status == TaskStatus::NotStarted
    }
}
