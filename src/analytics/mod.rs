pub mod activity;
pub mod productivity;
pub mod velocity;
pub mod workload;
pub mod zombie;

pub use activity::{build_heatmap, build_timeline, DayBucket, Heatmap, HeatmapCell};
pub use productivity::{productivity_metrics, ProductivityMetrics};
pub use velocity::{compute_velocity, VelocityReport};
pub use workload::{compute_workload_balance, forecast_workload, WorkloadBalance, WorkloadForecast};
pub use zombie::detect_zombies;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::date_util::{is_blank, parse_datetime};
use crate::task::NormalizedTask;

/// Direction of a period-over-period change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            TrendDirection::Up
        } else if change < 0.0 {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            TrendDirection::Up => "↑",
            TrendDirection::Down => "↓",
            TrendDirection::Stable => "→",
        }
    }
}

/// Loose completion rule used by the team-level trend metrics: an end time
/// alone is enough. Unlike [`NormalizedTask::is_completed`] this counts
/// end-only records.
pub fn is_closed(task: &NormalizedTask) -> bool {
    task.raw.has_end() || task.is_completed
}

/// Most recent known date of a task: end, else start, else creation.
/// Time-only values resolve against the creation date, then `today`.
pub fn best_activity_date(task: &NormalizedTask, today: NaiveDate) -> Option<NaiveDateTime> {
    let raw = &task.raw;
    let source = [&raw.ended_at, &raw.started_at, &raw.created_at]
        .into_iter()
        .map(|v| v.as_deref())
        .find(|v| !is_blank(*v))?;
    parse_datetime(source, raw.creation_date(), today)
}

/// Parsed end time, for tasks that have one.
pub(crate) fn end_time(task: &NormalizedTask, today: NaiveDate) -> Option<NaiveDateTime> {
    task.raw.parsed_end(today)
}

/// Population standard deviation over mean; 0 for an empty or zero-mean set.
pub(crate) fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean
}

/// `part / whole` as a percentage, 0 when `whole` is 0.
pub(crate) fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
