use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::{best_activity_date, is_closed, percent, TrendDirection};
use crate::date_util::round1;
use crate::task::{NormalizedTask, MEDIUM_TASK_MAX_MINUTES};

/// Hours an open task may run before it counts as blocked.
pub const BLOCKED_AFTER_HOURS: i64 = 48;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Velocity {
    /// Closed tasks dated within the last 7 days.
    pub weekly: usize,
    /// Closed tasks dated within the last 30 days.
    pub monthly: usize,
    pub avg_per_week: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Burndown {
    pub completed: usize,
    pub remaining: usize,
    /// Completed share of all tasks, rounded percent.
    pub rate: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletionForecast {
    pub weeks_to_complete: u64,
    pub estimated_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trend {
    /// Week-over-week change in closed tasks, rounded percent.
    pub value: i64,
    pub direction: TrendDirection,
}

impl Default for Trend {
    fn default() -> Self {
        Self {
            value: 0,
            direction: TrendDirection::Stable,
        }
    }
}

/// Throughput, burndown and completion forecast for a task set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VelocityReport {
    pub velocity: Velocity,
    pub burndown: Burndown,
    /// Started, not ended, running longer than [`BLOCKED_AFTER_HOURS`].
    pub blockers: Vec<NormalizedTask>,
    /// Share of closed tasks finished within 120 minutes, rounded percent.
    pub quality: i64,
    pub forecast: CompletionForecast,
    pub trend: Trend,
}

fn is_blocked(task: &NormalizedTask, now: NaiveDateTime) -> bool {
    if !task.raw.has_start() || task.raw.has_end() {
        return false;
    }
    task.raw
        .parsed_start(now.date())
        .is_some_and(|start| now - start > Duration::hours(BLOCKED_AFTER_HOURS))
}

/// Compute team velocity over `tasks`.
///
/// Completion here uses the loose rule from [`is_closed`], so an end-only
/// record counts toward throughput even though the aggregator treats it as
/// not started.
pub fn compute_velocity(tasks: &[NormalizedTask], now: NaiveDateTime) -> VelocityReport {
    if tasks.is_empty() {
        return VelocityReport::default();
    }

    let today = now.date();
    let week_ago = now - Duration::days(7);
    let two_weeks_ago = now - Duration::days(14);
    let month_ago = now - Duration::days(30);

    let closed: Vec<&NormalizedTask> = tasks.iter().filter(|t| is_closed(t)).collect();
    let dates: Vec<NaiveDateTime> = closed
        .iter()
        .filter_map(|t| best_activity_date(t, today))
        .collect();

    let weekly = dates.iter().filter(|d| **d >= week_ago).count();
    let monthly = dates.iter().filter(|d| **d >= month_ago).count();
    let last_week = dates
        .iter()
        .filter(|d| **d >= two_weeks_ago && **d < week_ago)
        .count();

    let remaining = tasks.len() - closed.len();
    let avg_per_week = monthly as f64 / 4.0;
    let weeks_to_complete = if avg_per_week > 0.0 {
        (remaining as f64 / avg_per_week).ceil() as u64
    } else {
        0
    };
    let horizon = Duration::weeks(weeks_to_complete as i64);
    let estimated_date = (weeks_to_complete > 0).then(|| (now + horizon).date());

    let quick_enough = closed
        .iter()
        .filter(|t| t.duration_minutes <= MEDIUM_TASK_MAX_MINUTES)
        .count();

    let trend = if last_week > 0 {
        (weekly as f64 - last_week as f64) / last_week as f64 * 100.0
    } else if weekly > 0 {
        100.0
    } else {
        0.0
    };

    let blockers: Vec<NormalizedTask> = tasks
        .iter()
        .filter(|t| is_blocked(t, now))
        .cloned()
        .collect();

    log::debug!(
        "Velocity: {} closed of {}, {} this week, {} blocked",
        closed.len(),
        tasks.len(),
        weekly,
        blockers.len()
    );

    VelocityReport {
        velocity: Velocity {
            weekly,
            monthly,
            avg_per_week: round1(avg_per_week),
        },
        burndown: Burndown {
            completed: closed.len(),
            remaining,
            rate: percent(closed.len(), tasks.len()).round() as i64,
        },
        blockers,
        quality: percent(quick_enough, closed.len()).round() as i64,
        forecast: CompletionForecast {
            weeks_to_complete,
            estimated_date,
        },
        trend: Trend {
            value: trend.round() as i64,
            direction: TrendDirection::from_change(trend),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{normalize, RawTask};

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-03-20 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn closed_on(id: i64, day: &str, start: &str, end: &str) -> RawTask {
        RawTask::new(id, "t", "a")
            .created(&format!("{day} 08:00:00"))
            .started(start)
            .ended(end)
    }

    fn sample() -> Vec<NormalizedTask> {
        let raw = vec![
            closed_on(1, "2025-03-18", "10:00:00", "10:30:00"),
            closed_on(2, "2025-03-17", "10:00:00", "15:00:00"),
            closed_on(3, "2025-03-10", "10:00:00", "11:00:00"),
            closed_on(4, "2025-02-10", "10:00:00", "11:00:00"),
            // end-only record still counts toward throughput
            RawTask::new(5, "t", "a").ended("2025-03-19 09:00:00"),
            RawTask::new(6, "t", "a").started("2025-03-15 09:00:00"),
            RawTask::new(7, "t", "a").started("2025-03-19 09:00:00"),
            RawTask::new(8, "t", "a"),
        ];
        normalize(&raw, now()).all()
    }

    #[test]
    fn test_empty_input() {
        let report = compute_velocity(&[], now());
        assert_eq!(report.velocity.weekly, 0);
        assert_eq!(report.burndown.rate, 0);
        assert_eq!(report.forecast.weeks_to_complete, 0);
        assert_eq!(report.trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_velocity_windows() {
        let report = compute_velocity(&sample(), now());
        assert_eq!(report.velocity.weekly, 3);
        assert_eq!(report.velocity.monthly, 4);
        assert_eq!(report.velocity.avg_per_week, 1.0);
    }

    #[test]
    fn test_burndown_and_forecast() {
        let report = compute_velocity(&sample(), now());
        assert_eq!(report.burndown.completed, 5);
        assert_eq!(report.burndown.remaining, 3);
        assert_eq!(report.burndown.rate, 63);
        assert_eq!(report.forecast.weeks_to_complete, 3);
        assert_eq!(
            report.forecast.estimated_date,
            NaiveDate::from_ymd_opt(2025, 4, 10)
        );
    }

    #[test]
    fn test_quality_and_trend() {
        let report = compute_velocity(&sample(), now());
        // only the 300 minute task exceeds 120
        assert_eq!(report.quality, 80);
        // 3 this week vs 1 the week before
        assert_eq!(report.trend.value, 200);
        assert_eq!(report.trend.direction, TrendDirection::Up);
    }

    #[test]
    fn test_trend_without_previous_week() {
        let raw = vec![closed_on(1, "2025-03-18", "10:00:00", "11:00:00")];
        let report = compute_velocity(&normalize(&raw, now()).all(), now());
        assert_eq!(report.trend.value, 100);
    }

    #[test]
    fn test_blockers() {
        let report = compute_velocity(&sample(), now());
        let ids: Vec<i64> = report.blockers.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![6]);
    }
}
