use std::cmp::Reverse;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::{coefficient_of_variation, end_time, TrendDirection};
use crate::date_util::round1;
use crate::metrics::UserStats;
use crate::task::NormalizedTask;

/// Sample tasks kept per overloaded/underloaded entry.
pub const SAMPLE_TASK_LIMIT: usize = 5;

/// In-progress count at which a user is always overloaded.
const OVERLOAD_ABSOLUTE: usize = 3;
const OVERLOAD_FACTOR: f64 = 1.8;

/// One user flagged by the balance check.
#[derive(Debug, Clone, Serialize)]
pub struct LoadEntry {
    pub username: String,
    pub active_tasks: usize,
    /// At most [`SAMPLE_TASK_LIMIT`] of the user's in-progress tasks.
    pub sample_tasks: Vec<NormalizedTask>,
}

impl LoadEntry {
    fn from_user(user: &UserStats) -> Self {
        Self {
            username: user.assignee.clone(),
            active_tasks: user.active_task_count(),
            sample_tasks: user
                .current_tasks
                .iter()
                .take(SAMPLE_TASK_LIMIT)
                .cloned()
                .collect(),
        }
    }
}

/// How evenly in-progress work is spread across the team.
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadBalance {
    pub total_active_users: usize,
    pub max_active: usize,
    pub min_active: usize,
    /// Mean in-progress count, rounded to one decimal.
    pub avg_active: f64,
    /// 0–100, higher is more even.
    pub balance_score: u32,
    pub overloaded: Vec<LoadEntry>,
    pub underloaded: Vec<LoadEntry>,
}

impl Default for WorkloadBalance {
    fn default() -> Self {
        Self {
            total_active_users: 0,
            max_active: 0,
            min_active: 0,
            avg_active: 0.0,
            balance_score: 100,
            overloaded: Vec::new(),
            underloaded: Vec::new(),
        }
    }
}

/// Score the spread of in-progress tasks across users that have any tasks.
///
/// When nobody has work in progress the score falls back to completed
/// counts. A spread of exactly one task scores a flat 85; larger spreads use
/// the coefficient of variation.
pub fn compute_workload_balance(user_stats: &[UserStats]) -> WorkloadBalance {
    let active: Vec<&UserStats> = user_stats.iter().filter(|u| u.total_tasks > 0).collect();
    if active.is_empty() {
        return WorkloadBalance::default();
    }

    let counts: Vec<usize> = active.iter().map(|u| u.active_task_count()).collect();
    let max_active = counts.iter().copied().max().unwrap_or(0);
    let min_active = counts.iter().copied().min().unwrap_or(0);
    let avg_active = counts.iter().sum::<usize>() as f64 / counts.len() as f64;

    let mut score = 100.0;
    if active.len() > 1 {
        if max_active == 0 {
            let completed: Vec<usize> = active.iter().map(|u| u.completed_tasks).collect();
            let max_completed = completed.iter().copied().max().unwrap_or(0);
            let min_completed = completed.iter().copied().min().unwrap_or(0);
            if max_completed > 0 {
                let spread = (max_completed - min_completed) as f64;
                score = ((1.0 - spread / max_completed as f64) * 100.0).max(0.0);
            }
        } else {
            score = match max_active - min_active {
                0 => 100.0,
                1 => 85.0,
                _ => {
                    let values: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
                    ((1.0 - coefficient_of_variation(&values)) * 100.0).clamp(0.0, 100.0)
                }
            };
        }
    }

    let overloaded = active
        .iter()
        .filter(|u| {
            let current = u.active_task_count();
            current >= OVERLOAD_ABSOLUTE
                || (avg_active > 1.0 && current as f64 > avg_active * OVERLOAD_FACTOR)
        })
        .map(|u| LoadEntry::from_user(u))
        .collect();

    let underloaded = active
        .iter()
        .filter(|u| avg_active > 0.5 && u.active_task_count() == 0 && u.completed_tasks > 0)
        .map(|u| LoadEntry::from_user(u))
        .collect();

    let balance = WorkloadBalance {
        total_active_users: active.len(),
        max_active,
        min_active,
        avg_active: round1(avg_active),
        balance_score: score.round() as u32,
        overloaded,
        underloaded,
    };
    log::debug!(
        "Workload balance: {} users, score {}",
        balance.total_active_users,
        balance.balance_score
    );
    balance
}

/// Fallback average task length when a user has no completed history.
pub const DEFAULT_TASK_MINUTES: f64 = 120.0;
/// Minimum assumed weekly throughput per user.
pub const MIN_WEEKLY_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    fn from_utilization(pct: f64) -> Self {
        if pct > 100.0 {
            RiskLevel::High
        } else if pct > 80.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Projected load for one user.
#[derive(Debug, Clone, Serialize)]
pub struct UserForecast {
    pub username: String,
    pub current_tasks: usize,
    /// Hours needed to clear current work at the user's average pace.
    pub estimated_hours: f64,
    /// Tasks per week, from completed history.
    pub weekly_capacity: usize,
    pub weekly_hours: f64,
    pub utilization_pct: i64,
    pub risk_level: RiskLevel,
}

/// Team capacity projection.
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadForecast {
    /// Highest utilization first.
    pub users: Vec<UserForecast>,
    pub high_risk: Vec<String>,
    pub medium_risk: Vec<String>,
    /// Tasks ended in the last 7 days.
    pub completed_last_week: usize,
    /// Tasks ended 7–14 days ago.
    pub completed_week_before: usize,
    pub velocity_change_pct: i64,
    pub velocity_direction: TrendDirection,
    pub total_current_tasks: usize,
    pub weeks_to_complete: u64,
    pub estimated_completion: Option<NaiveDate>,
    /// Spare weekly slots on low-risk users.
    pub available_capacity: usize,
    /// Tasks above weekly capacity on high-risk users.
    pub excess_load: usize,
    pub can_rebalance: bool,
}

fn forecast_user(user: &UserStats) -> UserForecast {
    let current = user.active_task_count();
    let avg_minutes = if user.average_task_minutes > 0.0 {
        user.average_task_minutes
    } else {
        DEFAULT_TASK_MINUTES
    };
    let estimated_hours = current as f64 * avg_minutes / 60.0;
    let weekly_capacity = if user.completed_tasks > 0 {
        MIN_WEEKLY_CAPACITY.max(user.completed_tasks.div_ceil(4))
    } else {
        MIN_WEEKLY_CAPACITY
    };
    let weekly_hours = weekly_capacity as f64 * avg_minutes / 60.0;
    let utilization = if weekly_hours > 0.0 {
        estimated_hours / weekly_hours * 100.0
    } else {
        0.0
    };

    UserForecast {
        username: user.assignee.clone(),
        current_tasks: current,
        estimated_hours: round1(estimated_hours),
        weekly_capacity,
        weekly_hours: round1(weekly_hours),
        utilization_pct: utilization.round() as i64,
        risk_level: RiskLevel::from_utilization(utilization),
    }
}

/// Project per-user utilization and team throughput from current load and
/// the last two weeks of completions.
pub fn forecast_workload(
    user_stats: &[UserStats],
    tasks: &[NormalizedTask],
    now: NaiveDateTime,
) -> WorkloadForecast {
    let mut users: Vec<UserForecast> = user_stats.iter().map(forecast_user).collect();
    users.sort_by_key(|u| Reverse(u.utilization_pct));

    let names_at = |level: RiskLevel| -> Vec<String> {
        users
            .iter()
            .filter(|u| u.risk_level == level)
            .map(|u| u.username.clone())
            .collect()
    };
    let high_risk = names_at(RiskLevel::High);
    let medium_risk = names_at(RiskLevel::Medium);

    let (completed_last_week, completed_week_before) = weekly_completions(tasks, now);
    let change = if completed_week_before > 0 {
        let delta = completed_last_week as f64 - completed_week_before as f64;
        delta / completed_week_before as f64 * 100.0
    } else {
        0.0
    };

    let total_current_tasks: usize = users.iter().map(|u| u.current_tasks).sum();
    let avg_velocity = ((completed_last_week + completed_week_before) as f64 / 2.0).max(1.0);
    let weeks_to_complete = if total_current_tasks > 0 {
        (total_current_tasks as f64 / avg_velocity).ceil() as u64
    } else {
        0
    };
    let horizon = Duration::weeks(weeks_to_complete as i64);
    let estimated_completion = (weeks_to_complete > 0).then(|| (now + horizon).date());

    let available_capacity = users
        .iter()
        .filter(|u| u.risk_level == RiskLevel::Low)
        .map(|u| u.weekly_capacity.saturating_sub(u.current_tasks))
        .sum();
    let excess_load = users
        .iter()
        .filter(|u| u.risk_level == RiskLevel::High)
        .map(|u| u.current_tasks.saturating_sub(u.weekly_capacity))
        .sum();

    WorkloadForecast {
        users,
        high_risk,
        medium_risk,
        completed_last_week,
        completed_week_before,
        velocity_change_pct: change.round() as i64,
        velocity_direction: TrendDirection::from_change(change),
        total_current_tasks,
        weeks_to_complete,
        estimated_completion,
        available_capacity,
        excess_load,
        can_rebalance: available_capacity >= excess_load,
    }
}

/// Tasks ended in `[now-7d, ..)` and in `[now-14d, now-7d)`.
pub(crate) fn weekly_completions(tasks: &[NormalizedTask], now: NaiveDateTime) -> (usize, usize) {
    let week_ago = now - Duration::days(7);
    let two_weeks_ago = now - Duration::days(14);
    let today = now.date();

    let mut this_week = 0;
    let mut last_week = 0;
    for end in tasks.iter().filter_map(|t| end_time(t, today)) {
        if end >= week_ago {
            this_week += 1;
        } else if end >= two_weeks_ago {
            last_week += 1;
        }
    }
    (this_week, last_week)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::aggregate_by_user;
    use crate::task::{normalize, RawTask};

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-03-20 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn done(id: i64, user: &str) -> RawTask {
        RawTask::new(id, "t", user)
            .created("2025-03-10 08:00:00")
            .started("10:00:00")
            .ended("11:00:00")
    }

    fn open(id: i64, user: &str) -> RawTask {
        RawTask::new(id, "t", user)
            .created("2025-03-10 08:00:00")
            .started("10:00:00")
    }

    fn closed(id: i64, start: &str, end: &str) -> RawTask {
        RawTask::new(id, "t", "a").started(start).ended(end)
    }

    fn stats(raw: &[RawTask]) -> Vec<UserStats> {
        aggregate_by_user(&normalize(raw, now()).assigned)
    }

    fn names(entries: &[LoadEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.username.as_str()).collect()
    }

    #[test]
    fn test_empty_team_is_neutral() {
        let balance = compute_workload_balance(&[]);
        assert_eq!(balance.balance_score, 100);
        assert_eq!(balance.total_active_users, 0);
        assert!(balance.overloaded.is_empty());
        assert!(balance.underloaded.is_empty());
    }

    #[test]
    fn test_overloaded_and_underloaded() {
        // active counts: idle = 0, light = 1, heavy = 5
        let mut raw = vec![done(1, "idle"), open(2, "light")];
        for id in 10..15 {
            raw.push(open(id, "heavy"));
        }
        let balance = compute_workload_balance(&stats(&raw));

        assert_eq!(balance.total_active_users, 3);
        assert_eq!(balance.max_active, 5);
        assert_eq!(balance.min_active, 0);
        assert_eq!(balance.avg_active, 2.0);
        assert_eq!(names(&balance.overloaded), vec!["heavy"]);
        assert_eq!(names(&balance.underloaded), vec!["idle"]);
        // CV of [0, 1, 5] exceeds 1
        assert_eq!(balance.balance_score, 0);
    }

    #[test]
    fn test_sample_tasks_are_capped() {
        let raw: Vec<RawTask> = (1..=8).map(|id| open(id, "busy")).collect();
        let balance = compute_workload_balance(&stats(&raw));
        let entry = &balance.overloaded[0];
        assert_eq!(entry.active_tasks, 8);
        assert_eq!(entry.sample_tasks.len(), SAMPLE_TASK_LIMIT);
    }

    #[test]
    fn test_one_task_spread_scores_85() {
        let raw = vec![open(1, "a"), open(2, "b"), open(3, "b")];
        assert_eq!(compute_workload_balance(&stats(&raw)).balance_score, 85);
    }

    #[test]
    fn test_equal_load_scores_100() {
        let raw = vec![open(1, "a"), open(2, "b")];
        assert_eq!(compute_workload_balance(&stats(&raw)).balance_score, 100);
    }

    #[test]
    fn test_falls_back_to_completed_counts() {
        // nobody has work in progress; completed 4 vs 1
        let mut raw: Vec<RawTask> = (1..=4).map(|id| done(id, "a")).collect();
        raw.push(done(5, "b"));
        let balance = compute_workload_balance(&stats(&raw));
        assert_eq!(balance.max_active, 0);
        assert_eq!(balance.balance_score, 25);
    }

    #[test]
    fn test_single_user_is_balanced() {
        let raw: Vec<RawTask> = (1..=4).map(|id| open(id, "solo")).collect();
        let balance = compute_workload_balance(&stats(&raw));
        assert_eq!(balance.balance_score, 100);
        assert_eq!(balance.overloaded.len(), 1);
    }

    #[test]
    fn test_forecast_user_utilization() {
        // 6 current tasks at the 120 minute fallback against a capacity of 5
        let raw: Vec<RawTask> = (1..=6).map(|id| open(id, "a")).collect();
        let forecast = forecast_workload(&stats(&raw), &[], now());
        let user = &forecast.users[0];
        assert_eq!(user.current_tasks, 6);
        assert_eq!(user.estimated_hours, 12.0);
        assert_eq!(user.weekly_capacity, 5);
        assert_eq!(user.weekly_hours, 10.0);
        assert_eq!(user.utilization_pct, 120);
        assert_eq!(user.risk_level, RiskLevel::High);
        assert_eq!(forecast.high_risk, vec!["a"]);
        assert_eq!(forecast.excess_load, 1);
        assert_eq!(forecast.available_capacity, 0);
        assert!(!forecast.can_rebalance);
    }

    #[test]
    fn test_forecast_sorted_by_utilization() {
        let mut raw = vec![open(1, "light"), done(2, "idle")];
        for id in 10..15 {
            raw.push(open(id, "heavy"));
        }
        let forecast = forecast_workload(&stats(&raw), &[], now());
        let names: Vec<&str> = forecast.users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["heavy", "light", "idle"]);
        assert_eq!(forecast.users[0].risk_level, RiskLevel::Medium);
        // idle has 5 free slots, light has 4
        assert_eq!(forecast.available_capacity, 9);
        assert!(forecast.can_rebalance);
    }

    #[test]
    fn test_forecast_velocity_and_completion() {
        let raw = vec![
            closed(1, "2025-03-18 10:00:00", "2025-03-18 11:00:00"),
            closed(2, "2025-03-17 10:00:00", "2025-03-17 11:00:00"),
            closed(3, "2025-03-10 10:00:00", "2025-03-10 11:00:00"),
            closed(4, "2025-03-01 10:00:00", "2025-03-01 11:00:00"),
            RawTask::new(5, "t", "a").started("2025-03-19 10:00:00"),
            RawTask::new(6, "t", "a").started("2025-03-19 11:00:00"),
            RawTask::new(7, "t", "a").started("2025-03-19 12:00:00"),
        ];
        let normalized = normalize(&raw, now());
        let user_stats = aggregate_by_user(&normalized.assigned);
        let forecast = forecast_workload(&user_stats, &normalized.all(), now());

        assert_eq!(forecast.completed_last_week, 2);
        assert_eq!(forecast.completed_week_before, 1);
        assert_eq!(forecast.velocity_change_pct, 100);
        assert_eq!(forecast.velocity_direction, TrendDirection::Up);
        assert_eq!(forecast.total_current_tasks, 3);
        // 3 current / max(1, 1.5)
        assert_eq!(forecast.weeks_to_complete, 2);
        assert_eq!(
            forecast.estimated_completion,
            NaiveDate::from_ymd_opt(2025, 4, 3)
        );
    }

    #[test]
    fn test_forecast_without_current_work() {
        let forecast = forecast_workload(&stats(&[done(1, "a")]), &[], now());
        assert_eq!(forecast.weeks_to_complete, 0);
        assert!(forecast.estimated_completion.is_none());
        assert_eq!(forecast.velocity_direction, TrendDirection::Stable);
    }
}
