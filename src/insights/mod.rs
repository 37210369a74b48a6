//! Short human-readable findings over the per-user rollups, plus a
//! prioritized alert feed for the dashboard.

use std::cmp::Reverse;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::analytics::workload::weekly_completions;
use crate::analytics::WorkloadBalance;
use crate::metrics::UserStats;
use crate::task::NormalizedTask;

/// Long-running tasks a user may carry before being called out.
const LONG_TASKS_WARNING: usize = 2;
/// Overtime minutes before a user is called out in insights.
const OVERTIME_INSIGHT_MINUTES: i64 = 120;
const QUICK_TASKS_MASTER: usize = 5;
const TEAM_AVERAGE_TARGET: f64 = 5.0;

/// Overtime minutes before a user raises an alert.
const OVERTIME_ALERT_MINUTES: i64 = 240;
/// Alert detail lists are cut to this many entries.
const ALERT_DETAIL_LIMIT: usize = 3;
const STALE_IN_PROGRESS_DAYS: i64 = 2;
const PRODUCTIVITY_DROP_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
}

impl Insight {
    fn success(title: &str, description: String) -> Self {
        Self {
            kind: InsightKind::Success,
            title: title.to_string(),
            description,
        }
    }

    fn warning(title: &str, description: String) -> Self {
        Self {
            kind: InsightKind::Warning,
            title: title.to_string(),
            description,
        }
    }
}

fn names(users: &[&UserStats]) -> String {
    users
        .iter()
        .map(|u| u.assignee.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generate insights in a fixed rule order. Every rule is evaluated
/// independently; nothing is generated when no user has completed work.
///
/// `_tasks` is the task set the rollups were built from. Every rule reads
/// only the rollups, so the output depends on `user_stats` alone.
pub fn generate_insights(user_stats: &[UserStats], _tasks: &[NormalizedTask]) -> Vec<Insight> {
    let mut insights = Vec::new();

    let active: Vec<&UserStats> = user_stats
        .iter()
        .filter(|u| u.completed_tasks > 0)
        .collect();
    let Some(first) = active.first() else {
        return insights;
    };

    // Ties go to the first user in rollup order.
    let leader = active.iter().copied().fold(*first, |best, u| {
        if u.completed_tasks > best.completed_tasks {
            u
        } else {
            best
        }
    });
    insights.push(Insight::success(
        "Productivity leader",
        format!(
            "{} completed {} tasks",
            leader.assignee, leader.completed_tasks
        ),
    ));

    let timed: Vec<&UserStats> = active
        .iter()
        .copied()
        .filter(|u| u.average_task_minutes > 0.0)
        .collect();
    if let Some(first_timed) = timed.first() {
        let fastest = timed.iter().copied().fold(*first_timed, |best, u| {
            if u.average_task_minutes < best.average_task_minutes {
                u
            } else {
                best
            }
        });
        insights.push(Insight::success(
            "Most efficient",
            format!(
                "{} averages {} min per task",
                fastest.assignee,
                fastest.average_task_minutes.round()
            ),
        ));
    }

    let long_heavy: Vec<&UserStats> = user_stats
        .iter()
        .filter(|u| u.long_running_tasks.len() >= LONG_TASKS_WARNING)
        .collect();
    if !long_heavy.is_empty() {
        insights.push(Insight::warning(
            "Many long tasks",
            format!(
                "{} users have {}+ long tasks: {}",
                long_heavy.len(),
                LONG_TASKS_WARNING,
                names(&long_heavy)
            ),
        ));
    }

    let overtime: Vec<&UserStats> = user_stats
        .iter()
        .filter(|u| u.total_overtime_minutes > OVERTIME_INSIGHT_MINUTES)
        .collect();
    if !overtime.is_empty() {
        insights.push(Insight::warning(
            "Frequent overtime",
            format!(
                "{} users work overtime: {}",
                overtime.len(),
                names(&overtime)
            ),
        ));
    }

    let quick: Vec<&UserStats> = user_stats
        .iter()
        .filter(|u| u.quick_tasks.len() >= QUICK_TASKS_MASTER)
        .collect();
    if let Some(first_quick) = quick.first() {
        let top = quick.iter().copied().fold(*first_quick, |best, u| {
            if u.quick_tasks.len() > best.quick_tasks.len() {
                u
            } else {
                best
            }
        });
        insights.push(Insight::success(
            "Quick task master",
            format!(
                "{} finished {} quick tasks",
                top.assignee,
                top.quick_tasks.len()
            ),
        ));
    }

    let completed: usize = active.iter().map(|u| u.completed_tasks).sum();
    let per_user = completed as f64 / active.len() as f64;
    if per_user >= TEAM_AVERAGE_TARGET {
        insights.push(Insight::success(
            "High team productivity",
            format!("{} tasks per user on average", per_user.round()),
        ));
    }

    log::debug!("Generated {} insights", insights.len());
    insights
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// A dashboard notification. `id` is stable so callers can dismiss it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub details: Vec<String>,
    pub action: String,
    pub priority: u8,
}

fn task_label(task: &NormalizedTask) -> String {
    format!("#{} - {}", task.id(), task.raw.title)
}

/// Build the alert feed, highest priority first.
pub fn generate_alerts(
    user_stats: &[UserStats],
    tasks: &[NormalizedTask],
    balance: &WorkloadBalance,
    zombies: &[NormalizedTask],
    now: NaiveDateTime,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let today = now.date();

    if !zombies.is_empty() {
        alerts.push(Alert {
            id: "zombie-tasks".to_string(),
            severity: Severity::Critical,
            title: "Zombie tasks".to_string(),
            message: format!("{} tasks have not moved in over 7 days", zombies.len()),
            details: zombies
                .iter()
                .take(ALERT_DETAIL_LIMIT)
                .map(task_label)
                .collect(),
            action: "Reassign or close".to_string(),
            priority: 10,
        });
    }

    if !balance.overloaded.is_empty() {
        alerts.push(Alert {
            id: "overloaded-users".to_string(),
            severity: Severity::Warning,
            title: "Team overload".to_string(),
            message: format!("{} members are overloaded", balance.overloaded.len()),
            details: balance
                .overloaded
                .iter()
                .map(|e| format!("{}: {} active tasks", e.username, e.active_tasks))
                .collect(),
            action: "Redistribute work".to_string(),
            priority: 8,
        });
    }

    let stale_cutoff = now - Duration::days(STALE_IN_PROGRESS_DAYS);
    let stale: Vec<&NormalizedTask> = tasks
        .iter()
        .filter(|t| !t.raw.has_end())
        .filter(|t| t.raw.parsed_start(today).is_some_and(|s| s < stale_cutoff))
        .collect();
    if !stale.is_empty() {
        alerts.push(Alert {
            id: "long-running-tasks".to_string(),
            severity: Severity::Warning,
            title: "Long-running work".to_string(),
            message: format!(
                "{} tasks in progress for more than {} days",
                stale.len(),
                STALE_IN_PROGRESS_DAYS
            ),
            details: stale
                .iter()
                .take(ALERT_DETAIL_LIMIT)
                .map(|t| {
                    let who = if t.raw.has_assignee() {
                        t.assignee()
                    } else {
                        "unassigned"
                    };
                    format!("#{} - {}", t.id(), who)
                })
                .collect(),
            action: "Check progress".to_string(),
            priority: 6,
        });
    }

    let unassigned: Vec<&NormalizedTask> = tasks.iter().filter(|t| !t.raw.has_assignee()).collect();
    if !unassigned.is_empty() {
        alerts.push(Alert {
            id: "unassigned-tasks".to_string(),
            severity: Severity::Info,
            title: "Unassigned tasks".to_string(),
            message: format!("{} tasks have no assignee", unassigned.len()),
            details: unassigned
                .iter()
                .take(ALERT_DETAIL_LIMIT)
                .map(|t| task_label(t))
                .collect(),
            action: "Assign owners".to_string(),
            priority: 5,
        });
    }

    let (this_week, last_week) = weekly_completions(tasks, now);
    if last_week > 0 && (this_week as f64) < last_week as f64 * PRODUCTIVITY_DROP_RATIO {
        let drop = (1.0 - this_week as f64 / last_week as f64) * 100.0;
        alerts.push(Alert {
            id: "productivity-drop".to_string(),
            severity: Severity::Warning,
            title: "Productivity drop".to_string(),
            message: format!("Completed {this_week} tasks against {last_week} last week"),
            details: vec![format!("Down {}%", drop.round())],
            action: "Look into the cause".to_string(),
            priority: 7,
        });
    }

    let idle: Vec<&UserStats> = user_stats
        .iter()
        .filter(|u| u.current_tasks.is_empty() && u.completed_tasks > 0)
        .collect();
    if !idle.is_empty() {
        alerts.push(Alert {
            id: "inactive-users".to_string(),
            severity: Severity::Info,
            title: "Members without active tasks".to_string(),
            message: format!("{} members have nothing in progress", idle.len()),
            details: idle
                .iter()
                .take(ALERT_DETAIL_LIMIT)
                .map(|u| u.assignee.clone())
                .collect(),
            action: "Hand out new work".to_string(),
            priority: 3,
        });
    }

    let overtime: Vec<&UserStats> = user_stats
        .iter()
        .filter(|u| u.total_overtime_minutes > OVERTIME_ALERT_MINUTES)
        .collect();
    if !overtime.is_empty() {
        alerts.push(Alert {
            id: "overtime-alert".to_string(),
            severity: Severity::Warning,
            title: "Working hours exceeded".to_string(),
            message: format!("{} members are working overtime", overtime.len()),
            details: overtime
                .iter()
                .map(|u| {
                    let hours = (u.total_overtime_minutes as f64 / 60.0).round();
                    format!("{}: {}h overtime", u.assignee, hours)
                })
                .collect(),
            action: "Reduce load".to_string(),
            priority: 9,
        });
    }

    alerts.sort_by_key(|a| Reverse(a.priority));
    log::debug!("Generated {} alerts", alerts.len());
    alerts
}

/// Drop alerts the caller has dismissed.
pub fn without_dismissed(alerts: Vec<Alert>, dismissed: &[String]) -> Vec<Alert> {
    alerts
        .into_iter()
        .filter(|a| !dismissed.iter().any(|d| d == &a.id))
        .collect()
}
