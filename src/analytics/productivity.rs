use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;

use super::{coefficient_of_variation, percent};
use crate::date_util::{minutes_between, round1};
use crate::metrics::UserStats;
use crate::task::{NormalizedTask, LONG_TASK_MIN_MINUTES, QUICK_TASK_MAX_MINUTES};

/// Working minutes in one nominal day.
const WORKDAY_MINUTES: f64 = 8.0 * 60.0;

/// Hour reported when no completed task has a start in range.
const DEFAULT_PEAK_HOUR: u32 = 9;

/// Team-wide efficiency figures.
#[derive(Debug, Clone, Serialize)]
pub struct ProductivityMetrics {
    /// Mean minutes from creation to start.
    pub avg_response_minutes: f64,
    /// Mean clamped duration of ended tasks.
    pub avg_task_minutes: f64,
    /// Tasks without an end.
    pub incomplete_tasks: usize,
    /// 0–100 evenness of total task counts across users with completions.
    pub load_balance: f64,
    /// Most common start hour of ended tasks.
    pub peak_hour: u32,
    pub quick_ratio: f64,
    pub long_ratio: f64,
    /// Logged work against 8-hour days for every active user, capped at 100.
    pub team_efficiency: f64,
}

/// Compute team productivity over all tasks. Ended tasks count as completed
/// here, matching the velocity metrics.
pub fn productivity_metrics(
    user_stats: &[UserStats],
    tasks: &[NormalizedTask],
    now: NaiveDateTime,
) -> ProductivityMetrics {
    let today = now.date();
    let active: Vec<&UserStats> = user_stats
        .iter()
        .filter(|u| u.completed_tasks > 0)
        .collect();

    let response_times: Vec<i64> = tasks
        .iter()
        .filter(|t| t.raw.has_start())
        .filter_map(|t| {
            let created = t.raw.parsed_created(today)?;
            let started = t.raw.parsed_start(today)?;
            Some(minutes_between(created, started))
        })
        .collect();
    let avg_response_minutes = mean(response_times.iter().map(|&m| m as f64));

    let ended: Vec<&NormalizedTask> = tasks.iter().filter(|t| t.raw.has_end()).collect();
    let total_work: i64 = ended.iter().map(|t| t.duration_minutes).sum();
    let avg_task_minutes = mean(ended.iter().map(|t| t.duration_minutes as f64));

    let load_balance = if active.len() > 1 {
        let counts: Vec<f64> = active.iter().map(|u| u.total_tasks as f64).collect();
        ((1.0 - coefficient_of_variation(&counts)) * 100.0).clamp(0.0, 100.0)
    } else {
        100.0
    };

    let mut hourly = [0usize; 24];
    for start in ended.iter().filter_map(|t| t.raw.parsed_start(today)) {
        hourly[start.hour() as usize] += 1;
    }
    let mut peak_hour = DEFAULT_PEAK_HOUR;
    for hour in DEFAULT_PEAK_HOUR..=23 {
        if hourly[hour as usize] > hourly[peak_hour as usize] {
            peak_hour = hour;
        }
    }

    let quick = ended
        .iter()
        .filter(|t| t.duration_minutes <= QUICK_TASK_MAX_MINUTES)
        .count();
    let long = ended
        .iter()
        .filter(|t| t.duration_minutes > LONG_TASK_MIN_MINUTES)
        .count();

    let team_efficiency = if active.is_empty() {
        0.0
    } else {
        let capacity_per_day = active.len() as f64 * WORKDAY_MINUTES;
        let days = (total_work as f64 / capacity_per_day).ceil().max(1.0);
        (total_work as f64 / (capacity_per_day * days) * 100.0).min(100.0)
    };

    ProductivityMetrics {
        avg_response_minutes: round1(avg_response_minutes),
        avg_task_minutes: round1(avg_task_minutes),
        incomplete_tasks: tasks.len() - ended.len(),
        load_balance: round1(load_balance),
        peak_hour,
        quick_ratio: round1(percent(quick, ended.len())),
        long_ratio: round1(percent(long, ended.len())),
        team_efficiency: round1(team_efficiency),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
