use serde::Serialize;

use crate::task::NormalizedTask;

/// Per-assignee rollup over that assignee's tasks.
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub assignee: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Sum of clamped durations over completed tasks.
    pub total_work_minutes: i64,
    /// Completed tasks longer than 300 minutes.
    pub long_running_tasks: Vec<NormalizedTask>,
    /// Completed tasks started between 16:00 and 23:00.
    pub overtime_start_tasks: Vec<NormalizedTask>,
    /// Completed tasks with any minutes past 16:00.
    pub overtime_minute_tasks: Vec<NormalizedTask>,
    pub quick_tasks: Vec<NormalizedTask>,
    pub medium_tasks: Vec<NormalizedTask>,
    /// Started, not ended.
    pub current_tasks: Vec<NormalizedTask>,
    pub not_started_tasks: Vec<NormalizedTask>,
    /// Every task, longest first.
    pub all_tasks: Vec<NormalizedTask>,
    pub total_overtime_minutes: i64,
    /// Duration of completed tasks that were started in overtime.
    pub overtime_start_minutes: i64,
    pub average_task_minutes: f64,
}

impl UserStats {
    pub fn active_task_count(&self) -> usize {
        self.current_tasks.len()
    }

    /// Completed share of all tasks, 0–100.
    pub fn completion_pct(&self) -> f64 {
        if self.total_tasks == 0 {
            0.0
        } else {
            self.completed_tasks as f64 / self.total_tasks as f64 * 100.0
        }
    }
}

/// Unassigned-task counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UnassignedSummary {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
}

/// Team-wide totals across all user rollups.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamSummary {
    pub total_users: usize,
    /// Users with at least one completed task.
    pub active_users: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub current_tasks: usize,
    pub not_started_tasks: usize,
    pub incomplete_tasks: usize,
    pub total_work_minutes: i64,
    pub total_overtime_minutes: i64,
    pub long_running_tasks: usize,
    pub overtime_start_tasks: usize,
    pub overtime_minute_tasks: usize,
    pub quick_tasks: usize,
    pub medium_tasks: usize,
    /// Completed tasks per active user, rounded.
    pub average_tasks_per_user: u64,
    pub unassigned: UnassignedSummary,
}
