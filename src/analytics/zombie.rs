use chrono::{Duration, NaiveDateTime};

use crate::task::NormalizedTask;

/// Days without activity after which an open task counts as a zombie.
pub const ZOMBIE_AGE_DAYS: i64 = 7;

/// Last known activity: start time if present, else creation time.
fn last_activity(task: &NormalizedTask, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let today = now.date();
    if task.raw.has_start() {
        task.raw.parsed_start(today)
    } else {
        task.raw.parsed_created(today)
    }
}

/// Open tasks whose last activity is more than [`ZOMBIE_AGE_DAYS`] before
/// `now`. Tasks with unparseable timestamps are never flagged.
pub fn detect_zombies(tasks: &[NormalizedTask], now: NaiveDateTime) -> Vec<NormalizedTask> {
    let cutoff = now - Duration::days(ZOMBIE_AGE_DAYS);
    let zombies: Vec<NormalizedTask> = tasks
        .iter()
        .filter(|t| !t.raw.has_end())
        .filter(|t| last_activity(t, now).is_some_and(|at| at < cutoff))
        .cloned()
        .collect();
    log::debug!("Detected {} zombie tasks", zombies.len());
    zombies
}

/// Whole days since the task's last activity.
pub fn idle_days(task: &NormalizedTask, now: NaiveDateTime) -> Option<i64> {
    last_activity(task, now).map(|at| (now - at).num_days())
}
