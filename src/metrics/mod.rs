pub mod types;

pub use types::*;

use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::task::{dedupe_by_id, NormalizedTask};

/// Group tasks by assignee and compute a rollup per user.
///
/// Tasks without an assignee are skipped. Output is ordered by total work
/// minutes, highest first; ties keep first-seen assignee order.
pub fn aggregate_by_user(tasks: &[NormalizedTask]) -> Vec<UserStats> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<NormalizedTask>)> = Vec::new();

    for task in tasks {
        if !task.raw.has_assignee() {
            continue;
        }
        let name = task.assignee();
        match index.get(name) {
            Some(&i) => groups[i].1.push(task.clone()),
            None => {
                index.insert(name, groups.len());
                groups.push((name, vec![task.clone()]));
            }
        }
    }

    let mut stats: Vec<UserStats> = groups
        .into_iter()
        .map(|(name, user_tasks)| compute_user_stats(name, &user_tasks))
        .collect();
    stats.sort_by_key(|s| Reverse(s.total_work_minutes));
    stats
}

/// Rollup for one assignee's tasks.
pub fn compute_user_stats(assignee: &str, tasks: &[NormalizedTask]) -> UserStats {
    let tasks = dedupe_by_id(tasks);

    let completed: Vec<&NormalizedTask> = tasks.iter().filter(|t| t.is_completed).collect();
    let completed_where = |pred: fn(&NormalizedTask) -> bool| -> Vec<NormalizedTask> {
        let picked: Vec<NormalizedTask> = completed
            .iter()
            .filter(|t| pred(t))
            .map(|t| (*t).clone())
            .collect();
        dedupe_by_id(&picked)
    };

    let total_work_minutes: i64 = completed.iter().map(|t| t.duration_minutes).sum();
    let total_overtime_minutes: i64 = completed.iter().map(|t| t.overtime_minutes).sum();
    let overtime_start_tasks = completed_where(|t| t.is_overtime_start);
    let overtime_start_minutes = overtime_start_tasks
        .iter()
        .map(|t| t.duration_minutes)
        .sum();

    let average_task_minutes = if completed.is_empty() {
        0.0
    } else {
        total_work_minutes as f64 / completed.len() as f64
    };

    let current_tasks: Vec<NormalizedTask> = tasks
        .iter()
        .filter(|t| t.is_in_progress())
        .cloned()
        .collect();
    let not_started_tasks: Vec<NormalizedTask> = tasks
        .iter()
        .filter(|t| t.is_not_started())
        .cloned()
        .collect();

    let mut all_tasks = tasks.clone();
    all_tasks.sort_by_key(|t| Reverse(t.duration_minutes));

    UserStats {
        assignee: assignee.to_string(),
        total_tasks: tasks.len(),
        completed_tasks: completed.len(),
        total_work_minutes,
        long_running_tasks: completed_where(NormalizedTask::is_long_running),
        overtime_start_tasks,
        overtime_minute_tasks: completed_where(|t| t.has_overtime_minutes),
        quick_tasks: completed_where(NormalizedTask::is_quick),
        medium_tasks: completed_where(NormalizedTask::is_medium),
        current_tasks,
        not_started_tasks,
        all_tasks,
        total_overtime_minutes,
        overtime_start_minutes,
        average_task_minutes,
    }
}

/// Team totals over user rollups plus the unassigned partition.
pub fn summarize_team(user_stats: &[UserStats], unassigned: &[NormalizedTask]) -> TeamSummary {
    let mut summary = TeamSummary {
        total_users: user_stats.len(),
        ..TeamSummary::default()
    };

    for u in user_stats {
        summary.total_tasks += u.total_tasks;
        summary.completed_tasks += u.completed_tasks;
        summary.current_tasks += u.current_tasks.len();
        summary.not_started_tasks += u.not_started_tasks.len();
        summary.total_work_minutes += u.total_work_minutes;
        summary.total_overtime_minutes += u.total_overtime_minutes;
        summary.long_running_tasks += u.long_running_tasks.len();
        summary.overtime_start_tasks += u.overtime_start_tasks.len();
        summary.overtime_minute_tasks += u.overtime_minute_tasks.len();
        summary.quick_tasks += u.quick_tasks.len();
        summary.medium_tasks += u.medium_tasks.len();
        if u.completed_tasks > 0 {
            summary.active_users += 1;
        }
    }
    summary.incomplete_tasks = summary.current_tasks + summary.not_started_tasks;

    if summary.active_users > 0 {
        summary.average_tasks_per_user =
            (summary.completed_tasks as f64 / summary.active_users as f64).round() as u64;
    }

    summary.unassigned = UnassignedSummary {
        total: unassigned.len(),
        completed: unassigned.iter().filter(|t| t.is_completed).count(),
        in_progress: unassigned.iter().filter(|t| t.is_in_progress()).count(),
    };

    summary
}

/// Sort key for user listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserSort {
    Name,
    Tasks,
    Completed,
    #[default]
    WorkTime,
    LongTasks,
    OvertimeTasks,
    QuickTasks,
    MediumTasks,
}

impl FromStr for UserSort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "name" | "assignee" => Ok(UserSort::Name),
            "tasks" | "total" => Ok(UserSort::Tasks),
            "completed" => Ok(UserSort::Completed),
            "work" | "worktime" | "time" => Ok(UserSort::WorkTime),
            "long" | "longtasks" => Ok(UserSort::LongTasks),
            "overtime" | "overtimetasks" => Ok(UserSort::OvertimeTasks),
            "quick" | "quicktasks" => Ok(UserSort::QuickTasks),
            "medium" | "mediumtasks" => Ok(UserSort::MediumTasks),
            _ => Err(Error::Filter(format!("unknown sort field: {s}"))),
        }
    }
}

impl UserSort {
    fn compare(&self, a: &UserStats, b: &UserStats) -> Ordering {
        match self {
            UserSort::Name => a.assignee.cmp(&b.assignee),
            UserSort::Tasks => a.total_tasks.cmp(&b.total_tasks),
            UserSort::Completed => a.completed_tasks.cmp(&b.completed_tasks),
            UserSort::WorkTime => a.total_work_minutes.cmp(&b.total_work_minutes),
            UserSort::LongTasks => a.long_running_tasks.len().cmp(&b.long_running_tasks.len()),
            UserSort::OvertimeTasks => a
                .overtime_start_tasks
                .len()
                .cmp(&b.overtime_start_tasks.len()),
            UserSort::QuickTasks => a.quick_tasks.len().cmp(&b.quick_tasks.len()),
            UserSort::MediumTasks => a.medium_tasks.len().cmp(&b.medium_tasks.len()),
        }
    }
}

/// Listing options over user rollups.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    /// Case-insensitive substring of the assignee name.
    pub search: Option<String>,
    /// Keep only users with at least one long-running task.
    pub long_only: bool,
    pub sort: UserSort,
    pub ascending: bool,
}

/// Filter and order user rollups for display.
pub fn select_users(stats: &[UserStats], query: &UserQuery) -> Vec<UserStats> {
    let needle = query.search.as_deref().map(str::to_lowercase);
    let mut selected: Vec<UserStats> = stats
        .iter()
        .filter(|u| {
            needle
                .as_deref()
                .is_none_or(|n| u.assignee.to_lowercase().contains(n))
        })
        .filter(|u| !query.long_only || !u.long_running_tasks.is_empty())
        .cloned()
        .collect();
    selected.sort_by(|a, b| {
        let ord = query.sort.compare(a, b);
        if query.ascending {
            ord
        } else {
            ord.reverse()
        }
    });
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{normalize, RawTask};
    use chrono::NaiveDateTime;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-03-20 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn done(id: i64, user: &str, start: &str, end: &str) -> RawTask {
        RawTask::new(id, "t", user)
            .created("2025-03-10 08:00:00")
            .started(start)
            .ended(end)
    }

    fn alice_tasks() -> Vec<RawTask> {
        vec![
            done(1, "alice", "09:00:00", "09:20:00"),  // 20m quick
            done(2, "alice", "10:00:00", "11:30:00"),  // 90m medium
            done(3, "alice", "09:00:00", "15:00:00"),  // 360m long
            done(4, "alice", "17:00:00", "19:00:00"),  // 120m medium, overtime
            RawTask::new(5, "t", "alice").started("2025-03-10 10:00:00"),
            RawTask::new(6, "t", "alice"),
            RawTask::new(7, "t", "alice").ended("2025-03-10 10:00:00"),
        ]
    }

    #[test]
    fn test_partition_is_exhaustive() {
        let normalized = normalize(&alice_tasks(), now());
        let stats = aggregate_by_user(&normalized.assigned);
        assert_eq!(stats.len(), 1);
        let alice = &stats[0];
        assert_eq!(alice.total_tasks, 7);
        assert_eq!(
            alice.completed_tasks + alice.current_tasks.len() + alice.not_started_tasks.len(),
            7
        );
        assert_eq!(alice.completed_tasks, 4);
        assert_eq!(alice.current_tasks.len(), 1);
        assert_eq!(alice.not_started_tasks.len(), 2);
    }

    #[test]
    fn test_totals_and_categories() {
        let normalized = normalize(&alice_tasks(), now());
        let alice = &aggregate_by_user(&normalized.assigned)[0];
        assert_eq!(alice.total_work_minutes, 20 + 90 + 360 + 120);
        assert_eq!(alice.total_overtime_minutes, 120);
        assert_eq!(alice.quick_tasks.len(), 1);
        assert_eq!(alice.medium_tasks.len(), 2);
        assert_eq!(alice.long_running_tasks.len(), 1);
        assert_eq!(alice.overtime_start_tasks.len(), 1);
        assert_eq!(alice.overtime_start_minutes, 120);
        assert_eq!(alice.overtime_minute_tasks.len(), 1);
        assert_eq!(alice.average_task_minutes, 590.0 / 4.0);
        // quick list never picks up unfinished zero-length tasks
        assert!(alice.quick_tasks.iter().all(|t| t.is_completed));
    }

    #[test]
    fn test_all_tasks_sorted_by_duration() {
        let normalized = normalize(&alice_tasks(), now());
        let alice = &aggregate_by_user(&normalized.assigned)[0];
        let durations: Vec<i64> = alice.all_tasks.iter().map(|t| t.duration_minutes).collect();
        let mut sorted = durations.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(durations, sorted);
        assert_eq!(alice.all_tasks[0].id(), 3);
    }

    #[test]
    fn test_users_sorted_by_work_time() {
        let tasks = vec![
            done(1, "alice", "09:00:00", "09:30:00"),
            done(2, "bob", "09:00:00", "12:00:00"),
            RawTask::new(3, "t", "carol"),
        ];
        let normalized = normalize(&tasks, now());
        let stats = aggregate_by_user(&normalized.assigned);
        let names: Vec<&str> = stats.iter().map(|s| s.assignee.as_str()).collect();
        assert_eq!(names, vec!["bob", "alice", "carol"]);
        assert_eq!(stats[2].average_task_minutes, 0.0);
    }

    #[test]
    fn test_duplicate_input_is_not_double_counted() {
        let normalized = normalize(&[done(1, "alice", "09:00:00", "10:00:00")], now());
        let task = normalized.assigned[0].clone();
        let doubled = vec![task.clone(), task];
        let stats = aggregate_by_user(&doubled);
        assert_eq!(stats[0].total_tasks, 1);
        assert_eq!(stats[0].total_work_minutes, 60);
    }

    #[test]
    fn test_unassigned_tasks_are_skipped() {
        let normalized = normalize(&[RawTask::new(1, "t", "")], now());
        assert!(aggregate_by_user(&normalized.all()).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_by_user(&[]).is_empty());
        let summary = summarize_team(&[], &[]);
        assert_eq!(summary.total_users, 0);
        assert_eq!(summary.average_tasks_per_user, 0);
    }

    #[test]
    fn test_select_users() {
        let tasks = vec![
            done(1, "alice", "09:00:00", "15:00:00"),
            done(2, "bob", "09:00:00", "09:10:00"),
            done(3, "bob", "10:00:00", "10:10:00"),
            done(4, "albert", "09:00:00", "10:00:00"),
        ];
        let stats = aggregate_by_user(&normalize(&tasks, now()).assigned);
        let names = |q: &UserQuery| -> Vec<String> {
            select_users(&stats, q)
                .into_iter()
                .map(|u| u.assignee)
                .collect()
        };

        assert_eq!(names(&UserQuery::default()), vec!["alice", "albert", "bob"]);
        let query = UserQuery {
            search: Some("AL".to_string()),
            sort: UserSort::Name,
            ascending: true,
            ..UserQuery::default()
        };
        assert_eq!(names(&query), vec!["albert", "alice"]);
        let query = UserQuery {
            long_only: true,
            ..UserQuery::default()
        };
        assert_eq!(names(&query), vec!["alice"]);
        let query = UserQuery {
            sort: "completed".parse().unwrap(),
            ..UserQuery::default()
        };
        assert_eq!(names(&query)[0], "bob");
        assert!("speed".parse::<UserSort>().is_err());
    }

    #[test]
    fn test_summarize_team() {
        let mut tasks = alice_tasks();
        tasks.push(done(10, "bob", "09:00:00", "09:10:00"));
        tasks.push(RawTask::new(11, "t", "").started("2025-03-10 10:00:00"));
        tasks.push(done(12, "", "09:00:00", "10:00:00"));
        let normalized = normalize(&tasks, now());
        let stats = aggregate_by_user(&normalized.assigned);
        let summary = summarize_team(&stats, &normalized.unassigned);

        assert_eq!(summary.total_users, 2);
        assert_eq!(summary.active_users, 2);
        assert_eq!(summary.total_tasks, 8);
        assert_eq!(summary.completed_tasks, 5);
        assert_eq!(summary.incomplete_tasks, 3);
        assert_eq!(summary.quick_tasks, 2);
        assert_eq!(summary.average_tasks_per_user, 3); // 5 / 2 = 2.5 rounds up
        assert_eq!(summary.unassigned.total, 2);
        assert_eq!(summary.unassigned.completed, 1);
        assert_eq!(summary.unassigned.in_progress, 1);
    }
}
