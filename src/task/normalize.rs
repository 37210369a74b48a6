use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::time::{duration_minutes, is_overtime_start, overtime_minutes};
use super::types::{NormalizedTask, RawTask, SizeCategory, TaskStatus};

/// Normalizer output: tasks with an assignee and tasks without one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedTasks {
    pub assigned: Vec<NormalizedTask>,
    pub unassigned: Vec<NormalizedTask>,
}

impl NormalizedTasks {
    /// Every normalized task, assigned first, in input order within each part.
    pub fn all(&self) -> Vec<NormalizedTask> {
        self.assigned
            .iter()
            .chain(self.unassigned.iter())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.assigned.len() + self.unassigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty() && self.unassigned.is_empty()
    }
}

/// Collapse records sharing an `id`. The first occurrence keeps its position;
/// a later duplicate replaces it only if it carries an end time the kept one
/// lacks.
pub fn dedupe_raw(tasks: &[RawTask]) -> Vec<RawTask> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut unique: Vec<RawTask> = Vec::with_capacity(tasks.len());

    for task in tasks {
        match index.get(&task.id) {
            None => {
                index.insert(task.id, unique.len());
                unique.push(task.clone());
            }
            Some(&i) => {
                if task.has_end() && !unique[i].has_end() {
                    unique[i] = task.clone();
                }
            }
        }
    }
    unique
}

/// Keep the first task for every `id`.
pub fn dedupe_by_id(tasks: &[NormalizedTask]) -> Vec<NormalizedTask> {
    let mut seen = std::collections::HashSet::new();
    tasks
        .iter()
        .filter(|t| seen.insert(t.id()))
        .cloned()
        .collect()
}

/// Derive timing and classification fields for a single record.
pub fn normalize_task(task: &RawTask, now: NaiveDateTime) -> NormalizedTask {
    let today = now.date();
    let created = task.creation_date();
    let start = task.started_at.as_deref();
    let end = task.ended_at.as_deref();

    let duration = duration_minutes(start, end, created, today);
    let overtime = overtime_minutes(start, end, created, today);
    let status = TaskStatus::from_flags(task.has_start(), task.has_end());

    NormalizedTask {
        raw: task.clone(),
        duration_minutes: duration,
        overtime_minutes: overtime,
        is_completed: status == TaskStatus::Completed,
        status,
        size_category: SizeCategory::from_minutes(duration),
        is_overtime_start: is_overtime_start(start, created, today),
        has_overtime_minutes: overtime > 0,
    }
}

/// Deduplicate and normalize a raw snapshot, splitting off unassigned tasks.
///
/// `now` only resolves time-only values on records without a creation date.
pub fn normalize(tasks: &[RawTask], now: NaiveDateTime) -> NormalizedTasks {
    let unique = dedupe_raw(tasks);
    if unique.len() != tasks.len() {
        log::debug!(
            "Dropped {} duplicate task records",
            tasks.len() - unique.len()
        );
    }

    let mut out = NormalizedTasks::default();
    for task in &unique {
        let normalized = normalize_task(task, now);
        if task.has_assignee() {
            out.assigned.push(normalized);
        } else {
            out.unassigned.push(normalized);
        }
    }

    log::debug!(
        "Normalized {} tasks ({} assigned, {} unassigned)",
        out.len(),
        out.assigned.len(),
        out.unassigned.len()
    );
    out
}
