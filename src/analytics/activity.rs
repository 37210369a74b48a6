use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::date_util::{is_blank, minutes_between, parse_datetime};
use crate::task::NormalizedTask;

/// Most recent day buckets kept by [`build_timeline`].
pub const TIMELINE_DAYS: usize = 30;

/// First and last hour covered by the heatmap, inclusive.
pub const HEATMAP_FIRST_HOUR: u32 = 9;
pub const HEATMAP_LAST_HOUR: u32 = 23;
pub const HEATMAP_HOURS: usize = (HEATMAP_LAST_HOUR - HEATMAP_FIRST_HOUR + 1) as usize;

/// Tasks retained per heatmap cell. Counts are always exact.
pub const HEATMAP_CELL_TASK_LIMIT: usize = 10;

/// Per-day activity rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub total_tasks: usize,
    /// Tasks with both a start and an end.
    pub completed_tasks: usize,
    /// Work minutes of the completed tasks.
    pub total_time: i64,
}

impl DayBucket {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            total_tasks: 0,
            completed_tasks: 0,
            total_time: 0,
        }
    }
}

/// Day a task is filed under on the timeline: creation, else start, else end.
fn timeline_date(task: &NormalizedTask, today: NaiveDate) -> Option<NaiveDate> {
    let raw = &task.raw;
    let source = [&raw.created_at, &raw.started_at, &raw.ended_at]
        .into_iter()
        .map(|v| v.as_deref())
        .find(|v| !is_blank(*v))?;
    parse_datetime(source, raw.creation_date(), today).map(|dt| dt.date())
}

/// Clamped duration, or the raw start-to-end span when clamping left nothing.
fn work_minutes(task: &NormalizedTask, today: NaiveDate) -> i64 {
    if task.duration_minutes > 0 {
        return task.duration_minutes;
    }
    match (task.raw.parsed_start(today), task.raw.parsed_end(today)) {
        (Some(start), Some(end)) => minutes_between(start, end),
        _ => 0,
    }
}

/// Bucket tasks by calendar day and keep the most recent
/// [`TIMELINE_DAYS`] buckets, oldest first.
pub fn build_timeline(tasks: &[NormalizedTask], now: NaiveDateTime) -> Vec<DayBucket> {
    let today = now.date();
    let mut seen = HashSet::new();
    let mut days: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();

    for task in tasks {
        if !seen.insert(task.id()) {
            continue;
        }
        let Some(date) = timeline_date(task, today) else {
            continue;
        };
        let bucket = days.entry(date).or_insert_with(|| DayBucket::new(date));
        bucket.total_tasks += 1;
        if task.raw.has_start() && task.raw.has_end() {
            bucket.completed_tasks += 1;
            bucket.total_time += work_minutes(task, today);
        }
    }

    let skip = days.len().saturating_sub(TIMELINE_DAYS);
    let timeline: Vec<DayBucket> = days.into_values().skip(skip).collect();
    log::debug!(
        "Timeline: {} days from {} tasks",
        timeline.len(),
        tasks.len()
    );
    timeline
}

/// One weekday/hour slot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeatmapCell {
    pub count: usize,
    /// Up to [`HEATMAP_CELL_TASK_LIMIT`] of the tasks counted here.
    pub tasks: Vec<NormalizedTask>,
}

/// Task starts by weekday (Monday first) and hour 9 through 23.
#[derive(Debug, Clone, Serialize)]
pub struct Heatmap {
    pub cells: [[HeatmapCell; HEATMAP_HOURS]; 7],
    pub total: usize,
}

impl Default for Heatmap {
    fn default() -> Self {
        Self {
            cells: std::array::from_fn(|_| std::array::from_fn(|_| HeatmapCell::default())),
            total: 0,
        }
    }
}

impl Heatmap {
    /// Cell for `weekday` (0 = Monday) and clock `hour`, if the hour is covered.
    pub fn cell(&self, weekday: usize, hour: u32) -> Option<&HeatmapCell> {
        let index = hour_index(hour)?;
        self.cells.get(weekday).map(|row| &row[index])
    }

    /// Largest cell count, for scaling.
    pub fn max_count(&self) -> usize {
        self.cells
            .iter()
            .flat_map(|row| row.iter().map(|c| c.count))
            .max()
            .unwrap_or(0)
    }

    fn record(&mut self, at: NaiveDateTime, task: &NormalizedTask) {
        let Some(index) = hour_index(at.hour()) else {
            return;
        };
        let weekday = at.weekday().num_days_from_monday() as usize;
        let cell = &mut self.cells[weekday][index];
        cell.count += 1;
        if cell.tasks.len() < HEATMAP_CELL_TASK_LIMIT {
            cell.tasks.push(task.clone());
        }
        self.total += 1;
    }
}

fn hour_index(hour: u32) -> Option<usize> {
    (HEATMAP_FIRST_HOUR..=HEATMAP_LAST_HOUR)
        .contains(&hour)
        .then(|| (hour - HEATMAP_FIRST_HOUR) as usize)
}

/// Count task starts per weekday and hour. Tasks without a parseable start,
/// or starting outside 9:00–23:59, are left out.
pub fn build_heatmap(tasks: &[NormalizedTask], now: NaiveDateTime) -> Heatmap {
    let today = now.date();
    let mut seen = HashSet::new();
    let mut heatmap = Heatmap::default();

    for task in tasks {
        if !task.raw.has_start() || !seen.insert(task.id()) {
            continue;
        }
        if let Some(start) = task.raw.parsed_start(today) {
            heatmap.record(start, task);
        }
    }

    log::debug!("Heatmap: {} starts placed", heatmap.total);
    heatmap
}
