pub mod analytics;
pub mod config;
pub mod date_util;
pub mod error;
pub mod insights;
pub mod metrics;
pub mod query;
pub mod report;
pub mod source;
pub mod task;

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

pub use analytics::{
    build_heatmap, build_timeline, compute_velocity, compute_workload_balance, detect_zombies,
    forecast_workload, productivity_metrics, DayBucket, Heatmap, HeatmapCell, ProductivityMetrics,
    TrendDirection, VelocityReport, WorkloadBalance, WorkloadForecast,
};
pub use config::Config;
pub use date_util::format_duration;
pub use error::{Error, Result};
pub use insights::{generate_alerts, generate_insights, Alert, Insight, InsightKind, Severity};
pub use metrics::{
    aggregate_by_user, select_users, summarize_team, TeamSummary, UserQuery, UserSort, UserStats,
};
pub use query::{
    apply_filters, available_creators, available_identifiers, available_months, filter_by_month,
    FilterSpec, MonthFilter, StatusFilter,
};
pub use report::{build_report, DashboardReport, ReportOptions, Snapshot};
pub use task::{normalize, NormalizedTask, NormalizedTasks, RawTask, SizeCategory, TaskStatus};

/// Main entry point: a loaded task snapshot plus the settings it came from.
pub struct TaskDash {
    config: Config,
    source: PathBuf,
    tasks: Vec<RawTask>,
}

impl TaskDash {
    pub fn new(config: Config, source: PathBuf, tasks: Vec<RawTask>) -> Self {
        Self {
            config,
            source,
            tasks,
        }
    }

    /// Load the data file named by `file`, else the config, else `./tasks.json`.
    pub fn open(config: Config, file: Option<&Path>) -> Result<Self> {
        let source = config.data_file(file);
        let tasks = source::load_tasks(&source)?;
        Ok(Self::new(config, source, tasks))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path the tasks were loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn tasks(&self) -> &[RawTask] {
        &self.tasks
    }

    /// Month scope from the flag, then the config, then the month of `now`.
    pub fn month(&self, flag: Option<&str>, now: NaiveDateTime) -> Result<MonthFilter> {
        self.config.month(flag, MonthFilter::current(now))
    }

    pub fn months(&self, now: NaiveDateTime) -> Vec<String> {
        available_months(&self.tasks, now)
    }

    pub fn creators(&self) -> Vec<String> {
        available_creators(&self.tasks)
    }

    pub fn identifiers(&self) -> Vec<String> {
        available_identifiers(&self.tasks)
    }

    pub fn snapshot(&self, options: &ReportOptions, now: NaiveDateTime) -> Snapshot {
        Snapshot::build(&self.tasks, options, now)
    }

    pub fn report(&self, options: &ReportOptions, now: NaiveDateTime) -> DashboardReport {
        build_report(&self.tasks, options, now)
    }
}
