use chrono::NaiveDateTime;
use serde::Serialize;

use crate::analytics::{
    build_heatmap, build_timeline, compute_velocity, compute_workload_balance, detect_zombies,
    forecast_workload, productivity_metrics, DayBucket, Heatmap, ProductivityMetrics,
    VelocityReport, WorkloadBalance, WorkloadForecast,
};
use crate::insights::{generate_alerts, generate_insights, Alert, Insight};
use crate::metrics::{aggregate_by_user, summarize_team, TeamSummary, UserStats};
use crate::query::{available_months, filter_by_month, FilterSpec, MonthFilter};
use crate::task::{normalize, NormalizedTask, NormalizedTasks, RawTask};

/// Scope of one dashboard pass.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub month: MonthFilter,
    pub filters: FilterSpec,
}

/// Derived state for one month scope and filter set, computed against a
/// single reference time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    now: NaiveDateTime,
    month: MonthFilter,
    normalized: NormalizedTasks,
    /// Rollups over the whole month scope.
    user_stats: Vec<UserStats>,
    /// Month-scoped tasks that pass the filters.
    filtered: Vec<NormalizedTask>,
}

impl Snapshot {
    /// Month scope, normalize, aggregate, then apply filters.
    pub fn build(raw: &[RawTask], options: &ReportOptions, now: NaiveDateTime) -> Self {
        let scoped = filter_by_month(raw, &options.month, now);
        let normalized = normalize(&scoped, now);
        let user_stats = aggregate_by_user(&normalized.assigned);
        let filtered = options.filters.apply(&normalized.all(), now);
        log::debug!(
            "Snapshot {}: {} raw, {} in scope, {} after filters",
            options.month,
            raw.len(),
            normalized.len(),
            filtered.len()
        );
        Self {
            now,
            month: options.month,
            normalized,
            user_stats,
            filtered,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn month(&self) -> MonthFilter {
        self.month
    }

    pub fn normalized(&self) -> &NormalizedTasks {
        &self.normalized
    }

    pub fn user_stats(&self) -> &[UserStats] {
        &self.user_stats
    }

    pub fn filtered(&self) -> &[NormalizedTask] {
        &self.filtered
    }

    /// Rollups over the filtered tasks only.
    pub fn filtered_user_stats(&self) -> Vec<UserStats> {
        aggregate_by_user(&self.filtered)
    }

    pub fn unassigned(&self) -> &[NormalizedTask] {
        &self.normalized.unassigned
    }

    pub fn team_summary(&self) -> TeamSummary {
        summarize_team(&self.user_stats, &self.normalized.unassigned)
    }

    pub fn workload_balance(&self) -> WorkloadBalance {
        compute_workload_balance(&self.user_stats)
    }

    pub fn workload_forecast(&self) -> WorkloadForecast {
        forecast_workload(&self.user_stats, &self.filtered, self.now)
    }

    pub fn zombies(&self) -> Vec<NormalizedTask> {
        detect_zombies(&self.filtered, self.now)
    }

    pub fn velocity(&self) -> VelocityReport {
        compute_velocity(&self.filtered, self.now)
    }

    pub fn timeline(&self) -> Vec<DayBucket> {
        build_timeline(&self.filtered, self.now)
    }

    pub fn heatmap(&self) -> Heatmap {
        build_heatmap(&self.filtered, self.now)
    }

    pub fn productivity(&self) -> ProductivityMetrics {
        productivity_metrics(&self.user_stats, &self.filtered, self.now)
    }

    pub fn insights(&self) -> Vec<Insight> {
        generate_insights(&self.user_stats, &self.filtered)
    }

    pub fn alerts(&self) -> Vec<Alert> {
        let balance = self.workload_balance();
        let zombies = self.zombies();
        generate_alerts(
            &self.user_stats,
            &self.filtered,
            &balance,
            &zombies,
            self.now,
        )
    }
}

/// Every derived structure for one dashboard render.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub generated_at: NaiveDateTime,
    pub month: MonthFilter,
    pub available_months: Vec<String>,
    pub total_tasks: usize,
    pub filtered_tasks: usize,
    pub summary: TeamSummary,
    /// Rollups over the filtered tasks.
    pub users: Vec<UserStats>,
    pub unassigned: Vec<NormalizedTask>,
    pub workload: WorkloadBalance,
    pub forecast: WorkloadForecast,
    pub zombies: Vec<NormalizedTask>,
    pub velocity: VelocityReport,
    pub timeline: Vec<DayBucket>,
    pub heatmap: Heatmap,
    pub productivity: ProductivityMetrics,
    pub insights: Vec<Insight>,
    pub alerts: Vec<Alert>,
}

/// Run the full pipeline once over `raw` with a single `now`.
pub fn build_report(
    raw: &[RawTask],
    options: &ReportOptions,
    now: NaiveDateTime,
) -> DashboardReport {
    let snapshot = Snapshot::build(raw, options, now);
    let workload = snapshot.workload_balance();
    let zombies = snapshot.zombies();
    let alerts = generate_alerts(
        snapshot.user_stats(),
        snapshot.filtered(),
        &workload,
        &zombies,
        now,
    );

    DashboardReport {
        generated_at: now,
        month: snapshot.month(),
        available_months: available_months(raw, now),
        total_tasks: snapshot.normalized().len(),
        filtered_tasks: snapshot.filtered().len(),
        summary: snapshot.team_summary(),
        users: snapshot.filtered_user_stats(),
        unassigned: snapshot.unassigned().to_vec(),
        forecast: snapshot.workload_forecast(),
        velocity: snapshot.velocity(),
        timeline: snapshot.timeline(),
        heatmap: snapshot.heatmap(),
        productivity: snapshot.productivity(),
        insights: snapshot.insights(),
        workload,
        zombies,
        alerts,
    }
}
