use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use taskdash::analytics::activity::{HEATMAP_FIRST_HOUR, HEATMAP_HOURS};
use taskdash::analytics::zombie::idle_days;
use taskdash::date_util::parse_reference_time;
use taskdash::insights::without_dismissed;
use taskdash::{
    format_duration, Config, FilterSpec, NormalizedTask, ReportOptions, Snapshot, StatusFilter,
    TaskDash, UserQuery, UserSort, UserStats,
};

#[derive(Parser)]
#[command(name = "taskdash", about = "Task tracking analytics CLI")]
struct Cli {
    /// Task data file (default: config data_file, then ./tasks.json)
    #[arg(long, short)]
    file: Option<PathBuf>,

    /// Config file (default: ~/.taskdash/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Month scope: YYYY-MM or "all" (default: current month)
    #[arg(long, short)]
    month: Option<String>,

    /// Reference time, e.g. "2025-03-20 12:00:00" (default: now)
    #[arg(long)]
    now: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    /// Match title, id, assignee or identifier
    #[arg(long)]
    search: Option<String>,
    /// Exact creator name
    #[arg(long)]
    created_by: Option<String>,
    /// Exact task identifier
    #[arg(long)]
    identifier: Option<String>,
    /// Minimum duration in minutes
    #[arg(long)]
    min_duration: Option<f64>,
    /// Maximum duration in minutes
    #[arg(long)]
    max_duration: Option<f64>,
    /// Created or started on/after date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Created or started on/before date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
    /// all, completed, in-progress, not-started
    #[arg(long, default_value = "all")]
    status: StatusFilter,
}

impl FilterArgs {
    fn to_spec(&self) -> taskdash::Result<FilterSpec> {
        let mut spec = FilterSpec::new().status(self.status);
        if let Some(s) = &self.search {
            spec = spec.search(s);
        }
        if let Some(c) = &self.created_by {
            spec = spec.created_by(c);
        }
        if let Some(i) = &self.identifier {
            spec = spec.task_identifier(i);
        }
        if let Some(m) = self.min_duration {
            spec = spec.min_duration(m);
        }
        if let Some(m) = self.max_duration {
            spec = spec.max_duration(m);
        }
        if let Some(d) = self.from {
            spec = spec.date_from(d);
        }
        if let Some(d) = self.to {
            spec = spec.date_to(d);
        }
        spec.validate()?;
        Ok(spec)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Full dashboard report
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Per-user statistics
    Users {
        /// Filter by assignee name
        #[arg(long)]
        search: Option<String>,
        /// Only users with long-running tasks
        #[arg(long)]
        long_only: bool,
        /// name, tasks, completed, work, long, overtime, quick, medium
        #[arg(long, default_value = "work")]
        sort: UserSort,
        /// Sort ascending
        #[arg(long)]
        asc: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Team totals
    Team {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Tasks without an assignee
    Unassigned {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Workload balance across the team
    Workload {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Capacity forecast
    Forecast {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Open tasks with no activity for over a week
    Zombies {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Velocity, burndown and trend
    Velocity {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Daily activity for the last 30 active days
    Timeline {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Task starts by weekday and hour
    Heatmap {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Team productivity metrics
    Productivity {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Productivity insights
    Insights {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Prioritized alerts
    Alerts {
        /// Alert ids to hide
        #[arg(long)]
        dismiss: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Months present in the data
    Months {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List tasks with filters
    Tasks {
        #[command(flatten)]
        filters: FilterArgs,
        /// Maximum results
        #[arg(long, default_value = "100")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Count only (no output rows)
        #[arg(long)]
        count: bool,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Commands::Config { action } = &cli.command {
        return handle_config(&config, action, &cli);
    }

    let now = match &cli.now {
        Some(s) => parse_reference_time(s)?,
        None => chrono::Local::now().naive_local(),
    };

    let dash = TaskDash::open(config, cli.file.as_deref())?;
    let month = dash.month(cli.month.as_deref(), now)?;
    let options = ReportOptions {
        month,
        filters: FilterSpec::default(),
    };

    match cli.command {
        Commands::Report { filters, json } => {
            let options = ReportOptions {
                month,
                filters: filters.to_spec()?,
            };
            let report = dash.report(&options, now);
            if json {
                print_json(&report)?;
            } else {
                let snapshot = dash.snapshot(&options, now);
                print_report(&snapshot);
            }
        }
        Commands::Users {
            search,
            long_only,
            sort,
            asc,
            json,
        } => {
            let snapshot = dash.snapshot(&options, now);
            let query = UserQuery {
                search,
                long_only,
                sort,
                ascending: asc,
            };
            let users = taskdash::select_users(snapshot.user_stats(), &query);
            if json {
                print_json(&users)?;
            } else if users.is_empty() {
                println!("No users found.");
            } else {
                for user in &users {
                    print_user(user);
                }
            }
        }
        Commands::Team { json } => {
            let summary = dash.snapshot(&options, now).team_summary();
            if json {
                print_json(&summary)?;
            } else {
                print_team(&summary);
            }
        }
        Commands::Unassigned { json } => {
            let snapshot = dash.snapshot(&options, now);
            if json {
                print_json(&snapshot.unassigned())?;
            } else {
                print_task_list(snapshot.unassigned(), "No unassigned tasks.");
            }
        }
        Commands::Workload { json } => {
            let balance = dash.snapshot(&options, now).workload_balance();
            if json {
                print_json(&balance)?;
            } else {
                print_workload(&balance);
            }
        }
        Commands::Forecast { json } => {
            let forecast = dash.snapshot(&options, now).workload_forecast();
            if json {
                print_json(&forecast)?;
            } else {
                print_forecast(&forecast);
            }
        }
        Commands::Zombies { json } => {
            let zombies = dash.snapshot(&options, now).zombies();
            if json {
                print_json(&zombies)?;
            } else if zombies.is_empty() {
                println!("No zombie tasks.");
            } else {
                for task in &zombies {
                    let idle = idle_days(task, now).unwrap_or(0);
                    println!("{} | idle {idle} days", task_line(task));
                }
                println!("\n{} zombie tasks", zombies.len());
            }
        }
        Commands::Velocity { json } => {
            let velocity = dash.snapshot(&options, now).velocity();
            if json {
                print_json(&velocity)?;
            } else {
                print_velocity(&velocity);
            }
        }
        Commands::Timeline { json } => {
            let timeline = dash.snapshot(&options, now).timeline();
            if json {
                print_json(&timeline)?;
            } else if timeline.is_empty() {
                println!("No dated tasks.");
            } else {
                println!("Date        Tasks  Done  Time");
                for day in &timeline {
                    println!(
                        "{}  {:>5}  {:>4}  {}",
                        day.date,
                        day.total_tasks,
                        day.completed_tasks,
                        format_duration(day.total_time)
                    );
                }
            }
        }
        Commands::Heatmap { json } => {
            let heatmap = dash.snapshot(&options, now).heatmap();
            if json {
                print_json(&heatmap)?;
            } else {
                print_heatmap(&heatmap);
            }
        }
        Commands::Productivity { json } => {
            let metrics = dash.snapshot(&options, now).productivity();
            if json {
                print_json(&metrics)?;
            } else {
                print_productivity(&metrics);
            }
        }
        Commands::Insights { json } => {
            let insights = dash.snapshot(&options, now).insights();
            if json {
                print_json(&insights)?;
            } else if insights.is_empty() {
                println!("No insights for this period.");
            } else {
                for insight in &insights {
                    let marker = match insight.kind {
                        taskdash::InsightKind::Success => "+",
                        taskdash::InsightKind::Warning => "!",
                    };
                    println!("[{marker}] {}: {}", insight.title, insight.description);
                }
            }
        }
        Commands::Alerts { dismiss, json } => {
            let alerts = without_dismissed(dash.snapshot(&options, now).alerts(), &dismiss);
            if json {
                print_json(&alerts)?;
            } else {
                print_alerts(&alerts);
            }
        }
        Commands::Months { json } => {
            let months = dash.months(now);
            if json {
                print_json(&months)?;
            } else if months.is_empty() {
                println!("No dated tasks.");
            } else {
                for m in &months {
                    println!("{m}");
                }
            }
        }
        Commands::Tasks {
            filters,
            limit,
            json,
            count,
        } => {
            let options = ReportOptions {
                month,
                filters: filters.to_spec()?,
            };
            let snapshot = dash.snapshot(&options, now);
            let tasks = snapshot.filtered();
            if count {
                println!("{}", tasks.len());
            } else if json {
                let shown: Vec<&NormalizedTask> = tasks.iter().take(limit).collect();
                print_json(&shown)?;
            } else {
                print_task_list(&tasks[..tasks.len().min(limit)], "No tasks found.");
                if tasks.len() > limit {
                    println!("({} more not shown)", tasks.len() - limit);
                }
            }
        }
        // handled before the data file is loaded
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn handle_config(config: &Config, action: &ConfigAction, cli: &Cli) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show { json: true } => {
            let effective = Config {
                data_file: Some(config.data_file(cli.file.as_deref())),
                ..config.clone()
            };
            print_json(&effective)?;
        }
        ConfigAction::Show { json: false } => {
            let path = match &cli.config {
                Some(p) => p.clone(),
                None => Config::default_path()?,
            };
            println!("Config file:   {}", path.display());
            println!(
                "Data file:     {}",
                config.data_file(cli.file.as_deref()).display()
            );
            println!(
                "Default month: {}",
                config.default_month.as_deref().unwrap_or("current month")
            );
        }
    }
    Ok(())
}

fn task_line(task: &NormalizedTask) -> String {
    let assignee = if task.raw.has_assignee() {
        task.assignee()
    } else {
        "unassigned"
    };
    format!(
        "[{}] #{} {} - {assignee} | {}",
        task.status.label(),
        task.id(),
        task.raw.title,
        format_duration(task.duration_minutes)
    )
}

fn print_task_list(tasks: &[NormalizedTask], empty: &str) {
    if tasks.is_empty() {
        println!("{empty}");
        return;
    }
    for task in tasks {
        println!("{}", task_line(task));
    }
    println!("\n{} tasks", tasks.len());
}

fn print_report(snapshot: &Snapshot) {
    println!("Dashboard: {}", snapshot.month().label());
    println!();
    print_team(&snapshot.team_summary());
    println!();
    print_workload(&snapshot.workload_balance());
    println!();
    print_velocity(&snapshot.velocity());
    println!();
    print_productivity(&snapshot.productivity());
    println!();
    println!("Insights:");
    for insight in snapshot.insights() {
        println!("  {}: {}", insight.title, insight.description);
    }
    println!();
    print_alerts(&snapshot.alerts());
}

fn print_user(u: &UserStats) {
    println!("{}", u.assignee);
    println!(
        "  Tasks:     {} ({} done, {} in progress, {} not started, {:.0}%)",
        u.total_tasks,
        u.completed_tasks,
        u.current_tasks.len(),
        u.not_started_tasks.len(),
        u.completion_pct()
    );
    println!("  Work time: {}", format_duration(u.total_work_minutes));
    println!(
        "  Average:   {}",
        format_duration(u.average_task_minutes.round() as i64)
    );
    println!("  Overtime:  {}", format_duration(u.total_overtime_minutes));
    println!(
        "  Sizes:     {} quick, {} medium, {} long",
        u.quick_tasks.len(),
        u.medium_tasks.len(),
        u.long_running_tasks.len()
    );
}

fn print_team(s: &taskdash::TeamSummary) {
    println!("Team:");
    println!(
        "  Users:       {} ({} active)",
        s.total_users, s.active_users
    );
    println!(
        "  Tasks:       {} ({} done, {} in progress, {} not started)",
        s.total_tasks, s.completed_tasks, s.current_tasks, s.not_started_tasks
    );
    println!("  Work time:   {}", format_duration(s.total_work_minutes));
    println!(
        "  Overtime:    {}",
        format_duration(s.total_overtime_minutes)
    );
    println!("  Per user:    {} completed", s.average_tasks_per_user);
    println!(
        "  Unassigned:  {} ({} done, {} in progress)",
        s.unassigned.total, s.unassigned.completed, s.unassigned.in_progress
    );
}

fn print_workload(b: &taskdash::WorkloadBalance) {
    println!("Workload:");
    println!("  Balance:   {}/100", b.balance_score);
    println!(
        "  Active:    {}-{} per user (avg {:.1})",
        b.min_active, b.max_active, b.avg_active
    );
    for entry in &b.overloaded {
        println!(
            "  Overloaded:  {} ({} active)",
            entry.username, entry.active_tasks
        );
    }
    for entry in &b.underloaded {
        println!("  Idle:        {}", entry.username);
    }
}

fn print_forecast(f: &taskdash::WorkloadForecast) {
    println!("Forecast:");
    for u in &f.users {
        println!(
            "  {:<20} {:>3} current  {:>5.1}h / {:>5.1}h  {:>4}%  {}",
            u.username,
            u.current_tasks,
            u.estimated_hours,
            u.weekly_hours,
            u.utilization_pct,
            u.risk_level.as_str()
        );
    }
    println!(
        "  Velocity:  {} this week ({} {}%)",
        f.completed_last_week,
        f.velocity_direction.arrow(),
        f.velocity_change_pct
    );
    match f.estimated_completion {
        Some(date) => println!(
            "  Current work done in {} weeks ({date})",
            f.weeks_to_complete
        ),
        None => println!("  No work in progress"),
    }
    let rebalance = if f.can_rebalance {
        "possible"
    } else {
        "not enough capacity"
    };
    println!(
        "  Rebalance: {} free slots vs {} excess ({})",
        f.available_capacity, f.excess_load, rebalance
    );
}

fn print_velocity(v: &taskdash::VelocityReport) {
    println!("Velocity:");
    println!(
        "  Completed: {} this week, {} this month ({:.1}/week)",
        v.velocity.weekly, v.velocity.monthly, v.velocity.avg_per_week
    );
    println!(
        "  Burndown:  {} done, {} remaining ({}%)",
        v.burndown.completed, v.burndown.remaining, v.burndown.rate
    );
    println!("  Quality:   {}% within 2h", v.quality);
    println!(
        "  Trend:     {} {}%",
        v.trend.direction.arrow(),
        v.trend.value
    );
    println!("  Blocked:   {}", v.blockers.len());
    if let Some(date) = v.forecast.estimated_date {
        println!(
            "  Forecast:  {} weeks ({date})",
            v.forecast.weeks_to_complete
        );
    }
}

fn print_heatmap(h: &taskdash::Heatmap) {
    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    print!("     ");
    for i in 0..HEATMAP_HOURS {
        print!("{:>4}", HEATMAP_FIRST_HOUR as usize + i);
    }
    println!();
    for (day, row) in DAYS.iter().zip(h.cells.iter()) {
        print!("{day}  ");
        for cell in row {
            print!("{:>4}", cell.count);
        }
        println!();
    }
    println!("\n{} task starts", h.total);
}

fn print_productivity(m: &taskdash::ProductivityMetrics) {
    println!("Productivity:");
    println!(
        "  Response:   {}",
        format_duration(m.avg_response_minutes.round() as i64)
    );
    println!(
        "  Avg task:   {}",
        format_duration(m.avg_task_minutes.round() as i64)
    );
    println!("  Incomplete: {}", m.incomplete_tasks);
    println!("  Balance:    {:.0}%", m.load_balance);
    println!("  Peak hour:  {}:00", m.peak_hour);
    println!("  Quick/long: {:.1}%/{:.1}%", m.quick_ratio, m.long_ratio);
    println!("  Efficiency: {:.1}%", m.team_efficiency);
}

fn print_alerts(alerts: &[taskdash::Alert]) {
    if alerts.is_empty() {
        println!("No alerts.");
        return;
    }
    println!("Alerts:");
    for a in alerts {
        println!("  [{}] {} ({})", a.severity.as_str(), a.title, a.id);
        println!("    {}", a.message);
        for d in &a.details {
            println!("    - {d}");
        }
        println!("    -> {}", a.action);
    }
}
