use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde_json::json;

use testpulse::analysis::{
    available_test_names, calculate_test_metrics, compare_periods, compare_tests,
    generate_timeline, sort_metrics, team_performance, DateRange, ExecutiveKpis,
    ExecutiveSummary, MetricsSortField, QualityDistribution, RecordFilter, SortDirection,
    StatusBuckets, SummaryStats, TimelineStats,
};
use testpulse::config::{DashboardConfig, LoggingConfig};
use testpulse::ingest::{export_csv, ManualEntry};
use testpulse::report;

#[derive(Parser)]
#[command(
    name = "testpulse",
    about = "Test-execution analytics: per-test metrics, daily timelines and period comparisons",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides config)
    #[arg(long, global = true, env = "TESTPULSE_DB")]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Record selection shared by the report commands.
#[derive(Args, Debug, Clone, Default)]
struct RangeArgs {
    /// Range start (date or RFC 3339 timestamp, UTC)
    #[arg(long)]
    start: Option<String>,

    /// Range end, inclusive; a bare date covers the whole day
    #[arg(long)]
    end: Option<String>,

    /// Comma-separated test names
    #[arg(long)]
    tests: Option<String>,

    /// Ignore the default window and use every record
    #[arg(long)]
    all: bool,
}

impl RangeArgs {
    /// Without explicit dates, the last `window_days` days (0 = everything).
    fn filter(&self, window_days: u32) -> Result<RecordFilter> {
        let tests = RecordFilter::parse_test_list(self.tests.as_deref());
        let explicit = self.start.is_some() || self.end.is_some();
        let range = if explicit || self.all {
            DateRange::parse_bounds(self.start.as_deref(), self.end.as_deref())?
        } else {
            DateRange::recent(Utc::now(), window_days)
        };
        Ok(RecordFilter::new(range, tests))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Record one test execution
    Add {
        #[arg(long)]
        test_name: String,

        /// Start time (date or RFC 3339 timestamp)
        #[arg(long)]
        date: String,

        /// Duration in seconds
        #[arg(long)]
        duration: String,

        /// Success rate in percent (0-100)
        #[arg(long)]
        success_rate: String,

        #[arg(long)]
        cost: String,
    },

    /// Import executions from a CSV file
    Import {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Export executions as CSV
    Export {
        #[command(flatten)]
        range: RangeArgs,

        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// List the distinct test names on record
    Tests {
        #[arg(long)]
        json: bool,
    },

    /// Per-test metrics with an overall summary
    Metrics {
        #[command(flatten)]
        range: RangeArgs,

        /// Sort column
        #[arg(long, default_value = "test_name")]
        sort: String,

        /// asc or desc
        #[arg(long, default_value = "asc")]
        dir: String,

        #[arg(long)]
        json: bool,
    },

    /// Daily run counts, cost and success
    Timeline {
        #[command(flatten)]
        range: RangeArgs,

        #[arg(long)]
        json: bool,
    },

    /// Compare a period against a baseline period
    Compare {
        /// Current period start (defaults to the reporting window)
        #[arg(long, requires = "end")]
        start: Option<String>,

        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Baseline start (defaults to the previous calendar month)
        #[arg(long, requires = "baseline_end")]
        baseline_start: Option<String>,

        #[arg(long, requires = "baseline_start")]
        baseline_end: Option<String>,

        /// Comma-separated test names
        #[arg(long)]
        tests: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Group tests into working well / needs attention / at risk
    Status {
        #[command(flatten)]
        range: RangeArgs,

        #[arg(long)]
        json: bool,
    },

    /// Insert synthetic history for trying things out
    SeedDemo {
        /// Days of history ending now
        #[arg(long, default_value = "30")]
        days: u32,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config warnings are logged before the configured subscriber exists.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .finish();
    let config = tracing::subscriber::with_default(bootstrap, || {
        DashboardConfig::resolve(cli.config.as_deref())
    })?;
    init_tracing(&config.logging);

    let db_path = cli.db.clone().unwrap_or_else(|| config.storage.db_path.clone());
    let window = config.dashboard.default_window_days;

    if let Commands::Serve { bind } = &cli.command {
        let bind = bind.clone().unwrap_or_else(|| config.server.bind.clone());
        tracing::info!(%bind, %db_path, "Starting testpulse API");
        return testpulse::serve(&bind, &db_path, window).await;
    }

    let (backend, mut store) = testpulse::open(&db_path).await?;

    match cli.command {
        Commands::Serve { .. } => {}
        Commands::Add {
            test_name,
            date,
            duration,
            success_rate,
            cost,
        } => {
            let entry = ManualEntry {
                test_name,
                start_time: date,
                duration_secs: duration,
                success_rate_pct: success_rate,
                cost,
            };
            let record = store.add_manual(backend.as_ref(), entry).await?;
            println!("Added {} ({})", record.test_name, record.id);
        }
        Commands::Import { file, json } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let import = store.import_csv(backend.as_ref(), &text).await?;
            if json {
                print_json(&import)?;
            } else {
                println!(
                    "Imported {} record(s), {} error(s)",
                    import.success_count, import.error_count
                );
                for err in &import.errors {
                    println!("  line {}: {}", err.line, err.reason);
                }
            }
        }
        Commands::Export { range, output } => {
            let records = range.filter(0)?.apply(store.records());
            let csv = export_csv(&records);
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Exported {} record(s) to {}", records.len(), path.display());
                }
                None => print!("{}", csv),
            }
        }
        Commands::Tests { json } => {
            let names = available_test_names(store.records());
            if json {
                print_json(&names)?;
            } else if names.is_empty() {
                println!("No executions recorded.");
            } else {
                for name in names {
                    println!("{}", name);
                }
            }
        }
        Commands::Metrics {
            range,
            sort,
            dir,
            json,
        } => {
            let field: MetricsSortField = sort.parse().map_err(anyhow::Error::msg)?;
            let direction: SortDirection = dir.parse().map_err(anyhow::Error::msg)?;
            let records = range.filter(window)?.apply(store.records());
            let mut metrics = calculate_test_metrics(&records);
            let summary = SummaryStats::from_metrics(&metrics);
            sort_metrics(&mut metrics, field, direction);
            if json {
                print_json(&json!({ "metrics": metrics, "summary": summary }))?;
            } else {
                println!("{}\n", report::format_summary(&summary));
                print!("{}", report::metrics_table(&metrics));
            }
        }
        Commands::Timeline { range, json } => {
            let records = range.filter(window)?.apply(store.records());
            let points = generate_timeline(&records);
            let stats = TimelineStats::from_points(&points);
            if json {
                print_json(&json!({ "points": points, "stats": stats }))?;
            } else {
                print!("{}", report::timeline_table(&points, &stats));
            }
        }
        Commands::Compare {
            start,
            end,
            baseline_start,
            baseline_end,
            tests,
            json,
        } => {
            let now = Utc::now();
            let names = RecordFilter::parse_test_list(tests.as_deref());
            let current_filter = RecordFilter::new(
                DateRange::parse_or(
                    start.as_deref(),
                    end.as_deref(),
                    DateRange::recent(now, window),
                )?,
                names.clone(),
            );
            let baseline = DateRange::parse_or(
                baseline_start.as_deref(),
                baseline_end.as_deref(),
                DateRange::previous_month(now),
            )?;
            let baseline_filter = RecordFilter::new(baseline, names);
            let current = calculate_test_metrics(&current_filter.apply(store.records()));
            let previous = calculate_test_metrics(&baseline_filter.apply(store.records()));
            if current.is_empty() && previous.is_empty() {
                bail!("no executions in either period");
            }

            let periods = compare_periods(&current, &previous);
            let per_test = compare_tests(&current, &previous);
            let kpis = ExecutiveKpis::compute(&current, &previous);
            let summary = ExecutiveSummary::compute(&current, &previous);
            if json {
                print_json(&json!({
                    "current": current_filter.range,
                    "baseline": baseline_filter.range,
                    "periods": periods,
                    "tests": per_test,
                    "kpis": kpis,
                    "summary": summary,
                }))?;
            } else {
                print!("{}", report::executive_summary(&summary));
                println!();
                print!("{}", report::comparison_table(&periods));
                println!();
                print!("{}", report::test_comparison_table(&per_test));
                println!();
                print!("{}", report::kpi_summary(&kpis));
            }
        }
        Commands::Status { range, json } => {
            let records = range.filter(window)?.apply(store.records());
            let metrics = calculate_test_metrics(&records);
            let buckets = StatusBuckets::from_metrics(&metrics);
            let distribution = QualityDistribution::from_metrics(&metrics);
            let teams = team_performance(&metrics);
            if json {
                print_json(&json!({
                    "buckets": buckets,
                    "distribution": distribution,
                    "teams": teams,
                }))?;
            } else {
                print!("{}", report::status_report(&buckets));
                println!();
                print!("{}", report::quality_distribution(&distribution));
                println!();
                print!("{}", report::team_table(&teams));
            }
        }
        Commands::SeedDemo { days } => {
            let batch =
                testpulse::demo::generate_demo_data(Utc::now(), days, &mut rand::thread_rng());
            let mut inserted = 0usize;
            for candidate in batch {
                store.add(backend.as_ref(), candidate).await?;
                inserted += 1;
            }
            tracing::info!(inserted, "Demo data seeded");
            println!("Seeded {} demo execution(s) over {} day(s)", inserted, days);
        }
    }

    Ok(())
}
