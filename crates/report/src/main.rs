use anyhow::Context;
use clap::{Parser, Subcommand};
use dashboard_core::stats::breakdown::{service_breakdown, DayWindowQuery};
use dashboard_core::stats::listing::list_requests;
use dashboard_core::stats::summary::weekly_summary;
use dashboard_core::stats::timeseries::{TimeSeriesQuery, TimeSeriesStatsResolver};
use dashboard_core::stats::StatsOptions;
use dashboard_core::storage::memory::MemoryRequestStore;
use dashboard_core::storage::postgres::PgRequestStore;
use dashboard_core::storage::RequestStore;
use dashboard_core::time::days::parse_day;
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "dashboard_report")]
struct Args {
    /// Read requests from an Open311 JSON export instead of DATABASE_URL.
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Reference day (YYYY-MM-DD) for defaulted ranges. Defaults to today at the reporting
    /// offset.
    #[arg(long, global = true)]
    today: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Per-day counts of opened and/or closed requests.
    Days {
        /// open, closed or both.
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        num_days: Option<String>,
    },
    /// Requests per service category.
    Day {
        #[arg(long)]
        begin: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Raw requests opened in a day window.
    Requests {
        #[arg(long)]
        begin: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Week-over-week figures anchored at the latest request.
    Summary,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = dashboard_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    // stdout carries the report; logs go to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let opts = StatsOptions::from(&settings);
    let today = resolve_today(args.today.as_deref(), opts)?;

    let store: Box<dyn RequestStore> = match &args.fixture {
        Some(path) => {
            let store = MemoryRequestStore::from_json_file(path)?;
            tracing::info!(path = %path.display(), requests = store.len(), "loaded fixture");
            Box::new(store)
        }
        None => {
            let db_url = settings.require_database_url()?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(2)
                .connect(db_url)
                .await
                .context("connect DATABASE_URL failed")?;
            Box::new(PgRequestStore::new(pool))
        }
    };

    let report = match run(&args.command, store.as_ref(), opts, today).await {
        Ok(report) => report,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(%today, error = %err, "report failed");
            return Err(err);
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run(
    command: &Command,
    store: &dyn RequestStore,
    opts: StatsOptions,
    today: chrono::NaiveDate,
) -> anyhow::Result<Value> {
    let value = match command {
        Command::Days {
            status,
            start,
            end,
            num_days,
        } => {
            let query = TimeSeriesQuery {
                status: status.clone(),
                start: start.clone(),
                end: end.clone(),
                num_days: num_days.clone(),
            };
            let resolved = TimeSeriesStatsResolver::new(store, opts)
                .resolve(&query, today)
                .await?;
            tracing::info!(
                mode = ?resolved.mode,
                start = %resolved.range.start(),
                end = %resolved.range.end(),
                "resolved ticket series"
            );
            serde_json::to_value(resolved.series.to_points(opts.utc_offset)?)?
        }
        Command::Day { begin, end } => {
            let query = DayWindowQuery {
                begin: begin.clone(),
                end: end.clone(),
            };
            serde_json::to_value(service_breakdown(store, opts, &query, today).await?)?
        }
        Command::Requests { begin, end } => {
            let query = DayWindowQuery {
                begin: begin.clone(),
                end: end.clone(),
            };
            serde_json::to_value(list_requests(store, opts, &query, today).await?)?
        }
        Command::Summary => {
            let summary = weekly_summary(store, opts)
                .await?
                .context("no service requests in store")?;
            serde_json::to_value(summary)?
        }
    };
    Ok(value)
}

fn resolve_today(arg: Option<&str>, opts: StatsOptions) -> anyhow::Result<chrono::NaiveDate> {
    if let Some(s) = arg {
        return Ok(parse_day("today", s)?);
    }
    Ok(dashboard_core::time::days::today(
        chrono::Utc::now(),
        opts.utc_offset,
    ))
}

fn init_sentry(settings: &dashboard_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
