//! Weather Monitoring Service - Main Daemon
//!
//! A server-side daemon that continuously:
//! 1. Polls the station telemetry API into an in-memory cache
//! 2. Falls back to stale data and backs off while the API is down
//! 3. Classifies water level and rainfall against alert thresholds
//! 4. Logs stations needing attention and stations gone offline
//!
//! The one-shot subcommands print the same views the web layer consumes,
//! as JSON on stdout.
//!
//! Usage:
//!   wxmon_service run
//!   wxmon_service snapshot [--force] [--station St3]
//!   wxmon_service series --metric water-level [--date 2024-11-23] [--station St1]
//!   wxmon_service date-range
//!   wxmon_service status
//!
//! Environment:
//!   WXMON_CONFIG            - path to the TOML configuration (default wxmon.toml)
//!   WXMON_API_URL           - telemetry endpoint override
//!   WXMON_API_TIMEOUT_SECS  - request timeout override
//!   WXMON_LOG_JSON          - emit JSON logs
//!   RUST_LOG                - log filter

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use wxmon_service::analysis::intervals::validate_target_date;
use wxmon_service::config::load_config;
use wxmon_service::daemon::Daemon;
use wxmon_service::ingest::telemetry::HttpSource;
use wxmon_service::logging;

#[derive(Parser)]
#[command(name = "wxmon_service")]
#[command(about = "Weather and water-level monitoring service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricArg {
    Precipitation,
    WaterLevel,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the telemetry API until interrupted
    Run,
    /// Print the dashboard snapshot, or one station's report
    Snapshot {
        /// Bypass a fresh cache
        #[arg(short, long)]
        force: bool,

        /// Report on this station id only
        #[arg(short, long)]
        station: Option<String>,
    },
    /// Print a 24-hour series for one metric
    Series {
        #[arg(short, long, value_enum)]
        metric: MetricArg,

        /// Display date as YYYY-MM-DD (defaults to the latest reading's date)
        #[arg(short, long)]
        date: Option<String>,

        /// Restrict output to one station id
        #[arg(short, long)]
        station: Option<String>,
    },
    /// Print the span of dates present in the current readings
    DateRange,
    /// Print the fetch cache status after one fetch
    Status,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_daemon() -> Result<Daemon<HttpSource>> {
    let config = load_config().context("failed to load configuration")?;
    Daemon::from_config(config).context("failed to build telemetry client")
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    let daemon = build_daemon()?;

    match cli.command {
        Commands::Run => {
            info!(stations = daemon.registry().len(), "weather monitoring service starting");
            daemon.run();
        }
        Commands::Snapshot {
            force,
            station: None,
        } => print_json(&daemon.snapshot(force))?,
        Commands::Snapshot {
            force,
            station: Some(id),
        } => match daemon.station_report(force, &id) {
            Some(report) => print_json(&report)?,
            None => anyhow::bail!("unknown station '{id}'"),
        },
        Commands::Series {
            metric,
            date,
            station,
        } => {
            let target = date
                .as_deref()
                .map(|raw| validate_target_date(raw, Local::now().naive_local()))
                .transpose()?;
            let station = station.as_deref();
            match metric {
                MetricArg::Precipitation => {
                    print_json(&daemon.precipitation_series(target, station))?
                }
                MetricArg::WaterLevel => print_json(&daemon.water_level_series(target, station))?,
            }
        }
        Commands::DateRange => match daemon.date_range() {
            Some(range) => print_json(&json!({
                "earliest_date": range.earliest.format("%Y-%m-%d").to_string(),
                "latest_date": range.latest.format("%Y-%m-%d").to_string(),
                "earliest_display": range.earliest.format("%B %d, %Y").to_string(),
                "latest_display": range.latest.format("%B %d, %Y").to_string(),
                "total_days": range.total_days(),
            }))?,
            None => anyhow::bail!("no valid timestamps in current readings"),
        },
        Commands::Status => {
            let fetched = daemon.readings(false);
            print_json(&json!({
                "origin": fetched.origin,
                "cache": daemon.cache_status(),
            }))?;
        }
    }

    Ok(())
}
