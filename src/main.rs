//! CLI entry point for the coastal feed synchronizer.
//!
//! `watch` keeps a live dashboard session in sync with the telemetry feed;
//! the remaining subcommands talk to the backend's request/response API.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coastal_feed_sync::api::{BasicClient, DashboardApi};
use coastal_feed_sync::config::SyncConfig;
use coastal_feed_sync::feed::WsConnector;
use coastal_feed_sync::model::Severity;
use coastal_feed_sync::regions::{self, COASTAL_REGIONS};
use coastal_feed_sync::runtime::run_session;
use coastal_feed_sync::session::{DashboardSession, SessionCommand};
use coastal_feed_sync::sink::{CsvWindowSink, JsonSnapshotSink, TracingSink};
use reqwest::Url;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "coastal_feed_sync")]
#[command(about = "Live coastal sensor dashboard synchronizer", long_about = None)]
struct Cli {
    /// Dashboard origin the feed and API are served from (overrides DASHBOARD_ORIGIN)
    #[arg(long, global = true, value_name = "URL")]
    origin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the live feed for a region. Type a region name or `lat,lon` on
    /// stdin to change the selection.
    Watch {
        /// Region to display first (overrides DEFAULT_REGION)
        #[arg(short, long)]
        region: Option<String>,

        /// Samples kept in the chart window (overrides SYNC_WINDOW_CAPACITY)
        #[arg(short, long)]
        capacity: Option<usize>,

        /// Rewrite this CSV file with the chart window on every update
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,

        /// Rewrite this JSON file with the full dashboard state on every update
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,
    },
    /// List the known coastal regions
    Regions,
    /// Check that the backend is reachable
    Check,
    /// Submit a manual alert
    ManualAlert {
        /// Alert message
        #[arg(default_value = "Test manual alert - please ignore")]
        message: String,

        /// low, medium or high
        #[arg(short, long, default_value = "medium")]
        severity: String,
    },
    /// Download the alert export
    ExportAlerts {
        /// File to write the export to
        #[arg(short, long, default_value = "alerts_export.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_logging()?;

    let cli = Cli::parse();
    let mut config = SyncConfig::from_env()?;
    if let Some(origin) = &cli.origin {
        config.origin = Url::parse(origin).with_context(|| format!("invalid origin '{origin}'"))?;
    }

    match cli.command {
        Commands::Watch {
            region,
            capacity,
            csv,
            json,
        } => {
            if let Some(name) = region {
                config.region = regions::find(&name)
                    .with_context(|| format!("unknown coastal region '{name}'"))?;
            }
            if let Some(capacity) = capacity {
                config.window_capacity = capacity;
            }
            config.validate()?;
            watch_feed(config, csv, json).await?;
        }
        Commands::Regions => {
            for region in COASTAL_REGIONS {
                info!(
                    name = region.name,
                    country = region.country,
                    lat = region.position.lat,
                    lon = region.position.lon,
                    "Region"
                );
            }
        }
        Commands::Check => {
            let api = DashboardApi::new(BasicClient::new()?, config.origin.clone())?;
            if let Err(e) = api.check_backend().await {
                error!(error = %e, "Could not reach backend");
                return Err(e);
            }
        }
        Commands::ManualAlert { message, severity } => {
            let severity: Severity = severity.parse()?;
            let api = DashboardApi::new(BasicClient::new()?, config.origin.clone())?;
            match api.submit_manual_alert(&message, severity).await? {
                Some(alert) => info!(id = %alert.id, "Manual alert stored"),
                None => info!("Manual alert submitted"),
            }
        }
        Commands::ExportAlerts { output } => {
            let api = DashboardApi::new(BasicClient::new()?, config.origin.clone())?;
            api.export_alerts(&output).await?;
        }
    }

    Ok(())
}

/// Colored stderr logging plus a JSON daily rolling log file.
fn init_logging() -> Result<WorkerGuard> {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/coastal_feed_sync.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("coastal_feed_sync.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(guard)
}

#[tracing::instrument(skip_all, fields(region = config.region.name, origin = %config.origin))]
async fn watch_feed(config: SyncConfig, csv: Option<PathBuf>, json: Option<PathBuf>) -> Result<()> {
    let feed_url = config.feed_url()?;
    let mut session = DashboardSession::new(&config, feed_url).with_sink(TracingSink);
    if let Some(path) = csv {
        info!(path = %path.display(), "Writing chart window CSV");
        session = session.with_sink(CsvWindowSink::new(path));
    }
    if let Some(path) = json {
        info!(path = %path.display(), "Writing dashboard snapshot JSON");
        session = session.with_sink(JsonSnapshotSink::new(path));
    }

    let (command_tx, command_rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match SessionCommand::parse(&line) {
                    Some(command) => {
                        if command_tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    None => warn!(input = %line.trim(), "Unrecognized region or coordinates"),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
    });

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!(error = %e, "Unable to listen for shutdown signal"),
        }
        let _ = shutdown_tx.send(true);
    });

    info!("Watching feed. Press Ctrl+C to stop.");
    let session = run_session(session, Arc::new(WsConnector::new()), command_rx, shutdown_rx).await?;

    let stats = session.stats();
    info!(
        acceptance_pct = stats.acceptance_pct(),
        stats = %serde_json::to_string(&stats)?,
        "Feed session finished"
    );
    Ok(())
}
