//! Pathwatch Binary Entry Point
//!
//! Runs the network path monitor until interrupted.
//! Core functionality is provided by the `pathwatch` library crate.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use pathwatch::config::parse_duration;
use pathwatch::{AppConfig, Daemon};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pathwatch - Network Path Monitor
#[derive(Parser, Debug)]
#[command(name = "pathwatch", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/pathwatch.yaml",
        env = "PATHWATCH_CONFIG"
    )]
    config: PathBuf,

    /// Archive root (overrides config file)
    #[arg(long, env = "PATHWATCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Delay between cycles, e.g. `30s` or `5m` (overrides config file)
    #[arg(long, env = "PATHWATCH_INTERVAL", value_parser = parse_duration)]
    interval: Option<Duration>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pathwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Pathwatch - Network Path Monitor");

    let cli = Cli::parse();

    // Load configuration from file
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = AppConfig::load(&cli.config)?;

    // CLI > ENV > config file
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(interval) = cli.interval {
        config.interval = interval;
    }
    config.validate()?;
    config.ensure_data_dir()?;

    tracing::info!(
        "Destinations: {}, interval: {:?}, archive: {}",
        config.probe.destinations.len(),
        config.interval,
        config.data_dir.display(),
    );
    if !config.reports_enabled() {
        tracing::warn!("No report section configured; reports are disabled");
    }

    let daemon = Daemon::from_config(&config)?;

    if cli.once {
        let report = daemon.run_once(Local::now().fixed_offset()).await;
        tracing::info!(
            "Single cycle complete: {} summaries, {} reports",
            report.summaries.len(),
            report.dispatched.len()
        );
        return Ok(());
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));
    tracing::info!("Press Ctrl+C to shutdown");

    daemon.run(cancel).await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    tracing::info!("Finishing current cycle before exit...");
    token.cancel();
}
