//! healwatchd - Self-healing controller daemon
//!
//! Polls the monitored service, opens incidents on confirmed anomalies, runs
//! the recovery pipeline and exposes status, incidents and the live event
//! stream over HTTP.

use clap::Parser;
use healwatch_daemon::error::{DaemonError, DaemonResult};
use healwatch_daemon::{DaemonConfig, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// healwatch daemon CLI
#[derive(Parser)]
#[command(name = "healwatchd")]
#[command(about = "healwatch - Self-healing controller daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "HEALWATCH_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "HEALWATCH_LISTEN_ADDR")]
    listen: Option<String>,

    /// Base URL of the monitored service
    #[arg(long, env = "HEALWATCH_TARGET_URL")]
    target_url: Option<String>,

    /// Base URL of the monitoring backend
    #[arg(long, env = "HEALWATCH_METRICS_URL")]
    metrics_url: Option<String>,

    /// Do not start polling on startup
    #[arg(long)]
    no_auto_start: bool,

    /// Log level
    #[arg(long, env = "HEALWATCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "HEALWATCH_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(url) = cli.target_url {
        config.target.base_url = url;
    }
    if let Some(url) = cli.metrics_url {
        config.metrics.base_url = url;
    }
    if cli.no_auto_start {
        config.orchestrator.auto_start = false;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        poll_interval_secs = config.orchestrator.poll_interval_secs,
        auto_start = config.orchestrator.auto_start,
        "Starting healwatchd"
    );

    let server = Server::new(config)?;
    server.run().await
}
