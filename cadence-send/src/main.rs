//! cadence-send - daemon that runs the periodic triggers
//!
//! Starts every trigger (publish posts, interaction tasks, trend monitoring,
//! scrapes, generic tasks, daily analytics) and keeps them running until
//! SIGINT or SIGTERM.

use clap::Parser;
use libcadence::logging::LoggingConfig;
use libcadence::platforms::mock::MockPlatform;
use libcadence::platforms::PlatformRegistry;
use libcadence::{CadenceService, Config, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "cadence-send")]
#[command(version)]
#[command(about = "Run Cadence's scheduled triggers")]
#[command(long_about = "\
cadence-send - run Cadence's scheduled triggers

DESCRIPTION:
    cadence-send is a long-running daemon. It starts one loop per trigger
    and executes due posts and tasks against the configured platforms,
    respecting per-platform rate limits.

TRIGGERS (intervals configurable under [scheduling.triggers]):
    publish-posts       every 5m   publish due scheduled posts
    interaction-tasks   every 10m  like / comment / follow / retweet
    monitor-trends      every 2h   trend_monitor tasks
    scrape-tasks        every 6h   scrape tasks
    generic-tasks       every 2m   due tasks of any type
    daily-analytics     every 24h  roll up yesterday's counters

USAGE:
    # Run in foreground (logs to stderr)
    cadence-send

    # Run every trigger once and exit
    cadence-send --once

    # Exercise the pipeline without touching any platform
    cadence-send --dry-run

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (running ticks finish first)

CONFIGURATION:
    Configuration file: ~/.config/cadence/config.toml (or $CADENCE_CONFIG)
    Database location:  ~/.local/share/cadence/cadence.db (or $CADENCE_DB_PATH)

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime error
    2 - Configuration error
")]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Run every trigger once, print the tick summaries as JSON and exit
    #[arg(long)]
    once: bool,

    /// Register logging stand-ins for the enabled platforms
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if cli.dry_run {
        config.adapters.dry_run = true;
    }

    let registry = build_registry(&config);
    let service = CadenceService::from_config(config, registry).await?;

    if cli.once {
        let summaries = service.run_all_once().await;
        let json = serde_json::to_string_pretty(&summaries)
            .map_err(|e| libcadence::CadenceError::InvalidInput(e.to_string()))?;
        println!("{}", json);
        log_rate_limit_usage(&service);
        return Ok(());
    }

    info!("cadence-send daemon starting");
    service.start()?;

    wait_for_shutdown().await;

    info!("Shutdown requested, waiting for running ticks");
    service.stop_all_schedulers().await;
    log_rate_limit_usage(&service);
    info!("cadence-send daemon stopped");
    Ok(())
}

fn log_rate_limit_usage(service: &CadenceService) {
    for usage in service.rate_limiter().usage() {
        info!(
            platform = %usage.platform,
            used = usage.used,
            max_requests = usage.max_requests,
            window = usage.window,
            reset_time = ?usage.reset_time,
            "Rate limit window"
        );
    }
}

/// Adapters for the enabled platforms
///
/// Only dry-run stand-ins ship with Cadence. Without `--dry-run` every task
/// fails with "<platform> service not configured" until a real adapter is
/// registered.
fn build_registry(config: &Config) -> PlatformRegistry {
    let mut registry = PlatformRegistry::new();

    if config.adapters.dry_run {
        for platform in &config.adapters.enabled {
            info!("Registering dry-run adapter for {}", platform);
            registry.register(Arc::new(MockPlatform::dry_run(*platform)));
        }
    }

    if registry.is_empty() {
        warn!("No platform adapters registered; due work will be marked not configured");
    }

    registry
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use futures::StreamExt;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook_tokio::Signals;

    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(signals) => signals,
        Err(e) => {
            warn!("Signal setup failed ({}), falling back to Ctrl+C only", e);
            wait_for_ctrl_c(tokio::signal::ctrl_c()).await;
            return;
        }
    };
    let handle = signals.handle();

    if let Some(signal) = signals.next().await {
        info!("Received signal {}, stopping gracefully...", signal);
    }
    handle.close();
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    wait_for_ctrl_c(tokio::signal::ctrl_c()).await;
    info!("Received Ctrl+C, stopping gracefully...");
}

/// Resolve on Ctrl+C. If the listener cannot be installed, keep running
/// until the process is killed rather than stopping straight away.
async fn wait_for_ctrl_c<F>(listener: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = listener.await {
        error!("Failed to listen for Ctrl+C ({}); stop the daemon by killing it", e);
        std::future::pending::<()>().await;
    }
}
