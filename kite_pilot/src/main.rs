//! # Kite PiloteV3 firmware (host build)
//!
//! Runs the tick scheduler with the sensor and telemetry tasks and serves the
//! web facade while the `webserver` module is enabled.
//!
//! # Usage
//!
//! ```bash
//! # Run with a config file
//! kite_pilot --config config/kite_pilot.toml
//!
//! # Smoke run: 500 ticks, verbose, web server on port 9000
//! kite_pilot --config config/kite_pilot.toml --ticks 500 --port 9000 -v
//!
//! # JSON logs
//! kite_pilot --json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use kite_common::config::{ConfigError, LogLevel};
use kite_common::consts::DEFAULT_CONFIG_PATH;
use kite_common::logging::init_tracing;
use kite_core::clock::MonotonicClock;
use kite_pilot::{Pilot, PilotConfig};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Kite PiloteV3 - kite autopilot firmware
#[derive(Parser, Debug)]
#[command(name = "kite_pilot")]
#[command(version)]
#[command(about = "Kite PiloteV3 autopilot firmware")]
#[command(long_about = None)]
struct Args {
    /// Path to the configuration file (kite_pilot.toml).
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the web server port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Stop after this many ticks.
    #[arg(long, value_name = "N")]
    ticks: Option<u64>,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("FATAL: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // The log level comes from the config file, so load it before tracing is
    // up and report a missing file afterwards.
    let (mut config, missing) = match PilotConfig::load_validated(&args.config) {
        Ok(config) => (config, false),
        Err(ConfigError::FileNotFound) => (PilotConfig::default(), true),
        Err(e) => {
            init_tracing(LogLevel::Error, args.json);
            return Err(e.into());
        }
    };
    if let Some(port) = args.port {
        config.web.port = port;
    }

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config.shared.log_level
    };
    init_tracing(level, args.json);

    info!("Kite PiloteV3 v{} starting...", env!("CARGO_PKG_VERSION"));
    if missing {
        warn!(
            "Config file {} not found, running with built-in defaults",
            args.config.display()
        );
    }

    let mut pilot = Pilot::build(config, Arc::new(MonotonicClock::new()))?;

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = pilot
        .start_web(async move {
            while !*shutdown_rx.borrow() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    let mut interval = tokio::time::interval(pilot.config().tick_period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!(
        "Tick loop running (period={}ms)",
        pilot.config().scheduler.tick_ms
    );
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    error!("Unable to listen for shutdown signal: {e}");
                }
                info!("Received shutdown signal");
                break;
            }
            _ = interval.tick() => {
                pilot.tick();
                if args.ticks.is_some_and(|limit| pilot.tick_stats().ticks >= limit) {
                    info!("Tick budget reached");
                    break;
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
    if let Some(server) = server {
        match server.await {
            Ok(result) => result?,
            Err(e) => error!("Web server task failed: {e}"),
        }
    }

    let stats = pilot.tick_stats();
    info!(
        "Kite PiloteV3 stopped after {} ticks (overruns: {}, max tick {}us)",
        stats.ticks, stats.overruns, stats.max_tick_us
    );
    for task in pilot.task_stats() {
        info!(
            "  - {}: {} runs, {} skipped",
            task.name, task.runs, task.skipped
        );
    }
    Ok(())
}
