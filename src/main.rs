//! Windy Publisher - asynchronous observation uploader for weather stations
//!
//! This binary simulates a station producing one measurement record per
//! collection interval and forwards each record through the decoupled
//! delivery pipeline to the Windy stations API.
//!
//! ## Features
//!
//! - Non-blocking record submission backed by a background delivery worker
//! - Backlog trimming, staleness drops and post pacing
//! - Fixed-wait retry on transient HTTP failures
//! - Graceful shutdown on SIGINT/SIGTERM
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `WINDY_STATION_ID` / `WINDY_STATION_PASSWORD`: station credentials
//! - `WINDY_SERVER_URL`: upload endpoint (default: Windy stations API)
//! - `WINDY_POST_INTERVAL_SECS`, `WINDY_MAX_BACKLOG`, `WINDY_STALE_SECS`:
//!   pacing/backlog/staleness policy (all optional)
//! - `WINDY_TIMEOUT_SECS`, `WINDY_MAX_TRIES`, `WINDY_RETRY_WAIT_SECS`:
//!   retry contract (defaults: 60 / 3 / 5)
//! - `WINDY_SKIP_UPLOAD`: run the pipeline without network calls
//! - `RUST_LOG`: logging level filter (default: info)

use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use windy_publisher::config::Config;
use windy_publisher::publisher::Publisher;
use windy_publisher::station::StationSimulator;

/// Interval between simulated archive records in seconds.
const COLLECT_INTERVAL_SECS: u64 = 60;

/// How long shutdown waits for the worker to finish the backlog.
const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with environment filter
    init_tracing();

    info!("Starting Windy publisher...");

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => {
            info!(
                server_url = %config.server_url,
                max_tries = config.max_tries,
                retry_wait_secs = config.retry_wait.as_secs(),
                skip_upload = config.skip_upload,
                "Configuration loaded"
            );
            config
        }
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    // Start the delivery pipeline; missing credentials leave it disabled
    // but running, per the no-crash contract.
    let publisher = Publisher::new(config);

    // Spawn the simulated station producer
    let simulator = StationSimulator::with_defaults();
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    let producer = tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(COLLECT_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            if tx.send(simulator.generate()).await.is_err() {
                break;
            }
        }
    });

    info!("Windy publisher running. Press Ctrl+C to stop.");
    loop {
        tokio::select! {
            maybe_record = rx.recv() => {
                match maybe_record {
                    Some(record) => publisher.submit(record),
                    None => break,
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for shutdown signal");
                }
                info!("Shutdown signal received, stopping...");
                break;
            }
        }
    }

    // Graceful shutdown: stop producing, let the worker drain what it can
    producer.abort();

    let shutdown_timeout = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
    match tokio::time::timeout(shutdown_timeout, publisher.shutdown()).await {
        Ok(Some(stats)) => {
            info!(
                delivered = stats.delivered,
                failed = stats.failed,
                backlog_dropped = stats.backlog_dropped,
                stale_dropped = stats.stale_dropped,
                "Delivery worker shut down gracefully"
            );
        }
        Ok(None) => {
            info!("Publisher was disabled, nothing to drain");
        }
        Err(_) => {
            warn!("Worker shutdown timed out after {:?}", shutdown_timeout);
        }
    }

    info!("Windy publisher stopped");
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}
