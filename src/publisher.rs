//! Publisher façade: owns the submission queue and the delivery worker's
//! lifecycle.
//!
//! Producers hand records to [`Publisher::submit`], which never blocks and
//! never fails from the caller's perspective; everything past the queue
//! (pacing, staleness, retries, drops) happens on the worker task and is
//! only ever visible in logs.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::record::MeasurementRecord;
use crate::worker::{DeliveryWorker, HttpPoster, Poster, WorkerStats};

/// Handle for submitting measurement records to the delivery pipeline.
///
/// Construction with incomplete credentials yields a *disabled* publisher:
/// the error is logged, no worker is spawned, and `submit` silently drops
/// records. This mirrors the configuration-error contract: the publisher
/// must never take the host process down.
pub struct Publisher {
    tx: Option<mpsc::UnboundedSender<MeasurementRecord>>,
    worker: Option<JoinHandle<WorkerStats>>,
}

impl Publisher {
    /// Start a publisher posting over HTTP.
    ///
    /// Must be called from within a tokio runtime. Missing credentials or
    /// an unbuildable HTTP client disable the publisher instead of
    /// failing.
    pub fn new(config: Config) -> Self {
        if !config.has_credentials() {
            error!("station_id and station_password are required, publisher disabled");
            return Self::disabled();
        }

        match HttpPoster::new(config.timeout) {
            Ok(poster) => Self::with_poster(config, poster),
            Err(e) => {
                error!(error = %e, "failed to build HTTP client, publisher disabled");
                Self::disabled()
            }
        }
    }

    /// Start a publisher with a custom delivery seam (used by tests).
    pub fn with_poster<P: Poster + 'static>(config: Config, poster: P) -> Self {
        info!(
            url = %config.server_url,
            station = %config.station_id,
            "observations will be uploaded"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = DeliveryWorker::new(rx, poster, config);
        let handle = tokio::spawn(worker.run());

        Self {
            tx: Some(tx),
            worker: Some(handle),
        }
    }

    fn disabled() -> Self {
        Self {
            tx: None,
            worker: None,
        }
    }

    /// Whether a worker is running behind this publisher.
    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Enqueue a record for delivery.
    ///
    /// Never blocks and never errors: the queue is unbounded on the
    /// submission side, and overflow is handled by the worker's backlog
    /// trimming. On a disabled or stopped publisher the record is dropped.
    pub fn submit(&self, record: MeasurementRecord) {
        let Some(tx) = &self.tx else {
            debug!(ts = record.timestamp, "publisher disabled, record dropped");
            return;
        };

        if tx.send(record).is_err() {
            warn!("delivery worker gone, record dropped");
        }
    }

    /// Close the queue and wait for the worker to finish what it has
    /// already dequeued plus the remaining backlog.
    ///
    /// Returns the worker's final stats, or `None` for a disabled
    /// publisher or a worker that panicked.
    pub async fn shutdown(mut self) -> Option<WorkerStats> {
        self.tx.take();

        let handle = self.worker.take()?;
        match handle.await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(error = %e, "delivery worker panicked");
                None
            }
        }
    }
}
