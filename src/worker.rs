//! Delivery worker module: the background loop that drains the submission
//! queue and posts observations to the upload endpoint.
//!
//! The worker processes strictly one record at a time. For each dequeued
//! record it applies the backlog and staleness policy, paces itself to the
//! configured post interval, builds the request target and posts it with a
//! fixed-wait retry contract. Outcomes are logged, never surfaced back to
//! the producer; an abandoned record never stops the records behind it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::record::MeasurementRecord;
use crate::wire;

/// Errors that can occur during one delivery attempt.
#[derive(Debug)]
pub enum DeliveryError {
    /// HTTP request failed before a response was received
    Request(reqwest::Error),

    /// Server returned a non-success status code
    Status { code: StatusCode, message: String },

    /// Request timed out
    Timeout,
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Request(e) => write!(f, "HTTP request failed: {}", e),
            DeliveryError::Status { code, message } => {
                write!(f, "Server error ({}): {}", code, message)
            }
            DeliveryError::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeliveryError::Request(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DeliveryError::Timeout
        } else {
            DeliveryError::Request(err)
        }
    }
}

/// One network attempt against the upload endpoint.
///
/// The worker is generic over this seam so tests can count attempts and
/// inject failures without a live server.
#[async_trait]
pub trait Poster: Send + Sync {
    async fn post(&self, target: &str) -> Result<(), DeliveryError>;
}

/// Production poster: a pooled reqwest client issuing GET requests.
pub struct HttpPoster {
    client: Client,
}

impl HttpPoster {
    /// Build a poster whose every attempt is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(1)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Poster for HttpPoster {
    async fn post(&self, target: &str) -> Result<(), DeliveryError> {
        let response = self.client.get(target).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(DeliveryError::Status {
                code: status,
                message,
            })
        }
    }
}

/// Statistics about worker operations.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    /// Records posted successfully
    pub delivered: u64,

    /// Records abandoned after exhausting retries
    pub failed: u64,

    /// Individual network attempts made
    pub attempts: u64,

    /// Records dropped by backlog trimming
    pub backlog_dropped: u64,

    /// Records dropped for exceeding the staleness threshold
    pub stale_dropped: u64,

    /// Records counted as synthetic successes in skip-upload mode
    pub skipped: u64,
}

/// Background delivery loop over the submission queue.
///
/// Exactly one worker exists per publisher; it owns the receiving half of
/// the queue and runs until the sending half is dropped. See the module
/// docs for the per-record pipeline.
pub struct DeliveryWorker<P: Poster> {
    /// Receiver half of the submission queue
    rx: mpsc::UnboundedReceiver<MeasurementRecord>,

    /// Network seam used for each attempt
    poster: P,

    /// Immutable delivery configuration
    config: Config,

    /// When the last post attempt (or skip) finished, for pacing
    last_attempt: Option<Instant>,

    /// Counters reported on shutdown
    stats: WorkerStats,
}

impl<P: Poster> DeliveryWorker<P> {
    pub fn new(
        rx: mpsc::UnboundedReceiver<MeasurementRecord>,
        poster: P,
        config: Config,
    ) -> Self {
        Self {
            rx,
            poster,
            config,
            last_attempt: None,
            stats: WorkerStats::default(),
        }
    }

    /// Run the delivery loop until the queue closes; returns final stats.
    pub async fn run(mut self) -> WorkerStats {
        info!(url = %self.config.server_url, "delivery worker started");

        while let Some(record) = self.rx.recv().await {
            let record = self.trim_backlog(record);
            self.pace().await;

            if self.is_stale(&record) {
                continue;
            }

            self.process(record).await;
        }

        info!(
            delivered = self.stats.delivered,
            failed = self.stats.failed,
            "queue closed, delivery worker stopping"
        );
        self.stats
    }

    /// Enforce the backlog cap: with more than `max_backlog` records
    /// pending (the dequeued one included), drop the oldest surplus and
    /// return the oldest survivor. FIFO order of the remainder is kept.
    fn trim_backlog(&mut self, record: MeasurementRecord) -> MeasurementRecord {
        let Some(max_backlog) = self.config.max_backlog else {
            return record;
        };

        let pending = 1 + self.rx.len();
        if pending <= max_backlog {
            return record;
        }

        let mut record = record;
        let mut dropped: u64 = 0;
        for _ in 0..(pending - max_backlog) {
            match self.rx.try_recv() {
                Ok(next) => {
                    record = next;
                    dropped += 1;
                }
                Err(_) => break,
            }
        }

        self.stats.backlog_dropped += dropped;
        info!(
            dropped,
            max_backlog, "backlog over limit, dropped oldest records"
        );
        record
    }

    /// Wait out the remainder of `post_interval` since the last attempt.
    async fn pace(&self) {
        let (Some(interval), Some(last)) = (self.config.post_interval, self.last_attempt) else {
            return;
        };

        let elapsed = last.elapsed();
        if elapsed < interval {
            let wait = interval - elapsed;
            debug!(wait_ms = wait.as_millis() as u64, "pacing before next post");
            sleep(wait).await;
        }
    }

    /// Discard records older than the staleness threshold without a
    /// network call.
    fn is_stale(&mut self, record: &MeasurementRecord) -> bool {
        let Some(stale) = self.config.stale else {
            return false;
        };

        let age = record.age_secs(chrono::Utc::now().timestamp());
        if age > stale.as_secs() as i64 {
            self.stats.stale_dropped += 1;
            info!(
                ts = record.timestamp,
                age_secs = age,
                stale_secs = stale.as_secs(),
                "record too old, skipping upload"
            );
            true
        } else {
            false
        }
    }

    /// Transform, encode and post one record; log the outcome.
    async fn process(&mut self, record: MeasurementRecord) {
        let fields = wire::transform(
            &record,
            &self.config.station_id,
            &self.config.station_password,
        );
        let target = wire::encode(&self.config.server_url, &fields);
        debug!(target = %target, "request target");

        if self.config.skip_upload {
            self.stats.skipped += 1;
            self.last_attempt = Some(Instant::now());
            info!(ts = record.timestamp, "skip_upload set, record not posted");
            return;
        }

        match self.post_with_retry(&target).await {
            Ok(()) => {
                self.stats.delivered += 1;
                if self.config.log_success {
                    info!(ts = record.timestamp, "record published");
                }
            }
            Err(e) => {
                self.stats.failed += 1;
                if self.config.log_failure {
                    error!(
                        ts = record.timestamp,
                        tries = self.config.max_tries,
                        error = %e,
                        "record abandoned after retries"
                    );
                }
            }
        }

        self.last_attempt = Some(Instant::now());
    }

    /// Post with up to `max_tries` attempts, a fixed `retry_wait` apart.
    async fn post_with_retry(&mut self, target: &str) -> Result<(), DeliveryError> {
        let mut attempt: u32 = 1;
        loop {
            self.stats.attempts += 1;
            match self.poster.post(target).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= self.config.max_tries => return Err(e),
                Err(e) => {
                    warn!(
                        attempt,
                        max_tries = self.config.max_tries,
                        error = %e,
                        "post attempt failed, will retry"
                    );
                    attempt += 1;
                    sleep(self.config.retry_wait).await;
                }
            }
        }
    }

    /// Stats accumulated so far.
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }
}
