//! Windy Publisher Library
//!
//! This library provides components for forwarding weather-station
//! measurement records to the Windy stations API:
//!
//! - **config**: Environment-based delivery configuration
//! - **record**: Measurement records and unit-system normalization
//! - **wire**: Record-to-query-string transformation and encoding
//! - **worker**: Background delivery loop with backlog, staleness and
//!   fixed-wait retry policy
//! - **publisher**: Façade owning the submission queue and worker lifecycle
//! - **station**: Simulated station record generation for testing
//!
//! # Example
//!
//! ```no_run
//! use windy_publisher::config::Config;
//! use windy_publisher::publisher::Publisher;
//! use windy_publisher::station::StationSimulator;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Load configuration from environment
//!     let config = Config::from_env().expect("Failed to load config");
//!
//!     // Start the delivery pipeline
//!     let publisher = Publisher::new(config);
//!
//!     // Hand over one record per collection interval; submit never blocks
//!     let simulator = StationSimulator::with_defaults();
//!     publisher.submit(simulator.generate());
//! }
//! ```

// Module declarations
pub mod config;
pub mod publisher;
pub mod record;
pub mod station;
pub mod wire;
pub mod worker;

// Re-export commonly used types at crate root for convenience
pub use config::{Config, ConfigError};
pub use publisher::Publisher;
pub use record::{MeasurementRecord, UnitSystem};
pub use station::{StationConfig, StationSimulator};
pub use wire::{encode, transform, WireFields};
pub use worker::{DeliveryError, DeliveryWorker, HttpPoster, Poster, WorkerStats};
