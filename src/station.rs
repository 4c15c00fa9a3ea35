//! Simulated weather station for testing and demo runs.
//!
//! Produces one plausible metric-unit measurement record per call, with a
//! random walk around seasonal means. Some sensors occasionally report
//! nothing, which keeps the optional-field paths of the pipeline honest.

use rand::Rng;

use crate::record::{MeasurementRecord, UnitSystem};

/// Configuration for the simulated station.
#[derive(Debug, Clone)]
pub struct StationConfig {
    /// Mean outdoor temperature in °C
    pub mean_temp_c: f64,

    /// Mean wind speed in km/h
    pub mean_wind_kph: f64,

    /// Probability that any one optional sensor reports a value
    pub sensor_availability: f64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            mean_temp_c: 15.0,
            mean_wind_kph: 12.0,
            sensor_availability: 0.9,
        }
    }
}

/// Generator of simulated metric measurement records.
pub struct StationSimulator {
    config: StationConfig,
}

impl StationSimulator {
    pub fn new(config: StationConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(StationConfig::default())
    }

    /// Produce one record timestamped now, in metric units.
    pub fn generate(&self) -> MeasurementRecord {
        let mut rng = rand::thread_rng();
        let mut record =
            MeasurementRecord::new(chrono::Utc::now().timestamp(), UnitSystem::Metric);

        let available = |rng: &mut rand::rngs::ThreadRng, p: f64| rng.gen_bool(p);
        let p = self.config.sensor_availability;

        let temp = self.config.mean_temp_c + rng.gen_range(-5.0..5.0);
        record.out_temp = Some(temp);

        if available(&mut rng, p) {
            record.wind_speed = Some((self.config.mean_wind_kph + rng.gen_range(-8.0..8.0)).max(0.0));
            record.wind_dir = Some(rng.gen_range(0.0..360.0));
        }
        if available(&mut rng, p) {
            record.wind_gust = record.wind_speed.map(|w| w + rng.gen_range(0.0..10.0));
        }
        if available(&mut rng, p) {
            record.out_humidity = Some(rng.gen_range(30.0..95.0));
            record.dew_point = Some(temp - rng.gen_range(1.0..6.0));
        }
        if available(&mut rng, p) {
            record.barometer = Some(rng.gen_range(990.0..1030.0));
        }
        if available(&mut rng, p) {
            record.hour_rain = Some(if rng.gen_bool(0.8) {
                0.0
            } else {
                rng.gen_range(0.1..4.0)
            });
        }
        if available(&mut rng, p) {
            record.uv = Some(rng.gen_range(0.0..11.0));
            record.radiation = Some(rng.gen_range(0.0..900.0));
        }

        record
    }
}
