//! Measurement record types and unit-system normalization.
//!
//! A [`MeasurementRecord`] is one timestamped set of sensor readings as
//! produced by a station driver once per collection interval. Records may
//! arrive in metric or US customary units; the wire protocol requires US
//! customary, so [`MeasurementRecord::to_us`] performs the conversion.

use serde::{Deserialize, Serialize};

/// km/h per mile/h.
const KPH_PER_MPH: f64 = 1.609_344;

/// mile/h per metre/s.
const MPH_PER_MPS: f64 = 2.236_936;

/// inHg per hPa (millibar).
const INHG_PER_HPA: f64 = 0.029_529_983_071;

/// mm per inch.
const MM_PER_INCH: f64 = 25.4;

/// Unit system a record's values are expressed in.
///
/// `Metric` carries °C / km/h / hPa / mm; `MetricWx` is identical except
/// wind speeds are in m/s. `Us` carries °F / mph / inHg / in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitSystem {
    Us,
    Metric,
    MetricWx,
}

/// A single archive record from a weather station.
///
/// Only `timestamp` and `unit_system` are mandatory; every sensor field is
/// optional and simply omitted from the upload when absent. Records are
/// never mutated after construction; the publisher clones them into its
/// queue.
///
/// Serde field names follow the station-software convention (`dateTime`,
/// `outTemp`, ...) so records can be handed over as JSON unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Observation time, seconds since the Unix epoch.
    #[serde(rename = "dateTime")]
    pub timestamp: i64,

    /// Unit system the values below are expressed in.
    #[serde(rename = "usUnits")]
    pub unit_system: UnitSystem,

    /// Outdoor temperature (°C or °F).
    #[serde(rename = "outTemp", default, skip_serializing_if = "Option::is_none")]
    pub out_temp: Option<f64>,

    /// Wind speed (km/h, m/s or mph).
    #[serde(rename = "windSpeed", default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,

    /// Wind direction in degrees, unit-system independent.
    #[serde(rename = "windDir", default, skip_serializing_if = "Option::is_none")]
    pub wind_dir: Option<f64>,

    /// Wind gust speed (km/h, m/s or mph).
    #[serde(rename = "windGust", default, skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<f64>,

    /// Outdoor relative humidity in percent, unit-system independent.
    #[serde(rename = "outHumidity", default, skip_serializing_if = "Option::is_none")]
    pub out_humidity: Option<f64>,

    /// Dew point (°C or °F).
    #[serde(rename = "dewpoint", default, skip_serializing_if = "Option::is_none")]
    pub dew_point: Option<f64>,

    /// Barometric pressure (hPa or inHg).
    #[serde(rename = "barometer", default, skip_serializing_if = "Option::is_none")]
    pub barometer: Option<f64>,

    /// Rain accumulated over the last hour (mm or in).
    #[serde(rename = "hourRain", default, skip_serializing_if = "Option::is_none")]
    pub hour_rain: Option<f64>,

    /// UV index, unit-system independent.
    #[serde(rename = "UV", default, skip_serializing_if = "Option::is_none")]
    pub uv: Option<f64>,

    /// Solar radiation in W/m², unit-system independent.
    #[serde(rename = "radiation", default, skip_serializing_if = "Option::is_none")]
    pub radiation: Option<f64>,
}

impl MeasurementRecord {
    /// Create an empty record with the given observation time and unit system.
    pub fn new(timestamp: i64, unit_system: UnitSystem) -> Self {
        Self {
            timestamp,
            unit_system,
            out_temp: None,
            wind_speed: None,
            wind_dir: None,
            wind_gust: None,
            out_humidity: None,
            dew_point: None,
            barometer: None,
            hour_rain: None,
            uv: None,
            radiation: None,
        }
    }

    /// Age of this record in seconds relative to `now` (epoch seconds).
    pub fn age_secs(&self, now: i64) -> i64 {
        now - self.timestamp
    }

    /// Return an equivalent record expressed in US customary units.
    ///
    /// The conversion is total: every field has a defined formula, absent
    /// fields stay absent, and a record already in US units is returned
    /// unchanged. Wind direction is kept in full float precision here;
    /// truncation to integer degrees happens at the wire layer.
    pub fn to_us(&self) -> Self {
        let speed_to_mph: fn(f64) -> f64 = match self.unit_system {
            UnitSystem::Us => return self.clone(),
            UnitSystem::Metric => |v| v / KPH_PER_MPH,
            UnitSystem::MetricWx => |v| v * MPH_PER_MPS,
        };
        let c_to_f = |v: f64| v * 9.0 / 5.0 + 32.0;

        Self {
            timestamp: self.timestamp,
            unit_system: UnitSystem::Us,
            out_temp: self.out_temp.map(c_to_f),
            wind_speed: self.wind_speed.map(speed_to_mph),
            wind_dir: self.wind_dir,
            wind_gust: self.wind_gust.map(speed_to_mph),
            out_humidity: self.out_humidity,
            dew_point: self.dew_point.map(c_to_f),
            barometer: self.barometer.map(|v| v * INHG_PER_HPA),
            hour_rain: self.hour_rain.map(|v| v / MM_PER_INCH),
            uv: self.uv,
            radiation: self.radiation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_us_record_passes_through() {
        let mut record = MeasurementRecord::new(1_700_000_000, UnitSystem::Us);
        record.out_temp = Some(32.5);
        record.wind_speed = Some(10.0);

        let converted = record.to_us();
        assert_eq!(converted, record);
    }

    #[test]
    fn test_metric_temperature_conversion() {
        let mut record = MeasurementRecord::new(1_700_000_000, UnitSystem::Metric);
        record.out_temp = Some(0.0);
        record.dew_point = Some(100.0);

        let converted = record.to_us();
        assert_eq!(converted.unit_system, UnitSystem::Us);
        assert!(approx_eq(converted.out_temp.unwrap(), 32.0));
        assert!(approx_eq(converted.dew_point.unwrap(), 212.0));
    }

    #[test]
    fn test_metric_wind_is_kph() {
        let mut record = MeasurementRecord::new(1_700_000_000, UnitSystem::Metric);
        record.wind_speed = Some(100.0);
        record.wind_gust = Some(1.609_344);

        let converted = record.to_us();
        assert!(approx_eq(converted.wind_speed.unwrap(), 62.137_119_223_733_395));
        assert!(approx_eq(converted.wind_gust.unwrap(), 1.0));
    }

    #[test]
    fn test_metricwx_wind_is_mps() {
        let mut record = MeasurementRecord::new(1_700_000_000, UnitSystem::MetricWx);
        record.wind_speed = Some(10.0);

        let converted = record.to_us();
        assert!(approx_eq(converted.wind_speed.unwrap(), 22.369_36));
    }

    #[test]
    fn test_pressure_and_rain_conversion() {
        let mut record = MeasurementRecord::new(1_700_000_000, UnitSystem::Metric);
        record.barometer = Some(1013.25);
        record.hour_rain = Some(25.4);

        let converted = record.to_us();
        assert!(approx_eq(converted.barometer.unwrap(), 29.921_255_296_687_575));
        assert!(approx_eq(converted.hour_rain.unwrap(), 1.0));
    }

    #[test]
    fn test_unitless_fields_untouched() {
        let mut record = MeasurementRecord::new(1_700_000_000, UnitSystem::Metric);
        record.wind_dir = Some(270.0);
        record.out_humidity = Some(55.0);
        record.uv = Some(3.0);
        record.radiation = Some(420.5);

        let converted = record.to_us();
        assert_eq!(converted.wind_dir, Some(270.0));
        assert_eq!(converted.out_humidity, Some(55.0));
        assert_eq!(converted.uv, Some(3.0));
        assert_eq!(converted.radiation, Some(420.5));
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let record = MeasurementRecord::new(1_700_000_000, UnitSystem::Metric);
        let converted = record.to_us();
        assert!(converted.out_temp.is_none());
        assert!(converted.barometer.is_none());
        assert!(converted.hour_rain.is_none());
    }

    #[test]
    fn test_record_age() {
        let record = MeasurementRecord::new(1_700_000_000, UnitSystem::Us);
        assert_eq!(record.age_secs(1_700_000_300), 300);
        assert_eq!(record.age_secs(1_699_999_999), -1);
    }

    #[test]
    fn test_station_json_field_names() {
        let json = r#"{
            "dateTime": 1700000000,
            "usUnits": "US",
            "outTemp": 32.5,
            "windSpeed": 10,
            "windDir": 32,
            "outHumidity": 24
        }"#;

        let record: MeasurementRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.timestamp, 1_700_000_000);
        assert_eq!(record.unit_system, UnitSystem::Us);
        assert_eq!(record.out_temp, Some(32.5));
        assert_eq!(record.wind_speed, Some(10.0));
        assert_eq!(record.wind_dir, Some(32.0));
        assert_eq!(record.out_humidity, Some(24.0));
        assert!(record.dew_point.is_none());
        assert!(record.uv.is_none());
    }

    #[test]
    fn test_metric_json_unit_tag() {
        let json = r#"{"dateTime": 1700000000, "usUnits": "METRICWX", "windSpeed": 5}"#;
        let record: MeasurementRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.unit_system, UnitSystem::MetricWx);
    }
}
