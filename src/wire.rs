//! Record-to-wire transformation and request-target encoding.
//!
//! The Windy stations API takes one observation per HTTP GET, with every
//! value carried in the query string. [`transform`] maps a measurement
//! record to the protocol's field names (normalizing units on the way) and
//! [`encode`] turns those fields into a fully percent-encoded request
//! target. Both functions are pure and infallible: an absent sensor field
//! is simply not uploaded.

use url::form_urlencoded;

use crate::record::MeasurementRecord;

/// Ordered protocol key/value pairs for one observation upload.
///
/// Insertion order is preserved all the way to the wire so encoded URLs
/// are reproducible; the station credential is always the final pair.
pub type WireFields = Vec<(&'static str, String)>;

/// Query key the station credential is sent under.
pub const PASSWORD_KEY: &str = "PASSWORD";

fn push_value(fields: &mut WireFields, key: &'static str, value: Option<f64>) {
    if let Some(v) = value {
        fields.push((key, v.to_string()));
    }
}

/// Map a measurement record to Windy protocol fields.
///
/// The record is first normalized to US customary units. `ts` and
/// `stationId` are always present; sensor fields are emitted only when the
/// source record carries them; the credential is appended last. Wind
/// direction is truncated to integer degrees, every other numeric value
/// keeps full float precision (`10.0` renders as `10`, `32.5` as `32.5`).
pub fn transform(record: &MeasurementRecord, station_id: &str, password: &str) -> WireFields {
    let record = record.to_us();

    let mut fields: WireFields = Vec::with_capacity(13);
    fields.push(("ts", record.timestamp.to_string()));
    fields.push(("stationId", station_id.to_string()));
    push_value(&mut fields, "tempf", record.out_temp);
    push_value(&mut fields, "windspeedmph", record.wind_speed);
    if let Some(dir) = record.wind_dir {
        fields.push(("winddir", (dir as i64).to_string()));
    }
    push_value(&mut fields, "windgustmph", record.wind_gust);
    push_value(&mut fields, "rh", record.out_humidity);
    push_value(&mut fields, "dewptf", record.dew_point);
    push_value(&mut fields, "baromin", record.barometer);
    push_value(&mut fields, "hourlyrainin", record.hour_rain);
    push_value(&mut fields, "uv", record.uv);
    push_value(&mut fields, "solarradiation", record.radiation);
    fields.push((PASSWORD_KEY, password.to_string()));

    fields
}

/// Build the request target `base?k1=v1&k2=v2...` from wire fields.
///
/// Every key and value is percent-encoded per standard query-encoding
/// rules; pair order is preserved exactly as produced by [`transform`].
pub fn encode(server_url: &str, fields: &WireFields) -> String {
    let query: String = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields.iter().map(|(k, v)| (*k, v.as_str())))
        .finish();
    format!("{}?{}", server_url, query)
}
