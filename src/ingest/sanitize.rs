/// Reading sanitization: raw upstream JSON objects → `Reading`.
///
/// The telemetry API is loosely typed. The same field may arrive as a JSON
/// number, a numeric string, an empty string, `null`, or be missing
/// entirely. Sanitization never fails; each field degrades independently:
///
/// | input                  | critical field | auxiliary field |
/// |------------------------|----------------|-----------------|
/// | absent / `null`        | `None`         | `None`          |
/// | number / numeric text  | `Some(v)`      | `Some(v)`       |
/// | anything else          | `None`         | `Some(0.0)`     |
///
/// Critical fields are the two that drive classification (water level and
/// hourly rain). Consumers of auxiliary fields must tolerate the difference
/// between an explicit zero and an unparseable value coerced to zero.

use serde_json::{Map, Value};
use tracing::debug;

use crate::ingest::timestamp::parse_timestamp;
use crate::model::{
    ParseError, Reading, FIELD_DAILY_RAIN, FIELD_HEAT_INDEX, FIELD_HOURLY_RAIN, FIELD_HUMIDITY,
    FIELD_PRESSURE, FIELD_STATION_ID, FIELD_TEMPERATURE, FIELD_WATER_LEVEL,
    FIELD_WIND_DIRECTION, FIELD_WIND_SPEED, TIMESTAMP_FIELDS,
};

/// Coerces a JSON value to a finite `f64`.
///
/// Accepts JSON numbers and strings holding a number (surrounding whitespace
/// allowed). NaN and infinities are rejected.
pub fn coerce_number(value: &Value) -> Result<f64, ParseError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::Number(value.to_string())),
    }
}

/// Field is absent or explicitly `null`.
fn is_missing(raw: &Map<String, Value>, field: &str) -> bool {
    matches!(raw.get(field), None | Some(Value::Null))
}

/// Critical numeric field: anything unparseable becomes `None`.
fn critical_number(raw: &Map<String, Value>, field: &str) -> Option<f64> {
    let value = raw.get(field)?;
    if value.is_null() {
        return None;
    }
    match coerce_number(value) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(field, error = %e, "dropping unparseable critical field");
            None
        }
    }
}

/// Auxiliary numeric field: unparseable values are coerced to zero.
fn auxiliary_number(raw: &Map<String, Value>, field: &str) -> Option<f64> {
    if is_missing(raw, field) {
        return None;
    }
    Some(raw.get(field).and_then(|v| coerce_number(v).ok()).unwrap_or(0.0))
}

/// Renders a scalar JSON value as text (strings unquoted).
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn station_id(raw: &Map<String, Value>) -> Option<String> {
    raw.get(FIELD_STATION_ID)
        .and_then(scalar_text)
        .filter(|id| !id.is_empty())
}

/// First non-empty timestamp string among the known aliases.
fn raw_timestamp(raw: &Map<String, Value>) -> Option<String> {
    TIMESTAMP_FIELDS.iter().find_map(|field| match raw.get(*field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    })
}

/// Converts one upstream object into a `Reading`. Never fails.
pub fn sanitize_reading(raw: &Map<String, Value>) -> Reading {
    let timestamp = raw_timestamp(raw);
    let instant = match timestamp.as_deref().map(parse_timestamp) {
        Some(Ok(dt)) => Some(dt),
        Some(Err(e)) => {
            debug!(error = %e, "reading timestamp unusable");
            None
        }
        None => None,
    };

    let wind_direction = raw
        .get(FIELD_WIND_DIRECTION)
        .and_then(scalar_text)
        .map(|dir| dir.trim().to_uppercase());

    Reading {
        station_id: station_id(raw),
        timestamp,
        instant,
        water_level: critical_number(raw, FIELD_WATER_LEVEL),
        hourly_rain: critical_number(raw, FIELD_HOURLY_RAIN),
        daily_rain: auxiliary_number(raw, FIELD_DAILY_RAIN),
        temperature: auxiliary_number(raw, FIELD_TEMPERATURE),
        humidity: auxiliary_number(raw, FIELD_HUMIDITY),
        heat_index: auxiliary_number(raw, FIELD_HEAT_INDEX),
        pressure: auxiliary_number(raw, FIELD_PRESSURE),
        wind_speed: auxiliary_number(raw, FIELD_WIND_SPEED),
        wind_direction,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
