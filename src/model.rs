/// Core data types for the weather and water-level monitoring service.
///
/// This module defines the shared domain model imported by all other modules:
/// the sanitized `Reading`, the two ordinal classification scales, and the
/// error taxonomy. It contains no I/O.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Upstream field names
// ---------------------------------------------------------------------------

/// Station identifier field in the upstream payload.
pub const FIELD_STATION_ID: &str = "StationID";

/// Timestamp aliases, in lookup order. The first non-empty one wins.
pub const TIMESTAMP_FIELDS: &[&str] = &["DateTime", "DateTimeStamp", "Timestamp"];

pub const FIELD_WATER_LEVEL: &str = "WaterLevel";
pub const FIELD_HOURLY_RAIN: &str = "HourlyRain";
pub const FIELD_DAILY_RAIN: &str = "DailyRain";
pub const FIELD_TEMPERATURE: &str = "Temperature";
pub const FIELD_HUMIDITY: &str = "Humidity";
pub const FIELD_HEAT_INDEX: &str = "HeatIndex";
pub const FIELD_PRESSURE: &str = "Pressure";
pub const FIELD_WIND_SPEED: &str = "WindSpeed";
pub const FIELD_WIND_DIRECTION: &str = "WindDirection";

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// A single sanitized sensor sample from one station.
///
/// Built once per fetch cycle by `ingest::sanitize::sanitize_reading` and
/// never mutated afterwards. `instant` is `None` when the upstream timestamp
/// was missing or unparseable; such readings still count for "latest value"
/// views but are skipped by every time-indexed operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Reading {
    pub station_id: Option<String>,
    /// Timestamp exactly as received, for display.
    pub timestamp: Option<String>,
    pub instant: Option<NaiveDateTime>,

    pub water_level: Option<f64>,
    pub hourly_rain: Option<f64>,

    // Passthrough metrics; not interpreted by the core.
    pub daily_rain: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub heat_index: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<String>,
}

impl Reading {
    /// True if this reading belongs to `station_id`.
    pub fn is_from(&self, station_id: &str) -> bool {
        self.station_id.as_deref() == Some(station_id)
    }
}

/// An immutable, cheaply shared set of readings from one fetch cycle.
pub type ReadingSet = Arc<Vec<Reading>>;

// ---------------------------------------------------------------------------
// Classification scales
// ---------------------------------------------------------------------------

/// Water-level alert severity, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Normal,
    Advisory,
    Alert,
    Warning,
    Critical,
}

impl AlertLevel {
    /// Levels that count as "active", most severe first.
    pub const ACTIVE_DESCENDING: [AlertLevel; 4] = [
        AlertLevel::Critical,
        AlertLevel::Warning,
        AlertLevel::Alert,
        AlertLevel::Advisory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Normal => "normal",
            AlertLevel::Advisory => "advisory",
            AlertLevel::Alert => "alert",
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AlertLevel::Normal => "Normal",
            AlertLevel::Advisory => "Advisory",
            AlertLevel::Alert => "Alert",
            AlertLevel::Warning => "Warning",
            AlertLevel::Critical => "Critical",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AlertLevel::Normal => "All systems normal",
            AlertLevel::Advisory => "Stay informed",
            AlertLevel::Alert => "Monitor situation closely",
            AlertLevel::Warning => "Prepare for evacuation",
            AlertLevel::Critical => "Immediate evacuation required",
        }
    }

    /// Alert, warning and critical stations are flagged for attention.
    pub fn needs_attention(self) -> bool {
        self >= AlertLevel::Alert
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rainfall intensity. `NoData` sorts lowest so that `max()` over a set of
/// intensities prefers any real observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RainfallIntensity {
    NoData,
    None,
    Light,
    Moderate,
    Heavy,
}

impl RainfallIntensity {
    pub fn as_str(self) -> &'static str {
        match self {
            RainfallIntensity::NoData => "no_data",
            RainfallIntensity::None => "none",
            RainfallIntensity::Light => "light",
            RainfallIntensity::Moderate => "moderate",
            RainfallIntensity::Heavy => "heavy",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RainfallIntensity::NoData => "No Data",
            RainfallIntensity::None => "Clear",
            RainfallIntensity::Light => "Light Rain",
            RainfallIntensity::Moderate => "Moderate Rain",
            RainfallIntensity::Heavy => "Heavy Rain",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RainfallIntensity::NoData => "Weather data unavailable",
            RainfallIntensity::None => "Clear weather conditions",
            RainfallIntensity::Light => "Light rainfall expected",
            RainfallIntensity::Moderate => "Moderate rainfall expected",
            RainfallIntensity::Heavy => "Heavy rainfall expected",
        }
    }
}

impl fmt::Display for RainfallIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A timestamp or number could not be parsed. Always recovered locally by
/// dropping the offending field or reading.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("empty timestamp")]
    EmptyTimestamp,
    #[error("unrecognized timestamp format: {0:?}")]
    Timestamp(String),
    #[error("not a number: {0}")]
    Number(String),
}

/// A parsed value lies outside the range a pipeline accepts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} value {value} outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} value {value} is negative")]
    Negative { field: &'static str, value: f64 },
}

/// A caller-supplied display date was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DateError {
    #[error("Invalid date format. Use YYYY-MM-DD (e.g., 2024-11-23)")]
    Format,
    #[error("Invalid date: {0}. Use YYYY-MM-DD format.")]
    Invalid(String),
    #[error("Date must be between {min} and {max}")]
    YearOutOfRange { min: i32, max: i32 },
    #[error("Cannot request data more than {0} days in the future")]
    TooFarAhead(i64),
}

/// Anything that went wrong talking to the telemetry API. Absorbed by the
/// cache fallback chain; callers only ever see an empty result.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP error: {0}")]
    Status(u16),
    #[error("invalid JSON response: {0}")]
    Decode(String),
    #[error("unexpected payload shape: expected list, got {0}")]
    Shape(&'static str),
    #[error("upstream returned no readings")]
    Empty,
}

/// Configuration file could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
