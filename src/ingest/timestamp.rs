/// Tolerant timestamp parsing for telemetry payloads.
///
/// Stations report times in several shapes depending on firmware:
///   "2024-11-23 14:05:00"
///   "2024-11-23 14:05:00.123456"
///   "2024-11-23T14:05:00Z"
///   "2024-11-23T14:05:00+08:00"
///
/// Everything is reduced to a naive local wall-clock instant. Zone
/// information is dropped rather than converted, so callers must not assume
/// timezone correctness.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::model::ParseError;

/// Naive formats tried in order. `%.f` also matches an absent fraction.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Offset-carrying formats, for inputs `parse_from_rfc3339` rejects.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// Parses a telemetry timestamp into a naive instant.
///
/// # Errors
/// `ParseError::EmptyTimestamp` for empty or whitespace-only input,
/// `ParseError::Timestamp` when no supported format matches.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, ParseError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(ParseError::EmptyTimestamp);
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }

    // Zone-qualified: keep the wall clock as written, drop the offset.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.naive_local());
        }
    }
    if let Some(stripped) = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        for fmt in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(stripped, fmt) {
                return Ok(dt);
            }
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }

    Err(ParseError::Timestamp(s.to_string()))
}

/// Convenience wrapper for optional fields: `None` for absent or bad input.
pub fn parse_optional(raw: Option<&str>) -> Option<NaiveDateTime> {
    raw.and_then(|s| parse_timestamp(s).ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
