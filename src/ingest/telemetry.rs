/// Telemetry API client and the cache-backed fetcher.
///
/// `HttpSource` performs the single upstream GET. `TelemetryFetcher` wraps
/// any `TelemetrySource` with the fallback chain:
///
/// ```text
/// fresh cache ─▶ backoff (serve cached) ─▶ live fetch ─▶ stale cache ─▶ empty
/// ```
///
/// Callers never see an error. The worst case is an empty reading set
/// reported with `FetchOrigin::Unavailable`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ingest::sanitize::sanitize_reading;
use crate::model::{Reading, ReadingSet, UpstreamError};
use crate::monitor::FetchCache;

/// Production telemetry endpoint.
pub const DEFAULT_API_URL: &str = "https://apaw.cspc.edu.ph/apawbalatanapi/APIv1/Weather";

/// Per-request timeout for the upstream call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 8;

// ---------------------------------------------------------------------------
// Upstream source
// ---------------------------------------------------------------------------

/// Anything that can produce one raw telemetry payload.
pub trait TelemetrySource: Send + Sync {
    fn fetch_payload(&self) -> Result<Value, UpstreamError>;
}

/// Blocking HTTP source for the telemetry API.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::blocking::Client,
    url: String,
    timeout_secs: u64,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, UpstreamError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout_secs,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_error(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout_secs)
        } else if let Some(status) = err.status() {
            UpstreamError::Status(status.as_u16())
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

impl TelemetrySource for HttpSource {
    fn fetch_payload(&self) -> Result<Value, UpstreamError> {
        debug!(url = %self.url, "requesting telemetry");
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = response.text().map_err(|e| self.map_error(e))?;
        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Payload shape
// ---------------------------------------------------------------------------

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Pulls the record objects out of a payload.
///
/// Accepts a bare array or an object with a `data` array. Elements that are
/// not objects are skipped. A payload with no usable records is an error.
pub fn extract_records(payload: Value) -> Result<Vec<Map<String, Value>>, UpstreamError> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            Some(other) => return Err(UpstreamError::Shape(json_kind(&other))),
            None => return Err(UpstreamError::Shape("object")),
        },
        other => return Err(UpstreamError::Shape(json_kind(&other))),
    };

    let total = items.len();
    let records: Vec<Map<String, Value>> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();

    if records.len() < total {
        warn!(skipped = total - records.len(), "skipping non-object records in payload");
    }
    if records.is_empty() {
        return Err(UpstreamError::Empty);
    }
    Ok(records)
}

/// Parses a raw JSON body into sanitized readings.
pub fn parse_payload(body: &str) -> Result<Vec<Reading>, UpstreamError> {
    let payload: Value =
        serde_json::from_str(body).map_err(|e| UpstreamError::Decode(e.to_string()))?;
    Ok(extract_records(payload)?.iter().map(sanitize_reading).collect())
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Which branch of the fallback chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOrigin {
    /// Cached data still inside the TTL.
    Fresh,
    /// Just fetched from upstream.
    Live,
    /// Cached data (possibly empty) served during backoff.
    Backoff,
    /// Upstream failed; older cached data served.
    Stale,
    /// Upstream failed and nothing is cached.
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub readings: ReadingSet,
    pub origin: FetchOrigin,
}

pub struct TelemetryFetcher<S> {
    source: S,
    cache: Arc<FetchCache>,
}

impl<S: TelemetrySource> TelemetryFetcher<S> {
    pub fn new(source: S, cache: Arc<FetchCache>) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &Arc<FetchCache> {
        &self.cache
    }

    /// Latest readings. Never fails; see the module docs for the chain.
    pub fn fetch(&self, force_refresh: bool) -> ReadingSet {
        self.fetch_with_origin(force_refresh).readings
    }

    pub fn fetch_with_origin(&self, force_refresh: bool) -> Fetched {
        self.fetch_at(force_refresh, Utc::now())
    }

    pub fn fetch_at(&self, force_refresh: bool, now: DateTime<Utc>) -> Fetched {
        if !force_refresh {
            let cached = self.cache.get_at(now);
            if cached.is_fresh {
                if let Some(readings) = cached.data {
                    debug!(count = readings.len(), "serving fresh cached readings");
                    return Fetched {
                        readings,
                        origin: FetchOrigin::Fresh,
                    };
                }
            }
            if !self.cache.should_fetch_at(now) {
                debug!("fetch suppressed by backoff");
                return Fetched {
                    readings: cached.data.unwrap_or_default(),
                    origin: FetchOrigin::Backoff,
                };
            }
        }

        // Network call happens with no cache lock held.
        match self
            .source
            .fetch_payload()
            .and_then(extract_records)
        {
            Ok(records) => {
                let readings: ReadingSet =
                    Arc::new(records.iter().map(sanitize_reading).collect());
                info!(count = readings.len(), "fetched telemetry");
                self.cache.set_at(readings.clone(), true, now);
                Fetched {
                    readings,
                    origin: FetchOrigin::Live,
                }
            }
            Err(e) => {
                warn!(error = %e, "telemetry fetch failed");
                self.cache.record_error_at(now);
                match self.cache.get_stale_data() {
                    Some(readings) if !readings.is_empty() => {
                        info!(count = readings.len(), "serving stale cached readings");
                        Fetched {
                            readings,
                            origin: FetchOrigin::Stale,
                        }
                    }
                    _ => {
                        warn!("upstream unavailable and no cached data");
                        Fetched {
                            readings: ReadingSet::default(),
                            origin: FetchOrigin::Unavailable,
                        }
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
