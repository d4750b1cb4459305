/// Service configuration loader - parses wxmon.toml
///
/// Keeps the API endpoint, cache timings, poll cadence, alert breakpoints
/// and station list out of the code, so they can be tuned without
/// recompiling. Every field has a default; a missing file means "all
/// defaults", while a present-but-malformed file is an error.
///
/// Lookup order for the file: `$WXMON_CONFIG`, then `./wxmon.toml`.
/// `WXMON_API_URL` and `WXMON_API_TIMEOUT_SECS` override the `[api]` table.

use chrono::Duration;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::alert::thresholds::{RainfallThresholds, WaterLevelThresholds};
use crate::analysis::dashboard::DEFAULT_OFFLINE_THRESHOLD_MINUTES;
use crate::ingest::telemetry::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use crate::model::ConfigError;
use crate::monitor::CachePolicy;
use crate::stations::{Station, StationRegistry, default_stations};

pub const DEFAULT_CONFIG_PATH: &str = "wxmon.toml";
pub const CONFIG_PATH_ENV: &str = "WXMON_CONFIG";
pub const API_URL_ENV: &str = "WXMON_API_URL";
pub const API_TIMEOUT_ENV: &str = "WXMON_API_TIMEOUT_SECS";

/// Longest stale window or backoff cap accepted from the file.
pub const MAX_CACHE_WINDOW_SECS: i64 = 86_400;

/// Offline threshold bounds: one minute to one week.
pub const MIN_OFFLINE_THRESHOLD_MINUTES: i64 = 1;
pub const MAX_OFFLINE_THRESHOLD_MINUTES: i64 = 10_080;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Cache timings in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: i64,
    pub stale_ttl_secs: i64,
    pub max_errors_before_backoff: u32,
    pub backoff_base_secs: i64,
    pub backoff_cap_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            stale_ttl_secs: 300,
            max_errors_before_backoff: 3,
            backoff_base_secs: 60,
            backoff_cap_secs: 300,
        }
    }
}

/// Converts the file representation into the cache's policy type.
impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        CachePolicy {
            ttl: seconds(config.ttl_secs),
            stale_ttl: seconds(config.stale_ttl_secs),
            max_errors_before_backoff: config.max_errors_before_backoff,
            backoff_base: seconds(config.backoff_base_secs),
            backoff_cap: seconds(config.backoff_cap_secs),
        }
    }
}

/// Saturating `Duration::seconds`; unvalidated input must not panic.
fn seconds(secs: i64) -> Duration {
    Duration::try_seconds(secs).unwrap_or(if secs < 0 { Duration::MIN } else { Duration::MAX })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// How often the poll loop refreshes the cache.
    pub poll_interval_secs: u64,
    /// Age after which a station counts as offline.
    pub offline_threshold_minutes: i64,
    /// Station whose latest reading drives the headline bulletin.
    pub primary_station: String,
    /// Tried when the primary station has no readings.
    pub fallback_station: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            offline_threshold_minutes: DEFAULT_OFFLINE_THRESHOLD_MINUTES,
            primary_station: "St4".to_string(),
            fallback_station: "St1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub water_level: WaterLevelThresholds,
    pub rainfall: RainfallThresholds,
}

/// Root configuration structure for TOML parsing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub daemon: DaemonConfig,
    pub thresholds: ThresholdsConfig,
    #[serde(rename = "station")]
    pub stations: Vec<Station>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            daemon: DaemonConfig::default(),
            thresholds: ThresholdsConfig::default(),
            stations: default_stations(),
        }
    }
}

impl Config {
    pub fn registry(&self) -> StationRegistry {
        StationRegistry::new(self.stations.clone())
    }

    pub fn cache_policy(&self) -> CachePolicy {
        (&self.cache).into()
    }

    /// Rejects settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.url must not be empty".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("api.timeout_secs must be positive".into()));
        }
        let c = &self.cache;
        if c.ttl_secs <= 0 || c.stale_ttl_secs < c.ttl_secs {
            return Err(ConfigError::Invalid(
                "cache.stale_ttl_secs must be at least cache.ttl_secs, both positive".into(),
            ));
        }
        if c.backoff_base_secs <= 0 || c.backoff_cap_secs < c.backoff_base_secs {
            return Err(ConfigError::Invalid(
                "cache.backoff_cap_secs must be at least cache.backoff_base_secs, both positive"
                    .into(),
            ));
        }
        if c.stale_ttl_secs > MAX_CACHE_WINDOW_SECS || c.backoff_cap_secs > MAX_CACHE_WINDOW_SECS {
            return Err(ConfigError::Invalid(format!(
                "cache.stale_ttl_secs and cache.backoff_cap_secs must not exceed {MAX_CACHE_WINDOW_SECS}"
            )));
        }
        let d = &self.daemon;
        if d.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("daemon.poll_interval_secs must be positive".into()));
        }
        if !(MIN_OFFLINE_THRESHOLD_MINUTES..=MAX_OFFLINE_THRESHOLD_MINUTES)
            .contains(&d.offline_threshold_minutes)
        {
            return Err(ConfigError::Invalid(format!(
                "daemon.offline_threshold_minutes must be within \
                 {MIN_OFFLINE_THRESHOLD_MINUTES}..={MAX_OFFLINE_THRESHOLD_MINUTES}, got {}",
                d.offline_threshold_minutes
            )));
        }
        if d.primary_station.trim().is_empty() || d.fallback_station.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "daemon.primary_station and daemon.fallback_station must not be empty".into(),
            ));
        }
        if !self.thresholds.water_level.is_ascending() {
            return Err(ConfigError::Invalid(
                "water level thresholds must ascend advisory < alert < warning < critical".into(),
            ));
        }
        if !self.thresholds.rainfall.is_ascending() {
            return Err(ConfigError::Invalid(
                "rainfall thresholds must ascend light < moderate < heavy".into(),
            ));
        }
        if self.stations.is_empty() {
            return Err(ConfigError::Invalid("at least one [[station]] is required".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for station in &self.stations {
            if !seen.insert(station.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate station id '{}'",
                    station.id
                )));
            }
        }
        Ok(())
    }

    /// Applies `WXMON_API_URL` / `WXMON_API_TIMEOUT_SECS` if set.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var(API_URL_ENV) {
            debug!(url = %url, "api url overridden from environment");
            self.api.url = url;
        }
        if let Ok(raw) = env::var(API_TIMEOUT_ENV) {
            self.api.timeout_secs = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{API_TIMEOUT_ENV} must be a whole number, got {raw:?}"))
            })?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parses configuration text. Does not apply environment overrides.
pub fn parse_config(contents: &str, origin: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(contents).map_err(|source| ConfigError::Toml {
        path: origin.to_string(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads and validates a specific file.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    parse_config(&contents, &display)
}

/// Loads the service configuration.
///
/// An explicit `$WXMON_CONFIG` must exist. The default `wxmon.toml` is
/// optional; without it the built-in defaults apply.
pub fn load_config() -> Result<Config, ConfigError> {
    let mut config = match env::var(CONFIG_PATH_ENV) {
        Ok(path) => {
            info!(path = %path, "loading configuration");
            load_config_from(&path)?
        }
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!(path = DEFAULT_CONFIG_PATH, "loading configuration");
            load_config_from(DEFAULT_CONFIG_PATH)?
        }
        Err(_) => {
            info!("no configuration file, using defaults");
            Config::default()
        }
    };
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
