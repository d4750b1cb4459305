/// Core daemon implementation for the weather monitoring service
///
/// The daemon owns the single fetch cache and everything derived from it:
/// 1. Keeps the cache warm by polling the telemetry API on a fixed cadence
/// 2. Builds the dashboard snapshot from the latest reading per station,
///    headlined by the primary station's bulletin
/// 3. Builds hourly precipitation and water-level series on request
/// 4. Logs stations that cross into alert, warning or critical
///
/// Every accessor goes through `TelemetryFetcher`, so a request arriving
/// between polls is served from cache and never waits on the network
/// unless the cache has gone stale.

use chrono::{Local, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::alert::bulletin::{Bulletin, weather_bulletin};
use crate::analysis::dashboard::{DashboardAggregator, DashboardSnapshot, HighestAlert, StationStatus};
use crate::analysis::groupings::{
    RecentAverages, filter_by_station, latest_per_station, latest_reading, recent_averages,
};
use crate::analysis::intervals::{
    DateRange, HourlySeries, IntervalAggregator, IntervalBucket, Metric, PrecipitationMetric,
    WaterLevelMetric, available_date_range,
};
use crate::config::Config;
use crate::ingest::telemetry::{FetchOrigin, Fetched, HttpSource, TelemetryFetcher, TelemetrySource};
use crate::model::{Reading, UpstreamError};
use crate::monitor::{CacheStatus, FetchCache};
use crate::stations::StationRegistry;

/// Readings averaged for the "recent conditions" block.
const RECENT_WINDOW: usize = 24;

/// Readings kept in a single-station report, newest first.
const HISTORY_LIMIT: usize = 24;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Serialize)]
pub struct PollReport {
    pub origin: FetchOrigin,
    pub readings: usize,
    pub online_sensors: usize,
    pub highest_alert: HighestAlert,
    pub attention_stations: Vec<String>,
}

/// Everything the overview page shows.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    pub origin: FetchOrigin,
    pub cache: CacheStatus,
    pub dashboard: DashboardSnapshot,
    /// Station whose reading the bulletin describes.
    pub headline_station: Option<String>,
    pub bulletin: Bulletin,
    pub recent: RecentAverages,
}

/// One station's current condition and recent history.
#[derive(Debug, Clone, Serialize)]
pub struct StationReport {
    pub origin: FetchOrigin,
    pub status: StationStatus,
    pub bulletin: Bulletin,
    pub recent: RecentAverages,
    pub history: Vec<Reading>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StationSeries<C, S> {
    pub station_id: String,
    pub name: String,
    pub slots: Vec<IntervalBucket<C>>,
    pub summary: S,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesReport<C, S> {
    pub metric: &'static str,
    pub origin: FetchOrigin,
    pub display_date: NaiveDate,
    pub degraded: bool,
    pub stations: Vec<StationSeries<C, S>>,
}

pub type PrecipitationReport =
    SeriesReport<<PrecipitationMetric as Metric>::Category, <PrecipitationMetric as Metric>::Summary>;
pub type WaterLevelReport =
    SeriesReport<<WaterLevelMetric as Metric>::Category, <WaterLevelMetric as Metric>::Summary>;

// ---------------------------------------------------------------------------
// Daemon State
// ---------------------------------------------------------------------------

pub struct Daemon<S> {
    config: Config,
    registry: StationRegistry,
    fetcher: TelemetryFetcher<S>,
    dashboard: DashboardAggregator,
    precipitation: IntervalAggregator<PrecipitationMetric>,
    water_level: IntervalAggregator<WaterLevelMetric>,
}

impl Daemon<HttpSource> {
    /// Daemon talking to the configured telemetry API.
    pub fn from_config(config: Config) -> Result<Self, UpstreamError> {
        let source = HttpSource::new(config.api.url.clone(), config.api.timeout_secs)?;
        Ok(Self::with_source(config, source))
    }
}

impl<S: TelemetrySource> Daemon<S> {
    pub fn with_source(config: Config, source: S) -> Self {
        let registry = config.registry();
        let cache = Arc::new(FetchCache::new(config.cache_policy()));
        let water = config.thresholds.water_level;
        let rain = config.thresholds.rainfall;

        Self {
            dashboard: DashboardAggregator::new(registry.clone(), water, rain)
                .with_offline_threshold(config.daemon.offline_threshold_minutes),
            precipitation: IntervalAggregator::new(PrecipitationMetric { thresholds: rain }),
            water_level: IntervalAggregator::new(WaterLevelMetric {
                thresholds: water,
                ..WaterLevelMetric::default()
            }),
            fetcher: TelemetryFetcher::new(source, cache),
            registry,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &StationRegistry {
        &self.registry
    }

    pub fn fetcher(&self) -> &TelemetryFetcher<S> {
        &self.fetcher
    }

    fn local_now() -> NaiveDateTime {
        Local::now().naive_local()
    }

    /// Cache-backed readings plus where they came from.
    pub fn readings(&self, force_refresh: bool) -> Fetched {
        self.fetcher.fetch_with_origin(force_refresh)
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.fetcher.cache().status()
    }

    pub fn snapshot(&self, force_refresh: bool) -> SnapshotReport {
        self.snapshot_at(force_refresh, Self::local_now())
    }

    pub fn snapshot_at(&self, force_refresh: bool, now: NaiveDateTime) -> SnapshotReport {
        let fetched = self.readings(force_refresh);
        let latest = latest_per_station(&fetched.readings, &self.registry);
        let headline = self.headline_reading(&fetched.readings);

        SnapshotReport {
            origin: fetched.origin,
            cache: self.cache_status(),
            dashboard: self.dashboard.snapshot(&latest, now),
            headline_station: headline.as_ref().and_then(|r| r.station_id.clone()),
            bulletin: self.bulletin(headline.as_ref()),
            recent: recent_averages(&fetched.readings, RECENT_WINDOW),
        }
    }

    fn bulletin(&self, reading: Option<&Reading>) -> Bulletin {
        let thresholds = &self.config.thresholds;
        weather_bulletin(reading, &thresholds.water_level, &thresholds.rainfall)
    }

    /// Reading behind the headline bulletin: the primary station's newest,
    /// else the fallback station's, else the newest from any station.
    fn headline_reading(&self, readings: &[Reading]) -> Option<Reading> {
        let daemon = &self.config.daemon;
        if let Some(reading) = filter_by_station(readings, &daemon.primary_station)
            .into_iter()
            .next()
        {
            return Some(reading);
        }
        if let Some(reading) = filter_by_station(readings, &daemon.fallback_station)
            .into_iter()
            .next()
        {
            debug!(
                primary = %daemon.primary_station,
                fallback = %daemon.fallback_station,
                "primary station silent, headline from fallback"
            );
            return Some(reading);
        }
        let newest = latest_reading(readings).cloned();
        if let Some(reading) = &newest {
            warn!(
                primary = %daemon.primary_station,
                fallback = %daemon.fallback_station,
                station_id = ?reading.station_id,
                "primary and fallback stations silent, headline from newest reading"
            );
        }
        newest
    }

    pub fn station_report(&self, force_refresh: bool, station_id: &str) -> Option<StationReport> {
        self.station_report_at(force_refresh, station_id, Self::local_now())
    }

    /// Report for one registry station; `None` for an unknown id.
    pub fn station_report_at(
        &self,
        force_refresh: bool,
        station_id: &str,
        now: NaiveDateTime,
    ) -> Option<StationReport> {
        self.registry.find(station_id)?;
        let fetched = self.readings(force_refresh);
        let mut history = filter_by_station(&fetched.readings, station_id);
        history.truncate(HISTORY_LIMIT);
        let newest = history.first();

        Some(StationReport {
            origin: fetched.origin,
            status: self.dashboard.station_status(station_id, newest, now),
            bulletin: self.bulletin(newest),
            recent: recent_averages(&history, RECENT_WINDOW),
            history,
        })
    }

    fn series<M: Metric>(
        &self,
        aggregator: &IntervalAggregator<M>,
        target_date: Option<NaiveDate>,
        station: Option<&str>,
        now: NaiveDateTime,
    ) -> SeriesReport<M::Category, M::Summary> {
        let fetched = self.readings(false);
        let ids: Vec<&str> = self
            .registry
            .ids()
            .into_iter()
            .filter(|id| station.is_none_or(|wanted| wanted == *id))
            .collect();

        let HourlySeries {
            display_date,
            degraded,
            stations,
        } = aggregator.hourly_series(&fetched.readings, &ids, target_date, now);

        // Registry order, not map order.
        let mut by_id = stations;
        let stations = ids
            .iter()
            .filter_map(|id| by_id.remove(*id).map(|slots| (*id, slots)))
            .map(|(id, slots)| StationSeries {
                station_id: id.to_string(),
                name: self.registry.name_of(id).to_string(),
                summary: aggregator.summary_statistics(&slots),
                slots,
            })
            .collect();

        SeriesReport {
            metric: aggregator.metric().name(),
            origin: fetched.origin,
            display_date,
            degraded,
            stations,
        }
    }

    pub fn precipitation_series(
        &self,
        target_date: Option<NaiveDate>,
        station: Option<&str>,
    ) -> PrecipitationReport {
        self.series(&self.precipitation, target_date, station, Self::local_now())
    }

    pub fn water_level_series(
        &self,
        target_date: Option<NaiveDate>,
        station: Option<&str>,
    ) -> WaterLevelReport {
        self.series(&self.water_level, target_date, station, Self::local_now())
    }

    /// Earliest and latest timestamps in the current reading set.
    pub fn date_range(&self) -> Option<DateRange> {
        available_date_range(&self.readings(false).readings)
    }

    /// Run one iteration of the monitoring loop.
    pub fn poll_once(&self) -> PollReport {
        self.poll_once_at(Self::local_now())
    }

    pub fn poll_once_at(&self, now: NaiveDateTime) -> PollReport {
        let fetched = self.readings(false);
        let latest = latest_per_station(&fetched.readings, &self.registry);
        let snapshot = self.dashboard.snapshot(&latest, now);

        for station in snapshot.stations.iter().filter(|s| s.needs_attention) {
            warn!(
                station_id = %station.station_id,
                name = %station.name,
                level = %station.alert_level,
                water_level = ?station.water_level,
                "station above alert threshold"
            );
        }
        if !snapshot.offline_stations.is_empty() {
            warn!(offline = ?snapshot.offline_stations, "stations offline");
        }

        PollReport {
            origin: fetched.origin,
            readings: fetched.readings.len(),
            online_sensors: snapshot.online_sensors,
            highest_alert: snapshot.highest_alert,
            attention_stations: snapshot.attention_stations,
        }
    }

    /// Main daemon loop (runs indefinitely).
    pub fn run(&self) {
        self.run_until(|| false);
    }

    /// Polls on the configured interval until `should_stop` returns true
    /// after a poll.
    pub fn run_until(&self, mut should_stop: impl FnMut() -> bool) {
        let interval = Duration::from_secs(self.config.daemon.poll_interval_secs);
        info!(
            poll_interval_secs = interval.as_secs(),
            stations = self.registry.len(),
            api = %self.config.api.url,
            "starting poll loop"
        );

        loop {
            let start = Utc::now();
            let report = self.poll_once();
            info!(
                origin = ?report.origin,
                readings = report.readings,
                online = report.online_sensors,
                highest = %report.highest_alert.level,
                "poll complete"
            );

            if should_stop() {
                break;
            }

            // Sleep until next poll interval
            let elapsed = (Utc::now() - start).to_std().unwrap_or_default();
            if let Some(remaining) = interval.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::bulletin::BulletinLevel;
    use crate::ingest::fixtures::{fixture_error_envelope, fixture_weather_list};
    use crate::ingest::timestamp::parse_timestamp;
    use crate::model::AlertLevel;
    use serde_json::Value;

    struct StaticSource(&'static str);

    impl TelemetrySource for StaticSource {
        fn fetch_payload(&self) -> Result<Value, UpstreamError> {
            serde_json::from_str(self.0).map_err(|e| UpstreamError::Decode(e.to_string()))
        }
    }

    fn daemon(body: &'static str) -> Daemon<StaticSource> {
        Daemon::with_source(Config::default(), StaticSource(body))
    }

    fn fixture_now() -> NaiveDateTime {
        parse_timestamp("2024-11-23 14:30:00").unwrap()
    }

    #[test]
    fn test_poll_once_reports_fixture_alerts() {
        let report = daemon(fixture_weather_list()).poll_once_at(fixture_now());

        assert_eq!(report.origin, FetchOrigin::Live);
        assert_eq!(report.readings, 5);
        assert_eq!(report.online_sensors, 5);
        assert_eq!(report.highest_alert.level, AlertLevel::Critical);
        assert_eq!(
            report.attention_stations,
            vec!["Mangit Station", "Laganac Station", "Luluasan Station"]
        );
    }

    #[test]
    fn test_snapshot_includes_bulletin_and_cache_status() {
        let d = daemon(fixture_weather_list());
        let report = d.snapshot_at(false, fixture_now());

        assert_eq!(report.dashboard.total_sensors, 5);
        assert_eq!(report.dashboard.critical_count, 1);
        assert_eq!(report.dashboard.warning_count, 1);
        assert_eq!(report.dashboard.alert_count, 1);
        assert_eq!(report.cache.data_count, 5);
        assert_eq!(report.recent.sample_count, 5);
        // St4 reports, but its water level and rain did not parse.
        assert_eq!(report.headline_station.as_deref(), Some("St4"));
        assert_eq!(report.bulletin.level, BulletinLevel::Normal);
        assert!(report.bulletin.message.starts_with("Weather conditions normal"));
    }

    #[test]
    fn test_headline_follows_primary_station_not_newest() {
        let body = r#"[
          {"StationID": "St5", "DateTime": "2024-11-23 14:20:00", "WaterLevel": "1012.3", "HourlyRain": "0"},
          {"StationID": "St4", "DateTime": "2024-11-23 13:00:00", "WaterLevel": "720.0", "HourlyRain": "0"},
          {"StationID": "St4", "DateTime": "2024-11-23 14:00:00", "WaterLevel": "820.0", "HourlyRain": "0"}
        ]"#;
        let report = daemon(body).snapshot_at(false, fixture_now());

        assert_eq!(report.dashboard.highest_alert.level, AlertLevel::Critical);
        assert_eq!(report.headline_station.as_deref(), Some("St4"));
        assert_eq!(report.bulletin.level, BulletinLevel::Alert);
        assert_eq!(report.bulletin.message, "ALERT: Water level at 820.0cm - Monitor closely");
    }

    #[test]
    fn test_headline_falls_back_to_fallback_then_newest() {
        let without_primary = r#"[
          {"StationID": "St2", "DateTime": "2024-11-23 14:20:00", "WaterLevel": "950.0", "HourlyRain": "0"},
          {"StationID": "St1", "DateTime": "2024-11-23 14:00:00", "WaterLevel": "720.0", "HourlyRain": "0"}
        ]"#;
        let report = daemon(without_primary).snapshot_at(false, fixture_now());
        assert_eq!(report.headline_station.as_deref(), Some("St1"));
        assert_eq!(report.bulletin.level, BulletinLevel::Advisory);

        let neither = r#"[
          {"StationID": "St3", "DateTime": "2024-11-23 13:00:00", "WaterLevel": "650.0", "HourlyRain": "0"},
          {"StationID": "St2", "DateTime": "2024-11-23 14:20:00", "WaterLevel": "950.0", "HourlyRain": "0"}
        ]"#;
        let report = daemon(neither).snapshot_at(false, fixture_now());
        assert_eq!(report.headline_station.as_deref(), Some("St2"));
        assert_eq!(report.bulletin.level, BulletinLevel::Warning);
    }

    #[test]
    fn test_station_report_for_one_station() {
        let d = daemon(fixture_weather_list());
        let report = d.station_report_at(false, "St3", fixture_now()).unwrap();

        assert_eq!(report.status.name, "Laganac Station");
        assert_eq!(report.status.alert_level, AlertLevel::Warning);
        assert!(report.status.online);
        assert_eq!(report.bulletin.level, BulletinLevel::Warning);
        assert_eq!(report.history.len(), 1);
        assert_eq!(report.recent.total_rainfall, Some(31.5));

        assert!(d.station_report_at(false, "St42", fixture_now()).is_none());
    }

    #[test]
    fn test_station_report_without_readings() {
        let d = daemon(fixture_error_envelope());
        let report = d.station_report_at(false, "St1", fixture_now()).unwrap();

        assert_eq!(report.origin, FetchOrigin::Unavailable);
        assert!(!report.status.online);
        assert!(report.history.is_empty());
        assert_eq!(report.bulletin.level, BulletinLevel::NoData);
    }

    #[test]
    fn test_upstream_failure_degrades_to_empty() {
        let d = daemon(fixture_error_envelope());
        let report = d.snapshot_at(false, fixture_now());

        assert_eq!(report.origin, FetchOrigin::Unavailable);
        assert_eq!(report.dashboard.online_sensors, 0);
        assert_eq!(report.dashboard.offline_stations.len(), 5);
        assert_eq!(report.cache.fetch_errors, 1);
    }

    #[test]
    fn test_series_in_registry_order_and_filterable() {
        let d = daemon(fixture_weather_list());
        let all = d.series(&d.precipitation, None, None, fixture_now());
        let ids: Vec<_> = all.stations.iter().map(|s| s.station_id.as_str()).collect();
        assert_eq!(ids, vec!["St1", "St2", "St3", "St4", "St5"]);
        assert_eq!(all.display_date, NaiveDate::from_ymd_opt(2024, 11, 23).unwrap());
        assert!(all.stations.iter().all(|s| s.slots.len() == 24));

        let one = d.series(&d.water_level, None, Some("St3"), fixture_now());
        assert_eq!(one.stations.len(), 1);
        assert_eq!(one.stations[0].name, "Laganac Station");
        assert_eq!(one.metric, "water_level");

        let none = d.series(&d.water_level, None, Some("St42"), fixture_now());
        assert!(none.stations.is_empty());
    }

    #[test]
    fn test_precipitation_series_uses_fixture_rain() {
        let d = daemon(fixture_weather_list());
        let report = d.series(&d.precipitation, None, Some("St3"), fixture_now());
        let st3 = &report.stations[0];

        assert_eq!(st3.slots[14].count, 1);
        assert_eq!(st3.slots[14].value, 31.5);
        assert_eq!(st3.summary.intervals_with_rain, 1);
    }

    #[test]
    fn test_date_range_from_fixture() {
        let range = daemon(fixture_weather_list()).date_range().unwrap();
        assert_eq!(range.total_days(), 1);
        assert_eq!(range.latest, parse_timestamp("2024-11-23 14:05:00").unwrap());
    }

    #[test]
    fn test_run_until_stops_after_first_poll() {
        let d = daemon(fixture_weather_list());
        let mut polls = 0;
        d.run_until(|| {
            polls += 1;
            true
        });
        assert_eq!(polls, 1);
        assert_eq!(d.cache_status().data_count, 5);
    }
}
