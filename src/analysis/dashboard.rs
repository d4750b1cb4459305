/// System-wide dashboard snapshot.
///
/// Reduces the latest reading of every station to the figures the overview
/// page shows: how many stations are online, how many sit at each alert
/// level, which single level is the highest active one, and a rainfall
/// forecast category from the network-wide average hourly rain.
///
/// Snapshots are derived per request and never stored.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::alert::thresholds::{
    RainfallThresholds, WaterLevelThresholds, classify_alert, classify_rainfall,
};
use crate::model::{AlertLevel, RainfallIntensity, Reading};
use crate::stations::StationRegistry;

/// A station whose latest reading is older than this is offline.
pub const DEFAULT_OFFLINE_THRESHOLD_MINUTES: i64 = 60;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Current condition of one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationStatus {
    pub station_id: String,
    pub name: String,
    pub online: bool,
    pub alert_level: AlertLevel,
    pub rainfall_level: RainfallIntensity,
    pub water_level: Option<f64>,
    pub hourly_rain: Option<f64>,
    pub last_reading: Option<NaiveDateTime>,
    pub needs_attention: bool,
}

/// Highest active alert level and how many stations share it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HighestAlert {
    pub level: AlertLevel,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub total_sensors: usize,
    pub online_sensors: usize,
    pub offline_stations: Vec<String>,
    pub attention_stations: Vec<String>,

    pub normal_count: usize,
    pub advisory_count: usize,
    pub alert_count: usize,
    pub warning_count: usize,
    pub critical_count: usize,
    pub highest_alert: HighestAlert,

    pub average_rainfall: f64,
    pub rainfall_forecast: RainfallIntensity,

    pub stations: Vec<StationStatus>,
}

impl DashboardSnapshot {
    pub fn count_for(&self, level: AlertLevel) -> usize {
        match level {
            AlertLevel::Normal => self.normal_count,
            AlertLevel::Advisory => self.advisory_count,
            AlertLevel::Alert => self.alert_count,
            AlertLevel::Warning => self.warning_count,
            AlertLevel::Critical => self.critical_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DashboardAggregator {
    registry: StationRegistry,
    water: WaterLevelThresholds,
    rain: RainfallThresholds,
    offline_threshold: Duration,
}

impl Default for DashboardAggregator {
    fn default() -> Self {
        Self::new(
            StationRegistry::default(),
            WaterLevelThresholds::default(),
            RainfallThresholds::default(),
        )
    }
}

impl DashboardAggregator {
    pub fn new(
        registry: StationRegistry,
        water: WaterLevelThresholds,
        rain: RainfallThresholds,
    ) -> Self {
        Self {
            registry,
            water,
            rain,
            offline_threshold: Duration::minutes(DEFAULT_OFFLINE_THRESHOLD_MINUTES),
        }
    }

    /// Negative input counts as zero; oversized input saturates.
    pub fn with_offline_threshold(mut self, minutes: i64) -> Self {
        self.offline_threshold = Duration::try_minutes(minutes.max(0)).unwrap_or(Duration::MAX);
        self
    }

    /// Online iff the reading has an instant no older than the threshold.
    pub fn is_online(&self, reading: Option<&Reading>, now: NaiveDateTime) -> bool {
        reading
            .and_then(|r| r.instant)
            .is_some_and(|at| now - at <= self.offline_threshold)
    }

    pub fn station_status(
        &self,
        station_id: &str,
        reading: Option<&Reading>,
        now: NaiveDateTime,
    ) -> StationStatus {
        let water_level = reading.and_then(|r| r.water_level);
        let hourly_rain = reading.and_then(|r| r.hourly_rain);
        let alert_level = classify_alert(water_level, &self.water);

        StationStatus {
            station_id: station_id.to_string(),
            name: self.registry.name_of(station_id).to_string(),
            online: self.is_online(reading, now),
            alert_level,
            rainfall_level: classify_rainfall(hourly_rain, &self.rain),
            water_level,
            hourly_rain,
            last_reading: reading.and_then(|r| r.instant),
            needs_attention: alert_level.needs_attention(),
        }
    }

    /// Builds the snapshot from station id → latest reading.
    ///
    /// A station with no reading at all is listed offline and counted in
    /// `total_sensors`, but contributes to no level count and gets no
    /// `StationStatus` entry.
    pub fn snapshot(
        &self,
        latest: &BTreeMap<String, Option<Reading>>,
        now: NaiveDateTime,
    ) -> DashboardSnapshot {
        let mut offline_stations = Vec::new();
        let mut stations: Vec<StationStatus> = Vec::with_capacity(latest.len());
        for (id, reading) in latest {
            let Some(reading) = reading else {
                offline_stations.push(self.registry.name_of(id).to_string());
                continue;
            };
            let status = self.station_status(id, Some(reading), now);
            if !status.online {
                offline_stations.push(status.name.clone());
            }
            stations.push(status);
        }

        let count = |level: AlertLevel| stations.iter().filter(|s| s.alert_level == level).count();
        let highest = AlertLevel::ACTIVE_DESCENDING
            .into_iter()
            .map(|level| HighestAlert {
                level,
                count: count(level),
            })
            .find(|h| h.count > 0)
            .unwrap_or(HighestAlert {
                level: AlertLevel::Normal,
                count: 0,
            });

        let rainfall: Vec<f64> = stations.iter().filter_map(|s| s.hourly_rain).collect();
        let average_rainfall = if rainfall.is_empty() {
            0.0
        } else {
            rainfall.iter().sum::<f64>() / rainfall.len() as f64
        };

        DashboardSnapshot {
            total_sensors: latest.len(),
            online_sensors: stations.iter().filter(|s| s.online).count(),
            offline_stations,
            attention_stations: stations
                .iter()
                .filter(|s| s.needs_attention)
                .map(|s| s.name.clone())
                .collect(),
            normal_count: count(AlertLevel::Normal),
            advisory_count: count(AlertLevel::Advisory),
            alert_count: count(AlertLevel::Alert),
            warning_count: count(AlertLevel::Warning),
            critical_count: count(AlertLevel::Critical),
            highest_alert: highest,
            average_rainfall,
            rainfall_forecast: classify_rainfall(Some(average_rainfall), &self.rain),
            stations,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::timestamp::parse_timestamp;

    fn now() -> NaiveDateTime {
        parse_timestamp("2024-11-23 14:30:00").unwrap()
    }

    fn reading(id: &str, at: &str, water_level: Option<f64>, hourly_rain: Option<f64>) -> Reading {
        Reading {
            station_id: Some(id.to_string()),
            timestamp: Some(at.to_string()),
            instant: parse_timestamp(at).ok(),
            water_level,
            hourly_rain,
            ..Reading::default()
        }
    }

    fn five_stations() -> BTreeMap<String, Option<Reading>> {
        [
            ("St1", 1050.0),
            ("St2", 950.0),
            ("St3", 850.0),
            ("St4", 750.0),
            ("St5", 650.0),
        ]
        .into_iter()
        .map(|(id, level)| {
            (
                id.to_string(),
                Some(reading(id, "2024-11-23 14:25:00", Some(level), Some(0.0))),
            )
        })
        .collect()
    }

    #[test]
    fn test_one_station_per_level() {
        let snap = DashboardAggregator::default().snapshot(&five_stations(), now());

        assert_eq!(snap.critical_count, 1);
        assert_eq!(snap.warning_count, 1);
        assert_eq!(snap.alert_count, 1);
        assert_eq!(snap.advisory_count, 1);
        assert_eq!(snap.normal_count, 1);
        assert_eq!(snap.online_sensors, 5);
        assert_eq!(snap.highest_alert.level, AlertLevel::Critical);
        assert_eq!(snap.highest_alert.count, 1);
        assert_eq!(
            snap.attention_stations,
            vec!["Binudegahan Station", "Mangit Station", "Laganac Station"]
        );
        assert!(snap.offline_stations.is_empty());
    }

    #[test]
    fn test_empty_map_is_all_zero() {
        let snap = DashboardAggregator::default().snapshot(&BTreeMap::new(), now());

        assert_eq!(snap.total_sensors, 0);
        assert_eq!(snap.online_sensors, 0);
        assert_eq!(snap.critical_count + snap.warning_count + snap.alert_count, 0);
        assert_eq!(snap.highest_alert.level, AlertLevel::Normal);
        assert_eq!(snap.highest_alert.count, 0);
        assert_eq!(snap.average_rainfall, 0.0);
        assert_eq!(snap.rainfall_forecast, RainfallIntensity::None);
    }

    #[test]
    fn test_offline_detection() {
        let mut latest = BTreeMap::new();
        latest.insert(
            "St1".to_string(),
            Some(reading("St1", "2024-11-23 13:30:00", Some(100.0), None)),
        );
        latest.insert(
            "St2".to_string(),
            Some(reading("St2", "2024-11-23 13:29:59", Some(100.0), None)),
        );
        latest.insert(
            "St3".to_string(),
            Some(reading("St3", "whenever", Some(100.0), None)),
        );
        latest.insert("St4".to_string(), None);

        let snap = DashboardAggregator::default().snapshot(&latest, now());
        assert_eq!(snap.online_sensors, 1, "exactly 60 minutes old is still online");
        assert_eq!(
            snap.offline_stations,
            vec!["Mangit Station", "Laganac Station", "MDRRMO Station"]
        );
    }

    #[test]
    fn test_station_without_reading_is_offline_but_uncounted() {
        let mut latest = five_stations();
        latest.insert("St5".to_string(), None);

        let snap = DashboardAggregator::default().snapshot(&latest, now());
        assert_eq!(snap.total_sensors, 5);
        assert_eq!(snap.online_sensors, 4);
        assert_eq!(snap.offline_stations, vec!["Luluasan Station"]);
        // St5 was the only normal station; its missing reading is not "normal".
        assert_eq!(snap.normal_count, 0);
        assert_eq!(snap.stations.len(), 4);
        let counted: usize = AlertLevel::ACTIVE_DESCENDING
            .into_iter()
            .chain([AlertLevel::Normal])
            .map(|level| snap.count_for(level))
            .sum();
        assert_eq!(counted, 4);
    }

    #[test]
    fn test_out_of_range_offline_thresholds_do_not_panic() {
        let r = reading("St1", "2024-11-23 14:29:00", None, None);
        let huge = DashboardAggregator::default().with_offline_threshold(i64::MAX);
        assert!(huge.is_online(Some(&r), now()));
        let negative = DashboardAggregator::default().with_offline_threshold(-30);
        assert!(!negative.is_online(Some(&r), now()));
    }

    #[test]
    fn test_average_rainfall_ignores_missing_values() {
        let mut latest = BTreeMap::new();
        latest.insert(
            "St1".to_string(),
            Some(reading("St1", "2024-11-23 14:00:00", None, Some(20.0))),
        );
        latest.insert(
            "St2".to_string(),
            Some(reading("St2", "2024-11-23 14:00:00", None, Some(10.0))),
        );
        latest.insert(
            "St3".to_string(),
            Some(reading("St3", "2024-11-23 14:00:00", None, None)),
        );

        let snap = DashboardAggregator::default().snapshot(&latest, now());
        assert_eq!(snap.average_rainfall, 15.0);
        assert_eq!(snap.rainfall_forecast, RainfallIntensity::Moderate);
    }

    #[test]
    fn test_station_status_for_unknown_station_uses_id() {
        let agg = DashboardAggregator::default();
        let status = agg.station_status("St9", None, now());
        assert_eq!(status.name, "St9");
        assert!(!status.online);
        assert_eq!(status.alert_level, AlertLevel::Normal);
        assert_eq!(status.rainfall_level, RainfallIntensity::NoData);
    }

    #[test]
    fn test_custom_offline_threshold() {
        let agg = DashboardAggregator::default().with_offline_threshold(10);
        let r = reading("St1", "2024-11-23 14:15:00", None, None);
        assert!(!agg.is_online(Some(&r), now()));
    }
}
