/// End-to-end tests: config file → daemon → mock upstream → report views.

mod common;

use chrono::{NaiveDate, NaiveDateTime};
use common::{Reply, five_station_payload, spawn_upstream};
use std::io::Write;
use wxmon_service::alert::bulletin::BulletinLevel;
use wxmon_service::config::load_config_from;
use wxmon_service::daemon::Daemon;
use wxmon_service::ingest::telemetry::{FetchOrigin, HttpSource};
use wxmon_service::model::{AlertLevel, RainfallIntensity};

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn daemon_for(url: &str, extra: &str) -> Daemon<HttpSource> {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[api]\nurl = \"{url}\"\ntimeout_secs = 5\n{extra}").unwrap();
    let config = load_config_from(file.path()).expect("config should load");
    Daemon::from_config(config).expect("client should build")
}

#[test]
fn test_dashboard_snapshot_from_live_feed() {
    let url = spawn_upstream(vec![Reply::Json(200, five_station_payload())]);
    let daemon = daemon_for(&url, "");

    let report = daemon.snapshot_at(false, at("2024-11-23 14:20:00"));
    let dash = &report.dashboard;

    assert_eq!(report.origin, FetchOrigin::Live);
    assert_eq!(dash.critical_count, 1);
    assert_eq!(dash.warning_count, 1);
    assert_eq!(dash.alert_count, 1);
    assert_eq!(dash.advisory_count, 1);
    assert_eq!(dash.online_sensors, 5);
    assert_eq!(dash.highest_alert.level, AlertLevel::Critical);
    // (0 + 2.5 + 12 + 31 + 6) / 5 = 10.3
    assert_eq!(dash.rainfall_forecast, RainfallIntensity::Light);

    // The headline is St4 at 750, not the critical St1.
    assert_eq!(report.headline_station.as_deref(), Some("St4"));
    assert_eq!(report.bulletin.level, BulletinLevel::Advisory);
    assert_eq!(
        report.bulletin.message,
        "ADVISORY: Water level at 750.0cm - Stay informed"
    );
    assert_eq!(report.cache.data_count, 5);
}

#[test]
fn test_quiet_primary_station_headlines_over_critical_neighbour() {
    let url = spawn_upstream(vec![Reply::Json(200, five_station_payload())]);
    let daemon = daemon_for(&url, "[daemon]\nprimary_station = \"St5\"");

    let report = daemon.snapshot_at(false, at("2024-11-23 14:20:00"));
    assert_eq!(report.dashboard.highest_alert.level, AlertLevel::Critical);
    assert_eq!(report.headline_station.as_deref(), Some("St5"));
    assert_eq!(report.bulletin.level, BulletinLevel::Normal);

    // The critical station is still visible through its own report.
    let st1 = daemon
        .station_report_at(false, "St1", at("2024-11-23 14:20:00"))
        .unwrap();
    assert_eq!(st1.status.alert_level, AlertLevel::Critical);
    assert_eq!(st1.bulletin.level, BulletinLevel::Critical);
    assert_eq!(st1.history.len(), 1);
}

#[test]
fn test_stations_go_offline_as_time_passes() {
    let url = spawn_upstream(vec![Reply::Json(200, five_station_payload())]);
    let daemon = daemon_for(&url, "[daemon]\noffline_threshold_minutes = 30");

    let report = daemon.snapshot_at(false, at("2024-11-23 14:45:00"));
    assert_eq!(report.dashboard.online_sensors, 0);
    assert_eq!(report.dashboard.offline_stations.len(), 5);
}

#[test]
fn test_configured_thresholds_flow_through() {
    let url = spawn_upstream(vec![Reply::Json(200, five_station_payload())]);
    let daemon = daemon_for(
        &url,
        "[thresholds.water_level]\nadvisory = 1100.0\nalert = 1200.0\nwarning = 1300.0\ncritical = 1400.0",
    );

    let report = daemon.snapshot_at(false, at("2024-11-23 14:20:00"));
    assert_eq!(report.dashboard.normal_count, 5);
    assert_eq!(report.dashboard.highest_alert.level, AlertLevel::Normal);
    // No station reaches a water threshold, so St4's 31 mm/hr decides.
    assert_eq!(report.bulletin.level, BulletinLevel::Warning);
    assert!(report.bulletin.message.starts_with("Heavy rainfall detected: 31.0mm/hr"));
}

#[test]
fn test_series_views_over_http() {
    let url = spawn_upstream(vec![Reply::Json(200, five_station_payload())]);
    let daemon = daemon_for(&url, "");

    let rain = daemon.precipitation_series(None, None);
    assert_eq!(rain.display_date, NaiveDate::from_ymd_opt(2024, 11, 23).unwrap());
    assert_eq!(rain.stations.len(), 5);
    let st4 = rain.stations.iter().find(|s| s.station_id == "St4").unwrap();
    assert_eq!(st4.slots.len(), 24);
    assert_eq!(st4.slots[14].category, RainfallIntensity::Heavy);
    assert_eq!(st4.summary.total_rainfall, 31.0);

    // Water levels in the feed exceed the accepted range, so every slot is empty.
    let water = daemon.water_level_series(None, Some("St1"));
    assert_eq!(water.stations.len(), 1);
    assert!(water.stations[0].slots.iter().all(|s| s.count == 0));
    assert_eq!(water.stations[0].summary.highest_alert_level, AlertLevel::Normal);
}

#[test]
fn test_upstream_down_from_the_start() {
    let url = spawn_upstream(vec![Reply::Json(502, "{}".into())]);
    let daemon = daemon_for(&url, "");

    let report = daemon.snapshot_at(false, at("2024-11-23 14:20:00"));
    assert_eq!(report.origin, FetchOrigin::Unavailable);
    assert_eq!(report.dashboard.total_sensors, 5);
    assert_eq!(report.dashboard.online_sensors, 0);
    assert_eq!(report.bulletin.level, BulletinLevel::NoData);
    // The mock has gone away too, so a second fetch fails the same way.
    assert!(daemon.date_range().is_none());
    assert_eq!(daemon.cache_status().fetch_errors, 2);
}
