/// Station grouping and data organization utilities.
///
/// The fetcher hands out one flat list of readings from every station.
/// These helpers turn it into the shapes the views need: the latest reading
/// per registry station, one station's history, and short-term averages.
///
/// "Latest" is decided by parsed instant. Readings whose timestamp did not
/// parse sort below every parsed one; among equals the first in upstream
/// order wins.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::Reading;
use crate::stations::StationRegistry;

/// True if `candidate` should replace `current` as the newest reading.
fn is_newer(candidate: &Reading, current: &Reading) -> bool {
    candidate.instant > current.instant
}

fn newest<'a>(readings: impl Iterator<Item = &'a Reading>) -> Option<&'a Reading> {
    readings.fold(None, |best, r| match best {
        Some(b) if !is_newer(r, b) => Some(b),
        _ => Some(r),
    })
}

/// Latest reading for every registry station, keyed by station id.
/// Stations with no readings map to `None`.
pub fn latest_per_station(
    readings: &[Reading],
    registry: &StationRegistry,
) -> BTreeMap<String, Option<Reading>> {
    registry
        .stations()
        .iter()
        .map(|station| {
            let latest = newest(readings.iter().filter(|r| r.is_from(&station.id)));
            (station.id.clone(), latest.cloned())
        })
        .collect()
}

/// All readings from one station, newest first.
pub fn filter_by_station(readings: &[Reading], station_id: &str) -> Vec<Reading> {
    let mut matched: Vec<Reading> = readings
        .iter()
        .filter(|r| r.is_from(station_id))
        .cloned()
        .collect();
    // Stable: equal instants keep upstream order.
    matched.sort_by(|a, b| b.instant.cmp(&a.instant));
    matched
}

/// Newest reading across all stations.
pub fn latest_reading(readings: &[Reading]) -> Option<&Reading> {
    newest(readings.iter())
}

/// Averages over the first `n` readings in upstream order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentAverages {
    pub sample_count: usize,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub total_rainfall: Option<f64>,
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

pub fn recent_averages(readings: &[Reading], n: usize) -> RecentAverages {
    let window = &readings[..readings.len().min(n)];
    let collect = |field: fn(&Reading) -> Option<f64>| -> Vec<f64> {
        window.iter().filter_map(field).collect()
    };
    let rainfall = collect(|r| r.hourly_rain);

    RecentAverages {
        sample_count: window.len(),
        temperature: mean(&collect(|r| r.temperature)),
        humidity: mean(&collect(|r| r.humidity)),
        pressure: mean(&collect(|r| r.pressure)),
        wind_speed: mean(&collect(|r| r.wind_speed)),
        total_rainfall: (!rainfall.is_empty()).then(|| rainfall.iter().sum()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
