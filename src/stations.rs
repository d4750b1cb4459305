/// Station registry for the Balatan weather and water-level network.
///
/// Defines the stations this service reports on, with their display names
/// and positions. The five default stations match the deployed network;
/// a `[[station]]` list in `wxmon.toml` replaces them entirely. All other
/// modules look station names up here rather than hardcoding them.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Station metadata
// ---------------------------------------------------------------------------

/// Metadata for a single monitoring station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Identifier as it appears in the telemetry `StationID` field.
    pub id: String,
    pub name: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Sensor elevation above sea level, metres.
    #[serde(default)]
    pub elevation_m: Option<f64>,
}

struct StationSeed {
    id: &'static str,
    name: &'static str,
    latitude: f64,
    longitude: f64,
    elevation_m: f64,
}

/// The deployed network, ordered by station id.
static DEFAULT_STATIONS: &[StationSeed] = &[
    StationSeed {
        id: "St1",
        name: "Binudegahan Station",
        latitude: 13.3483,
        longitude: 123.2609,
        elevation_m: 14.7,
    },
    StationSeed {
        id: "St2",
        name: "Mangit Station",
        latitude: 13.3464,
        longitude: 123.2517,
        elevation_m: 10.5,
    },
    StationSeed {
        id: "St3",
        name: "Laganac Station",
        latitude: 13.3296,
        longitude: 123.2481,
        elevation_m: 18.1,
    },
    StationSeed {
        id: "St4",
        name: "MDRRMO Station",
        latitude: 13.31639,
        longitude: 123.24003,
        elevation_m: 15.2,
    },
    StationSeed {
        id: "St5",
        name: "Luluasan Station",
        latitude: 13.3235,
        longitude: 123.2344,
        elevation_m: 12.8,
    },
];

pub fn default_stations() -> Vec<Station> {
    DEFAULT_STATIONS
        .iter()
        .map(|seed| Station {
            id: seed.id.to_string(),
            name: seed.name.to_string(),
            latitude: seed.latitude,
            longitude: seed.longitude,
            elevation_m: Some(seed.elevation_m),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered list of known stations.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRegistry {
    stations: Vec<Station>,
}

impl Default for StationRegistry {
    fn default() -> Self {
        Self::new(default_stations())
    }
}

impl StationRegistry {
    pub fn new(stations: Vec<Station>) -> Self {
        Self { stations }
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn ids(&self) -> Vec<&str> {
        self.stations.iter().map(|s| s.id.as_str()).collect()
    }

    /// Looks up a station by id. Returns `None` if not found.
    pub fn find(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// Display name for `id`, or the id itself for unknown stations.
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.find(id).map_or(id, |s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
