/// Threshold classification for water level and rainfall.
///
/// Both scales are checked from the most severe category down and the first
/// satisfied lower bound wins, so every breakpoint is inclusive:
/// 700.0 is `Advisory`, 699.9 is `Normal`.

use serde::{Deserialize, Serialize};

use crate::model::{AlertLevel, RainfallIntensity};

// ---------------------------------------------------------------------------
// Breakpoints
// ---------------------------------------------------------------------------

/// Water-level lower bounds, same unit as the `WaterLevel` telemetry field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterLevelThresholds {
    pub advisory: f64,
    pub alert: f64,
    pub warning: f64,
    pub critical: f64,
}

impl Default for WaterLevelThresholds {
    fn default() -> Self {
        Self {
            advisory: 700.0,
            alert: 800.0,
            warning: 900.0,
            critical: 1000.0,
        }
    }
}

impl WaterLevelThresholds {
    /// Lower bound for an active level; `None` for `Normal`.
    pub fn lower_bound(&self, level: AlertLevel) -> Option<f64> {
        match level {
            AlertLevel::Normal => None,
            AlertLevel::Advisory => Some(self.advisory),
            AlertLevel::Alert => Some(self.alert),
            AlertLevel::Warning => Some(self.warning),
            AlertLevel::Critical => Some(self.critical),
        }
    }

    pub fn is_ascending(&self) -> bool {
        self.advisory < self.alert && self.alert < self.warning && self.warning < self.critical
    }
}

/// Hourly rainfall lower bounds in mm/hr.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainfallThresholds {
    pub light: f64,
    pub moderate: f64,
    pub heavy: f64,
}

impl Default for RainfallThresholds {
    fn default() -> Self {
        Self {
            light: 5.0,
            moderate: 15.0,
            heavy: 30.0,
        }
    }
}

impl RainfallThresholds {
    pub fn is_ascending(&self) -> bool {
        self.light < self.moderate && self.moderate < self.heavy
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classifies a water level. Absent or non-finite values are `Normal`.
pub fn classify_alert(value: Option<f64>, thresholds: &WaterLevelThresholds) -> AlertLevel {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return AlertLevel::Normal;
    };
    AlertLevel::ACTIVE_DESCENDING
        .into_iter()
        .find(|level| thresholds.lower_bound(*level).is_some_and(|bound| v >= bound))
        .unwrap_or(AlertLevel::Normal)
}

/// Classifies an hourly rainfall value. Absent or non-finite values are
/// `NoData`; anything below the light bound is `None`.
pub fn classify_rainfall(value: Option<f64>, thresholds: &RainfallThresholds) -> RainfallIntensity {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return RainfallIntensity::NoData;
    };
    if v >= thresholds.heavy {
        RainfallIntensity::Heavy
    } else if v >= thresholds.moderate {
        RainfallIntensity::Moderate
    } else if v >= thresholds.light {
        RainfallIntensity::Light
    } else {
        RainfallIntensity::None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
