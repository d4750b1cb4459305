/// One-line public bulletin for the current conditions at a station.
///
/// Water level takes precedence over rainfall: a station above any water
/// threshold reports that, and only otherwise is rain intensity considered.

use serde::Serialize;

use crate::alert::thresholds::{RainfallThresholds, WaterLevelThresholds, classify_alert};
use crate::model::{AlertLevel, Reading};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BulletinLevel {
    NoData,
    Normal,
    Advisory,
    Alert,
    Warning,
    Critical,
}

impl From<AlertLevel> for BulletinLevel {
    fn from(level: AlertLevel) -> Self {
        match level {
            AlertLevel::Normal => BulletinLevel::Normal,
            AlertLevel::Advisory => BulletinLevel::Advisory,
            AlertLevel::Alert => BulletinLevel::Alert,
            AlertLevel::Warning => BulletinLevel::Warning,
            AlertLevel::Critical => BulletinLevel::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bulletin {
    pub level: BulletinLevel,
    pub message: String,
}

fn water_level_message(level: AlertLevel, value: f64) -> Option<String> {
    let (prefix, action) = match level {
        AlertLevel::Normal => return None,
        AlertLevel::Advisory => ("ADVISORY", "Stay informed"),
        AlertLevel::Alert => ("ALERT", "Monitor closely"),
        AlertLevel::Warning => ("WARNING", "Prepare for evacuation"),
        AlertLevel::Critical => ("CRITICAL", "Immediate evacuation required"),
    };
    Some(format!("{prefix}: Water level at {value:.1}cm - {action}"))
}

/// Builds the bulletin for `reading`, or a "connecting" notice without one.
/// Missing values are treated as zero.
pub fn weather_bulletin(
    reading: Option<&Reading>,
    water: &WaterLevelThresholds,
    rain: &RainfallThresholds,
) -> Bulletin {
    let Some(reading) = reading else {
        return Bulletin {
            level: BulletinLevel::NoData,
            message: "Connecting to weather sensors...".to_string(),
        };
    };

    let water_level = reading.water_level.unwrap_or(0.0);
    let rainfall = reading.hourly_rain.unwrap_or(0.0);

    let level = classify_alert(Some(water_level), water);
    if let Some(message) = water_level_message(level, water_level) {
        return Bulletin {
            level: level.into(),
            message,
        };
    }

    if rainfall >= rain.heavy {
        Bulletin {
            level: BulletinLevel::Warning,
            message: format!("Heavy rainfall detected: {rainfall:.1}mm/hr - Monitor water levels"),
        }
    } else if rainfall >= rain.moderate {
        Bulletin {
            level: BulletinLevel::Advisory,
            message: format!("Moderate rainfall: {rainfall:.1}mm/hr - Stay alert"),
        }
    } else {
        Bulletin {
            level: BulletinLevel::Normal,
            message: "Weather conditions normal - All systems operational".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(water_level: Option<f64>, hourly_rain: Option<f64>) -> Reading {
        Reading {
            station_id: Some("St1".into()),
            water_level,
            hourly_rain,
            ..Reading::default()
        }
    }

    fn bulletin(r: Option<&Reading>) -> Bulletin {
        weather_bulletin(r, &WaterLevelThresholds::default(), &RainfallThresholds::default())
    }

    #[test]
    fn test_no_reading_reports_connecting() {
        let b = bulletin(None);
        assert_eq!(b.level, BulletinLevel::NoData);
        assert_eq!(b.message, "Connecting to weather sensors...");
    }

    #[test]
    fn test_critical_water_level_message() {
        let b = bulletin(Some(&reading(Some(1012.34), Some(40.0))));
        assert_eq!(b.level, BulletinLevel::Critical);
        assert_eq!(
            b.message,
            "CRITICAL: Water level at 1012.3cm - Immediate evacuation required"
        );
    }

    #[test]
    fn test_water_level_outranks_heavy_rain() {
        let b = bulletin(Some(&reading(Some(720.0), Some(45.0))));
        assert_eq!(b.level, BulletinLevel::Advisory);
        assert!(b.message.starts_with("ADVISORY: Water level at 720.0cm"));
    }

    #[test]
    fn test_rain_only_bulletins() {
        let heavy = bulletin(Some(&reading(Some(100.0), Some(30.0))));
        assert_eq!(heavy.level, BulletinLevel::Warning);
        assert_eq!(
            heavy.message,
            "Heavy rainfall detected: 30.0mm/hr - Monitor water levels"
        );

        let moderate = bulletin(Some(&reading(None, Some(15.5))));
        assert_eq!(moderate.level, BulletinLevel::Advisory);
        assert_eq!(moderate.message, "Moderate rainfall: 15.5mm/hr - Stay alert");
    }

    #[test]
    fn test_quiet_conditions_are_normal() {
        let b = bulletin(Some(&reading(None, None)));
        assert_eq!(b.level, BulletinLevel::Normal);
        assert_eq!(b.message, "Weather conditions normal - All systems operational");
    }

    #[test]
    fn test_levels_serialize_kebab_case() {
        assert_eq!(
            serde_json::to_string(&BulletinLevel::NoData).unwrap(),
            "\"no-data\""
        );
    }
}
