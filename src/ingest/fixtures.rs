/// Test fixtures: telemetry API payloads as captured from the live feed.
///
/// Values have been trimmed to a handful of records per payload but keep
/// the upstream's mixed typing (numbers as strings, empty strings, nulls).

/// Bare list form, one reading per station at the same hour.
#[cfg(test)]
pub(crate) fn fixture_weather_list() -> &'static str {
    r#"[
  {"StationID": "St1", "DateTime": "2024-11-23 14:05:00", "WaterLevel": "640.2", "HourlyRain": "0.0",
   "DailyRain": "12.4", "Temperature": "27.8", "Humidity": "88", "HeatIndex": "31.2",
   "Pressure": "1009.6", "WindSpeed": "3.1", "WindDirection": "ne"},
  {"StationID": "St2", "DateTime": "2024-11-23 14:05:00", "WaterLevel": 812.0, "HourlyRain": 6.4,
   "DailyRain": 20.1, "Temperature": 27.1, "Humidity": 91, "HeatIndex": 30.4,
   "Pressure": 1009.2, "WindSpeed": 4.8, "WindDirection": "NNE"},
  {"StationID": "St3", "DateTime": "2024-11-23T14:04:30Z", "WaterLevel": "955.7", "HourlyRain": "31.5",
   "DailyRain": "48.0", "Temperature": "26.5", "Humidity": "95", "HeatIndex": "",
   "Pressure": "1008.8", "WindSpeed": "7.2", "WindDirection": "E"},
  {"StationID": "St4", "DateTime": "2024-11-23 14:00:00.000000", "WaterLevel": "", "HourlyRain": "sensor error",
   "DailyRain": null, "Temperature": "28.0", "Humidity": "85", "HeatIndex": "32.0",
   "Pressure": "1010.1", "WindSpeed": "2.0", "WindDirection": "N"},
  {"StationID": "St5", "DateTime": "2024-11-23 13:58:00", "WaterLevel": "1012.3", "HourlyRain": "2.2",
   "DailyRain": "5.5", "Temperature": "27.4", "Humidity": "90", "HeatIndex": "30.9",
   "Pressure": "1009.0", "WindSpeed": "3.9", "WindDirection": "ene"}
]"#
}

/// Wrapped form: the list sits under a top-level `data` key, with a stray
/// non-object element mixed in.
#[cfg(test)]
pub(crate) fn fixture_weather_wrapped() -> &'static str {
    r#"{
  "status": "ok",
  "data": [
    {"StationID": "St1", "DateTimeStamp": "2024-11-23 09:00:00", "WaterLevel": "702.0", "HourlyRain": "4.0"},
    "corrupt-row",
    {"StationID": "St2", "Timestamp": "2024-11-23 09:30:00", "WaterLevel": "699.9", "HourlyRain": "16.0"}
  ]
}"#
}

/// Error envelope returned by the API when the database behind it is down.
#[cfg(test)]
pub(crate) fn fixture_error_envelope() -> &'static str {
    r#"{"status": "error", "message": "database unavailable"}"#
}

/// Valid JSON, empty list.
#[cfg(test)]
pub(crate) fn fixture_empty_list() -> &'static str {
    "[]"
}
