/// Data analysis for the weather monitoring service.
///
/// Submodules:
/// - `groupings` — latest-per-station and per-station views of the flat feed.
/// - `dashboard` — system-wide snapshot (counts, highest alert, forecast).
/// - `intervals` — 24-slot hourly series for precipitation and water level.

pub mod dashboard;
pub mod groupings;
pub mod intervals;
