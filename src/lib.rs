/// wxmon_service: Balatan river and rainfall monitoring service.
///
/// # Module structure
///
/// ```text
/// wxmon_service
/// ├── model       — shared data types (Reading, AlertLevel, RainfallIntensity, errors)
/// ├── config      — service configuration loader (wxmon.toml + env overrides)
/// ├── stations    — station registry (ids, names, coordinates)
/// ├── logging     — tracing subscriber setup
/// ├── daemon      — poll loop and the report views built on the cache
/// ├── ingest
/// │   ├── timestamp — tolerant timestamp parsing
/// │   ├── sanitize  — raw JSON object → Reading
/// │   ├── telemetry — HTTP source, payload shape, cache-backed fetcher
/// │   └── fixtures (test only) — representative API response payloads
/// ├── monitor     — in-memory fetch cache (TTL, stale window, backoff)
/// ├── alert
/// │   ├── thresholds — water-level and rainfall classification
/// │   └── bulletin   — single-station public bulletin
/// └── analysis
///     ├── groupings — latest-per-station and per-station views
///     ├── dashboard — system-wide snapshot
///     └── intervals — 24-slot hourly series per station
/// ```

/// Public modules
pub mod alert;
pub mod analysis;
pub mod config;
pub mod daemon;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod stations;
