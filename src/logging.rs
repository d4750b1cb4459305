/// Tracing subscriber setup for the binary.
///
/// Filter comes from `RUST_LOG` (default `wxmon_service=info`). Setting
/// `WXMON_LOG_JSON` to anything but `0`/`false` switches to one JSON object
/// per line for log shippers.

use std::env;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_JSON_ENV: &str = "WXMON_LOG_JSON";
const DEFAULT_FILTER: &str = "wxmon_service=info";

fn json_requested(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => false,
        Some(v) => !(v == "0" || v.eq_ignore_ascii_case("false")),
    }
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init() {
    let json = json_requested(env::var(LOG_JSON_ENV).ok().as_deref());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .try_init();
}
