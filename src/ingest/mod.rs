pub mod sanitize;
pub mod telemetry;
pub mod timestamp;

#[cfg(test)]
pub(crate) mod fixtures;
