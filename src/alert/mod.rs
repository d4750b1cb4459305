/// Alert evaluation.
///
/// Submodules:
/// - `thresholds` — water-level and rainfall breakpoints and classifiers.
/// - `bulletin` — single-station public bulletin text.

pub mod bulletin;
pub mod thresholds;
