/// Hourly interval aggregation for chart views.
///
/// One generic aggregator buckets readings into the 24 one-hour slots of a
/// display day, per station. The two chart metrics differ only in which
/// field they read, which values they accept, how they classify a slot and
/// how they summarize a day; those differences live behind the `Metric`
/// trait.
///
/// ```text
/// readings ─▶ display date ─▶ 24 slots ─▶ assign (half-open) ─▶ mean ─▶ classify
/// ```
///
/// Slot intervals are half-open, `[start, start + 1h)`, so a reading exactly
/// on the hour belongs to the later slot.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, info, warn};

use crate::alert::thresholds::{
    RainfallThresholds, WaterLevelThresholds, classify_alert, classify_rainfall,
};
use crate::model::{AlertLevel, DateError, RainfallIntensity, Reading, ValidationError};

pub const SLOTS_PER_DAY: usize = 24;

/// Axis labels are shown on every second hour.
const LABEL_EVERY_HOURS: u32 = 2;

/// Oldest year a caller may ask for.
pub const EARLIEST_YEAR: i32 = 2020;

/// How far past today a caller may ask for.
pub const MAX_DAYS_AHEAD: i64 = 7;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// What a chart measures and how it judges a slot.
pub trait Metric {
    type Category: Copy + Ord + Serialize + fmt::Debug;
    type Summary: Serialize;

    fn name(&self) -> &'static str;

    /// Raw value from a reading, if present.
    fn value(&self, reading: &Reading) -> Option<f64>;

    /// Values failing this are dropped, never clamped.
    fn validate(&self, value: f64) -> Result<f64, ValidationError>;

    /// Category for a slot mean; `None` for a slot with no readings.
    fn classify(&self, mean: Option<f64>) -> Self::Category;

    /// Display rounding for slot values.
    fn round(&self, value: f64) -> f64;

    fn summarize(&self, slots: &[IntervalBucket<Self::Category>]) -> Self::Summary;
}

fn slot_values<C>(slots: &[IntervalBucket<C>]) -> (f64, f64, f64) {
    let sum: f64 = slots.iter().map(|s| s.value).sum();
    let max = slots.iter().map(|s| s.value).fold(f64::NEG_INFINITY, f64::max);
    let min = slots.iter().map(|s| s.value).fold(f64::INFINITY, f64::min);
    (sum, max, min)
}

/// Hourly rainfall in mm/hr. Negative values are sensor noise.
#[derive(Debug, Clone, Default)]
pub struct PrecipitationMetric {
    pub thresholds: RainfallThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecipitationSummary {
    pub total_rainfall: f64,
    pub average_rainfall: f64,
    pub max_rainfall: f64,
    pub min_rainfall: f64,
    pub intervals_with_rain: usize,
    pub total_intervals: usize,
}

impl Metric for PrecipitationMetric {
    type Category = RainfallIntensity;
    type Summary = PrecipitationSummary;

    fn name(&self) -> &'static str {
        "precipitation"
    }

    fn value(&self, reading: &Reading) -> Option<f64> {
        reading.hourly_rain
    }

    fn validate(&self, value: f64) -> Result<f64, ValidationError> {
        if value < 0.0 {
            return Err(ValidationError::Negative {
                field: "hourly_rain",
                value,
            });
        }
        Ok(value)
    }

    fn classify(&self, mean: Option<f64>) -> RainfallIntensity {
        classify_rainfall(mean, &self.thresholds)
    }

    fn round(&self, value: f64) -> f64 {
        round_to(value, 1)
    }

    fn summarize(&self, slots: &[IntervalBucket<RainfallIntensity>]) -> PrecipitationSummary {
        if slots.is_empty() {
            return PrecipitationSummary {
                total_rainfall: 0.0,
                average_rainfall: 0.0,
                max_rainfall: 0.0,
                min_rainfall: 0.0,
                intervals_with_rain: 0,
                total_intervals: 0,
            };
        }
        let (sum, max, min) = slot_values(slots);
        PrecipitationSummary {
            total_rainfall: round_to(sum, 1),
            average_rainfall: round_to(sum / slots.len() as f64, 1),
            max_rainfall: max,
            min_rainfall: min,
            intervals_with_rain: slots.iter().filter(|s| s.value > 0.0).count(),
            total_intervals: slots.len(),
        }
    }
}

/// River water level. Readings outside `[valid_min, valid_max]` are dropped.
#[derive(Debug, Clone)]
pub struct WaterLevelMetric {
    pub thresholds: WaterLevelThresholds,
    pub valid_min: f64,
    pub valid_max: f64,
}

impl Default for WaterLevelMetric {
    fn default() -> Self {
        Self {
            thresholds: WaterLevelThresholds::default(),
            valid_min: 0.0,
            valid_max: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterLevelSummary {
    pub average_level: f64,
    pub max_level: f64,
    pub min_level: f64,
    pub highest_alert_level: AlertLevel,
    pub critical_intervals: usize,
    pub warning_intervals: usize,
    pub alert_intervals: usize,
    pub advisory_intervals: usize,
    pub total_intervals: usize,
}

impl Metric for WaterLevelMetric {
    type Category = AlertLevel;
    type Summary = WaterLevelSummary;

    fn name(&self) -> &'static str {
        "water_level"
    }

    fn value(&self, reading: &Reading) -> Option<f64> {
        reading.water_level
    }

    fn validate(&self, value: f64) -> Result<f64, ValidationError> {
        if !(self.valid_min..=self.valid_max).contains(&value) {
            return Err(ValidationError::OutOfRange {
                field: "water_level",
                value,
                min: self.valid_min,
                max: self.valid_max,
            });
        }
        Ok(value)
    }

    fn classify(&self, mean: Option<f64>) -> AlertLevel {
        classify_alert(mean, &self.thresholds)
    }

    fn round(&self, value: f64) -> f64 {
        round_to(value, 2)
    }

    fn summarize(&self, slots: &[IntervalBucket<AlertLevel>]) -> WaterLevelSummary {
        let count_of =
            |level: AlertLevel| slots.iter().filter(|s| s.category == level).count();
        let highest = AlertLevel::ACTIVE_DESCENDING
            .into_iter()
            .find(|level| count_of(*level) > 0)
            .unwrap_or(AlertLevel::Normal);

        let (average, max, min) = if slots.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let (sum, max, min) = slot_values(slots);
            (round_to(sum / slots.len() as f64, 2), max, min)
        };

        WaterLevelSummary {
            average_level: average,
            max_level: max,
            min_level: min,
            highest_alert_level: highest,
            critical_intervals: count_of(AlertLevel::Critical),
            warning_intervals: count_of(AlertLevel::Warning),
            alert_intervals: count_of(AlertLevel::Alert),
            advisory_intervals: count_of(AlertLevel::Advisory),
            total_intervals: slots.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// Slot day relative to the display date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DayLabel {
    Yesterday,
    Today,
    Tomorrow,
}

/// Every slot lies on the display date, so this is `Today` in practice; the
/// field stays for chart consumers that expect it.
pub fn day_label(slot_date: NaiveDate, display_date: NaiveDate) -> DayLabel {
    match slot_date.cmp(&display_date) {
        std::cmp::Ordering::Less => DayLabel::Yesterday,
        std::cmp::Ordering::Equal => DayLabel::Today,
        std::cmp::Ordering::Greater => DayLabel::Tomorrow,
    }
}

/// 12-hour clock label: "12 AM", "1 AM", .. "12 PM", "1 PM", .. "11 PM".
pub fn hour_label(hour: u32) -> String {
    match hour {
        0 => "12 AM".to_string(),
        1..=11 => format!("{hour} AM"),
        12 => "12 PM".to_string(),
        _ => format!("{} PM", hour - 12),
    }
}

/// One hourly slot for one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalBucket<C> {
    pub start: NaiveDateTime,
    pub label: String,
    pub day: DayLabel,
    /// Rounded mean of the contributing readings; 0 when there are none.
    pub value: f64,
    pub category: C,
    pub count: usize,
    pub show_label: bool,
}

/// Aligned 24-slot series for every requested station.
#[derive(Debug, Clone, Serialize)]
pub struct HourlySeries<C> {
    pub display_date: NaiveDate,
    /// No explicit date and no parseable timestamps: fell back to today.
    pub degraded: bool,
    pub stations: BTreeMap<String, Vec<IntervalBucket<C>>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct IntervalAggregator<M> {
    metric: M,
}

pub type PrecipitationAggregator = IntervalAggregator<PrecipitationMetric>;
pub type WaterLevelAggregator = IntervalAggregator<WaterLevelMetric>;

impl<M: Metric> IntervalAggregator<M> {
    pub fn new(metric: M) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Explicit date, else the latest parsed instant, else `now`.
    fn resolve_display_date(
        readings: &[Reading],
        target_date: Option<NaiveDate>,
        now: NaiveDateTime,
    ) -> (NaiveDate, bool) {
        if let Some(date) = target_date {
            return (date, false);
        }
        match readings.iter().filter_map(|r| r.instant).max() {
            Some(latest) => (latest.date(), false),
            None => {
                warn!("no parseable timestamps, using system date");
                (now.date(), true)
            }
        }
    }

    /// Buckets `readings` into 24 hourly slots per station in `station_ids`.
    pub fn hourly_series(
        &self,
        readings: &[Reading],
        station_ids: &[&str],
        target_date: Option<NaiveDate>,
        now: NaiveDateTime,
    ) -> HourlySeries<M::Category> {
        let (display_date, degraded) = Self::resolve_display_date(readings, target_date, now);
        let day_start = display_date.and_time(NaiveTime::MIN);
        let slot_starts: Vec<NaiveDateTime> = (0..SLOTS_PER_DAY as i64)
            .map(|h| day_start + Duration::hours(h))
            .collect();
        let window_end = day_start + Duration::hours(SLOTS_PER_DAY as i64);

        let mut grouped: HashMap<&str, [Accumulator; SLOTS_PER_DAY]> = HashMap::new();
        let mut used = 0usize;

        for reading in readings {
            let Some(instant) = reading.instant else {
                continue;
            };
            if instant < day_start || instant > window_end {
                continue;
            }
            let (Some(station_id), Some(value)) =
                (reading.station_id.as_deref(), self.metric.value(reading))
            else {
                continue;
            };
            let value = match self.metric.validate(value) {
                Ok(value) => value,
                Err(e) => {
                    debug!(
                        metric = self.metric.name(),
                        station_id,
                        error = %e,
                        "dropping invalid value"
                    );
                    continue;
                }
            };
            let Some(slot) = slot_starts
                .iter()
                .position(|start| *start <= instant && instant < *start + Duration::hours(1))
            else {
                continue;
            };

            let slots = grouped
                .entry(station_id)
                .or_insert([Accumulator::default(); SLOTS_PER_DAY]);
            slots[slot].sum += value;
            slots[slot].count += 1;
            used += 1;
        }

        let empty = [Accumulator::default(); SLOTS_PER_DAY];
        let stations = station_ids
            .iter()
            .map(|id| {
                let slots = grouped.get(id).unwrap_or(&empty);
                (id.to_string(), self.build_slots(&slot_starts, slots, display_date))
            })
            .collect();

        info!(
            metric = self.metric.name(),
            date = %display_date,
            readings = readings.len(),
            used,
            stations = station_ids.len(),
            "built hourly series"
        );

        HourlySeries {
            display_date,
            degraded,
            stations,
        }
    }

    fn build_slots(
        &self,
        slot_starts: &[NaiveDateTime],
        slots: &[Accumulator; SLOTS_PER_DAY],
        display_date: NaiveDate,
    ) -> Vec<IntervalBucket<M::Category>> {
        slot_starts
            .iter()
            .zip(slots.iter())
            .map(|(start, acc)| {
                let mean = (acc.count > 0).then(|| acc.sum / acc.count as f64);
                let hour = start.hour();
                IntervalBucket {
                    start: *start,
                    label: hour_label(hour),
                    day: day_label(start.date(), display_date),
                    value: self.metric.round(mean.unwrap_or(0.0)),
                    category: self.metric.classify(mean),
                    count: acc.count,
                    show_label: hour % LABEL_EVERY_HOURS == 0,
                }
            })
            .collect()
    }

    pub fn summary_statistics(&self, slots: &[IntervalBucket<M::Category>]) -> M::Summary {
        self.metric.summarize(slots)
    }
}

// ---------------------------------------------------------------------------
// Date helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateRange {
    pub earliest: NaiveDateTime,
    pub latest: NaiveDateTime,
}

impl DateRange {
    /// Whole days spanned, counting both ends.
    pub fn total_days(&self) -> i64 {
        (self.latest - self.earliest).num_days() + 1
    }
}

/// Earliest and latest parsed instants, or `None` if nothing parses.
pub fn available_date_range(readings: &[Reading]) -> Option<DateRange> {
    let mut instants = readings.iter().filter_map(|r| r.instant);
    let first = instants.next()?;
    let (earliest, latest) = instants.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
    Some(DateRange { earliest, latest })
}

/// Validates a caller-supplied `YYYY-MM-DD` display date against `now`.
pub fn validate_target_date(raw: &str, now: NaiveDateTime) -> Result<NaiveDate, DateError> {
    if raw.len() != 10 {
        return Err(DateError::Format);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| DateError::Invalid(raw.to_string()))?;

    let max_year = now.year() + 1;
    if date.year() < EARLIEST_YEAR || date.year() > max_year {
        return Err(DateError::YearOutOfRange {
            min: EARLIEST_YEAR,
            max: max_year,
        });
    }
    if date.and_time(NaiveTime::MIN) > now + Duration::days(MAX_DAYS_AHEAD) {
        return Err(DateError::TooFarAhead(MAX_DAYS_AHEAD));
    }
    Ok(date)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
