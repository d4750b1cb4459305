/// In-memory fetch cache with freshness, stale-serve and backoff tracking.
///
/// ## Architecture
///
/// The service keeps exactly one `FetchCache`, created at startup and shared
/// as `Arc<FetchCache>` between the poll loop and every request handler.
/// It holds the last sanitized reading set plus the bookkeeping needed to
/// decide whether the upstream API should be called again:
///
/// - **Backoff**: too many consecutive failures; do not fetch at all
/// - **Fresh**: last successful fetch younger than the TTL; serve as is
/// - **Stale**: data older than the TTL but inside the stale window
/// - **Expired**: data older than the stale window (last-resort fallback)
/// - **Cold**: nothing has ever been fetched
///
/// All state lives behind a single mutex. Nothing in here performs I/O,
/// so the lock is only ever held for a few field reads or writes; the
/// network call in `ingest::telemetry` happens outside it.
///
/// Every time-dependent operation has an `*_at(now)` form so tests can drive
/// the clock explicitly.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::model::ReadingSet;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Timing constants for the cache. See `config::CacheConfig` for the file
/// representation.
#[derive(Debug, Clone, PartialEq)]
pub struct CachePolicy {
    /// Data younger than this is served without refetching.
    pub ttl: Duration,
    /// Window within which old data counts as "stale" rather than "expired".
    pub stale_ttl: Duration,
    /// Consecutive failures before backoff kicks in.
    pub max_errors_before_backoff: u32,
    /// First backoff window; doubles with each further failure.
    pub backoff_base: Duration,
    /// Upper bound on any backoff window.
    pub backoff_cap: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(60),
            stale_ttl: Duration::seconds(300),
            max_errors_before_backoff: 3,
            backoff_base: Duration::seconds(60),
            backoff_cap: Duration::seconds(300),
        }
    }
}

impl CachePolicy {
    /// Backoff window after `errors` consecutive failures, or `None` while
    /// still below the threshold: `min(base * 2^(errors - threshold), cap)`.
    pub fn backoff_for(&self, errors: u32) -> Option<Duration> {
        if errors < self.max_errors_before_backoff {
            return None;
        }
        let exponent = errors - self.max_errors_before_backoff;
        let base = self.backoff_base.num_seconds().max(0);
        let scaled = if exponent >= 62 {
            i64::MAX
        } else {
            base.saturating_mul(1_i64 << exponent)
        };
        let capped = scaled.min(self.backoff_cap.num_seconds());
        Some(Duration::try_seconds(capped).unwrap_or(self.backoff_cap))
    }
}

// ---------------------------------------------------------------------------
// Cache state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct CacheEntry {
    data: Option<ReadingSet>,
    last_fetch: Option<DateTime<Utc>>,
    last_success: Option<DateTime<Utc>>,
    fetch_errors: u32,
    backoff_until: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn in_backoff(&self, now: DateTime<Utc>) -> bool {
        self.backoff_until.is_some_and(|until| now < until)
    }

    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.data.is_some() && self.last_success.is_some_and(|at| now - at < ttl)
    }
}

/// Derived cache mode, evaluated in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    Backoff,
    Fresh,
    Stale,
    Expired,
    Cold,
}

/// Result of a pure cache read.
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub data: Option<ReadingSet>,
    pub is_fresh: bool,
    pub last_success: Option<DateTime<Utc>>,
}

/// Point-in-time view of the cache for health and monitoring output.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub mode: CacheMode,
    pub has_data: bool,
    pub data_count: usize,
    pub age_seconds: Option<f64>,
    pub last_success: Option<DateTime<Utc>>,
    pub fetch_errors: u32,
    pub in_backoff: bool,
    pub backoff_until: Option<DateTime<Utc>>,
}

/// Thread-safe singleton cache of the latest reading set.
#[derive(Debug)]
pub struct FetchCache {
    policy: CachePolicy,
    entry: Mutex<CacheEntry>,
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

impl FetchCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entry: Mutex::new(CacheEntry::default()),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Every mutation is a few plain assignments, so a poisoned entry is
    /// still consistent.
    fn lock(&self) -> MutexGuard<'_, CacheEntry> {
        self.entry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns cached data, whether it is fresh, and when the last
    /// successful fetch happened. Never triggers a fetch.
    pub fn get(&self) -> CacheRead {
        self.get_at(Utc::now())
    }

    pub fn get_at(&self, now: DateTime<Utc>) -> CacheRead {
        let entry = self.lock();
        match &entry.data {
            None => CacheRead {
                data: None,
                is_fresh: false,
                last_success: None,
            },
            Some(data) => CacheRead {
                data: Some(data.clone()),
                is_fresh: entry.is_fresh(now, self.policy.ttl),
                last_success: entry.last_success,
            },
        }
    }

    /// Stores a reading set. A successful, non-empty set also resets the
    /// error counter and lifts any backoff.
    pub fn set(&self, data: ReadingSet, success: bool) {
        self.set_at(data, success, Utc::now());
    }

    pub fn set_at(&self, data: ReadingSet, success: bool, now: DateTime<Utc>) {
        let mut entry = self.lock();
        let non_empty = !data.is_empty();
        entry.data = Some(data);
        entry.last_fetch = Some(now);

        if success && non_empty {
            entry.last_success = Some(now);
            entry.fetch_errors = 0;
            entry.backoff_until = None;
        }
    }

    /// Records a failed fetch. Returns the backoff window if this failure
    /// started or extended one.
    pub fn record_error(&self) -> Option<Duration> {
        self.record_error_at(Utc::now())
    }

    pub fn record_error_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        let mut entry = self.lock();
        entry.fetch_errors = entry.fetch_errors.saturating_add(1);

        let backoff = self.policy.backoff_for(entry.fetch_errors)?;
        let until = now
            .checked_add_signed(backoff)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        entry.backoff_until = Some(until);
        warn!(
            fetch_errors = entry.fetch_errors,
            backoff_secs = backoff.num_seconds(),
            "API errors exceeded threshold, backing off"
        );
        Some(backoff)
    }

    /// False inside a backoff window; otherwise true if nothing was ever
    /// fetched or the TTL has elapsed since the last fetch.
    pub fn should_fetch(&self) -> bool {
        self.should_fetch_at(Utc::now())
    }

    pub fn should_fetch_at(&self, now: DateTime<Utc>) -> bool {
        let entry = self.lock();
        if entry.in_backoff(now) {
            return false;
        }
        match entry.last_fetch {
            None => true,
            Some(at) => now - at >= self.policy.ttl,
        }
    }

    /// Cached data regardless of age. Last-resort fallback only.
    pub fn get_stale_data(&self) -> Option<ReadingSet> {
        self.lock().data.clone()
    }

    pub fn mode(&self) -> CacheMode {
        self.mode_at(Utc::now())
    }

    pub fn mode_at(&self, now: DateTime<Utc>) -> CacheMode {
        let entry = self.lock();
        Self::mode_of(&entry, &self.policy, now)
    }

    fn mode_of(entry: &CacheEntry, policy: &CachePolicy, now: DateTime<Utc>) -> CacheMode {
        if entry.in_backoff(now) {
            return CacheMode::Backoff;
        }
        if entry.data.is_none() {
            return CacheMode::Cold;
        }
        if entry.is_fresh(now, policy.ttl) {
            return CacheMode::Fresh;
        }
        let reference = entry.last_success.or(entry.last_fetch);
        match reference {
            Some(at) if now - at < policy.stale_ttl => CacheMode::Stale,
            _ => CacheMode::Expired,
        }
    }

    pub fn status(&self) -> CacheStatus {
        self.status_at(Utc::now())
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> CacheStatus {
        let entry = self.lock();
        CacheStatus {
            mode: Self::mode_of(&entry, &self.policy, now),
            has_data: entry.data.is_some(),
            data_count: entry.data.as_ref().map_or(0, |d| d.len()),
            age_seconds: entry
                .last_fetch
                .map(|at| (now - at).num_milliseconds() as f64 / 1000.0),
            last_success: entry.last_success,
            fetch_errors: entry.fetch_errors,
            in_backoff: entry.in_backoff(now),
            backoff_until: entry.backoff_until,
        }
    }

    /// Drops all cached data and bookkeeping.
    pub fn clear(&self) {
        *self.lock() = CacheEntry::default();
        info!("fetch cache cleared");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
