//! Operational counters for the cache layer.
//!
//! [`StatsRegistry`] accumulates hits, misses, evictions, expirations and
//! throttle delay for the process lifetime. All counters sit behind one lock
//! so [`StatsRegistry::reset`] and [`StatsRegistry::snapshot`] never observe a
//! half-reset state. The stored-entry count is a gauge maintained by the store
//! and is not affected by `reset`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

const DEFAULT_STATS_LOG_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
    joins: u64,
    fetches: u64,
    fetch_failures: u64,
    store_errors: u64,
    permits: u64,
    throttled: u64,
    throttle_wait_total: Duration,
    fetch_time_total: Duration,
    since: DateTime<Utc>,
}

impl Counters {
    fn zeroed() -> Self {
        Self {
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
            joins: 0,
            fetches: 0,
            fetch_failures: 0,
            store_errors: 0,
            permits: 0,
            throttled: 0,
            throttle_wait_total: Duration::ZERO,
            fetch_time_total: Duration::ZERO,
            since: Utc::now(),
        }
    }
}

/// Immutable point-in-time view of the counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Callers that attached to an already running fetch.
    pub joins: u64,
    /// Upstream fetches that completed successfully.
    pub fetches: u64,
    pub fetch_failures: u64,
    /// Persistent store operations that failed and were degraded.
    pub store_errors: u64,
    /// Rate-limit permits granted.
    pub permits: u64,
    /// Permits that required waiting.
    pub throttled: u64,
    pub throttle_wait_total: Duration,
    pub fetch_time_total: Duration,
    pub entries_count: usize,
    /// Start of the counting period (process start or last reset).
    pub since: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl StatsSnapshot {
    /// `hits / (hits + misses)`, or `0.0` before any request.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn requests(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn avg_throttle_wait(&self) -> Duration {
        if self.permits == 0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(self.throttle_wait_total.as_secs_f64() / self.permits as f64)
                .unwrap_or(Duration::MAX)
        }
    }
}

/// Live counters shared by the coordinator and the store.
#[derive(Debug)]
pub struct StatsRegistry {
    counters: Mutex<Counters>,
    entries: AtomicUsize,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::zeroed()),
            entries: AtomicUsize::new(0),
        }
    }

    fn update(&self, f: impl FnOnce(&mut Counters)) {
        let mut counters = self.counters.lock().expect("stats lock poisoned");
        f(&mut counters);
    }

    pub fn record_hit(&self) {
        self.update(|c| c.hits += 1);
    }

    pub fn record_miss(&self) {
        self.update(|c| c.misses += 1);
    }

    pub fn record_eviction(&self) {
        self.record_evictions(1);
    }

    pub fn record_evictions(&self, count: u64) {
        if count > 0 {
            self.update(|c| c.evictions += count);
        }
    }

    pub fn record_expiration(&self) {
        self.record_expirations(1);
    }

    pub fn record_expirations(&self, count: u64) {
        if count > 0 {
            self.update(|c| c.expirations += count);
        }
    }

    /// A permit was granted after waiting `waited`.
    pub fn record_throttle_wait(&self, waited: Duration) {
        self.update(|c| {
            c.permits += 1;
            if !waited.is_zero() {
                c.throttled += 1;
                c.throttle_wait_total = c.throttle_wait_total.saturating_add(waited);
            }
        });
    }

    pub fn record_join(&self) {
        self.update(|c| c.joins += 1);
    }

    pub fn record_fetch(&self, elapsed: Duration) {
        self.update(|c| {
            c.fetches += 1;
            c.fetch_time_total += elapsed;
        });
    }

    pub fn record_fetch_failure(&self) {
        self.update(|c| c.fetch_failures += 1);
    }

    pub fn record_store_error(&self) {
        self.update(|c| c.store_errors += 1);
    }

    /// Set the stored-entry gauge.
    pub fn set_entries(&self, count: usize) {
        self.entries.store(count, Ordering::Relaxed);
    }

    /// Zero every counter in one step.
    pub fn reset(&self) {
        self.update(|c| *c = Counters::zeroed());
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let c = self.counters.lock().expect("stats lock poisoned").clone();
        StatsSnapshot {
            hits: c.hits,
            misses: c.misses,
            evictions: c.evictions,
            expirations: c.expirations,
            joins: c.joins,
            fetches: c.fetches,
            fetch_failures: c.fetch_failures,
            store_errors: c.store_errors,
            permits: c.permits,
            throttled: c.throttled,
            throttle_wait_total: c.throttle_wait_total,
            fetch_time_total: c.fetch_time_total,
            entries_count: self.entries.load(Ordering::Relaxed),
            since: c.since,
            created_at: Utc::now(),
        }
    }

    /// Emit current counters as a structured log line.
    pub fn emit_summary(&self, reason: &str) {
        let snap = self.snapshot();
        info!(
            event = "cache_stats",
            reason = reason,
            hits = snap.hits,
            misses = snap.misses,
            hit_rate = %format!("{:.3}", snap.hit_rate()),
            entries = snap.entries_count,
            evictions = snap.evictions,
            expirations = snap.expirations,
            joins = snap.joins,
            fetch_failures = snap.fetch_failures,
            store_errors = snap.store_errors,
            throttle_wait_ms = snap.throttle_wait_total.as_millis() as u64,
            "Cache statistics"
        );
    }
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Log a stats summary every `interval` (default 5 minutes) and once more on shutdown.
///
/// Returns a `JoinHandle` so callers can abort on shutdown.
pub fn start_periodic_stats_log(
    stats: Arc<StatsRegistry>,
    interval: Option<Duration>,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(interval.unwrap_or(DEFAULT_STATS_LOG_INTERVAL));
        interval.tick().await; // skip first immediate tick

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    stats.emit_summary("periodic");
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        stats.emit_summary("shutdown");
                        break;
                    }
                }
            }
        }
    })
}
