//! Read-through cache coordinator with single-flight fetches.
//!
//! [`CacheCoordinator::resolve`] serves a value from the store when possible.
//! On a miss it either joins a fetch already running for the same key or
//! starts one: take a rate-limit permit, call the fetch collaborator under
//! the configured timeout, store the value, and hand the outcome to every
//! joined caller.
//!
//! Each running fetch is a `Shared` future registered in the in-flight map
//! together with a waiter count. Callers hold a `FlightGuard`; when the last
//! guard for a flight drops before the fetch settles, the entry is removed and
//! the fetch future is dropped with it. A caller that leaves early never
//! affects the remaining joiners.
//!
//! Store failures are never surfaced to callers: a failed read degrades to a
//! miss and a failed write still returns the fetched value. Both are logged
//! and counted in `store_errors`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use super::clock::SystemClock;
use super::key::{CacheKey, Fingerprint};
use super::stats::{StatsRegistry, StatsSnapshot};
use super::store::{build_store, CacheStore};
use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::rate_limit::RateLimiter;

type SharedFetch = Shared<BoxFuture<'static, Result<String>>>;

struct Flight {
    id: u64,
    waiters: usize,
    future: SharedFetch,
}

type FlightMap = Arc<Mutex<HashMap<CacheKey, Flight>>>;

/// Detaches one caller from a flight on drop.
struct FlightGuard {
    flights: FlightMap,
    key: CacheKey,
    id: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut flights = self.flights.lock().expect("in-flight lock poisoned");
        let abandoned = match flights.get_mut(&self.key) {
            Some(flight) if flight.id == self.id => {
                flight.waiters -= 1;
                flight.waiters == 0
            }
            _ => false,
        };
        if abandoned {
            flights.remove(&self.key);
            debug!(key = %self.key.short(), "All callers left, cancelling fetch");
        }
    }
}

fn finish_flight(flights: &FlightMap, key: &CacheKey, id: u64) {
    let mut flights = flights.lock().expect("in-flight lock poisoned");
    if flights.get(key).is_some_and(|flight| flight.id == id) {
        flights.remove(key);
    }
}

/// Everything a flight needs once it is detached from the coordinator.
#[derive(Clone)]
struct FlightContext {
    store: Arc<dyn CacheStore>,
    limiter: Arc<RateLimiter>,
    stats: Arc<StatsRegistry>,
    fetch_timeout: Duration,
}

impl FlightContext {
    /// Store read that degrades to a miss on failure.
    async fn lookup(&self, key: &CacheKey) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key.short(), error = %e, "Cache read failed, treating as miss");
                self.stats.record_store_error();
                None
            }
        }
    }

    async fn run<F, Fut>(self, key: CacheKey, ttl: Option<Duration>, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<String, FetchError>>,
    {
        // A flight that finished just before this one started may have
        // filled the entry already.
        if ttl.is_some() {
            if let Some(value) = self.lookup(&key).await {
                debug!(key = %key.short(), "Entry filled by a previous fetch");
                return Ok(value);
            }
        }

        let waited = self.limiter.acquire().await?;
        self.stats.record_throttle_wait(waited);

        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.fetch_timeout, fetch()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::Timeout(self.fetch_timeout)),
        };

        match outcome {
            Ok(value) => {
                let elapsed = started.elapsed();
                self.stats.record_fetch(elapsed);
                debug!(
                    key = %key.short(),
                    fetch_ms = elapsed.as_millis() as u64,
                    bytes = value.len(),
                    "Fetched upstream"
                );
                if let Some(ttl) = ttl {
                    if let Err(e) = self.store.put(&key, value.clone(), ttl).await {
                        warn!(key = %key.short(), error = %e, "Cache write failed, serving uncached");
                        self.stats.record_store_error();
                    }
                }
                Ok(value)
            }
            Err(err) => {
                warn!(key = %key.short(), error = %err, "Upstream fetch failed");
                self.stats.record_fetch_failure();
                Err(err.into())
            }
        }
    }
}

/// Front door for every cached upstream call in the process.
pub struct CacheCoordinator {
    ctx: FlightContext,
    in_flight: FlightMap,
    next_flight: AtomicU64,
}

impl CacheCoordinator {
    pub fn new(
        store: Arc<dyn CacheStore>,
        limiter: Arc<RateLimiter>,
        stats: Arc<StatsRegistry>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            ctx: FlightContext {
                store,
                limiter,
                stats,
                fetch_timeout,
            },
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_flight: AtomicU64::new(0),
        }
    }

    /// Build the store, limiter and stats registry described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let stats = Arc::new(StatsRegistry::new());
        let store = build_store(&config.cache, Arc::new(SystemClock), Arc::clone(&stats))?;
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit)?);
        info!(
            requests_per_second = config.rate_limit.requests_per_second,
            burst = config.rate_limit.burst,
            fetch_timeout_secs = config.api.timeout_secs,
            "Cache coordinator ready"
        );
        Ok(Self::new(store, limiter, stats, config.api.timeout()))
    }

    /// Return the cached value for `fingerprint`, fetching it at most once
    /// across concurrent callers when absent.
    ///
    /// A zero `ttl` bypasses the store: every call is a miss and nothing is
    /// written, though concurrent calls still share one rate-limited fetch.
    pub async fn resolve<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        ttl: Duration,
        fetch: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<String, FetchError>> + Send + 'static,
    {
        let key = fingerprint.key();
        let ttl = (!ttl.is_zero()).then_some(ttl);

        if ttl.is_some() {
            if let Some(value) = self.ctx.lookup(&key).await {
                debug!(key = %key.short(), op = fingerprint.operation(), "Cache hit");
                self.ctx.stats.record_hit();
                return Ok(value);
            }
        }
        debug!(key = %key.short(), op = fingerprint.operation(), "Cache miss");
        self.ctx.stats.record_miss();

        let (future, _guard) = self.join_or_start(key, ttl, fetch);
        future.await
    }

    fn join_or_start<F, Fut>(
        &self,
        key: CacheKey,
        ttl: Option<Duration>,
        fetch: F,
    ) -> (SharedFetch, FlightGuard)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<String, FetchError>> + Send + 'static,
    {
        let mut flights = self.in_flight.lock().expect("in-flight lock poisoned");

        if let Some(flight) = flights.get_mut(&key) {
            flight.waiters += 1;
            self.ctx.stats.record_join();
            debug!(key = %key.short(), waiters = flight.waiters, "Joining in-flight fetch");
            let guard = FlightGuard {
                flights: Arc::clone(&self.in_flight),
                key,
                id: flight.id,
            };
            return (flight.future.clone(), guard);
        }

        let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
        let ctx = self.ctx.clone();
        let registry = Arc::clone(&self.in_flight);
        let flight_key = key.clone();
        let future = async move {
            let result = ctx.run(flight_key.clone(), ttl, fetch).await;
            finish_flight(&registry, &flight_key, id);
            result
        }
        .boxed()
        .shared();

        flights.insert(
            key.clone(),
            Flight {
                id,
                waiters: 1,
                future: future.clone(),
            },
        );
        let guard = FlightGuard {
            flights: Arc::clone(&self.in_flight),
            key,
            id,
        };
        (future, guard)
    }

    /// Drop the stored entry for `fingerprint`. Returns whether one existed.
    pub async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let key = fingerprint.key();
        let removed = self.ctx.store.delete(&key).await?;
        debug!(key = %key.short(), removed, "Invalidated cache entry");
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<()> {
        self.ctx.store.clear().await?;
        info!(backend = self.ctx.store.backend(), "Cache cleared");
        Ok(())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.ctx.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.ctx.stats.reset();
    }

    /// Shared registry, for the periodic stats logger.
    pub fn stats_registry(&self) -> Arc<StatsRegistry> {
        Arc::clone(&self.ctx.stats)
    }

    /// Number of keys with a fetch currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().expect("in-flight lock poisoned").len()
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.ctx.store
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.ctx.limiter
    }
}
