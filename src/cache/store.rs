//! Cache storage contract shared by the in-memory and SQLite backends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use super::clock::Clock;
use super::key::CacheKey;
use super::memory::MemoryStore;
use super::sqlite::SqliteStore;
use super::stats::StatsRegistry;
use crate::config::CacheConfig;
use crate::error::Result;

/// A stored response. Never mutated; a `put` replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    /// Pre-serialized payload.
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Payload length in bytes.
    pub size_hint: usize,
}

impl CacheEntry {
    pub fn new(key: CacheKey, value: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            size_hint: value.len(),
            key,
            value,
            created_at: now,
            expires_at,
        }
    }

    /// Visible to readers only while `now < expires_at`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Key → (value, expiry) mapping bounded by `max_size` entries.
///
/// Expired entries are logically absent and are reaped lazily by `get` and
/// by `put` when capacity is needed. When a `put` of a new key finds the store
/// full, expired entries are evicted first, then the oldest insertions.
/// Replacing a key counts as a fresh insertion.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend label for logs and reports.
    fn backend(&self) -> &'static str;

    fn max_size(&self) -> usize;

    /// Value for `key` if present and unexpired.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>>;

    /// Insert or replace `key`, expiring `ttl` from now.
    async fn put(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<()>;

    /// Remove `key`. Returns whether an entry was stored.
    async fn delete(&self, key: &CacheKey) -> Result<bool>;

    async fn clear(&self) -> Result<()>;

    /// Entries physically stored, including expired ones not yet reaped.
    async fn size(&self) -> Result<usize>;
}

/// Build the backend selected by `config.persist`.
pub fn build_store(
    config: &CacheConfig,
    clock: Arc<dyn Clock>,
    stats: Arc<StatsRegistry>,
) -> Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = if config.persist {
        Arc::new(SqliteStore::open(&config.path, config.max_size, clock, stats)?)
    } else {
        Arc::new(MemoryStore::new(config.max_size, clock, stats))
    };
    info!(
        backend = store.backend(),
        max_size = config.max_size,
        ttl_secs = config.ttl_secs,
        "Response cache ready"
    );
    Ok(store)
}
