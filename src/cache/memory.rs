//! In-memory cache backend.
//!
//! Entries live in a `HashMap`; a `BTreeMap` keyed by a monotonically
//! increasing sequence number records insertion order, so the oldest entry is
//! always the first item of the map. All state sits behind one `Mutex` that is
//! never held across an await point, so `get` and `put` never suspend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::clock::Clock;
use super::key::CacheKey;
use super::stats::StatsRegistry;
use super::store::{CacheEntry, CacheStore};
use crate::error::Result;

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    seq: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<CacheKey, Slot>,
    order: BTreeMap<u64, CacheKey>,
    next_seq: u64,
}

impl MemoryState {
    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.seq);
        Some(slot.entry)
    }

    fn insert(&mut self, entry: CacheEntry) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, entry.key.clone());
        self.entries.insert(entry.key.clone(), Slot { entry, seq });
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, slot)| !slot.entry.is_live_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    fn evict_oldest(&mut self) -> Option<CacheKey> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

/// Bounded in-process store. Lost on restart.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    max_size: usize,
    clock: Arc<dyn Clock>,
    stats: Arc<StatsRegistry>,
}

impl MemoryStore {
    /// `max_size` is clamped to a minimum of 1.
    pub fn new(max_size: usize, clock: Arc<dyn Clock>, stats: Arc<StatsRegistry>) -> Self {
        stats.set_entries(0);
        Self {
            state: Mutex::new(MemoryState::default()),
            max_size: max_size.max(1),
            clock,
            stats,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn max_size(&self) -> usize {
        self.max_size
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let now = self.clock.now();
        let mut state = self.lock();
        let live = match state.entries.get(key) {
            Some(slot) => slot.entry.is_live_at(now),
            None => return Ok(None),
        };
        if live {
            return Ok(state.entries.get(key).map(|slot| slot.entry.value.clone()));
        }
        debug!(key = %key.short(), "Cache entry expired, removing");
        state.remove(key);
        self.stats.record_expiration();
        self.stats.set_entries(state.entries.len());
        Ok(None)
    }

    async fn put(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.lock();

        // Replacing never grows the store.
        if state.remove(key).is_none() && state.entries.len() >= self.max_size {
            let expired = state.purge_expired(now);
            self.stats.record_expirations(expired as u64);

            let mut evicted = 0u64;
            while state.entries.len() >= self.max_size {
                match state.evict_oldest() {
                    Some(old) => {
                        debug!(key = %old.short(), "Evicting oldest cache entry");
                        evicted += 1;
                    }
                    None => break,
                }
            }
            self.stats.record_evictions(evicted);
        }

        state.insert(CacheEntry::new(key.clone(), value, now, ttl));
        self.stats.set_entries(state.entries.len());
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let mut state = self.lock();
        let removed = state.remove(key).is_some();
        self.stats.set_entries(state.entries.len());
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
        self.stats.set_entries(0);
        Ok(())
    }

    async fn size(&self) -> Result<usize> {
        Ok(self.lock().entries.len())
    }
}
