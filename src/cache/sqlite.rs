//! SQLite-backed persistent cache backend.
//!
//! Schema: one table `cache_entries (key TEXT PRIMARY KEY, value TEXT,
//! expires_at INTEGER)` with `expires_at` in epoch seconds. Insertion order is
//! the implicit `rowid`: `INSERT OR REPLACE` always assigns a rowid above every
//! existing row, so reopening the file restores both contents and eviction
//! order without any side index.
//!
//! Expiry has whole-second granularity. Both the stored deadline and the
//! read time are truncated to epoch seconds, so an entry may disappear up to
//! one second before `created_at + ttl` but is never served after it.
//!
//! Each mutating call runs in a single transaction, so a failure never leaves
//! a partially applied `put`. Blocking SQLite calls run on the blocking pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::clock::Clock;
use super::key::CacheKey;
use super::stats::StatsRegistry;
use super::store::{CacheEntry, CacheStore};
use crate::error::{InspireError, Result};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS cache_entries (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL,
        expires_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at);
"#;

#[derive(Debug, Default)]
struct PutOutcome {
    expired: usize,
    evicted: usize,
    entries: usize,
}

/// Durable store surviving process restarts. Single-process access only.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
    max_size: usize,
    clock: Arc<dyn Clock>,
    stats: Arc<StatsRegistry>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and load its row count.
    ///
    /// `max_size` is clamped to a minimum of 1.
    pub fn open(
        path: &Path,
        max_size: usize,
        clock: Arc<dyn Clock>,
        stats: Arc<StatsRegistry>,
    ) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    InspireError::Store(format!(
                        "failed to create cache directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        let entries = count_rows(&conn)?;
        stats.set_entries(entries);
        info!(path = %path.display(), entries, "Opened persistent cache");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
            max_size: max_size.max(1),
            clock,
            stats,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().expect("sqlite connection lock poisoned");
            f(&mut conn)
        })
        .await
        .map_err(|e| InspireError::Store(format!("cache task failed: {}", e)))?
        .map_err(InspireError::from)
    }
}

fn count_rows(conn: &Connection) -> rusqlite::Result<usize> {
    conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| {
        row.get::<_, i64>(0)
    })
    .map(|n| n.max(0) as usize)
}

#[async_trait]
impl CacheStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn max_size(&self) -> usize {
        self.max_size
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let now = self.clock.now().timestamp();
        let k = key.as_str().to_string();
        let (value, reaped) = self
            .with_conn(move |conn| {
                let row: Option<(String, i64)> = conn
                    .query_row(
                        "SELECT value, expires_at FROM cache_entries WHERE key = ?1",
                        params![k],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                match row {
                    Some((value, expires_at)) if now < expires_at => Ok((Some(value), None)),
                    Some(_) => {
                        conn.execute(
                            "DELETE FROM cache_entries WHERE key = ?1 AND expires_at <= ?2",
                            params![k, now],
                        )?;
                        Ok((None, Some(count_rows(conn)?)))
                    }
                    None => Ok((None, None)),
                }
            })
            .await?;

        if let Some(entries) = reaped {
            debug!(key = %key.short(), "Cache entry expired, removing");
            self.stats.record_expiration();
            self.stats.set_entries(entries);
        }
        Ok(value)
    }

    async fn put(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(key.clone(), value, self.clock.now(), ttl);
        let now = entry.created_at.timestamp();
        let expires_at = entry.expires_at.timestamp();
        let max_size = self.max_size;

        let outcome = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let mut outcome = PutOutcome::default();

                let exists = tx
                    .query_row(
                        "SELECT 1 FROM cache_entries WHERE key = ?1",
                        params![entry.key.as_str()],
                        |_| Ok(()),
                    )
                    .optional()?
                    .is_some();

                if !exists {
                    let count = count_rows(&tx)?;
                    if count >= max_size {
                        outcome.expired = tx.execute(
                            "DELETE FROM cache_entries WHERE expires_at <= ?1",
                            params![now],
                        )?;
                        let remaining = count - outcome.expired;
                        if remaining >= max_size {
                            let excess = (remaining + 1 - max_size) as i64;
                            outcome.evicted = tx.execute(
                                "DELETE FROM cache_entries WHERE rowid IN \
                                 (SELECT rowid FROM cache_entries ORDER BY rowid ASC LIMIT ?1)",
                                params![excess],
                            )?;
                        }
                    }
                }

                tx.execute(
                    "INSERT OR REPLACE INTO cache_entries (key, value, expires_at) \
                     VALUES (?1, ?2, ?3)",
                    params![entry.key.as_str(), entry.value, expires_at],
                )?;
                outcome.entries = count_rows(&tx)?;
                tx.commit()?;
                Ok(outcome)
            })
            .await?;

        if outcome.evicted > 0 {
            debug!(evicted = outcome.evicted, "Evicted oldest persistent cache entries");
        }
        self.stats.record_expirations(outcome.expired as u64);
        self.stats.record_evictions(outcome.evicted as u64);
        self.stats.set_entries(outcome.entries);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let k = key.as_str().to_string();
        let (removed, entries) = self
            .with_conn(move |conn| {
                let removed = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![k])?;
                Ok((removed > 0, count_rows(conn)?))
            })
            .await?;
        self.stats.set_entries(entries);
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        self.with_conn(|conn| conn.execute("DELETE FROM cache_entries", []))
            .await?;
        self.stats.set_entries(0);
        Ok(())
    }

    async fn size(&self) -> Result<usize> {
        self.with_conn(|conn| count_rows(conn)).await
    }
}
