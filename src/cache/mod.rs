//! Response caching: keys, storage backends, stats and the single-flight
//! coordinator that ties them to the rate limiter.

pub mod clock;
pub mod coordinator;
pub mod key;
pub mod memory;
pub mod sqlite;
pub mod stats;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::CacheCoordinator;
pub use key::{CacheKey, Fingerprint};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use stats::{start_periodic_stats_log, StatsRegistry, StatsSnapshot};
pub use store::{build_store, CacheEntry, CacheStore};
