//! inspirecache: a rate-limited, single-flight response cache for the
//! InspireHEP literature API.
//!
//! The [`cache::CacheCoordinator`] sits between callers and the upstream API.
//! It serves repeated requests from a bounded TTL store (in memory or SQLite),
//! collapses concurrent identical misses into one fetch, and gates every
//! outbound request through a process-wide [`rate_limit::RateLimiter`].

pub mod cache;
pub mod config;
pub mod error;
pub mod inspire;
pub mod rate_limit;

pub use cache::{CacheCoordinator, CacheStore, Fingerprint, StatsRegistry, StatsSnapshot};
pub use config::Config;
pub use error::{FetchError, InspireError, Result};
pub use inspire::{ApiFetcher, ApiRequest, InspireClient};
pub use rate_limit::RateLimiter;
