//! Configuration types and loading.
//!
//! Settings are read once at startup from `~/.inspirecache/config.toml`
//! (missing file means defaults), then overridden by `INSPIRECACHE_*`
//! environment variables, then validated. Invalid settings are fatal.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{InspireError, Result};

/// Public InspireHEP REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://inspirehep.net/api";

/// Upstream HTTP API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL all request paths are joined onto.
    pub base_url: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Per-request fetch timeout in seconds. Exceeding it is a fetch failure.
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("inspirecache/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
        }
    }
}

/// Outbound request throttling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Steady-state permits per second. Must be finite and > 0.
    pub requests_per_second: f64,
    /// Token bucket capacity (largest burst admitted without waiting).
    pub burst: u32,
    /// Longest a caller may be asked to wait for a permit, in seconds.
    /// `0` means unbounded.
    pub max_wait_secs: f64,
}

impl RateLimitConfig {
    /// The configured wait bound, or `None` when unbounded.
    ///
    /// Bounds too large for a `Duration` saturate to `Duration::MAX`.
    pub fn max_wait(&self) -> Option<Duration> {
        if self.max_wait_secs > 0.0 {
            Some(Duration::try_from_secs_f64(self.max_wait_secs).unwrap_or(Duration::MAX))
        } else {
            None
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 1.5,
            burst: 1,
            max_wait_secs: 0.0,
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds. `0` disables caching.
    pub ttl_secs: u64,
    /// Maximum number of stored entries.
    pub max_size: usize,
    /// Use the SQLite backend instead of process memory.
    pub persist: bool,
    /// SQLite database file used when `persist` is set.
    pub path: PathBuf,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 86_400,
            max_size: 512,
            persist: false,
            path: base_dir().join("cache.db"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Default config file location: `~/.inspirecache/config.toml`.
    pub fn path() -> PathBuf {
        base_dir().join("config.toml")
    }

    /// Load from the default location, honoring `.env` and the process environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from_path(&Self::path())
    }

    /// Load from `path`, apply environment overrides and validate.
    ///
    /// A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(data) => toml::from_str::<Config>(&data).map_err(|e| {
                InspireError::Config(format!("invalid config file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                Config::default()
            }
            Err(e) => {
                return Err(InspireError::Config(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.cache.path = expand_home(&config.cache.path);
        config.validate()?;
        Ok(config)
    }

    /// Apply `INSPIRECACHE_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("INSPIRECACHE_REQUESTS_PER_SECOND") {
            self.rate_limit.requests_per_second = parse_env("INSPIRECACHE_REQUESTS_PER_SECOND", &v)?;
        }
        if let Some(v) = lookup("INSPIRECACHE_CACHE_TTL") {
            self.cache.ttl_secs = parse_env("INSPIRECACHE_CACHE_TTL", &v)?;
        }
        if let Some(v) = lookup("INSPIRECACHE_CACHE_MAX_SIZE") {
            self.cache.max_size = parse_env("INSPIRECACHE_CACHE_MAX_SIZE", &v)?;
        }
        if let Some(v) = lookup("INSPIRECACHE_CACHE_PERSIST") {
            self.cache.persist = parse_bool("INSPIRECACHE_CACHE_PERSIST", &v)?;
        }
        if let Some(v) = lookup("INSPIRECACHE_CACHE_PATH") {
            self.cache.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("INSPIRECACHE_TIMEOUT") {
            self.api.timeout_secs = parse_env("INSPIRECACHE_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("INSPIRECACHE_BASE_URL") {
            self.api.base_url = v;
        }
        Ok(())
    }

    /// Reject settings the cache core cannot run with.
    pub fn validate(&self) -> Result<()> {
        let rps = self.rate_limit.requests_per_second;
        if !rps.is_finite() || rps <= 0.0 {
            return Err(InspireError::Config(format!(
                "rate_limit.requests_per_second must be a positive number, got {}",
                rps
            )));
        }
        if self.rate_limit.burst == 0 {
            return Err(InspireError::Config(
                "rate_limit.burst must be at least 1".into(),
            ));
        }
        let max_wait = self.rate_limit.max_wait_secs;
        if !max_wait.is_finite() || max_wait < 0.0 {
            return Err(InspireError::Config(format!(
                "rate_limit.max_wait_secs must be >= 0, got {}",
                max_wait
            )));
        }
        if self.cache.max_size == 0 {
            return Err(InspireError::Config(
                "cache.max_size must be at least 1".into(),
            ));
        }
        if self.cache.persist && self.cache.path.as_os_str().is_empty() {
            return Err(InspireError::Config(
                "cache.path is required when cache.persist is enabled".into(),
            ));
        }
        if self.api.timeout_secs == 0 {
            return Err(InspireError::Config(
                "api.timeout_secs must be at least 1".into(),
            ));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(InspireError::Config("api.base_url is empty".into()));
        }
        Ok(())
    }
}

fn base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".inspirecache")
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| InspireError::Config(format!("{}={:?}: {}", name, value, e)))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(InspireError::Config(format!(
            "{}={:?}: expected a boolean",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.api.timeout_secs, 30);
        assert_eq!(cfg.rate_limit.requests_per_second, 1.5);
        assert_eq!(cfg.rate_limit.burst, 1);
        assert!(cfg.rate_limit.max_wait().is_none());
        assert_eq!(cfg.cache.ttl_secs, 86_400);
        assert_eq!(cfg.cache.max_size, 512);
        assert!(!cfg.cache.persist);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml = r#"
            [cache]
            max_size = 16
            persist = true
            path = "/tmp/x.db"
        "#;
        let cfg: Config = toml::from_str(toml).unwrap();
        assert_eq!(cfg.cache.max_size, 16);
        assert!(cfg.cache.persist);
        assert_eq!(cfg.cache.ttl_secs, 86_400); // default
        assert_eq!(cfg.rate_limit.requests_per_second, 1.5); // default
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load_from_path(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.cache.max_size, 512);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache\nmax_size = ").unwrap();
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, InspireError::Config(_)));
    }

    #[test]
    fn test_zero_rate_rejected() {
        let mut cfg = Config::default();
        cfg.rate_limit.requests_per_second = 0.0;
        assert!(matches!(cfg.validate(), Err(InspireError::Config(_))));
        cfg.rate_limit.requests_per_second = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_max_size_rejected() {
        let mut cfg = Config::default();
        cfg.cache.max_size = 0;
        assert!(matches!(cfg.validate(), Err(InspireError::Config(_))));
    }

    #[test]
    fn test_zero_ttl_is_valid() {
        let mut cfg = Config::default();
        cfg.cache.ttl_secs = 0;
        assert!(cfg.validate().is_ok());
        assert!(cfg.cache.ttl().is_zero());
    }

    #[test]
    fn test_env_overrides_applied() {
        let vars: HashMap<&str, &str> = [
            ("INSPIRECACHE_REQUESTS_PER_SECOND", "4"),
            ("INSPIRECACHE_CACHE_TTL", "60"),
            ("INSPIRECACHE_CACHE_MAX_SIZE", "8"),
            ("INSPIRECACHE_CACHE_PERSIST", "yes"),
            ("INSPIRECACHE_CACHE_PATH", "/tmp/override.db"),
        ]
        .into_iter()
        .collect();
        let mut cfg = Config::default();
        cfg.apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.rate_limit.requests_per_second, 4.0);
        assert_eq!(cfg.cache.ttl_secs, 60);
        assert_eq!(cfg.cache.max_size, 8);
        assert!(cfg.cache.persist);
        assert_eq!(cfg.cache.path, PathBuf::from("/tmp/override.db"));
    }

    #[test]
    fn test_env_override_unparseable() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_env_overrides(|k| (k == "INSPIRECACHE_CACHE_MAX_SIZE").then(|| "lots".into()))
            .unwrap_err();
        assert!(err.to_string().contains("INSPIRECACHE_CACHE_MAX_SIZE"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("/var/cache.db")), PathBuf::from("/var/cache.db"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home(Path::new("~/.inspirecache/cache.db")),
                home.join(".inspirecache/cache.db")
            );
        }
    }

    #[test]
    fn test_max_wait_bound() {
        let cfg = RateLimitConfig {
            max_wait_secs: 2.5,
            ..Default::default()
        };
        assert_eq!(cfg.max_wait(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_huge_max_wait_saturates() {
        let mut cfg = Config::default();
        cfg.rate_limit.max_wait_secs = 1e30;
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.rate_limit.max_wait(), Some(Duration::MAX));
    }

    #[test]
    fn test_tiny_rate_is_valid() {
        let mut cfg = Config::default();
        cfg.rate_limit.requests_per_second = 1e-20;
        assert!(cfg.validate().is_ok());
    }
}
