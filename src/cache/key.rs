//! Request fingerprints and the cache keys derived from them.
//!
//! A [`Fingerprint`] is the logical operation name plus its arguments. The
//! arguments live in a `BTreeMap`, so argument order at the call site never
//! affects the key. The key is a SHA-256 digest over a length-prefixed
//! encoding of the operation and every `(name, value)` pair, which rules out
//! separator collisions such as `a=b|c` versus `a=b, |c`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Opaque, deterministic cache key (lowercase hex SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix used in log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized description of a logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    operation: String,
    params: BTreeMap<String, String>,
}

impl Fingerprint {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add an argument. Names are trimmed; values are taken as rendered by
    /// `Display`. Repeating a name replaces the earlier value.
    pub fn param(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.params
            .insert(name.trim().to_string(), value.to_string());
        self
    }

    /// Add an argument only when present.
    pub fn param_opt(self, name: &str, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn key(&self) -> CacheKey {
        let mut hasher = Sha256::new();
        write_field(&mut hasher, &self.operation);
        hasher.update((self.params.len() as u64).to_le_bytes());
        for (name, value) in &self.params {
            write_field(&mut hasher, name);
            write_field(&mut hasher, value);
        }
        CacheKey(hex::encode(hasher.finalize()))
    }
}

fn write_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}
