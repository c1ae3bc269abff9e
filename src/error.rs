//! Error types for inspirecache.
//!
//! [`InspireError`] is the crate-wide error. [`FetchError`] describes a failed
//! upstream call and is carried verbatim to every caller joined on the same
//! in-flight request, which is why both enums are `Clone`.

use std::time::Duration;

use thiserror::Error;

/// Failure reported by the fetch collaborator. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The upstream call exceeded the configured fetch timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The upstream API answered 404.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The upstream API answered 429.
    #[error("rate limited by upstream (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Any other non-success status.
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, DNS or TLS level failure.
    #[error("HTTP request failed: {0}")]
    Network(String),

    /// The response body could not be read or decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Crate-wide error type.
#[derive(Debug, Clone, Error)]
pub enum InspireError {
    /// Invalid settings detected at startup. Fatal.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A rate-limit permit could not be obtained within the configured bound.
    #[error("Rate limiter wait of {0:?} exceeds the configured maximum")]
    ThrottleTimeout(Duration),

    /// The fetch collaborator failed.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The persistent cache medium could not complete an operation.
    #[error("Cache store error: {0}")]
    Store(String),

    /// A caller passed an argument no request can be built from.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<rusqlite::Error> for InspireError {
    fn from(err: rusqlite::Error) -> Self {
        InspireError::Store(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, InspireError>;
