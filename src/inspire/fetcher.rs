//! Fetch collaborator trait and implementations.
//!
//! `ApiFetcher` abstracts the upstream HTTP call so the cache layer can be
//! tested without a network. `HttpFetcher` talks to the InspireHEP REST API.
//! `MockFetcher` is used in tests.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::StatusCode;

use crate::cache::Fingerprint;
use crate::config::ApiConfig;
use crate::error::{FetchError, InspireError, Result};

/// Longest error body carried in a [`FetchError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Representation requested from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accept {
    /// `application/json`
    Json,
    /// `*/*`, used for BibTeX and LaTeX exports.
    Text,
}

impl Accept {
    fn header_value(self) -> &'static str {
        match self {
            Accept::Json => "application/json",
            Accept::Text => "*/*",
        }
    }
}

/// A GET against the API, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub path: String,
    pub params: BTreeMap<String, String>,
    pub accept: Accept,
}

impl ApiRequest {
    pub fn json(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: BTreeMap::new(),
            accept: Accept::Json,
        }
    }

    pub fn text(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: BTreeMap::new(),
            accept: Accept::Text,
        }
    }

    pub fn param(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    /// Add a parameter only when present.
    pub fn param_opt(self, name: &str, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    /// Operation label: `GET:<path>` for JSON, `GET_TEXT:<path>` for text.
    pub fn operation(&self) -> String {
        match self.accept {
            Accept::Json => format!("GET:{}", self.path),
            Accept::Text => format!("GET_TEXT:{}", self.path),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.params
            .iter()
            .fold(Fingerprint::new(self.operation()), |fp, (name, value)| {
                fp.param(name, value)
            })
    }
}

/// Performs one upstream request and returns the response body.
#[async_trait]
pub trait ApiFetcher: Send + Sync {
    async fn fetch(&self, request: &ApiRequest) -> std::result::Result<String, FetchError>;
}

/// Fetcher backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .map_err(|e| InspireError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ApiFetcher for HttpFetcher {
    async fn fetch(&self, request: &ApiRequest) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(self.url(&request.path))
            .query(&request.params)
            .header(ACCEPT, request.accept.header_value())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(self.timeout)
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(FetchError::RateLimited { retry_after });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(request.path.clone()));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Decode(e.to_string())
            }
        })?;
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        Ok(body)
    }
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    let secs = value.trim().parse::<f64>().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Mock fetcher for tests.
#[cfg(test)]
pub struct MockFetcher {
    pub outcome: std::sync::Mutex<std::result::Result<String, FetchError>>,
    pub delay: Duration,
    pub requests: std::sync::Mutex<Vec<ApiRequest>>,
}

#[cfg(test)]
impl MockFetcher {
    pub fn success(body: &str) -> Self {
        Self {
            outcome: std::sync::Mutex::new(Ok(body.to_string())),
            delay: Duration::ZERO,
            requests: std::sync::Mutex::new(vec![]),
        }
    }

    pub fn failure(err: FetchError) -> Self {
        Self {
            outcome: std::sync::Mutex::new(Err(err)),
            delay: Duration::ZERO,
            requests: std::sync::Mutex::new(vec![]),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[cfg(test)]
#[async_trait]
impl ApiFetcher for MockFetcher {
    async fn fetch(&self, request: &ApiRequest) -> std::result::Result<String, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.lock().unwrap().clone()
    }
}
