//! Token-bucket rate limiter for outbound API calls.
//!
//! One limiter is shared by every caller in the process. Tokens refill
//! continuously at `requests_per_second` up to `capacity`. A caller that finds
//! the bucket empty reserves the next token (the count goes negative) while
//! holding the lock, then sleeps outside the lock for exactly the time that
//! token needs to accrue. Reservations are granted in lock order, so the
//! aggregate grant rate never exceeds the configured rate no matter how many
//! callers race.
//!
//! A reservation is not refunded if the waiting caller is cancelled. This can
//! only make the limiter stricter, never looser.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::RateLimitConfig;
use crate::error::{InspireError, Result};

#[derive(Debug)]
struct Bucket {
    /// Available tokens. Negative values are outstanding reservations.
    tokens: f64,
    last_refill: Instant,
}

/// Process-wide token bucket.
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<Bucket>,
    rate: f64,
    capacity: f64,
    max_wait: Option<Duration>,
}

/// Point-in-time view of the limiter.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterStatus {
    pub requests_per_second: f64,
    pub capacity: u32,
    /// Tokens available right now; negative while callers are queued.
    pub tokens: f64,
}

impl RateLimiter {
    /// Create a limiter admitting `requests_per_second` with a bucket of `burst` tokens.
    ///
    /// The bucket starts full.
    pub fn new(requests_per_second: f64, burst: u32) -> Result<Self> {
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            return Err(InspireError::Config(format!(
                "requests_per_second must be a positive number, got {}",
                requests_per_second
            )));
        }
        if burst == 0 {
            return Err(InspireError::Config("burst must be at least 1".into()));
        }
        let capacity = f64::from(burst);
        Ok(Self {
            state: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            rate: requests_per_second,
            capacity,
            max_wait: None,
        })
    }

    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        Ok(Self::new(config.requests_per_second, config.burst)?.with_max_wait(config.max_wait()))
    }

    /// Bound how long `acquire` may wait. Longer waits fail with
    /// [`InspireError::ThrottleTimeout`] without consuming a token.
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Wait until a permit is available and take it.
    ///
    /// Returns how long the caller was delayed.
    pub async fn acquire(&self) -> Result<Duration> {
        let wait = self.reserve()?;
        if !wait.is_zero() {
            debug!(waited_ms = wait.as_millis() as u64, "Rate limiting outbound request");
            tokio::time::sleep(wait).await;
        }
        Ok(wait)
    }

    pub fn status(&self) -> RateLimiterStatus {
        let mut bucket = self.state.lock().expect("rate limiter lock poisoned");
        self.refill(&mut bucket);
        RateLimiterStatus {
            requests_per_second: self.rate,
            capacity: self.capacity as u32,
            tokens: bucket.tokens,
        }
    }

    /// Take one token, returning how long the caller must sleep before using it.
    fn reserve(&self) -> Result<Duration> {
        let mut bucket = self.state.lock().expect("rate limiter lock poisoned");
        self.refill(&mut bucket);

        let wait = if bucket.tokens >= 1.0 {
            Duration::ZERO
        } else {
            // Waits past what a `Duration` can hold saturate.
            Duration::try_from_secs_f64((1.0 - bucket.tokens) / self.rate).unwrap_or(Duration::MAX)
        };
        if let Some(max) = self.max_wait {
            if wait > max {
                return Err(InspireError::ThrottleTimeout(wait));
            }
        }
        bucket.tokens -= 1.0;
        Ok(wait)
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * self.rate).min(self.capacity);
        bucket.last_refill = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_rejects_invalid_rate() {
        assert!(matches!(
            RateLimiter::new(0.0, 1),
            Err(InspireError::Config(_))
        ));
        assert!(RateLimiter::new(-2.0, 1).is_err());
        assert!(RateLimiter::new(f64::INFINITY, 1).is_err());
        assert!(RateLimiter::new(1.0, 0).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::new(2.0, 1).unwrap();
        let waited = limiter.acquire().await.unwrap();
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_calls_take_at_least_one_second() {
        let rate = 4u32;
        let limiter = RateLimiter::new(f64::from(rate), 1).unwrap();
        let start = Instant::now();
        for _ in 0..(2 * rate) {
            limiter.acquire().await.unwrap();
        }
        assert!(
            start.elapsed() >= Duration::from_secs(1),
            "2R permits granted in {:?}",
            start.elapsed()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_more_than_rate_in_any_one_second_window() {
        let rate = 4usize;
        let limiter = Arc::new(RateLimiter::new(rate as f64, 1).unwrap());
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..(3 * rate) {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await.unwrap();
                Instant::now()
            }));
        }
        let mut grants = Vec::new();
        for handle in handles {
            grants.push(handle.await.unwrap());
        }
        grants.sort();

        for (i, t) in grants.iter().enumerate() {
            let in_window = grants[i..]
                .iter()
                .take_while(|g| g.duration_since(*t) < Duration::from_secs(1))
                .count();
            assert!(in_window <= rate, "{} permits within 1s of {:?}", in_window, *t - start);
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2750), "took {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_refill_after_idle() {
        let limiter = RateLimiter::new(1.0, 1).unwrap();
        limiter.acquire().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        // Capacity is 1, so five idle seconds buy exactly one free permit.
        assert_eq!(limiter.acquire().await.unwrap(), Duration::ZERO);
        assert!(limiter.acquire().await.unwrap() > Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_capacity() {
        let limiter = RateLimiter::new(1.0, 3).unwrap();
        for _ in 0..3 {
            assert_eq!(limiter.acquire().await.unwrap(), Duration::ZERO);
        }
        assert!(limiter.acquire().await.unwrap() >= Duration::from_millis(999));
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_wait_yields_throttle_timeout() {
        let limiter = RateLimiter::new(1.0, 1)
            .unwrap()
            .with_max_wait(Some(Duration::from_millis(500)));
        limiter.acquire().await.unwrap();
        let err = limiter.acquire().await.unwrap_err();
        assert!(matches!(err, InspireError::ThrottleTimeout(_)));

        // The refused caller did not consume a token.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(limiter.acquire().await.unwrap(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_waiter_does_not_loosen_limit() {
        let limiter = Arc::new(RateLimiter::new(1.0, 1).unwrap());
        limiter.acquire().await.unwrap();

        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire().await })
        };
        tokio::task::yield_now().await;
        waiter.abort();

        let status = limiter.status();
        assert!(status.tokens < 0.0, "reservation should still be held");
    }

    #[test]
    fn test_from_config() {
        let cfg = RateLimitConfig {
            requests_per_second: 3.0,
            burst: 2,
            max_wait_secs: 0.0,
        };
        let limiter = RateLimiter::from_config(&cfg).unwrap();
        let status = limiter.status();
        assert_eq!(status.capacity, 2);
        assert_eq!(status.requests_per_second, 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tiny_rate_saturates_wait() {
        let limiter = RateLimiter::new(1e-20, 1).unwrap();
        assert_eq!(limiter.acquire().await.unwrap(), Duration::ZERO);
        assert_eq!(limiter.reserve().unwrap(), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tiny_rate_with_bound_is_throttle_timeout() {
        let limiter = RateLimiter::new(1e-20, 1)
            .unwrap()
            .with_max_wait(Some(Duration::from_secs(5)));
        limiter.acquire().await.unwrap();
        let err = limiter.acquire().await.unwrap_err();
        assert!(matches!(err, InspireError::ThrottleTimeout(d) if d == Duration::MAX));
    }

    #[test]
    fn test_from_config_huge_max_wait() {
        let cfg = RateLimitConfig {
            requests_per_second: 1.0,
            burst: 1,
            max_wait_secs: 1e30,
        };
        let limiter = RateLimiter::from_config(&cfg).unwrap();
        assert_eq!(limiter.max_wait, Some(Duration::MAX));
    }
}
