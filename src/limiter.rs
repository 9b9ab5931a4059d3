//! Request-start rate limiting
//!
//! A token bucket shared by every worker in a run. Tokens refill lazily in
//! proportion to elapsed time, capped at the bucket capacity; a worker that
//! finds the bucket empty sleeps for exactly the refill deficit and retries.
//! One unit of capacity (the default) means starts are evenly spaced with no
//! burst allowance.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token state, guarded by the [`TokenBucket`] mutex
#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, rate: f64, capacity: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * rate).min(capacity);
        self.last_refill = now;
    }

    /// Take one token, or report how long until one is available
    fn try_take(&mut self, rate: f64, capacity: f64, now: Instant) -> Result<(), Duration> {
        self.refill(rate, capacity, now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(deficit / rate))
        }
    }
}

#[derive(Debug)]
struct TokenBucket {
    rate: f64,
    capacity: f64,
    bucket: Mutex<Bucket>,
}

impl TokenBucket {
    fn new(rate: f64, capacity: f64) -> Self {
        let capacity = capacity.max(1.0);
        Self {
            rate,
            capacity,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                bucket.try_take(self.rate, self.capacity, Instant::now())
            };
            match wait {
                Ok(()) => return,
                Err(duration) => tokio::time::sleep(duration).await,
            }
        }
    }
}

/// Optional shared rate limiter for request starts.
///
/// Limits when requests begin, not how many are in flight; concurrency
/// stays bounded by the worker count.
pub struct RequestRateLimiter {
    bucket: Option<TokenBucket>,
}

impl RequestRateLimiter {
    /// Create a limiter from an optional rate in requests per second.
    ///
    /// `None`, zero, and negative rates disable limiting.
    pub fn new(rate: Option<f64>) -> Self {
        Self {
            bucket: rate
                .filter(|r| *r > 0.0 && r.is_finite())
                .map(|r| TokenBucket::new(r, 1.0)),
        }
    }

    /// Create a limiter that allows bursts of up to `burst` immediate starts
    pub fn with_burst(rate: f64, burst: u32) -> Self {
        if rate <= 0.0 || !rate.is_finite() {
            return Self::unlimited();
        }
        Self {
            bucket: Some(TokenBucket::new(rate, f64::from(burst))),
        }
    }

    /// Create a limiter that never waits
    pub fn unlimited() -> Self {
        Self { bucket: None }
    }

    /// Wait until the next request may start
    pub async fn acquire(&self) {
        if let Some(bucket) = &self.bucket {
            bucket.acquire().await;
        }
    }

    /// Whether a rate is configured
    pub fn is_enabled(&self) -> bool {
        self.bucket.is_some()
    }

    /// The configured rate, if any
    pub fn rate(&self) -> Option<f64> {
        self.bucket.as_ref().map(|b| b.rate)
    }
}

impl Default for RequestRateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl std::fmt::Debug for RequestRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestRateLimiter")
            .field("enabled", &self.is_enabled())
            .field("rate", &self.rate())
            .finish()
    }
}
