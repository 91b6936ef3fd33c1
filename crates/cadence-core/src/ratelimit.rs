//! Token bucket limiting how often the reconciliation loop polls the state store.
//!
//! The bucket starts full, so the first `burst` acquisitions return immediately.
use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::config::RateLimitConfig;

/// Token bucket rate limiter.
///
/// Owned by the loop and mutated only through its own acquisition calls.
#[derive(Debug)]
pub struct TokenBucket {
    per_second: f64,
    burst: f64,
    tokens: f64,
    last: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    ///
    /// `per_second` must be positive; use [`crate::config::OperatorConfig::validate`] on user input.
    pub fn new(per_second: f64, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            per_second,
            burst,
            tokens: burst,
            last: Instant::now(),
        }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Self {
        Self::new(cfg.per_second, cfg.burst)
    }

    /// Take a token if one is available right now.
    pub fn try_acquire(&mut self) -> bool {
        self.refill(Instant::now());
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Take a token, waiting until one is available.
    pub async fn acquire(&mut self) {
        if self.try_acquire() {
            return;
        }
        sleep(self.wait_time()).await;

        self.refill(Instant::now());
        self.tokens = (self.tokens - 1.0).max(0.0);
    }

    /// Time until the next token becomes available.
    pub fn wait_time(&self) -> Duration {
        let deficit = (1.0 - self.tokens).max(0.0);
        Duration::from_secs_f64(deficit / self.per_second)
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.per_second).min(self.burst);
        self.last = now;
    }
}
