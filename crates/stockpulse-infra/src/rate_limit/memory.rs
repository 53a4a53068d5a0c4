//! In-memory sliding-window rate limiter.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use stockpulse_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

use super::validate;
use crate::sweeper::Sweep;

/// In-memory rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
    /// How often idle identifiers are evicted.
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        Self {
            max_requests: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            window: Duration::from_secs(
                std::env::var("RATE_LIMIT_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            sweep_interval: Duration::from_secs(
                std::env::var("RATE_LIMIT_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

/// Per-identifier sliding-window log.
///
/// Each identifier keeps the timestamps of its admitted requests inside the
/// trailing window. Prune, check, and record run under the identifier's map
/// entry lock, so concurrent callers can never over-admit.
/// Note: Limits are per-process, not distributed across instances.
pub struct SlidingWindowRateLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    max_requests: u32,
    window: Duration,
}

impl SlidingWindowRateLimiter {
    pub fn new(config: RateLimitConfig) -> Result<Self, RateLimitError> {
        validate(config.max_requests, config.window)?;

        Ok(Self {
            windows: DashMap::new(),
            max_requests: config.max_requests,
            window: config.window,
        })
    }

    pub fn from_env() -> Result<Self, RateLimitError> {
        Self::new(RateLimitConfig::from_env())
    }

    /// Admit or deny one request for `key`, recording it when admitted.
    pub fn admit(&self, key: &str) -> bool {
        self.evaluate(key).allowed
    }

    /// Time until the oldest request in `key`'s window falls out of it.
    pub fn time_to_reset(&self, key: &str) -> Duration {
        let now = Instant::now();
        self.windows
            .get(key)
            .and_then(|stamps| {
                stamps
                    .iter()
                    .find(|ts| now.duration_since(**ts) < self.window)
                    .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
            })
            .unwrap_or(Duration::ZERO)
    }

    /// Number of identifiers currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    fn evaluate(&self, key: &str) -> RateLimitResult {
        let now = Instant::now();
        let mut stamps = self.windows.entry(key.to_string()).or_default();

        while stamps
            .front()
            .is_some_and(|ts| now.duration_since(*ts) >= self.window)
        {
            stamps.pop_front();
        }

        let allowed = (stamps.len() as u32) < self.max_requests;
        if allowed {
            stamps.push_back(now);
        }

        let reset_after = stamps
            .front()
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
            .unwrap_or(Duration::ZERO);

        RateLimitResult {
            allowed,
            remaining: self.max_requests.saturating_sub(stamps.len() as u32),
            reset_after,
        }
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let result = self.evaluate(key);
        if !result.allowed {
            tracing::debug!(key = %key, reset_after_ms = result.reset_after.as_millis() as u64, "Request denied");
        }
        Ok(result)
    }

    async fn time_to_reset(&self, key: &str) -> Result<Duration, RateLimitError> {
        Ok(SlidingWindowRateLimiter::time_to_reset(self, key))
    }
}

#[async_trait]
impl Sweep for SlidingWindowRateLimiter {
    fn name(&self) -> &'static str {
        "rate-limiter"
    }

    async fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, stamps| {
            stamps
                .back()
                .is_some_and(|last| now.duration_since(*last) < self.window)
        });
        before.saturating_sub(self.windows.len())
    }
}
