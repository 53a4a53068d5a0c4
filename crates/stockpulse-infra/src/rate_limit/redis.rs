//! Redis rate limiter implementation using a sorted-set sliding window.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use stockpulse_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

use super::validate;
use crate::cache::RedisConfig;

/// Redis rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RedisRateLimitConfig {
    /// Redis connection config
    pub redis: RedisConfig,
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window duration
    pub window: Duration,
    /// Key prefix for rate limit keys
    pub key_prefix: String,
}

impl Default for RedisRateLimitConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            max_requests: 100,
            window: Duration::from_secs(60),
            key_prefix: "stockpulse:ratelimit".to_string(),
        }
    }
}

impl RedisRateLimitConfig {
    pub fn from_env() -> Self {
        Self {
            redis: RedisConfig::from_env(),
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
            key_prefix: std::env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| "stockpulse:ratelimit".to_string()),
        }
    }
}

/// Redis-backed sliding-window limiter shared by every instance of the service.
///
/// Each identifier is a sorted set of request timestamps (milliseconds). The
/// Lua script prunes, counts, and records in one atomic step.
pub struct RedisRateLimiter {
    conn: ConnectionManager,
    config: RedisRateLimitConfig,
    /// Lua script for atomic prune-check-record
    script: Script,
}

impl RedisRateLimiter {
    pub async fn new(config: RedisRateLimitConfig) -> Result<Self, RateLimitError> {
        validate(config.max_requests, config.window)?;

        let conn = config
            .redis
            .connect()
            .await
            .map_err(RateLimitError::Backend)?;

        // Returns: [allowed (0/1), count_in_window, reset_after_ms]
        let script = Script::new(
            r#"
            local key = KEYS[1]
            local max_requests = tonumber(ARGV[1])
            local window_ms = tonumber(ARGV[2])
            local now_ms = tonumber(ARGV[3])
            local member = ARGV[4]

            redis.call('ZREMRANGEBYSCORE', key, '-inf', now_ms - window_ms)

            local count = redis.call('ZCARD', key)
            local allowed = 0
            if count < max_requests then
                redis.call('ZADD', key, now_ms, member)
                count = count + 1
                allowed = 1
            end
            redis.call('PEXPIRE', key, window_ms)

            local reset_ms = 0
            local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
            if oldest[2] then
                reset_ms = tonumber(oldest[2]) + window_ms - now_ms
            end
            return {allowed, count, reset_ms}
            "#,
        );

        tracing::info!(url = %config.redis.url, "Connected to Redis rate limiter");

        Ok(Self {
            conn,
            config,
            script,
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, RateLimitError> {
        Self::new(RedisRateLimitConfig::from_env()).await
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }

    fn window_ms(&self) -> i64 {
        self.config.window.as_millis() as i64
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let redis_key = self.make_key(key);
        let mut conn = self.conn.clone();
        let now = now_ms();
        let member = format!("{}-{}", now, uuid::Uuid::new_v4());

        let result: Vec<i64> = self
            .script
            .key(&redis_key)
            .arg(self.config.max_requests)
            .arg(self.window_ms())
            .arg(now)
            .arg(member)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;

        let allowed = result.first().copied().unwrap_or(0) == 1;
        let count = result.get(1).copied().unwrap_or(0).max(0) as u32;
        let reset_ms = result.get(2).copied().unwrap_or(0).max(0) as u64;

        Ok(RateLimitResult {
            allowed,
            remaining: self.config.max_requests.saturating_sub(count),
            reset_after: Duration::from_millis(reset_ms),
        })
    }

    async fn time_to_reset(&self, key: &str) -> Result<Duration, RateLimitError> {
        let redis_key = self.make_key(key);
        let mut conn = self.conn.clone();
        let now = now_ms();
        let window_ms = self.window_ms();

        // Oldest stamp still inside the window (exclusive lower bound)
        let oldest: Vec<(String, f64)> = conn
            .zrangebyscore_limit_withscores(&redis_key, format!("({}", now - window_ms), "+inf", 0, 1)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;

        let reset_ms = oldest
            .first()
            .map(|(_, score)| (*score as i64 + window_ms - now).max(0) as u64)
            .unwrap_or(0);

        Ok(Duration::from_millis(reset_ms))
    }
}
