//! Cache implementations - Redis and in-memory fallback.

mod memory;

pub use memory::InMemoryCache;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisCache, RedisConfig};

use std::time::Duration;

/// Settings shared by every cache backend.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Prefix applied to every key, keeping this service clear of other tenants.
    pub namespace: String,
    /// How often the in-memory backend evicts expired entries.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: "stockpulse".to_string(),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            namespace: std::env::var("CACHE_NAMESPACE")
                .unwrap_or_else(|_| "stockpulse".to_string()),
            sweep_interval: Duration::from_secs(
                std::env::var("CACHE_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

fn namespaced(namespace: &str, key: &str) -> String {
    format!("{namespace}:{key}")
}
