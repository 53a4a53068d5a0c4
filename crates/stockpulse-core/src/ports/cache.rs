use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cache trait - abstraction over caching backends (Redis, in-memory).
///
/// Implementations prefix every key with their namespace. All operations are
/// fail-open: reads degrade to a miss, writes report a `CacheError` that
/// callers log and move past. A cache outage costs latency, never correctness.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a value from the cache. Absent, expired, and unreachable all read as `None`.
    async fn get(&self, key: &str) -> Option<String>;

    /// Set a value in the cache with optional TTL. `None` never expires.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Delete a key from the cache. Returns whether a live key was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Delete every key matching a glob-style pattern (`*`, `?`, `[...]`)
    /// within the namespace. Returns the number of keys removed.
    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> bool;

    /// Atomically add `amount` to an integer value, creating it at `amount` if absent.
    async fn increment(&self, key: &str, amount: i64) -> Result<i64, CacheError>;

    /// Set or refresh the TTL of an existing key without rewriting its value.
    /// Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

/// Typed JSON helpers over any [`Cache`].
#[async_trait]
pub trait CacheExt: Cache {
    /// Read and deserialize a value. A value that no longer deserializes is a miss.
    async fn get_json<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Serialize and store a value.
    async fn set_json<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), CacheError>
    where
        T: Serialize + Sync,
    {
        let raw =
            serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.set(key, &raw, ttl).await
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}
