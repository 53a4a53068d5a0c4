//! In-memory cache implementation - used as fallback when Redis is unavailable.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use glob::Pattern;
use tokio::sync::RwLock;
use tokio::time::Instant;

use stockpulse_core::ports::{Cache, CacheError};

use super::{CacheConfig, namespaced};
use crate::sweeper::Sweep;

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// In-memory cache using a simple HashMap with async RwLock.
///
/// This is the fallback implementation when Redis is not available.
/// Expired entries read as misses immediately and are physically removed on
/// access or by the periodic [`Sweep`].
/// Note: Data is lost on process restart.
pub struct InMemoryCache {
    store: RwLock<HashMap<String, CacheEntry>>,
    namespace: String,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    pub fn with_config(config: &CacheConfig) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            namespace: config.namespace.clone(),
        }
    }

    /// Number of physically stored entries, expired ones included.
    pub async fn entry_count(&self) -> usize {
        self.store.read().await.len()
    }

    fn key(&self, key: &str) -> String {
        namespaced(&self.namespace, key)
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let key = self.key(key);
        let now = Instant::now();

        {
            let store = self.store.read().await;
            match store.get(&key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired: clean up, unless a writer replaced it in between
        let mut store = self.store.write().await;
        if store.get(&key).is_some_and(|e| e.is_expired(Instant::now())) {
            store.remove(&key);
        }
        None
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut store = self.store.write().await;

        let expires_at = ttl.map(|d| Instant::now() + d);

        store.insert(
            self.key(key),
            CacheEntry {
                value: value.to_string(),
                expires_at,
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut store = self.store.write().await;
        let removed = store.remove(&self.key(key));
        Ok(removed.is_some_and(|e| !e.is_expired(Instant::now())))
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let full = format!("{}:{}", Pattern::escape(&self.namespace), pattern);
        let matcher = Pattern::new(&full).map_err(|e| CacheError::Operation(e.to_string()))?;

        let now = Instant::now();
        let mut removed = 0u64;
        let mut store = self.store.write().await;
        store.retain(|key, entry| {
            if !matcher.matches(key) {
                return true;
            }
            if !entry.is_expired(now) {
                removed += 1;
            }
            false
        });

        tracing::debug!(pattern = %pattern, removed, "Deleted keys by pattern");
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    async fn increment(&self, key: &str, amount: i64) -> Result<i64, CacheError> {
        let key = self.key(key);
        let now = Instant::now();
        let mut store = self.store.write().await;

        match store.get_mut(&key) {
            Some(entry) if !entry.is_expired(now) => {
                let current: i64 = entry.value.parse().map_err(|_| {
                    CacheError::Operation(format!("value at {key} is not an integer"))
                })?;
                let next = current
                    .checked_add(amount)
                    .ok_or_else(|| CacheError::Operation(format!("increment overflow at {key}")))?;
                entry.value = next.to_string();
                Ok(next)
            }
            _ => {
                store.insert(
                    key,
                    CacheEntry {
                        value: amount.to_string(),
                        expires_at: None,
                    },
                );
                Ok(amount)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let key = self.key(key);
        let now = Instant::now();
        let mut store = self.store.write().await;

        match store.get_mut(&key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            Some(_) => {
                store.remove(&key);
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl Sweep for InMemoryCache {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut store = self.store.write().await;
        let before = store.len();
        store.retain(|_, entry| !entry.is_expired(now));
        before - store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryCache::new();
        cache.set("key1", "value1", None).await.unwrap();
        assert_eq!(cache.get("key1").await, Some("value1".to_string()));
        assert!(cache.exists("key1").await);
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = InMemoryCache::new();
        cache.set("key1", "value1", None).await.unwrap();
        assert!(cache.delete("key1").await.unwrap());
        assert_eq!(cache.get("key1").await, None);
        assert!(!cache.delete("key1").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_reads_as_miss() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await, Some("v".to_string()));

        tokio::time::advance(Duration::from_millis(1100)).await;
        assert_eq!(cache.get("k").await, None);
        assert!(!cache.exists("k").await);
    }

    #[tokio::test]
    async fn test_delete_by_pattern() {
        let cache = InMemoryCache::new();
        cache.set("acct:1:a", "1", None).await.unwrap();
        cache.set("acct:1:b", "2", None).await.unwrap();
        cache.set("acct:2:a", "3", None).await.unwrap();

        let removed = cache.delete_by_pattern("acct:1:*").await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(cache.get("acct:1:a").await, None);
        assert_eq!(cache.get("acct:1:b").await, None);
        assert_eq!(cache.get("acct:2:a").await, Some("3".to_string()));
    }

    #[tokio::test]
    async fn test_pattern_scoped_to_namespace() {
        let config = CacheConfig {
            namespace: "other".to_string(),
            ..CacheConfig::default()
        };
        let other = InMemoryCache::with_config(&config);
        other.set("acct:1:a", "x", None).await.unwrap();

        assert_eq!(other.delete_by_pattern("*:acct:1:a").await.unwrap(), 0);
        assert!(other.exists("acct:1:a").await);
    }

    #[tokio::test]
    async fn test_increment_creates_and_adds() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.increment("hits", 5).await.unwrap(), 5);
        assert_eq!(cache.increment("hits", 2).await.unwrap(), 7);
        assert_eq!(cache.get("hits").await, Some("7".to_string()));

        cache.set("name", "abc", None).await.unwrap();
        assert!(cache.increment("name", 1).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_keeps_ttl() {
        let cache = InMemoryCache::new();
        cache
            .set("n", "1", Some(Duration::from_secs(10)))
            .await
            .unwrap();
        cache.increment("n", 1).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("n").await, None);
        assert_eq!(cache.increment("n", 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_atomic() {
        let cache = std::sync::Arc::new(InMemoryCache::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.increment("counter", 1).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(cache.get("counter").await, Some("50".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_refreshes_without_rewrite() {
        let cache = InMemoryCache::new();
        cache
            .set("s", "payload", Some(Duration::from_secs(2)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(cache.expire("s", Duration::from_secs(2)).await.unwrap());

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(cache.get("s").await, Some("payload".to_string()));
        assert!(!cache.expire("missing", Duration::from_secs(2)).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_expired() {
        let cache = InMemoryCache::new();
        cache
            .set("short", "1", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        cache.set("forever", "2", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.sweep().await, 1);
        assert_eq!(cache.entry_count().await, 1);
    }
}
