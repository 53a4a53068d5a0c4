//! Session store on top of the cache, with sliding expiration.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::keys;
use crate::ports::{Cache, CacheExt};

/// Session payload - a flat JSON object.
pub type SessionData = serde_json::Map<String, Value>;

/// Keyed sessions stored in the cache.
///
/// Every successful read pushes the expiry out by the configured TTL. All
/// operations report success as a `bool`; cache failures are logged, never raised.
#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl SessionStore {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a new session, replacing any existing one under `id`.
    pub async fn create(&self, id: &str, data: SessionData) -> bool {
        let key = keys::session(id);
        match self.cache.set_json(&key, &data, Some(self.ttl)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Failed to create session");
                false
            }
        }
    }

    /// Read a session and slide its expiry.
    pub async fn get(&self, id: &str) -> Option<SessionData> {
        let key = keys::session(id);
        let data = self.cache.get_json::<SessionData>(&key).await?;
        self.touch(&key).await;
        Some(data)
    }

    /// Merge `partial` into an existing session (top-level keys overwrite).
    ///
    /// Returns `false` without writing when the session does not exist.
    pub async fn update(&self, id: &str, partial: SessionData) -> bool {
        let key = keys::session(id);
        let Some(mut data) = self.cache.get_json::<SessionData>(&key).await else {
            return false;
        };
        data.extend(partial);

        match self.cache.set_json(&key, &data, Some(self.ttl)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Failed to update session");
                false
            }
        }
    }

    pub async fn delete(&self, id: &str) -> bool {
        match self.cache.delete(&keys::session(id)).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Failed to delete session");
                false
            }
        }
    }

    /// Refresh the TTL without reading or rewriting the session.
    pub async fn extend(&self, id: &str) -> bool {
        self.touch(&keys::session(id)).await
    }

    async fn touch(&self, key: &str) -> bool {
        match self.cache.expire(key, self.ttl).await {
            Ok(existed) => existed,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to refresh session TTL");
                false
            }
        }
    }
}
