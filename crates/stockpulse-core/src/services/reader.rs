//! Read-through cache over the local inventory store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{Alert, AlertState, InventoryRecord, StockStatus};
use crate::error::RepoError;
use crate::keys;
use crate::ports::{AlertRepository, Cache, CacheExt, InventoryRepository};

/// Serves inventory reads from the cache, falling back to the store and repopulating.
pub struct InventoryReader {
    cache: Arc<dyn Cache>,
    records: Arc<dyn InventoryRepository>,
    alerts: Arc<dyn AlertRepository>,
    ttl: Duration,
}

impl InventoryReader {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    pub fn new(
        cache: Arc<dyn Cache>,
        records: Arc<dyn InventoryRepository>,
        alerts: Arc<dyn AlertRepository>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            records,
            alerts,
            ttl,
        }
    }

    pub async fn list(&self, account_id: &str) -> Result<Vec<InventoryRecord>, RepoError> {
        self.read_through(keys::inventory_list(account_id), || {
            self.records.find_by_account(account_id)
        })
        .await
    }

    pub async fn list_by_status(
        &self,
        account_id: &str,
        status: StockStatus,
    ) -> Result<Vec<InventoryRecord>, RepoError> {
        self.read_through(keys::inventory_by_status(account_id, status), || {
            self.records.find_by_status(account_id, status)
        })
        .await
    }

    /// A single record. Misses are not cached.
    pub async fn get(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> Result<Option<InventoryRecord>, RepoError> {
        let key = keys::inventory_item(account_id, external_id);
        if let Some(record) = self.cache.get_json::<InventoryRecord>(&key).await {
            return Ok(Some(record));
        }

        let record = self
            .records
            .find_by_external_id(account_id, external_id)
            .await?;
        if let Some(record) = &record {
            self.populate(&key, record).await;
        }
        Ok(record)
    }

    pub async fn active_alerts(&self, account_id: &str) -> Result<Vec<Alert>, RepoError> {
        self.read_through(keys::active_alerts(account_id), || {
            self.alerts.find_by_account(account_id, Some(AlertState::Active))
        })
        .await
    }

    async fn read_through<T, F, Fut>(&self, key: String, load: F) -> Result<T, RepoError>
    where
        T: Serialize + DeserializeOwned + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RepoError>>,
    {
        if let Some(hit) = self.cache.get_json::<T>(&key).await {
            tracing::debug!(key = %key, "Cache hit");
            return Ok(hit);
        }

        let value = load().await?;
        self.populate(&key, &value).await;
        Ok(value)
    }

    async fn populate<T>(&self, key: &str, value: &T)
    where
        T: Serialize + Sync,
    {
        if let Err(e) = self.cache.set_json(key, value, Some(self.ttl)).await {
            tracing::warn!(key = %key, error = %e, "Failed to populate cache");
        }
    }
}
