//! In-memory inventory and alert store - used when no database is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use stockpulse_core::domain::{Alert, AlertKind, AlertState, InventoryRecord, StockStatus};
use stockpulse_core::error::RepoError;
use stockpulse_core::ports::{
    AlertRepository, InventoryRepository, RaiseOutcome, ResolveOutcome, UpsertOutcome,
};

use super::same_content;

type RecordKey = (String, String);

/// Records keyed by (account, external id), alerts in insertion order.
///
/// Each write takes the relevant lock for its whole check-and-write, which
/// gives `upsert` and `raise` the same atomicity the database provides.
/// Note: Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryInventoryStore {
    records: RwLock<HashMap<RecordKey, InventoryRecord>>,
    alerts: RwLock<Vec<Alert>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored alert, active or not.
    pub async fn all_alerts(&self) -> Vec<Alert> {
        self.alerts.read().await.clone()
    }
}

fn sorted(mut records: Vec<InventoryRecord>) -> Vec<InventoryRecord> {
    records.sort_by(|a, b| a.sku.cmp(&b.sku).then_with(|| a.external_id.cmp(&b.external_id)));
    records
}

#[async_trait]
impl InventoryRepository for InMemoryInventoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<InventoryRecord>, RepoError> {
        let records = self.records.read().await;
        Ok(records.values().find(|r| r.id == id).cloned())
    }

    async fn find_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> Result<Option<InventoryRecord>, RepoError> {
        let records = self.records.read().await;
        Ok(records
            .get(&(account_id.to_string(), external_id.to_string()))
            .cloned())
    }

    async fn upsert(&self, mut record: InventoryRecord) -> Result<UpsertOutcome, RepoError> {
        let key = (record.account_id.clone(), record.external_id.clone());
        let mut records = self.records.write().await;

        let outcome = match records.get(&key) {
            None => UpsertOutcome::Created(record),
            Some(stored) if same_content(stored, &record) => {
                return Ok(UpsertOutcome::Unchanged(stored.clone()));
            }
            Some(stored) => {
                record.id = stored.id;
                record.created_at = stored.created_at;
                UpsertOutcome::Updated(record)
            }
        };

        records.insert(key, outcome.record().clone());
        Ok(outcome)
    }

    async fn find_by_account(&self, account_id: &str) -> Result<Vec<InventoryRecord>, RepoError> {
        let records = self.records.read().await;
        Ok(sorted(
            records
                .values()
                .filter(|r| r.account_id == account_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_by_status(
        &self,
        account_id: &str,
        status: StockStatus,
    ) -> Result<Vec<InventoryRecord>, RepoError> {
        let records = self.records.read().await;
        Ok(sorted(
            records
                .values()
                .filter(|r| r.account_id == account_id && r.status == status)
                .cloned()
                .collect(),
        ))
    }
}

#[async_trait]
impl AlertRepository for InMemoryInventoryStore {
    async fn raise(&self, alert: Alert) -> Result<RaiseOutcome, RepoError> {
        let mut alerts = self.alerts.write().await;

        if let Some(existing) = alerts
            .iter()
            .find(|a| a.record_id == alert.record_id && a.kind == alert.kind && a.is_active())
        {
            return Ok(RaiseOutcome::AlreadyActive(existing.clone()));
        }

        alerts.push(alert.clone());
        Ok(RaiseOutcome::Raised(alert))
    }

    async fn resolve(
        &self,
        record_id: Uuid,
        kind: AlertKind,
        at: DateTime<Utc>,
    ) -> Result<ResolveOutcome, RepoError> {
        let mut alerts = self.alerts.write().await;

        match alerts
            .iter_mut()
            .find(|a| a.record_id == record_id && a.kind == kind && a.is_active())
        {
            Some(alert) => {
                alert.resolve(at);
                Ok(ResolveOutcome::Resolved(alert.clone()))
            }
            None => Ok(ResolveOutcome::NotActive),
        }
    }

    async fn find_active(&self, record_id: Uuid) -> Result<Vec<Alert>, RepoError> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .iter()
            .filter(|a| a.record_id == record_id && a.is_active())
            .cloned()
            .collect())
    }

    async fn find_by_account(
        &self,
        account_id: &str,
        state: Option<AlertState>,
    ) -> Result<Vec<Alert>, RepoError> {
        let alerts = self.alerts.read().await;
        let mut found: Vec<Alert> = alerts
            .iter()
            .filter(|a| a.account_id == account_id && state.is_none_or(|s| a.state == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}
