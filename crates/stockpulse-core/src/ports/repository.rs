use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Alert, AlertKind, AlertState, InventoryRecord, StockStatus};
use crate::error::RepoError;

/// Result of upserting a record by (account, external id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First sighting - a new row was written.
    Created(InventoryRecord),
    /// Existing row overwritten with changed fields.
    Updated(InventoryRecord),
    /// Existing row already matched.
    Unchanged(InventoryRecord),
}

impl UpsertOutcome {
    pub fn record(&self) -> &InventoryRecord {
        match self {
            UpsertOutcome::Created(r) | UpsertOutcome::Updated(r) | UpsertOutcome::Unchanged(r) => r,
        }
    }
}

/// Result of raising an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaiseOutcome {
    Raised(Alert),
    /// An alert of the same kind was already active for the record; nothing was written.
    AlreadyActive(Alert),
}

/// Result of resolving an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved(Alert),
    /// No active alert of that kind existed.
    NotActive,
}

/// Local store of synchronized inventory records.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Find a record by its internal id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<InventoryRecord>, RepoError>;

    /// Find a record by the external source's identifier.
    async fn find_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> Result<Option<InventoryRecord>, RepoError>;

    /// Insert or overwrite by (account, external id).
    ///
    /// When a row exists, its `id` and `created_at` win over the incoming record's.
    async fn upsert(&self, record: InventoryRecord) -> Result<UpsertOutcome, RepoError>;

    /// All records of an account.
    async fn find_by_account(&self, account_id: &str) -> Result<Vec<InventoryRecord>, RepoError>;

    /// Records of an account in a given status.
    async fn find_by_status(
        &self,
        account_id: &str,
        status: StockStatus,
    ) -> Result<Vec<InventoryRecord>, RepoError>;
}

/// Local store of stock alerts.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Persist `alert` unless an active alert of the same kind exists for its record.
    ///
    /// Check and insert are one atomic step per (record, kind).
    async fn raise(&self, alert: Alert) -> Result<RaiseOutcome, RepoError>;

    /// Resolve the active alert of `kind` for `record_id`, if any.
    async fn resolve(
        &self,
        record_id: Uuid,
        kind: AlertKind,
        at: DateTime<Utc>,
    ) -> Result<ResolveOutcome, RepoError>;

    /// Active alerts of a record.
    async fn find_active(&self, record_id: Uuid) -> Result<Vec<Alert>, RepoError>;

    /// Alerts of an account, optionally filtered by state, newest first.
    async fn find_by_account(
        &self,
        account_id: &str,
        state: Option<AlertState>,
    ) -> Result<Vec<Alert>, RepoError>;
}
