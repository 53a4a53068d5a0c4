//! PostgreSQL repository implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use stockpulse_core::domain::{Alert, AlertKind, AlertState, InventoryRecord, StockStatus};
use stockpulse_core::error::RepoError;
use stockpulse_core::ports::{
    AlertRepository, InventoryRepository, RaiseOutcome, ResolveOutcome, UpsertOutcome,
};

use super::entity::alert::{self, Entity as AlertEntity};
use super::entity::inventory_record::{self, Entity as RecordEntity};
use super::same_content;

fn db_err(e: DbErr) -> RepoError {
    match &e {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => RepoError::Connection(e.to_string()),
        _ => RepoError::Query(e.to_string()),
    }
}

fn into_records(models: Vec<inventory_record::Model>) -> Result<Vec<InventoryRecord>, RepoError> {
    models.into_iter().map(InventoryRecord::try_from).collect()
}

fn into_alerts(models: Vec<alert::Model>) -> Result<Vec<Alert>, RepoError> {
    models.into_iter().map(Alert::try_from).collect()
}

/// PostgreSQL inventory record repository.
pub struct PostgresInventoryRepository {
    db: DbConn,
}

impl PostgresInventoryRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InventoryRepository for PostgresInventoryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<InventoryRecord>, RepoError> {
        RecordEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(InventoryRecord::try_from)
            .transpose()
    }

    async fn find_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> Result<Option<InventoryRecord>, RepoError> {
        RecordEntity::find()
            .filter(inventory_record::Column::AccountId.eq(account_id))
            .filter(inventory_record::Column::ExternalId.eq(external_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(InventoryRecord::try_from)
            .transpose()
    }

    async fn upsert(&self, mut record: InventoryRecord) -> Result<UpsertOutcome, RepoError> {
        let existing = self
            .find_by_external_id(&record.account_id, &record.external_id)
            .await?;

        let outcome = match existing {
            None => UpsertOutcome::Created(record),
            Some(stored) if same_content(&stored, &record) => {
                return Ok(UpsertOutcome::Unchanged(stored));
            }
            Some(stored) => {
                record.id = stored.id;
                record.created_at = stored.created_at;
                UpsertOutcome::Updated(record)
            }
        };

        // The unique (account_id, external_id) index makes a racing insert land as an update
        let active: inventory_record::ActiveModel = outcome.record().clone().into();
        RecordEntity::insert(active)
            .on_conflict(
                OnConflict::columns([
                    inventory_record::Column::AccountId,
                    inventory_record::Column::ExternalId,
                ])
                .update_columns([
                    inventory_record::Column::Sku,
                    inventory_record::Column::Quantity,
                    inventory_record::Column::ReorderThreshold,
                    inventory_record::Column::Status,
                    inventory_record::Column::LocationId,
                    inventory_record::Column::ProductId,
                    inventory_record::Column::ExternalUpdatedAt,
                    inventory_record::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;

        Ok(outcome)
    }

    async fn find_by_account(&self, account_id: &str) -> Result<Vec<InventoryRecord>, RepoError> {
        let models = RecordEntity::find()
            .filter(inventory_record::Column::AccountId.eq(account_id))
            .order_by_asc(inventory_record::Column::Sku)
            .order_by_asc(inventory_record::Column::ExternalId)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        into_records(models)
    }

    async fn find_by_status(
        &self,
        account_id: &str,
        status: StockStatus,
    ) -> Result<Vec<InventoryRecord>, RepoError> {
        let models = RecordEntity::find()
            .filter(inventory_record::Column::AccountId.eq(account_id))
            .filter(inventory_record::Column::Status.eq(status.as_str()))
            .order_by_asc(inventory_record::Column::Sku)
            .order_by_asc(inventory_record::Column::ExternalId)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        into_records(models)
    }
}

/// PostgreSQL alert repository.
///
/// Relies on the partial unique index over (record_id, kind) where state is
/// active, so concurrent raises for the same condition collapse to one row.
pub struct PostgresAlertRepository {
    db: DbConn,
}

impl PostgresAlertRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    async fn find_active_of_kind(
        &self,
        record_id: Uuid,
        kind: AlertKind,
    ) -> Result<Option<alert::Model>, RepoError> {
        AlertEntity::find()
            .filter(alert::Column::RecordId.eq(record_id))
            .filter(alert::Column::Kind.eq(kind.as_str()))
            .filter(alert::Column::State.eq(AlertState::Active.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl AlertRepository for PostgresAlertRepository {
    async fn raise(&self, alert: Alert) -> Result<RaiseOutcome, RepoError> {
        let (record_id, kind) = (alert.record_id, alert.kind);
        let active: alert::ActiveModel = alert.clone().into();

        let inserted = AlertEntity::insert(active)
            .on_conflict(OnConflict::new().do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;

        if inserted > 0 {
            return Ok(RaiseOutcome::Raised(alert));
        }

        match self.find_active_of_kind(record_id, kind).await? {
            Some(existing) => Ok(RaiseOutcome::AlreadyActive(existing.try_into()?)),
            // Resolved between the conflict and the lookup
            None => Err(RepoError::Constraint(format!(
                "alert for record {record_id} conflicted but no active {kind} alert exists"
            ))),
        }
    }

    async fn resolve(
        &self,
        record_id: Uuid,
        kind: AlertKind,
        at: DateTime<Utc>,
    ) -> Result<ResolveOutcome, RepoError> {
        let Some(model) = self.find_active_of_kind(record_id, kind).await? else {
            return Ok(ResolveOutcome::NotActive);
        };

        let resolved_at: sea_orm::prelude::DateTimeWithTimeZone = at.into();
        let result = AlertEntity::update_many()
            .col_expr(alert::Column::State, Expr::value(AlertState::Resolved.as_str()))
            .col_expr(alert::Column::ResolvedAt, Expr::value(resolved_at))
            .filter(alert::Column::Id.eq(model.id))
            .filter(alert::Column::State.eq(AlertState::Active.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Ok(ResolveOutcome::NotActive);
        }

        let mut alert = Alert::try_from(model)?;
        alert.resolve(at);
        Ok(ResolveOutcome::Resolved(alert))
    }

    async fn find_active(&self, record_id: Uuid) -> Result<Vec<Alert>, RepoError> {
        let models = AlertEntity::find()
            .filter(alert::Column::RecordId.eq(record_id))
            .filter(alert::Column::State.eq(AlertState::Active.as_str()))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        into_alerts(models)
    }

    async fn find_by_account(
        &self,
        account_id: &str,
        state: Option<AlertState>,
    ) -> Result<Vec<Alert>, RepoError> {
        let mut query = AlertEntity::find().filter(alert::Column::AccountId.eq(account_id));
        if let Some(state) = state {
            query = query.filter(alert::Column::State.eq(state.as_str()));
        }

        let models = query
            .order_by_desc(alert::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        into_alerts(models)
    }
}
