//! Inventory record entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use stockpulse_core::domain::InventoryRecord;
use stockpulse_core::error::RepoError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "inventory_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: String,
    pub external_id: String,
    pub sku: String,
    pub quantity: i64,
    pub reorder_threshold: i64,
    pub status: String,
    pub location_id: Option<String>,
    pub product_id: Option<String>,
    pub external_updated_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::alert::Entity")]
    Alert,
}

impl Related<super::alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alert.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn corrupt(id: Uuid, what: &str) -> RepoError {
    RepoError::Query(format!("inventory record {id} has invalid {what}"))
}

/// Conversion from SeaORM Model to Domain InventoryRecord.
impl TryFrom<Model> for InventoryRecord {
    type Error = RepoError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            quantity: u32::try_from(model.quantity).map_err(|_| corrupt(model.id, "quantity"))?,
            reorder_threshold: u32::try_from(model.reorder_threshold)
                .map_err(|_| corrupt(model.id, "reorder_threshold"))?,
            status: model.status.parse().map_err(|_| corrupt(model.id, "status"))?,
            account_id: model.account_id,
            external_id: model.external_id,
            sku: model.sku,
            location_id: model.location_id,
            product_id: model.product_id,
            external_updated_at: model.external_updated_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }
}

/// Conversion from Domain InventoryRecord to SeaORM ActiveModel.
impl From<InventoryRecord> for ActiveModel {
    fn from(record: InventoryRecord) -> Self {
        Self {
            id: Set(record.id),
            account_id: Set(record.account_id),
            external_id: Set(record.external_id),
            sku: Set(record.sku),
            quantity: Set(i64::from(record.quantity)),
            reorder_threshold: Set(i64::from(record.reorder_threshold)),
            status: Set(record.status.as_str().to_string()),
            location_id: Set(record.location_id),
            product_id: Set(record.product_id),
            external_updated_at: Set(record.external_updated_at.map(Into::into)),
            created_at: Set(record.created_at.into()),
            updated_at: Set(record.updated_at.into()),
        }
    }
}
