//! Alert entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use stockpulse_core::domain::Alert;
use stockpulse_core::error::RepoError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub record_id: Uuid,
    pub account_id: String,
    pub kind: String,
    pub severity: String,
    pub state: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub created_at: DateTimeWithTimeZone,
    pub resolved_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_record::Entity",
        from = "Column::RecordId",
        to = "super::inventory_record::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    InventoryRecord,
}

impl Related<super::inventory_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Conversion from SeaORM Model to Domain Alert.
impl TryFrom<Model> for Alert {
    type Error = RepoError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| RepoError::Query(format!("alert {} has invalid {what}", model.id));

        Ok(Self {
            kind: model.kind.parse().map_err(|_| corrupt("kind"))?,
            severity: model.severity.parse().map_err(|_| corrupt("severity"))?,
            state: model.state.parse().map_err(|_| corrupt("state"))?,
            id: model.id,
            record_id: model.record_id,
            account_id: model.account_id,
            message: model.message,
            created_at: model.created_at.into(),
            resolved_at: model.resolved_at.map(Into::into),
        })
    }
}

/// Conversion from Domain Alert to SeaORM ActiveModel.
impl From<Alert> for ActiveModel {
    fn from(alert: Alert) -> Self {
        Self {
            id: Set(alert.id),
            record_id: Set(alert.record_id),
            account_id: Set(alert.account_id),
            kind: Set(alert.kind.as_str().to_string()),
            severity: Set(alert.severity.as_str().to_string()),
            state: Set(alert.state.as_str().to_string()),
            message: Set(alert.message),
            created_at: Set(alert.created_at.into()),
            resolved_at: Set(alert.resolved_at.map(Into::into)),
        }
    }
}
