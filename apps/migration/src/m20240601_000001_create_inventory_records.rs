use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryRecords::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(InventoryRecords::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(InventoryRecords::AccountId).string().not_null())
                    .col(ColumnDef::new(InventoryRecords::ExternalId).string().not_null())
                    .col(ColumnDef::new(InventoryRecords::Sku).string().not_null())
                    .col(ColumnDef::new(InventoryRecords::Quantity).big_integer().not_null())
                    .col(
                        ColumnDef::new(InventoryRecords::ReorderThreshold)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryRecords::Status).string().not_null())
                    .col(ColumnDef::new(InventoryRecords::LocationId).string().null())
                    .col(ColumnDef::new(InventoryRecords::ProductId).string().null())
                    .col(
                        ColumnDef::new(InventoryRecords::ExternalUpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Upserts target this pair
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_records_account_external")
                    .table(InventoryRecords::Table)
                    .col(InventoryRecords::AccountId)
                    .col(InventoryRecords::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_records_account_status")
                    .table(InventoryRecords::Table)
                    .col(InventoryRecords::AccountId)
                    .col(InventoryRecords::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum InventoryRecords {
    Table,
    Id,
    AccountId,
    ExternalId,
    Sku,
    Quantity,
    ReorderThreshold,
    Status,
    LocationId,
    ProductId,
    ExternalUpdatedAt,
    CreatedAt,
    UpdatedAt,
}
