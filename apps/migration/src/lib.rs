//! Schema migrations for the StockPulse store.

pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_inventory_records;
mod m20240601_000002_create_alerts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_inventory_records::Migration),
            Box::new(m20240601_000002_create_alerts::Migration),
        ]
    }
}
