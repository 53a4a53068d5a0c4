//! Persistence for inventory records and alerts.

mod connections;
mod memory;

#[cfg(feature = "postgres")]
pub mod entity;
#[cfg(feature = "postgres")]
pub mod postgres_repo;

pub use connections::DatabaseConfig;
pub use memory::InMemoryInventoryStore;

#[cfg(feature = "postgres")]
pub use connections::DatabaseConnections;
#[cfg(feature = "postgres")]
pub use postgres_repo::{PostgresAlertRepository, PostgresInventoryRepository};


use stockpulse_core::domain::InventoryRecord;

/// Whether `incoming` carries the same content as the stored row, ignoring identity and timestamps.
fn same_content(stored: &InventoryRecord, incoming: &InventoryRecord) -> bool {
    stored.account_id == incoming.account_id
        && stored.external_id == incoming.external_id
        && stored.sku == incoming.sku
        && stored.quantity == incoming.quantity
        && stored.reorder_threshold == incoming.reorder_threshold
        && stored.status == incoming.status
        && stored.location_id == incoming.location_id
        && stored.product_id == incoming.product_id
        && stored.external_updated_at == incoming.external_updated_at
}
