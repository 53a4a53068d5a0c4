//! Domain entities - the core business objects.

mod alert;
mod inventory;

pub use alert::{Alert, AlertKind, AlertState, Severity};
pub use inventory::{
    ExternalInventoryRecord, InventoryRecord, RecordValidationError, StockStatus, ValidatedRecord,
};
