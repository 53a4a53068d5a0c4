//! SeaORM entities.

pub mod alert;
pub mod inventory_record;
