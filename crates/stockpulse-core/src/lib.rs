//! # StockPulse Core
//!
//! The domain layer of StockPulse.
//! Domain types, the ports infrastructure must implement, and the services
//! (inventory sync, sessions, cached reads) written purely against those ports.

pub mod domain;
pub mod error;
pub mod keys;
pub mod ports;
pub mod services;

pub use error::{DomainError, RepoError, SyncError};
pub use services::{InventoryReader, SessionStore, SyncConfig, SyncEngine, SyncSummary};
