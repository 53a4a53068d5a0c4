//! Application services - orchestration written purely against the ports.

mod reader;
mod session;
mod sync;

pub use reader::InventoryReader;
pub use session::{SessionData, SessionStore};
pub use sync::{SyncConfig, SyncEngine, SyncSummary};
