//! External inventory source clients.

mod http;

pub use http::{HttpInventorySource, HttpSourceConfig};
