//! # StockPulse Shared
//!
//! Wire types for the HTTP API, kept free of domain and infrastructure dependencies.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse};
