//! # StockPulse Infrastructure
//!
//! Concrete implementations of the ports defined in `stockpulse-core`.
//! This crate contains cache, rate limiting, persistence, and external source integrations.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL persistence via SeaORM
//! - `redis` - Redis support for cache and rate limiting
//! - `http-source` - reqwest client for the external inventory API

pub mod cache;
pub mod database;
pub mod pacer;
pub mod rate_limit;
pub mod sweeper;

#[cfg(feature = "http-source")]
pub mod source;

// Re-exports - In-Memory
pub use cache::{CacheConfig, InMemoryCache};
pub use database::{DatabaseConfig, InMemoryInventoryStore};
pub use pacer::{OutboundPacer, PacerConfig};
pub use rate_limit::{RateLimitConfig, SlidingWindowRateLimiter};
pub use sweeper::{Sweep, spawn_sweeper};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
#[cfg(feature = "redis")]
pub use rate_limit::{RedisRateLimitConfig, RedisRateLimiter};

// Re-exports - PostgreSQL
#[cfg(feature = "postgres")]
pub use database::{DatabaseConnections, PostgresAlertRepository, PostgresInventoryRepository};

// Re-exports - External source
#[cfg(feature = "http-source")]
pub use source::{HttpInventorySource, HttpSourceConfig};
