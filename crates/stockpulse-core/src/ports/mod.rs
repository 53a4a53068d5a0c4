//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod cache;
mod pacer;
mod rate_limit;
mod repository;
mod source;

pub use cache::{Cache, CacheError, CacheExt};
pub use pacer::Pacer;
pub use rate_limit::{RateLimitError, RateLimitResult, RateLimiter};
pub use repository::{
    AlertRepository, InventoryRepository, RaiseOutcome, ResolveOutcome, UpsertOutcome,
};
pub use source::{InventorySource, SourceError, SourcePage};
