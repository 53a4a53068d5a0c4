//! Outbound pacing port.

use async_trait::async_trait;
use std::time::Duration;

/// Spaces out calls to a rate-budgeted upstream, per identifier.
///
/// Unlike [`RateLimiter`](super::RateLimiter) a pacer never rejects; it delays.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Suspend until the minimum interval since the previous call for `key`
    /// has elapsed, then record this call. Returns how long the caller waited.
    async fn wait_if_needed(&self, key: &str) -> Duration;
}
