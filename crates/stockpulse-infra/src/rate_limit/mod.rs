//! Rate limiting implementations.

mod memory;

pub use memory::{RateLimitConfig, SlidingWindowRateLimiter};

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisRateLimitConfig, RedisRateLimiter};

use std::time::Duration;

use stockpulse_core::ports::RateLimitError;

/// Reject limits that could never admit anything.
fn validate(max_requests: u32, window: Duration) -> Result<(), RateLimitError> {
    if max_requests == 0 {
        return Err(RateLimitError::InvalidConfig(
            "max_requests must be greater than zero".to_string(),
        ));
    }
    if window.is_zero() {
        return Err(RateLimitError::InvalidConfig(
            "window must be longer than zero".to_string(),
        ));
    }
    Ok(())
}
