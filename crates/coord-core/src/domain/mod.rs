//! The coordination primitives.

mod lock;
mod rate_limiter;

#[cfg(test)]
mod fake;

pub use lock::{DistributedLock, LockBuilder, LockConfig};
pub use rate_limiter::{RateLimiter, RateLimiterBuilder, RateLimiterConfig};
