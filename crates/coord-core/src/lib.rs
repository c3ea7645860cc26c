//! # Coord Core
//!
//! Distributed coordination primitives built on a shared key-value store:
//! a token-checked mutual-exclusion lock and a fixed-window rate limiter.
//!
//! Mutual exclusion and counting are delegated entirely to the store's atomic
//! operations. This crate holds the protocols and the ports they need; the
//! store transports and script sources live in `coord-infra`.

pub mod domain;
pub mod error;
pub mod ports;

pub use domain::{
    DistributedLock, LockBuilder, LockConfig, RateLimiter, RateLimiterBuilder, RateLimiterConfig,
};
pub use error::{CoordError, Result};
