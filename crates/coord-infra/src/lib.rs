//! # Coord Infrastructure
//!
//! Concrete implementations of the ports defined in `coord-core`:
//! store gateways and script providers.
//!
//! ## Feature Flags
//!
//! - `redis` (default) - Redis single-node and cluster gateways

pub mod scripts;
pub mod store;


pub use scripts::{DirectoryScripts, EmbeddedScripts};
pub use store::InMemoryStore;

#[cfg(feature = "redis")]
pub use store::{RedisClusterGateway, RedisConfig, RedisGateway, Topology, connect};
