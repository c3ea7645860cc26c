//! Store gateway implementations - Redis (single node or cluster) and in-memory.

mod memory;

pub use memory::InMemoryStore;

#[cfg(feature = "redis")]
mod cluster;
#[cfg(feature = "redis")]
mod config;
#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "redis")]
pub use self::cluster::RedisClusterGateway;
#[cfg(feature = "redis")]
pub use self::config::{RedisConfig, Topology};
#[cfg(feature = "redis")]
pub use self::redis::RedisGateway;

#[cfg(feature = "redis")]
use std::sync::Arc;

#[cfg(feature = "redis")]
use coord_core::ports::StoreGateway;

/// Connect the gateway matching `config.topology`.
#[cfg(feature = "redis")]
pub async fn connect(config: &RedisConfig) -> coord_core::Result<Arc<dyn StoreGateway>> {
    match config.topology {
        Topology::Single => Ok(Arc::new(RedisGateway::new(config.clone()).await?)),
        Topology::Cluster => Ok(Arc::new(RedisClusterGateway::new(config.clone()).await?)),
    }
}
