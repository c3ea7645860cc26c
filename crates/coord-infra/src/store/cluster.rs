//! Sharded Redis cluster gateway.

use std::time::Duration;

use async_trait::async_trait;
use redis::Value;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;

use coord_core::ports::{AtomicScript, ScriptOutput, StoreGateway};
use coord_core::{CoordError, Result};

use super::RedisConfig;
use super::redis::{bounded, classify, script_output, set_nx_px};

/// Redis cluster store gateway.
///
/// Commands are routed to the shard owning their key. Scripts are sent with
/// plain `EVAL`, routed by their first key, so no per-shard script cache has
/// to be primed.
pub struct RedisClusterGateway {
    conn: ClusterConnection,
    config: RedisConfig,
}

impl RedisClusterGateway {
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let nodes = config.nodes();
        let client = ClusterClient::new(nodes.clone())
            .map_err(|e| CoordError::Connectivity(e.to_string()))?;

        let conn = tokio::time::timeout(config.connect_timeout, client.get_async_connection())
            .await
            .map_err(|_| CoordError::Connectivity("Connection timed out".to_string()))?
            .map_err(|e| CoordError::Connectivity(e.to_string()))?;

        tracing::info!(nodes = ?nodes, "Connected to Redis cluster");

        Ok(Self { conn, config })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self> {
        Self::new(RedisConfig::from_env()).await
    }
}

#[async_trait]
impl StoreGateway for RedisClusterGateway {
    async fn run_script(
        &self,
        script: &AtomicScript,
        keys: &[String],
        args: &[String],
    ) -> Result<ScriptOutput> {
        let mut conn = self.conn.clone();

        let mut cmd = redis::cmd("EVAL");
        cmd.arg(script.source()).arg(keys.len());
        for key in keys {
            cmd.arg(key);
        }
        for arg in args {
            cmd.arg(arg);
        }

        let value: Value = bounded(self.config.response_timeout, cmd.query_async(&mut conn))
            .await?
            .map_err(|e| classify(e, CoordError::Script))?;
        script_output(value)
    }

    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool> {
        let mut conn = self.conn.clone();
        set_nx_px(&mut conn, key, value, ttl, self.config.response_timeout).await
    }
}
