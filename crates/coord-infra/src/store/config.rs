//! Redis connection configuration.

use std::str::FromStr;
use std::time::Duration;

use coord_core::CoordError;

/// Store topology the gateway connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    #[default]
    Single,
    Cluster,
}

impl FromStr for Topology {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" | "single-node" | "standalone" => Ok(Topology::Single),
            "cluster" | "sharded-cluster" => Ok(Topology::Cluster),
            other => Err(CoordError::InvalidArgument(format!(
                "unknown topology: {other}"
            ))),
        }
    }
}

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379), used for single-node topology
    pub url: String,
    /// Single node or sharded cluster
    pub topology: Topology,
    /// Cluster seed node URLs; falls back to `url` when empty
    pub cluster_nodes: Vec<String>,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Upper bound on every individual store round trip
    pub response_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            topology: Topology::Single,
            cluster_nodes: Vec::new(),
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_millis(2000),
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            topology: parse_topology(std::env::var("REDIS_TOPOLOGY").ok()),
            cluster_nodes: std::env::var("REDIS_CLUSTER_NODES")
                .map(|v| parse_nodes(&v))
                .unwrap_or_default(),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            response_timeout: Duration::from_millis(
                std::env::var("REDIS_RESPONSE_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
        }
    }

    /// Seed nodes for the cluster client.
    pub fn nodes(&self) -> Vec<String> {
        if self.cluster_nodes.is_empty() {
            vec![self.url.clone()]
        } else {
            self.cluster_nodes.clone()
        }
    }
}

/// Topology from an optional setting; an unknown value falls back to single-node.
fn parse_topology(value: Option<String>) -> Topology {
    let Some(value) = value else {
        return Topology::default();
    };
    match value.parse() {
        Ok(topology) => topology,
        Err(e) => {
            tracing::warn!(value = %value, error = %e, "Invalid REDIS_TOPOLOGY, using single-node");
            Topology::default()
        }
    }
}

fn parse_nodes(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
