//! Application configuration loaded from environment variables.

use std::sync::Arc;

use coord_core::ports::{ScriptProvider, StoreGateway};
use coord_core::{LockConfig, RateLimiterConfig};
use coord_infra::{DirectoryScripts, EmbeddedScripts, InMemoryStore, RedisConfig};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub redis: RedisConfig,
    pub limiter: RateLimiterConfig,
    pub lock: LockConfig,
    pub scripts: Option<DirectoryScripts>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis: RedisConfig::from_env(),
            limiter: RateLimiterConfig::from_env(),
            lock: LockConfig::from_env(),
            scripts: DirectoryScripts::from_env(),
        }
    }

    /// Store gateway for this run.
    pub async fn store(&self, in_memory: bool) -> anyhow::Result<Arc<dyn StoreGateway>> {
        if in_memory {
            tracing::warn!("Using in-memory store - nothing is shared with other processes");
            return Ok(Arc::new(InMemoryStore::new()));
        }

        Ok(coord_infra::connect(&self.redis).await?)
    }

    /// Script provider: `SCRIPTS_DIR` if set, otherwise the embedded scripts.
    pub fn script_provider(&self) -> Box<dyn ScriptProvider> {
        match &self.scripts {
            Some(dir) => Box::new(dir.clone()),
            None => Box::new(EmbeddedScripts),
        }
    }
}
