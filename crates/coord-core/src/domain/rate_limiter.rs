//! Fixed-window rate limiter.
//!
//! Time is cut into windows of `window_secs` whole seconds and every window
//! has its own counter in the store, keyed by the window index. The counter is
//! incremented and compared against the limit by one atomic script, so
//! concurrent callers in any number of processes can never both slip past the
//! limit. Traffic straddling a window boundary can reach twice the limit.

use std::slice;
use std::sync::Arc;

use crate::error::{CoordError, Result};
use crate::ports::{AtomicScript, Clock, ScriptId, ScriptProvider, StoreGateway, SystemClock};

/// Script reply meaning the request was rejected.
const DENIED: i64 = 0;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum admissions per window.
    pub limit: u32,
    /// Prefix prepended to every window key.
    pub key_prefix: String,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            limit: 200,
            key_prefix: String::new(),
            window_secs: 1,
        }
    }
}

impl RateLimiterConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            limit: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(200),
            key_prefix: std::env::var("RATE_LIMIT_KEY_PREFIX").unwrap_or_default(),
            window_secs: std::env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(CoordError::InvalidArgument(
                "limit must be greater than 0".to_string(),
            ));
        }
        if self.window_secs == 0 {
            return Err(CoordError::InvalidArgument(
                "window_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Distributed fixed-window rate limiter.
///
/// Immutable after construction; share it behind an `Arc` across tasks.
pub struct RateLimiter {
    store: Arc<dyn StoreGateway>,
    clock: Arc<dyn Clock>,
    config: RateLimiterConfig,
    script: AtomicScript,
}

impl RateLimiter {
    pub fn builder(store: Arc<dyn StoreGateway>) -> RateLimiterBuilder {
        RateLimiterBuilder {
            store,
            clock: Arc::new(SystemClock),
            config: RateLimiterConfig::default(),
        }
    }

    pub fn new(
        store: Arc<dyn StoreGateway>,
        config: RateLimiterConfig,
        scripts: &dyn ScriptProvider,
    ) -> Result<Self> {
        Self::builder(store).config(config).build(scripts)
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Count a request against the window shared by every caller.
    /// Returns `Ok(true)` if it is within budget.
    pub async fn acquire(&self) -> Result<bool> {
        let key = self.window_key("");
        self.limit_request(key).await
    }

    /// Count a request against the window of `sub_key`, which has its own
    /// budget independent of every other sub-key.
    pub async fn acquire_keyed(&self, sub_key: &str) -> Result<bool> {
        if sub_key.is_empty() {
            return Err(CoordError::InvalidArgument(
                "sub key cannot be empty".to_string(),
            ));
        }
        let key = self.window_key(sub_key);
        self.limit_request(key).await
    }

    fn window_key(&self, sub_key: &str) -> String {
        let window = self.clock.now_unix_secs() / self.config.window_secs;
        format!("{}{}{}", self.config.key_prefix, sub_key, window)
    }

    async fn limit_request(&self, key: String) -> Result<bool> {
        let args = [
            self.config.limit.to_string(),
            self.config.window_secs.to_string(),
        ];
        let reply = self
            .store
            .run_script(&self.script, slice::from_ref(&key), &args)
            .await?;

        let count = reply.as_int().ok_or_else(|| {
            CoordError::Script(format!("unexpected rate limit reply: {reply:?}"))
        })?;

        let allowed = count != DENIED;
        if allowed {
            tracing::debug!(key = %key, count, "Request admitted");
        } else {
            tracing::warn!(key = %key, limit = self.config.limit, "Rate limit exceeded");
        }
        Ok(allowed)
    }
}

/// Builder for [`RateLimiter`]. Validation happens in [`build`](Self::build).
pub struct RateLimiterBuilder {
    store: Arc<dyn StoreGateway>,
    clock: Arc<dyn Clock>,
    config: RateLimiterConfig,
}

impl RateLimiterBuilder {
    pub fn config(mut self, config: RateLimiterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.config.limit = limit;
        self
    }

    pub fn key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.config.key_prefix = key_prefix.into();
        self
    }

    pub fn window_secs(mut self, window_secs: u64) -> Self {
        self.config.window_secs = window_secs;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self, scripts: &dyn ScriptProvider) -> Result<RateLimiter> {
        self.config.validate()?;
        let script = AtomicScript::load(scripts, ScriptId::RateLimit)?;

        Ok(RateLimiter {
            store: self.store,
            clock: self.clock,
            config: self.config,
            script,
        })
    }
}
