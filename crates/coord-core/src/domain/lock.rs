//! Token-checked distributed lock.
//!
//! A lock is a single store entry `lock_prefix + key` holding the owner's
//! token. It is created only by a conditional set that attaches the expiry in
//! the same operation, and removed either by that expiry or by an unlock
//! script that compares the token and deletes in one step. A held lock is
//! never overwritten by another owner.

use std::slice;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{CoordError, Result};
use crate::ports::{AtomicScript, ScriptId, ScriptProvider, StoreGateway};

/// Unlock script reply meaning the entry was deleted.
const UNLOCKED: i64 = 1;

/// Distributed lock configuration.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Namespace prepended to every lock key.
    pub lock_prefix: String,
    /// Pause between attempts of the blocking variants.
    pub sleep_time: Duration,
    /// Expiry attached by `try_lock` and the blocking variants.
    pub default_ttl: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lock_prefix: "lock_".to_string(),
            sleep_time: Duration::from_millis(100),
            default_ttl: Duration::from_millis(10_000),
        }
    }
}

impl LockConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            lock_prefix: std::env::var("LOCK_PREFIX").unwrap_or_else(|_| "lock_".to_string()),
            sleep_time: Duration::from_millis(
                std::env::var("LOCK_SLEEP_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(100),
            ),
            default_ttl: Duration::from_millis(
                std::env::var("LOCK_DEFAULT_TTL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10_000),
            ),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sleep_time.is_zero() {
            return Err(CoordError::InvalidArgument(
                "sleep_time must be greater than 0".to_string(),
            ));
        }
        validate_ttl(self.default_ttl)
    }
}

/// Distributed mutual-exclusion lock.
///
/// Waiters are not queued: whichever attempt reaches the store first after the
/// key becomes absent wins, so starvation under contention is possible.
pub struct DistributedLock {
    store: Arc<dyn StoreGateway>,
    config: LockConfig,
    unlock_script: AtomicScript,
}

impl DistributedLock {
    pub fn builder(store: Arc<dyn StoreGateway>) -> LockBuilder {
        LockBuilder {
            store,
            config: LockConfig::default(),
        }
    }

    pub fn new(
        store: Arc<dyn StoreGateway>,
        config: LockConfig,
        scripts: &dyn ScriptProvider,
    ) -> Result<Self> {
        Self::builder(store).config(config).build(scripts)
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Single non-blocking attempt with the default expiry.
    pub async fn try_lock(&self, key: &str, token: &str) -> Result<bool> {
        self.try_lock_with_ttl(key, token, self.config.default_ttl)
            .await
    }

    /// Single non-blocking attempt with a caller-chosen expiry.
    pub async fn try_lock_with_ttl(&self, key: &str, token: &str, ttl: Duration) -> Result<bool> {
        validate_ttl(ttl)?;
        validate_key_token(key, token)?;
        self.attempt(&self.lock_key(key), token, ttl).await
    }

    /// Wait until the lock is acquired.
    ///
    /// The only way to stop waiting is to drop the future; use
    /// [`lock_cancellable`](Self::lock_cancellable) to get a `Cancelled` error
    /// instead.
    pub async fn lock(&self, key: &str, token: &str) -> Result<()> {
        self.lock_cancellable(key, token, &CancellationToken::new())
            .await
    }

    /// Wait until the lock is acquired or `cancel` fires.
    pub async fn lock_cancellable(
        &self,
        key: &str,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        validate_key_token(key, token)?;
        let lock_key = self.lock_key(key);

        loop {
            if cancel.is_cancelled() {
                return Err(CoordError::Cancelled);
            }
            if self
                .attempt(&lock_key, token, self.config.default_ttl)
                .await?
            {
                return Ok(());
            }
            self.pause(cancel).await?;
        }
    }

    /// Wait at most `block_time` for the lock. Returns `Ok(false)` once the
    /// budget is spent without acquiring.
    pub async fn lock_timeout(&self, key: &str, token: &str, block_time: Duration) -> Result<bool> {
        self.lock_timeout_cancellable(key, token, block_time, &CancellationToken::new())
            .await
    }

    /// Bounded wait that also honors `cancel`.
    ///
    /// Each failed attempt spends `sleep_time` of the budget. An attempt is
    /// still made when the remaining budget is exactly zero.
    pub async fn lock_timeout_cancellable(
        &self,
        key: &str,
        token: &str,
        block_time: Duration,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        validate_key_token(key, token)?;
        let lock_key = self.lock_key(key);
        let mut remaining = block_time;

        loop {
            if cancel.is_cancelled() {
                return Err(CoordError::Cancelled);
            }
            if self
                .attempt(&lock_key, token, self.config.default_ttl)
                .await?
            {
                return Ok(true);
            }
            remaining = match remaining.checked_sub(self.config.sleep_time) {
                Some(left) => left,
                None => {
                    tracing::debug!(key = %lock_key, ?block_time, "Lock wait budget exhausted");
                    return Ok(false);
                }
            };
            self.pause(cancel).await?;
        }
    }

    /// Release the lock if it is still held with `token`.
    ///
    /// Returns `Ok(false)` when the lock is absent or owned by someone else;
    /// nothing is deleted in that case.
    pub async fn unlock(&self, key: &str, token: &str) -> Result<bool> {
        validate_key_token(key, token)?;
        let lock_key = self.lock_key(key);

        let reply = self
            .store
            .run_script(
                &self.unlock_script,
                slice::from_ref(&lock_key),
                &[token.to_string()],
            )
            .await?;

        let released = reply.as_int() == Some(UNLOCKED);
        if released {
            tracing::debug!(key = %lock_key, "Lock released");
        } else {
            tracing::warn!(key = %lock_key, "Unlock skipped: lock absent or held by another token");
        }
        Ok(released)
    }

    fn lock_key(&self, key: &str) -> String {
        format!("{}{}", self.config.lock_prefix, key)
    }

    async fn attempt(&self, lock_key: &str, token: &str, ttl: Duration) -> Result<bool> {
        let acquired = self
            .store
            .set_if_absent_with_expiry(lock_key, token, ttl)
            .await?;
        tracing::debug!(key = %lock_key, acquired, "Lock attempt");
        Ok(acquired)
    }

    async fn pause(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CoordError::Cancelled),
            _ = tokio::time::sleep(self.config.sleep_time) => Ok(()),
        }
    }
}

/// Builder for [`DistributedLock`]. Validation happens in [`build`](Self::build).
pub struct LockBuilder {
    store: Arc<dyn StoreGateway>,
    config: LockConfig,
}

impl LockBuilder {
    pub fn config(mut self, config: LockConfig) -> Self {
        self.config = config;
        self
    }

    pub fn lock_prefix(mut self, lock_prefix: impl Into<String>) -> Self {
        self.config.lock_prefix = lock_prefix.into();
        self
    }

    pub fn sleep_time(mut self, sleep_time: Duration) -> Self {
        self.config.sleep_time = sleep_time;
        self
    }

    pub fn default_ttl(mut self, default_ttl: Duration) -> Self {
        self.config.default_ttl = default_ttl;
        self
    }

    pub fn build(self, scripts: &dyn ScriptProvider) -> Result<DistributedLock> {
        self.config.validate()?;
        let unlock_script = AtomicScript::load(scripts, ScriptId::Unlock)?;

        Ok(DistributedLock {
            store: self.store,
            config: self.config,
            unlock_script,
        })
    }
}

fn validate_ttl(ttl: Duration) -> Result<()> {
    if ttl.is_zero() {
        return Err(CoordError::InvalidArgument(
            "ttl must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_key_token(key: &str, token: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CoordError::InvalidArgument(
            "lock key cannot be empty".to_string(),
        ));
    }
    if token.is_empty() {
        return Err(CoordError::InvalidArgument(
            "lock token cannot be empty".to_string(),
        ));
    }
    Ok(())
}
