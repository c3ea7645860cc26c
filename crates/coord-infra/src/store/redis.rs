//! Single-node Redis gateway.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionLike, ConnectionManager};
use redis::{Client, RedisError, RedisResult, Script, Value};

use coord_core::ports::{AtomicScript, ScriptOutput, StoreGateway};
use coord_core::{CoordError, Result};

use super::RedisConfig;

/// Redis-backed store gateway for a single node.
///
/// Uses connection manager for automatic reconnection; every call works on
/// its own clone of the manager, dropped before the call returns.
pub struct RedisGateway {
    conn: ConnectionManager,
    config: RedisConfig,
}

impl RedisGateway {
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| CoordError::Connectivity(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn_manager_fut = ConnectionManager::new(client);
        let conn = tokio::time::timeout(config.connect_timeout, conn_manager_fut)
            .await
            .map_err(|_| CoordError::Connectivity("Connection timed out".to_string()))?
            .map_err(|e| CoordError::Connectivity(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis store");

        Ok(Self { conn, config })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self> {
        Self::new(RedisConfig::from_env()).await
    }
}

#[async_trait]
impl StoreGateway for RedisGateway {
    async fn run_script(
        &self,
        script: &AtomicScript,
        keys: &[String],
        args: &[String],
    ) -> Result<ScriptOutput> {
        let mut conn = self.conn.clone();

        // EVALSHA, loading the script on NOSCRIPT
        let redis_script = Script::new(script.source());
        let mut invocation = redis_script.prepare_invoke();
        for key in keys {
            invocation.key(key);
        }
        for arg in args {
            invocation.arg(arg);
        }

        let value: Value = bounded(self.config.response_timeout, invocation.invoke_async(&mut conn))
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

/// `SET key value NX PX ttl` on any connection.
pub(super) async fn set_nx_px<C>(
    conn: &mut C,
    key: &str,
    value: &str,
    ttl: Duration,
    timeout: Duration,
) -> Result<bool>
where
    C: ConnectionLike + Send,
{
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value).arg("NX").arg("PX").arg(ttl_ms);

    let reply: Value = bounded(timeout, cmd.query_async(conn))
        .await?
        .map_err(|e| classify(e, CoordError::Command))?;

    Ok(match reply {
        Value::Okay => true,
        Value::SimpleString(s) => s == "OK",
        _ => false,
    })
}

/// Bound one round trip by `timeout`; elapsing counts as lost connectivity.
pub(super) async fn bounded<T>(
    timeout: Duration,
    fut: impl Future<Output = RedisResult<T>>,
) -> Result<RedisResult<T>> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| CoordError::Connectivity("Store call timed out".to_string()))
}

/// Split transport failures from rejections by the server.
pub(super) fn classify(error: RedisError, rejected: fn(String) -> CoordError) -> CoordError {
    if error.is_io_error()
        || error.is_connection_refusal()
        || error.is_connection_dropped()
        || error.is_timeout()
        || error.is_unrecoverable_error()
    {
        CoordError::Connectivity(error.to_string())
    } else {
        rejected(error.to_string())
    }
}

pub(super) fn script_output(value: Value) -> Result<ScriptOutput> {
    match value {
        Value::Int(n) => Ok(ScriptOutput::Int(n)),
        Value::Nil => Ok(ScriptOutput::Nil),
        Value::Okay => Ok(ScriptOutput::Text("OK".to_string())),
        Value::SimpleString(s) => Ok(ScriptOutput::Text(s)),
        Value::BulkString(bytes) => Ok(ScriptOutput::Text(
            String::from_utf8_lossy(&bytes).into_owned(),
        )),
        other => Err(CoordError::Script(format!(
            "unexpected script reply: {other:?}"
        ))),
    }
}
