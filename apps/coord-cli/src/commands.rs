//! Subcommands - one per primitive operation.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use coord_core::ports::StoreGateway;
use coord_core::{CoordError, DistributedLock, RateLimiter};

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "coord-cli", version, about = "Distributed lock and rate limiter CLI")]
pub struct Cli {
    /// Use a process-local in-memory store instead of Redis
    #[arg(long, global = true)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run admission checks against the rate limiter
    Acquire {
        /// Sub-key with its own budget (e.g. a client id)
        #[arg(long)]
        key: Option<String>,
        /// Number of checks to run
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Single non-blocking lock attempt
    TryLock {
        key: String,
        token: String,
        /// Expiry in milliseconds instead of the configured default
        #[arg(long)]
        ttl_ms: Option<u64>,
    },
    /// Wait for a lock; Ctrl-C cancels the wait
    Lock {
        key: String,
        token: String,
        /// Give up after this many milliseconds
        #[arg(long)]
        block_ms: Option<u64>,
    },
    /// Release a lock held with TOKEN
    Unlock { key: String, token: String },
}

pub async fn run(
    command: Command,
    store: Arc<dyn StoreGateway>,
    config: &AppConfig,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let scripts = config.script_provider();

    match command {
        Command::Acquire { key, count } => {
            let limiter = RateLimiter::new(store, config.limiter.clone(), scripts.as_ref())?;
            for _ in 0..count {
                let admitted = match &key {
                    Some(key) => limiter.acquire_keyed(key).await?,
                    None => limiter.acquire().await?,
                };
                writeln!(out, "{}", if admitted { "admitted" } else { "limited" })?;
            }
        }
        Command::TryLock { key, token, ttl_ms } => {
            let lock = DistributedLock::new(store, config.lock.clone(), scripts.as_ref())?;
            let acquired = match ttl_ms {
                Some(ms) => {
                    lock.try_lock_with_ttl(&key, &token, Duration::from_millis(ms))
                        .await?
                }
                None => lock.try_lock(&key, &token).await?,
            };
            writeln!(out, "{}", if acquired { "locked" } else { "busy" })?;
        }
        Command::Lock {
            key,
            token,
            block_ms,
        } => {
            let lock = DistributedLock::new(store, config.lock.clone(), scripts.as_ref())?;
            let cancel = cancel_on_ctrl_c();

            let result = match block_ms {
                Some(ms) => {
                    lock.lock_timeout_cancellable(
                        &key,
                        &token,
                        Duration::from_millis(ms),
                        &cancel,
                    )
                    .await
                }
                None => lock.lock_cancellable(&key, &token, &cancel).await.map(|_| true),
            };

            match result {
                Ok(true) => writeln!(out, "locked")?,
                Ok(false) => writeln!(out, "timed out")?,
                Err(CoordError::Cancelled) => {
                    tracing::info!(key = %key, "Lock wait cancelled");
                    writeln!(out, "cancelled")?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Unlock { key, token } => {
            let lock = DistributedLock::new(store, config.lock.clone(), scripts.as_ref())?;
            let released = lock.unlock(&key, &token).await?;
            writeln!(out, "{}", if released { "released" } else { "not held" })?;
        }
    }

    Ok(())
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    cancel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lock_command() {
        let cli = Cli::parse_from(["coord-cli", "--memory", "lock", "res", "A", "--block-ms", "500"]);

        assert!(cli.memory);
        match cli.command {
            Command::Lock {
                key,
                token,
                block_ms,
            } => {
                assert_eq!(key, "res");
                assert_eq!(token, "A");
                assert_eq!(block_ms, Some(500));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_acquire_against_memory_store() {
        let config = AppConfig {
            limiter: coord_core::RateLimiterConfig {
                limit: 1,
                window_secs: 3600,
                ..Default::default()
            },
            ..AppConfig::from_env()
        };
        let store = config.store(true).await.unwrap();
        let mut out = Vec::new();

        run(
            Command::Acquire {
                key: Some("client-a".to_string()),
                count: 2,
            },
            store,
            &config,
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "admitted\nlimited\n");
    }

    #[tokio::test]
    async fn test_lock_commands_report_outcome() {
        let config = AppConfig::from_env();
        let store = config.store(true).await.unwrap();
        let mut out = Vec::new();

        let commands = [
            Command::TryLock {
                key: "res".to_string(),
                token: "A".to_string(),
                ttl_ms: None,
            },
            Command::TryLock {
                key: "res".to_string(),
                token: "B".to_string(),
                ttl_ms: Some(1000),
            },
            Command::Unlock {
                key: "res".to_string(),
                token: "B".to_string(),
            },
            Command::Unlock {
                key: "res".to_string(),
                token: "A".to_string(),
            },
        ];
        for command in commands {
            run(command, store.clone(), &config, &mut out).await.unwrap();
        }

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "locked\nbusy\nnot held\nreleased\n"
        );
    }
}
