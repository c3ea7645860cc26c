use std::time::Duration;

use async_trait::async_trait;

use super::AtomicScript;
use crate::error::Result;

/// Store gateway trait - abstraction over single-node and clustered stores.
///
/// Each call obtains its own connection handle and releases it before
/// returning, on every exit path. Handles are never shared between calls.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Run `script` over exactly `keys`, atomically with respect to every other
    /// script execution and conditional set.
    async fn run_script(
        &self,
        script: &AtomicScript,
        keys: &[String],
        args: &[String],
    ) -> Result<ScriptOutput>;

    /// Create `key` holding `value` with a time-to-live, only if `key` is absent.
    /// Returns whether the key was created.
    async fn set_if_absent_with_expiry(&self, key: &str, value: &str, ttl: Duration)
    -> Result<bool>;
}

/// Scalar reply of an atomic script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutput {
    Int(i64),
    Text(String),
    Nil,
}

impl ScriptOutput {
    /// Integer value of the reply. Numeric text is accepted.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScriptOutput::Int(n) => Some(*n),
            ScriptOutput::Text(s) => s.trim().parse().ok(),
            ScriptOutput::Nil => None,
        }
    }
}
