//! Error taxonomy shared by the primitives and the store gateways.

use thiserror::Error;

use crate::ports::ScriptId;

/// Coordination errors.
///
/// Every failure is surfaced to the caller; the primitives never translate a
/// store failure into "admitted" or "lock acquired".
#[derive(Debug, Error)]
pub enum CoordError {
    #[error("Store connectivity failed: {0}")]
    Connectivity(String),

    #[error("Script execution failed: {0}")]
    Script(String),

    #[error("Store command failed: {0}")]
    Command(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Lock acquisition cancelled")]
    Cancelled,

    #[error("Script not found: {0}")]
    ScriptNotFound(ScriptId),
}

pub type Result<T> = std::result::Result<T, CoordError>;
