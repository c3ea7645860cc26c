use std::fmt;

use crate::error::{CoordError, Result};

/// Identifies one of the atomic scripts used by the primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptId {
    /// Increment a window counter and compare it against a limit.
    RateLimit,
    /// Delete a lock entry only if it still holds the caller's token.
    Unlock,
}

impl ScriptId {
    /// File name the script is conventionally stored under.
    pub fn file_name(&self) -> &'static str {
        match self {
            ScriptId::RateLimit => "limit.lua",
            ScriptId::Unlock => "lock.lua",
        }
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptId::RateLimit => f.write_str("rate-limit"),
            ScriptId::Unlock => f.write_str("unlock"),
        }
    }
}

/// Script provider trait - supplies the literal text of a script.
pub trait ScriptProvider: Send + Sync {
    /// Returns the script text, or `None` if it is unavailable.
    fn script(&self, id: ScriptId) -> Option<String>;
}

/// A script resolved from a provider, ready to hand to a store gateway.
#[derive(Debug, Clone)]
pub struct AtomicScript {
    id: ScriptId,
    source: String,
}

impl AtomicScript {
    pub fn new(id: ScriptId, source: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
        }
    }

    /// Resolve `id` from `provider`. Blank text counts as missing.
    pub fn load(provider: &dyn ScriptProvider, id: ScriptId) -> Result<Self> {
        provider
            .script(id)
            .filter(|source| !source.trim().is_empty())
            .map(|source| Self::new(id, source))
            .ok_or(CoordError::ScriptNotFound(id))
    }

    pub fn id(&self) -> ScriptId {
        self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}
