//! Script providers - embedded Lua sources and on-disk overrides.

use std::path::PathBuf;

use coord_core::ports::{ScriptId, ScriptProvider};

const LIMIT_SCRIPT: &str = include_str!("../scripts/limit.lua");
const UNLOCK_SCRIPT: &str = include_str!("../scripts/lock.lua");

/// Scripts compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedScripts;

impl ScriptProvider for EmbeddedScripts {
    fn script(&self, id: ScriptId) -> Option<String> {
        let source = match id {
            ScriptId::RateLimit => LIMIT_SCRIPT,
            ScriptId::Unlock => UNLOCK_SCRIPT,
        };
        Some(source.to_string())
    }
}

/// Scripts read from a directory, one file per script
/// (`limit.lua`, `lock.lua`).
#[derive(Debug, Clone)]
pub struct DirectoryScripts {
    dir: PathBuf,
}

impl DirectoryScripts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory from `SCRIPTS_DIR`, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var("SCRIPTS_DIR").ok().map(Self::new)
    }
}

impl ScriptProvider for DirectoryScripts {
    fn script(&self, id: ScriptId) -> Option<String> {
        let path = self.dir.join(id.file_name());
        match std::fs::read_to_string(&path) {
            Ok(source) => Some(source),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read script");
                None
            }
        }
    }
}
