use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock source used to derive rate window keys.
pub trait Clock: Send + Sync {
    /// Whole seconds since the Unix epoch.
    fn now_unix_secs(&self) -> u64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
