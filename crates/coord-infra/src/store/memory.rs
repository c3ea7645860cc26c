//! In-memory store gateway - single-process stand-in for the shared store.
//!
//! Used for tests and local development. A single async mutex serialises
//! every operation, which gives the same atomicity the shared store gives
//! scripts and conditional sets. Note: state is per-process and lost on
//! restart, so it coordinates nothing across processes.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use coord_core::ports::{AtomicScript, ScriptId, ScriptOutput, StoreGateway};
use coord_core::{CoordError, Result};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// In-memory store gateway.
///
/// Scripts are not interpreted: the two known scripts are executed natively,
/// selected by their [`ScriptId`].
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Current value of `key`, if present and not expired.
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().await;
        live(&mut entries, key, Instant::now()).map(|entry| entry.value.clone())
    }

    fn rate_limit(
        entries: &mut HashMap<String, Entry>,
        now: Instant,
        keys: &[String],
        args: &[String],
    ) -> Result<ScriptOutput> {
        let key = keys
            .first()
            .ok_or_else(|| CoordError::Script("rate limit script expects one key".to_string()))?;
        let limit: i64 = args
            .first()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| CoordError::Script("rate limit script expects a limit".to_string()))?;
        let window_secs: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);

        let current = match live(entries, key, now) {
            Some(entry) => {
                let count: i64 = entry.value.parse().map_err(|_| {
                    CoordError::Script("value is not an integer or out of range".to_string())
                })?;
                entry.value = (count + 1).to_string();
                count + 1
            }
            None => {
                insert(
                    entries,
                    now,
                    key.clone(),
                    "1".to_string(),
                    Duration::from_secs(window_secs),
                );
                1
            }
        };

        if current > limit {
            Ok(ScriptOutput::Int(0))
        } else {
            Ok(ScriptOutput::Int(current))
        }
    }

    fn unlock(
        entries: &mut HashMap<String, Entry>,
        now: Instant,
        keys: &[String],
        args: &[String],
    ) -> Result<ScriptOutput> {
        let (Some(key), Some(token)) = (keys.first(), args.first()) else {
            return Err(CoordError::Script(
                "unlock script expects one key and one token".to_string(),
            ));
        };

        let owned = live(entries, key, now).is_some_and(|entry| entry.value == *token);
        if owned {
            entries.remove(key);
            Ok(ScriptOutput::Int(1))
        } else {
            Ok(ScriptOutput::Int(0))
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry for `key` if still alive; an expired entry is dropped.
fn live<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

/// Insert a fresh entry, dropping every expired one first.
///
/// A ttl too large to represent as an instant never expires.
fn insert(
    entries: &mut HashMap<String, Entry>,
    now: Instant,
    key: String,
    value: String,
    ttl: Duration,
) {
    entries.retain(|_, entry| !entry.is_expired(now));
    entries.insert(
        key,
        Entry {
            value,
            expires_at: now.checked_add(ttl),
        },
    );
}

#[async_trait]
impl StoreGateway for InMemoryStore {
    async fn run_script(
        &self,
        script: &AtomicScript,
        keys: &[String],
        args: &[String],
    ) -> Result<ScriptOutput> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        match script.id() {
            ScriptId::RateLimit => Self::rate_limit(&mut entries, now, keys, args),
            ScriptId::Unlock => Self::unlock(&mut entries, now, keys, args),
        }
    }

    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        if live(&mut entries, key, now).is_some() {
            return Ok(false);
        }

        insert(&mut entries, now, key.to_string(), value.to_string(), ttl);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(id: ScriptId) -> AtomicScript {
        AtomicScript::new(id, "-- native")
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_if_absent_respects_expiry() {
        let store = InMemoryStore::new();
        let ttl = Duration::from_millis(100);

        assert!(store.set_if_absent_with_expiry("k", "a", ttl).await.unwrap());
        assert!(!store.set_if_absent_with_expiry("k", "b", ttl).await.unwrap());
        assert_eq!(store.get("k").await, Some("a".to_string()));

        tokio::time::sleep(ttl).await;
        assert_eq!(store.get("k").await, None);
        assert!(store.set_if_absent_with_expiry("k", "b", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_unlock_only_with_matching_token() {
        let store = InMemoryStore::new();
        let unlock = script(ScriptId::Unlock);
        store
            .set_if_absent_with_expiry("k", "a", Duration::from_secs(10))
            .await
            .unwrap();

        let keys = ["k".to_string()];
        let wrong = store.run_script(&unlock, &keys, &["b".to_string()]).await;
        assert_eq!(wrong.unwrap(), ScriptOutput::Int(0));
        assert_eq!(store.get("k").await, Some("a".to_string()));

        let right = store.run_script(&unlock, &keys, &["a".to_string()]).await;
        assert_eq!(right.unwrap(), ScriptOutput::Int(1));
        assert_eq!(store.get("k").await, None);

        let again = store.run_script(&unlock, &keys, &["a".to_string()]).await;
        assert_eq!(again.unwrap(), ScriptOutput::Int(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_counts_and_expires() {
        let store = InMemoryStore::new();
        let limit = script(ScriptId::RateLimit);
        let keys = ["w".to_string()];
        let args = ["2".to_string(), "1".to_string()];

        let replies = [
            store.run_script(&limit, &keys, &args).await.unwrap(),
            store.run_script(&limit, &keys, &args).await.unwrap(),
            store.run_script(&limit, &keys, &args).await.unwrap(),
        ];
        assert_eq!(
            replies,
            [ScriptOutput::Int(1), ScriptOutput::Int(2), ScriptOutput::Int(0)]
        );
        assert_eq!(store.get("w").await, Some("3".to_string()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        let next = store.run_script(&limit, &keys, &args).await.unwrap();
        assert_eq!(next, ScriptOutput::Int(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_never_expires() {
        let store = InMemoryStore::new();

        assert!(
            store
                .set_if_absent_with_expiry("k", "a", Duration::from_secs(u64::MAX))
                .await
                .unwrap()
        );
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(store.get("k").await, Some("a".to_string()));

        let limit = script(ScriptId::RateLimit);
        let args = ["5".to_string(), u64::MAX.to_string()];
        let reply = store.run_script(&limit, &["w".to_string()], &args).await;
        assert_eq!(reply.unwrap(), ScriptOutput::Int(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_windows_are_swept() {
        let store = InMemoryStore::new();
        let limit = script(ScriptId::RateLimit);
        let args = ["5".to_string(), "1".to_string()];

        for window in 0..1000 {
            let keys = [format!("w{window}")];
            store.run_script(&limit, &keys, &args).await.unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        assert!(store.entries.lock().await.len() <= 1);
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_malformed_call() {
        let store = InMemoryStore::new();
        let limit = script(ScriptId::RateLimit);

        let no_key = store.run_script(&limit, &[], &["2".to_string()]).await;
        assert!(matches!(no_key, Err(CoordError::Script(_))));

        let no_limit = store.run_script(&limit, &["w".to_string()], &[]).await;
        assert!(matches!(no_limit, Err(CoordError::Script(_))));
    }
}
