//! Scripted store gateway for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::ports::{AtomicScript, Clock, ScriptId, ScriptOutput, ScriptProvider, StoreGateway};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Script {
        id: ScriptId,
        keys: Vec<String>,
        args: Vec<String>,
    },
    Set {
        key: String,
        value: String,
        ttl: Duration,
    },
}

/// Replays queued replies and records every call.
///
/// An empty script queue answers `Int(1)`; an empty set queue answers `false`.
#[derive(Default)]
pub(crate) struct FakeStore {
    script_replies: Mutex<VecDeque<Result<ScriptOutput>>>,
    set_replies: Mutex<VecDeque<Result<bool>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeStore {
    pub(crate) fn push_script(&self, reply: Result<ScriptOutput>) {
        self.script_replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn push_set(&self, reply: Result<bool>) {
        self.set_replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoreGateway for FakeStore {
    async fn run_script(
        &self,
        script: &AtomicScript,
        keys: &[String],
        args: &[String],
    ) -> Result<ScriptOutput> {
        self.calls.lock().unwrap().push(Call::Script {
            id: script.id(),
            keys: keys.to_vec(),
            args: args.to_vec(),
        });
        self.script_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(ScriptOutput::Int(1)))
    }

    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool> {
        self.calls.lock().unwrap().push(Call::Set {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        });
        self.set_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(false))
    }
}

pub(crate) struct TestScripts;

impl ScriptProvider for TestScripts {
    fn script(&self, id: ScriptId) -> Option<String> {
        Some(format!("-- {id}"))
    }
}

pub(crate) struct NoScripts;

impl ScriptProvider for NoScripts {
    fn script(&self, _id: ScriptId) -> Option<String> {
        None
    }
}

pub(crate) struct FixedClock(pub(crate) AtomicU64);

impl FixedClock {
    pub(crate) fn at(secs: u64) -> Self {
        Self(AtomicU64::new(secs))
    }
}

impl Clock for FixedClock {
    fn now_unix_secs(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
