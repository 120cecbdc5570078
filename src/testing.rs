//! Test doubles shared by unit tests

use crate::error::{Error, Result};
use crate::store::{InvalidateOptions, MemoryStore, SetOptions, Store, Value};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Store operations that can be scripted to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    Get,
    Set,
    Delete,
    Invalidate,
    Clear,
}

impl Op {
    fn name(self) -> &'static str {
        match self {
            Op::Get => "get",
            Op::Set => "set",
            Op::Delete => "delete",
            Op::Invalidate => "invalidate",
            Op::Clear => "clear",
        }
    }
}

/// Memory store with failure injection and call recording
pub(crate) struct ScriptedStore {
    name: &'static str,
    inner: MemoryStore,
    failing: Mutex<HashSet<Op>>,
    calls: Mutex<Vec<Op>>,
    set_delay: Mutex<Duration>,
}

impl ScriptedStore {
    pub(crate) fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            inner: MemoryStore::new(),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            set_delay: Mutex::new(Duration::ZERO),
        })
    }

    /// Make every later `set` take at least `delay`
    pub(crate) fn slow_sets(&self, delay: Duration) {
        *self.set_delay.lock() = delay;
    }

    /// Make every later `op` call fail
    pub(crate) fn fail(&self, op: Op) {
        self.failing.lock().insert(op);
    }

    /// Number of `op` calls received so far
    pub(crate) fn calls(&self, op: Op) -> usize {
        self.calls.lock().iter().filter(|c| **c == op).count()
    }

    fn enter(&self, op: Op) -> Result<()> {
        self.calls.lock().push(op);
        if self.failing.lock().contains(&op) {
            return Err(Error::backend(self.name, op.name(), "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for ScriptedStore {
    async fn get(&self, key: &str) -> Result<Value> {
        self.enter(Op::Get)?;
        self.inner.get(key).await
    }

    async fn get_with_ttl(&self, key: &str) -> Result<(Value, Duration)> {
        self.enter(Op::Get)?;
        self.inner.get_with_ttl(key).await
    }

    async fn set(&self, key: &str, value: Value, options: &SetOptions) -> Result<()> {
        self.enter(Op::Set)?;
        let delay = *self.set_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.inner.set(key, value, options).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.enter(Op::Delete)?;
        self.inner.delete(key).await
    }

    async fn invalidate(&self, options: &InvalidateOptions) -> Result<()> {
        self.enter(Op::Invalidate)?;
        self.inner.invalidate(options).await
    }

    async fn clear(&self) -> Result<()> {
        self.enter(Op::Clear)?;
        self.inner.clear().await
    }

    fn store_type(&self) -> &str {
        self.name
    }
}

/// Poll `check` until it holds or a second elapses
pub(crate) async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
