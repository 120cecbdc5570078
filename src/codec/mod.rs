//! Stats Codec
//!
//! Wraps one store 1:1, forwards every operation and counts its outcome.
//! The codec is the unit metrics are recorded against.

mod stats;

pub use stats::{Stats, StatsSnapshot};

use crate::error::Result;
use crate::store::{InvalidateOptions, SetOptions, Store, StoreRef, Value};
use std::sync::Arc;
use std::time::Duration;

/// Store wrapper that tracks per-outcome statistics
pub struct StatsCodec {
    store: StoreRef,
    stats: Stats,
}

impl StatsCodec {
    /// Wrap a store
    pub fn new(store: StoreRef) -> Self {
        Self {
            store,
            stats: Stats::new(),
        }
    }

    /// Wrap a concrete store
    pub fn from_store<S: Store + 'static>(store: S) -> Self {
        Self::new(Arc::new(store))
    }

    pub async fn get(&self, key: &str) -> Result<Value> {
        let result = self.store.get(key).await;
        self.stats.record_get(result.is_ok());
        result
    }

    pub async fn get_with_ttl(&self, key: &str) -> Result<(Value, Duration)> {
        let result = self.store.get_with_ttl(key).await;
        self.stats.record_get(result.is_ok());
        result
    }

    pub async fn set(&self, key: &str, value: Value, options: &SetOptions) -> Result<()> {
        let result = self.store.set(key, value, options).await;
        self.stats.record_set(result.is_ok());
        result
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let result = self.store.delete(key).await;
        self.stats.record_delete(result.is_ok());
        result
    }

    pub async fn invalidate(&self, options: &InvalidateOptions) -> Result<()> {
        let result = self.store.invalidate(options).await;
        self.stats.record_invalidate(result.is_ok());
        result
    }

    pub async fn clear(&self) -> Result<()> {
        let result = self.store.clear().await;
        self.stats.record_clear(result.is_ok());
        result
    }

    /// Current counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The wrapped store
    pub fn store(&self) -> &StoreRef {
        &self.store
    }

    /// Type name of the wrapped store
    pub fn store_type(&self) -> &str {
        self.store.store_type()
    }
}

impl std::fmt::Debug for StatsCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsCodec")
            .field("store", &self.store.store_type())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
