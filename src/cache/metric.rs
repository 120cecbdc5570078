//! Metric Cache
//!
//! After every read, pushes the stats of each leaf codec reachable from the
//! wrapped cache to a [`MetricsRecorder`].

use super::{CacheInterface, CacheNode, CacheRef, METRIC_TYPE};
use crate::error::Result;
use crate::metrics::MetricsRecorder;
use crate::store::{InvalidateOptions, SetOptions};
use async_trait::async_trait;
use std::sync::Arc;

/// Cache decorator that records codec statistics on reads
pub struct MetricCache<K: ?Sized, T> {
    recorder: Arc<dyn MetricsRecorder>,
    cache: CacheRef<K, T>,
}

impl<K: ?Sized + Sync, T: Send> MetricCache<K, T> {
    pub fn new(recorder: Arc<dyn MetricsRecorder>, cache: CacheRef<K, T>) -> Self {
        Self { recorder, cache }
    }

    /// The wrapped cache
    pub fn cache(&self) -> &CacheRef<K, T> {
        &self.cache
    }

    fn record(&self, cache: &dyn CacheInterface<K, T>) {
        match cache.node() {
            CacheNode::Leaf(codec) => self.recorder.record_from_codec(codec),
            CacheNode::Chain(tiers) => {
                for tier in tiers {
                    self.record(tier.as_ref());
                }
            }
            CacheNode::Opaque => {}
        }
    }
}

#[async_trait]
impl<K, T> CacheInterface<K, T> for MetricCache<K, T>
where
    K: ?Sized + Sync + 'static,
    T: Send + 'static,
{
    async fn get(&self, key: &K) -> Result<T> {
        let result = self.cache.get(key).await;
        self.record(self.cache.as_ref());
        result
    }

    async fn set(&self, key: &K, value: T, options: SetOptions) -> Result<()> {
        self.cache.set(key, value, options).await
    }

    async fn delete(&self, key: &K) -> Result<()> {
        self.cache.delete(key).await
    }

    async fn invalidate(&self, options: InvalidateOptions) -> Result<()> {
        self.cache.invalidate(options).await
    }

    async fn clear(&self) -> Result<()> {
        self.cache.clear().await
    }

    fn cache_type(&self) -> &'static str {
        METRIC_TYPE
    }

    fn node(&self) -> CacheNode<'_, K, T> {
        self.cache.node()
    }
}
