//! Loadable Cache
//!
//! On a miss the loader is consulted and the loaded value returned right away;
//! writing it back into the wrapped cache happens on a background worker.

use super::{CacheInterface, CacheNode, CacheRef, Loader, LOADABLE_TYPE};
use crate::error::Result;
use crate::queue::{WriteBackQueue, DEFAULT_QUEUE_CAPACITY};
use crate::store::{InvalidateOptions, SetOptions};
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::sync::Arc;
use tracing::debug;

/// Loadable cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadableConfig {
    /// Pending write-backs before loading callers wait
    pub queue_capacity: usize,
}

impl Default for LoadableConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

struct WriteBack<O, T> {
    key: O,
    value: T,
}

/// Read-through cache backed by a [`Loader`]
pub struct LoadableCache<K: ?Sized + ToOwned, T> {
    loader: Arc<dyn Loader<K, T>>,
    cache: CacheRef<K, T>,
    writes: WriteBackQueue<WriteBack<K::Owned, T>>,
}

impl<K, T> LoadableCache<K, T>
where
    K: ?Sized + ToOwned + Sync + 'static,
    K::Owned: Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Wrap `cache` with `loader`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<L: Loader<K, T> + 'static>(loader: L, cache: CacheRef<K, T>) -> Self {
        Self::with_config(loader, cache, LoadableConfig::default())
    }

    pub fn with_config<L: Loader<K, T> + 'static>(
        loader: L,
        cache: CacheRef<K, T>,
        config: LoadableConfig,
    ) -> Self {
        let target = cache.clone();
        let writes = WriteBackQueue::spawn(
            "loadable_write_back",
            config.queue_capacity,
            Box::new(move |job: WriteBack<K::Owned, T>| {
                let target = target.clone();
                async move {
                    let key: &K = job.key.borrow();
                    if let Err(e) = target.set(key, job.value, SetOptions::new()).await {
                        debug!(error = %e, "Write-back of loaded value failed");
                    }
                }
                .boxed()
            }),
        );

        Self {
            loader: Arc::new(loader),
            cache,
            writes,
        }
    }

    /// The wrapped cache
    pub fn cache(&self) -> &CacheRef<K, T> {
        &self.cache
    }

    /// Loaded values not yet written back
    pub fn pending_writes(&self) -> usize {
        self.writes.pending()
    }

    /// Stop accepting write-backs and wait until every queued one is written
    pub async fn close(&self) {
        self.writes.close().await;
    }
}

#[async_trait]
impl<K, T> CacheInterface<K, T> for LoadableCache<K, T>
where
    K: ?Sized + ToOwned + Sync + 'static,
    K::Owned: Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<T> {
        match self.cache.get(key).await {
            Ok(value) => return Ok(value),
            Err(e) => debug!(error = %e, "Cache miss, invoking loader"),
        }

        let value = self.loader.load(key).await?;

        let job = WriteBack {
            key: key.to_owned(),
            value: value.clone(),
        };
        if let Err(e) = self.writes.enqueue(job).await {
            debug!(error = %e, "Loaded value not written back");
        }

        Ok(value)
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
        LOADABLE_TYPE
    }

    fn node(&self) -> CacheNode<'_, K, T> {
        self.cache.node()
    }
}
