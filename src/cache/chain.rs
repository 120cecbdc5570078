//! Chain Cache
//!
//! Reads walk the tiers in order and the first hit wins. A hit below the
//! first tier is copied back into every faster tier by a background worker.
//! Writes fan out to every tier and collect all failures.

use super::{CacheInterface, CacheNode, CacheRef, CHAIN_TYPE};
use crate::error::{ChainError, Error, Result};
use crate::queue::{WriteBackQueue, DEFAULT_QUEUE_CAPACITY};
use crate::store::{InvalidateOptions, SetOptions};
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::sync::Arc;
use tracing::debug;

/// Chain cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Pending back-fill jobs before new ones are dropped
    pub backfill_queue_capacity: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            backfill_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Copy of a value found at tier `found_at`, to be written into the tiers above it
struct BackFill<O, T> {
    key: O,
    value: T,
    found_at: usize,
}

/// Ordered composition of caches, fastest first
pub struct ChainCache<K: ?Sized + ToOwned, T> {
    caches: Arc<[CacheRef<K, T>]>,
    backfill: WriteBackQueue<BackFill<K::Owned, T>>,
}

/// Store type reported for a tier in aggregate errors
fn tier_name<K: ?Sized + Sync, T: Send>(cache: &CacheRef<K, T>) -> String {
    match cache.node() {
        CacheNode::Leaf(codec) => codec.store_type().to_owned(),
        _ => cache.cache_type().to_owned(),
    }
}

impl<K, T> ChainCache<K, T>
where
    K: ?Sized + ToOwned + Sync + 'static,
    K::Owned: Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Build a chain over `caches`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(caches: Vec<CacheRef<K, T>>) -> Self {
        Self::with_config(caches, ChainConfig::default())
    }

    pub fn with_config(caches: Vec<CacheRef<K, T>>, config: ChainConfig) -> Self {
        let caches: Arc<[CacheRef<K, T>]> = caches.into();

        let tiers = caches.clone();
        let backfill = WriteBackQueue::spawn(
            "chain_backfill",
            config.backfill_queue_capacity,
            Box::new(move |job: BackFill<K::Owned, T>| {
                let tiers = tiers.clone();
                async move {
                    let key: &K = job.key.borrow();
                    for cache in tiers.iter().take(job.found_at) {
                        let result = cache
                            .set(key, job.value.clone(), SetOptions::new())
                            .await;
                        if let Err(e) = result {
                            debug!(tier = %tier_name(cache), error = %e, "Back-fill failed");
                        }
                    }
                }
                .boxed()
            }),
        );

        Self { caches, backfill }
    }

    /// Tiers in lookup order
    pub fn caches(&self) -> &[CacheRef<K, T>] {
        &self.caches
    }

    /// Back-fill jobs not yet written
    pub fn pending_backfills(&self) -> usize {
        self.backfill.pending()
    }

    /// Back-fill jobs dropped because the queue was full
    pub fn dropped_backfills(&self) -> u64 {
        self.backfill.dropped()
    }

    /// Stop back-filling and wait for queued jobs to finish
    pub async fn close(&self) {
        self.backfill.close().await;
    }
}

#[async_trait]
impl<K, T> CacheInterface<K, T> for ChainCache<K, T>
where
    K: ?Sized + ToOwned + Sync + 'static,
    K::Owned: Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<T> {
        let mut last_error = Error::not_found("chain has no tiers");

        for (i, cache) in self.caches.iter().enumerate() {
            match cache.get(key).await {
                Ok(value) => {
                    if i > 0 {
                        self.backfill.try_enqueue(BackFill {
                            key: key.to_owned(),
                            value: value.clone(),
                            found_at: i,
                        });
                    }
                    return Ok(value);
                }
                Err(e) => last_error = e,
            }
        }

        Err(last_error)
    }

    async fn set(&self, key: &K, value: T, options: SetOptions) -> Result<()> {
        let mut errors = ChainError::new();
        for cache in self.caches.iter() {
            if let Err(e) = cache.set(key, value.clone(), options.clone()).await {
                errors.push(tier_name(cache), e);
            }
        }
        errors.into_result()
    }

    async fn delete(&self, key: &K) -> Result<()> {
        let mut errors = ChainError::new();
        for cache in self.caches.iter() {
            if let Err(e) = cache.delete(key).await {
                errors.push(tier_name(cache), e);
            }
        }
        errors.into_result()
    }

    async fn invalidate(&self, options: InvalidateOptions) -> Result<()> {
        let mut errors = ChainError::new();
        for cache in self.caches.iter() {
            if let Err(e) = cache.invalidate(options.clone()).await {
                errors.push(tier_name(cache), e);
            }
        }
        errors.into_result()
    }

    async fn clear(&self) -> Result<()> {
        let mut errors = ChainError::new();
        for cache in self.caches.iter() {
            if let Err(e) = cache.clear().await {
                errors.push(tier_name(cache), e);
            }
        }
        errors.into_result()
    }

    fn cache_type(&self) -> &'static str {
        CHAIN_TYPE
    }

    fn node(&self) -> CacheNode<'_, K, T> {
        CacheNode::Chain(&self.caches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TypedCache;
    use crate::store::{MemoryStore, Store, Value};
    use crate::testing::{eventually, Op, ScriptedStore};
    use assert_matches::assert_matches;

    fn tier(store: Arc<ScriptedStore>) -> CacheRef<str, String> {
        Arc::new(TypedCache::<str, String>::new(store))
    }

    async fn seed(store: &ScriptedStore, key: &str, value: &str) {
        store
            .set(key, Value::from(value), &SetOptions::new())
            .await
            .unwrap();
    }

    async fn holds(store: &ScriptedStore, key: &str) -> bool {
        store.get(key).await.is_ok()
    }

    #[tokio::test]
    async fn test_first_tier_hit_skips_backfill() {
        let (l1, l2) = (ScriptedStore::new("l1"), ScriptedStore::new("l2"));
        seed(&l1, "k", "v1").await;
        seed(&l2, "k", "v2").await;
        let chain = ChainCache::new(vec![tier(l1.clone()), tier(l2.clone())]);

        assert_eq!(chain.get("k").await.unwrap(), "v1");

        chain.close().await;
        assert_eq!(l2.calls(Op::Get), 0);
        assert_eq!(l1.calls(Op::Set), 1);
    }

    #[tokio::test]
    async fn test_lower_hit_backfills_faster_tiers() {
        let (l1, l2, l3) = (
            ScriptedStore::new("l1"),
            ScriptedStore::new("l2"),
            ScriptedStore::new("l3"),
        );
        seed(&l3, "k", "deep").await;
        let chain = ChainCache::new(vec![tier(l1.clone()), tier(l2.clone()), tier(l3.clone())]);

        assert_eq!(chain.get("k").await.unwrap(), "deep");

        assert!(eventually(|| async { holds(&l1, "k").await && holds(&l2, "k").await }).await);
        assert_eq!(chain.get("k").await.unwrap(), "deep");
        assert_eq!(l3.calls(Op::Get), 1);
        chain.close().await;
    }

    #[tokio::test]
    async fn test_backfill_only_targets_tiers_above_the_hit() {
        let (l1, l2, l3) = (
            ScriptedStore::new("l1"),
            ScriptedStore::new("l2"),
            ScriptedStore::new("l3"),
        );
        seed(&l2, "k", "mid").await;
        let chain = ChainCache::new(vec![tier(l1.clone()), tier(l2.clone()), tier(l3.clone())]);

        assert_eq!(chain.get("k").await.unwrap(), "mid");
        chain.close().await;

        assert!(holds(&l1, "k").await);
        assert_eq!(l2.calls(Op::Set), 1);
        assert_eq!(l3.calls(Op::Set), 0);
    }

    #[tokio::test]
    async fn test_backfill_failure_is_dropped() {
        let (l1, l2) = (ScriptedStore::new("l1"), ScriptedStore::new("l2"));
        l1.fail(Op::Set);
        seed(&l2, "k", "v").await;
        let chain = ChainCache::new(vec![tier(l1.clone()), tier(l2.clone())]);

        assert_eq!(chain.get("k").await.unwrap(), "v");
        chain.close().await;

        assert_eq!(l1.calls(Op::Set), 1);
        assert_eq!(chain.pending_backfills(), 0);
    }

    #[tokio::test]
    async fn test_full_backfill_queue_drops_jobs() {
        let (l1, l2) = (ScriptedStore::new("l1"), ScriptedStore::new("l2"));
        for key in ["k1", "k2", "k3"] {
            seed(&l2, key, key).await;
        }
        let chain = ChainCache::with_config(
            vec![tier(l1.clone()), tier(l2.clone())],
            ChainConfig {
                backfill_queue_capacity: 1,
            },
        );

        // the worker cannot run between these reads, so only the first job fits
        for key in ["k1", "k2", "k3"] {
            assert_eq!(chain.get(key).await.unwrap(), key);
        }
        assert_eq!(chain.dropped_backfills(), 2);

        chain.close().await;
        assert!(holds(&l1, "k1").await);
        assert!(!holds(&l1, "k2").await);
        assert!(!holds(&l1, "k3").await);

        // the back-filled key is now served by the first tier
        let l2_gets = l2.calls(Op::Get);
        assert_eq!(chain.get("k1").await.unwrap(), "k1");
        assert_eq!(l2.calls(Op::Get), l2_gets);
    }

    #[tokio::test]
    async fn test_all_miss_returns_last_error() {
        let (l1, l2) = (ScriptedStore::new("l1"), ScriptedStore::new("l2"));
        l2.fail(Op::Get);
        let chain = ChainCache::new(vec![tier(l1), tier(l2)]);

        let err = chain.get("k").await.unwrap_err();
        assert_matches!(err, Error::Backend { ref store, .. } if store == "l2");
    }

    #[tokio::test]
    async fn test_empty_chain_misses() {
        let chain = ChainCache::<str, String>::new(Vec::new());
        assert!(chain.get("k").await.unwrap_err().is_not_found());
        assert!(chain.set("k", "v".into(), SetOptions::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_set_fans_out_without_short_circuit() {
        let (l1, l2, l3) = (
            ScriptedStore::new("l1"),
            ScriptedStore::new("l2"),
            ScriptedStore::new("l3"),
        );
        l2.fail(Op::Set);
        let chain = ChainCache::new(vec![tier(l1.clone()), tier(l2.clone()), tier(l3.clone())]);

        let err = chain
            .set("k", "v".into(), SetOptions::new())
            .await
            .unwrap_err();

        assert!(holds(&l1, "k").await);
        assert!(holds(&l3, "k").await);
        assert_matches!(err, Error::Chain(ref chain_err) if chain_err.failures().len() == 1);
        assert!(err
            .to_string()
            .starts_with("error 1 of 1: l2 failure: Backend operation failed"));
    }

    #[tokio::test]
    async fn test_fan_out_aggregates_every_failure() {
        let (l1, l2) = (ScriptedStore::new("l1"), ScriptedStore::new("l2"));
        for op in [Op::Delete, Op::Invalidate, Op::Clear] {
            l1.fail(op);
            l2.fail(op);
        }
        let chain = ChainCache::new(vec![tier(l1.clone()), tier(l2.clone())]);

        let message = chain.delete("k").await.unwrap_err().to_string();
        assert!(message.starts_with("error 1 of 2: l1 failure:"));
        assert!(message.contains("error 2 of 2: l2 failure:"));

        assert!(chain.invalidate(InvalidateOptions::new()).await.is_err());
        assert!(chain.clear().await.is_err());
        assert_eq!(l2.calls(Op::Clear), 1);
    }

    #[tokio::test]
    async fn test_nested_tier_reports_cache_type() {
        let inner = ChainCache::new(vec![tier(ScriptedStore::new("inner"))]);
        let failing = ScriptedStore::new("outer");
        failing.fail(Op::Delete);
        let chain = ChainCache::new(vec![
            Arc::new(inner) as CacheRef<str, String>,
            tier(failing),
        ]);

        let message = chain.delete("k").await.unwrap_err().to_string();
        assert!(message.starts_with("error 1 of 1: outer failure:"));
        assert_eq!(tier_name(&chain.caches()[0]), "chain");
        assert_eq!(chain.cache_type(), "chain");
    }

    #[tokio::test]
    async fn test_delete_and_clear_reach_every_tier() {
        let memory = Arc::new(MemoryStore::new());
        let scripted = ScriptedStore::new("l2");
        let chain = ChainCache::new(vec![
            Arc::new(TypedCache::<str, String>::new(memory.clone())) as CacheRef<str, String>,
            tier(scripted.clone()),
        ]);

        chain.set("k", "v".into(), SetOptions::new()).await.unwrap();
        chain.delete("k").await.unwrap();

        assert!(memory.get("k").await.unwrap_err().is_not_found());
        assert!(!holds(&scripted, "k").await);
        chain.clear().await.unwrap();
        assert_eq!(scripted.calls(Op::Clear), 1);
    }
}
