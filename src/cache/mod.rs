//! Typed Caches and Decorators
//!
//! Every cache implements [`CacheInterface`] so decorators compose freely:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  MetricCache ─── records leaf codecs to a MetricsRecorder │
//! │      │                                                    │
//! │  LoadableCache ─── loader on miss, queued write-back      │
//! │      │                                                    │
//! │  ChainCache ─── tiers in order, queued back-fill          │
//! │      │             │                                      │
//! │  TypedCache    TypedCache ─── key derivation + narrowing  │
//! │      │             │                                      │
//! │  StatsCodec    StatsCodec ─── per-outcome counters        │
//! │      │             │                                      │
//! │  MemoryStore   RedisStore                                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use cache_facade::cache::{CacheInterface, CacheRef, ChainCache, LoadableCache, TypedCache};
//! use cache_facade::store::{MemoryStore, RedisStore};
//! use std::sync::Arc;
//!
//! let redis = RedisStore::connect("redis://127.0.0.1:6379", Default::default()).await?;
//! let l1: CacheRef<str, String> = Arc::new(TypedCache::from_store(MemoryStore::new()));
//! let l2: CacheRef<str, String> = Arc::new(TypedCache::from_store(redis));
//! let chain: CacheRef<str, String> = Arc::new(ChainCache::new(vec![l1, l2]));
//!
//! let cache = LoadableCache::new(
//!     |key: &str| {
//!         let key = key.to_owned();
//!         async move { Ok(format!("loaded {key}")) }
//!     },
//!     chain,
//! );
//!
//! let value = cache.get("my-key").await?;
//! cache.close().await;
//! ```

mod chain;
mod key;
mod loadable;
mod metric;
mod typed;

pub use chain::{ChainCache, ChainConfig};
pub use key::{checksum, HashedKey, ToCacheKey};
pub use loadable::{LoadableCache, LoadableConfig};
pub use metric::MetricCache;
pub use typed::TypedCache;

use crate::codec::StatsCodec;
use crate::error::Result;
use crate::store::{InvalidateOptions, SetOptions};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

// =============================================================================
// Type Discriminators
// =============================================================================

pub const CACHE_TYPE: &str = "cache";
pub const CHAIN_TYPE: &str = "chain";
pub const LOADABLE_TYPE: &str = "loadable";
pub const METRIC_TYPE: &str = "metric";

// =============================================================================
// Cache Trait
// =============================================================================

/// Shape of a cache as seen by code that walks a decorator stack
pub enum CacheNode<'a, K: ?Sized, T> {
    /// Wraps exactly one stats codec
    Leaf(&'a Arc<StatsCodec>),
    /// Ordered tiers
    Chain(&'a [CacheRef<K, T>]),
    /// Nothing to inspect
    Opaque,
}

impl<K: ?Sized, T> fmt::Debug for CacheNode<'_, K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheNode::Leaf(codec) => f.debug_tuple("Leaf").field(&codec.store_type()).finish(),
            CacheNode::Chain(tiers) => f.debug_tuple("Chain").field(&tiers.len()).finish(),
            CacheNode::Opaque => f.write_str("Opaque"),
        }
    }
}

/// Common contract of typed caches and their decorators
#[async_trait]
pub trait CacheInterface<K: ?Sized, T>: Send + Sync {
    async fn get(&self, key: &K) -> Result<T>;

    async fn set(&self, key: &K, value: T, options: SetOptions) -> Result<()>;

    async fn delete(&self, key: &K) -> Result<()>;

    async fn invalidate(&self, options: InvalidateOptions) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    /// Kind discriminator (`"cache"`, `"chain"`, ...)
    fn cache_type(&self) -> &'static str;

    fn node(&self) -> CacheNode<'_, K, T> {
        CacheNode::Opaque
    }
}

/// Shared handle to any cache
pub type CacheRef<K, T> = Arc<dyn CacheInterface<K, T>>;

// =============================================================================
// Loader
// =============================================================================

/// Source of truth consulted on a cache miss
#[async_trait]
pub trait Loader<K: ?Sized, T>: Send + Sync {
    async fn load(&self, key: &K) -> Result<T>;
}

#[async_trait]
impl<K, T, F, Fut> Loader<K, T> for F
where
    K: ?Sized + Sync + 'static,
    T: Send + 'static,
    F: Fn(&K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    async fn load(&self, key: &K) -> Result<T> {
        (self)(key).await
    }
}
