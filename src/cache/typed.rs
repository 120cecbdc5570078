//! Typed Cache
//!
//! Bridges a typed `(K, T)` view onto a stats codec: keys are derived with
//! [`ToCacheKey`], stored values are narrowed back to `T`.

use super::{CacheInterface, CacheNode, ToCacheKey, CACHE_TYPE};
use crate::codec::StatsCodec;
use crate::error::{Error, Result};
use crate::store::{InvalidateOptions, SetOptions, Store, StoreRef, Value};
use async_trait::async_trait;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Cache over a single store
pub struct TypedCache<K: ?Sized, T> {
    codec: Arc<StatsCodec>,
    _marker: PhantomData<fn(&K) -> T>,
}

impl<K: ?Sized, T> TypedCache<K, T> {
    pub fn new(store: StoreRef) -> Self {
        Self::with_codec(Arc::new(StatsCodec::new(store)))
    }

    pub fn from_store<S: Store + 'static>(store: S) -> Self {
        Self::new(Arc::new(store))
    }

    /// Build on an existing codec, sharing its counters
    pub fn with_codec(codec: Arc<StatsCodec>) -> Self {
        Self {
            codec,
            _marker: PhantomData,
        }
    }

    pub fn codec(&self) -> &Arc<StatsCodec> {
        &self.codec
    }
}

fn narrow<T: Any + Clone>(value: Value) -> Result<T> {
    value.narrow::<T>().ok_or(Error::TypeMismatch {
        expected: std::any::type_name::<T>(),
    })
}

impl<K, T> TypedCache<K, T>
where
    K: ?Sized + ToCacheKey,
    T: Any + Clone + Send + Sync,
{
    /// Store key derived for `key`
    pub fn cache_key(&self, key: &K) -> Result<String> {
        key.to_cache_key()
    }

    /// Get a value together with its remaining TTL
    pub async fn get_with_ttl(&self, key: &K) -> Result<(T, Duration)> {
        let (value, ttl) = self.codec.get_with_ttl(&key.to_cache_key()?).await?;
        Ok((narrow(value)?, ttl))
    }
}

#[async_trait]
impl<K, T> CacheInterface<K, T> for TypedCache<K, T>
where
    K: ?Sized + ToCacheKey + Sync + 'static,
    T: Any + Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<T> {
        let value = self.codec.get(&key.to_cache_key()?).await?;
        narrow(value)
    }

    async fn set(&self, key: &K, value: T, options: SetOptions) -> Result<()> {
        self.codec
            .set(&key.to_cache_key()?, Value::from_typed(value), &options)
            .await
    }

    async fn delete(&self, key: &K) -> Result<()> {
        self.codec.delete(&key.to_cache_key()?).await
    }

    async fn invalidate(&self, options: InvalidateOptions) -> Result<()> {
        self.codec.invalidate(&options).await
    }

    async fn clear(&self) -> Result<()> {
        self.codec.clear().await
    }

    fn cache_type(&self) -> &'static str {
        CACHE_TYPE
    }

    fn node(&self) -> CacheNode<'_, K, T> {
        CacheNode::Leaf(&self.codec)
    }
}
