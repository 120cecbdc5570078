//! Marshaler
//!
//! Stores structured values as serialized bytes on top of any byte-capable
//! cache. MessagePack is the default encoding.

use crate::cache::CacheRef;
use crate::error::Result;
use crate::store::{InvalidateOptions, SetOptions, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

// =============================================================================
// Serializers
// =============================================================================

/// Encoding used to turn values into stored bytes
pub trait Serializer: Send + Sync {
    fn encode<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>>;

    fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<V>;
}

/// MessagePack with named struct fields
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackSerializer;

impl Serializer for MsgPackSerializer {
    fn encode<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<V> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn encode<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<V> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// =============================================================================
// Marshaler
// =============================================================================

/// Serializing front end of a [`Value`] cache
pub struct Marshaler<K: ?Sized, S = MsgPackSerializer> {
    cache: CacheRef<K, Value>,
    serializer: S,
}

impl<K: ?Sized + Sync> Marshaler<K, MsgPackSerializer> {
    pub fn new(cache: CacheRef<K, Value>) -> Self {
        Self::with_serializer(cache, MsgPackSerializer)
    }
}

impl<K: ?Sized + Sync, S: Serializer> Marshaler<K, S> {
    pub fn with_serializer(cache: CacheRef<K, Value>, serializer: S) -> Self {
        Self { cache, serializer }
    }

    pub fn cache(&self) -> &CacheRef<K, Value> {
        &self.cache
    }

    /// Fetch and decode the value under `key`
    ///
    /// When the stored value is neither bytes nor a string, `target` is
    /// returned untouched.
    pub async fn get<R: DeserializeOwned>(&self, key: &K, target: R) -> Result<R> {
        let stored = self.cache.get(key).await?;
        match stored.as_payload() {
            Some(bytes) => self.serializer.decode(bytes),
            None => {
                debug!(kind = stored.kind(), "Stored value is not a payload, nothing to decode");
                Ok(target)
            }
        }
    }

    /// Encode `value` and store the bytes
    pub async fn set<V: Serialize + ?Sized>(
        &self,
        key: &K,
        value: &V,
        options: SetOptions,
    ) -> Result<()> {
        let bytes = self.serializer.encode(value)?;
        self.cache.set(key, Value::from(bytes), options).await
    }

    pub async fn delete(&self, key: &K) -> Result<()> {
        self.cache.delete(key).await
    }

    pub async fn invalidate(&self, options: InvalidateOptions) -> Result<()> {
        self.cache.invalidate(options).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.cache.clear().await
    }
}
