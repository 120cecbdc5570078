//! Store Contract
//!
//! The minimal capability set each backend adapter exposes. Everything above
//! this layer (codec, typed caches, decorators) is backend-agnostic.

mod memory;
mod options;
mod redis_store;
mod value;

pub use memory::{MemoryStore, MemoryStoreConfig, MEMORY_TYPE};
pub use options::{InvalidateOptions, Options, SetOptions};
pub use redis_store::{RedisStore, REDIS_TYPE};
pub use value::Value;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Tag Index Constants
// =============================================================================

/// Prefix of the store key holding a tag index
pub const TAG_KEY_PREFIX: &str = "gocache_tag_";

/// TTL of tag index entries, refreshed on every tag write: 720 hours
pub const TAG_KEY_EXPIRY: Duration = Duration::from_secs(720 * 60 * 60);

/// Attempts made to update a tag index without atomic set primitives
pub const TAG_UPDATE_RETRIES: usize = 3;

/// Store key of the index for `tag`
pub fn tag_key(tag: &str) -> String {
    format!("{}{}", TAG_KEY_PREFIX, tag)
}

// =============================================================================
// Store Trait (Port)
// =============================================================================

/// Contract every backend adapter satisfies
///
/// Tag indexing is backend-specific but must be idempotent per key, and
/// invalidating a tag removes every indexed key and then the index itself.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get the value stored under `key`
    async fn get(&self, key: &str) -> Result<Value>;

    /// Get the value and its remaining TTL (zero when it never expires)
    async fn get_with_ttl(&self, key: &str) -> Result<(Value, Duration)>;

    /// Store a value, merging `options` over the store defaults
    async fn set(&self, key: &str, value: Value, options: &SetOptions) -> Result<()>;

    /// Remove a key
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every key indexed under the given tags
    ///
    /// Best effort: a missing or unreadable tag index is not an error.
    async fn invalidate(&self, options: &InvalidateOptions) -> Result<()>;

    /// Remove all data
    async fn clear(&self) -> Result<()>;

    /// Type name of this store
    fn store_type(&self) -> &str;
}

/// Type alias for Arc'd Store
pub type StoreRef = Arc<dyn Store>;
