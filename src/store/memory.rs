//! In-Memory Store
//!
//! In-process store backed by DashMap for concurrent access. Entries carry an
//! optional deadline and a CAS token; tag indexes hold their member keys as an
//! in-process list updated through add / compare-and-swap with a bounded
//! retry budget.

use crate::error::{Error, Result};
use crate::store::{
    tag_key, InvalidateOptions, Options, SetOptions, Store, Value, TAG_KEY_EXPIRY,
    TAG_UPDATE_RETRIES,
};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Type name reported by [`MemoryStore`]
pub const MEMORY_TYPE: &str = "memory";

// =============================================================================
// Memory Store Configuration
// =============================================================================

/// Configuration for memory store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// Number of shards for DashMap (0 = auto, rounded up to a power of two)
    pub shard_count: usize,
    /// Options applied to every write unless overridden
    pub default_options: Options,
}

// =============================================================================
// Stored Entry
// =============================================================================

#[derive(Debug, Clone)]
struct StoredEntry {
    value: Value,
    expires_at: Option<Instant>,
    cas: u64,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }

    fn remaining(&self, now: Instant) -> Duration {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }
}

/// Member keys of a tag index entry, in insertion order
fn tag_members(index: &Value) -> Vec<String> {
    index.narrow::<Vec<String>>().unwrap_or_default()
}

fn deadline(expiration: Duration) -> Option<Instant> {
    if expiration.is_zero() {
        None
    } else {
        Some(Instant::now() + expiration)
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-process store backed by DashMap
pub struct MemoryStore {
    entries: DashMap<String, StoredEntry>,
    defaults: Options,
    next_cas: AtomicU64,
}

impl MemoryStore {
    /// Create new memory store with default config
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Create new memory store applying `defaults` to every write
    pub fn with_defaults(defaults: Options) -> Self {
        Self::with_config(MemoryStoreConfig {
            default_options: defaults,
            ..Default::default()
        })
    }

    /// Create new memory store with full config
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        let entries = if config.shard_count > 0 {
            DashMap::with_shard_amount(config.shard_count.next_power_of_two().max(2))
        } else {
            DashMap::new()
        };

        Self {
            entries,
            defaults: config.default_options,
            next_cas: AtomicU64::new(1),
        }
    }

    /// Default write options
    pub fn defaults(&self) -> &Options {
        &self.defaults
    }

    /// Number of live entries, tag indexes included
    pub fn entry_count(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    fn next_cas(&self) -> u64 {
        self.next_cas.fetch_add(1, Ordering::Relaxed)
    }

    /// Live entry for `key`, dropping it when expired
    fn lookup(&self, key: &str) -> Option<StoredEntry> {
        let now = Instant::now();
        let entry = self.entries.get(key).map(|r| r.value().clone())?;
        if entry.is_expired(now) {
            self.entries.remove_if(key, |_, e| e.is_expired(now));
            return None;
        }
        Some(entry)
    }

    fn put(&self, key: &str, value: Value, expiration: Duration) {
        let entry = StoredEntry {
            value,
            expires_at: deadline(expiration),
            cas: self.next_cas(),
        };
        self.entries.insert(key.to_owned(), entry);
    }

    /// Store only if no live entry exists
    fn add(&self, key: &str, value: Value, expiration: Duration) -> Result<()> {
        let now = Instant::now();
        let cas = self.next_cas();
        let fresh = StoredEntry {
            value,
            expires_at: deadline(expiration),
            cas,
        };
        match self.entries.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired(now) {
                    return Err(Error::CasConflict {
                        key: key.to_owned(),
                    });
                }
                occupied.insert(fresh);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
            }
        }
        Ok(())
    }

    /// Replace the entry only if its CAS token still matches
    fn compare_and_swap(
        &self,
        key: &str,
        value: Value,
        expected_cas: u64,
        expiration: Duration,
    ) -> Result<()> {
        let now = Instant::now();
        let cas = self.next_cas();
        match self.entries.get_mut(key) {
            Some(mut entry) if entry.cas == expected_cas && !entry.is_expired(now) => {
                *entry = StoredEntry {
                    value,
                    expires_at: deadline(expiration),
                    cas,
                };
                Ok(())
            }
            _ => Err(Error::CasConflict {
                key: key.to_owned(),
            }),
        }
    }

    fn touch(&self, key: &str, expiration: Duration) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.expires_at = deadline(expiration);
        }
    }

    fn add_key_to_tag(&self, tag_key: &str, key: &str) -> Result<()> {
        let current = self.lookup(tag_key);
        let mut keys = current
            .as_ref()
            .map(|entry| tag_members(&entry.value))
            .unwrap_or_default();

        if keys.iter().any(|k| k == key) {
            self.touch(tag_key, TAG_KEY_EXPIRY);
            return Ok(());
        }

        keys.push(key.to_owned());
        let payload = Value::from_typed(keys);

        match current {
            None => self.add(tag_key, payload, TAG_KEY_EXPIRY),
            Some(entry) => self.compare_and_swap(tag_key, payload, entry.cas, TAG_KEY_EXPIRY),
        }
    }

    fn set_tags(&self, key: &str, tags: &[String]) {
        for tag in tags {
            let tag_key = tag_key(tag);
            let mut last_error = None;
            for _ in 0..TAG_UPDATE_RETRIES {
                match self.add_key_to_tag(&tag_key, key) {
                    Ok(()) => {
                        last_error = None;
                        break;
                    }
                    Err(e) => last_error = Some(e),
                }
            }
            if let Some(e) = last_error {
                warn!(key, tag = %tag, error = %e, "Tag index update gave up after retries");
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Value> {
        self.lookup(key)
            .map(|entry| entry.value)
            .ok_or_else(|| Error::not_found("unable to retrieve data from memory"))
    }

    async fn get_with_ttl(&self, key: &str) -> Result<(Value, Duration)> {
        let now = Instant::now();
        self.lookup(key)
            .map(|entry| {
                let ttl = entry.remaining(now);
                (entry.value, ttl)
            })
            .ok_or_else(|| Error::not_found("unable to retrieve data from memory"))
    }

    async fn set(&self, key: &str, value: Value, options: &SetOptions) -> Result<()> {
        let opts = options.apply_with_default(&self.defaults);
        self.put(key, value, opts.expiration);

        if !opts.tags.is_empty() {
            self.set_tags(key, &opts.tags);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn invalidate(&self, options: &InvalidateOptions) -> Result<()> {
        for tag in &options.tags {
            let tag_key = tag_key(tag);
            let Some(index) = self.lookup(&tag_key) else {
                debug!(tag = %tag, "No tag index to invalidate");
                continue;
            };

            let keys = tag_members(&index.value);
            for key in &keys {
                self.entries.remove(key);
            }
            self.entries.remove(&tag_key);
            debug!(tag = %tag, keys = keys.len(), "Invalidated tag");
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn store_type(&self) -> &str {
        MEMORY_TYPE
    }
}

// =============================================================================
// Tests
// =============================================================================
