//! Redis Store
//!
//! Store adapter over a multiplexed redis connection. Tag indexes are native
//! redis sets, so adding a key to a tag is a single atomic `SADD`.

use crate::error::{Error, Result};
use crate::store::{tag_key, InvalidateOptions, Options, SetOptions, Store, Value, TAG_KEY_EXPIRY};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info};

/// Type name reported by [`RedisStore`]
pub const REDIS_TYPE: &str = "redis";

/// Redis-backed store
#[derive(Clone)]
pub struct RedisStore {
    /// Multiplexed connection, cheap to clone per call
    conn: ConnectionManager,
    /// Options applied to every write unless overridden
    defaults: Options,
}

impl RedisStore {
    /// Create a store over an existing connection manager
    pub fn new(conn: ConnectionManager, defaults: Options) -> Self {
        Self { conn, defaults }
    }

    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`)
    pub async fn connect(url: &str, defaults: Options) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(url, "Connected redis store");
        Ok(Self::new(conn, defaults))
    }

    /// Default write options
    pub fn defaults(&self) -> &Options {
        &self.defaults
    }

    async fn set_tags(&self, key: &str, tags: &[String]) -> Result<()> {
        let mut conn = self.conn.clone();
        for tag in tags {
            let tag_key = tag_key(tag);
            let _: i64 = conn.sadd(&tag_key, key).await?;
            let _: bool = conn
                .expire(&tag_key, TAG_KEY_EXPIRY.as_secs() as i64)
                .await?;
        }
        Ok(())
    }
}

/// Interpret a `PTTL` reply: -1 means no expiry, -2 means no key
fn remaining_ttl(pttl: i64) -> Option<Duration> {
    match pttl {
        -2 => None,
        ms if ms < 0 => Some(Duration::ZERO),
        ms => Some(Duration::from_millis(ms as u64)),
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Value> {
        let mut conn = self.conn.clone();
        let payload: Option<Vec<u8>> = conn.get(key).await?;
        payload
            .map(Value::from)
            .ok_or_else(|| Error::not_found("redis: nil"))
    }

    async fn get_with_ttl(&self, key: &str) -> Result<(Value, Duration)> {
        let value = self.get(key).await?;

        let mut conn = self.conn.clone();
        let pttl: i64 = conn.pttl(key).await?;
        let ttl = remaining_ttl(pttl).ok_or_else(|| Error::not_found("redis: key expired"))?;
        Ok((value, ttl))
    }

    async fn set(&self, key: &str, value: Value, options: &SetOptions) -> Result<()> {
        let opts = options.apply_with_default(&self.defaults);
        let payload = value.as_payload().ok_or_else(|| Error::UnsupportedValue {
            store: REDIS_TYPE.to_string(),
        })?;

        let mut conn = self.conn.clone();
        if opts.expires() {
            let _: () = conn
                .pset_ex(key, payload, opts.expiration.as_millis() as u64)
                .await?;
        } else {
            let _: () = conn.set(key, payload).await?;
        }

        if !opts.tags.is_empty() {
            if let Err(e) = self.set_tags(key, &opts.tags).await {
                debug!(key, error = %e, "Failed to update redis tag index");
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    async fn invalidate(&self, options: &InvalidateOptions) -> Result<()> {
        let mut conn = self.conn.clone();
        for tag in &options.tags {
            let tag_key = tag_key(tag);
            let keys: Vec<String> = match conn.smembers(&tag_key).await {
                Ok(keys) => keys,
                Err(e) => {
                    debug!(tag = %tag, error = %e, "Unable to read redis tag index");
                    continue;
                }
            };

            for key in &keys {
                let _ = self.delete(key).await;
            }
            let _ = self.delete(&tag_key).await;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHALL").query_async(&mut conn).await?;
        Ok(())
    }

    fn store_type(&self) -> &str {
        REDIS_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_ttl() {
        assert_eq!(remaining_ttl(-2), None);
        assert_eq!(remaining_ttl(-1), Some(Duration::ZERO));
        assert_eq!(remaining_ttl(1500), Some(Duration::from_millis(1500)));
    }

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    #[tokio::test]
    #[ignore = "requires a running redis server"]
    async fn test_redis_tag_roundtrip() {
        let store = RedisStore::connect(&redis_url(), Options::default())
            .await
            .unwrap();

        store
            .set(
                "facade-test-key",
                Value::from("value"),
                &SetOptions::new().with_tags(["facade-test"]),
            )
            .await
            .unwrap();
        store
            .set(
                "facade-test-key",
                Value::from("value"),
                &SetOptions::new().with_tags(["facade-test"]),
            )
            .await
            .unwrap();

        let value = store.get("facade-test-key").await.unwrap();
        assert_eq!(value.narrow::<String>(), Some("value".to_string()));

        store
            .invalidate(&InvalidateOptions::new().with_tags(["facade-test"]))
            .await
            .unwrap();
        assert!(store.get("facade-test-key").await.unwrap_err().is_not_found());
        assert!(store.get(&tag_key("facade-test")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    #[ignore = "requires a running redis server"]
    async fn test_redis_rejects_objects() {
        let store = RedisStore::connect(&redis_url(), Options::default())
            .await
            .unwrap();
        let err = store
            .set("obj", Value::from_typed(42u64), &SetOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedValue { .. }));
    }
}
