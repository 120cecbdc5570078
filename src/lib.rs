//! Cache Facade - Backend-Agnostic Caching
//!
//! One typed cache interface over interchangeable storage backends, with
//! composable decorators for multi-tier lookup, load-through and metrics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Decorators                                  │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  │
//! │  │ MetricCache  │  │LoadableCache │  │  ChainCache  │  │  Marshaler   │  │
//! │  │ (recorder)   │  │ (write-back) │  │ (back-fill)  │  │ (msgpack)    │  │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘  │
//! │         └─────────────────┴────────┬────────┴─────────────────┘          │
//! │                                    │                                     │
//! │                        ┌───────────┴───────────┐                         │
//! │                        │  TypedCache (K -> T)  │                         │
//! │                        │  key derivation       │                         │
//! │                        └───────────┬───────────┘                         │
//! │                        ┌───────────┴───────────┐                         │
//! │                        │  StatsCodec (atomic)  │                         │
//! │                        └───────────┬───────────┘                         │
//! ├────────────────────────────────────┼────────────────────────────────────┤
//! │                               Store Contract                              │
//! │         ┌─────────────────┐        │        ┌─────────────────┐          │
//! │         │  MemoryStore    │◄───────┴───────►│   RedisStore    │          │
//! │         │  (DashMap, CAS) │                 │  (SADD tags)    │          │
//! │         └─────────────────┘                 └─────────────────┘          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`store`]: Store contract, options, values and backends
//! - [`codec`]: Per-store outcome statistics
//! - [`cache`]: Typed cache, key derivation and decorators
//! - [`metrics`]: Metrics sinks
//! - [`marshaler`]: Serialized values on top of a cache
//! - [`error`]: Error types and handling

pub mod cache;
pub mod codec;
pub mod error;
pub mod marshaler;
pub mod metrics;
pub mod queue;
pub mod store;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use cache::{
    checksum, CacheInterface, CacheNode, CacheRef, ChainCache, ChainConfig, HashedKey,
    LoadableCache, LoadableConfig, Loader, MetricCache, ToCacheKey, TypedCache,
};

pub use codec::{StatsCodec, StatsSnapshot};

pub use error::{ChainError, Error, Result};

pub use marshaler::{JsonSerializer, Marshaler, MsgPackSerializer, Serializer};

pub use metrics::{MetricsRecorder, PrometheusConfig, PrometheusRecorder};

pub use store::{
    InvalidateOptions, MemoryStore, MemoryStoreConfig, Options, RedisStore, SetOptions, Store,
    StoreRef, Value,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
