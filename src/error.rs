//! Error types for the cache facade
//!
//! Provides structured error types for stores, decorators, metrics sinks and
//! the marshaler.

use std::fmt;
use thiserror::Error;

/// Unified error type for the cache facade
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Store Errors
    // =========================================================================
    /// The store holds no value for the key. Callers usually treat this as
    /// "absent" rather than "broken".
    #[error("value not found in store: {cause}")]
    NotFound { cause: String },

    #[error("value type not supported by {store} store")]
    UnsupportedValue { store: String },

    #[error("Backend operation failed: {store} - {operation}: {reason}")]
    Backend {
        store: String,
        operation: String,
        reason: String,
    },

    #[error("Compare-and-swap conflict on key: {key}")]
    CasConflict { key: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    // =========================================================================
    // Decorator Errors
    // =========================================================================
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("Stored value is not a {expected}")]
    TypeMismatch { expected: &'static str },

    #[error("Write-back queue is closed")]
    QueueClosed,

    // =========================================================================
    // Serialization Errors
    // =========================================================================
    #[error("MessagePack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // =========================================================================
    // Metrics Errors
    // =========================================================================
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Build a [`Error::NotFound`] from any displayable cause
    pub fn not_found(cause: impl fmt::Display) -> Self {
        Error::NotFound {
            cause: cause.to_string(),
        }
    }

    /// Build a [`Error::Backend`] failure
    pub fn backend(
        store: impl Into<String>,
        operation: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Error::Backend {
            store: store.into(),
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if this error means the key is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Redis(e) => e.is_io_error() || e.is_timeout() || e.is_connection_dropped(),
            Error::CasConflict { .. } => true,
            Error::Chain(chain) => chain.failures().iter().all(|f| f.cause.is_transient()),
            _ => false,
        }
    }
}

// =============================================================================
// Chain Aggregate Error
// =============================================================================

/// One failing tier of a chain fan-out operation
#[derive(Debug)]
pub struct TierFailure {
    /// Type name of the store behind the tier
    pub store_type: String,
    /// The tier's own error
    pub cause: Error,
}

/// Aggregate error returned when one or more chain tiers fail
#[derive(Debug, Default)]
pub struct ChainError {
    failures: Vec<TierFailure>,
}

impl ChainError {
    /// Create an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failing tier
    pub fn push(&mut self, store_type: impl Into<String>, cause: Error) {
        self.failures.push(TierFailure {
            store_type: store_type.into(),
            cause,
        });
    }

    /// Failures in tier order
    pub fn failures(&self) -> &[TierFailure] {
        &self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok(())` when no tier failed, the aggregate otherwise
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Chain(self))
        }
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.failures.len();
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(
                f,
                "error {} of {}: {} failure: {}",
                i + 1,
                total,
                failure.store_type,
                failure.cause
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ChainError {}

/// Result type alias for the cache facade
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = Error::not_found("unable to retrieve data from memory");
        assert!(err.is_not_found());
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "value not found in store: unable to retrieve data from memory"
        );

        let err = Error::backend("redis", "set", "connection refused");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_chain_error_enumerates_failures() {
        let mut chain = ChainError::new();
        chain.push("memory", Error::backend("memory", "set", "full"));
        chain.push("redis", Error::CasConflict { key: "k".into() });

        let message = chain.to_string();
        assert_eq!(
            message,
            "error 1 of 2: memory failure: Backend operation failed: memory - set: full; \
             error 2 of 2: redis failure: Compare-and-swap conflict on key: k"
        );
    }

    #[test]
    fn test_chain_error_into_result() {
        assert!(ChainError::new().into_result().is_ok());

        let mut chain = ChainError::new();
        chain.push("memory", Error::CasConflict { key: "k".into() });
        let err = chain.into_result().unwrap_err();
        assert!(matches!(err, Error::Chain(_)));
        assert!(err.is_transient());
    }
}
