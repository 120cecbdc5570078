//! Write and Invalidation Options
//!
//! A store holds a default [`Options`]; each write may carry [`SetOptions`]
//! overrides that replace the default field by field.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// Resolved Options
// =============================================================================

/// Write-time configuration applied by a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Backend-specific weight hint
    pub cost: i64,
    /// Time to live, zero means no expiry
    pub expiration: Duration,
    /// Tags associated with the written key
    pub tags: Vec<String>,
}

impl Options {
    /// Whether the entry should expire
    pub fn expires(&self) -> bool {
        !self.expiration.is_zero()
    }
}

// =============================================================================
// Per-call Overrides
// =============================================================================

/// Per-call overrides; unset fields fall back to the store defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    cost: Option<i64>,
    expiration: Option<Duration>,
    tags: Option<Vec<String>>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the memory cost of the item
    pub fn with_cost(mut self, cost: i64) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Set an expiration for the item
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Associate tags with the item. Replaces any default tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Merge these overrides over the store defaults
    pub fn apply_with_default(&self, defaults: &Options) -> Options {
        Options {
            cost: self.cost.unwrap_or(defaults.cost),
            expiration: self.expiration.unwrap_or(defaults.expiration),
            tags: self.tags.clone().unwrap_or_else(|| defaults.tags.clone()),
        }
    }

    /// Resolve against empty defaults
    pub fn resolve(&self) -> Options {
        self.apply_with_default(&Options::default())
    }
}

// =============================================================================
// Invalidation Options
// =============================================================================

/// Selector for bulk invalidation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidateOptions {
    pub tags: Vec<String>,
}

impl InvalidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate every key indexed under these tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}
