//! Expression-keyed result caches
//!
//! Both caches key on [`ExprHash`] of the absolute expression, so two mounts
//! asking the same logical question share one entry regardless of node
//! identity. Eviction is LRU with optional TTL.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use weft_graph::{ExprHash, NodeRef, Value};

/// Cache sizing applied when callers do not configure one.
const DEFAULT_CAPACITY: u64 = 10_000;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of cached values
    pub value_entries: u64,
    /// Number of cached refinements
    pub refinement_entries: u64,
}

/// Paired value/refinement caches for the evaluation client
#[derive(Debug, Clone)]
pub struct EvalCache {
    values: Cache<ExprHash, Arc<Value>>,
    refinements: Cache<ExprHash, NodeRef>,
}

impl EvalCache {
    /// Create caches with a shared max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            values: Cache::new(max_capacity),
            refinements: Cache::new(max_capacity),
        }
    }

    /// Create caches with time-based expiration
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            values: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            refinements: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// The value cache
    #[inline]
    pub(crate) fn values(&self) -> &Cache<ExprHash, Arc<Value>> {
        &self.values
    }

    /// The refinement cache
    #[inline]
    pub(crate) fn refinements(&self) -> &Cache<ExprHash, NodeRef> {
        &self.refinements
    }

    /// Drop every entry from both caches
    #[inline]
    pub fn invalidate_all(&self) {
        self.values.invalidate_all();
        self.refinements.invalidate_all();
    }

    /// Current cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            value_entries: self.values.entry_count(),
            refinement_entries: self.refinements.entry_count(),
        }
    }
}

impl Default for EvalCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
