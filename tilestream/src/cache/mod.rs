//! Bounded caches used by the engine.
//!
//! - [`BoundedCache`]: generic strict-LRU store
//! - [`FragmentCache`]: geometry fragments keyed by quad, then region
//! - [`EmptyFragmentIndex`]: nested LRU of fragments known to be empty

mod bounded;
mod empty;
mod fragments;

pub use bounded::BoundedCache;
pub use empty::{EmptyFragmentIndex, DEFAULT_EMPTY_QUADS_LIMIT, DEFAULT_EMPTY_REGIONS_LIMIT};
pub use fragments::{FragmentCache, FragmentData};

use std::fmt;

use thiserror::Error;

/// Errors that can occur when building caches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// A cache was configured with room for nothing.
    #[error("Cache limit must be greater than zero")]
    ZeroCapacity,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entry_count: usize,
}

impl CacheStats {
    /// Ratio of hits to lookups, 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} hits, {} misses, {} evictions",
            self.entry_count, self.hits, self.misses, self.evictions
        )
    }
}
