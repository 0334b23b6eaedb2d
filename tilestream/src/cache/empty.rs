//! Index of fragments known to have no geometry.
//!
//! Empty fragments are cheap to remember and expensive to forget: every
//! forgotten one becomes a network request the next time its quad is
//! visible. The index is a two-level LRU, regions first, then quads.

use std::num::NonZeroUsize;

use crate::coord::{FragmentKey, QuadKey, RegionId};

use super::BoundedCache;

/// Default number of regions tracked.
pub const DEFAULT_EMPTY_REGIONS_LIMIT: usize = 5_000;

/// Default number of empty quads remembered per region.
pub const DEFAULT_EMPTY_QUADS_LIMIT: usize = 50_000;

/// Nested LRU of empty fragment keys.
#[derive(Debug)]
pub struct EmptyFragmentIndex {
    regions: BoundedCache<RegionId, BoundedCache<QuadKey, ()>>,
    quads_limit: NonZeroUsize,
}

impl EmptyFragmentIndex {
    /// Create an index with the default limits.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_EMPTY_REGIONS_LIMIT, DEFAULT_EMPTY_QUADS_LIMIT)
    }

    /// Create an index with custom limits; zero limits are raised to one.
    pub fn with_limits(regions_limit: usize, quads_limit: usize) -> Self {
        let regions_limit = NonZeroUsize::new(regions_limit).unwrap_or(NonZeroUsize::MIN);
        Self {
            regions: BoundedCache::with_limit(regions_limit),
            quads_limit: NonZeroUsize::new(quads_limit).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Remember a fragment as empty.
    pub fn add(&mut self, key: &FragmentKey) {
        if let Some(quads) = self.regions.get_mut(&key.region_id) {
            quads.put(key.quad_key, ());
            return;
        }
        let mut quads = BoundedCache::with_limit(self.quads_limit);
        quads.put(key.quad_key, ());
        self.regions.put(key.region_id.clone(), quads);
    }

    /// Remember every key as empty.
    pub fn add_all<'a>(&mut self, keys: impl IntoIterator<Item = &'a FragmentKey>) {
        for key in keys {
            self.add(key);
        }
    }

    /// True if the fragment is known to be empty.
    pub fn contains(&self, key: &FragmentKey) -> bool {
        self.regions
            .peek(&key.region_id)
            .is_some_and(|quads| quads.contains(&key.quad_key))
    }

    /// Number of regions with at least one empty quad.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

impl Default for EmptyFragmentIndex {
    fn default() -> Self {
        Self::new()
    }
}
