//! Geometry fragment cache.
//!
//! Keyed by quad key, each entry holds the fragments of every region known
//! at that quad. Whole quads are evicted on overflow, which matches how
//! fragments are requested: all regions of one visible quad at a time.

use std::collections::HashMap;
use std::sync::Arc;

use crate::coord::{FragmentKey, QuadKey, RegionId};
use crate::geometry::MultiPolygon;

use super::{BoundedCache, CacheError, CacheStats};

/// Cached state of one fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentData {
    /// Real geometry for the fragment.
    Geometry(Arc<MultiPolygon>),
    /// The service has no geometry here; remembered so the key is never
    /// fetched again.
    Empty,
}

impl FragmentData {
    /// Wrap geometry, mapping empty geometry to [`FragmentData::Empty`].
    pub fn from_geometry(geometry: MultiPolygon) -> Self {
        if geometry.is_empty() {
            FragmentData::Empty
        } else {
            FragmentData::Geometry(Arc::new(geometry))
        }
    }

    /// Returns true for the "known empty" marker.
    pub fn is_empty(&self) -> bool {
        matches!(self, FragmentData::Empty)
    }

    /// The geometry, if any.
    pub fn geometry(&self) -> Option<&Arc<MultiPolygon>> {
        match self {
            FragmentData::Geometry(geometry) => Some(geometry),
            FragmentData::Empty => None,
        }
    }
}

/// LRU cache of fragments grouped by quad.
pub struct FragmentCache {
    quads: BoundedCache<QuadKey, HashMap<RegionId, FragmentData>>,
    stats: CacheStats,
}

impl FragmentCache {
    /// Create a cache holding at most `quad_limit` quads.
    pub fn new(quad_limit: usize) -> Result<Self, CacheError> {
        Ok(Self {
            quads: BoundedCache::new(quad_limit)?,
            stats: CacheStats::default(),
        })
    }

    /// Look up a fragment, refreshing its quad's recency.
    pub fn get(&mut self, key: &FragmentKey) -> Option<FragmentData> {
        let found = self
            .quads
            .get(&key.quad_key)
            .and_then(|regions| regions.get(&key.region_id))
            .cloned();
        match found {
            Some(_) => self.stats.hits += 1,
            None => self.stats.misses += 1,
        }
        found
    }

    /// Check residency without touching recency or statistics.
    pub fn contains(&self, key: &FragmentKey) -> bool {
        self.quads
            .peek(&key.quad_key)
            .is_some_and(|regions| regions.contains_key(&key.region_id))
    }

    /// Store a fragment. May evict the least recently used quad.
    pub fn insert(&mut self, key: FragmentKey, data: FragmentData) {
        if let Some(regions) = self.quads.get_mut(&key.quad_key) {
            regions.insert(key.region_id, data);
            return;
        }

        let mut regions = HashMap::new();
        regions.insert(key.region_id, data);
        if let Some((evicted_quad, evicted)) = self.quads.put(key.quad_key, regions) {
            self.stats.evictions += 1;
            tracing::trace!(
                quad = %evicted_quad,
                fragments = evicted.len(),
                "Fragment cache evicted quad"
            );
        }
    }

    /// Remove one fragment; drops the quad entry once it is empty.
    pub fn remove(&mut self, key: &FragmentKey) -> Option<FragmentData> {
        let regions = self.quads.get_mut(&key.quad_key)?;
        let removed = regions.remove(&key.region_id);
        if regions.is_empty() {
            self.quads.remove(&key.quad_key);
        }
        removed
    }

    /// Number of resident quads.
    pub fn quad_count(&self) -> usize {
        self.quads.len()
    }

    /// Number of resident fragments over all quads.
    pub fn fragment_count(&self) -> usize {
        self.quads.iter().map(|(_, regions)| regions.len()).sum()
    }

    /// Maximum number of resident quads.
    pub fn quad_limit(&self) -> usize {
        self.quads.limit()
    }

    /// Hit, miss and eviction counters.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats;
        stats.entry_count = self.fragment_count();
        stats
    }
}

impl std::fmt::Debug for FragmentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentCache")
            .field("quads", &self.quads)
            .field("stats", &self.stats)
            .finish()
    }
}
