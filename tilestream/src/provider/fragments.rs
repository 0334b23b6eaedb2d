//! Cache-backed fragment provider.
//!
//! Turns (regions × quads) into fragments, answering from the
//! [`FragmentCache`] when it can and batching everything else into one
//! service call. A successful call leaves every requested pair resident,
//! either as geometry or as an explicit empty marker.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::cache::{CacheError, CacheStats, FragmentCache, FragmentData};
use crate::coord::{FragmentKey, QuadKey, RegionId};

use super::types::{BoxFuture, FetchError, Fragment, FragmentMap, FragmentRequest, FragmentService};

/// Fragment provider over a shared cache.
///
/// Cloning is cheap; clones share the cache and the service.
#[derive(Clone)]
pub struct FragmentProvider {
    service: Arc<dyn FragmentService>,
    cache: Arc<Mutex<FragmentCache>>,
}

impl FragmentProvider {
    /// Create a provider caching at most `quad_limit` quads.
    pub fn new(service: Arc<dyn FragmentService>, quad_limit: usize) -> Result<Self, CacheError> {
        Ok(Self {
            service,
            cache: Arc::new(Mutex::new(FragmentCache::new(quad_limit)?)),
        })
    }

    /// Fragments for every pair of `region_ids` × `quad_keys`.
    ///
    /// Fully resident requests resolve immediately without a service call.
    /// On failure nothing is written to the cache. The answer merges the
    /// pairs resident at call time with the fetched ones, so entries evicted
    /// by this batch's own inserts are still answered.
    pub fn get_fragments(
        &self,
        region_ids: &[RegionId],
        quad_keys: &[QuadKey],
    ) -> BoxFuture<'static, Result<FragmentMap, FetchError>> {
        let mut resident = HashMap::new();
        let mut missing = FragmentRequest::new();
        {
            let mut cache = self.cache.lock();
            for region_id in region_ids {
                for quad in quad_keys {
                    let key = FragmentKey::new(region_id.clone(), *quad);
                    match cache.get(&key) {
                        Some(data) => {
                            resident.insert(key, data);
                        }
                        None => {
                            missing
                                .entry(region_id.clone())
                                .or_insert_with(HashSet::new)
                                .insert(*quad);
                        }
                    }
                }
            }
        }

        let region_ids = region_ids.to_vec();
        let quad_keys = quad_keys.to_vec();

        if missing.is_empty() {
            let answer = assemble(&region_ids, &quad_keys, &resident);
            return Box::pin(futures::future::ready(Ok(answer)));
        }

        let mut requested_regions: Vec<RegionId> = missing.keys().cloned().collect();
        requested_regions.sort();
        trace!(
            regions = requested_regions.len(),
            pairs = missing.values().map(HashSet::len).sum::<usize>(),
            "Fetching missing fragments"
        );

        let fetch = self
            .service
            .fetch_fragments(requested_regions, missing.clone());
        let cache = Arc::clone(&self.cache);

        Box::pin(async move {
            let response = fetch.await?;

            let mut fetched: HashMap<FragmentKey, FragmentData> = HashMap::new();
            for (region_id, fragments) in response {
                for (quad, geometry) in fragments {
                    fetched.insert(
                        FragmentKey::new(region_id.clone(), quad),
                        FragmentData::from_geometry(geometry),
                    );
                }
            }
            for (region_id, quads) in &missing {
                for quad in quads {
                    fetched
                        .entry(FragmentKey::new(region_id.clone(), *quad))
                        .or_insert(FragmentData::Empty);
                }
            }

            {
                let mut store = cache.lock();
                for (key, data) in &fetched {
                    store.insert(key.clone(), data.clone());
                }
            }

            resident.extend(fetched);
            Ok(assemble(&region_ids, &quad_keys, &resident))
        })
    }

    /// Drop one fragment from the cache. Returns true if it was resident.
    pub fn evict(&self, key: &FragmentKey) -> bool {
        self.cache.lock().remove(key).is_some()
    }

    /// Residency check that leaves recency untouched.
    pub fn is_cached(&self, key: &FragmentKey) -> bool {
        self.cache.lock().contains(key)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }
}

impl std::fmt::Debug for FragmentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentProvider")
            .field("cache", &self.cache_stats())
            .finish_non_exhaustive()
    }
}

/// Lay out the answer per region in request order.
fn assemble(
    region_ids: &[RegionId],
    quad_keys: &[QuadKey],
    known: &HashMap<FragmentKey, FragmentData>,
) -> FragmentMap {
    region_ids
        .iter()
        .map(|region_id| {
            let fragments = quad_keys
                .iter()
                .filter_map(|quad| {
                    let key = FragmentKey::new(region_id.clone(), *quad);
                    let data = known.get(&key)?.clone();
                    Some(Fragment::new(key, data))
                })
                .collect();
            (region_id.clone(), fragments)
        })
        .collect()
}
