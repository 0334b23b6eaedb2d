//! Fragment eviction.
//!
//! Relevance decides what may be evicted, recency only orders the
//! candidates. A fragment is never a candidate while it is requested,
//! part of a live region composition, streaming at the requested zoom, or
//! at a visible quad.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::coord::FragmentKey;
use crate::provider::FragmentProvider;

use super::{FrameContext, FrameState, System};

/// Keeps at most `cache_limit` idle fragments resident.
#[derive(Debug)]
pub struct FragmentsRemovingSystem {
    cache_limit: usize,
    provider: FragmentProvider,
}

impl FragmentsRemovingSystem {
    pub fn new(cache_limit: usize, provider: FragmentProvider) -> Self {
        Self {
            cache_limit,
            provider,
        }
    }

    fn evict(&self, state: &mut FrameState, key: &FragmentKey) {
        state.fragments.remove(key);
        state.cached.remove(key);
        self.provider.evict(key);
    }
}

impl System for FragmentsRemovingSystem {
    fn name(&self) -> &'static str {
        "fragments_removing"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        let visible = ctx.viewport.visible_quads();
        let state = &mut *ctx.state;
        let requested_zoom = state.requested_zoom.unwrap_or_else(|| ctx.viewport.zoom());

        // In-flight work for another zoom is dropped; its completion will be
        // discarded at drain time.
        let (keep_streaming, stale): (HashSet<FragmentKey>, HashSet<FragmentKey>) = state
            .streaming
            .iter()
            .cloned()
            .partition(|key| key.zoom() == requested_zoom || visible.contains(&key.quad_key));
        for key in &stale {
            trace!(fragment = %key, "Dropping stale in-flight fragment");
            state.streaming.remove(key);
            state.fragments.remove(key);
        }

        let candidates: Vec<FragmentKey> = state
            .cached
            .union(&state.obsolete)
            .filter(|key| {
                !state.requested.contains(*key)
                    && !state.active_fragments.contains(*key)
                    && !keep_streaming.contains(*key)
                    && !visible.contains(&key.quad_key)
            })
            .cloned()
            .collect();

        // Non-cacheable fragments go first and regardless of headroom.
        let (unwanted, mut idle): (Vec<FragmentKey>, Vec<FragmentKey>) =
            candidates.into_iter().partition(|key| {
                state
                    .fragments
                    .get(key)
                    .is_some_and(|entity| entity.non_cacheable)
            });
        for key in &unwanted {
            self.evict(state, key);
        }

        if idle.len() <= self.cache_limit {
            return;
        }

        idle.sort_by(|a, b| {
            let used = |key: &FragmentKey| {
                state
                    .fragments
                    .get(key)
                    .map_or(0, |entity| entity.last_used_frame)
            };
            used(a).cmp(&used(b)).then_with(|| a.cmp(b))
        });
        let excess = idle.len() - self.cache_limit;
        for key in idle.iter().take(excess) {
            self.evict(state, key);
        }
        debug!(
            evicted = excess + unwanted.len(),
            remaining = state.cached.len(),
            "Evicted fragments"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::coord::{CellKey, RegionId};
    use crate::entity::FragmentEntity;
    use crate::geometry::MultiPolygon;
    use crate::provider::InMemoryFragmentService;
    use crate::viewport::ViewportGridState;

    fn key(region: &str, quad: &str) -> FragmentKey {
        FragmentKey::new(region, quad.parse().unwrap())
    }

    fn viewport(zoom: u8, cells: &[&str]) -> ViewportGridState {
        ViewportGridState::initial(
            zoom,
            cells.iter().map(|c| c.parse::<CellKey>().unwrap()),
        )
    }

    fn system(limit: usize) -> FragmentsRemovingSystem {
        let service = Arc::new(InMemoryFragmentService::new());
        FragmentsRemovingSystem::new(limit, FragmentProvider::new(service, 100).unwrap())
    }

    fn make_resident(state: &mut FrameState, key: FragmentKey, used: u64) {
        let geometry = Arc::new(MultiPolygon::square(0.0, 0.0, 1.0));
        state
            .fragments
            .insert(FragmentEntity::new(key.clone(), geometry, used));
        state.cached.insert(key);
    }

    #[test]
    fn test_evicts_oldest_idle_beyond_limit() {
        let mut state = FrameState::default();
        make_resident(&mut state, key("foo", "10"), 3);
        make_resident(&mut state, key("foo", "11"), 1);
        make_resident(&mut state, key("foo", "12"), 2);

        let viewport = viewport(2, &["00"]);
        system(1).update(&mut FrameContext::new(&viewport, &mut state));

        assert_eq!(state.cached, HashSet::from([key("foo", "10")]));
        assert!(state.fragments.contains(&key("foo", "10")));
        assert!(!state.fragments.contains(&key("foo", "11")));
    }

    #[test]
    fn test_never_evicts_visible_requested_or_active() {
        let mut state = FrameState::default();
        make_resident(&mut state, key("foo", "00"), 0);
        make_resident(&mut state, key("foo", "10"), 0);
        make_resident(&mut state, key("foo", "20"), 0);
        make_resident(&mut state, key("foo", "30"), 0);
        state.requested.insert(key("foo", "10"));
        state.active_fragments.insert(key("foo", "20"));

        let viewport = viewport(2, &["00"]);
        system(0).update(&mut FrameContext::new(&viewport, &mut state));

        assert!(state.cached.contains(&key("foo", "00")));
        assert!(state.cached.contains(&key("foo", "10")));
        assert!(state.cached.contains(&key("foo", "20")));
        assert!(!state.cached.contains(&key("foo", "30")));
    }

    #[test]
    fn test_non_cacheable_evicted_regardless_of_headroom() {
        let mut state = FrameState::default();
        make_resident(&mut state, key("foo", "1"), 0);
        make_resident(&mut state, key("foo", "2"), 0);
        state
            .fragments
            .get_mut(&key("foo", "1"))
            .unwrap()
            .non_cacheable = true;

        let viewport = viewport(1, &["0"]);
        system(10).update(&mut FrameContext::new(&viewport, &mut state));

        assert!(!state.cached.contains(&key("foo", "1")));
        assert!(state.cached.contains(&key("foo", "2")));
    }

    #[test]
    fn test_off_zoom_streaming_is_dropped() {
        let mut state = FrameState::default();
        state.requested_zoom = Some(2);
        state.streaming.insert(key("foo", "0"));
        state.streaming.insert(key("foo", "00"));

        let viewport = viewport(2, &["00"]);
        system(10).update(&mut FrameContext::new(&viewport, &mut state));

        assert_eq!(state.streaming, HashSet::from([key("foo", "00")]));
    }

    #[test]
    fn test_eviction_clears_provider_cache() {
        let service = Arc::new(InMemoryFragmentService::new());
        let provider = FragmentProvider::new(service, 100).unwrap();
        futures::executor::block_on(
            provider.get_fragments(&[RegionId::new("foo")], &["3".parse().unwrap()]),
        )
        .unwrap();
        assert!(provider.is_cached(&key("foo", "3")));

        let mut state = FrameState::default();
        make_resident(&mut state, key("foo", "3"), 0);
        let viewport = viewport(1, &["0"]);
        FragmentsRemovingSystem::new(0, provider.clone())
            .update(&mut FrameContext::new(&viewport, &mut state));

        assert!(!provider.is_cached(&key("foo", "3")));
    }
}
