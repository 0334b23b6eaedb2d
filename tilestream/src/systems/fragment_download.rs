//! Bounded-concurrency fragment downloads.
//!
//! Each key moves through `requested → queued → downloading → downloaded`.
//! Per frame the system:
//!
//! 1. reconciles its queue with this frame's requested/obsolete keys
//! 2. admits queued keys while fewer than `max_active` are downloading,
//!    current zoom first, one provider call per region
//! 3. drains completions posted since the previous frame
//! 4. publishes the drained fragments as this frame's `downloaded`
//!
//! A failed fetch clears the keys' streaming mark so a later frame can
//! queue them again. The queue never holds a key that is downloading.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::cache::FragmentData;
use crate::coord::{FragmentKey, QuadKey, RegionId};
use crate::executor::{Mailbox, Spawner};
use crate::provider::{FetchError, Fragment, FragmentProvider};

use super::{FrameContext, System};

/// Result of one provider call, posted from the spawned future.
struct Completion {
    region_id: RegionId,
    quads: Vec<QuadKey>,
    result: Result<Vec<Fragment>, FetchError>,
}

/// Issues fragment fetches, at most `max_active` keys at a time.
pub struct FragmentDownloadingSystem {
    max_active: usize,
    provider: FragmentProvider,
    spawner: Arc<dyn Spawner>,
    completions: Mailbox<Completion>,
    queue: HashSet<FragmentKey>,
}

impl FragmentDownloadingSystem {
    pub fn new(max_active: usize, provider: FragmentProvider, spawner: Arc<dyn Spawner>) -> Self {
        Self {
            max_active,
            provider,
            spawner,
            completions: Mailbox::new(),
            queue: HashSet::new(),
        }
    }

    /// Keys waiting for a download slot.
    pub fn queued(&self) -> &HashSet<FragmentKey> {
        &self.queue
    }

    fn reconcile_queue(&mut self, ctx: &FrameContext<'_>) {
        let state = &*ctx.state;
        self.queue
            .retain(|key| state.requested.contains(key) && !state.obsolete.contains(key));
        for key in &state.requested {
            if !state.cached.contains(key)
                && !state.downloading.contains(key)
                && !state.streaming.contains(key)
            {
                self.queue.insert(key.clone());
            }
        }
    }

    fn admit(&mut self, ctx: &mut FrameContext<'_>) {
        let state = &mut *ctx.state;
        let free = self.max_active.saturating_sub(state.downloading.len());
        if free == 0 || self.queue.is_empty() {
            return;
        }

        let zoom = ctx.viewport.zoom();
        let mut candidates: Vec<FragmentKey> = self
            .queue
            .iter()
            .filter(|key| !state.cached.contains(key) && !state.downloading.contains(key))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| {
            let rank = |key: &FragmentKey| (key.zoom() != zoom, key.zoom().abs_diff(zoom));
            rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
        });
        candidates.truncate(free);

        let mut by_region: BTreeMap<RegionId, Vec<QuadKey>> = BTreeMap::new();
        for key in candidates {
            self.queue.remove(&key);
            state.streaming.insert(key.clone());
            state.downloading.insert(key.clone());
            by_region
                .entry(key.region_id)
                .or_default()
                .push(key.quad_key);
        }

        for (region_id, quads) in by_region {
            trace!(region = %region_id, quads = quads.len(), "Requesting fragments");
            let fetch = self
                .provider
                .get_fragments(std::slice::from_ref(&region_id), &quads);
            let completions = self.completions.clone();
            self.spawner.spawn(Box::pin(async move {
                let result = fetch
                    .await
                    .map(|mut answer| answer.remove(&region_id).unwrap_or_default());
                completions.post(Completion {
                    region_id,
                    quads,
                    result,
                });
            }));
        }
    }

    fn drain(&mut self, ctx: &mut FrameContext<'_>) -> HashMap<FragmentKey, FragmentData> {
        let state = &mut *ctx.state;
        let mut downloaded = HashMap::new();

        for completion in self.completions.take() {
            let Completion {
                region_id,
                quads,
                result,
            } = completion;

            match result {
                Ok(fragments) => {
                    let mut received: HashMap<QuadKey, FragmentData> = fragments
                        .into_iter()
                        .map(|fragment| (fragment.key.quad_key, fragment.data))
                        .collect();
                    for quad in &quads {
                        let key = FragmentKey::new(region_id.clone(), *quad);
                        // Dropped from streaming while in flight: no longer wanted.
                        if !state.streaming.contains(&key) {
                            continue;
                        }
                        let data = received.remove(quad).unwrap_or(FragmentData::Empty);
                        downloaded.insert(key, data);
                    }
                }
                Err(error) => {
                    warn!(
                        region = %region_id,
                        quads = quads.len(),
                        error = %error,
                        "Fragment fetch failed"
                    );
                    for quad in &quads {
                        state
                            .streaming
                            .remove(&FragmentKey::new(region_id.clone(), *quad));
                    }
                }
            }

            for quad in &quads {
                state
                    .downloading
                    .remove(&FragmentKey::new(region_id.clone(), *quad));
            }
        }

        downloaded
    }
}

impl System for FragmentDownloadingSystem {
    fn name(&self) -> &'static str {
        "fragment_downloading"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        self.reconcile_queue(ctx);
        self.admit(ctx);
        let downloaded = self.drain(ctx);
        ctx.state.downloaded = downloaded;
    }
}

impl std::fmt::Debug for FragmentDownloadingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentDownloadingSystem")
            .field("max_active", &self.max_active)
            .field("queued", &self.queue.len())
            .field("completions", &self.completions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::executor::ManualSpawner;
    use crate::geometry::MultiPolygon;
    use crate::provider::InMemoryFragmentService;
    use crate::systems::FrameState;
    use crate::viewport::ViewportGridState;

    struct Harness {
        service: Arc<InMemoryFragmentService>,
        spawner: Arc<ManualSpawner>,
        system: FragmentDownloadingSystem,
        state: FrameState,
        viewport: ViewportGridState,
    }

    impl Harness {
        fn new(max_active: usize) -> Self {
            let service = Arc::new(InMemoryFragmentService::new());
            let spawner = Arc::new(ManualSpawner::new());
            let provider = FragmentProvider::new(service.clone(), 1_000).unwrap();
            Self {
                system: FragmentDownloadingSystem::new(max_active, provider, spawner.clone()),
                service,
                spawner,
                state: FrameState::default(),
                viewport: ViewportGridState::default(),
            }
        }

        fn request(&mut self, keys: &[FragmentKey]) {
            self.state.requested = keys.iter().cloned().collect();
        }

        fn frame(&mut self) {
            let mut ctx = FrameContext::new(&self.viewport, &mut self.state);
            self.system.update(&mut ctx);
        }
    }

    fn key(region: &str, quad: &str) -> FragmentKey {
        FragmentKey::new(region, quad.parse().unwrap())
    }

    #[test]
    fn test_single_slot_serializes_two_regions() {
        let mut h = Harness::new(1);
        h.request(&[key("a", "0"), key("b", "0")]);

        h.frame();
        assert_eq!(h.state.downloading, HashSet::from([key("a", "0")]));
        assert!(h.system.queued().contains(&key("b", "0")));
        assert_eq!(h.spawner.pending_count(), 1);
        assert_eq!(h.service.request_count(), 1);

        // Completes between frames; drained on the next one.
        h.spawner.run_pending();
        h.frame();
        assert!(h.state.downloading.is_empty());
        assert!(h.state.downloaded.contains_key(&key("a", "0")));
        assert_eq!(h.spawner.pending_count(), 0);

        // Pretend emit ran: the key is now cached and no longer streaming.
        h.state.streaming.remove(&key("a", "0"));
        h.state.cached.insert(key("a", "0"));

        h.frame();
        assert_eq!(h.state.downloading, HashSet::from([key("b", "0")]));
        assert_eq!(h.service.request_count(), 2);
    }

    #[test]
    fn test_absent_quads_are_published_as_empty() {
        let mut h = Harness::new(4);
        h.service
            .insert(key("a", "1"), MultiPolygon::square(0.0, 0.0, 1.0));
        h.request(&[key("a", "1"), key("a", "2")]);

        h.frame();
        h.spawner.run_pending();
        h.frame();

        assert!(h.state.downloaded[&key("a", "1")].geometry().is_some());
        assert_eq!(h.state.downloaded[&key("a", "2")], FragmentData::Empty);
        // One call for the region, both quads batched.
        assert_eq!(h.service.request_count(), 1);
    }

    #[test]
    fn test_current_zoom_admitted_first() {
        let mut h = Harness::new(1);
        h.viewport = ViewportGridState::initial(2, Vec::new());
        h.request(&[key("a", "0"), key("a", "01"), key("a", "012")]);

        h.frame();
        assert_eq!(h.state.downloading, HashSet::from([key("a", "01")]));
    }

    #[test]
    fn test_failure_clears_streaming_and_requeues() {
        let mut h = Harness::new(2);
        h.service.fail_next(1);
        h.request(&[key("a", "0")]);

        h.frame();
        h.spawner.run_pending();
        h.frame();

        assert!(h.state.downloaded.is_empty());
        assert!(h.state.downloading.is_empty());
        assert!(!h.state.streaming.contains(&key("a", "0")));

        // Still requested, so the next frame queues and admits it again.
        h.frame();
        assert!(h.state.downloading.contains(&key("a", "0")));
    }

    #[test]
    fn test_dropped_streaming_key_is_discarded() {
        let mut h = Harness::new(2);
        h.request(&[key("a", "0")]);

        h.frame();
        h.state.streaming.clear();
        h.spawner.run_pending();
        h.frame();

        assert!(h.state.downloaded.is_empty());
        assert!(h.state.downloading.is_empty());
    }

    #[test]
    fn test_obsolete_keys_leave_queue() {
        let mut h = Harness::new(1);
        h.request(&[key("a", "0"), key("a", "1")]);
        h.frame();
        assert_eq!(h.system.queued().len(), 1);

        h.request(&[]);
        h.state.obsolete = HashSet::from([key("a", "1")]);
        h.frame();
        assert!(h.system.queued().is_empty());
    }

    #[test]
    fn test_unrequested_keys_leave_queue() {
        let mut h = Harness::new(1);
        h.request(&[key("a", "0"), key("b", "0")]);
        h.frame();
        assert!(h.system.queued().contains(&key("b", "0")));

        // Region "b" went away: no longer requested, never obsolete.
        h.request(&[key("a", "0")]);
        h.spawner.run_pending();
        h.frame();
        h.frame();

        assert!(h.system.queued().is_empty());
        assert!(h.state.downloading.is_empty());
        assert_eq!(h.service.request_count(), 1);
    }

    #[test]
    fn test_downloading_key_not_requeued() {
        let mut h = Harness::new(1);
        h.request(&[key("a", "0")]);
        h.frame();
        h.frame();

        assert!(!h.system.queued().contains(&key("a", "0")));
        assert_eq!(h.spawner.pending_count(), 1);
    }

    proptest! {
        #[test]
        fn prop_downloading_never_exceeds_cap(
            max_active in 1usize..4,
            frames in prop::collection::vec(
                (prop::collection::hash_set(0u8..4, 0..4), prop::bool::ANY),
                1..12,
            ),
        ) {
            let mut h = Harness::new(max_active);
            for (quads, complete) in frames {
                let keys: Vec<FragmentKey> = quads
                    .iter()
                    .flat_map(|q| {
                        let quad = QuadKey::from_digits(&[*q]).unwrap();
                        [FragmentKey::new("a", quad), FragmentKey::new("b", quad)]
                    })
                    .collect();
                h.request(&keys);
                h.frame();

                prop_assert!(h.state.downloading.len() <= max_active);
                for key in &h.state.downloading {
                    prop_assert!(!h.system.queued().contains(key));
                }

                if complete {
                    h.spawner.run_pending();
                }
            }
        }
    }
}
