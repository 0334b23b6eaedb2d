//! Turns downloaded fragments into entities.

use std::collections::HashSet;

use tracing::trace;

use crate::cache::FragmentData;
use crate::coord::FragmentKey;
use crate::entity::FragmentEntity;

use super::{FrameContext, FrameState, System};

/// Consumes this frame's `downloaded` map.
///
/// - quad no longer visible or region unregistered: dropped, streaming
///   cleared
/// - geometry: entity created, key cached
/// - empty: key recorded in the empty-fragment index
///
/// `emitted` becomes the new keys, the empty keys and every requested key
/// that is already cached.
#[derive(Debug, Default)]
pub struct FragmentEmitSystem;

impl FragmentEmitSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for FragmentEmitSystem {
    fn name(&self) -> &'static str {
        "fragment_emit"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        let visible = ctx.viewport.visible_quads();
        let FrameState {
            frame,
            downloaded,
            streaming,
            cached,
            emitted,
            empty_fragments,
            fragments,
            requested,
            regions,
            ..
        } = &mut *ctx.state;

        let mut created: HashSet<FragmentKey> = HashSet::new();
        let mut empty: HashSet<FragmentKey> = HashSet::new();

        for (key, data) in downloaded.iter() {
            streaming.remove(key);
            if !visible.contains(&key.quad_key) {
                trace!(fragment = %key, "Discarding fragment for quad no longer visible");
                continue;
            }
            if !regions.contains(&key.region_id) {
                trace!(fragment = %key, "Discarding fragment for unregistered region");
                continue;
            }
            match data {
                FragmentData::Geometry(geometry) => {
                    fragments.insert(FragmentEntity::new(key.clone(), geometry.clone(), *frame));
                    cached.insert(key.clone());
                    created.insert(key.clone());
                }
                FragmentData::Empty => {
                    empty.insert(key.clone());
                }
            }
        }

        empty_fragments.add_all(&empty);

        let mut next: HashSet<FragmentKey> = requested.intersection(cached).cloned().collect();
        next.extend(created);
        next.extend(empty);
        *emitted = next;
    }
}
