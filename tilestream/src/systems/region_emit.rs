//! Decides which fragments each region is drawn with.
//!
//! During a zoom change the new fragments stream in one by one. Switching
//! a region to them piecemeal would leave holes, so the region keeps its
//! previous composition until every fragment of the new zoom is resident.

use std::collections::{BTreeSet, HashSet};

use crate::coord::FragmentKey;

use super::{FrameContext, FrameState, RegionComposition, System};

#[derive(Debug, Default)]
pub struct RegionEmitSystem;

impl RegionEmitSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for RegionEmitSystem {
    fn name(&self) -> &'static str {
        "region_emit"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        let visible = ctx.viewport.visible_quads();
        let zoom = ctx.viewport.zoom();
        let FrameState {
            frame,
            regions,
            cached,
            empty_fragments,
            compositions,
            active_fragments,
            fragments,
            ..
        } = &mut *ctx.state;

        compositions.retain(|region_id, _| regions.contains(region_id));

        let mut active = HashSet::new();
        for region_id in regions.iter() {
            let wanted: BTreeSet<FragmentKey> = visible
                .iter()
                .map(|quad| FragmentKey::new(region_id.clone(), *quad))
                .filter(|key| !empty_fragments.contains(key))
                .collect();

            let composition = if wanted.iter().all(|key| cached.contains(key)) {
                RegionComposition {
                    zoom: Some(zoom),
                    fragments: wanted,
                    complete: true,
                }
            } else {
                let previous = compositions.remove(region_id).unwrap_or_default();
                let mut carried: BTreeSet<FragmentKey> = previous
                    .fragments
                    .into_iter()
                    .filter(|key| fragments.contains(key))
                    .collect();
                carried.extend(wanted.into_iter().filter(|key| cached.contains(key)));
                RegionComposition {
                    zoom: previous.zoom,
                    fragments: carried,
                    complete: false,
                }
            };

            for key in &composition.fragments {
                fragments.touch(key, *frame);
                active.insert(key.clone());
            }
            compositions.insert(region_id.clone(), composition);
        }

        *active_fragments = active;
    }
}
