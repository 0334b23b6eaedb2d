//! Computes which fragments the viewport wants.

use std::collections::HashSet;

use crate::coord::FragmentKey;

use super::{FrameContext, System};

/// Writes `requested`, `obsolete` and `requested_zoom`.
///
/// Requested keys are every registered region at every visible quad, minus
/// the ones already known to be empty. Obsolete keys are every region at
/// every quad leaving the viewport.
#[derive(Debug, Default)]
pub struct FragmentUpdateSystem;

impl FragmentUpdateSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for FragmentUpdateSystem {
    fn name(&self) -> &'static str {
        "fragment_update"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        let visible = ctx.viewport.visible_quads();
        let to_remove = ctx.viewport.quads_to_remove();

        let requested: HashSet<FragmentKey> = ctx
            .state
            .region_keys(&visible)
            .filter(|key| !ctx.state.empty_fragments.contains(key))
            .collect();
        let obsolete: HashSet<FragmentKey> = ctx.state.region_keys(&to_remove).collect();

        let state = &mut *ctx.state;
        state.requested_zoom = (!visible.is_empty()).then(|| ctx.viewport.zoom());
        state.requested = requested;
        state.obsolete = obsolete;
    }
}
