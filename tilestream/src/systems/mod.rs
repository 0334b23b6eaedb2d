//! Per-frame systems.
//!
//! The engine runs these once per frame, always in this order:
//!
//! ```text
//! BasemapCellsRemoving ─► FragmentsRemoving ─► FragmentUpdate ─►
//! BasemapCellLoading ─► FragmentDownloading ─► FragmentEmit ─► RegionEmit
//! ```
//!
//! Removal runs first so it works from last frame's state, and loading
//! then sees the pruned state. No system blocks: network work is spawned
//! and its results are drained from a mailbox on a later frame.

mod cell_loading;
mod cell_removal;
mod fragment_download;
mod fragment_emit;
mod fragment_removal;
mod fragment_update;
mod region_emit;
mod state;

pub use cell_loading::{BasemapCellLoadingSystem, TileDelivery};
pub use cell_removal::BasemapCellsRemovingSystem;
pub use fragment_download::FragmentDownloadingSystem;
pub use fragment_emit::FragmentEmitSystem;
pub use fragment_removal::FragmentsRemovingSystem;
pub use fragment_update::FragmentUpdateSystem;
pub use region_emit::RegionEmitSystem;
pub use state::{FrameState, Layer, RegionComposition};

use crate::viewport::ViewportGridState;

/// Everything a system sees during one frame.
pub struct FrameContext<'a> {
    pub viewport: &'a ViewportGridState,
    pub state: &'a mut FrameState,
}

impl<'a> FrameContext<'a> {
    pub fn new(viewport: &'a ViewportGridState, state: &'a mut FrameState) -> Self {
        Self { viewport, state }
    }
}

/// One unit of per-frame work.
pub trait System: Send {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Advance this system by one frame.
    fn update(&mut self, ctx: &mut FrameContext<'_>);
}
