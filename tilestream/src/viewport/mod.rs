//! Viewport grid state.
//!
//! The engine never computes visibility itself: the host recomputes this
//! record every frame from the camera and hands it to
//! [`TileStreamEngine::update`](crate::engine::TileStreamEngine::update).

use std::collections::HashSet;

use crate::coord::{CellKey, QuadKey};

/// Cells the host wants on screen this frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewportGridState {
    zoom: u8,
    visible_cells: HashSet<CellKey>,
    cells_to_load: HashSet<CellKey>,
    cells_to_remove: HashSet<CellKey>,
}

impl ViewportGridState {
    pub fn new(
        zoom: u8,
        visible_cells: HashSet<CellKey>,
        cells_to_load: HashSet<CellKey>,
        cells_to_remove: HashSet<CellKey>,
    ) -> Self {
        Self {
            zoom,
            visible_cells,
            cells_to_load,
            cells_to_remove,
        }
    }

    /// First frame of a viewport: everything visible must load.
    pub fn initial(zoom: u8, visible_cells: impl IntoIterator<Item = CellKey>) -> Self {
        let visible_cells: HashSet<CellKey> = visible_cells.into_iter().collect();
        Self {
            zoom,
            cells_to_load: visible_cells.clone(),
            visible_cells,
            cells_to_remove: HashSet::new(),
        }
    }

    /// The state that follows `self` when `visible_cells` become visible.
    ///
    /// Cells newly visible must load; cells no longer visible are handed to
    /// the removal systems.
    pub fn transition(&self, zoom: u8, visible_cells: impl IntoIterator<Item = CellKey>) -> Self {
        let visible_cells: HashSet<CellKey> = visible_cells.into_iter().collect();
        let cells_to_load = visible_cells
            .difference(&self.visible_cells)
            .copied()
            .collect();
        let cells_to_remove = self
            .visible_cells
            .difference(&visible_cells)
            .copied()
            .collect();
        Self {
            zoom,
            visible_cells,
            cells_to_load,
            cells_to_remove,
        }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn visible_cells(&self) -> &HashSet<CellKey> {
        &self.visible_cells
    }

    pub fn cells_to_load(&self) -> &HashSet<CellKey> {
        &self.cells_to_load
    }

    pub fn cells_to_remove(&self) -> &HashSet<CellKey> {
        &self.cells_to_remove
    }

    pub fn is_visible(&self, cell: &CellKey) -> bool {
        self.visible_cells.contains(cell)
    }

    /// Visible cells as fragment quads (same path).
    pub fn visible_quads(&self) -> HashSet<QuadKey> {
        self.visible_cells.iter().map(|&cell| cell.into()).collect()
    }

    /// Removable cells as fragment quads.
    pub fn quads_to_remove(&self) -> HashSet<QuadKey> {
        self.cells_to_remove.iter().map(|&cell| cell.into()).collect()
    }
}
