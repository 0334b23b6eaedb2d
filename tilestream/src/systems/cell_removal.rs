//! Basemap cell eviction.
//!
//! Cells leaving the viewport are only hidden at first. They join a
//! survivor list and are destroyed oldest first once the list grows past
//! the tile budget, so panning back and forth does not reload anything.
//! Non-cacheable cells skip the grace period.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::coord::CellKey;

use super::{FrameContext, System};

#[derive(Debug)]
pub struct BasemapCellsRemovingSystem {
    tile_cache_limit: usize,
    survivors: VecDeque<CellKey>,
    survivor_set: HashSet<CellKey>,
}

impl BasemapCellsRemovingSystem {
    pub fn new(tile_cache_limit: usize) -> Self {
        Self {
            tile_cache_limit,
            survivors: VecDeque::new(),
            survivor_set: HashSet::new(),
        }
    }

    /// Hidden cells still resident, oldest first.
    pub fn survivors(&self) -> impl Iterator<Item = &CellKey> {
        self.survivors.iter()
    }

    fn strike(&mut self, cells: &HashSet<CellKey>) {
        if cells.is_empty() {
            return;
        }
        self.survivors.retain(|cell| !cells.contains(cell));
        self.survivor_set.retain(|cell| !cells.contains(cell));
    }
}

impl System for BasemapCellsRemovingSystem {
    fn name(&self) -> &'static str {
        "basemap_cells_removing"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        let visible = ctx.viewport.visible_cells();
        let to_remove = ctx.viewport.cells_to_remove();
        let cells = &mut ctx.state.cells;

        for entity in cells.iter_mut() {
            entity.renderer.active = visible.contains(&entity.cell);
        }

        let mut destroyed: HashSet<CellKey> = HashSet::new();
        let survivor_set = &self.survivor_set;
        cells.retain(|entity| {
            let doomed = entity.non_cacheable
                && !visible.contains(&entity.cell)
                && (to_remove.contains(&entity.cell) || survivor_set.contains(&entity.cell));
            if doomed {
                destroyed.insert(entity.cell);
            }
            !doomed
        });
        destroyed.retain(|cell| !cells.contains_cell(cell));
        self.strike(&destroyed);

        // Cells back on screen are no longer survivors.
        let returned: HashSet<CellKey> = self
            .survivor_set
            .iter()
            .filter(|cell| visible.contains(cell))
            .copied()
            .collect();
        self.strike(&returned);

        for cell in to_remove {
            if !visible.contains(cell) && cells.contains_cell(cell) && self.survivor_set.insert(*cell)
            {
                self.survivors.push_back(*cell);
            }
        }

        let mut evicted = 0usize;
        while self.survivors.len() > self.tile_cache_limit {
            let Some(cell) = self.survivors.pop_front() else {
                break;
            };
            self.survivor_set.remove(&cell);
            evicted += cells.remove_cell(&cell);
        }

        if evicted > 0 || !destroyed.is_empty() {
            debug!(
                evicted,
                non_cacheable = destroyed.len(),
                survivors = self.survivors.len(),
                "Removed basemap cells"
            );
        }
    }
}
