//! Donor tile synthesis.
//!
//! While a cell's own tile is in flight, it borrows pixels from tiles that
//! are already resident at other zoom levels:
//!
//! 1. the nearest resident ancestor, cropped to the cell (`SubTile`)
//! 2. otherwise resident descendants, if they fully cover the cell
//!    (`Composite`, recursively)
//! 3. otherwise nothing (`Empty`)

use std::collections::HashMap;

use crate::coord::CellKey;

use super::Tile;

/// Computes donor tiles from a snapshot of one layer's resident tiles.
///
/// Built once per frame from the layer's cells; only cacheable, non-empty
/// tiles belong in the index.
#[derive(Debug, Default)]
pub struct DonorTileCalculator {
    tiles: HashMap<CellKey, Tile>,
    max_depth: u8,
}

impl DonorTileCalculator {
    /// Create a calculator over the given resident tiles.
    pub fn new(tiles: HashMap<CellKey, Tile>) -> Self {
        let max_depth = tiles.keys().map(CellKey::len).max().unwrap_or(0);
        Self { tiles, max_depth }
    }

    /// Number of resident tiles available as donors.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Returns true when there is nothing to donate.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Best placeholder for `cell`.
    pub fn create_donor_tile(&self, cell: &CellKey) -> Tile {
        self.from_ancestor(cell)
            .or_else(|| self.from_descendants(cell))
            .unwrap_or(Tile::Empty)
    }

    fn from_ancestor(&self, cell: &CellKey) -> Option<Tile> {
        cell.ancestors().find_map(|ancestor| {
            let tile = self.tiles.get(&ancestor)?;
            let suffix = cell.suffix_after(&ancestor).ok()?;
            Some(Tile::sub_tile(tile.clone(), suffix))
        })
    }

    fn from_descendants(&self, cell: &CellKey) -> Option<Tile> {
        if cell.len() >= self.max_depth {
            return None;
        }

        let children = cell.children();
        if children.len() != 4 {
            return None;
        }

        let mut parts = Vec::with_capacity(4);
        for (digit, child) in (0u8..).zip(children) {
            let tile = match self.tiles.get(&child) {
                Some(tile) => tile.clone(),
                None => self.from_descendants(&child)?,
            };
            let position = CellKey::from_digits(&[digit]).ok()?;
            parts.push((tile, position));
        }
        Some(Tile::Composite(parts))
    }
}
