//! Per-frame entities.
//!
//! One [`CellEntity`] exists per (layer, cell) on screen and one
//! [`FragmentEntity`] per resident geometry fragment. Each store enforces
//! that a key maps to at most one live entity.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::coord::{CellKey, FragmentKey, Rect};
use crate::geometry::MultiPolygon;
use crate::tile::Tile;

/// Handle of a registered basemap layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// What a layer draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Imagery tiles; cells get donor placeholders.
    Basemap,
    /// Cell outlines for debugging; no imagery, no donors.
    Debug,
}

/// Which renderer paints an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererKind {
    Tile,
    DebugCell,
    Fragment,
}

/// Renderer attached to an entity, toggled without destroying the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererRef {
    pub kind: RendererKind,
    pub active: bool,
}

impl RendererRef {
    pub fn active(kind: RendererKind) -> Self {
        Self { kind, active: true }
    }
}

// =============================================================================
// Cells
// =============================================================================

/// A basemap cell on one layer.
#[derive(Debug, Clone)]
pub struct CellEntity {
    pub layer: LayerId,
    pub cell: CellKey,
    /// Current paintable value, `None` until something is known.
    pub tile: Option<Tile>,
    /// True once the cell's own tile arrived (as opposed to a donor).
    pub authoritative: bool,
    /// Set by the tile source; such cells are never donors.
    pub non_cacheable: bool,
    pub world_rect: Rect,
    pub screen_size: (f64, f64),
    pub renderer: RendererRef,
    pub created_frame: u64,
}

/// Cell entities keyed by (layer, cell).
#[derive(Debug, Default)]
pub struct CellStore {
    entities: HashMap<(LayerId, CellKey), CellEntity>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entity. Returns false, leaving the store untouched, if
    /// the (layer, cell) already has one.
    pub fn insert(&mut self, entity: CellEntity) -> bool {
        match self.entities.entry((entity.layer, entity.cell)) {
            Entry::Vacant(slot) => {
                slot.insert(entity);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, layer: LayerId, cell: &CellKey) -> Option<&CellEntity> {
        self.entities.get(&(layer, *cell))
    }

    pub fn get_mut(&mut self, layer: LayerId, cell: &CellKey) -> Option<&mut CellEntity> {
        self.entities.get_mut(&(layer, *cell))
    }

    pub fn contains(&self, layer: LayerId, cell: &CellKey) -> bool {
        self.entities.contains_key(&(layer, *cell))
    }

    /// True if any layer has an entity for `cell`.
    pub fn contains_cell(&self, cell: &CellKey) -> bool {
        self.entities.keys().any(|(_, key)| key == cell)
    }

    pub fn remove(&mut self, layer: LayerId, cell: &CellKey) -> Option<CellEntity> {
        self.entities.remove(&(layer, *cell))
    }

    /// Remove the cell's entity on every layer; returns how many went.
    pub fn remove_cell(&mut self, cell: &CellKey) -> usize {
        let before = self.entities.len();
        self.entities.retain(|(_, key), _| key != cell);
        before - self.entities.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellEntity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CellEntity> {
        self.entities.values_mut()
    }

    /// Keep only entities for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&CellEntity) -> bool) {
        self.entities.retain(|_, entity| keep(entity));
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Tiles of `layer` usable as donors: present, non-empty and cacheable.
    pub fn donor_tiles(&self, layer: LayerId) -> HashMap<CellKey, Tile> {
        self.entities
            .values()
            .filter(|entity| entity.layer == layer && !entity.non_cacheable)
            .filter_map(|entity| match &entity.tile {
                Some(tile) if !tile.is_empty() => Some((entity.cell, tile.clone())),
                _ => None,
            })
            .collect()
    }
}

// =============================================================================
// Fragments
// =============================================================================

/// A resident geometry fragment.
#[derive(Debug, Clone)]
pub struct FragmentEntity {
    pub key: FragmentKey,
    pub geometry: Arc<MultiPolygon>,
    pub world_rect: Option<Rect>,
    pub non_cacheable: bool,
    pub renderer: RendererRef,
    /// Last frame a region composition referenced this fragment.
    pub last_used_frame: u64,
}

impl FragmentEntity {
    pub fn new(key: FragmentKey, geometry: Arc<MultiPolygon>, frame: u64) -> Self {
        let world_rect = geometry.bbox();
        Self {
            key,
            geometry,
            world_rect,
            non_cacheable: false,
            renderer: RendererRef::active(RendererKind::Fragment),
            last_used_frame: frame,
        }
    }
}

/// Fragment entities keyed by fragment key.
#[derive(Debug, Default)]
pub struct FragmentStore {
    entities: HashMap<FragmentKey, FragmentEntity>,
}

impl FragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entity. Returns false if the key already has one.
    pub fn insert(&mut self, entity: FragmentEntity) -> bool {
        match self.entities.entry(entity.key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(entity);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, key: &FragmentKey) -> Option<&FragmentEntity> {
        self.entities.get(key)
    }

    pub fn get_mut(&mut self, key: &FragmentKey) -> Option<&mut FragmentEntity> {
        self.entities.get_mut(key)
    }

    pub fn contains(&self, key: &FragmentKey) -> bool {
        self.entities.contains_key(key)
    }

    pub fn remove(&mut self, key: &FragmentKey) -> Option<FragmentEntity> {
        self.entities.remove(key)
    }

    /// Mark a fragment as used in `frame`.
    pub fn touch(&mut self, key: &FragmentKey, frame: u64) {
        if let Some(entity) = self.entities.get_mut(key) {
            entity.last_used_frame = frame;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FragmentEntity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
