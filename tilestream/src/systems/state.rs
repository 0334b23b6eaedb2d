//! Shared per-frame state.
//!
//! Every field has one writing system per frame unless noted. Systems run
//! in a fixed order, so a reader either sees this frame's value (writer
//! ran earlier) or last frame's (writer runs later).
//!
//! | Field | Written by |
//! |-------|------------|
//! | `requested`, `obsolete`, `requested_zoom` | fragment update |
//! | `downloading`, `downloaded` | fragment downloading |
//! | `streaming` | set by downloading; cleared by downloading, emit, removal |
//! | `cached` | added by emit, removed by fragment removal |
//! | `emitted`, `empty_fragments` | fragment emit |
//! | `compositions`, `active_fragments` | region emit |
//! | `fragments` | created by emit, destroyed by fragment removal |
//! | `cells` | created by cell loading, destroyed by cell removal |

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::cache::{EmptyFragmentIndex, FragmentData};
use crate::coord::{FragmentKey, QuadKey, Rect, RegionId};
use crate::entity::{CellStore, FragmentStore, LayerId, LayerKind};

/// A registered basemap layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layer {
    pub id: LayerId,
    pub kind: LayerKind,
}

/// Fragments a region is drawn with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionComposition {
    /// Zoom the fragments belong to, `None` before the first fragment.
    pub zoom: Option<u8>,
    pub fragments: BTreeSet<FragmentKey>,
    /// True once every wanted fragment of `zoom` is resident.
    pub complete: bool,
}

/// State threaded through every system each frame.
#[derive(Debug)]
pub struct FrameState {
    pub frame: u64,
    /// World rectangle of the zoom-0 map.
    pub map_rect: Rect,
    pub layers: Vec<Layer>,
    pub regions: BTreeSet<RegionId>,

    pub requested: HashSet<FragmentKey>,
    pub obsolete: HashSet<FragmentKey>,
    pub requested_zoom: Option<u8>,

    pub downloading: HashSet<FragmentKey>,
    pub downloaded: HashMap<FragmentKey, FragmentData>,
    pub streaming: HashSet<FragmentKey>,

    pub cached: HashSet<FragmentKey>,
    pub emitted: HashSet<FragmentKey>,
    pub empty_fragments: EmptyFragmentIndex,

    pub compositions: HashMap<RegionId, RegionComposition>,
    pub active_fragments: HashSet<FragmentKey>,

    pub fragments: FragmentStore,
    pub cells: CellStore,
}

impl FrameState {
    pub fn new(map_rect: Rect) -> Self {
        Self {
            frame: 0,
            map_rect,
            layers: Vec::new(),
            regions: BTreeSet::new(),
            requested: HashSet::new(),
            obsolete: HashSet::new(),
            requested_zoom: None,
            downloading: HashSet::new(),
            downloaded: HashMap::new(),
            streaming: HashSet::new(),
            cached: HashSet::new(),
            emitted: HashSet::new(),
            empty_fragments: EmptyFragmentIndex::new(),
            compositions: HashMap::new(),
            active_fragments: HashSet::new(),
            fragments: FragmentStore::new(),
            cells: CellStore::new(),
        }
    }

    /// Every (region, quad) pair over the registered regions.
    pub fn region_keys<'a>(
        &'a self,
        quads: impl IntoIterator<Item = &'a QuadKey> + Clone + 'a,
    ) -> impl Iterator<Item = FragmentKey> + 'a {
        self.regions.iter().flat_map(move |region_id| {
            quads
                .clone()
                .into_iter()
                .map(move |quad| FragmentKey::new(region_id.clone(), *quad))
        })
    }
}

impl Default for FrameState {
    fn default() -> Self {
        Self::new(Rect::unit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_keys_cover_all_pairs() {
        let mut state = FrameState::default();
        state.regions.insert(RegionId::new("foo"));
        state.regions.insert(RegionId::new("bar"));

        let quads: Vec<QuadKey> = vec!["0".parse().unwrap(), "1".parse().unwrap()];
        let keys: HashSet<FragmentKey> = state.region_keys(&quads).collect();

        assert_eq!(keys.len(), 4);
        assert!(keys.contains(&FragmentKey::new("bar", quads[1])));
    }
}
