//! Basemap cell loading.
//!
//! Creates an entity for every cell that must load and gives it a donor
//! tile built from what the layer already has resident. Real tiles come
//! from an external downloader through the engine's tile sink and replace
//! the donor when they arrive.

use std::collections::HashMap;

use tracing::trace;

use crate::coord::{tile_rect, world_to_screen, CellKey};
use crate::entity::{CellEntity, LayerId, LayerKind, RendererKind, RendererRef};
use crate::executor::Mailbox;
use crate::tile::{DonorTileCalculator, Tile};

use super::{FrameContext, System};

/// A finished tile handed over by the external downloader.
#[derive(Debug, Clone)]
pub struct TileDelivery {
    pub layer: LayerId,
    pub cell: CellKey,
    pub tile: Tile,
    /// False for tiles that must never be donors (e.g. error tiles).
    pub cacheable: bool,
}

/// Writes `cells`: creates entities and applies tile deliveries.
#[derive(Debug)]
pub struct BasemapCellLoadingSystem {
    deliveries: Mailbox<TileDelivery>,
}

impl BasemapCellLoadingSystem {
    pub fn new(deliveries: Mailbox<TileDelivery>) -> Self {
        Self { deliveries }
    }
}

impl System for BasemapCellLoadingSystem {
    fn name(&self) -> &'static str {
        "basemap_cell_loading"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        let viewport = ctx.viewport;
        let state = &mut *ctx.state;
        let to_load = viewport.cells_to_load();

        let mut pending = Vec::new();
        for delivery in self.deliveries.take() {
            if state.cells.contains(delivery.layer, &delivery.cell) {
                apply(state, delivery);
            } else if to_load.contains(&delivery.cell) {
                pending.push(delivery);
            } else {
                trace!(layer = %delivery.layer, cell = %delivery.cell, "Discarding tile for unknown cell");
            }
        }

        for layer in state.layers.clone() {
            let missing: Vec<CellKey> = to_load
                .iter()
                .filter(|cell| !state.cells.contains(layer.id, cell))
                .copied()
                .collect();
            if missing.is_empty() {
                continue;
            }

            let donors = match layer.kind {
                LayerKind::Basemap => {
                    Some(DonorTileCalculator::new(state.cells.donor_tiles(layer.id)))
                }
                LayerKind::Debug => None,
            };
            let renderer = match layer.kind {
                LayerKind::Basemap => RendererKind::Tile,
                LayerKind::Debug => RendererKind::DebugCell,
            };

            for cell in missing {
                let world_rect = tile_rect(&state.map_rect, &cell);
                let screen_size =
                    world_to_screen((world_rect.width, world_rect.height), viewport.zoom());
                let tile = donors.as_ref().map(|calc| calc.create_donor_tile(&cell));
                state.cells.insert(CellEntity {
                    layer: layer.id,
                    cell,
                    tile,
                    authoritative: false,
                    non_cacheable: false,
                    world_rect,
                    screen_size,
                    renderer: RendererRef::active(renderer),
                    created_frame: state.frame,
                });
            }
        }

        // Latest delivery wins when several arrive for one cell.
        let mut latest: HashMap<(LayerId, CellKey), TileDelivery> = HashMap::new();
        for delivery in pending {
            latest.insert((delivery.layer, delivery.cell), delivery);
        }
        for delivery in latest.into_values() {
            if state.cells.contains(delivery.layer, &delivery.cell) {
                apply(state, delivery);
            }
        }
    }
}

fn apply(state: &mut super::FrameState, delivery: TileDelivery) {
    if let Some(entity) = state.cells.get_mut(delivery.layer, &delivery.cell) {
        entity.tile = Some(delivery.tile);
        entity.authoritative = true;
        entity.non_cacheable = !delivery.cacheable;
    }
}
