//! Intake handle for basemap tiles.

use crate::coord::CellKey;
use crate::entity::LayerId;
use crate::executor::Mailbox;
use crate::systems::TileDelivery;
use crate::tile::Tile;

/// Hands finished tiles to the engine from any thread.
///
/// Deliveries are applied on the next frame. A delivery for a cell that no
/// longer has an entity by then is dropped.
#[derive(Debug, Clone)]
pub struct TileSink {
    deliveries: Mailbox<TileDelivery>,
}

impl TileSink {
    pub(crate) fn new(deliveries: Mailbox<TileDelivery>) -> Self {
        Self { deliveries }
    }

    /// Deliver a tile that may be cached and used as a donor.
    pub fn deliver(&self, layer: LayerId, cell: CellKey, tile: Tile) {
        self.post(TileDelivery {
            layer,
            cell,
            tile,
            cacheable: true,
        });
    }

    /// Deliver a tile that must never be a donor, such as an error tile.
    pub fn deliver_non_cacheable(&self, layer: LayerId, cell: CellKey, tile: Tile) {
        self.post(TileDelivery {
            layer,
            cell,
            tile,
            cacheable: false,
        });
    }

    pub fn post(&self, delivery: TileDelivery) {
        self.deliveries.post(delivery);
    }
}
