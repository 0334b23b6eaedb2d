//! Renderable basemap tiles.
//!
//! A [`Tile`] is one of four immutable shapes. Real tiles are decoded
//! snapshots; the other shapes are synthesized from already-resident tiles
//! (see [`DonorTileCalculator`]) so a cell always has something to paint
//! while its own tile streams in.
//!
//! ```text
//! Snapshot ──────────────── decoded image, painted as-is
//! SubTile(inner, key) ───── crop `inner` to descendant `key`
//! Composite[(tile, key)] ── mosaic of children, each in sub-rect `key`
//! Empty ─────────────────── nothing to paint
//! ```

mod donor;
mod render;

pub use donor::DonorTileCalculator;
pub use render::{render_tile, Canvas, PixmapCanvas};

use std::fmt;
use std::sync::Arc;

use tiny_skia::{Color, Pixmap};

use crate::coord::CellKey;

/// A decoded, ready-to-paint image.
///
/// Clones share the same pixels. Equality is identity: two snapshots are
/// equal only if they share the same image.
#[derive(Clone)]
pub struct Snapshot {
    pixmap: Arc<Pixmap>,
}

impl Snapshot {
    /// Wrap a decoded pixmap.
    pub fn new(pixmap: Pixmap) -> Self {
        Self {
            pixmap: Arc::new(pixmap),
        }
    }

    /// A snapshot filled with one color.
    ///
    /// Returns `None` for zero dimensions.
    pub fn solid(width: u32, height: u32, color: Color) -> Option<Self> {
        let mut pixmap = Pixmap::new(width, height)?;
        pixmap.fill(color);
        Some(Self::new(pixmap))
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// The underlying pixels.
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pixmap, &other.pixmap)
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot({}×{})", self.width(), self.height())
    }
}

/// One renderable tile shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Tile {
    /// Decoded image.
    Snapshot(Snapshot),
    /// The sub-rectangle of an ancestor tile addressed by `key`.
    SubTile { tile: Arc<Tile>, key: CellKey },
    /// Children mapped into the sub-rectangles addressed by their keys.
    Composite(Vec<(Tile, CellKey)>),
    /// Nothing to paint.
    Empty,
}

impl Tile {
    /// Crop `tile` to the descendant addressed by `key`.
    ///
    /// Nested crops collapse into one: cropping `SubTile(t, a)` to `b`
    /// yields `SubTile(t, a + b)`. Cropping an empty tile stays empty, and a
    /// root key returns the tile unchanged.
    pub fn sub_tile(tile: Tile, key: CellKey) -> Tile {
        if key.is_empty() {
            return tile;
        }
        match tile {
            Tile::Empty => Tile::Empty,
            Tile::SubTile {
                tile: inner,
                key: prefix,
            } => match prefix.concat(&key) {
                Ok(key) => Tile::SubTile { tile: inner, key },
                Err(_) => Tile::SubTile {
                    tile: Arc::new(Tile::SubTile { tile: inner, key: prefix }),
                    key,
                },
            },
            other => Tile::SubTile {
                tile: Arc::new(other),
                key,
            },
        }
    }

    /// Returns true for [`Tile::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Tile::Empty)
    }
}
