//! Recursive tile rendering.
//!
//! Every tile is rendered through a *window*: the part of the tile's unit
//! square that lands in the destination rectangle. A snapshot maps its
//! window to source pixels, a sub-tile narrows the window into its inner
//! tile, and a composite clips the window against each child.

use tiny_skia::{FilterQuality, Paint, Pattern, Pixmap, SpreadMode, Transform};

use crate::coord::{cell_unit_rect, Rect};

use super::{Snapshot, Tile};

/// A 2D drawing surface.
pub trait Canvas {
    /// Paint the `src` pixel rectangle of `image` into `dst`.
    fn draw_image(&mut self, image: &Snapshot, src: Rect, dst: Rect);
}

/// Paint `tile` into `dst` on `canvas`.
pub fn render_tile<C: Canvas + ?Sized>(canvas: &mut C, tile: &Tile, dst: Rect) {
    render_window(canvas, tile, Rect::unit(), dst);
}

fn render_window<C: Canvas + ?Sized>(canvas: &mut C, tile: &Tile, window: Rect, dst: Rect) {
    match tile {
        Tile::Empty => {}
        Tile::Snapshot(image) => {
            let width = image.width() as f64;
            let height = image.height() as f64;
            let src = Rect::new(
                window.x * width,
                window.y * height,
                window.width * width,
                window.height * height,
            );
            canvas.draw_image(image, src, dst);
        }
        Tile::SubTile { tile, key } => {
            let sub = cell_unit_rect(key);
            render_window(canvas, tile, window.within(&sub), dst);
        }
        Tile::Composite(children) => {
            for (child, key) in children {
                let area = cell_unit_rect(key);
                let Some(visible) = area.intersect(&window) else {
                    continue;
                };
                let child_window = visible.relative_to(&area);
                let child_dst = visible.relative_to(&window).within(&dst);
                render_window(canvas, child, child_window, child_dst);
            }
        }
    }
}

/// [`Canvas`] backed by a `tiny_skia::Pixmap`.
pub struct PixmapCanvas {
    pixmap: Pixmap,
}

impl PixmapCanvas {
    /// A transparent canvas; `None` for zero dimensions.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Pixmap::new(width, height).map(Self::from_pixmap)
    }

    /// Draw onto an existing pixmap.
    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self { pixmap }
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }
}

impl Canvas for PixmapCanvas {
    fn draw_image(&mut self, image: &Snapshot, src: Rect, dst: Rect) {
        if src.is_empty() || dst.is_empty() {
            return;
        }
        let Some(target) = tiny_skia::Rect::from_xywh(
            dst.x as f32,
            dst.y as f32,
            dst.width as f32,
            dst.height as f32,
        ) else {
            return;
        };

        // Pattern space is source pixels; map src onto dst.
        let sx = dst.width / src.width;
        let sy = dst.height / src.height;
        let transform = Transform::from_row(
            sx as f32,
            0.0,
            0.0,
            sy as f32,
            (dst.x - src.x * sx) as f32,
            (dst.y - src.y * sy) as f32,
        );

        let paint = Paint {
            shader: Pattern::new(
                image.pixmap().as_ref(),
                SpreadMode::Pad,
                FilterQuality::Nearest,
                1.0,
                transform,
            ),
            ..Paint::default()
        };
        self.pixmap
            .fill_rect(target, &paint, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use tiny_skia::{Color, PremultipliedColorU8};

    use super::*;
    use crate::coord::CellKey;

    #[derive(Default)]
    struct RecordingCanvas {
        calls: Vec<(Rect, Rect)>,
    }

    impl Canvas for RecordingCanvas {
        fn draw_image(&mut self, _image: &Snapshot, src: Rect, dst: Rect) {
            self.calls.push((src, dst));
        }
    }

    fn cell(s: &str) -> CellKey {
        s.parse().unwrap()
    }

    fn snapshot(size: u32) -> Snapshot {
        Snapshot::solid(size, size, Color::WHITE).unwrap()
    }

    #[test]
    fn test_empty_draws_nothing() {
        let mut canvas = RecordingCanvas::default();
        render_tile(&mut canvas, &Tile::Empty, Rect::new(0.0, 0.0, 8.0, 8.0));
        assert!(canvas.calls.is_empty());
    }

    #[test]
    fn test_snapshot_draws_whole_image() {
        let mut canvas = RecordingCanvas::default();
        let dst = Rect::new(10.0, 20.0, 8.0, 8.0);
        render_tile(&mut canvas, &Tile::Snapshot(snapshot(4)), dst);
        assert_eq!(canvas.calls, vec![(Rect::new(0.0, 0.0, 4.0, 4.0), dst)]);
    }

    #[test]
    fn test_sub_tile_crops_source() {
        let mut canvas = RecordingCanvas::default();
        let dst = Rect::new(0.0, 0.0, 8.0, 8.0);
        let tile = Tile::sub_tile(Tile::Snapshot(snapshot(4)), cell("3"));
        render_tile(&mut canvas, &tile, dst);
        assert_eq!(canvas.calls, vec![(Rect::new(2.0, 2.0, 2.0, 2.0), dst)]);
    }

    #[test]
    fn test_composite_maps_children_to_quadrants() {
        let mut canvas = RecordingCanvas::default();
        let tile = Tile::Composite(vec![
            (Tile::Snapshot(snapshot(4)), cell("0")),
            (Tile::Empty, cell("1")),
            (Tile::Snapshot(snapshot(4)), cell("3")),
        ]);
        render_tile(&mut canvas, &tile, Rect::new(0.0, 0.0, 8.0, 8.0));

        let full = Rect::new(0.0, 0.0, 4.0, 4.0);
        assert_eq!(
            canvas.calls,
            vec![
                (full, Rect::new(0.0, 0.0, 4.0, 4.0)),
                (full, Rect::new(4.0, 4.0, 4.0, 4.0)),
            ]
        );
    }

    #[test]
    fn test_sub_tile_of_composite_clips_children() {
        let mut canvas = RecordingCanvas::default();
        let composite = Tile::Composite(vec![
            (Tile::Snapshot(snapshot(4)), cell("0")),
            (Tile::Snapshot(snapshot(4)), cell("1")),
        ]);
        let tile = Tile::sub_tile(composite, cell("1"));
        let dst = Rect::new(0.0, 0.0, 8.0, 8.0);
        render_tile(&mut canvas, &tile, dst);

        // Only the north-east child lies inside quadrant 1.
        assert_eq!(canvas.calls, vec![(Rect::new(0.0, 0.0, 4.0, 4.0), dst)]);
    }

    #[test]
    fn test_pixmap_canvas_fills_destination() {
        let red = Snapshot::solid(4, 4, Color::from_rgba8(255, 0, 0, 255)).unwrap();
        let mut canvas = PixmapCanvas::new(8, 8).unwrap();
        render_tile(
            &mut canvas,
            &Tile::Snapshot(red),
            Rect::new(2.0, 2.0, 4.0, 4.0),
        );

        let pixmap = canvas.into_pixmap();
        assert_eq!(pixmap.pixel(4, 4).unwrap().red(), 255);
        assert_eq!(pixmap.pixel(0, 0).unwrap().alpha(), 0);
    }

    #[test]
    fn test_pixmap_canvas_paints_sub_tile_quadrant() {
        // 2×2 image: north-east pixel blue, the rest red.
        let mut pixmap = Pixmap::new(2, 2).unwrap();
        let red = PremultipliedColorU8::from_rgba(255, 0, 0, 255).unwrap();
        let blue = PremultipliedColorU8::from_rgba(0, 0, 255, 255).unwrap();
        pixmap.pixels_mut().copy_from_slice(&[red, blue, red, red]);

        let tile = Tile::sub_tile(Tile::Snapshot(Snapshot::new(pixmap)), cell("1"));
        let mut canvas = PixmapCanvas::new(8, 8).unwrap();
        render_tile(&mut canvas, &tile, Rect::new(0.0, 0.0, 8.0, 8.0));

        let center = canvas.pixmap().pixel(4, 4).unwrap();
        assert_eq!(center.blue(), 255);
        assert_eq!(center.red(), 0);
    }
}
