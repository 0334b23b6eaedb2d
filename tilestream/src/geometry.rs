//! Fragment geometry payloads.
//!
//! Geometry arrives already decoded from the fragment service; the engine
//! only stores it and reports its bounding box.

use crate::coord::Rect;

/// A point in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A closed ring of points.
pub type Ring = Vec<Point>;

/// A polygon: the first ring is the outer boundary, the rest are holes.
pub type Polygon = Vec<Ring>;

/// The geometry of one region fragment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiPolygon {
    polygons: Vec<Polygon>,
}

impl MultiPolygon {
    /// Create a multi-polygon from its polygons.
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    /// An axis-aligned square, mostly useful for fixtures.
    pub fn square(x: f64, y: f64, size: f64) -> Self {
        Self::new(vec![vec![vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
            Point::new(x, y),
        ]]])
    }

    /// The polygons of this geometry.
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// True when there is no point at all.
    pub fn is_empty(&self) -> bool {
        self.points().next().is_none()
    }

    /// Total number of points over all rings.
    pub fn point_count(&self) -> usize {
        self.points().count()
    }

    /// Bounding box, or `None` for empty geometry.
    pub fn bbox(&self) -> Option<Rect> {
        let mut points = self.points();
        let first = points.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    fn points(&self) -> impl Iterator<Item = &Point> {
        self.polygons.iter().flatten().flatten()
    }
}
