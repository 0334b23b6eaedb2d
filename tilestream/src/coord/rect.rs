//! Axis-aligned rectangles in world, screen, and unit-square space.

/// An axis-aligned rectangle with its origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The unit square `[0, 1] × [0, 1]`.
    pub const fn unit() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Overlap of two rectangles, or `None` when they share no area.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        let rect = Rect::new(x, y, right - x, bottom - y);
        (!rect.is_empty()).then_some(rect)
    }

    /// Map a rectangle expressed in `outer`'s unit space to absolute space.
    ///
    /// `Rect::new(0.5, 0.0, 0.5, 0.5).within(&outer)` is the north-east
    /// quadrant of `outer`.
    pub fn within(&self, outer: &Rect) -> Rect {
        Rect::new(
            outer.x + self.x * outer.width,
            outer.y + self.y * outer.height,
            self.width * outer.width,
            self.height * outer.height,
        )
    }

    /// Inverse of [`Rect::within`]: express `self` in `outer`'s unit space.
    pub fn relative_to(&self, outer: &Rect) -> Rect {
        Rect::new(
            (self.x - outer.x) / outer.width,
            (self.y - outer.y) / outer.height,
            self.width / outer.width,
            self.height / outer.height,
        )
    }
}
