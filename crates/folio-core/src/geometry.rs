#![forbid(unsafe_code)]

//! Geometric primitives in CSS pixels.
//!
//! Rectangles are viewport-relative (the same space as
//! `getBoundingClientRect`), with the origin at the top-left of the visible
//! area and `y` growing downwards.

/// An axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: f64,
    /// Top edge (inclusive).
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle at the origin with the given size.
    #[inline]
    pub const fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Top edge. Alias for `self.y`.
    #[inline]
    pub const fn top(&self) -> f64 {
        self.y
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Area in square pixels. Negative extents count as zero.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Check if the rectangle has zero area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Check if a point lies inside the rectangle, edges included.
    #[inline]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Compute the overlap with another rectangle, `None` if they don't overlap.
    pub fn intersection_opt(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if x < right && y < bottom {
            Some(Rect::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    /// Grow (positive) or shrink (negative) each edge by the given margin,
    /// following CSS `rootMargin` semantics. The result never has negative size.
    pub fn outset(&self, margin: Sides) -> Rect {
        let x = self.x - margin.left;
        let y = self.y - margin.top;
        let width = (self.width + margin.left + margin.right).max(0.0);
        let height = (self.height + margin.top + margin.bottom).max(0.0);
        Rect::new(x, y, width, height)
    }

    /// Fraction of this rectangle's area that lies inside `root`, in `[0, 1]`.
    ///
    /// A zero-area rectangle counts as fully visible when its origin lies
    /// inside `root` and invisible otherwise.
    pub fn visible_fraction(&self, root: &Rect) -> f64 {
        if self.is_empty() {
            return if root.contains_point(self.x, self.y) {
                1.0
            } else {
                0.0
            };
        }
        match self.intersection_opt(root) {
            Some(overlap) => (overlap.area() / self.area()).clamp(0.0, 1.0),
            None => 0.0,
        }
    }
}

/// Per-edge pixel offsets (top, right, bottom, left), CSS shorthand order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sides {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Sides {
    /// Create sides in CSS shorthand order.
    #[inline]
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Same offset on every edge.
    #[inline]
    pub const fn all(px: f64) -> Self {
        Self::new(px, px, px, px)
    }

    /// Only the bottom edge.
    #[inline]
    pub const fn bottom_only(px: f64) -> Self {
        Self::new(0.0, 0.0, px, 0.0)
    }
}

/// The visible window onto the document.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// Vertical document scroll offset (`window.scrollY`).
    pub scroll_y: f64,
    /// Viewport width (`window.innerWidth`).
    pub width: f64,
    /// Viewport height (`window.innerHeight`).
    pub height: f64,
}

impl Viewport {
    #[inline]
    pub const fn new(scroll_y: f64, width: f64, height: f64) -> Self {
        Self {
            scroll_y,
            width,
            height,
        }
    }

    /// The viewport box in viewport-relative coordinates.
    #[inline]
    pub const fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_disjoint_rects_is_none() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersection_opt(&b), None);
    }

    #[test]
    fn negative_bottom_margin_shrinks_root() {
        let root = Rect::from_size(800.0, 600.0).outset(Sides::bottom_only(-50.0));
        assert_eq!(root, Rect::new(0.0, 0.0, 800.0, 550.0));
    }

    #[test]
    fn outset_never_goes_negative() {
        let root = Rect::from_size(100.0, 40.0).outset(Sides::all(-60.0));
        assert_eq!(root.width, 0.0);
        assert_eq!(root.height, 0.0);
    }

    #[test]
    fn visible_fraction_half_inside() {
        let root = Rect::from_size(800.0, 600.0);
        let el = Rect::new(0.0, 500.0, 100.0, 200.0);
        assert!((el.visible_fraction(&root) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn visible_fraction_of_empty_rect_uses_origin() {
        let root = Rect::from_size(800.0, 600.0);
        assert_eq!(Rect::new(5.0, 5.0, 0.0, 0.0).visible_fraction(&root), 1.0);
        assert_eq!(Rect::new(5.0, 900.0, 0.0, 0.0).visible_fraction(&root), 0.0);
    }
}
