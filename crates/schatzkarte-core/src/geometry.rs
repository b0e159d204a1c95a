//! Screen geometry for the floating frame, in CSS pixels.

use serde::{Deserialize, Serialize};

/// A point on screen (top-left origin).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise offset from `origin` to `self`.
    pub fn delta_from(&self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }

    pub fn offset(&self, delta: Point) -> Point {
        Point::new(self.x + delta.x, self.y + delta.y)
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Grows (or shrinks) by `delta` without going below `floor`.
    pub fn resized(&self, delta: Point, floor: Size) -> Size {
        Size::new(
            (self.width + delta.x).max(floor.width),
            (self.height + delta.y).max(floor.height),
        )
    }

    /// Scales both sides by `fraction`, keeping at least `floor`.
    pub fn scaled(&self, fraction: f64, floor: Size) -> Size {
        Size::new(
            (self.width * fraction).max(floor.width),
            (self.height * fraction).max(floor.height),
        )
    }
}

/// The visible browser area.
pub type Viewport = Size;

/// Position and size of the floating frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub position: Point,
    pub size: Size,
}

impl Frame {
    pub const fn new(position: Point, size: Size) -> Self {
        Self { position, size }
    }

    /// A frame of `size` in the bottom-right corner, `margin` away from both edges.
    pub fn anchored_bottom_right(size: Size, viewport: Viewport, margin: f64) -> Self {
        let x = (viewport.width - size.width - margin).max(0.0);
        let y = (viewport.height - size.height - margin).max(0.0);
        Self::new(Point::new(x, y), size)
    }

    /// A frame of `size` centred in the viewport.
    pub fn centered(size: Size, viewport: Viewport) -> Self {
        let x = ((viewport.width - size.width) / 2.0).max(0.0);
        let y = ((viewport.height - size.height) / 2.0).max(0.0);
        Self::new(Point::new(x, y), size)
    }

    /// Clamps `position` so that at least `min_visible` pixels of the frame
    /// stay inside the viewport horizontally and the title bar (top edge)
    /// stays reachable vertically.
    pub fn clamp_position(position: Point, size: Size, viewport: Viewport, min_visible: f64) -> Point {
        let min_x = min_visible - size.width;
        let max_x = (viewport.width - min_visible).max(min_x);
        let max_y = (viewport.height - min_visible).max(0.0);
        Point::new(position.x.clamp(min_x, max_x), position.y.clamp(0.0, max_y))
    }

    /// Returns this frame with its position clamped into `viewport`.
    pub fn clamped(&self, viewport: Viewport, min_visible: f64) -> Self {
        Self::new(
            Self::clamp_position(self.position, self.size, viewport, min_visible),
            self.size,
        )
    }
}
