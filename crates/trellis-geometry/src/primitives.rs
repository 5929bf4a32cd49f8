//! Size, offset, and rect value types.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// A width/height pair in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns the size with negative or non-finite components clamped to
    /// zero. Layout never produces a fault for degenerate input.
    pub fn clamped(self) -> Self {
        Self {
            width: sanitize(self.width).max(0.0),
            height: sanitize(self.height).max(0.0),
        }
    }

    /// Shrinks the size by `insets` on all edges, clamping at zero.
    pub fn deflate(self, insets: super::EdgeInsets) -> Self {
        Size {
            width: self.width - insets.horizontal_sum(),
            height: self.height - insets.vertical_sum(),
        }
        .clamped()
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn max(self, other: Size) -> Size {
        Size {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}x{:.1}", self.width, self.height)
    }
}

/// An x/y translation in pixels, relative to some origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

impl Offset {
    pub const ZERO: Offset = Offset { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance from the origin.
    pub fn distance(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Offset {
    fn add_assign(&mut self, rhs: Offset) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Offset {
    type Output = Offset;

    fn sub(self, rhs: Offset) -> Offset {
        Offset::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// An axis-aligned rectangle (origin + size).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub origin: Offset,
    pub size: Size,
}

impl Rect {
    pub fn new(origin: Offset, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn from_size(size: Size) -> Self {
        Self {
            origin: Offset::ZERO,
            size,
        }
    }

    pub fn left(self) -> f32 {
        self.origin.x
    }

    pub fn top(self) -> f32 {
        self.origin.y
    }

    pub fn right(self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn bottom(self) -> f32 {
        self.origin.y + self.size.height
    }

    /// Whether `point` lies inside the rect. Edges count as inside so a
    /// touch on the boundary still hits the node.
    pub fn contains(self, point: Offset) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// Whether `other` lies entirely within this rect.
    pub fn contains_rect(self, other: Rect) -> bool {
        other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Translates the rect by `offset`.
    pub fn translate(self, offset: Offset) -> Rect {
        Rect::new(self.origin + offset, self.size)
    }
}
