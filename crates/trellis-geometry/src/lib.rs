//! Geometry primitives shared by the Trellis layout and paint pipeline.
//!
//! Everything in this crate is a plain value type: sizes, offsets, rects,
//! dimensions, alignments, and the layout constraint passed down during the
//! measure pass. Invalid geometry (negative or NaN components) is clamped to
//! zero rather than rejected so that a bad property value never faults a
//! frame.

mod alignment;
mod constraint;
mod dimension;
mod primitives;

pub use alignment::Alignment;
pub use constraint::{EdgeInsets, LayoutConstraint};
pub use dimension::Dimension;
pub use primitives::{Offset, Rect, Size};

/// Main axis of a linear container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    #[default]
    Vertical,
}

impl Axis {
    /// Returns the extent of `size` along this axis.
    pub fn main(self, size: Size) -> f32 {
        match self {
            Axis::Horizontal => size.width,
            Axis::Vertical => size.height,
        }
    }

    /// Returns the extent of `size` across this axis.
    pub fn cross(self, size: Size) -> f32 {
        match self {
            Axis::Horizontal => size.height,
            Axis::Vertical => size.width,
        }
    }

    /// Builds a size from main- and cross-axis extents.
    pub fn pack(self, main: f32, cross: f32) -> Size {
        match self {
            Axis::Horizontal => Size::new(main, cross),
            Axis::Vertical => Size::new(cross, main),
        }
    }
}

/// Horizontal layout direction. `Auto` resolves against the pipeline-wide
/// direction at layout time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextDirection {
    #[default]
    Auto,
    Ltr,
    Rtl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_main_cross_roundtrip() {
        let size = Size::new(30.0, 40.0);
        assert_eq!(Axis::Horizontal.main(size), 30.0);
        assert_eq!(Axis::Horizontal.cross(size), 40.0);
        assert_eq!(Axis::Vertical.main(size), 40.0);
        assert_eq!(Axis::Vertical.pack(40.0, 30.0), size);
    }
}
