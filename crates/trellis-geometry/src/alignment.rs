//! Two-axis alignment used by stack layout and content placement.

use crate::{Offset, Size};

/// Alignment of a child box within a parent box.
///
/// Components run from -1.0 (start/top) through 0.0 (center) to 1.0
/// (end/bottom), matching the ACE alignment convention.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Alignment {
    pub horizontal: f32,
    pub vertical: f32,
}

impl Alignment {
    pub const TOP_START: Alignment = Alignment::new(-1.0, -1.0);
    pub const TOP_CENTER: Alignment = Alignment::new(0.0, -1.0);
    pub const TOP_END: Alignment = Alignment::new(1.0, -1.0);
    pub const CENTER_START: Alignment = Alignment::new(-1.0, 0.0);
    pub const CENTER: Alignment = Alignment::new(0.0, 0.0);
    pub const CENTER_END: Alignment = Alignment::new(1.0, 0.0);
    pub const BOTTOM_START: Alignment = Alignment::new(-1.0, 1.0);
    pub const BOTTOM_CENTER: Alignment = Alignment::new(0.0, 1.0);
    pub const BOTTOM_END: Alignment = Alignment::new(1.0, 1.0);

    pub const fn new(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Position of a `child`-sized box aligned inside a `parent`-sized box.
    ///
    /// A child larger than the parent produces a negative offset; clipping is
    /// the paint pass's concern.
    pub fn align(self, parent: Size, child: Size) -> Offset {
        Offset::new(
            (parent.width - child.width) * (self.horizontal + 1.0) / 2.0,
            (parent.height - child.height) * (self.vertical + 1.0) / 2.0,
        )
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Alignment::CENTER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_alignment_splits_remaining_space() {
        let offset = Alignment::CENTER.align(Size::new(200.0, 200.0), Size::new(100.0, 100.0));
        assert_eq!(offset, Offset::new(50.0, 50.0));
    }

    #[test]
    fn corner_alignments() {
        let parent = Size::new(100.0, 100.0);
        let child = Size::new(20.0, 20.0);
        assert_eq!(Alignment::TOP_START.align(parent, child), Offset::ZERO);
        assert_eq!(
            Alignment::BOTTOM_END.align(parent, child),
            Offset::new(80.0, 80.0)
        );
    }

    #[test]
    fn oversized_child_goes_negative() {
        let offset = Alignment::CENTER.align(Size::new(50.0, 50.0), Size::new(100.0, 100.0));
        assert_eq!(offset, Offset::new(-25.0, -25.0));
    }
}
