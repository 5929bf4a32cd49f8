//! Layout constraints and edge insets.

use crate::{Offset, Size};

/// Padding/border thickness on each edge of a box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EdgeInsets {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl EdgeInsets {
    pub const ZERO: EdgeInsets = EdgeInsets {
        left: 0.0,
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
    };

    pub fn uniform(value: f32) -> Self {
        Self {
            left: value,
            top: value,
            right: value,
            bottom: value,
        }
    }

    pub fn horizontal_sum(self) -> f32 {
        self.left + self.right
    }

    pub fn vertical_sum(self) -> f32 {
        self.top + self.bottom
    }

    /// Offset of the content origin introduced by these insets.
    pub fn top_left(self) -> Offset {
        Offset::new(self.left, self.top)
    }
}

/// Min/max size bounds passed down during the measure pass.
///
/// A constraint is immutable within one measure call; derived constraints for
/// children are built with [`deflate`](LayoutConstraint::deflate) and
/// [`loosen`](LayoutConstraint::loosen).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutConstraint {
    pub min: Size,
    pub max: Size,
}

impl LayoutConstraint {
    /// Exact constraint: min == max == `size`.
    pub fn tight(size: Size) -> Self {
        let size = size.clamped();
        Self {
            min: size,
            max: size,
        }
    }

    /// Anything from zero up to `max`.
    pub fn loose(max: Size) -> Self {
        Self {
            min: Size::ZERO,
            max: max.clamped(),
        }
    }

    /// Fully unbounded constraint.
    pub fn unbounded() -> Self {
        Self {
            min: Size::ZERO,
            max: Size::new(f32::INFINITY, f32::INFINITY),
        }
    }

    /// Clamps `size` into the `[min, max]` bounds.
    pub fn constrain(self, size: Size) -> Size {
        let size = size.clamped();
        Size {
            width: size.width.clamp(self.min.width, self.max.width.max(self.min.width)),
            height: size
                .height
                .clamp(self.min.height, self.max.height.max(self.min.height)),
        }
    }

    /// Derives the child constraint after the parent reserves `insets` for
    /// its own padding/border. Bounds clamp at zero; zero or negative
    /// available space still yields a valid (zero-size) constraint.
    pub fn deflate(self, insets: EdgeInsets) -> Self {
        let h = insets.horizontal_sum();
        let v = insets.vertical_sum();
        Self {
            min: Size::new(self.min.width - h, self.min.height - v).clamped(),
            max: Size::new(self.max.width - h, self.max.height - v).clamped(),
        }
    }

    /// Drops the minimum bounds so children may be smaller than the parent.
    pub fn loosen(self) -> Self {
        Self {
            min: Size::ZERO,
            max: self.max,
        }
    }

    pub fn has_bounded_width(self) -> bool {
        self.max.width.is_finite()
    }

    pub fn has_bounded_height(self) -> bool {
        self.max.height.is_finite()
    }
}

impl Default for LayoutConstraint {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tight_clamps_invalid_size() {
        let constraint = LayoutConstraint::tight(Size::new(-10.0, f32::NAN));
        assert_eq!(constraint.min, Size::ZERO);
        assert_eq!(constraint.max, Size::ZERO);
    }

    #[test]
    fn deflate_never_goes_negative() {
        let constraint = LayoutConstraint::loose(Size::new(10.0, 10.0));
        let child = constraint.deflate(EdgeInsets::uniform(20.0));
        assert_eq!(child.max, Size::ZERO);
        assert_eq!(child.constrain(Size::new(50.0, 50.0)), Size::ZERO);
    }

    #[test]
    fn constrain_respects_bounds() {
        let constraint = LayoutConstraint {
            min: Size::new(10.0, 10.0),
            max: Size::new(100.0, 100.0),
        };
        assert_eq!(
            constraint.constrain(Size::new(5.0, 500.0)),
            Size::new(10.0, 100.0)
        );
    }
}
