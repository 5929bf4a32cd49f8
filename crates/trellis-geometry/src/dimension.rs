//! Sizing policy for one dimension of a frame node.

/// How a node resolves its extent along one axis during measure.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Dimension {
    /// Wrap the measured content / children.
    #[default]
    Auto,
    /// Fixed pixel extent.
    Px(f32),
    /// Fraction of the parent-provided maximum, in `0.0..=1.0`.
    Percent(f32),
    /// Fill the parent-provided maximum.
    Fill,
}

impl Dimension {
    /// Resolves against the available maximum extent, or `None` for `Auto`.
    ///
    /// An unbounded parent max turns `Percent` and `Fill` into `Auto` since
    /// there is nothing to take a fraction of.
    pub fn resolve(self, available_max: f32) -> Option<f32> {
        match self {
            Dimension::Auto => None,
            Dimension::Px(px) => Some(px.max(0.0)),
            Dimension::Percent(fraction) => {
                if available_max.is_finite() {
                    Some((available_max * fraction.clamp(0.0, 1.0)).max(0.0))
                } else {
                    None
                }
            }
            Dimension::Fill => {
                if available_max.is_finite() {
                    Some(available_max.max(0.0))
                } else {
                    None
                }
            }
        }
    }

    pub fn is_auto(self) -> bool {
        matches!(self, Dimension::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_clamps_percent() {
        assert_eq!(Dimension::Percent(0.5).resolve(200.0), Some(100.0));
        assert_eq!(Dimension::Percent(2.0).resolve(200.0), Some(200.0));
        assert_eq!(Dimension::Percent(-1.0).resolve(200.0), Some(0.0));
    }

    #[test]
    fn unbounded_fill_degrades_to_auto() {
        assert_eq!(Dimension::Fill.resolve(f32::INFINITY), None);
        assert_eq!(Dimension::Percent(0.5).resolve(f32::INFINITY), None);
        assert_eq!(Dimension::Px(40.0).resolve(f32::INFINITY), Some(40.0));
    }
}
