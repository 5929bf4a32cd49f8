//! Layout and paint properties, dirty flags, and the typed property-update
//! surface exposed to the scripting bridge.

use bitflags::bitflags;
use trellis_geometry::{Alignment, Dimension, EdgeInsets, TextDirection};

bitflags! {
    /// Per-node pipeline invalidation bits.
    ///
    /// Set by property mutators, cleared by the corresponding pass. Measure
    /// and layout flags propagate upward to the nearest measure boundary;
    /// render flags stop at the nearest render boundary.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        const NEEDS_MEASURE = 1 << 0;
        const NEEDS_LAYOUT = 1 << 1;
        const NEEDS_RENDER = 1 << 2;
    }
}

impl DirtyFlags {
    /// Full invalidation used for structural changes.
    pub const ALL: DirtyFlags = DirtyFlags::all();

    pub fn affects_layout(self) -> bool {
        self.intersects(DirtyFlags::NEEDS_MEASURE | DirtyFlags::NEEDS_LAYOUT)
    }
}

/// RGBA color, components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color(pub f32, pub f32, pub f32, pub f32);

impl Color {
    pub const TRANSPARENT: Color = Color(0.0, 0.0, 0.0, 0.0);

    /// Returns the color with its alpha scaled by `factor`.
    pub fn with_alpha_factor(self, factor: f32) -> Color {
        Color(self.0, self.1, self.2, self.3 * factor.clamp(0.0, 1.0))
    }
}

/// Border stroke description.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Border {
    pub width: f32,
    pub color: Color,
}

/// Main-axis arrangement for flex containers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlexArrangement {
    #[default]
    Start,
    Center,
    End,
    /// Even gaps between children, none at the edges.
    SpaceBetween,
}

/// Cross-axis alignment for flex and list containers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CrossAxisAlignment {
    #[default]
    Start,
    Center,
    End,
}

/// Node visibility.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Visible,
    /// Laid out but not painted or hit-tested.
    Hidden,
    /// Skipped entirely: takes no space, paints nothing.
    Gone,
}

/// Layout-affecting properties of a frame node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutProperty {
    pub width: Dimension,
    pub height: Dimension,
    pub padding: EdgeInsets,
    /// Stack alignment; `None` means the stack default (center).
    pub alignment: Option<Alignment>,
    pub direction: TextDirection,
    /// Gap between consecutive list items.
    pub item_spacing: f32,
    pub main_arrangement: FlexArrangement,
    pub cross_alignment: CrossAxisAlignment,
    pub visibility: Visibility,
}

/// Paint-affecting properties of a frame node. Every field is optional or
/// has a neutral default; an untouched property paints nothing.
#[derive(Clone, Debug, PartialEq)]
pub struct PaintProperty {
    pub background: Option<Color>,
    pub corner_radius: f32,
    pub border: Option<Border>,
    pub alpha: f32,
    /// Whether children are clipped to the frame bounds during paint.
    pub clip: bool,
}

impl Default for PaintProperty {
    fn default() -> Self {
        Self {
            background: None,
            corner_radius: 0.0,
            border: None,
            alpha: 1.0,
            clip: true,
        }
    }
}

impl PaintProperty {
    /// True when the node itself draws nothing (children may still draw).
    pub fn is_noop(&self) -> bool {
        self.background.is_none() && self.border.is_none()
    }
}

/// One typed property mutation from the scripting bridge.
///
/// Updates arrive keyed by variant; [`PropertyUpdate::dirty_flags`] maps each
/// to the pipeline stages it invalidates.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyUpdate {
    Width(Dimension),
    Height(Dimension),
    Padding(EdgeInsets),
    Alignment(Option<Alignment>),
    Direction(TextDirection),
    ItemSpacing(f32),
    MainArrangement(FlexArrangement),
    CrossAlignment(CrossAxisAlignment),
    Visibility(Visibility),
    Background(Option<Color>),
    CornerRadius(f32),
    BorderStroke(Option<Border>),
    Alpha(f32),
    Clip(bool),
}

impl PropertyUpdate {
    /// Dirty bits implied by applying this update.
    pub fn dirty_flags(&self) -> DirtyFlags {
        match self {
            PropertyUpdate::Width(_)
            | PropertyUpdate::Height(_)
            | PropertyUpdate::Padding(_)
            | PropertyUpdate::Alignment(_)
            | PropertyUpdate::Direction(_)
            | PropertyUpdate::ItemSpacing(_)
            | PropertyUpdate::MainArrangement(_)
            | PropertyUpdate::CrossAlignment(_)
            | PropertyUpdate::Visibility(_) => DirtyFlags::ALL,
            PropertyUpdate::Background(_)
            | PropertyUpdate::CornerRadius(_)
            | PropertyUpdate::BorderStroke(_)
            | PropertyUpdate::Alpha(_)
            | PropertyUpdate::Clip(_) => DirtyFlags::NEEDS_RENDER,
        }
    }

    /// Applies the update, returning whether anything actually changed.
    pub fn apply(&self, layout: &mut LayoutProperty, paint: &mut PaintProperty) -> bool {
        match *self {
            PropertyUpdate::Width(value) => replace(&mut layout.width, value),
            PropertyUpdate::Height(value) => replace(&mut layout.height, value),
            PropertyUpdate::Padding(value) => replace(&mut layout.padding, value),
            PropertyUpdate::Alignment(value) => replace(&mut layout.alignment, value),
            PropertyUpdate::Direction(value) => replace(&mut layout.direction, value),
            PropertyUpdate::ItemSpacing(value) => replace(&mut layout.item_spacing, value),
            PropertyUpdate::MainArrangement(value) => {
                replace(&mut layout.main_arrangement, value)
            }
            PropertyUpdate::CrossAlignment(value) => replace(&mut layout.cross_alignment, value),
            PropertyUpdate::Visibility(value) => replace(&mut layout.visibility, value),
            PropertyUpdate::Background(value) => replace(&mut paint.background, value),
            PropertyUpdate::CornerRadius(value) => replace(&mut paint.corner_radius, value),
            PropertyUpdate::BorderStroke(value) => replace(&mut paint.border, value),
            PropertyUpdate::Alpha(value) => {
                replace(&mut paint.alpha, value.clamp(0.0, 1.0))
            }
            PropertyUpdate::Clip(value) => replace(&mut paint.clip, value),
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_updates_invalidate_measure() {
        assert!(PropertyUpdate::Width(Dimension::Px(10.0))
            .dirty_flags()
            .contains(DirtyFlags::NEEDS_MEASURE));
        assert_eq!(
            PropertyUpdate::Background(None).dirty_flags(),
            DirtyFlags::NEEDS_RENDER
        );
    }

    #[test]
    fn apply_reports_no_change_for_equal_value() {
        let mut layout = LayoutProperty::default();
        let mut paint = PaintProperty::default();
        let update = PropertyUpdate::Alpha(1.0);
        assert!(!update.apply(&mut layout, &mut paint));

        let update = PropertyUpdate::Alpha(0.5);
        assert!(update.apply(&mut layout, &mut paint));
        assert_eq!(paint.alpha, 0.5);
    }

    #[test]
    fn alpha_is_clamped_on_apply() {
        let mut layout = LayoutProperty::default();
        let mut paint = PaintProperty::default();
        PropertyUpdate::Alpha(3.0).apply(&mut layout, &mut paint);
        assert_eq!(paint.alpha, 1.0);
    }
}
