//! Frame-node tree, dirty tracking, and the layout/paint pipeline.
//!
//! The tree is a flat arena of [`FrameNode`]s addressed by generation-checked
//! [`NodeId`]s; parent/child links are ids, and a stale id resolves to `None`
//! instead of dangling. One [`PipelineContext`] owns the tree and drives the
//! frame-synchronous passes: property mutation marks dirty bits, dirty bits
//! propagate up to the nearest boundary node, and `flush_frame` drains the
//! dirty roots, re-measures and re-lays-out each subtree, and emits an
//! immutable [`PaintCommandList`] for the renderer.

pub mod context;
pub mod layout;
pub mod node;
pub mod paint;
pub mod property;
pub mod tree;

pub use context::PipelineContext;
pub use node::{FrameNode, GeometryNode, HitTestMode, NodeId, NodeKind};
pub use paint::{Canvas, DrawCommand, PaintCommandList, PaintSnapshot, RenderOp};
pub use property::{
    Border, Color, CrossAxisAlignment, DirtyFlags, FlexArrangement, LayoutProperty, PaintProperty,
    PropertyUpdate, Visibility,
};
pub use tree::UiTree;

pub mod prelude {
    pub use crate::context::PipelineContext;
    pub use crate::node::{HitTestMode, NodeId, NodeKind};
    pub use crate::paint::{Canvas, DrawCommand, PaintCommandList};
    pub use crate::property::{
        Border, Color, DirtyFlags, LayoutProperty, PaintProperty, PropertyUpdate, Visibility,
    };
    pub use crate::tree::UiTree;
    pub use trellis_geometry::{
        Alignment, Axis, Dimension, EdgeInsets, LayoutConstraint, Offset, Rect, Size,
        TextDirection,
    };
}
