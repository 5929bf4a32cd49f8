//! Paint collection: immutable snapshots and the replayable command list.
//!
//! The paint pass never calls back into the tree. Each painting node is
//! captured as a [`PaintSnapshot`] (absolute rect plus the paint properties in
//! effect), the snapshot emits draw commands, and the resulting
//! [`PaintCommandList`] can be replayed against any [`Canvas`] after the pass
//! has finished.

use log::trace;
use trellis_geometry::{Offset, Rect};

use crate::node::NodeId;
use crate::property::{Border, Color, DirtyFlags, PaintProperty, Visibility};
use crate::tree::UiTree;

/// Render target abstraction. Implementations rasterize, record, or diff the
/// commands; the pipeline never draws directly.
pub trait Canvas {
    fn fill_rect(&mut self, rect: Rect, color: Color, corner_radius: f32);
    fn stroke_rect(&mut self, rect: Rect, border: Border, corner_radius: f32);
    fn push_clip(&mut self, rect: Rect);
    fn pop_clip(&mut self);
}

/// One primitive drawing operation in absolute surface coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        color: Color,
        corner_radius: f32,
    },
    StrokeRect {
        rect: Rect,
        border: Border,
        corner_radius: f32,
    },
    PushClip(Rect),
    PopClip,
}

/// A draw command tagged with the node that produced it, for debugging and
/// damage attribution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOp {
    pub node: NodeId,
    pub command: DrawCommand,
}

/// Frozen paint state of one node at collection time.
///
/// Snapshots carry plain values only, no tree references, so a command list
/// stays valid while the tree mutates underneath it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaintSnapshot {
    pub rect: Rect,
    pub background: Option<Color>,
    pub border: Option<Border>,
    pub corner_radius: f32,
    /// Effective alpha, own value multiplied down the ancestor chain.
    pub alpha: f32,
}

impl PaintSnapshot {
    fn capture(rect: Rect, paint: &PaintProperty, inherited_alpha: f32) -> Self {
        Self {
            rect,
            background: paint.background,
            border: paint.border,
            corner_radius: paint.corner_radius,
            alpha: inherited_alpha * paint.alpha,
        }
    }

    fn emit(&self, node: NodeId, out: &mut Vec<RenderOp>) {
        if let Some(color) = self.background {
            out.push(RenderOp {
                node,
                command: DrawCommand::FillRect {
                    rect: self.rect,
                    color: color.with_alpha_factor(self.alpha),
                    corner_radius: self.corner_radius,
                },
            });
        }
        if let Some(border) = self.border {
            if border.width > 0.0 {
                out.push(RenderOp {
                    node,
                    command: DrawCommand::StrokeRect {
                        rect: self.rect,
                        border: Border {
                            width: border.width,
                            color: border.color.with_alpha_factor(self.alpha),
                        },
                        corner_radius: self.corner_radius,
                    },
                });
            }
        }
    }
}

/// Ordered draw commands for one frame, replayable any number of times.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PaintCommandList {
    pub ops: Vec<RenderOp>,
}

impl PaintCommandList {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Replays every command against `canvas` in recorded order.
    pub fn replay(&self, canvas: &mut dyn Canvas) {
        for op in &self.ops {
            match op.command {
                DrawCommand::FillRect {
                    rect,
                    color,
                    corner_radius,
                } => canvas.fill_rect(rect, color, corner_radius),
                DrawCommand::StrokeRect {
                    rect,
                    border,
                    corner_radius,
                } => canvas.stroke_rect(rect, border, corner_radius),
                DrawCommand::PushClip(rect) => canvas.push_clip(rect),
                DrawCommand::PopClip => canvas.pop_clip(),
            }
        }
    }
}

/// Walks the tree in document order and records the frame's draw commands.
///
/// Offsets accumulate parent-absolute: a child's position is its parent's
/// absolute origin plus the parent's content origin plus the child's own
/// frame offset. Hidden and gone subtrees and fully transparent subtrees are
/// skipped; render dirty bits are cleared as nodes are visited.
pub fn collect_paint(tree: &mut UiTree) -> PaintCommandList {
    let mut list = PaintCommandList::default();
    if let Some(root) = tree.root() {
        collect_node(tree, root, Offset::ZERO, 1.0, &mut list.ops);
    }
    trace!("collected {} render op(s)", list.ops.len());
    list
}

fn collect_node(
    tree: &mut UiTree,
    id: NodeId,
    parent_origin: Offset,
    inherited_alpha: f32,
    out: &mut Vec<RenderOp>,
) {
    let Some(node) = tree.node(id) else {
        return;
    };
    if node.layout.visibility != Visibility::Visible || !node.is_active() {
        return;
    }
    let origin = parent_origin + node.geometry.frame_offset;
    let frame = Rect::new(origin, node.geometry.frame_size);
    let snapshot = PaintSnapshot::capture(frame, &node.paint, inherited_alpha);
    if snapshot.alpha <= 0.0 {
        return;
    }
    let clip = node.paint.clip;
    let content_origin = origin + node.geometry.content().origin;
    let children = tree.children_of(id);

    snapshot.emit(id, out);
    tree.clear_dirty(id, DirtyFlags::NEEDS_RENDER);

    if children.is_empty() {
        return;
    }
    if clip {
        out.push(RenderOp {
            node: id,
            command: DrawCommand::PushClip(frame),
        });
    }
    for child in children {
        collect_node(tree, child, content_origin, snapshot.alpha, out);
    }
    if clip {
        out.push(RenderOp {
            node: id,
            command: DrawCommand::PopClip,
        });
    }
}
