//! Pipeline context: the explicit owner of one UI tree and its frame loop.
//!
//! There are no globals; everything a frame needs (tree, surface size,
//! ambient text direction) lives here and is passed down explicitly.

use log::{debug, warn};
use trellis_geometry::{LayoutConstraint, Size, TextDirection};

use crate::layout::{layout, measure};
use crate::node::NodeId;
use crate::paint::{collect_paint, PaintCommandList};
use crate::property::{DirtyFlags, PropertyUpdate};
use crate::tree::{FrameRequestHook, UiTree};

/// Owns a [`UiTree`] and drives the frame-synchronous pipeline:
/// property updates mark dirty, `flush_frame` measures, lays out, and paints.
pub struct PipelineContext {
    tree: UiTree,
    surface: Size,
    direction: TextDirection,
}

impl PipelineContext {
    pub fn new(surface: Size) -> Self {
        Self {
            tree: UiTree::new(),
            surface: surface.clamped(),
            direction: TextDirection::Ltr,
        }
    }

    pub fn tree(&self) -> &UiTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut UiTree {
        &mut self.tree
    }

    pub fn surface_size(&self) -> Size {
        self.surface
    }

    /// Resizes the render surface; the whole tree re-measures next frame.
    pub fn set_surface_size(&mut self, surface: Size) {
        let surface = surface.clamped();
        if surface == self.surface {
            return;
        }
        self.surface = surface;
        if let Some(root) = self.tree.root() {
            self.tree.mark_dirty(root, DirtyFlags::ALL);
        }
    }

    /// Pipeline-wide direction that `TextDirection::Auto` nodes resolve to.
    pub fn set_direction(&mut self, direction: TextDirection) {
        let direction = match direction {
            TextDirection::Auto => TextDirection::Ltr,
            explicit => explicit,
        };
        if direction == self.direction {
            return;
        }
        self.direction = direction;
        if let Some(root) = self.tree.root() {
            self.tree.mark_dirty(root, DirtyFlags::NEEDS_LAYOUT);
        }
    }

    pub fn direction(&self) -> TextDirection {
        self.direction
    }

    pub fn set_frame_request_hook(&mut self, hook: FrameRequestHook) {
        self.tree.set_frame_request_hook(hook);
    }

    /// Applies one typed property update to a node.
    ///
    /// An update addressed to a removed node is dropped with a log line, not
    /// an error; the bridge may race node removal. Dirty marking only happens
    /// when the value actually changed.
    pub fn apply_update(&mut self, id: NodeId, update: PropertyUpdate) {
        let Some(node) = self.tree.node_mut(id) else {
            warn!("property update for stale node {id} dropped");
            return;
        };
        let flags = update.dirty_flags();
        let (layout, paint) = node.properties_mut();
        if update.apply(layout, paint) {
            self.tree.mark_dirty(id, flags);
        }
    }

    /// Runs the pending pipeline passes and returns the frame's paint
    /// commands. A clean tree returns an empty list without traversal.
    pub fn flush_frame(&mut self) -> PaintCommandList {
        if !self.tree.has_dirty() {
            return PaintCommandList::default();
        }
        let roots = self.tree.collect_frame();
        let tree_root = self.tree.root();
        for id in roots {
            let constraint = if Some(id) == tree_root {
                LayoutConstraint::tight(self.surface)
            } else {
                // A boundary re-measures within its established frame so the
                // invalidation stays local.
                LayoutConstraint::tight(
                    self.tree
                        .node(id)
                        .map(|n| n.geometry.frame_size)
                        .unwrap_or(Size::ZERO),
                )
            };
            let direction = self.effective_direction(id);
            measure(&mut self.tree, id, constraint);
            layout(&mut self.tree, id, direction);
        }
        debug!("flush_frame complete");
        collect_paint(&mut self.tree)
    }

    /// Direction inherited by `id` from its ancestor chain, falling back to
    /// the pipeline direction.
    fn effective_direction(&self, id: NodeId) -> TextDirection {
        let mut current = self.tree.parent(id);
        while let Some(ancestor) = current {
            match self.tree.node(ancestor).map(|n| n.layout.direction) {
                Some(TextDirection::Auto) => current = self.tree.parent(ancestor),
                Some(explicit) => return explicit,
                None => break,
            }
        }
        self.direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use trellis_geometry::{Alignment, Dimension};

    fn context_with_root() -> (PipelineContext, NodeId) {
        let mut ctx = PipelineContext::new(Size::new(200.0, 200.0));
        let root = ctx.tree_mut().create_node(NodeKind::Stack);
        ctx.tree_mut().set_root(root);
        (ctx, root)
    }

    #[test]
    fn update_to_stale_node_is_a_noop() {
        let (mut ctx, root) = context_with_root();
        let child = ctx.tree_mut().create_node(NodeKind::Leaf);
        ctx.tree_mut().add_child(root, child);
        ctx.tree_mut().remove_node(child);

        ctx.apply_update(child, PropertyUpdate::Width(Dimension::Px(10.0)));
        ctx.flush_frame();
    }

    #[test]
    fn unchanged_update_does_not_redirty() {
        let (mut ctx, root) = context_with_root();
        ctx.apply_update(root, PropertyUpdate::Width(Dimension::Px(50.0)));
        ctx.flush_frame();
        assert!(!ctx.tree().has_dirty());

        ctx.apply_update(root, PropertyUpdate::Width(Dimension::Px(50.0)));
        assert!(!ctx.tree().has_dirty());
    }

    #[test]
    fn flush_measures_root_against_surface() {
        let (mut ctx, root) = context_with_root();
        ctx.apply_update(root, PropertyUpdate::Width(Dimension::Fill));
        ctx.apply_update(root, PropertyUpdate::Height(Dimension::Fill));
        ctx.flush_frame();
        assert_eq!(
            ctx.tree().node(root).unwrap().geometry.frame_size,
            Size::new(200.0, 200.0)
        );
    }

    #[test]
    fn boundary_flush_keeps_inherited_direction() {
        let (mut ctx, root) = context_with_root();
        ctx.tree_mut().node_mut(root).unwrap().layout.direction = TextDirection::Rtl;
        let panel = ctx.tree_mut().create_node(NodeKind::Stack);
        let leaf = ctx.tree_mut().create_node(NodeKind::Leaf);
        ctx.tree_mut().add_child(root, panel);
        ctx.tree_mut().add_child(panel, leaf);
        {
            let tree = ctx.tree_mut();
            let node = tree.node_mut(panel).unwrap();
            node.layout.width = Dimension::Px(100.0);
            node.layout.height = Dimension::Px(50.0);
            node.layout.alignment = Some(Alignment::TOP_START);
            let node = tree.node_mut(leaf).unwrap();
            node.layout.width = Dimension::Px(20.0);
            node.layout.height = Dimension::Px(20.0);
        }
        ctx.tree_mut().set_measure_boundary(panel, true);
        ctx.flush_frame();
        assert_eq!(
            ctx.tree().node(leaf).unwrap().geometry.frame_offset.x,
            80.0
        );

        // A local flush of the boundary subtree still mirrors for the
        // ancestor's RTL direction.
        ctx.apply_update(leaf, PropertyUpdate::Width(Dimension::Px(30.0)));
        ctx.flush_frame();
        assert_eq!(
            ctx.tree().node(leaf).unwrap().geometry.frame_offset.x,
            70.0
        );
    }

    #[test]
    fn clean_tree_flushes_to_empty_list() {
        let (mut ctx, _) = context_with_root();
        ctx.flush_frame();
        assert!(ctx.flush_frame().is_empty());
    }
}
