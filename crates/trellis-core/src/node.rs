//! Frame nodes and the generation-checked arena that stores them.

use smallvec::SmallVec;
use trellis_geometry::{Axis, Offset, Rect, Size};

use crate::property::{DirtyFlags, LayoutProperty, PaintProperty};

/// Stable handle to a frame node: arena index plus generation counter.
///
/// A `NodeId` is the weak-reference currency of the pipeline. Holding one
/// never keeps a node alive; looking up an id whose slot has since been
/// reused yields `None`. Deferred paint closures and gesture recognizers
/// store these instead of pointers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Raw arena index, exposed for debug output only.
    pub fn index(self) -> u32 {
        self.index
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Behavior variant of a frame node. Selects the measure, layout, and paint
/// strategy applied to the node during pipeline passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Children stacked on top of each other, aligned within the content
    /// rect (default center).
    Stack,
    /// Sequential placement along `axis` with cross-axis alignment.
    Flex { axis: Axis },
    /// Sequential placement along `axis` with item spacing and a measured
    /// extent cache.
    List { axis: Axis },
    /// Plain content box with no children of its own layout policy.
    Leaf,
}

/// How a node participates in hit testing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HitTestMode {
    /// Self and children are testable; a hit stops bubbling to siblings.
    #[default]
    Default,
    /// Self is testable and blocks children and siblings outright.
    Block,
    /// Self is testable but never blocks siblings or ancestors.
    Transparent,
    /// Self is skipped; children are still tested.
    None,
}

/// Mutable layout result attached to every frame node.
///
/// Valid only after a completed layout pass. The frame offset is relative to
/// the parent's content origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GeometryNode {
    pub frame_size: Size,
    pub frame_offset: Offset,
    pub content_rect: Option<Rect>,
}

impl GeometryNode {
    /// Frame rect in parent-content-local coordinates.
    pub fn frame_rect(&self) -> Rect {
        Rect::new(self.frame_offset, self.frame_size)
    }

    /// Content rect, falling back to the full frame when none was set.
    pub fn content(&self) -> Rect {
        self.content_rect
            .unwrap_or_else(|| Rect::from_size(self.frame_size))
    }
}

/// Cached main-axis extents for list layout, dropped on structural change.
#[derive(Clone, Debug, Default)]
pub(crate) struct ListMeasureCache {
    pub item_extents: Vec<f32>,
    pub total_main: f32,
}

/// One UI element in the frame tree.
pub struct FrameNode {
    pub kind: NodeKind,
    pub layout: LayoutProperty,
    pub paint: PaintProperty,
    pub geometry: GeometryNode,
    pub hit_test_mode: HitTestMode,
    pub(crate) children: SmallVec<[NodeId; 4]>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) active: bool,
    pub(crate) dirty: DirtyFlags,
    pub(crate) measure_boundary: bool,
    pub(crate) render_boundary: bool,
    pub(crate) list_cache: Option<ListMeasureCache>,
}

impl FrameNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            layout: LayoutProperty::default(),
            paint: PaintProperty::default(),
            geometry: GeometryNode::default(),
            hit_test_mode: HitTestMode::default(),
            children: SmallVec::new(),
            parent: None,
            active: true,
            dirty: DirtyFlags::empty(),
            measure_boundary: false,
            render_boundary: false,
            list_cache: None,
        }
    }

    /// Split borrow over the two property blocks, for typed updates.
    pub fn properties_mut(&mut self) -> (&mut LayoutProperty, &mut PaintProperty) {
        (&mut self.layout, &mut self.paint)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    /// Inactive nodes stay mounted but take part in no pipeline pass, for
    /// lazy containers that keep off-window children alive.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether this node stops upward propagation of measure/layout flags.
    pub fn is_measure_boundary(&self) -> bool {
        self.measure_boundary
    }

    pub fn is_render_boundary(&self) -> bool {
        self.render_boundary
    }
}

struct Slot {
    generation: u32,
    node: Option<FrameNode>,
}

/// Flat store of frame nodes addressed by [`NodeId`].
///
/// Slots are recycled through a free list; each reuse bumps the generation so
/// ids handed out earlier go stale instead of aliasing the new occupant.
#[derive(Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: NodeKind) -> NodeId {
        let node = FrameNode::new(kind);
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    /// Frees the slot and bumps its generation. Freeing an already-stale id
    /// is a no-op.
    pub fn remove(&mut self, id: NodeId) -> Option<FrameNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&FrameNode> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut FrameNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
