//! Tree structure and the dirty tracker.
//!
//! Dirty marking walks ancestors and stops at the nearest boundary node so a
//! deep subtree edit never forces a full-tree re-layout. The boundary (or the
//! tree root when no boundary intervenes) becomes a dirty root; the set of
//! dirty roots is drained once per frame in document order.

use log::{debug, trace};
use rustc_hash::FxHashSet;

use crate::node::{FrameNode, NodeArena, NodeId, NodeKind};
use crate::property::DirtyFlags;

/// Hook invoked when the first dirty mark of a batch arrives, so the host can
/// schedule a frame tick. Re-armed by [`UiTree::collect_frame`].
pub type FrameRequestHook = Box<dyn FnMut()>;

/// The frame-node tree: arena storage plus dirty bookkeeping.
///
/// All mutation APIs assume the single UI thread; nothing here is `Sync`.
#[derive(Default)]
pub struct UiTree {
    arena: NodeArena,
    root: Option<NodeId>,
    dirty_roots: Vec<NodeId>,
    dirty_members: FxHashSet<NodeId>,
    frame_requested: bool,
    on_frame_request: Option<FrameRequestHook>,
}

impl UiTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the external frame scheduler hook.
    pub fn set_frame_request_hook(&mut self, hook: FrameRequestHook) {
        self.on_frame_request = Some(hook);
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.arena.insert(kind);
        trace!("create node {id} ({kind:?})");
        id
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
        self.mark_dirty(id, DirtyFlags::ALL);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&FrameNode> {
        self.arena.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut FrameNode> {
        self.arena.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id)?.parent
    }

    /// Appends `child` to `parent`'s ordered child list. A child already
    /// mounted elsewhere is detached from its old parent first. Structural
    /// change fully invalidates the parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, usize::MAX, child);
    }

    /// Inserts `child` at `index` (clamped to the child count).
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if !self.arena.contains(parent) || !self.arena.contains(child) {
            return;
        }
        if let Some(old_parent) = self.arena.get(child).and_then(|n| n.parent) {
            if let Some(node) = self.arena.get_mut(old_parent) {
                node.children.retain(|c| *c != child);
                node.list_cache = None;
            }
            self.mark_dirty(old_parent, DirtyFlags::ALL);
        }
        if let Some(node) = self.arena.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.arena.get_mut(parent) {
            let index = index.min(node.children.len());
            node.children.insert(index, child);
            node.list_cache = None;
        }
        self.mark_dirty(parent, DirtyFlags::ALL);
    }

    /// Removes `id` and its whole subtree. Every removed node is purged from
    /// the pending dirty set so an in-flight frame never visits it; removal
    /// of an already-stale id is silently ignored.
    pub fn remove_node(&mut self, id: NodeId) {
        if !self.arena.contains(id) {
            return;
        }
        let parent = self.parent(id);
        if let Some(parent) = parent {
            if let Some(node) = self.arena.get_mut(parent) {
                node.children.retain(|c| *c != id);
                node.list_cache = None;
            }
        }

        let mut stack = vec![id];
        let mut removed = 0usize;
        while let Some(current) = stack.pop() {
            if let Some(node) = self.arena.remove(current) {
                stack.extend(node.children.iter().copied());
                self.dirty_members.remove(&current);
                self.dirty_roots.retain(|root| *root != current);
                removed += 1;
            }
        }
        debug!("removed subtree at {id} ({removed} nodes)");

        if self.root == Some(id) {
            self.root = None;
        }
        if let Some(parent) = parent {
            self.mark_dirty(parent, DirtyFlags::ALL);
        }
    }

    /// Cloned child list, empty for stale ids.
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.arena
            .get(id)
            .map(|node| node.children.to_vec())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    // ------------------------------------------------------------------
    // Boundaries
    // ------------------------------------------------------------------

    /// Marks `id` as a measure/layout boundary: measure and layout flags
    /// from its descendants stop here instead of climbing further.
    pub fn set_measure_boundary(&mut self, id: NodeId, boundary: bool) {
        if let Some(node) = self.arena.get_mut(id) {
            node.measure_boundary = boundary;
        }
    }

    pub fn set_render_boundary(&mut self, id: NodeId, boundary: bool) {
        if let Some(node) = self.arena.get_mut(id) {
            node.render_boundary = boundary;
        }
    }

    /// Activates or deactivates a mounted subtree. Inactive nodes are
    /// skipped by measure, layout, paint, and hit testing.
    pub fn set_active(&mut self, id: NodeId, active: bool) {
        let changed = match self.arena.get_mut(id) {
            Some(node) if node.active != active => {
                node.active = active;
                true
            }
            _ => false,
        };
        if changed {
            self.mark_dirty(id, DirtyFlags::ALL);
        }
    }

    // ------------------------------------------------------------------
    // Dirty tracking
    // ------------------------------------------------------------------

    /// Sets `flags` on `id` and propagates upward to the nearest boundary.
    /// A marked boundary contains its own invalidation and never climbs.
    ///
    /// The stopping node (boundary, or tree root) is recorded as a dirty
    /// root for the next frame. Marking a stale id is a no-op. The frame
    /// request hook fires once per batch.
    pub fn mark_dirty(&mut self, id: NodeId, flags: DirtyFlags) {
        if flags.is_empty() {
            return;
        }
        let Some(node) = self.arena.get_mut(id) else {
            return;
        };
        node.dirty |= flags;
        self.dirty_members.insert(id);

        let propagated = if flags.affects_layout() {
            DirtyFlags::NEEDS_LAYOUT | DirtyFlags::NEEDS_RENDER
        } else {
            DirtyFlags::NEEDS_RENDER
        };

        let mut dirty_root = id;
        let mut current = id;
        loop {
            let Some(node) = self.arena.get(current) else {
                break;
            };
            let stops = if flags.affects_layout() {
                node.measure_boundary
            } else {
                node.render_boundary
            };
            if stops {
                dirty_root = current;
                break;
            }
            match node.parent {
                Some(parent) => {
                    if let Some(parent_node) = self.arena.get_mut(parent) {
                        parent_node.dirty |= propagated;
                    }
                    self.dirty_members.insert(parent);
                    dirty_root = parent;
                    current = parent;
                }
                None => break,
            }
        }

        trace!("mark_dirty {id} {flags:?} -> root {dirty_root}");
        if !self.dirty_roots.contains(&dirty_root) {
            self.dirty_roots.push(dirty_root);
        }
        self.request_frame();
    }

    fn request_frame(&mut self) {
        if self.frame_requested {
            return;
        }
        self.frame_requested = true;
        if let Some(hook) = self.on_frame_request.as_mut() {
            hook();
        }
    }

    /// Whether any dirty work is pending.
    pub fn has_dirty(&self) -> bool {
        !self.dirty_roots.is_empty()
    }

    /// Drains the dirty roots for this frame in document order (pre-order
    /// DFS). Roots nested inside another dirty root are covered by the outer
    /// subtree pass and dropped; nodes removed since marking simply do not
    /// appear. Every flag recorded since the previous drain is cleared; the
    /// returned subtrees are re-measured from scratch.
    pub fn collect_frame(&mut self) -> Vec<NodeId> {
        self.frame_requested = false;
        if self.dirty_roots.is_empty() {
            return Vec::new();
        }
        let pending: FxHashSet<NodeId> = self.dirty_roots.drain(..).collect();
        for id in std::mem::take(&mut self.dirty_members) {
            if let Some(node) = self.arena.get_mut(id) {
                node.dirty = DirtyFlags::empty();
            }
        }

        let mut ordered = Vec::with_capacity(pending.len());
        if let Some(root) = self.root {
            self.collect_in_document_order(root, &pending, false, &mut ordered);
        }
        debug!(
            "collect_frame: {} dirty root(s), {} reachable",
            pending.len(),
            ordered.len()
        );
        ordered
    }

    fn collect_in_document_order(
        &self,
        id: NodeId,
        pending: &FxHashSet<NodeId>,
        covered: bool,
        out: &mut Vec<NodeId>,
    ) {
        let Some(node) = self.arena.get(id) else {
            return;
        };
        let mut covered = covered;
        if !covered && pending.contains(&id) {
            out.push(id);
            covered = true;
        }
        for child in node.children.iter() {
            self.collect_in_document_order(*child, pending, covered, out);
        }
    }

    /// Clears the given flags on one node after a pass completes.
    pub(crate) fn clear_dirty(&mut self, id: NodeId, flags: DirtyFlags) {
        if let Some(node) = self.arena.get_mut(id) {
            node.dirty.remove(flags);
        }
    }
}
