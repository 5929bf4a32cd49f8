//! Hit testing and event routing.
//!
//! Touch dispatch is sequence-oriented: each pointer's down runs its own hit
//! test, and the resulting target chain (innermost first) is frozen for as
//! long as that pointer is down. A chain's gesture handles are arbitrated as
//! an implicit exclusive set where document depth is priority. Handles
//! reachable from several pointers' chains are shared instances, so
//! multi-finger gestures see every pointer's samples.

use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, trace};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use trellis_core::{HitTestMode, NodeId, UiTree, Visibility};
use trellis_geometry::Offset;

use crate::events::{AxisEvent, KeyEvent, MouseAction, MouseEvent, TouchEvent, TouchPhase};
use crate::recognizer::{GestureHandle, GesturePolicy, RecognizerGroup, Transition};

/// Pointer id used for synthetic touches translated from mouse input.
pub const MOUSE_POINTER: u32 = u32::MAX;

pub type KeyHandler = Rc<dyn Fn(&KeyEvent) -> bool>;
pub type AxisHandler = Rc<dyn Fn(&AxisEvent) -> bool>;
/// Receives `true` on hover enter, `false` on exit.
pub type HoverHandler = Rc<dyn Fn(bool)>;

type HandleList = SmallVec<[GestureHandle; 2]>;

/// One pointer's frozen hit-test result and its arbitration scope.
struct PointerRoute {
    /// Hit chain at this pointer's down, innermost first.
    targets: IndexMap<NodeId, HandleList>,
    arbiter: RecognizerGroup,
}

/// The in-flight touch sequence: one route per pointer id, in down order.
/// The sequence ends when the last pointer lifts.
#[derive(Default)]
struct ActiveSequence {
    routes: IndexMap<u32, PointerRoute>,
}

/// Routes raw platform input to gesture recognizers and node handlers.
#[derive(Default)]
pub struct EventManager {
    gestures: FxHashMap<NodeId, HandleList>,
    key_handlers: FxHashMap<NodeId, KeyHandler>,
    axis_handlers: FxHashMap<NodeId, AxisHandler>,
    hover_handlers: FxHashMap<NodeId, HoverHandler>,
    sequence: Option<ActiveSequence>,
    hovered: Vec<NodeId>,
    focused: Option<NodeId>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    pub fn attach_gesture(&mut self, node: NodeId, handle: GestureHandle) {
        self.gestures.entry(node).or_default().push(handle);
    }

    pub fn detach_gestures(&mut self, node: NodeId) {
        self.gestures.remove(&node);
    }

    /// Swaps a node's gesture set for a rebuilt one, transferring in-flight
    /// sequence state between structurally equivalent handles by position.
    pub fn replace_gestures(&mut self, node: NodeId, handles: Vec<GestureHandle>) {
        if let Some(old) = self.gestures.get(&node) {
            for (new, old) in handles.iter().zip(old.iter()) {
                if !new.borrow_mut().reconcile_from(&old.borrow()) {
                    trace!("gesture on {node} rebuilt without state transfer");
                }
            }
        }
        self.gestures.insert(node, handles.into_iter().collect());
    }

    pub fn set_key_handler(&mut self, node: NodeId, handler: KeyHandler) {
        self.key_handlers.insert(node, handler);
    }

    pub fn set_axis_handler(&mut self, node: NodeId, handler: AxisHandler) {
        self.axis_handlers.insert(node, handler);
    }

    pub fn set_hover_handler(&mut self, node: NodeId, handler: HoverHandler) {
        self.hover_handlers.insert(node, handler);
    }

    pub fn set_focus(&mut self, node: Option<NodeId>) {
        self.focused = node;
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Drops every registration for a removed node. An in-flight touch
    /// sequence keeps its frozen handles until it ends.
    pub fn remove_node_bindings(&mut self, node: NodeId) {
        self.gestures.remove(&node);
        self.key_handlers.remove(&node);
        self.axis_handlers.remove(&node);
        self.hover_handlers.remove(&node);
        self.hovered.retain(|id| *id != node);
        if self.focused == Some(node) {
            self.focused = None;
        }
    }

    // ------------------------------------------------------------------
    // Hit testing
    // ------------------------------------------------------------------

    /// Nodes under `point`, innermost first, honoring each node's
    /// [`HitTestMode`]. Hidden and gone subtrees are never hit.
    pub fn touch_test(&self, tree: &UiTree, point: Offset) -> Vec<NodeId> {
        let mut chain = Vec::new();
        if let Some(root) = tree.root() {
            hit_test_node(tree, root, Offset::ZERO, point, &mut chain);
        }
        trace!("touch test at {point:?}: {} node(s)", chain.len());
        chain
    }

    // ------------------------------------------------------------------
    // Touch
    // ------------------------------------------------------------------

    /// Routes one touch sample. Returns whether the event was consumed; an
    /// unconsumed event should be forwarded to the platform default.
    pub fn dispatch_touch(&mut self, tree: &UiTree, event: &TouchEvent) -> bool {
        match event.phase {
            TouchPhase::Down => {
                if !self.begin_route(tree, event) {
                    return false;
                }
                self.drive(event);
                true
            }
            TouchPhase::Move => {
                if !self.has_route(event.pointer) {
                    return false;
                }
                self.drive(event);
                true
            }
            TouchPhase::Up => {
                if !self.has_route(event.pointer) {
                    return false;
                }
                self.drive(event);
                self.finish_pointer(event.pointer);
                true
            }
            TouchPhase::Cancel => {
                let Some(mut seq) = self.sequence.take() else {
                    return false;
                };
                // The group cancel path resets every member to Ready.
                for route in seq.routes.values_mut() {
                    route.arbiter.handle_event(event);
                }
                true
            }
        }
    }

    /// Time-driven gesture check (long press). `now_ms` comes from the same
    /// clock as event timestamps.
    pub fn tick(&mut self, now_ms: u64) {
        let Some(seq) = self.sequence.as_mut() else {
            return;
        };
        for route in seq.routes.values_mut() {
            match route.arbiter.tick(now_ms) {
                Transition::Accept => route.arbiter.accept(),
                Transition::Reject => route.arbiter.reject(),
                Transition::None => {}
            }
        }
    }

    /// Runs the hit test for one pointer's down and installs its route. A
    /// pointer landing on no gesture target gets no route and stays
    /// unconsumed, even while other pointers are active.
    fn begin_route(&mut self, tree: &UiTree, event: &TouchEvent) -> bool {
        let chain = self.touch_test(tree, event.position);
        let mut targets: IndexMap<NodeId, HandleList> = IndexMap::new();
        for id in chain {
            if let Some(handles) = self.gestures.get(&id) {
                if !handles.is_empty() {
                    targets.insert(id, handles.clone());
                }
            }
        }
        if targets.is_empty() {
            return false;
        }
        let flat: Vec<GestureHandle> = targets.values().flatten().cloned().collect();
        debug!(
            "pointer {} route: {} target node(s), {} recognizer(s)",
            event.pointer,
            targets.len(),
            flat.len()
        );
        let route = PointerRoute {
            targets,
            arbiter: RecognizerGroup::new(GesturePolicy::Exclusive, flat),
        };
        self.sequence
            .get_or_insert_with(ActiveSequence::default)
            .routes
            .insert(event.pointer, route);
        true
    }

    fn has_route(&self, pointer: u32) -> bool {
        self.sequence
            .as_ref()
            .is_some_and(|seq| seq.routes.contains_key(&pointer))
    }

    fn drive(&mut self, event: &TouchEvent) {
        let Some(seq) = self.sequence.as_mut() else {
            return;
        };
        let Some(route) = seq.routes.get_mut(&event.pointer) else {
            return;
        };
        match route.arbiter.handle_event(event) {
            Transition::Accept => route.arbiter.accept(),
            Transition::Reject => route.arbiter.reject(),
            Transition::None => {}
        }
    }

    fn finish_pointer(&mut self, pointer: u32) {
        let last = self
            .sequence
            .as_ref()
            .map(|seq| seq.routes.len() == 1 && seq.routes.contains_key(&pointer))
            .unwrap_or(false);
        if last {
            self.end_sequence();
        } else if let Some(seq) = self.sequence.as_mut() {
            seq.routes.shift_remove(&pointer);
        }
    }

    fn end_sequence(&mut self) {
        if let Some(seq) = self.sequence.take() {
            for route in seq.routes.values() {
                for handles in route.targets.values() {
                    for handle in handles {
                        handle.borrow_mut().reset_status();
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Mouse, axis, key
    // ------------------------------------------------------------------

    /// Routes a mouse sample. Moves without a held button drive hover;
    /// presses and releases become synthetic touches so gestures work with a
    /// mouse unchanged.
    pub fn dispatch_mouse(&mut self, tree: &UiTree, event: &MouseEvent) -> bool {
        match event.action {
            MouseAction::Move => {
                if self.sequence.is_some() {
                    return self.dispatch_touch(tree, &synthetic_touch(event, TouchPhase::Move));
                }
                self.update_hover(tree, event.position)
            }
            MouseAction::Press => {
                self.dispatch_touch(tree, &synthetic_touch(event, TouchPhase::Down))
            }
            MouseAction::Release => {
                self.dispatch_touch(tree, &synthetic_touch(event, TouchPhase::Up))
            }
        }
    }

    /// Recomputes the hover chain and fires enter/exit diffs. Chains are
    /// innermost first; notifications run outside-in.
    pub fn update_hover(&mut self, tree: &UiTree, position: Offset) -> bool {
        let chain = self.touch_test(tree, position);
        for id in self.hovered.iter().rev() {
            if !chain.contains(id) {
                if let Some(handler) = self.hover_handlers.get(id) {
                    handler(false);
                }
            }
        }
        for id in chain.iter().rev() {
            if !self.hovered.contains(id) {
                if let Some(handler) = self.hover_handlers.get(id) {
                    handler(true);
                }
            }
        }
        self.hovered = chain;
        !self.hovered.is_empty()
    }

    /// Delivers an axis event to the innermost hit node with a handler.
    pub fn dispatch_axis(&mut self, tree: &UiTree, event: &AxisEvent) -> bool {
        for id in self.touch_test(tree, event.position) {
            if let Some(handler) = self.axis_handlers.get(&id) {
                if handler(event) {
                    return true;
                }
            }
        }
        false
    }

    /// Delivers a key event to the focused node, bubbling through its
    /// ancestors until a handler consumes it.
    pub fn dispatch_key(&mut self, tree: &UiTree, event: &KeyEvent) -> bool {
        let mut current = self.focused;
        while let Some(id) = current {
            if let Some(handler) = self.key_handlers.get(&id) {
                if handler(event) {
                    return true;
                }
            }
            current = tree.parent(id);
        }
        false
    }
}

fn synthetic_touch(event: &MouseEvent, phase: TouchPhase) -> TouchEvent {
    TouchEvent {
        pointer: MOUSE_POINTER,
        phase,
        position: event.position,
        timestamp_ms: event.timestamp_ms,
    }
}

/// Recursive hit test. Children are tested front-to-back (reverse document
/// order); the return value tells the caller whether to stop testing earlier
/// siblings.
fn hit_test_node(
    tree: &UiTree,
    id: NodeId,
    parent_origin: Offset,
    point: Offset,
    out: &mut Vec<NodeId>,
) -> bool {
    let Some(node) = tree.node(id) else {
        return false;
    };
    if node.layout.visibility != Visibility::Visible || !node.is_active() {
        return false;
    }
    let frame = node.geometry.frame_rect().translate(parent_origin);
    if !frame.contains(point) {
        return false;
    }
    if node.hit_test_mode == HitTestMode::Block {
        out.push(id);
        return true;
    }
    let content_origin = frame.origin + node.geometry.content().origin;
    let mut child_hit = false;
    for child in node.children().iter().rev() {
        if hit_test_node(tree, *child, content_origin, point, out) {
            child_hit = true;
            break;
        }
    }
    match node.hit_test_mode {
        HitTestMode::Default => {
            out.push(id);
            true
        }
        HitTestMode::Transparent => {
            out.push(id);
            false
        }
        HitTestMode::None => child_hit,
        HitTestMode::Block => true,
    }
}
