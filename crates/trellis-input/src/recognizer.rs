//! Gesture recognizers and arbitration groups.
//!
//! A recognizer never accepts itself. `handle_event` (and `tick`) return a
//! [`Transition`] proposal; the owner, a [`RecognizerGroup`] or the event
//! manager's per-pointer arbitration, decides and calls `accept` or `reject`.
//! Callbacks fire only from `accept` and from post-accept streaming updates,
//! so a gesture that loses arbitration is never observed by user code.

use std::cell::RefCell;
use std::rc::Rc;

use log::trace;
use trellis_core::NodeId;
use trellis_geometry::Offset;

use crate::events::{TouchEvent, TouchPhase};

/// Movement tolerance for tap and long-press, in pixels.
pub const TAP_SLOP: f32 = 8.0;
/// Default pan activation distance, in pixels.
pub const PAN_DISTANCE_DEFAULT: f32 = 5.0;
/// Default pinch activation span change, in pixels.
pub const PINCH_DISTANCE_DEFAULT: f32 = 5.0;
/// Default rotation activation angle, in degrees.
pub const ROTATION_ANGLE_DEFAULT: f32 = 1.0;
/// Default long-press hold duration.
pub const LONG_PRESS_DURATION_MS: u64 = 500;
/// Maximum gap between taps of a multi-tap.
pub const MULTI_TAP_TIMEOUT_MS: u64 = 300;

/// Lifecycle of a recognizer within one touch sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecognizerState {
    /// Idle, waiting for a touch sequence.
    #[default]
    Ready,
    /// Tracking a sequence, no verdict yet.
    Detecting,
    /// Won arbitration; callbacks have fired / are streaming.
    Accepted,
    /// Lost or gave up for this sequence.
    Rejected,
    /// Wants to accept but a higher-priority peer is still undecided.
    Pending,
    /// A peer won; sidelined for the rest of the sequence.
    Blocked,
}

impl RecognizerState {
    /// Whether the recognizer is out of the running for this sequence.
    pub fn is_closed(self) -> bool {
        matches!(self, RecognizerState::Rejected | RecognizerState::Blocked)
    }
}

/// Verdict proposal returned from event handling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transition {
    #[default]
    None,
    Accept,
    Reject,
}

/// What a recognizer detects, with its activation parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureKind {
    /// `count` taps in quick succession.
    Tap { count: u32 },
    LongPress { duration_ms: u64 },
    Pan { fingers: u32, distance: f32 },
    /// Two-finger span change beyond `distance`.
    Pinch { distance: f32 },
    /// Two-finger twist beyond `angle_deg`.
    Rotation { angle_deg: f32 },
}

impl GestureKind {
    pub fn tap() -> Self {
        GestureKind::Tap { count: 1 }
    }

    pub fn double_tap() -> Self {
        GestureKind::Tap { count: 2 }
    }

    pub fn long_press() -> Self {
        GestureKind::LongPress {
            duration_ms: LONG_PRESS_DURATION_MS,
        }
    }

    pub fn pan() -> Self {
        GestureKind::Pan {
            fingers: 1,
            distance: PAN_DISTANCE_DEFAULT,
        }
    }

    pub fn pinch() -> Self {
        GestureKind::Pinch {
            distance: PINCH_DISTANCE_DEFAULT,
        }
    }

    pub fn rotation() -> Self {
        GestureKind::Rotation {
            angle_deg: ROTATION_ANGLE_DEFAULT,
        }
    }
}

/// Payload delivered to gesture callbacks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GestureEvent {
    /// Node the recognizer is attached to, if any.
    pub node: Option<NodeId>,
    pub position: Offset,
    /// Pan translation since the last callback.
    pub delta: Offset,
    /// Pinch scale relative to the initial span (1.0 when not pinching).
    pub scale: f32,
    /// Rotation in degrees since activation.
    pub rotation: f32,
    /// Completed tap count for tap gestures.
    pub repeat_count: u32,
    pub timestamp_ms: u64,
}

pub type GestureCallback = Rc<dyn Fn(&GestureEvent)>;

#[derive(Clone, Copy, Debug, Default)]
struct PointerTrack {
    id: u32,
    down: Offset,
    current: Offset,
}

/// A single gesture recognizer.
pub struct Recognizer {
    kind: GestureKind,
    node: Option<NodeId>,
    state: RecognizerState,
    on_start: Option<GestureCallback>,
    on_update: Option<GestureCallback>,
    on_end: Option<GestureCallback>,
    pointers: Vec<PointerTrack>,
    down_ms: u64,
    completed_taps: u32,
    last_up_ms: Option<u64>,
    pending: Option<GestureEvent>,
    initial_span: f32,
    initial_angle: f32,
    last_centroid: Offset,
}

impl Recognizer {
    pub fn new(kind: GestureKind) -> Self {
        Self {
            kind,
            node: None,
            state: RecognizerState::Ready,
            on_start: None,
            on_update: None,
            on_end: None,
            pointers: Vec::new(),
            down_ms: 0,
            completed_taps: 0,
            last_up_ms: None,
            pending: None,
            initial_span: 0.0,
            initial_angle: 0.0,
            last_centroid: Offset::ZERO,
        }
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Fires on accept; the only callback discrete gestures (tap, long
    /// press) ever invoke.
    pub fn on_start(mut self, callback: GestureCallback) -> Self {
        self.on_start = Some(callback);
        self
    }

    /// Fires for each post-accept movement of a continuous gesture.
    pub fn on_update(mut self, callback: GestureCallback) -> Self {
        self.on_update = Some(callback);
        self
    }

    /// Fires when a continuous gesture's last pointer lifts.
    pub fn on_end(mut self, callback: GestureCallback) -> Self {
        self.on_end = Some(callback);
        self
    }

    pub fn kind(&self) -> GestureKind {
        self.kind
    }

    pub fn state(&self) -> RecognizerState {
        self.state
    }

    fn track_mut(&mut self, pointer: u32) -> Option<&mut PointerTrack> {
        self.pointers.iter_mut().find(|t| t.id == pointer)
    }

    fn centroid(&self) -> Offset {
        if self.pointers.is_empty() {
            return Offset::ZERO;
        }
        let mut sum = Offset::ZERO;
        for track in &self.pointers {
            sum += track.current;
        }
        Offset::new(
            sum.x / self.pointers.len() as f32,
            sum.y / self.pointers.len() as f32,
        )
    }

    fn down_centroid(&self) -> Offset {
        if self.pointers.is_empty() {
            return Offset::ZERO;
        }
        let mut sum = Offset::ZERO;
        for track in &self.pointers {
            sum += track.down;
        }
        Offset::new(
            sum.x / self.pointers.len() as f32,
            sum.y / self.pointers.len() as f32,
        )
    }

    /// Distance between the first two tracked pointers.
    fn span(&self) -> f32 {
        match self.pointers.as_slice() {
            [a, b, ..] => (b.current - a.current).distance(),
            _ => 0.0,
        }
    }

    /// Angle of the vector between the first two pointers, in degrees.
    fn angle(&self) -> f32 {
        match self.pointers.as_slice() {
            [a, b, ..] => {
                let v = b.current - a.current;
                v.y.atan2(v.x).to_degrees()
            }
            _ => 0.0,
        }
    }

    fn event_at(&self, position: Offset, timestamp_ms: u64) -> GestureEvent {
        GestureEvent {
            node: self.node,
            position,
            delta: Offset::ZERO,
            scale: 1.0,
            rotation: 0.0,
            repeat_count: 0,
            timestamp_ms,
        }
    }

    /// Feeds one touch sample and returns the verdict proposal.
    pub fn handle_event(&mut self, event: &TouchEvent) -> Transition {
        if event.phase == TouchPhase::Cancel {
            self.reset();
            return Transition::None;
        }
        if self.state.is_closed() {
            return Transition::None;
        }
        if self.state == RecognizerState::Pending {
            // The proposal stands; keep tracking but leave the verdict to
            // the arbiter.
            if let Some(track) = self.track_mut(event.pointer) {
                track.current = event.position;
            }
            if event.phase == TouchPhase::Up {
                self.pointers.retain(|t| t.id != event.pointer);
            }
            return Transition::None;
        }
        match event.phase {
            TouchPhase::Down => self.on_down(event),
            TouchPhase::Move => self.on_move(event),
            TouchPhase::Up => self.on_up(event),
            TouchPhase::Cancel => Transition::None,
        }
    }

    fn on_down(&mut self, event: &TouchEvent) -> Transition {
        if let GestureKind::Tap { .. } = self.kind {
            if let Some(last_up) = self.last_up_ms {
                if event.timestamp_ms.saturating_sub(last_up) > MULTI_TAP_TIMEOUT_MS {
                    self.completed_taps = 0;
                }
            }
        }
        if self.track_mut(event.pointer).is_none() {
            self.pointers.push(PointerTrack {
                id: event.pointer,
                down: event.position,
                current: event.position,
            });
        }
        if self.pointers.len() == 1 {
            self.down_ms = event.timestamp_ms;
        }
        let required = self.required_pointers();
        if self.pointers.len() >= required {
            self.state = RecognizerState::Detecting;
            if required >= 2 {
                self.initial_span = self.span();
                self.initial_angle = self.angle();
            }
            self.last_centroid = self.centroid();
        }
        Transition::None
    }

    fn required_pointers(&self) -> usize {
        match self.kind {
            GestureKind::Tap { .. } | GestureKind::LongPress { .. } => 1,
            GestureKind::Pan { fingers, .. } => fingers.max(1) as usize,
            GestureKind::Pinch { .. } | GestureKind::Rotation { .. } => 2,
        }
    }

    fn on_move(&mut self, event: &TouchEvent) -> Transition {
        if self.state == RecognizerState::Accepted
            && matches!(
                self.kind,
                GestureKind::Tap { .. } | GestureKind::LongPress { .. }
            )
        {
            return Transition::None;
        }
        if let Some(track) = self.track_mut(event.pointer) {
            track.current = event.position;
        } else if matches!(self.kind, GestureKind::Pan { .. }) {
            // Late attach: a sequenced predecessor held the pointer while it
            // was down, so the pan first sees it mid-stream.
            self.pointers.push(PointerTrack {
                id: event.pointer,
                down: event.position,
                current: event.position,
            });
            if self.pointers.len() >= self.required_pointers()
                && self.state == RecognizerState::Ready
            {
                self.state = RecognizerState::Detecting;
                self.last_centroid = self.centroid();
            }
            return Transition::None;
        } else {
            return Transition::None;
        }
        match self.kind {
            GestureKind::Tap { .. } => {
                let moved = self
                    .pointers
                    .iter()
                    .any(|t| (t.current - t.down).distance() > TAP_SLOP);
                if moved {
                    Transition::Reject
                } else {
                    Transition::None
                }
            }
            GestureKind::LongPress { duration_ms } => {
                let moved = self
                    .pointers
                    .iter()
                    .any(|t| (t.current - t.down).distance() > TAP_SLOP);
                if moved {
                    return Transition::Reject;
                }
                self.check_long_press(duration_ms, event.timestamp_ms)
            }
            GestureKind::Pan { distance, .. } => {
                if self.state == RecognizerState::Accepted {
                    let centroid = self.centroid();
                    let mut update = self.event_at(centroid, event.timestamp_ms);
                    update.delta = centroid - self.last_centroid;
                    self.last_centroid = centroid;
                    if let Some(cb) = &self.on_update {
                        cb(&update);
                    }
                    return Transition::None;
                }
                if self.state != RecognizerState::Detecting {
                    return Transition::None;
                }
                let centroid = self.centroid();
                let travel = centroid - self.down_centroid();
                if travel.distance() >= distance.max(0.0) {
                    let mut pending = self.event_at(centroid, event.timestamp_ms);
                    pending.delta = travel;
                    self.pending = Some(pending);
                    self.last_centroid = centroid;
                    Transition::Accept
                } else {
                    Transition::None
                }
            }
            GestureKind::Pinch { distance } => {
                if self.pointers.len() < 2 {
                    return Transition::None;
                }
                let scale = if self.initial_span > 0.0 {
                    self.span() / self.initial_span
                } else {
                    1.0
                };
                if self.state == RecognizerState::Accepted {
                    let mut update = self.event_at(self.centroid(), event.timestamp_ms);
                    update.scale = scale;
                    if let Some(cb) = &self.on_update {
                        cb(&update);
                    }
                    return Transition::None;
                }
                if self.state == RecognizerState::Detecting
                    && (self.span() - self.initial_span).abs() >= distance.max(0.0)
                {
                    let mut pending = self.event_at(self.centroid(), event.timestamp_ms);
                    pending.scale = scale;
                    self.pending = Some(pending);
                    Transition::Accept
                } else {
                    Transition::None
                }
            }
            GestureKind::Rotation { angle_deg } => {
                if self.pointers.len() < 2 {
                    return Transition::None;
                }
                let turned = angle_delta(self.initial_angle, self.angle());
                if self.state == RecognizerState::Accepted {
                    let mut update = self.event_at(self.centroid(), event.timestamp_ms);
                    update.rotation = turned;
                    if let Some(cb) = &self.on_update {
                        cb(&update);
                    }
                    return Transition::None;
                }
                if self.state == RecognizerState::Detecting && turned.abs() >= angle_deg.max(0.0)
                {
                    let mut pending = self.event_at(self.centroid(), event.timestamp_ms);
                    pending.rotation = turned;
                    self.pending = Some(pending);
                    Transition::Accept
                } else {
                    Transition::None
                }
            }
        }
    }

    fn on_up(&mut self, event: &TouchEvent) -> Transition {
        let position = event.position;
        if let Some(track) = self.track_mut(event.pointer) {
            track.current = position;
        }
        let verdict = match self.kind {
            GestureKind::Tap { count } => {
                let within_slop = self
                    .track_mut(event.pointer)
                    .map(|t| (t.current - t.down).distance() <= TAP_SLOP)
                    .unwrap_or(false);
                if !within_slop {
                    Transition::Reject
                } else {
                    self.completed_taps += 1;
                    self.last_up_ms = Some(event.timestamp_ms);
                    if self.completed_taps >= count.max(1) {
                        let mut pending = self.event_at(position, event.timestamp_ms);
                        pending.repeat_count = self.completed_taps;
                        self.pending = Some(pending);
                        Transition::Accept
                    } else {
                        Transition::None
                    }
                }
            }
            GestureKind::LongPress { duration_ms } => {
                if self.state == RecognizerState::Accepted {
                    Transition::None
                } else {
                    match self.check_long_press(duration_ms, event.timestamp_ms) {
                        Transition::Accept => Transition::Accept,
                        _ => Transition::Reject,
                    }
                }
            }
            GestureKind::Pan { .. }
            | GestureKind::Pinch { .. }
            | GestureKind::Rotation { .. } => {
                if self.state == RecognizerState::Accepted {
                    if self.pointers.len() <= 1 {
                        let end = self.event_at(position, event.timestamp_ms);
                        if let Some(cb) = &self.on_end {
                            cb(&end);
                        }
                    }
                    Transition::None
                } else if self.pointers.len() <= self.required_pointers() {
                    Transition::Reject
                } else {
                    Transition::None
                }
            }
        };
        self.pointers.retain(|t| t.id != event.pointer);
        verdict
    }

    fn check_long_press(&mut self, duration_ms: u64, now_ms: u64) -> Transition {
        if self.state != RecognizerState::Detecting {
            return Transition::None;
        }
        if now_ms.saturating_sub(self.down_ms) >= duration_ms {
            let position = self.centroid();
            self.pending = Some(self.event_at(position, now_ms));
            Transition::Accept
        } else {
            Transition::None
        }
    }

    /// Time-driven check; only long press proposes from here.
    pub fn tick(&mut self, now_ms: u64) -> Transition {
        match self.kind {
            GestureKind::LongPress { duration_ms } if !self.pointers.is_empty() => {
                self.check_long_press(duration_ms, now_ms)
            }
            _ => Transition::None,
        }
    }

    /// Confirms the win. Fires the start callback with the proposal payload.
    pub fn accept(&mut self) {
        if self.state.is_closed() || self.state == RecognizerState::Accepted {
            return;
        }
        self.state = RecognizerState::Accepted;
        trace!("gesture accepted: {:?}", self.kind);
        let event = self.pending.take().unwrap_or_default();
        if matches!(self.kind, GestureKind::Tap { .. }) {
            self.completed_taps = 0;
        }
        if let Some(cb) = &self.on_start {
            cb(&event);
        }
    }

    pub fn reject(&mut self) {
        if self.state != RecognizerState::Accepted {
            self.state = RecognizerState::Rejected;
            self.pending = None;
        } else {
            // Latecomer override: a higher-priority peer decided after this
            // one had already fired. Nothing can be unfired; close it out.
            self.state = RecognizerState::Rejected;
        }
    }

    pub fn block(&mut self) {
        if !self.state.is_closed() && self.state != RecognizerState::Accepted {
            self.state = RecognizerState::Blocked;
            self.pending = None;
        }
    }

    pub fn pend(&mut self) {
        if self.state == RecognizerState::Detecting {
            self.state = RecognizerState::Pending;
        }
    }

    /// Hard reset for pointer cancel: everything clears, including multi-tap
    /// progress.
    pub fn reset(&mut self) {
        self.state = RecognizerState::Ready;
        self.pointers.clear();
        self.pending = None;
        self.completed_taps = 0;
        self.last_up_ms = None;
        self.initial_span = 0.0;
        self.initial_angle = 0.0;
    }

    /// Soft reset at the end of a touch sequence. Multi-tap progress
    /// survives so the next tap can continue the chain.
    pub fn reset_status(&mut self) {
        let keep_taps = matches!(self.kind, GestureKind::Tap { .. })
            && matches!(
                self.state,
                RecognizerState::Detecting | RecognizerState::Ready
            );
        self.state = RecognizerState::Ready;
        self.pointers.clear();
        self.pending = None;
        self.initial_span = 0.0;
        self.initial_angle = 0.0;
        if !keep_taps {
            self.completed_taps = 0;
            self.last_up_ms = None;
        }
    }

    /// Whether `other` detects the same gesture with the same parameters.
    pub fn is_equivalent(&self, other: &Recognizer) -> bool {
        self.kind == other.kind && self.node == other.node
    }

    /// Transfers in-flight sequence state from an equivalent predecessor, so
    /// a rebuilt tree does not drop a gesture mid-sequence. Non-equivalent
    /// recognizers stay fresh; the return value reports whether the transfer
    /// happened.
    pub fn reconcile_from(&mut self, other: &Recognizer) -> bool {
        if !self.is_equivalent(other) {
            return false;
        }
        self.state = other.state;
        self.pointers = other.pointers.clone();
        self.down_ms = other.down_ms;
        self.completed_taps = other.completed_taps;
        self.last_up_ms = other.last_up_ms;
        self.pending = other.pending;
        self.initial_span = other.initial_span;
        self.initial_angle = other.initial_angle;
        self.last_centroid = other.last_centroid;
        true
    }
}

/// Shortest signed angular difference in degrees.
fn angle_delta(from: f32, to: f32) -> f32 {
    let mut delta = to - from;
    while delta > 180.0 {
        delta -= 360.0;
    }
    while delta < -180.0 {
        delta += 360.0;
    }
    delta
}

// ======================================================================
// Groups
// ======================================================================

/// Arbitration policy of a recognizer group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GesturePolicy {
    /// Highest-priority member that wants to accept wins; everyone else is
    /// blocked. Member order is priority order.
    Exclusive,
    /// Members win and lose independently; one member's verdict never
    /// rejects a sibling.
    Parallel,
    /// Members must complete in order; a member rejecting fails the group.
    Sequenced,
}

/// Shared handle to a recognizer or group, as stored on nodes and in
/// touch-test results.
pub type GestureHandle = Rc<RefCell<GestureRecognizer>>;

/// A recognizer tree node: a single recognizer or a policy group.
pub enum GestureRecognizer {
    Single(Recognizer),
    Group(RecognizerGroup),
}

impl GestureRecognizer {
    pub fn handle(self) -> GestureHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn state(&self) -> RecognizerState {
        match self {
            GestureRecognizer::Single(r) => r.state(),
            GestureRecognizer::Group(g) => g.state,
        }
    }

    pub fn handle_event(&mut self, event: &TouchEvent) -> Transition {
        match self {
            GestureRecognizer::Single(r) => r.handle_event(event),
            GestureRecognizer::Group(g) => g.handle_event(event),
        }
    }

    pub fn tick(&mut self, now_ms: u64) -> Transition {
        match self {
            GestureRecognizer::Single(r) => r.tick(now_ms),
            GestureRecognizer::Group(g) => g.tick(now_ms),
        }
    }

    pub fn accept(&mut self) {
        match self {
            GestureRecognizer::Single(r) => r.accept(),
            GestureRecognizer::Group(g) => g.accept(),
        }
    }

    pub fn reject(&mut self) {
        match self {
            GestureRecognizer::Single(r) => r.reject(),
            GestureRecognizer::Group(g) => g.reject(),
        }
    }

    pub fn block(&mut self) {
        match self {
            GestureRecognizer::Single(r) => r.block(),
            GestureRecognizer::Group(g) => g.block(),
        }
    }

    pub fn pend(&mut self) {
        match self {
            GestureRecognizer::Single(r) => r.pend(),
            GestureRecognizer::Group(g) => g.pend(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            GestureRecognizer::Single(r) => r.reset(),
            GestureRecognizer::Group(g) => g.reset(),
        }
    }

    pub fn reset_status(&mut self) {
        match self {
            GestureRecognizer::Single(r) => r.reset_status(),
            GestureRecognizer::Group(g) => g.reset_status(),
        }
    }

    /// Recursive state transfer between structurally equivalent trees.
    /// Reports `false` when the shapes differ and the receiver stays fresh.
    pub fn reconcile_from(&mut self, other: &GestureRecognizer) -> bool {
        match (self, other) {
            (GestureRecognizer::Single(new), GestureRecognizer::Single(old)) => {
                new.reconcile_from(old)
            }
            (GestureRecognizer::Group(new), GestureRecognizer::Group(old)) => {
                new.reconcile_from(old)
            }
            _ => false,
        }
    }
}

impl From<Recognizer> for GestureRecognizer {
    fn from(recognizer: Recognizer) -> Self {
        GestureRecognizer::Single(recognizer)
    }
}

/// A group of recognizers arbitrated under one [`GesturePolicy`].
pub struct RecognizerGroup {
    policy: GesturePolicy,
    members: Vec<GestureHandle>,
    state: RecognizerState,
    /// Sequenced cursor: index of the member currently allowed to detect.
    active: usize,
    /// Members that proposed accept and await the group-level verdict.
    pending_accepts: Vec<usize>,
}

impl RecognizerGroup {
    pub fn new(policy: GesturePolicy, members: Vec<GestureHandle>) -> Self {
        Self {
            policy,
            members,
            state: RecognizerState::Ready,
            active: 0,
            pending_accepts: Vec::new(),
        }
    }

    pub fn policy(&self) -> GesturePolicy {
        self.policy
    }

    pub fn members(&self) -> &[GestureHandle] {
        &self.members
    }

    pub fn state(&self) -> RecognizerState {
        self.state
    }

    fn member_state(&self, index: usize) -> RecognizerState {
        self.members[index].borrow().state()
    }

    pub fn handle_event(&mut self, event: &TouchEvent) -> Transition {
        if event.phase == TouchPhase::Cancel {
            self.reset();
            return Transition::None;
        }
        if self.state.is_closed() {
            return Transition::None;
        }
        if self.members.is_empty() {
            return Transition::Reject;
        }
        match self.policy {
            GesturePolicy::Exclusive => self.dispatch_exclusive(event),
            GesturePolicy::Parallel => self.dispatch_parallel(event),
            GesturePolicy::Sequenced => self.dispatch_sequenced(event),
        }
    }

    pub fn tick(&mut self, now_ms: u64) -> Transition {
        if self.state.is_closed() || self.members.is_empty() {
            return Transition::None;
        }
        match self.policy {
            GesturePolicy::Exclusive => {
                for index in 0..self.members.len() {
                    if self.member_state(index).is_closed() {
                        continue;
                    }
                    let transition = self.members[index].borrow_mut().tick(now_ms);
                    if transition == Transition::Accept {
                        self.note_accept_proposal(index);
                    }
                }
                self.adjudicate_exclusive()
            }
            GesturePolicy::Parallel => {
                let mut result = Transition::None;
                for index in 0..self.members.len() {
                    if self.member_state(index).is_closed() {
                        continue;
                    }
                    let transition = self.members[index].borrow_mut().tick(now_ms);
                    if transition == Transition::Accept {
                        if self.state == RecognizerState::Accepted {
                            self.members[index].borrow_mut().accept();
                        } else {
                            result = Transition::Accept;
                            if !self.pending_accepts.contains(&index) {
                                self.pending_accepts.push(index);
                            }
                        }
                    }
                }
                result
            }
            GesturePolicy::Sequenced => {
                let index = self.active.min(self.members.len().saturating_sub(1));
                let transition = self.members[index].borrow_mut().tick(now_ms);
                self.sequenced_verdict(index, transition)
            }
        }
    }

    // -- exclusive ------------------------------------------------------

    fn dispatch_exclusive(&mut self, event: &TouchEvent) -> Transition {
        for index in 0..self.members.len() {
            if self.member_state(index).is_closed() {
                continue;
            }
            let transition = self.members[index].borrow_mut().handle_event(event);
            match transition {
                Transition::Accept => self.note_accept_proposal(index),
                Transition::Reject => self.members[index].borrow_mut().reject(),
                Transition::None => {}
            }
        }
        self.adjudicate_exclusive()
    }

    fn note_accept_proposal(&mut self, index: usize) {
        if self.state == RecognizerState::Accepted {
            // A winner already streams; latecomers are sidelined.
            if !self.pending_accepts.contains(&index) {
                self.members[index].borrow_mut().block();
            }
            return;
        }
        self.members[index].borrow_mut().pend();
        if !self.pending_accepts.contains(&index) {
            self.pending_accepts.push(index);
        }
    }

    /// Picks a winner once every higher-priority member has dropped out.
    /// The win is recorded but not fired; `accept` fires it so an outer
    /// arbiter gets its say first.
    fn adjudicate_exclusive(&mut self) -> Transition {
        if self.state == RecognizerState::Accepted {
            return Transition::None;
        }
        let mut all_closed = true;
        for index in 0..self.members.len() {
            let state = self.member_state(index);
            if state.is_closed() {
                continue;
            }
            all_closed = false;
            if state == RecognizerState::Pending {
                let beaten = (0..index).all(|i| self.member_state(i).is_closed());
                if beaten {
                    self.pending_accepts.retain(|&i| i == index);
                    if self.pending_accepts.is_empty() {
                        self.pending_accepts.push(index);
                    }
                    return Transition::Accept;
                }
            } else {
                // A higher-or-equal priority member is still undecided; any
                // lower pending member keeps waiting.
                return Transition::None;
            }
        }
        if all_closed {
            self.state = RecognizerState::Rejected;
            Transition::Reject
        } else {
            Transition::None
        }
    }

    // -- parallel -------------------------------------------------------

    fn dispatch_parallel(&mut self, event: &TouchEvent) -> Transition {
        let mut proposed = false;
        let mut all_closed = true;
        for index in 0..self.members.len() {
            if self.member_state(index).is_closed() {
                continue;
            }
            let transition = self.members[index].borrow_mut().handle_event(event);
            match transition {
                Transition::Accept => {
                    if self.state == RecognizerState::Accepted {
                        // Group already won; siblings accept independently.
                        self.members[index].borrow_mut().accept();
                    } else {
                        if !self.pending_accepts.contains(&index) {
                            self.pending_accepts.push(index);
                        }
                        proposed = true;
                    }
                }
                Transition::Reject => self.members[index].borrow_mut().reject(),
                Transition::None => {}
            }
            if !self.member_state(index).is_closed() {
                all_closed = false;
            }
        }
        if proposed {
            return Transition::Accept;
        }
        if all_closed && self.state != RecognizerState::Accepted {
            self.state = RecognizerState::Rejected;
            return Transition::Reject;
        }
        Transition::None
    }

    // -- sequenced ------------------------------------------------------

    fn dispatch_sequenced(&mut self, event: &TouchEvent) -> Transition {
        let index = self.active.min(self.members.len() - 1);
        let transition = self.members[index].borrow_mut().handle_event(event);
        let verdict = self.sequenced_verdict(index, transition);
        if verdict != Transition::None {
            return verdict;
        }
        // Once the active member streams, the next member may begin
        // detecting on the same sequence.
        if self.member_state(index) == RecognizerState::Accepted && index + 1 < self.members.len()
        {
            let next = index + 1;
            let transition = self.members[next].borrow_mut().handle_event(event);
            match transition {
                Transition::Accept => {
                    self.active = next;
                    if self.state == RecognizerState::Accepted {
                        self.members[next].borrow_mut().accept();
                    } else {
                        if !self.pending_accepts.contains(&next) {
                            self.pending_accepts.push(next);
                        }
                        return Transition::Accept;
                    }
                }
                Transition::Reject => self.members[next].borrow_mut().reject(),
                Transition::None => {}
            }
        }
        Transition::None
    }

    fn sequenced_verdict(&mut self, index: usize, transition: Transition) -> Transition {
        match transition {
            Transition::Accept => {
                if self.state == RecognizerState::Accepted {
                    self.members[index].borrow_mut().accept();
                    Transition::None
                } else {
                    if !self.pending_accepts.contains(&index) {
                        self.pending_accepts.push(index);
                    }
                    Transition::Accept
                }
            }
            Transition::Reject => {
                // The chain is broken; the whole sequence fails.
                self.members[index].borrow_mut().reject();
                self.state = RecognizerState::Rejected;
                Transition::Reject
            }
            Transition::None => Transition::None,
        }
    }

    // -- group verdicts -------------------------------------------------

    /// Outer arbiter confirmed the group: fire the recorded winner(s).
    pub fn accept(&mut self) {
        if self.state.is_closed() {
            return;
        }
        self.state = RecognizerState::Accepted;
        let winners = std::mem::take(&mut self.pending_accepts);
        for &index in &winners {
            self.members[index].borrow_mut().accept();
        }
        if self.policy == GesturePolicy::Exclusive {
            for index in 0..self.members.len() {
                if !winners.contains(&index) {
                    self.members[index].borrow_mut().block();
                }
            }
        }
    }

    /// Outer arbiter rejected the group: every member loses, including any
    /// that had already fired.
    pub fn reject(&mut self) {
        self.state = RecognizerState::Rejected;
        self.pending_accepts.clear();
        for member in &self.members {
            member.borrow_mut().reject();
        }
    }

    pub fn block(&mut self) {
        if self.state.is_closed() || self.state == RecognizerState::Accepted {
            return;
        }
        self.state = RecognizerState::Blocked;
        self.pending_accepts.clear();
        for member in &self.members {
            member.borrow_mut().block();
        }
    }

    pub fn pend(&mut self) {
        if self.state == RecognizerState::Ready || self.state == RecognizerState::Detecting {
            self.state = RecognizerState::Pending;
        }
    }

    pub fn reset(&mut self) {
        self.state = RecognizerState::Ready;
        self.active = 0;
        self.pending_accepts.clear();
        for member in &self.members {
            member.borrow_mut().reset();
        }
    }

    pub fn reset_status(&mut self) {
        self.state = RecognizerState::Ready;
        self.active = 0;
        self.pending_accepts.clear();
        for member in &self.members {
            member.borrow_mut().reset_status();
        }
    }

    /// Transfers member state from a structurally equivalent group. Reports
    /// `false` when the policy or shape differs, or any member pair fails to
    /// transfer.
    pub fn reconcile_from(&mut self, other: &RecognizerGroup) -> bool {
        if self.policy != other.policy || self.members.len() != other.members.len() {
            return false;
        }
        self.state = other.state;
        self.active = other.active;
        self.pending_accepts = other.pending_accepts.clone();
        let mut transferred = true;
        for (new, old) in self.members.iter().zip(&other.members) {
            transferred &= new.borrow_mut().reconcile_from(&old.borrow());
        }
        transferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn touch(pointer: u32, phase: TouchPhase, x: f32, y: f32, t: u64) -> TouchEvent {
        TouchEvent {
            pointer,
            phase,
            position: Offset::new(x, y),
            timestamp_ms: t,
        }
    }

    fn counting_tap(count: u32, fired: &Rc<Cell<u32>>) -> Recognizer {
        let fired = fired.clone();
        Recognizer::new(GestureKind::Tap { count })
            .on_start(Rc::new(move |_| fired.set(fired.get() + 1)))
    }

    #[test]
    fn tap_accepts_on_up_within_slop() {
        let fired = Rc::new(Cell::new(0));
        let mut tap = counting_tap(1, &fired);
        assert_eq!(
            tap.handle_event(&touch(0, TouchPhase::Down, 10.0, 10.0, 0)),
            Transition::None
        );
        assert_eq!(
            tap.handle_event(&touch(0, TouchPhase::Up, 12.0, 11.0, 50)),
            Transition::Accept
        );
        // Callbacks wait for the owner's verdict.
        assert_eq!(fired.get(), 0);
        tap.accept();
        assert_eq!(fired.get(), 1);
        assert_eq!(tap.state(), RecognizerState::Accepted);
    }

    #[test]
    fn tap_rejects_on_slop_exceeded() {
        let fired = Rc::new(Cell::new(0));
        let mut tap = counting_tap(1, &fired);
        tap.handle_event(&touch(0, TouchPhase::Down, 10.0, 10.0, 0));
        assert_eq!(
            tap.handle_event(&touch(0, TouchPhase::Move, 30.0, 10.0, 20)),
            Transition::Reject
        );
    }

    #[test]
    fn double_tap_needs_two_ups_within_timeout() {
        let fired = Rc::new(Cell::new(0));
        let mut tap = counting_tap(2, &fired);
        tap.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        assert_eq!(
            tap.handle_event(&touch(0, TouchPhase::Up, 0.0, 0.0, 40)),
            Transition::None
        );
        tap.reset_status();
        tap.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 120));
        assert_eq!(
            tap.handle_event(&touch(0, TouchPhase::Up, 0.0, 0.0, 160)),
            Transition::Accept
        );
    }

    #[test]
    fn double_tap_times_out_and_restarts() {
        let fired = Rc::new(Cell::new(0));
        let mut tap = counting_tap(2, &fired);
        tap.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        tap.handle_event(&touch(0, TouchPhase::Up, 0.0, 0.0, 40));
        tap.reset_status();
        // Beyond the multi-tap window: this down restarts the count.
        tap.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 1000));
        assert_eq!(
            tap.handle_event(&touch(0, TouchPhase::Up, 0.0, 0.0, 1040)),
            Transition::None
        );
    }

    #[test]
    fn long_press_accepts_via_tick() {
        let mut press = Recognizer::new(GestureKind::long_press());
        press.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        assert_eq!(press.tick(400), Transition::None);
        assert_eq!(press.tick(500), Transition::Accept);
    }

    #[test]
    fn long_press_rejects_on_early_up() {
        let mut press = Recognizer::new(GestureKind::long_press());
        press.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        assert_eq!(
            press.handle_event(&touch(0, TouchPhase::Up, 0.0, 0.0, 100)),
            Transition::Reject
        );
    }

    #[test]
    fn pan_streams_updates_after_accept() {
        let updates = Rc::new(Cell::new(0));
        let ended = Rc::new(Cell::new(false));
        let u = updates.clone();
        let e = ended.clone();
        let mut pan = Recognizer::new(GestureKind::pan())
            .on_update(Rc::new(move |_| u.set(u.get() + 1)))
            .on_end(Rc::new(move |_| e.set(true)));
        pan.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        assert_eq!(
            pan.handle_event(&touch(0, TouchPhase::Move, 10.0, 0.0, 20)),
            Transition::Accept
        );
        pan.accept();
        pan.handle_event(&touch(0, TouchPhase::Move, 20.0, 0.0, 40));
        pan.handle_event(&touch(0, TouchPhase::Move, 30.0, 0.0, 60));
        assert_eq!(updates.get(), 2);
        pan.handle_event(&touch(0, TouchPhase::Up, 30.0, 0.0, 80));
        assert!(ended.get());
    }

    #[test]
    fn pinch_scale_tracks_span() {
        let scale = Rc::new(Cell::new(0.0f32));
        let s = scale.clone();
        let mut pinch = Recognizer::new(GestureKind::pinch())
            .on_update(Rc::new(move |e| s.set(e.scale)));
        pinch.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        pinch.handle_event(&touch(1, TouchPhase::Down, 100.0, 0.0, 0));
        assert_eq!(
            pinch.handle_event(&touch(1, TouchPhase::Move, 150.0, 0.0, 20)),
            Transition::Accept
        );
        pinch.accept();
        pinch.handle_event(&touch(1, TouchPhase::Move, 200.0, 0.0, 40));
        assert!((scale.get() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn rotation_reports_signed_degrees() {
        let angle = Rc::new(Cell::new(0.0f32));
        let a = angle.clone();
        let mut rot = Recognizer::new(GestureKind::rotation())
            .on_update(Rc::new(move |e| a.set(e.rotation)));
        rot.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        rot.handle_event(&touch(1, TouchPhase::Down, 100.0, 0.0, 0));
        assert_eq!(
            rot.handle_event(&touch(1, TouchPhase::Move, 100.0, 50.0, 20)),
            Transition::Accept
        );
        rot.accept();
        rot.handle_event(&touch(1, TouchPhase::Move, 0.0, 100.0, 40));
        assert!((angle.get() - 90.0).abs() < 0.5);
    }

    #[test]
    fn cancel_resets_to_ready() {
        let mut pan = Recognizer::new(GestureKind::pan());
        pan.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        pan.handle_event(&touch(0, TouchPhase::Move, 10.0, 0.0, 20));
        pan.accept();
        pan.handle_event(&touch(0, TouchPhase::Cancel, 10.0, 0.0, 30));
        assert_eq!(pan.state(), RecognizerState::Ready);
    }

    #[test]
    fn exclusive_group_totality() {
        // Every member ends up accepted, rejected, or blocked.
        let tap = GestureRecognizer::Single(Recognizer::new(GestureKind::tap())).handle();
        let press =
            GestureRecognizer::Single(Recognizer::new(GestureKind::long_press())).handle();
        let mut group =
            RecognizerGroup::new(GesturePolicy::Exclusive, vec![tap.clone(), press.clone()]);

        group.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        let verdict = group.handle_event(&touch(0, TouchPhase::Up, 0.0, 0.0, 50));
        assert_eq!(verdict, Transition::Accept);
        group.accept();

        assert_eq!(tap.borrow().state(), RecognizerState::Accepted);
        assert_eq!(press.borrow().state(), RecognizerState::Rejected);
    }

    #[test]
    fn exclusive_priority_holds_lower_member_pending() {
        // Lower-priority long press matures while the tap is still viable;
        // it must wait, then win once the tap rejects.
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        let tap = GestureRecognizer::Single(Recognizer::new(GestureKind::tap())).handle();
        let press = GestureRecognizer::Single(
            Recognizer::new(GestureKind::long_press())
                .on_start(Rc::new(move |_| f.set(true))),
        )
        .handle();
        let mut group =
            RecognizerGroup::new(GesturePolicy::Exclusive, vec![tap.clone(), press.clone()]);

        group.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        assert_eq!(group.tick(600), Transition::None);
        assert_eq!(press.borrow().state(), RecognizerState::Pending);
        assert!(!fired.get());

        // Tap gives up on movement; the pending press is promoted.
        let verdict = group.handle_event(&touch(0, TouchPhase::Move, 30.0, 0.0, 620));
        assert_eq!(verdict, Transition::Accept);
        group.accept();
        assert!(fired.get());
    }

    #[test]
    fn parallel_members_win_independently() {
        let pinch_fired = Rc::new(Cell::new(false));
        let rot_fired = Rc::new(Cell::new(false));
        let pf = pinch_fired.clone();
        let rf = rot_fired.clone();
        let pinch = GestureRecognizer::Single(
            Recognizer::new(GestureKind::pinch()).on_start(Rc::new(move |_| pf.set(true))),
        )
        .handle();
        let rot = GestureRecognizer::Single(
            Recognizer::new(GestureKind::rotation()).on_start(Rc::new(move |_| rf.set(true))),
        )
        .handle();
        let mut group =
            RecognizerGroup::new(GesturePolicy::Parallel, vec![pinch.clone(), rot.clone()]);

        group.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        group.handle_event(&touch(1, TouchPhase::Down, 100.0, 0.0, 0));
        // Diagonal move changes both span and angle.
        let verdict = group.handle_event(&touch(1, TouchPhase::Move, 160.0, 60.0, 20));
        assert_eq!(verdict, Transition::Accept);
        group.accept();
        assert!(pinch_fired.get());
        assert!(rot_fired.get());
        assert_eq!(pinch.borrow().state(), RecognizerState::Accepted);
        assert_eq!(rot.borrow().state(), RecognizerState::Accepted);
    }

    #[test]
    fn sequenced_rejects_whole_group_when_first_fails() {
        let press =
            GestureRecognizer::Single(Recognizer::new(GestureKind::long_press())).handle();
        let pan = GestureRecognizer::Single(Recognizer::new(GestureKind::pan())).handle();
        let mut group = RecognizerGroup::new(GesturePolicy::Sequenced, vec![press, pan]);

        group.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        let verdict = group.handle_event(&touch(0, TouchPhase::Up, 0.0, 0.0, 100));
        assert_eq!(verdict, Transition::Reject);
        assert_eq!(group.state(), RecognizerState::Rejected);
    }

    #[test]
    fn sequenced_chains_long_press_into_pan() {
        let pan_fired = Rc::new(Cell::new(false));
        let pf = pan_fired.clone();
        let press =
            GestureRecognizer::Single(Recognizer::new(GestureKind::long_press())).handle();
        let pan = GestureRecognizer::Single(
            Recognizer::new(GestureKind::pan()).on_start(Rc::new(move |_| pf.set(true))),
        )
        .handle();
        let mut group = RecognizerGroup::new(GesturePolicy::Sequenced, vec![press, pan]);

        group.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        assert_eq!(group.tick(600), Transition::Accept);
        group.accept();
        // Press is streaming; the first move hands the pointer to the pan,
        // the second crosses its activation distance.
        group.handle_event(&touch(0, TouchPhase::Move, 20.0, 0.0, 650));
        group.handle_event(&touch(0, TouchPhase::Move, 40.0, 0.0, 700));
        assert!(pan_fired.get());
    }

    #[test]
    fn reconcile_transfers_in_flight_state() {
        let mut old = Recognizer::new(GestureKind::double_tap());
        old.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        old.handle_event(&touch(0, TouchPhase::Up, 0.0, 0.0, 40));

        let mut new = Recognizer::new(GestureKind::double_tap());
        assert!(new.reconcile_from(&old));
        new.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 100));
        assert_eq!(
            new.handle_event(&touch(0, TouchPhase::Up, 0.0, 0.0, 140)),
            Transition::Accept
        );
    }

    #[test]
    fn reconcile_skips_mismatched_kind() {
        let mut old = Recognizer::new(GestureKind::tap());
        old.handle_event(&touch(0, TouchPhase::Down, 0.0, 0.0, 0));
        let mut new = Recognizer::new(GestureKind::pan());
        assert!(!new.reconcile_from(&old));
        assert_eq!(new.state(), RecognizerState::Ready);
    }
}
