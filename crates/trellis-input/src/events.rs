//! Raw input events delivered by the host platform.
//!
//! All events are plain `Copy` values in surface coordinates with millisecond
//! timestamps supplied by the platform clock; nothing in the input layer
//! reads a clock of its own.

use trellis_geometry::Offset;

/// Lifecycle phase of one touch pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchPhase {
    Down,
    Move,
    Up,
    /// The platform took the pointer away (e.g. the window lost focus).
    Cancel,
}

/// One touch sample for one pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchEvent {
    pub pointer: u32,
    pub phase: TouchPhase,
    pub position: Offset,
    pub timestamp_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseAction {
    Move,
    Press,
    Release,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// One mouse sample. Moves drive hover; presses and releases are translated
/// into synthetic touch events by the event manager.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseEvent {
    pub action: MouseAction,
    pub button: MouseButton,
    pub position: Offset,
    pub timestamp_ms: u64,
}

/// Scroll-wheel / trackpad axis event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisEvent {
    pub position: Offset,
    pub delta: Offset,
    pub timestamp_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

/// One key event, routed to the focused node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyEvent {
    pub key_code: u32,
    pub action: KeyAction,
    pub timestamp_ms: u64,
}
