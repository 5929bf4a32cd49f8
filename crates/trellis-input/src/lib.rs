//! Input handling for Trellis: raw events, gesture recognition, and the
//! event manager that routes platform input through hit testing to
//! recognizers and node handlers.
//!
//! Recognizers propose verdicts; arbitration (explicit groups, plus the
//! implicit per-sequence exclusive set built from the hit chain) decides who
//! wins. Depth in the hit chain is priority: the innermost node's gestures
//! get first claim on a touch sequence.

pub mod event_manager;
pub mod events;
pub mod recognizer;

pub use event_manager::{
    AxisHandler, EventManager, HoverHandler, KeyHandler, MOUSE_POINTER,
};
pub use events::{
    AxisEvent, KeyAction, KeyEvent, MouseAction, MouseButton, MouseEvent, TouchEvent, TouchPhase,
};
pub use recognizer::{
    GestureCallback, GestureEvent, GestureHandle, GestureKind, GesturePolicy, GestureRecognizer,
    Recognizer, RecognizerGroup, RecognizerState, Transition, LONG_PRESS_DURATION_MS,
    MULTI_TAP_TIMEOUT_MS, PAN_DISTANCE_DEFAULT, TAP_SLOP,
};

pub mod prelude {
    pub use crate::event_manager::EventManager;
    pub use crate::events::{
        AxisEvent, KeyEvent, MouseEvent, TouchEvent, TouchPhase,
    };
    pub use crate::recognizer::{
        GestureEvent, GestureKind, GesturePolicy, GestureRecognizer, Recognizer, RecognizerGroup,
        RecognizerState,
    };
}
