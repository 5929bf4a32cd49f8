//! Trellis: a declarative UI pipeline core.
//!
//! This facade re-exports the pipeline crates so applications depend on a
//! single crate: `trellis-geometry` (value types), `trellis-core` (frame
//! tree, layout, paint), and `trellis-input` (hit testing, gestures, event
//! routing).

/// Frame tree, dirty tracking, and the layout/paint pipeline.
pub use trellis_core::*;

/// Geometry value types.
pub use trellis_geometry::{
    Alignment, Axis, Dimension, EdgeInsets, LayoutConstraint, Offset, Rect, Size, TextDirection,
};

/// Input events, gestures, and the event manager.
pub use trellis_input::*;

/// Convenience imports for Trellis applications.
pub mod prelude {
    pub use trellis_core::prelude::*;
    pub use trellis_input::prelude::*;
}
