//! Edit mode and the pointer gestures it enables.

mod gesture;
mod mode;

pub use gesture::{DragSession, Gesture, GestureTracker, ResizeSession, resize_span};
pub use mode::{EditMode, EditModeController, EditTransition};
