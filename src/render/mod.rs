//! Render engine: rebuilds the retained [`Surface`] from the layout document
//! and paints it to a terminal.

mod ansi;
mod boundary;
mod context;
mod engine;
mod lifecycle;
mod surface;

pub use ansi::{AnsiRenderer, Overlay, RendererSettings};
pub use boundary::{QuietPanicHook, contain};
pub use context::{ContextRequest, TileContext};
pub use engine::{MissingTilePolicy, RenderEngine, RenderReport, TimerReport};
pub use lifecycle::{TileLifecycle, TimerCallback, TimerId};
pub use surface::{ContentHost, FrameStatus, HitTarget, Surface, TileFrame};
