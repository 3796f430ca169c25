//! Tile dashboard engine: a registry of tile types, a persisted layout
//! document, a retained render surface with per-tile failure containment,
//! and the long-press edit mode used to drag, resize, configure, add, and
//! remove tiles.
//!
//! The [`Dashboard`] session owns all of it. [`DashboardRuntime`] and
//! [`CliDriver`] put a session on a terminal.

pub mod config;
pub mod cursor;
pub mod dashboard;
pub mod edit;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod render;
pub mod runtime;
pub mod settings;
pub mod store;
pub mod tiles;
pub mod width;

pub use config::EngineConfig;
pub use dashboard::{Dashboard, PointerOutcome, TickOutcome};
pub use edit::{EditMode, EditModeController, GestureTracker};
pub use error::{DashboardError, DefinitionError, DriverError, Result, StoreError, TileError, TileResult};
pub use geometry::{Point, Rect, Size};
pub use layout::{GridSpec, place};
pub use logging::{LogEvent, LogFields, LogLevel, Logger, LoggingError, LoggingResult};
pub use manager::{ManagerSelection, ManagerView, TileManager};
pub use metrics::{DashboardMetrics, MetricSnapshot};
pub use model::{DefaultLayout, DefaultTile, LayoutDocument, TileConfig, TileInstance, TileSize};
pub use registry::{TileDefinition, TileRegistry, TileRender, TileSettings};
pub use render::{
    AnsiRenderer, ContentHost, FrameStatus, MissingTilePolicy, Overlay, RendererSettings,
    Surface, TileContext, TileFrame,
};
pub use runtime::{CliDriver, DashboardRuntime, DriverResult, RuntimeEvent};
pub use settings::{FieldValue, SettingsHost, SettingsPanel};
pub use store::{FileStore, KeyValueStore, LayoutStore, MemoryStore, SaveOutcome};
pub use width::display_width;
