//! Error types shared across the dashboard engine.

mod types;

pub use types::{
    DashboardError, DefinitionError, DriverError, Result, StoreError, StoreResult, TileError,
    TileResult,
};
