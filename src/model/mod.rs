//! Layout document model: tile instances, global extras, and default layouts.

mod core;
mod defaults;

pub use core::{
    DEFAULT_GRID_COLS, DEFAULT_TILE_PADDING, EXTRA_CALENDAR, EXTRA_GRID_COLS, EXTRA_TILE_PADDING,
    Extras, InstanceIdGenerator, LayoutDocument, TileConfig, TileInstance, TileSize,
    merge_missing,
};
pub use defaults::{DefaultLayout, DefaultTile};
