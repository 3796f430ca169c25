//! Tile definitions and the registry that resolves a type id to one.

mod core;
mod definition;

pub use core::TileRegistry;
pub use definition::{ConfigFactory, TileDefinition, TileRender, TileSettings};
