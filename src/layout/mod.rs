//! Grid placement for the dashboard canvas.
//!
//! Tiles flow row-major onto a fixed number of columns, the way a CSS grid
//! with `grid-auto-flow: row` places spanning items.

pub mod grid;

pub use grid::{GridSpec, place};
