//! Terminal drivers that own a runtime and manage the terminal's modes.

mod cli;

pub use cli::{CliDriver, DriverResult};
