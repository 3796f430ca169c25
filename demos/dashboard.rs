//! Tileboard: terminal dashboard
//!
//! Runs the built-in tiles (clock, schedule, notes, to-do, calculator) in a
//! full-screen terminal session.
//!
//! ```bash
//! TILEBOARD_STATE_DIR=~/.local/state/tileboard cargo run --example dashboard
//! ```
//!
//! Keyboard shortcuts:
//! * `e` or a long press on empty space: unlock edit mode
//! * drag `≡` to reorder, drag `◢` to resize, click `*` for settings
//! * `d` / `Enter`: done editing
//! * `m`: Tile Manager (Up/Down, Enter add/remove, paste ICS, `Ctrl+S` save)
//! * `q` / `Ctrl+C`: exit
//!
//! Without `TILEBOARD_STATE_DIR` the layout lives in memory only. Logs go to
//! `tileboard.log` in the state directory when one is set.

use tileboard::logging::FileSink;
use tileboard::tiles::{builtin_registry, default_layout};
use tileboard::{AnsiRenderer, CliDriver, Dashboard, DashboardRuntime, EngineConfig, Logger};

const LOG_MAX_BYTES: u64 = 1024 * 1024;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut config = EngineConfig::from_env();
    if let Some(dir) = config.state_dir.clone() {
        std::fs::create_dir_all(&dir)?;
        let sink = FileSink::new(dir.join("tileboard.log"), LOG_MAX_BYTES)?;
        config = config.with_logger(Logger::new(sink));
        config.enable_metrics();
    }

    let dashboard = Dashboard::from_config(config, builtin_registry()?, default_layout())?;
    let runtime = DashboardRuntime::new(dashboard, AnsiRenderer::with_default());
    let runtime = CliDriver::new(runtime).run()?;

    if let Some(outcome) = runtime.dashboard().last_save() {
        println!("last save: {outcome:?}");
    }
    Ok(())
}
