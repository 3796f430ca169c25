use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::logging::Logger;
use crate::metrics::DashboardMetrics;
use crate::render::MissingTilePolicy;
use crate::store::STORAGE_KEY;

pub const ENV_ROW_HEIGHT: &str = "TILEBOARD_ROW_HEIGHT";
pub const ENV_LONG_PRESS_MS: &str = "TILEBOARD_LONG_PRESS_MS";
pub const ENV_STATE_DIR: &str = "TILEBOARD_STATE_DIR";

/// Dashboard session parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Key the layout document is persisted under.
    pub storage_key: String,
    /// Height of one grid row in cells.
    pub row_height: u16,
    /// Upper bound for `rowSpan` when resizing.
    pub row_cap: u16,
    /// Hold time on empty canvas before edit mode unlocks.
    pub long_press: Duration,
    /// Interval between synthetic tick events.
    pub tick_interval: Duration,
    pub missing_policy: MissingTilePolicy,
    /// Directory for the file-backed store; `None` keeps state in memory.
    pub state_dir: Option<PathBuf>,
    /// Optional structured logger used by every component.
    pub logger: Option<Logger>,
    /// Metrics accumulator, shared with whoever wants snapshots.
    pub metrics: Option<Arc<Mutex<DashboardMetrics>>>,
    /// Interval between metrics snapshot emissions. Zero disables snapshots.
    pub metrics_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            row_height: 4,
            row_cap: 4,
            long_press: Duration::from_millis(700),
            tick_interval: Duration::from_millis(200),
            missing_policy: MissingTilePolicy::Placeholder,
            state_dir: None,
            logger: None,
            metrics: None,
            metrics_interval: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `TILEBOARD_*` environment variables. Values
    /// that do not parse are ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(rows) = lookup(ENV_ROW_HEIGHT).and_then(|v| v.trim().parse::<u16>().ok()) {
            self.row_height = rows.max(1);
        }
        if let Some(ms) = lookup(ENV_LONG_PRESS_MS).and_then(|v| v.trim().parse::<u64>().ok()) {
            self.long_press = Duration::from_millis(ms);
        }
        if let Some(dir) = lookup(ENV_STATE_DIR).filter(|v| !v.trim().is_empty()) {
            self.state_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_missing_policy(mut self, policy: MissingTilePolicy) -> Self {
        self.missing_policy = policy;
        self
    }

    pub fn with_row_height(mut self, rows: u16) -> Self {
        self.row_height = rows.max(1);
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(DashboardMetrics::new())));
        }
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<DashboardMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}
