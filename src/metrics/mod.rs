use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Counters accumulated by the dashboard session.
#[derive(Debug, Default, Clone)]
pub struct DashboardMetrics {
    render_passes: u64,
    tiles_rendered: u64,
    tile_failures: u64,
    missing_tiles: u64,
    saves: u64,
    save_failures: u64,
    saves_skipped: u64,
    timer_fires: u64,
}

impl DashboardMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_render(&mut self, rendered: usize, failed: usize, missing: usize) {
        self.render_passes = self.render_passes.saturating_add(1);
        self.tiles_rendered = self.tiles_rendered.saturating_add(rendered as u64);
        self.tile_failures = self.tile_failures.saturating_add(failed as u64);
        self.missing_tiles = self.missing_tiles.saturating_add(missing as u64);
    }

    pub fn record_tile_failure(&mut self) {
        self.tile_failures = self.tile_failures.saturating_add(1);
    }

    pub fn record_save(&mut self) {
        self.saves = self.saves.saturating_add(1);
    }

    pub fn record_save_failure(&mut self) {
        self.save_failures = self.save_failures.saturating_add(1);
    }

    pub fn record_save_skipped(&mut self) {
        self.saves_skipped = self.saves_skipped.saturating_add(1);
    }

    pub fn record_timer_fires(&mut self, count: usize) {
        if count > 0 {
            self.timer_fires = self.timer_fires.saturating_add(count as u64);
        }
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            render_passes: self.render_passes,
            tiles_rendered: self.tiles_rendered,
            tile_failures: self.tile_failures,
            missing_tiles: self.missing_tiles,
            saves: self.saves,
            save_failures: self.save_failures,
            saves_skipped: self.saves_skipped,
            timer_fires: self.timer_fires,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub render_passes: u64,
    pub tiles_rendered: u64,
    pub tile_failures: u64,
    pub missing_tiles: u64,
    pub saves: u64,
    pub save_failures: u64,
    pub saves_skipped: u64,
    pub timer_fires: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "dashboard_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("render_passes".to_string(), json!(self.render_passes));
        map.insert("tiles_rendered".to_string(), json!(self.tiles_rendered));
        map.insert("tile_failures".to_string(), json!(self.tile_failures));
        map.insert("missing_tiles".to_string(), json!(self.missing_tiles));
        map.insert("saves".to_string(), json!(self.saves));
        map.insert("save_failures".to_string(), json!(self.save_failures));
        map.insert("saves_skipped".to_string(), json!(self.saves_skipped));
        map.insert("timer_fires".to_string(), json!(self.timer_fires));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let mut metrics = DashboardMetrics::new();
        metrics.record_render(3, 1, 1);
        metrics.record_save();
        metrics.record_save_skipped();
        metrics.record_timer_fires(0);
        let snap = metrics.snapshot(Duration::from_millis(1500));
        assert_eq!(snap.render_passes, 1);
        assert_eq!(snap.tiles_rendered, 3);
        assert_eq!(snap.tile_failures, 1);
        assert_eq!(snap.saves, 1);
        assert_eq!(snap.saves_skipped, 1);
        assert_eq!(snap.timer_fires, 0);
        let event = snap.to_log_event("tileboard::metrics");
        assert_eq!(event.fields["uptime_ms"], json!(1500));
    }
}
