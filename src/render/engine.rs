use std::collections::HashMap;
use std::time::Instant;

use serde_json::json;

use crate::logging::{LogLevel, Logger, TARGET_RENDER, emit, json_kv, json_str};
use crate::model::LayoutDocument;
use crate::registry::TileRegistry;
use crate::settings::build_panel;

use super::boundary::contain;
use super::context::{ContextRequest, TileContext};
use super::lifecycle::TileLifecycle;
use super::surface::{Surface, TileFrame};

/// What to draw for an instance whose type is not registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingTilePolicy {
    #[default]
    Placeholder,
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub rendered: usize,
    pub failed: usize,
    pub missing: usize,
    pub disabled: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerReport {
    pub fired: usize,
    pub failed: usize,
}

/// Rebuilds the surface from the authoritative document on every pass.
pub struct RenderEngine {
    surface: Surface,
    lifecycles: HashMap<String, TileLifecycle>,
    requests: Vec<ContextRequest>,
    missing_policy: MissingTilePolicy,
    logger: Option<Logger>,
}

impl RenderEngine {
    pub fn new(missing_policy: MissingTilePolicy, logger: Option<Logger>) -> Self {
        Self {
            surface: Surface::new(),
            lifecycles: HashMap::new(),
            requests: Vec::new(),
            missing_policy,
            logger,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub fn lifecycle(&self, instance_id: &str) -> Option<&TileLifecycle> {
        self.lifecycles.get(instance_id)
    }

    /// Requests raised by tiles since the last call.
    pub fn take_requests(&mut self) -> Vec<ContextRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Fully rebuild the surface. Never fails: a broken tile degrades to an
    /// inline error marker and a missing type to a placeholder or nothing.
    pub fn render_all(
        &mut self,
        document: &LayoutDocument,
        registry: &TileRegistry,
        editable: bool,
    ) -> RenderReport {
        self.teardown_all();

        let mut report = RenderReport::default();
        let mut frames = Vec::with_capacity(document.tiles.len());

        for idx in document.presentation_order() {
            let tile = &document.tiles[idx];
            if !tile.is_enabled() {
                report.disabled += 1;
                continue;
            }

            let Some(definition) = registry.get(&tile.type_id) else {
                report.missing += 1;
                emit(
                    self.logger.as_ref(),
                    LogLevel::Warn,
                    TARGET_RENDER,
                    "tile_type_missing",
                    [
                        json_str("instance_id", tile.instance_id.clone()),
                        json_str("type_id", tile.type_id.clone()),
                    ],
                );
                if self.missing_policy == MissingTilePolicy::Placeholder {
                    let mut frame = TileFrame::missing(tile, editable);
                    frame.panel = build_panel(None, tile, document);
                    frames.push(frame);
                }
                continue;
            };

            let mut frame = TileFrame::new(tile, editable);
            let mut lifecycle = TileLifecycle::new(tile.instance_id.clone());
            let outcome = {
                let mut ctx = TileContext::new(
                    &tile.instance_id,
                    document,
                    &mut self.requests,
                    &mut lifecycle,
                );
                let host = &mut frame.content;
                contain(|| definition.renderer().render(host, tile, &mut ctx))
            };

            match outcome {
                Ok(()) => report.rendered += 1,
                Err(err) => {
                    report.failed += 1;
                    lifecycle.teardown();
                    emit(
                        self.logger.as_ref(),
                        LogLevel::Error,
                        TARGET_RENDER,
                        "tile_render_failed",
                        [
                            json_str("instance_id", tile.instance_id.clone()),
                            json_str("type_id", tile.type_id.clone()),
                            json_str("error", err.to_string()),
                        ],
                    );
                    frame.fail(err.to_string());
                }
            }

            frame.panel = build_panel(Some(definition), tile, document);
            self.lifecycles.insert(tile.instance_id.clone(), lifecycle);
            frames.push(frame);
        }

        self.surface.replace(frames);
        emit(
            self.logger.as_ref(),
            LogLevel::Debug,
            TARGET_RENDER,
            "render_completed",
            [
                json_kv("rendered", json!(report.rendered)),
                json_kv("failed", json!(report.failed)),
                json_kv("missing", json!(report.missing)),
                json_kv("generation", json!(self.surface.generation())),
            ],
        );
        report
    }

    /// Fire every due tile timer. A failing timer marks its frame failed and
    /// loses all of that render's timers.
    pub fn fire_timers(&mut self, document: &LayoutDocument, now: Instant) -> TimerReport {
        let mut report = TimerReport::default();

        for (instance_id, lifecycle) in self.lifecycles.iter_mut() {
            if lifecycle.timer_count() == 0 {
                continue;
            }
            let Some(frame) = self.surface.frame_mut(instance_id) else {
                continue;
            };

            let mut timers = lifecycle.take_timers();
            let mut failure = None;
            for timer in timers.iter_mut() {
                if !timer.due(now) {
                    continue;
                }
                report.fired += 1;
                let mut ctx = TileContext::new(instance_id, document, &mut self.requests, lifecycle);
                let host = &mut frame.content;
                let callback = timer.callback_mut();
                if let Err(err) = contain(|| callback(host, &mut ctx)) {
                    failure = Some((timer.id(), err));
                    break;
                }
            }

            match failure {
                None => lifecycle.restore_timers(timers),
                Some((timer_id, err)) => {
                    report.failed += 1;
                    lifecycle.teardown();
                    frame.fail(err.to_string());
                    emit(
                        self.logger.as_ref(),
                        LogLevel::Error,
                        TARGET_RENDER,
                        "tile_timer_failed",
                        [
                            json_str("instance_id", instance_id.clone()),
                            json_kv("timer", json!(format!("{timer_id:?}"))),
                            json_str("error", err.to_string()),
                        ],
                    );
                }
            }
        }

        report
    }

    /// Tear down the lifecycle of a single tile, e.g. right before deletion.
    pub fn discard(&mut self, instance_id: &str) {
        if let Some(mut lifecycle) = self.lifecycles.remove(instance_id) {
            lifecycle.teardown();
        }
    }

    pub fn teardown_all(&mut self) {
        for (_, mut lifecycle) in self.lifecycles.drain() {
            lifecycle.teardown();
        }
    }
}

impl Drop for RenderEngine {
    fn drop(&mut self) {
        self.teardown_all();
    }
}
