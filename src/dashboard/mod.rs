//! The dashboard session: owns the live document and funnels every mutation
//! through persist-then-rerender.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;

use crate::config::EngineConfig;
use crate::edit::{EditMode, EditModeController, EditTransition, Gesture, GestureTracker};
use crate::error::{DashboardError, Result};
use crate::geometry::{Point, Rect};
use crate::layout::GridSpec;
use crate::logging::{LogLevel, Logger, TARGET_EDIT, TARGET_RENDER, emit, json_kv, json_str};
use crate::manager::{ManagerSelection, TileManager, add_instance, remove_instance};
use crate::metrics::DashboardMetrics;
use crate::model::{DefaultLayout, EXTRA_CALENDAR, InstanceIdGenerator, LayoutDocument, TileSize};
use crate::registry::TileRegistry;
use crate::render::{ContextRequest, HitTarget, RenderEngine, RenderReport, Surface, TimerReport};
use crate::settings::{FieldValue, SettingsPanel, save_panel};
use crate::store::{FileStore, KeyValueStore, LayoutStore, MemoryStore, SaveOutcome};

/// A render pass plus at most one follow-up requested from inside it.
const MAX_RENDER_PASSES: usize = 2;

/// What a pointer event did.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerOutcome {
    Ignored,
    PressStarted,
    PressCancelled,
    DragStarted(String),
    DragPreview {
        instance_id: String,
        offset: (i32, i32),
    },
    /// Drag released; `target` is the tile it swapped with, if any.
    DragDropped {
        instance_id: String,
        target: Option<String>,
    },
    ResizeStarted(String),
    ResizePreview {
        instance_id: String,
        size: TileSize,
    },
    Resized {
        instance_id: String,
        size: TileSize,
    },
    PanelOpened(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub unlocked: bool,
    pub timers: TimerReport,
    pub rerendered: bool,
}

/// Session object owned by the top-level controller. Holds the canonical
/// document, the store, the render engine, and the interaction controllers.
pub struct Dashboard {
    config: EngineConfig,
    registry: TileRegistry,
    defaults: DefaultLayout,
    document: LayoutDocument,
    store: LayoutStore,
    engine: RenderEngine,
    edit: EditModeController,
    gestures: GestureTracker,
    manager: TileManager,
    ids: InstanceIdGenerator,
    canvas: Rect,
    last_save: Option<SaveOutcome>,
    logger: Option<Logger>,
    metrics: Option<Arc<Mutex<DashboardMetrics>>>,
}

impl Dashboard {
    /// Load (or materialize) the document from `backend` and render it once.
    pub fn new<B>(
        config: EngineConfig,
        registry: TileRegistry,
        defaults: DefaultLayout,
        backend: B,
    ) -> Self
    where
        B: KeyValueStore + 'static,
    {
        let logger = config.logger.clone();
        let mut store = LayoutStore::new(backend)
            .with_key(config.storage_key.clone())
            .with_logger(logger.clone());
        let document = store.load(&defaults, &registry);

        let mut dashboard = Self {
            engine: RenderEngine::new(config.missing_policy, logger.clone()),
            edit: EditModeController::new(config.long_press),
            metrics: config.metrics_handle(),
            config,
            registry,
            defaults,
            document,
            store,
            gestures: GestureTracker::new(),
            manager: TileManager::new(),
            ids: InstanceIdGenerator::new(),
            canvas: Rect::new(0, 0, 120, 36),
            last_save: None,
            logger,
        };
        dashboard.rerender();
        dashboard
    }

    /// File-backed when `state_dir` is configured, in-memory otherwise.
    pub fn from_config(
        config: EngineConfig,
        registry: TileRegistry,
        defaults: DefaultLayout,
    ) -> Result<Self> {
        match config.state_dir.clone() {
            Some(dir) => {
                let backend = FileStore::new(dir)?;
                Ok(Self::new(config, registry, defaults, backend))
            }
            None => Ok(Self::new(config, registry, defaults, MemoryStore::new())),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn document(&self) -> &LayoutDocument {
        &self.document
    }

    pub fn registry(&self) -> &TileRegistry {
        &self.registry
    }

    pub fn defaults(&self) -> &DefaultLayout {
        &self.defaults
    }

    pub fn surface(&self) -> &Surface {
        self.engine.surface()
    }

    pub fn engine(&self) -> &RenderEngine {
        &self.engine
    }

    pub fn edit_mode(&self) -> EditMode {
        self.edit.mode()
    }

    /// The edit toolbar is shown exactly while unlocked.
    pub fn toolbar_visible(&self) -> bool {
        self.edit.is_unlocked()
    }

    pub fn manager(&self) -> &TileManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut TileManager {
        &mut self.manager
    }

    pub fn last_save(&self) -> Option<&SaveOutcome> {
        self.last_save.as_ref()
    }

    pub fn logger(&self) -> Option<&Logger> {
        self.logger.as_ref()
    }

    pub fn canvas(&self) -> Rect {
        self.canvas
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<DashboardMetrics>>> {
        self.metrics.clone()
    }

    pub fn grid_spec(&self) -> GridSpec {
        GridSpec::new(
            self.document.grid_cols(),
            self.config.row_height,
            self.document.tile_padding(),
        )
    }

    pub fn set_canvas(&mut self, canvas: Rect) {
        self.canvas = canvas;
        self.place();
    }

    fn place(&mut self) {
        let spec = self.grid_spec();
        self.engine.surface_mut().apply_placement(spec, self.canvas);
    }

    fn record(&self, f: impl FnOnce(&mut DashboardMetrics)) {
        if let Some(metrics) = &self.metrics {
            if let Ok(mut guard) = metrics.lock() {
                f(&mut guard);
            }
        }
    }

    /// Persist the current document. Failures are logged and reported, never raised.
    pub fn persist(&mut self) -> SaveOutcome {
        let outcome = self.store.save(&self.document);
        match &outcome {
            SaveOutcome::Saved => self.record(DashboardMetrics::record_save),
            SaveOutcome::Unchanged => self.record(DashboardMetrics::record_save_skipped),
            SaveOutcome::Failed { .. } => self.record(DashboardMetrics::record_save_failure),
        }
        self.last_save = Some(outcome.clone());
        outcome
    }

    /// Rebuild the surface from the document. Requests raised by tiles during
    /// the pass are applied afterwards; a rerender requested from inside a
    /// pass runs at most one follow-up pass.
    pub fn rerender(&mut self) -> RenderReport {
        let open_panel = self.surface().open_panel().map(|frame| frame.panel.clone());
        let editable = self.edit.is_unlocked();
        let mut report = RenderReport::default();

        for pass in 1..=MAX_RENDER_PASSES {
            report = self
                .engine
                .render_all(&self.document, &self.registry, editable);
            self.record(|m| m.record_render(report.rendered, report.failed, report.missing));

            let (changed, wants_rerender) = self.apply_requests();
            if changed {
                self.persist();
            }
            if !wants_rerender {
                break;
            }
            if pass == MAX_RENDER_PASSES {
                emit(
                    self.logger.as_ref(),
                    LogLevel::Warn,
                    TARGET_RENDER,
                    "rerender_request_dropped",
                    [json_kv("passes", json!(pass))],
                );
            }
        }

        if let Some(panel) = open_panel {
            if let Some(frame) = self.engine.surface_mut().frame_mut(&panel.instance_id) {
                frame.panel = panel;
            }
        }
        self.place();
        report
    }

    /// Persist then rerender: the tail of every mutation.
    pub fn commit(&mut self) -> SaveOutcome {
        let outcome = self.persist();
        self.rerender();
        outcome
    }

    /// Apply queued tile requests. Returns (document changed, rerender wanted).
    fn apply_requests(&mut self) -> (bool, bool) {
        let mut changed = false;
        let mut rerender = false;
        for request in self.engine.take_requests() {
            match request {
                ContextRequest::UpdateConfig { instance_id, patch } => {
                    match self.document.find_mut(&instance_id) {
                        Some(tile) => {
                            for (key, value) in patch {
                                if tile.config.get(&key) != Some(&value) {
                                    tile.config.insert(key, value);
                                    changed = true;
                                }
                            }
                        }
                        None => emit(
                            self.logger.as_ref(),
                            LogLevel::Warn,
                            TARGET_RENDER,
                            "config_update_for_unknown_tile",
                            [json_str("instance_id", instance_id)],
                        ),
                    }
                }
                ContextRequest::Rerender => rerender = true,
            }
        }
        (changed, rerender)
    }

    // Edit mode

    /// Explicit "manage tiles" unlock.
    pub fn enter_edit_mode(&mut self) -> bool {
        match self.edit.unlock() {
            Some(transition) => {
                self.on_transition(transition);
                true
            }
            None => false,
        }
    }

    /// Leave edit mode, persist, and rerender.
    pub fn done(&mut self) -> bool {
        let Some(transition) = self.edit.lock() else {
            return false;
        };
        self.on_transition(transition);
        self.commit();
        true
    }

    pub fn toggle_edit_mode(&mut self) -> bool {
        if self.edit.is_unlocked() {
            self.done()
        } else {
            self.enter_edit_mode()
        }
    }

    fn on_transition(&mut self, transition: EditTransition) {
        let surface = self.engine.surface_mut();
        match transition {
            EditTransition::Unlocked => surface.set_editable(true),
            EditTransition::Locked => {
                if self.gestures.cancel() {
                    surface.clear_previews();
                }
                surface.close_panels();
                surface.set_editable(false);
            }
        }
        self.place();
        let message = match transition {
            EditTransition::Unlocked => "edit_mode_unlocked",
            EditTransition::Locked => "edit_mode_locked",
        };
        emit(self.logger.as_ref(), LogLevel::Info, TARGET_EDIT, message, []);
    }

    // Pointer input, in canvas cells

    pub fn pointer_down(&mut self, at: Point, now: Instant) -> PointerOutcome {
        if self.gestures.is_active() {
            return PointerOutcome::Ignored;
        }
        let unlocked = self.edit.is_unlocked();
        match self.surface().hit_test(at) {
            HitTarget::EmptyCanvas if !unlocked => {
                self.edit.press_canvas(now);
                PointerOutcome::PressStarted
            }
            HitTarget::DragHandle(id) if unlocked => {
                let Some(rect) = self.surface().frame(&id).map(|f| f.rect) else {
                    return PointerOutcome::Ignored;
                };
                self.gestures.begin_drag(&id, at, rect);
                PointerOutcome::DragStarted(id)
            }
            HitTarget::ResizeHandle(id) if unlocked => {
                let Some(size) = self.surface().frame(&id).map(|f| f.size) else {
                    return PointerOutcome::Ignored;
                };
                self.gestures.begin_resize(&id, at, size);
                PointerOutcome::ResizeStarted(id)
            }
            HitTarget::Gear(id) if unlocked => match self.open_settings(&id) {
                Ok(true) => PointerOutcome::PanelOpened(id),
                _ => PointerOutcome::Ignored,
            },
            _ => PointerOutcome::Ignored,
        }
    }

    pub fn pointer_move(&mut self, at: Point) -> PointerOutcome {
        if self.edit.press_pending() && self.surface().hit_test(at) != HitTarget::EmptyCanvas {
            self.edit.cancel_press();
            return PointerOutcome::PressCancelled;
        }

        let spec = self.grid_spec();
        let column_unit = spec.column_unit(self.canvas.width);
        let row_cap = self.config.row_cap;
        match self.gestures.active_mut() {
            Some(Gesture::Drag(session)) => {
                let offset = session.update(at);
                let instance_id = session.instance_id.clone();
                if let Some(frame) = self.engine.surface_mut().frame_mut(&instance_id) {
                    frame.drag_offset = Some(offset);
                }
                PointerOutcome::DragPreview {
                    instance_id,
                    offset,
                }
            }
            Some(Gesture::Resize(session)) => {
                let size = session.update(at, column_unit, spec.row_unit(), spec.columns, row_cap);
                let instance_id = session.instance_id.clone();
                if let Some(frame) = self.engine.surface_mut().frame_mut(&instance_id) {
                    frame.live_size = Some(size);
                }
                self.place();
                PointerOutcome::ResizePreview { instance_id, size }
            }
            None => PointerOutcome::Ignored,
        }
    }

    pub fn pointer_up(&mut self, at: Point) -> PointerOutcome {
        if self.edit.cancel_press() {
            return PointerOutcome::PressCancelled;
        }

        match self.gestures.finish() {
            Some(Gesture::Drag(mut session)) => {
                session.update(at);
                let target = self
                    .surface()
                    .nearest_other(&session.instance_id, session.dropped_center())
                    .map(|frame| frame.instance_id.clone());
                match &target {
                    Some(target) => {
                        if let Err(err) = self.document.swap_order(&session.instance_id, target) {
                            self.log_edit_error("tile_reorder_failed", &err);
                        }
                        emit(
                            self.logger.as_ref(),
                            LogLevel::Info,
                            TARGET_EDIT,
                            "tile_reordered",
                            [
                                json_str("instance_id", session.instance_id.clone()),
                                json_str("target", target.clone()),
                            ],
                        );
                        self.commit();
                    }
                    None => {
                        self.engine.surface_mut().clear_previews();
                        self.place();
                    }
                }
                PointerOutcome::DragDropped {
                    instance_id: session.instance_id,
                    target,
                }
            }
            Some(Gesture::Resize(mut session)) => {
                let spec = self.grid_spec();
                let size = session.update(
                    at,
                    spec.column_unit(self.canvas.width),
                    spec.row_unit(),
                    spec.columns,
                    self.config.row_cap,
                );
                let instance_id = session.instance_id;
                if let Some(tile) = self.document.find_mut(&instance_id) {
                    tile.set_size(size);
                }
                // The surface already shows the committed span.
                if let Some(frame) = self.engine.surface_mut().frame_mut(&instance_id) {
                    frame.size = size;
                    frame.live_size = None;
                }
                self.place();
                emit(
                    self.logger.as_ref(),
                    LogLevel::Info,
                    TARGET_EDIT,
                    "tile_resized",
                    [
                        json_str("instance_id", instance_id.clone()),
                        json_kv("col_span", json!(size.col_span)),
                        json_kv("row_span", json!(size.row_span)),
                    ],
                );
                self.persist();
                PointerOutcome::Resized { instance_id, size }
            }
            None => PointerOutcome::Ignored,
        }
    }

    /// Pointer left the canvas. Drags and resizes keep tracking.
    pub fn pointer_leave(&mut self) -> PointerOutcome {
        if self.edit.cancel_press() {
            PointerOutcome::PressCancelled
        } else {
            PointerOutcome::Ignored
        }
    }

    /// Advance time: long-press detection and tile timers.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if let Some(transition) = self.edit.poll(now) {
            self.on_transition(transition);
            outcome.unlocked = true;
        }

        outcome.timers = self.engine.fire_timers(&self.document, now);
        self.record(|m| {
            m.record_timer_fires(outcome.timers.fired);
            for _ in 0..outcome.timers.failed {
                m.record_tile_failure();
            }
        });

        let (changed, wants_rerender) = self.apply_requests();
        if changed || wants_rerender {
            self.commit();
            outcome.rerendered = true;
        }
        outcome
    }

    fn log_edit_error(&self, message: &str, err: &DashboardError) {
        emit(
            self.logger.as_ref(),
            LogLevel::Error,
            TARGET_EDIT,
            message,
            [json_str("error", err.to_string())],
        );
    }

    // Settings panel

    /// Open the gear's panel. Only one panel is open at a time, and only
    /// while unlocked.
    pub fn open_settings(&mut self, instance_id: &str) -> Result<bool> {
        if !self.edit.is_unlocked() {
            return Ok(false);
        }
        let surface = self.engine.surface_mut();
        if surface.frame(instance_id).is_none() {
            return Err(DashboardError::TileNotFound(instance_id.to_string()));
        }
        surface.close_panels();
        if let Some(frame) = surface.frame_mut(instance_id) {
            frame.panel.open = true;
        }
        Ok(true)
    }

    pub fn settings_panel(&self) -> Option<&SettingsPanel> {
        self.surface().open_panel().map(|frame| &frame.panel)
    }

    fn settings_panel_mut(&mut self) -> Option<&mut SettingsPanel> {
        self.engine
            .surface_mut()
            .frames_mut()
            .iter_mut()
            .find(|frame| frame.panel.open)
            .map(|frame| &mut frame.panel)
    }

    pub fn set_settings_label(&mut self, label: impl Into<String>) -> bool {
        match self.settings_panel_mut() {
            Some(panel) => {
                panel.label = label.into();
                true
            }
            None => false,
        }
    }

    pub fn set_settings_field(&mut self, key: &str, value: FieldValue) -> bool {
        self.settings_panel_mut()
            .is_some_and(|panel| panel.section.set(key, value))
    }

    /// Run the type's `save_config`, apply the label, persist, rerender.
    /// A rejected save leaves the document untouched and the panel open.
    pub fn save_settings(&mut self) -> Result<()> {
        let Some(panel) = self.settings_panel().cloned() else {
            return Ok(());
        };
        if let Err(err) = save_panel(&mut self.document, &self.registry, &panel) {
            self.log_edit_error("settings_save_failed", &err);
            if let Some(open) = self.settings_panel_mut() {
                open.error = Some(err.to_string());
            }
            return Err(err);
        }
        self.engine.surface_mut().close_panels();
        self.commit();
        Ok(())
    }

    /// Hide the panel. No mutation.
    pub fn close_settings(&mut self) {
        self.engine.surface_mut().close_panels();
    }

    /// Delete the instance whose panel is open.
    pub fn delete_from_settings(&mut self) -> Result<()> {
        let Some(instance_id) = self.settings_panel().map(|panel| panel.instance_id.clone()) else {
            return Ok(());
        };
        self.delete_tile(&instance_id)
    }

    /// Tear down the tile, remove it, persist, rerender.
    pub fn delete_tile(&mut self, instance_id: &str) -> Result<()> {
        if !self.document.contains(instance_id) {
            return Err(DashboardError::TileNotFound(instance_id.to_string()));
        }
        self.engine.discard(instance_id);
        remove_instance(&mut self.document, instance_id, self.logger.as_ref())?;
        self.commit();
        if self.manager.is_open() {
            self.manager.refresh(&self.document, &self.registry);
        }
        Ok(())
    }

    // Tile Manager

    /// Opening the manager is the explicit "manage tiles" action, which also
    /// unlocks edit mode.
    pub fn open_manager(&mut self) {
        self.enter_edit_mode();
        self.manager.open(&self.document, &self.registry);
    }

    pub fn close_manager(&mut self) {
        self.manager.close();
    }

    pub fn add_tile(&mut self, type_id: &str) -> Result<String> {
        let instance_id = add_instance(
            &mut self.document,
            &self.registry,
            &mut self.ids,
            type_id,
            self.logger.as_ref(),
        )?;
        self.commit();
        if self.manager.is_open() {
            self.manager.refresh(&self.document, &self.registry);
        }
        Ok(instance_id)
    }

    /// Act on the manager row under the cursor.
    pub fn manager_activate(&mut self) -> Result<Option<String>> {
        match self.manager.selection() {
            Some(ManagerSelection::Remove(id)) => {
                self.delete_tile(&id)?;
                Ok(Some(id))
            }
            Some(ManagerSelection::Add(type_id)) => self.add_tile(&type_id).map(Some),
            None => Ok(None),
        }
    }

    /// Write the manager's draft into the calendar extra and persist.
    /// Tiles are not re-rendered.
    pub fn save_calendar_text(&mut self) -> SaveOutcome {
        let draft = self.manager.draft().to_string();
        self.document.set_extra(EXTRA_CALENDAR, draft);
        let outcome = self.persist();
        self.manager.refresh(&self.document, &self.registry);
        outcome
    }

    /// Emit a metrics snapshot through the logger.
    pub fn log_metrics(&self, uptime: Duration, target: &str) {
        let (Some(logger), Some(metrics)) = (&self.logger, &self.metrics) else {
            return;
        };
        let snapshot = match metrics.lock() {
            Ok(guard) => guard.snapshot(uptime),
            Err(_) => return,
        };
        let _ = logger.log_event(snapshot.to_log_event(target));
    }
}
