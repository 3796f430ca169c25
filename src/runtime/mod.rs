use std::io::Write;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
    MouseEvent, MouseEventKind,
};
use serde_json::json;

use crate::dashboard::{Dashboard, PointerOutcome};
use crate::error::{DashboardError, Result};
use crate::geometry::{Point, Rect, Size};
use crate::logging::{LogLevel, TARGET_RUNTIME, emit, json_kv, json_str};
use crate::render::{AnsiRenderer, Overlay};
use crate::settings::{FieldValue, SettingsPanel};

pub mod driver;

pub use driver::{CliDriver, DriverResult};

const METRICS_TARGET: &str = "tileboard::runtime.metrics";
const TOOLBAR_LOCKED: &str = " hold empty space or press e to edit | m tiles | q quit ";
const TOOLBAR_UNLOCKED: &str =
    " EDITING | ≡ drag | ◢ resize | * settings | d done | m tiles | q quit ";

/// Events the runtime loop feeds into the dashboard.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    Tick(Instant),
    Key(KeyEvent),
    Mouse(MouseEvent),
    Paste(String),
    FocusLost,
    Resize(Size),
}

enum FieldEdit {
    Insert(String),
    Backspace,
    /// Space: flips toggles, cycles choices, types a space elsewhere.
    Toggle,
}

/// Terminal front end for a [`Dashboard`]: translates keys and mouse events
/// into session calls, ticks timers, and repaints when something changed.
pub struct DashboardRuntime {
    dashboard: Dashboard,
    renderer: AnsiRenderer,
    /// Focused settings row; 0 is the label.
    focus: usize,
    should_exit: bool,
    redraw_requested: bool,
    start_instant: Option<Instant>,
    last_metrics_emit: Option<Instant>,
}

impl DashboardRuntime {
    pub fn new(dashboard: Dashboard, renderer: AnsiRenderer) -> Self {
        Self {
            dashboard,
            renderer,
            focus: 0,
            should_exit: false,
            redraw_requested: true,
            start_instant: None,
            last_metrics_emit: None,
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn dashboard_mut(&mut self) -> &mut Dashboard {
        &mut self.dashboard
    }

    pub fn renderer_mut(&mut self) -> &mut AnsiRenderer {
        &mut self.renderer
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    /// The bottom row is reserved for the toolbar.
    pub fn resize(&mut self, size: Size) {
        let canvas = Rect::new(0, 0, size.width, size.height.saturating_sub(1));
        self.dashboard.set_canvas(canvas);
        self.redraw_requested = true;
        self.log(
            LogLevel::Info,
            "resized",
            [
                json_kv("width", json!(size.width)),
                json_kv("height", json!(size.height)),
            ],
        );
    }

    pub fn run(&mut self, stdout: &mut impl Write) -> Result<()> {
        self.bootstrap(stdout)?;
        let tick_interval = self.dashboard.config().tick_interval;
        let mut last_tick = Instant::now();

        while !self.should_exit {
            let timeout = tick_interval
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout)? {
                if let Some(runtime_event) = Self::map_event(event::read()?) {
                    self.handle_event(runtime_event, Instant::now());
                    self.render_if_needed(stdout)?;
                    if self.should_exit {
                        break;
                    }
                }
            }

            if last_tick.elapsed() >= tick_interval {
                let now = Instant::now();
                last_tick = now;
                self.handle_event(RuntimeEvent::Tick(now), now);
                self.render_if_needed(stdout)?;
            }

            self.maybe_emit_metrics(Instant::now());
        }

        self.finalize();
        Ok(())
    }

    pub fn run_scripted<I>(&mut self, stdout: &mut impl Write, events: I) -> Result<()>
    where
        I: IntoIterator<Item = RuntimeEvent>,
    {
        self.bootstrap(stdout)?;
        for event in events {
            self.handle_event(event, Instant::now());
            self.render_if_needed(stdout)?;
            if self.should_exit {
                break;
            }
        }
        self.finalize();
        Ok(())
    }

    fn map_event(event: CrosstermEvent) -> Option<RuntimeEvent> {
        match event {
            CrosstermEvent::Key(key) => Some(RuntimeEvent::Key(key)),
            CrosstermEvent::Mouse(mouse) => Some(RuntimeEvent::Mouse(mouse)),
            CrosstermEvent::Paste(text) => Some(RuntimeEvent::Paste(text)),
            CrosstermEvent::FocusLost => Some(RuntimeEvent::FocusLost),
            CrosstermEvent::Resize(width, height) => {
                Some(RuntimeEvent::Resize(Size::new(width, height)))
            }
            CrosstermEvent::FocusGained => None,
        }
    }

    /// Apply one event. Failures from dashboard actions are logged; the loop
    /// keeps running.
    pub fn handle_event(&mut self, event: RuntimeEvent, now: Instant) {
        let name = Self::describe_event(&event);
        match event {
            RuntimeEvent::Tick(at) => self.tick(at),
            RuntimeEvent::Key(key) => self.handle_key(key),
            RuntimeEvent::Mouse(mouse) => self.handle_mouse(mouse, now),
            RuntimeEvent::Paste(text) => self.handle_paste(&text),
            RuntimeEvent::FocusLost => {
                if self.dashboard.pointer_leave() != PointerOutcome::Ignored {
                    self.redraw_requested = true;
                }
            }
            RuntimeEvent::Resize(size) => self.resize(size),
        }
        if name != "tick" {
            self.log(LogLevel::Debug, "event_dispatched", [json_str("event", name)]);
        }
    }

    fn tick(&mut self, now: Instant) {
        let outcome = self.dashboard.tick(now);
        if outcome.unlocked
            || outcome.rerendered
            || outcome.timers.fired > 0
            || outcome.timers.failed > 0
        {
            self.redraw_requested = true;
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.request_exit();
            return;
        }
        self.redraw_requested = true;
        if self.dashboard.settings_panel().is_some() {
            self.settings_key(key);
        } else if self.dashboard.manager().is_open() {
            self.manager_key(key);
        } else {
            self.board_key(key);
        }
    }

    fn board_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.request_exit(),
            KeyCode::Char('e') => {
                self.dashboard.enter_edit_mode();
            }
            KeyCode::Char('d') | KeyCode::Enter | KeyCode::Esc => {
                self.dashboard.done();
            }
            KeyCode::Char('m') => self.dashboard.open_manager(),
            _ => self.redraw_requested = false,
        }
    }

    fn manager_key(&mut self, key: KeyEvent) {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Up => self.dashboard.manager_mut().select_prev(),
            KeyCode::Down => self.dashboard.manager_mut().select_next(),
            KeyCode::Enter => {
                if let Err(err) = self.dashboard.manager_activate() {
                    self.log_failure("manager_action_failed", &err);
                }
            }
            KeyCode::Char('s') if control => {
                let outcome = self.dashboard.save_calendar_text();
                if outcome.is_failed() {
                    self.log(LogLevel::Warn, "calendar_save_failed", std::iter::empty());
                }
            }
            KeyCode::Esc => self.dashboard.close_manager(),
            KeyCode::Backspace => self.dashboard.manager_mut().pop_draft(),
            KeyCode::Char(ch) if !control => {
                self.dashboard.manager_mut().push_draft(ch.encode_utf8(&mut [0; 4]));
            }
            _ => self.redraw_requested = false,
        }
    }

    fn settings_key(&mut self, key: KeyEvent) {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        let rows = self
            .dashboard
            .settings_panel()
            .map(|panel| panel.section.len() + 1)
            .unwrap_or(1);
        match key.code {
            KeyCode::Tab => self.focus = (self.focus + 1) % rows,
            KeyCode::BackTab => self.focus = (self.focus + rows - 1) % rows,
            KeyCode::Esc => {
                self.dashboard.close_settings();
                self.focus = 0;
            }
            KeyCode::Enter => match self.dashboard.save_settings() {
                Ok(()) => self.focus = 0,
                Err(err) => self.log_failure("settings_save_rejected", &err),
            },
            KeyCode::Char('d') if control => {
                if let Err(err) = self.dashboard.delete_from_settings() {
                    self.log_failure("settings_delete_failed", &err);
                }
                self.focus = 0;
            }
            KeyCode::Backspace => {
                self.edit_focused(FieldEdit::Backspace);
            }
            KeyCode::Char(' ') => {
                self.edit_focused(FieldEdit::Toggle);
            }
            KeyCode::Char(ch) if !control => {
                self.edit_focused(FieldEdit::Insert(ch.to_string()));
            }
            _ => self.redraw_requested = false,
        }
    }

    fn handle_paste(&mut self, text: &str) {
        if self.dashboard.settings_panel().is_some() {
            self.edit_focused(FieldEdit::Insert(text.replace(['\r', '\n'], " ")));
        } else if self.dashboard.manager().is_open() {
            self.dashboard.manager_mut().push_draft(text);
        } else {
            return;
        }
        self.redraw_requested = true;
    }

    fn edit_focused(&mut self, edit: FieldEdit) -> bool {
        let Some(panel) = self.dashboard.settings_panel() else {
            return false;
        };
        if self.focus == 0 {
            let label = edited(&panel.label, edit);
            return self.dashboard.set_settings_label(label);
        }
        let Some(field) = panel.section.fields().get(self.focus - 1) else {
            return false;
        };
        let key = field.key.clone();
        let value = match (&field.value, edit) {
            (FieldValue::Toggle(on), FieldEdit::Toggle) => FieldValue::Toggle(!on),
            (FieldValue::Choice { options, selected }, FieldEdit::Toggle) => FieldValue::Choice {
                options: options.clone(),
                selected: (selected + 1) % options.len().max(1),
            },
            (FieldValue::Text(text), edit) => FieldValue::Text(edited(text, edit)),
            // Typing into a number field switches it to free text; the
            // settings host parses it back on save.
            (FieldValue::Number(n), edit) => FieldValue::Text(edited(&format_number(*n), edit)),
            _ => return false,
        };
        self.dashboard.set_settings_field(&key, value)
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        if self.overlay_open() {
            return;
        }
        let at = Point::new(i32::from(mouse.column), i32::from(mouse.row));
        let outcome = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.dashboard.pointer_down(at, now),
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                self.dashboard.pointer_move(at)
            }
            MouseEventKind::Up(MouseButton::Left) => self.dashboard.pointer_up(at),
            _ => PointerOutcome::Ignored,
        };
        if let PointerOutcome::PanelOpened(_) = outcome {
            self.focus = 0;
        }
        if outcome != PointerOutcome::Ignored {
            self.redraw_requested = true;
        }
    }

    fn overlay_open(&self) -> bool {
        self.dashboard.settings_panel().is_some() || self.dashboard.manager().is_open()
    }

    pub fn toolbar_text(&self) -> &'static str {
        if self.dashboard.toolbar_visible() {
            TOOLBAR_UNLOCKED
        } else {
            TOOLBAR_LOCKED
        }
    }

    /// The open settings panel wins over the manager.
    pub fn overlay(&self) -> Option<Overlay> {
        if let Some(panel) = self.dashboard.settings_panel() {
            return Some(settings_overlay(panel, self.focus));
        }
        self.dashboard
            .manager()
            .is_open()
            .then(|| self.dashboard.manager().overlay())
    }

    fn request_exit(&mut self) {
        self.should_exit = true;
        self.log(LogLevel::Info, "exit_requested", std::iter::empty());
    }

    fn render_if_needed(&mut self, stdout: &mut impl Write) -> Result<()> {
        if !self.redraw_requested {
            return Ok(());
        }
        self.redraw_requested = false;
        let overlay = self.overlay();
        let toolbar = self.toolbar_text();
        self.renderer
            .render(stdout, self.dashboard.surface(), toolbar, overlay.as_ref())?;
        self.log(
            LogLevel::Debug,
            "frame_painted",
            [
                json_kv("tiles", json!(self.dashboard.surface().len())),
                json_kv("generation", json!(self.dashboard.surface().generation())),
            ],
        );
        Ok(())
    }

    fn bootstrap(&mut self, stdout: &mut impl Write) -> Result<()> {
        self.should_exit = false;
        self.redraw_requested = true;
        let now = Instant::now();
        self.start_instant = Some(now);
        self.last_metrics_emit = Some(now);
        self.log(
            LogLevel::Info,
            "runtime_started",
            [
                json_kv("tiles", json!(self.dashboard.document().len())),
                json_kv("edit_mode", json!(format!("{:?}", self.dashboard.edit_mode()))),
            ],
        );
        self.render_if_needed(stdout)
    }

    fn finalize(&mut self) {
        let uptime_ms = self
            .start_instant
            .map(|start| start.elapsed().as_millis())
            .unwrap_or(0);
        self.log(
            LogLevel::Info,
            "runtime_stopped",
            [json_kv("uptime_ms", json!(uptime_ms))],
        );
    }

    fn maybe_emit_metrics(&mut self, now: Instant) {
        let interval = self.dashboard.config().metrics_interval;
        if interval == Duration::from_millis(0) || self.dashboard.metrics_handle().is_none() {
            return;
        }
        match self.last_metrics_emit {
            Some(last) if now.duration_since(last) < interval => return,
            _ => self.last_metrics_emit = Some(now),
        }
        let uptime = self
            .start_instant
            .map(|start| now.duration_since(start))
            .unwrap_or_default();
        self.dashboard.log_metrics(uptime, METRICS_TARGET);
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        emit(
            self.dashboard.config().logger.as_ref(),
            level,
            TARGET_RUNTIME,
            message,
            fields,
        );
    }

    fn log_failure(&self, message: &str, err: &DashboardError) {
        self.log(LogLevel::Warn, message, [json_str("error", err.to_string())]);
    }

    fn describe_event(event: &RuntimeEvent) -> &'static str {
        match event {
            RuntimeEvent::Tick(_) => "tick",
            RuntimeEvent::Key(_) => "key",
            RuntimeEvent::Mouse(_) => "mouse",
            RuntimeEvent::Paste(_) => "paste",
            RuntimeEvent::FocusLost => "focus_lost",
            RuntimeEvent::Resize(_) => "resize",
        }
    }
}

fn edited(text: &str, edit: FieldEdit) -> String {
    let mut text = text.to_string();
    match edit {
        FieldEdit::Insert(more) => text.push_str(&more),
        FieldEdit::Backspace => {
            text.pop();
        }
        FieldEdit::Toggle => text.push(' '),
    }
    text
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn settings_overlay(panel: &SettingsPanel, focus: usize) -> Overlay {
    let mut overlay =
        Overlay::new(format!("Settings: {}", panel.label)).line(format!("Label: {}", panel.label));
    for field in panel.section.fields() {
        let value = match &field.value {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Toggle(true) => "[x]".to_string(),
            FieldValue::Toggle(false) => "[ ]".to_string(),
            FieldValue::Choice { options, selected } => {
                format!("< {} >", options.get(*selected).map(String::as_str).unwrap_or(""))
            }
        };
        overlay = overlay.line(format!("{}: {}", field.label, value));
    }
    if let Some(error) = &panel.error {
        overlay = overlay.line(format!("! {error}"));
    }
    overlay
        .selected(Some(focus))
        .footer("Tab next  Space toggle  Enter save  Ctrl-D delete  Esc close")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::edit::EditMode;
    use crate::logging::{Logger, MemorySink};
    use crate::store::MemoryStore;
    use crate::tiles::{builtin_registry, default_layout};

    fn runtime() -> DashboardRuntime {
        let dashboard = Dashboard::new(
            EngineConfig::default(),
            builtin_registry().unwrap(),
            default_layout(),
            MemoryStore::new(),
        );
        let mut runtime = DashboardRuntime::new(dashboard, AnsiRenderer::with_default());
        runtime.resize(Size::new(120, 40));
        runtime
    }

    fn key(ch: char) -> RuntimeEvent {
        RuntimeEvent::Key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE))
    }

    fn code(code: KeyCode) -> RuntimeEvent {
        RuntimeEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(ch: char) -> RuntimeEvent {
        RuntimeEvent::Key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> RuntimeEvent {
        RuntimeEvent::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn board_keys_toggle_edit_mode_and_quit() {
        let mut runtime = runtime();
        let mut out = Vec::new();
        runtime
            .run_scripted(
                &mut out,
                [key('e'), key('d'), key('m'), code(KeyCode::Esc), key('q'), key('e')],
            )
            .unwrap();
        assert!(runtime.should_exit());
        assert_eq!(runtime.dashboard().edit_mode(), EditMode::Unlocked);
        assert!(!runtime.dashboard().manager().is_open());
        assert_eq!(runtime.toolbar_text(), TOOLBAR_UNLOCKED);
        assert!(!out.is_empty());
    }

    #[test]
    fn manager_paste_saves_calendar_text() {
        let mut runtime = runtime();
        let mut out = Vec::new();
        runtime
            .run_scripted(
                &mut out,
                [
                    key('m'),
                    RuntimeEvent::Paste("BEGIN:VCALENDAR".into()),
                    ctrl('s'),
                    code(KeyCode::Esc),
                ],
            )
            .unwrap();
        assert_eq!(runtime.dashboard().document().calendar_text(), "BEGIN:VCALENDAR");
        assert!(runtime.overlay().is_none());
    }

    #[test]
    fn manager_enter_adds_the_selected_type() {
        let mut runtime = runtime();
        let before = runtime.dashboard().document().len();
        let mut events = vec![key('m')];
        // Skip past the active rows to the first available type.
        events.extend((0..before).map(|_| code(KeyCode::Down)));
        events.push(code(KeyCode::Enter));
        runtime.run_scripted(&mut Vec::new(), events).unwrap();
        assert_eq!(runtime.dashboard().document().len(), before + 1);
    }

    #[test]
    fn settings_keys_edit_and_save_a_tile() {
        let mut runtime = runtime();
        runtime.dashboard_mut().enter_edit_mode();
        assert!(runtime.dashboard_mut().open_settings("calculator").unwrap());
        let mut events = vec![code(KeyCode::Tab)];
        events.extend("1+2".chars().map(key));
        events.push(code(KeyCode::Enter));
        runtime.run_scripted(&mut Vec::new(), events).unwrap();

        let dashboard = runtime.dashboard();
        assert!(dashboard.settings_panel().is_none());
        let tile = dashboard.document().find("calculator").unwrap();
        assert_eq!(tile.config_str("expression"), Some("1+2"));
        let frame = dashboard.surface().frame("calculator").unwrap();
        assert_eq!(frame.content.lines().last().map(String::as_str), Some("= 3"));
    }

    #[test]
    fn settings_overlay_shows_fields_and_focus() {
        let mut runtime = runtime();
        runtime.dashboard_mut().enter_edit_mode();
        runtime.dashboard_mut().open_settings("schedule").unwrap();
        runtime
            .run_scripted(&mut Vec::new(), [code(KeyCode::Tab), key(' ')])
            .unwrap();
        let overlay = runtime.overlay().unwrap();
        assert_eq!(overlay.lines[1], "Show past events: [x]");
        assert_eq!(overlay.selected, Some(1));
    }

    #[test]
    fn long_press_on_empty_canvas_unlocks() {
        let sink = MemorySink::new();
        let config = EngineConfig::default().with_logger(Logger::new(sink.clone()));
        let dashboard = Dashboard::new(
            config,
            builtin_registry().unwrap(),
            default_layout(),
            MemoryStore::new(),
        );
        let mut runtime = DashboardRuntime::new(dashboard, AnsiRenderer::with_default());
        runtime.resize(Size::new(120, 40));

        let t0 = Instant::now();
        runtime
            .run_scripted(
                &mut Vec::new(),
                [
                    mouse(MouseEventKind::Down(MouseButton::Left), 118, 37),
                    RuntimeEvent::Tick(t0 + Duration::from_secs(2)),
                ],
            )
            .unwrap();
        assert_eq!(runtime.dashboard().edit_mode(), EditMode::Unlocked);
        assert!(sink.messages_at(LogLevel::Info).contains(&"runtime_started".to_string()));
    }
}
