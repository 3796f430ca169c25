//! Tile Manager: the modal listing active instances (remove) and available
//! tile types (add), plus the calendar free-text field.

use serde_json::json;

use crate::error::{DashboardError, Result};
use crate::logging::{LogLevel, Logger, TARGET_MANAGER, emit, json_kv, json_str};
use crate::model::{InstanceIdGenerator, LayoutDocument, TileInstance, TileSize};
use crate::registry::TileRegistry;
use crate::render::Overlay;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRow {
    pub instance_id: String,
    pub type_id: String,
    pub label: String,
    /// Type is not registered; the row still offers Remove.
    pub missing: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableRow {
    pub type_id: String,
    pub label: String,
    pub default_size: TileSize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerView {
    pub active: Vec<ActiveRow>,
    pub available: Vec<AvailableRow>,
    pub calendar_text: String,
}

impl ManagerView {
    pub fn build(document: &LayoutDocument, registry: &TileRegistry) -> Self {
        let active = document
            .presentation_order()
            .into_iter()
            .map(|idx| &document.tiles[idx])
            .map(|tile| ActiveRow {
                instance_id: tile.instance_id.clone(),
                type_id: tile.type_id.clone(),
                label: tile.label.clone(),
                missing: !registry.contains(&tile.type_id),
                enabled: tile.is_enabled(),
            })
            .collect();
        let available = registry
            .listed()
            .map(|definition| AvailableRow {
                type_id: definition.type_id().to_string(),
                label: definition.label().to_string(),
                default_size: definition.default_size(),
            })
            .collect();
        Self {
            active,
            available,
            calendar_text: document.calendar_text().to_string(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.active.len() + self.available.len()
    }
}

/// Row under the manager's cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerSelection {
    Remove(String),
    Add(String),
}

/// Modal state. Every action is persisted immediately by the dashboard;
/// closing never mutates anything.
#[derive(Debug, Clone, Default)]
pub struct TileManager {
    open: bool,
    view: ManagerView,
    draft: String,
    cursor: usize,
}

impl TileManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, document: &LayoutDocument, registry: &TileRegistry) {
        self.open = true;
        self.cursor = 0;
        self.view = ManagerView::build(document, registry);
        self.draft = self.view.calendar_text.clone();
    }

    /// Rebuild both lists, keeping the draft and clamping the cursor.
    pub fn refresh(&mut self, document: &LayoutDocument, registry: &TileRegistry) {
        self.view = ManagerView::build(document, registry);
        self.cursor = self.cursor.min(self.view.row_count().saturating_sub(1));
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn view(&self) -> &ManagerView {
        &self.view
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn push_draft(&mut self, text: &str) {
        self.draft.push_str(text);
    }

    pub fn pop_draft(&mut self) {
        self.draft.pop();
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn select_next(&mut self) {
        let rows = self.view.row_count();
        if rows > 0 {
            self.cursor = (self.cursor + 1) % rows;
        }
    }

    pub fn select_prev(&mut self) {
        let rows = self.view.row_count();
        if rows > 0 {
            self.cursor = (self.cursor + rows - 1) % rows;
        }
    }

    pub fn selection(&self) -> Option<ManagerSelection> {
        if let Some(row) = self.view.active.get(self.cursor) {
            return Some(ManagerSelection::Remove(row.instance_id.clone()));
        }
        self.view
            .available
            .get(self.cursor - self.view.active.len())
            .map(|row| ManagerSelection::Add(row.type_id.clone()))
    }

    pub fn overlay(&self) -> Overlay {
        let mut overlay = Overlay::new("Tile Manager").line("Active");
        for row in &self.view.active {
            let mut line = format!("  - {} ({})", row.label, row.type_id);
            if row.missing {
                line.push_str(" [missing]");
            }
            if !row.enabled {
                line.push_str(" [hidden]");
            }
            overlay = overlay.line(line);
        }
        overlay = overlay.line("Available");
        for row in &self.view.available {
            overlay = overlay.line(format!(
                "  + {} {}x{}",
                row.label, row.default_size.col_span, row.default_size.row_span
            ));
        }
        let preview = self.draft.lines().next().unwrap_or("");
        overlay = overlay.line(format!("Calendar: {} ({} bytes)", preview, self.draft.len()));

        // Skip the two section headings when mapping the cursor to a line.
        let selected = if self.cursor < self.view.active.len() {
            self.cursor + 1
        } else {
            self.cursor + 2
        };
        overlay
            .selected((self.view.row_count() > 0).then_some(selected))
            .footer("Enter remove/add  Ctrl-S save calendar  Esc close")
    }
}

/// Append a new instance of `type_id`. Returns the generated instance id.
pub fn add_instance(
    document: &mut LayoutDocument,
    registry: &TileRegistry,
    ids: &mut InstanceIdGenerator,
    type_id: &str,
    logger: Option<&Logger>,
) -> Result<String> {
    let definition = registry
        .get(type_id)
        .ok_or_else(|| DashboardError::UnknownTileType(type_id.to_string()))?;
    let instance_id = ids.generate(type_id, document);
    let order = document.next_order();
    document.tiles.push(TileInstance::new(
        instance_id.clone(),
        type_id,
        definition.label(),
        definition.default_size(),
        order,
        definition.create_initial_config(),
    ));
    emit(
        logger,
        LogLevel::Info,
        TARGET_MANAGER,
        "tile_added",
        [
            json_str("instance_id", instance_id.clone()),
            json_str("type_id", type_id),
            json_kv("order", json!(order)),
        ],
    );
    Ok(instance_id)
}

pub fn remove_instance(
    document: &mut LayoutDocument,
    instance_id: &str,
    logger: Option<&Logger>,
) -> Result<TileInstance> {
    let removed = document.remove(instance_id)?;
    emit(
        logger,
        LogLevel::Info,
        TARGET_MANAGER,
        "tile_removed",
        [
            json_str("instance_id", removed.instance_id.clone()),
            json_str("type_id", removed.type_id.clone()),
        ],
    );
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Extras, TileConfig};
    use crate::registry::TileDefinition;

    fn registry() -> TileRegistry {
        TileRegistry::new()
            .with(TileDefinition::from_fn("clock", |_h, _t, _c| Ok(())).with_label("Clock"))
            .and_then(|r| {
                r.with(
                    TileDefinition::from_fn("notes", |_h, _t, _c| Ok(()))
                        .with_label("Notes")
                        .with_default_size(2, 1),
                )
            })
            .and_then(|r| r.with(TileDefinition::unavailable("radar", "missing module")))
            .unwrap()
    }

    fn document() -> LayoutDocument {
        let mut doc = LayoutDocument::new(
            Extras::new(),
            vec![
                TileInstance::new("c", "clock", "Clock", TileSize::new(1, 1), 4, TileConfig::new()),
                TileInstance::new("g", "weather", "Weather", TileSize::new(2, 1), 2, TileConfig::new()),
            ],
        );
        doc.set_extra("icsCalendar", "BEGIN:VCALENDAR\nEND:VCALENDAR");
        doc
    }

    #[test]
    fn view_lists_missing_instances_and_only_listed_types() {
        let view = ManagerView::build(&document(), &registry());
        let active: Vec<_> = view.active.iter().map(|r| (r.instance_id.as_str(), r.missing)).collect();
        assert_eq!(active, vec![("g", true), ("c", false)]);
        let available: Vec<_> = view.available.iter().map(|r| r.type_id.as_str()).collect();
        assert_eq!(available, vec!["clock", "notes"]);
        assert!(view.calendar_text.starts_with("BEGIN:VCALENDAR"));
    }

    #[test]
    fn add_assigns_unique_ids_and_increasing_order() {
        let mut doc = document();
        let registry = registry();
        let mut ids = InstanceIdGenerator::new();
        let first = add_instance(&mut doc, &registry, &mut ids, "notes", None).unwrap();
        let second = add_instance(&mut doc, &registry, &mut ids, "notes", None).unwrap();
        assert_ne!(first, second);
        assert_eq!(doc.find(&first).unwrap().order, 5);
        assert_eq!(doc.find(&second).unwrap().order, 6);
        assert_eq!(doc.find(&first).unwrap().size(), TileSize::new(2, 1));
        assert!(matches!(
            add_instance(&mut doc, &registry, &mut ids, "nope", None),
            Err(DashboardError::UnknownTileType(_))
        ));
    }

    #[test]
    fn selection_walks_active_then_available() {
        let mut manager = TileManager::new();
        manager.open(&document(), &registry());
        assert_eq!(manager.selection(), Some(ManagerSelection::Remove("g".into())));
        manager.select_next();
        manager.select_next();
        assert_eq!(manager.selection(), Some(ManagerSelection::Add("clock".into())));
        manager.select_prev();
        manager.select_prev();
        manager.select_prev();
        assert_eq!(manager.selection(), Some(ManagerSelection::Add("notes".into())));
        assert_eq!(manager.overlay().selected, Some(5));
    }

    #[test]
    fn refresh_clamps_cursor_after_removal() {
        let mut doc = document();
        let registry = registry();
        let mut manager = TileManager::new();
        manager.open(&doc, &registry);
        for _ in 0..3 {
            manager.select_next();
        }
        remove_instance(&mut doc, "g", None).unwrap();
        remove_instance(&mut doc, "c", None).unwrap();
        manager.refresh(&doc, &registry);
        assert_eq!(manager.cursor(), 1);
        assert!(remove_instance(&mut doc, "c", None).is_err());
    }
}
