//! Built-in tile types and the first-run layout that uses them.

pub mod calculator;
pub mod clock;
pub mod notes;
pub mod schedule;
pub mod todo;

use serde_json::json;

use crate::error::DefinitionError;
use crate::model::{
    DEFAULT_GRID_COLS, DEFAULT_TILE_PADDING, DefaultLayout, DefaultTile, EXTRA_CALENDAR,
    EXTRA_GRID_COLS, EXTRA_TILE_PADDING, Extras,
};
use crate::registry::TileRegistry;

/// Registry holding every built-in tile type.
pub fn builtin_registry() -> Result<TileRegistry, DefinitionError> {
    TileRegistry::new()
        .with(clock::definition())?
        .with(schedule::definition())?
        .with(notes::definition())?
        .with(todo::definition())?
        .with(calculator::definition())
}

pub fn default_layout() -> DefaultLayout {
    let mut extras = Extras::new();
    extras.insert(EXTRA_GRID_COLS.into(), json!(DEFAULT_GRID_COLS));
    extras.insert(EXTRA_TILE_PADDING.into(), json!(DEFAULT_TILE_PADDING));
    extras.insert(EXTRA_CALENDAR.into(), json!(""));
    extras.insert("gpsEnabled".into(), json!(true));
    extras.insert("weatherApiKey".into(), json!(""));

    DefaultLayout::new(extras)
        .with_tile(DefaultTile::new("clock", clock::TYPE_ID, 1).size(2, 1))
        .with_tile(DefaultTile::new("schedule", schedule::TYPE_ID, 2).size(2, 2))
        .with_tile(DefaultTile::new("notes", notes::TYPE_ID, 3).size(2, 1))
        .with_tile(DefaultTile::new("todo", todo::TYPE_ID, 4))
        .with_tile(DefaultTile::new("calculator", calculator::TYPE_ID, 5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::dashboard::Dashboard;
    use crate::geometry::Rect;
    use crate::store::{KeyValueStore, MemoryStore, STORAGE_KEY, materialize_defaults};

    #[test]
    fn default_layout_only_uses_registered_types() {
        let registry = builtin_registry().unwrap();
        let layout = default_layout();
        assert!(layout.tiles.iter().all(|t| registry.contains(&t.type_id)));
        assert_eq!(registry.listed().count(), 5);
    }

    #[test]
    fn materialized_defaults_carry_initial_configs() {
        let registry = builtin_registry().unwrap();
        let doc = materialize_defaults(&default_layout(), &registry);
        assert_eq!(doc.grid_cols(), DEFAULT_GRID_COLS);
        let schedule = doc.find("schedule").unwrap();
        assert_eq!(schedule.config_u64("maxEvents"), Some(20));
        assert_eq!(schedule.label, "Today's Schedule");
        assert_eq!(doc.find("todo").unwrap().config["items"], json!([]));
    }

    #[test]
    fn runaway_calculator_input_leaves_siblings_rendering() {
        let store = MemoryStore::new();
        let expression = format!("{}1", "-".repeat(200_000));
        let stored = json!({
            "tiles": [
                {"instanceId": "calc", "typeId": "calculator", "order": 1, "config": {"expression": expression}},
                {"instanceId": "notes", "typeId": "notes", "order": 2, "config": {"text": "still here"}}
            ]
        });
        store.set(STORAGE_KEY, &stored.to_string()).unwrap();
        let registry = builtin_registry().unwrap();
        let mut dashboard = Dashboard::new(EngineConfig::default(), registry, default_layout(), store);
        dashboard.set_canvas(Rect::new(0, 0, 60, 20));

        assert_eq!(dashboard.surface().len(), 2);
        let calc = dashboard.surface().frame("calc").unwrap();
        assert!(calc.content.lines().iter().any(|line| line == "Error"));
        let notes = dashboard.surface().frame("notes").unwrap();
        assert!(notes.content.lines().iter().any(|line| line == "still here"));
    }
}
