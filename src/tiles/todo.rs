use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TileError, TileResult};
use crate::model::{TileConfig, TileInstance};
use crate::registry::{TileDefinition, TileSettings};
use crate::render::{ContentHost, TileContext};
use crate::settings::{SettingsContext, SettingsHost};

pub const TYPE_ID: &str = "todo";
const ITEMS: &str = "items";
const ADD: &str = "add";
const STATES: [&str; 3] = ["open", "done", "remove"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl TodoItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }
}

/// Items stored on the instance; malformed entries are an error so a broken
/// config shows up on the tile instead of silently emptying the list.
pub fn items(tile: &TileInstance) -> TileResult<Vec<TodoItem>> {
    match tile.config.get(ITEMS) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|err| TileError::msg(format!("invalid todo items: {err}"))),
    }
}

fn store_items(tile: &mut TileInstance, items: &[TodoItem]) -> TileResult<()> {
    let value = serde_json::to_value(items).map_err(|err| TileError::msg(err.to_string()))?;
    tile.config.insert(ITEMS.into(), value);
    Ok(())
}

fn item_key(idx: usize) -> String {
    format!("item.{idx}")
}

fn render(host: &mut ContentHost, tile: &TileInstance, _ctx: &mut TileContext<'_>) -> TileResult<()> {
    let items = items(tile)?;
    if items.is_empty() {
        host.push_line("Nothing to do.");
        return Ok(());
    }
    for item in &items {
        let mark = if item.done { 'x' } else { ' ' };
        host.push_line(format!("[{mark}] {}", item.text));
    }
    let open = items.iter().filter(|item| !item.done).count();
    host.push_line(format!("{open} open"));
    Ok(())
}

struct TodoSettings;

impl TileSettings for TodoSettings {
    fn build_settings(
        &self,
        host: &mut SettingsHost,
        tile: &TileInstance,
        _ctx: &SettingsContext<'_>,
    ) -> TileResult<()> {
        for (idx, item) in items(tile)?.iter().enumerate() {
            let state = if item.done { "done" } else { "open" };
            host.add_choice(&item_key(idx), &item.text, &STATES, state);
        }
        host.add_text(ADD, "Add item", "");
        Ok(())
    }

    fn save_config(
        &self,
        host: &SettingsHost,
        tile: &mut TileInstance,
        _ctx: &SettingsContext<'_>,
    ) -> TileResult<()> {
        let mut kept = Vec::new();
        for (idx, mut item) in items(tile)?.into_iter().enumerate() {
            match host.choice(&item_key(idx)) {
                Some("remove") => continue,
                Some(state) => item.done = state == "done",
                None => {}
            }
            kept.push(item);
        }
        let added = host.text(ADD).unwrap_or("").trim();
        if !added.is_empty() {
            kept.push(TodoItem::new(added));
        }
        store_items(tile, &kept)
    }
}

pub fn definition() -> TileDefinition {
    TileDefinition::from_fn(TYPE_ID, render)
        .with_label("To-Do")
        .with_initial_config(|| {
            let mut config = TileConfig::new();
            config.insert(ITEMS.into(), Value::Array(Vec::new()));
            config
        })
        .with_settings(TodoSettings)
}
