use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DashboardError, Result};

/// Opaque per-instance configuration owned by the tile type.
pub type TileConfig = Map<String, Value>;

/// Document-level settings shared by every tile.
pub type Extras = Map<String, Value>;

pub const EXTRA_GRID_COLS: &str = "gridCols";
pub const EXTRA_TILE_PADDING: &str = "tilePadding";
pub const EXTRA_CALENDAR: &str = "icsCalendar";

pub const DEFAULT_GRID_COLS: u16 = 6;
pub const DEFAULT_TILE_PADDING: u16 = 1;

/// Grid footprint of a tile. Both spans are at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    #[serde(rename = "colSpan")]
    pub col_span: u16,
    #[serde(rename = "rowSpan")]
    pub row_span: u16,
}

impl TileSize {
    pub fn new(col_span: u16, row_span: u16) -> Self {
        Self {
            col_span: col_span.max(1),
            row_span: row_span.max(1),
        }
    }
}

impl Default for TileSize {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// One placed tile. Spans of zero mean "not yet backfilled".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileInstance {
    #[serde(rename = "instanceId")]
    pub instance_id: String,
    #[serde(rename = "typeId")]
    pub type_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(rename = "colSpan", default, skip_serializing_if = "is_zero")]
    pub col_span: u16,
    #[serde(rename = "rowSpan", default, skip_serializing_if = "is_zero")]
    pub row_span: u16,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub config: TileConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Fields this version does not know about, kept verbatim.
    #[serde(flatten)]
    pub unknown: Map<String, Value>,
}

fn is_zero(value: &u16) -> bool {
    *value == 0
}

impl TileInstance {
    pub fn new(
        instance_id: impl Into<String>,
        type_id: impl Into<String>,
        label: impl Into<String>,
        size: TileSize,
        order: i64,
        config: TileConfig,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            type_id: type_id.into(),
            label: label.into(),
            col_span: size.col_span,
            row_span: size.row_span,
            order,
            config,
            enabled: None,
            unknown: Map::new(),
        }
    }

    pub fn size(&self) -> TileSize {
        TileSize::new(self.col_span, self.row_span)
    }

    pub fn set_size(&mut self, size: TileSize) {
        self.col_span = size.col_span.max(1);
        self.row_span = size.row_span.max(1);
    }

    /// Absence of the flag means enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled != Some(false)
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    pub fn config_bool(&self, key: &str) -> Option<bool> {
        self.config.get(key).and_then(Value::as_bool)
    }

    pub fn config_u64(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(Value::as_u64)
    }
}

/// Shallow merge where values already in `target` win. Returns how many keys were added.
pub fn merge_missing(target: &mut Map<String, Value>, defaults: Map<String, Value>) -> usize {
    let mut added = 0;
    for (key, value) in defaults {
        if !target.contains_key(&key) {
            target.insert(key, value);
            added += 1;
        }
    }
    added
}

/// Persisted root: global extras plus every tile instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutDocument {
    #[serde(default)]
    pub extras: Extras,
    #[serde(default)]
    pub tiles: Vec<TileInstance>,
}

impl LayoutDocument {
    pub fn new(extras: Extras, tiles: Vec<TileInstance>) -> Self {
        Self { extras, tiles }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, instance_id: &str) -> bool {
        self.position(instance_id).is_some()
    }

    pub fn position(&self, instance_id: &str) -> Option<usize> {
        self.tiles
            .iter()
            .position(|tile| tile.instance_id == instance_id)
    }

    pub fn find(&self, instance_id: &str) -> Option<&TileInstance> {
        self.tiles
            .iter()
            .find(|tile| tile.instance_id == instance_id)
    }

    pub fn find_mut(&mut self, instance_id: &str) -> Option<&mut TileInstance> {
        self.tiles
            .iter_mut()
            .find(|tile| tile.instance_id == instance_id)
    }

    pub fn remove(&mut self, instance_id: &str) -> Result<TileInstance> {
        let idx = self
            .position(instance_id)
            .ok_or_else(|| DashboardError::TileNotFound(instance_id.to_string()))?;
        Ok(self.tiles.remove(idx))
    }

    pub fn max_order(&self) -> Option<i64> {
        self.tiles.iter().map(|tile| tile.order).max()
    }

    /// Order for a newly appended tile: max + 1, or 1 when empty.
    pub fn next_order(&self) -> i64 {
        self.max_order().map(|max| max + 1).unwrap_or(1)
    }

    /// Indices into `tiles`, stably sorted by `order`.
    pub fn presentation_order(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.tiles.len()).collect();
        indices.sort_by_key(|&idx| self.tiles[idx].order);
        indices
    }

    /// Swap the presentation slots of two tiles.
    ///
    /// Distinct orders are exchanged. Equal orders cannot be exchanged, so the
    /// tiles trade places in `tiles` instead and the stable sort follows.
    pub fn swap_order(&mut self, a: &str, b: &str) -> Result<()> {
        let ia = self
            .position(a)
            .ok_or_else(|| DashboardError::TileNotFound(a.to_string()))?;
        let ib = self
            .position(b)
            .ok_or_else(|| DashboardError::TileNotFound(b.to_string()))?;
        if ia == ib {
            return Ok(());
        }
        let (oa, ob) = (self.tiles[ia].order, self.tiles[ib].order);
        if oa == ob {
            self.tiles.swap(ia, ib);
        } else {
            self.tiles[ia].order = ob;
            self.tiles[ib].order = oa;
        }
        Ok(())
    }

    pub fn grid_cols(&self) -> u16 {
        self.extra_u16(EXTRA_GRID_COLS)
            .filter(|cols| *cols > 0)
            .unwrap_or(DEFAULT_GRID_COLS)
    }

    pub fn tile_padding(&self) -> u16 {
        self.extra_u16(EXTRA_TILE_PADDING)
            .unwrap_or(DEFAULT_TILE_PADDING)
    }

    pub fn calendar_text(&self) -> &str {
        self.extras
            .get(EXTRA_CALENDAR)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extras.insert(key.into(), value.into());
    }

    fn extra_u16(&self, key: &str) -> Option<u16> {
        self.extras
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|value| u16::try_from(value).ok())
    }
}

/// Produces `{type}-{millis-hex}{counter}` ids, unique within a document.
#[derive(Debug, Default)]
pub struct InstanceIdGenerator {
    counter: u64,
}

impl InstanceIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self, type_id: &str, document: &LayoutDocument) -> String {
        loop {
            self.counter += 1;
            let candidate = format!(
                "{}-{:x}{}",
                type_id,
                crate::logging::current_ms(),
                self.counter
            );
            if !document.contains(&candidate) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tile(id: &str, order: i64) -> TileInstance {
        TileInstance::new(id, "clock", id, TileSize::new(1, 1), order, TileConfig::new())
    }

    #[test]
    fn presentation_order_is_stable_on_ties() {
        let doc = LayoutDocument::new(
            Extras::new(),
            vec![tile("a", 2), tile("b", 1), tile("c", 2), tile("d", 1)],
        );
        let ids: Vec<_> = doc
            .presentation_order()
            .into_iter()
            .map(|idx| doc.tiles[idx].instance_id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn swap_order_exchanges_distinct_values() {
        let mut doc = LayoutDocument::new(Extras::new(), vec![tile("a", 1), tile("b", 2), tile("c", 3)]);
        doc.swap_order("a", "b").unwrap();
        assert_eq!(doc.find("a").unwrap().order, 2);
        assert_eq!(doc.find("b").unwrap().order, 1);
        assert_eq!(doc.find("c").unwrap().order, 3);
    }

    #[test]
    fn swap_order_on_tie_swaps_positions() {
        let mut doc = LayoutDocument::new(Extras::new(), vec![tile("a", 1), tile("b", 1), tile("c", 0)]);
        doc.swap_order("a", "b").unwrap();
        let ids: Vec<_> = doc
            .presentation_order()
            .into_iter()
            .map(|idx| doc.tiles[idx].instance_id.clone())
            .collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert!(doc.tiles.iter().all(|t| t.order <= 1));
    }

    #[test]
    fn next_order_starts_at_one() {
        let mut doc = LayoutDocument::default();
        assert_eq!(doc.next_order(), 1);
        doc.tiles.push(tile("a", 7));
        assert_eq!(doc.next_order(), 8);
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = json!({
            "extras": {"gridCols": 4},
            "tiles": [{
                "instanceId": "x",
                "typeId": "gone",
                "colSpan": 2,
                "rowSpan": 1,
                "order": 3,
                "config": {"k": 1},
                "pinned": true
            }]
        });
        let doc: LayoutDocument = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(doc.grid_cols(), 4);
        assert_eq!(doc.tiles[0].unknown.get("pinned"), Some(&json!(true)));
        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn merge_missing_keeps_saved_values() {
        let mut target = TileConfig::new();
        target.insert("a".into(), json!(1));
        let mut defaults = TileConfig::new();
        defaults.insert("a".into(), json!(0));
        defaults.insert("b".into(), json!(true));
        assert_eq!(merge_missing(&mut target, defaults), 1);
        assert_eq!(target["a"], json!(1));
        assert_eq!(target["b"], json!(true));
    }

    #[test]
    fn generated_ids_are_unique() {
        let doc = LayoutDocument::default();
        let mut ids = InstanceIdGenerator::new();
        let first = ids.generate("notes", &doc);
        let second = ids.generate("notes", &doc);
        assert_ne!(first, second);
        assert!(first.starts_with("notes-"));
    }
}
