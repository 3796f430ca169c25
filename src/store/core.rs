use std::collections::HashSet;

use serde_json::json;

use crate::logging::{LogLevel, Logger, TARGET_STORE, emit, json_kv, json_str};
use crate::model::{DefaultLayout, LayoutDocument, TileInstance, merge_missing};
use crate::registry::TileRegistry;

use super::backend::KeyValueStore;

/// Versioned key of the persisted layout document.
pub const STORAGE_KEY: &str = "tileboard.layout.v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Serialized bytes matched the last successful write.
    Unchanged,
    Failed { reason: String },
}

impl SaveOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, SaveOutcome::Failed { .. })
    }
}

/// Where a loaded document came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    Persisted,
    /// Nothing was stored under the key.
    DefaultsAbsent,
    /// Stored data could not be read or parsed.
    DefaultsRecovered { reason: String },
}

/// Reads and writes the layout document through a key-value backend.
/// Never fails outward: loads fall back to defaults, saves report failure.
pub struct LayoutStore {
    backend: Box<dyn KeyValueStore>,
    key: String,
    last_digest: Option<blake3::Hash>,
    logger: Option<Logger>,
}

impl LayoutStore {
    pub fn new<B>(backend: B) -> Self
    where
        B: KeyValueStore + 'static,
    {
        Self {
            backend: Box::new(backend),
            key: STORAGE_KEY.to_string(),
            last_digest: None,
            logger: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_logger(mut self, logger: Option<Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn load(&mut self, defaults: &DefaultLayout, registry: &TileRegistry) -> LayoutDocument {
        self.load_with_source(defaults, registry).0
    }

    pub fn load_with_source(
        &mut self,
        defaults: &DefaultLayout,
        registry: &TileRegistry,
    ) -> (LayoutDocument, LoadSource) {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                emit(
                    self.logger.as_ref(),
                    LogLevel::Info,
                    TARGET_STORE,
                    "layout_defaults_used",
                    [json_str("key", self.key.clone())],
                );
                return (
                    materialize_defaults(defaults, registry),
                    LoadSource::DefaultsAbsent,
                );
            }
            Err(err) => return self.recover(defaults, registry, err.to_string()),
        };

        match serde_json::from_str::<LayoutDocument>(&raw) {
            Ok(mut document) => {
                self.last_digest = Some(blake3::hash(raw.as_bytes()));
                let filled = backfill(&mut document, defaults, registry);
                for (original, renamed) in dedupe_instance_ids(&mut document) {
                    emit(
                        self.logger.as_ref(),
                        LogLevel::Warn,
                        TARGET_STORE,
                        "duplicate_instance_id",
                        [
                            json_str("instance_id", original),
                            json_str("renamed", renamed),
                        ],
                    );
                }
                emit(
                    self.logger.as_ref(),
                    LogLevel::Debug,
                    TARGET_STORE,
                    "layout_loaded",
                    [
                        json_kv("tiles", json!(document.len())),
                        json_kv("backfilled", json!(filled)),
                    ],
                );
                (document, LoadSource::Persisted)
            }
            Err(err) => self.recover(defaults, registry, err.to_string()),
        }
    }

    fn recover(
        &mut self,
        defaults: &DefaultLayout,
        registry: &TileRegistry,
        reason: String,
    ) -> (LayoutDocument, LoadSource) {
        emit(
            self.logger.as_ref(),
            LogLevel::Warn,
            TARGET_STORE,
            "layout_load_failed",
            [
                json_str("key", self.key.clone()),
                json_str("error", reason.clone()),
            ],
        );
        (
            materialize_defaults(defaults, registry),
            LoadSource::DefaultsRecovered { reason },
        )
    }

    pub fn save(&mut self, document: &LayoutDocument) -> SaveOutcome {
        let serialized = match serde_json::to_string(document) {
            Ok(serialized) => serialized,
            Err(err) => return self.fail(err.to_string()),
        };
        let digest = blake3::hash(serialized.as_bytes());
        if self.last_digest == Some(digest) {
            return SaveOutcome::Unchanged;
        }

        match self.backend.set(&self.key, &serialized) {
            Ok(()) => {
                self.last_digest = Some(digest);
                emit(
                    self.logger.as_ref(),
                    LogLevel::Debug,
                    TARGET_STORE,
                    "layout_saved",
                    [
                        json_kv("bytes", json!(serialized.len())),
                        json_str("digest", digest.to_hex().to_string()),
                    ],
                );
                SaveOutcome::Saved
            }
            Err(err) => self.fail(err.to_string()),
        }
    }

    fn fail(&self, reason: String) -> SaveOutcome {
        emit(
            self.logger.as_ref(),
            LogLevel::Error,
            TARGET_STORE,
            "layout_save_failed",
            [
                json_str("key", self.key.clone()),
                json_str("error", reason.clone()),
            ],
        );
        SaveOutcome::Failed { reason }
    }

    /// Drop the persisted document; the next load uses defaults.
    pub fn clear(&mut self) -> SaveOutcome {
        self.last_digest = None;
        match self.backend.remove(&self.key) {
            Ok(()) => SaveOutcome::Saved,
            Err(err) => self.fail(err.to_string()),
        }
    }
}

/// Build a fresh document from the default layout, one instance per entry.
pub fn materialize_defaults(defaults: &DefaultLayout, registry: &TileRegistry) -> LayoutDocument {
    let tiles = defaults
        .tiles
        .iter()
        .map(|entry| {
            let definition = registry.get(&entry.type_id);
            let mut config = entry.config.clone();
            if let Some(definition) = definition {
                merge_missing(&mut config, definition.create_initial_config());
            }
            let label = entry
                .label
                .clone()
                .or_else(|| definition.map(|d| d.label().to_string()))
                .unwrap_or_else(|| entry.type_id.clone());
            let size = entry
                .size
                .or_else(|| definition.map(|d| d.default_size()))
                .unwrap_or_default();

            let mut tile = TileInstance::new(
                entry.instance_id.clone(),
                entry.type_id.clone(),
                label,
                size,
                entry.order,
                config,
            );
            tile.enabled = entry.enabled;
            tile
        })
        .collect();
    LayoutDocument::new(defaults.extras.clone(), tiles)
}

/// Fill fields a stored document lacks from the defaults and the current
/// definitions. Values already present win; unknown types are left alone.
/// Returns how many fields were filled.
pub fn backfill(
    document: &mut LayoutDocument,
    defaults: &DefaultLayout,
    registry: &TileRegistry,
) -> usize {
    let mut filled = merge_missing(&mut document.extras, defaults.extras.clone());

    for tile in document.tiles.iter_mut() {
        let Some(definition) = registry.get(&tile.type_id) else {
            continue;
        };
        if tile.label.is_empty() {
            tile.label = definition.label().to_string();
            filled += 1;
        }
        let size = definition.default_size();
        if tile.col_span == 0 {
            tile.col_span = size.col_span;
            filled += 1;
        }
        if tile.row_span == 0 {
            tile.row_span = size.row_span;
            filled += 1;
        }
        filled += merge_missing(&mut tile.config, definition.create_initial_config());
    }
    filled
}

/// Give every repeat of an `instanceId` a fresh `{id}-{n}` id. The first
/// occurrence keeps its id. Returns `(original, renamed)` pairs.
pub fn dedupe_instance_ids(document: &mut LayoutDocument) -> Vec<(String, String)> {
    let mut taken: HashSet<String> = document
        .tiles
        .iter()
        .map(|tile| tile.instance_id.clone())
        .collect();
    let mut seen = HashSet::new();
    let mut renamed = Vec::new();
    for tile in document.tiles.iter_mut() {
        if seen.insert(tile.instance_id.clone()) {
            continue;
        }
        let fresh = (2..)
            .map(|n| format!("{}-{n}", tile.instance_id))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or_default();
        taken.insert(fresh.clone());
        seen.insert(fresh.clone());
        let original = std::mem::replace(&mut tile.instance_id, fresh.clone());
        renamed.push((original, fresh));
    }
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use crate::model::{DefaultTile, EXTRA_GRID_COLS, Extras, TileConfig};
    use crate::registry::TileDefinition;
    use crate::store::MemoryStore;

    fn registry() -> TileRegistry {
        let mut registry = TileRegistry::new();
        registry
            .register(
                TileDefinition::from_fn("notes", |_h, _t, _c| Ok(()))
                    .with_label("Notes")
                    .with_default_size(2, 1)
                    .with_initial_config(|| {
                        let mut config = TileConfig::new();
                        config.insert("text".into(), json!(""));
                        config.insert("fontSize".into(), json!(14));
                        config
                    }),
            )
            .unwrap();
        registry
            .register(TileDefinition::from_fn("clock", |_h, _t, _c| Ok(())).with_label("Clock"))
            .unwrap();
        registry
    }

    fn defaults() -> DefaultLayout {
        let mut extras = Extras::new();
        extras.insert(EXTRA_GRID_COLS.into(), json!(6));
        extras.insert("icsCalendar".into(), json!(""));
        DefaultLayout::new(extras)
            .with_tile(DefaultTile::new("notes-1", "notes", 1))
            .with_tile(DefaultTile::new("clock-1", "clock", 2).label("Wall Clock").size(1, 1))
    }

    #[test]
    fn absent_data_materializes_defaults() {
        let mut store = LayoutStore::new(MemoryStore::new());
        let (doc, source) = store.load_with_source(&defaults(), &registry());
        assert_eq!(source, LoadSource::DefaultsAbsent);
        assert_eq!(doc.len(), 2);
        let notes = doc.find("notes-1").unwrap();
        assert_eq!(notes.label, "Notes");
        assert_eq!((notes.col_span, notes.row_span), (2, 1));
        assert_eq!(notes.config["fontSize"], json!(14));
        assert_eq!(doc.find("clock-1").unwrap().label, "Wall Clock");
    }

    #[test]
    fn corrupt_data_falls_back_and_logs() {
        let backend = MemoryStore::new();
        backend.set(STORAGE_KEY, "{not json").unwrap();
        let sink = MemorySink::new();
        let mut store =
            LayoutStore::new(backend).with_logger(Some(Logger::new(sink.clone())));
        let (doc, source) = store.load_with_source(&defaults(), &registry());
        assert!(matches!(source, LoadSource::DefaultsRecovered { .. }));
        assert_eq!(doc.len(), 2);
        assert_eq!(sink.messages_at(LogLevel::Warn), vec!["layout_load_failed"]);
    }

    #[test]
    fn backfill_keeps_overrides_and_skips_unknown_types() {
        let backend = MemoryStore::new();
        let stored = json!({
            "extras": {"gridCols": 4},
            "tiles": [
                {"instanceId": "n", "typeId": "notes", "order": 1, "config": {"fontSize": 20}},
                {"instanceId": "g", "typeId": "ghost", "order": 2, "config": {"x": 1}}
            ]
        });
        backend.set(STORAGE_KEY, &stored.to_string()).unwrap();
        let mut store = LayoutStore::new(backend);
        let doc = store.load(&defaults(), &registry());

        assert_eq!(doc.grid_cols(), 4);
        assert_eq!(doc.extras["icsCalendar"], json!(""));
        let notes = doc.find("n").unwrap();
        assert_eq!(notes.label, "Notes");
        assert_eq!((notes.col_span, notes.row_span), (2, 1));
        assert_eq!(notes.config["fontSize"], json!(20));
        assert_eq!(notes.config["text"], json!(""));

        let ghost = doc.find("g").unwrap();
        assert_eq!(serde_json::to_value(ghost).unwrap(), stored["tiles"][1]);
    }

    #[test]
    fn duplicate_ids_are_renamed_on_load() {
        let backend = MemoryStore::new();
        let stored = json!({
            "tiles": [
                {"instanceId": "k", "typeId": "clock", "order": 1},
                {"instanceId": "k", "typeId": "clock", "order": 2},
                {"instanceId": "k-2", "typeId": "notes", "order": 3},
                {"instanceId": "k", "typeId": "notes", "order": 4}
            ]
        });
        backend.set(STORAGE_KEY, &stored.to_string()).unwrap();
        let sink = MemorySink::new();
        let mut store =
            LayoutStore::new(backend).with_logger(Some(Logger::new(sink.clone())));
        let (doc, source) = store.load_with_source(&defaults(), &registry());

        assert_eq!(source, LoadSource::Persisted);
        let ids: Vec<_> = doc.tiles.iter().map(|t| t.instance_id.as_str()).collect();
        assert_eq!(ids, vec!["k", "k-3", "k-2", "k-4"]);
        assert_eq!(doc.find("k").unwrap().order, 1);
        assert_eq!(
            sink.messages_at(LogLevel::Warn),
            vec!["duplicate_instance_id", "duplicate_instance_id"]
        );
    }

    #[test]
    fn repeated_loads_are_identical() {
        let backend = MemoryStore::new();
        let mut store = LayoutStore::new(backend.clone());
        let first = store.load(&defaults(), &registry());
        store.save(&first);

        let mut reloaded = LayoutStore::new(backend.clone());
        let a = serde_json::to_string(&reloaded.load(&defaults(), &registry())).unwrap();
        let b = serde_json::to_string(&reloaded.load(&defaults(), &registry())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unchanged_documents_skip_the_write() {
        let mut store = LayoutStore::new(MemoryStore::new());
        let mut doc = store.load(&defaults(), &registry());
        assert_eq!(store.save(&doc), SaveOutcome::Saved);
        assert_eq!(store.save(&doc), SaveOutcome::Unchanged);
        doc.set_extra("gridCols", 3);
        assert_eq!(store.save(&doc), SaveOutcome::Saved);
    }

    #[test]
    fn quota_failure_is_reported_not_raised() {
        let sink = MemorySink::new();
        let mut store = LayoutStore::new(MemoryStore::with_quota(16))
            .with_logger(Some(Logger::new(sink.clone())));
        let doc = store.load(&defaults(), &registry());
        assert!(store.save(&doc).is_failed());
        assert_eq!(sink.messages_at(LogLevel::Error), vec!["layout_save_failed"]);
        // A failed write does not poison the digest.
        assert!(store.save(&doc).is_failed());
    }
}
