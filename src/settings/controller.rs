use crate::error::{DashboardError, Result};
use crate::model::{LayoutDocument, TileInstance};
use crate::registry::{TileDefinition, TileRegistry};
use crate::render::contain;

use super::{SettingsContext, SettingsHost, SettingsPanel};

/// Build the closed panel for a tile. A failing type section is recorded on
/// the panel and leaves the common header usable.
pub fn build_panel(
    definition: Option<&TileDefinition>,
    tile: &TileInstance,
    document: &LayoutDocument,
) -> SettingsPanel {
    let mut panel = SettingsPanel::new(tile.instance_id.clone(), tile.label.clone());
    let Some(settings) = definition.and_then(|d| d.settings()) else {
        return panel;
    };

    let ctx = SettingsContext::new(document);
    let mut section = SettingsHost::new();
    match contain(|| settings.build_settings(&mut section, tile, &ctx)) {
        Ok(()) => {
            panel.section = section;
            panel.has_type_section = true;
        }
        Err(err) => panel.error = Some(err.to_string()),
    }
    panel
}

/// Apply a panel's edits to the document: the definition's `save_config`
/// first, then the label. Nothing is written when `save_config` fails.
pub fn save_panel(
    document: &mut LayoutDocument,
    registry: &TileRegistry,
    panel: &SettingsPanel,
) -> Result<()> {
    let tile = document
        .find(&panel.instance_id)
        .ok_or_else(|| DashboardError::TileNotFound(panel.instance_id.clone()))?;
    let definition = registry.get(&tile.type_id);
    let mut edited = tile.clone();

    if let Some(settings) = definition.and_then(|d| d.settings()) {
        if panel.has_type_section {
            let ctx = SettingsContext::new(document);
            contain(|| settings.save_config(&panel.section, &mut edited, &ctx)).map_err(
                |source| DashboardError::SettingsRejected {
                    instance_id: panel.instance_id.clone(),
                    source,
                },
            )?;
        }
    }

    let label = panel.label.trim();
    edited.label = if label.is_empty() {
        definition
            .map(|d| d.label().to_string())
            .unwrap_or_else(|| edited.label.clone())
    } else {
        label.to_string()
    };
    // Identity fields stay owned by the engine.
    edited.instance_id = panel.instance_id.clone();
    edited.type_id = tile.type_id.clone();

    if let Some(slot) = document.find_mut(&panel.instance_id) {
        *slot = edited;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TileError, TileResult};
    use crate::model::{Extras, TileConfig, TileSize};
    use crate::registry::TileSettings;
    use serde_json::json;

    struct UrlSettings;

    impl TileSettings for UrlSettings {
        fn build_settings(
            &self,
            host: &mut SettingsHost,
            tile: &TileInstance,
            _ctx: &SettingsContext<'_>,
        ) -> TileResult<()> {
            host.add_text("url", "URL", tile.config_str("url").unwrap_or(""));
            Ok(())
        }

        fn save_config(
            &self,
            host: &SettingsHost,
            tile: &mut TileInstance,
            _ctx: &SettingsContext<'_>,
        ) -> TileResult<()> {
            let url = host.text("url").ok_or(TileError::MissingField("url".into()))?;
            if url.is_empty() {
                return Err(TileError::msg("url required"));
            }
            tile.config.insert("url".into(), json!(url));
            Ok(())
        }
    }

    fn setup() -> (LayoutDocument, TileRegistry) {
        let mut registry = TileRegistry::new();
        registry
            .register(
                TileDefinition::from_fn("camera", |_h, _t, _c| Ok(()))
                    .with_label("Camera")
                    .with_settings(UrlSettings),
            )
            .unwrap();
        let mut config = TileConfig::new();
        config.insert("url".into(), json!("http://old"));
        let doc = LayoutDocument::new(
            Extras::new(),
            vec![TileInstance::new("cam-1", "camera", "Porch", TileSize::new(2, 2), 1, config)],
        );
        (doc, registry)
    }

    #[test]
    fn build_panel_collects_type_fields() {
        let (doc, registry) = setup();
        let panel = build_panel(registry.get("camera"), &doc.tiles[0], &doc);
        assert!(panel.has_type_section);
        assert!(!panel.open);
        assert_eq!(panel.label, "Porch");
        assert_eq!(panel.section.text("url"), Some("http://old"));
    }

    #[test]
    fn save_applies_config_and_label() {
        let (mut doc, registry) = setup();
        let mut panel = build_panel(registry.get("camera"), &doc.tiles[0], &doc);
        panel.label = "Driveway".into();
        panel
            .section
            .set("url", crate::settings::FieldValue::Text("http://new".into()));
        save_panel(&mut doc, &registry, &panel).unwrap();
        let tile = doc.find("cam-1").unwrap();
        assert_eq!(tile.label, "Driveway");
        assert_eq!(tile.config_str("url"), Some("http://new"));
    }

    #[test]
    fn rejected_save_leaves_document_untouched() {
        let (mut doc, registry) = setup();
        let before = doc.clone();
        let mut panel = build_panel(registry.get("camera"), &doc.tiles[0], &doc);
        panel.label = "Renamed".into();
        panel
            .section
            .set("url", crate::settings::FieldValue::Text(String::new()));
        let err = save_panel(&mut doc, &registry, &panel).unwrap_err();
        assert!(matches!(err, DashboardError::SettingsRejected { .. }));
        assert_eq!(doc, before);
    }

    #[test]
    fn empty_label_falls_back_to_definition_label() {
        let (mut doc, registry) = setup();
        let mut panel = build_panel(registry.get("camera"), &doc.tiles[0], &doc);
        panel.label = "   ".into();
        save_panel(&mut doc, &registry, &panel).unwrap();
        assert_eq!(doc.find("cam-1").unwrap().label, "Camera");
    }
}
