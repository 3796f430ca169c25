use serde_json::json;

use crate::error::TileResult;
use crate::model::{TileConfig, TileInstance};
use crate::registry::{TileDefinition, TileSettings};
use crate::render::{ContentHost, TileContext};
use crate::settings::{SettingsContext, SettingsHost};

pub const TYPE_ID: &str = "notes";
const TEXT: &str = "text";
const PLACEHOLDER: &str = "Scratchpad for quick notes...";

fn render(host: &mut ContentHost, tile: &TileInstance, _ctx: &mut TileContext<'_>) -> TileResult<()> {
    let text = tile.config_str(TEXT).unwrap_or("");
    if text.trim().is_empty() {
        host.push_line(PLACEHOLDER);
    } else {
        // Literal `\n` sequences let single-line editors enter line breaks.
        host.set_text(&text.replace("\\n", "\n"));
    }
    Ok(())
}

struct NotesSettings;

impl TileSettings for NotesSettings {
    fn build_settings(
        &self,
        host: &mut SettingsHost,
        tile: &TileInstance,
        _ctx: &SettingsContext<'_>,
    ) -> TileResult<()> {
        host.add_text(TEXT, "Text", tile.config_str(TEXT).unwrap_or(""));
        Ok(())
    }

    fn save_config(
        &self,
        host: &SettingsHost,
        tile: &mut TileInstance,
        _ctx: &SettingsContext<'_>,
    ) -> TileResult<()> {
        tile.config.insert(TEXT.into(), json!(host.text(TEXT).unwrap_or("")));
        Ok(())
    }
}

pub fn definition() -> TileDefinition {
    TileDefinition::from_fn(TYPE_ID, render)
        .with_label("Notes")
        .with_initial_config(|| {
            let mut config = TileConfig::new();
            config.insert(TEXT.into(), json!(""));
            config
        })
        .with_settings(NotesSettings)
}
