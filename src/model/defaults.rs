use super::core::{Extras, TileConfig, TileSize};

/// One entry of the first-run layout.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultTile {
    pub instance_id: String,
    pub type_id: String,
    pub label: Option<String>,
    pub size: Option<TileSize>,
    pub order: i64,
    pub enabled: Option<bool>,
    pub config: TileConfig,
}

impl DefaultTile {
    pub fn new(instance_id: impl Into<String>, type_id: impl Into<String>, order: i64) -> Self {
        Self {
            instance_id: instance_id.into(),
            type_id: type_id.into(),
            label: None,
            size: None,
            order,
            enabled: None,
            config: TileConfig::new(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn size(mut self, col_span: u16, row_span: u16) -> Self {
        self.size = Some(TileSize::new(col_span, row_span));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = Some(false);
        self
    }

    /// Seed values layered over the definition's fresh config.
    pub fn config(mut self, config: TileConfig) -> Self {
        self.config = config;
        self
    }
}

/// Layout used when nothing usable is persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefaultLayout {
    pub extras: Extras,
    pub tiles: Vec<DefaultTile>,
}

impl DefaultLayout {
    pub fn new(extras: Extras) -> Self {
        Self {
            extras,
            tiles: Vec::new(),
        }
    }

    pub fn with_tile(mut self, tile: DefaultTile) -> Self {
        self.tiles.push(tile);
        self
    }
}
