use std::fmt;
use std::sync::Arc;

use crate::error::{DefinitionError, TileResult};
use crate::model::{TileConfig, TileInstance, TileSize};
use crate::render::{ContentHost, TileContext};
use crate::settings::{SettingsContext, SettingsHost};

/// Produces a fresh, type-specific configuration.
pub type ConfigFactory = Arc<dyn Fn() -> TileConfig + Send + Sync>;

/// Draws a tile's interior. Errors and panics are contained per tile.
pub trait TileRender: Send + Sync {
    fn render(
        &self,
        host: &mut ContentHost,
        tile: &TileInstance,
        ctx: &mut TileContext<'_>,
    ) -> TileResult<()>;
}

/// Optional settings capability of a tile type.
pub trait TileSettings: Send + Sync {
    /// Contribute type-specific fields to the settings panel.
    fn build_settings(
        &self,
        host: &mut SettingsHost,
        tile: &TileInstance,
        ctx: &SettingsContext<'_>,
    ) -> TileResult<()>;

    /// Read edited fields back into `tile.config`.
    fn save_config(
        &self,
        _host: &SettingsHost,
        _tile: &mut TileInstance,
        _ctx: &SettingsContext<'_>,
    ) -> TileResult<()> {
        Ok(())
    }
}

struct FnRender<F>(F);

impl<F> TileRender for FnRender<F>
where
    F: Fn(&mut ContentHost, &TileInstance, &mut TileContext<'_>) -> TileResult<()> + Send + Sync,
{
    fn render(
        &self,
        host: &mut ContentHost,
        tile: &TileInstance,
        ctx: &mut TileContext<'_>,
    ) -> TileResult<()> {
        (self.0)(host, tile, ctx)
    }
}

/// Immutable contract for one tile type, validated once at registration.
#[derive(Clone)]
pub struct TileDefinition {
    type_id: String,
    label: String,
    default_size: TileSize,
    listed: bool,
    initial_config: Option<ConfigFactory>,
    renderer: Arc<dyn TileRender>,
    settings: Option<Arc<dyn TileSettings>>,
}

impl TileDefinition {
    pub fn new<R>(type_id: impl Into<String>, renderer: R) -> Self
    where
        R: TileRender + 'static,
    {
        let type_id = type_id.into();
        Self {
            label: type_id.clone(),
            type_id,
            default_size: TileSize::default(),
            listed: true,
            initial_config: None,
            renderer: Arc::new(renderer),
            settings: None,
        }
    }

    /// Build a definition from a plain render closure.
    pub fn from_fn<F>(type_id: impl Into<String>, render: F) -> Self
    where
        F: Fn(&mut ContentHost, &TileInstance, &mut TileContext<'_>) -> TileResult<()>
            + Send
            + Sync
            + 'static,
    {
        Self::new(type_id, FnRender(render))
    }

    /// Stand-in for a tile type whose implementation could not be loaded.
    pub fn unavailable(type_id: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::from_fn(type_id, move |host, _tile, _ctx| {
            host.push_line("Tile unavailable");
            host.push_line(reason.clone());
            Ok(())
        })
        .with_label("Unavailable Tile")
        .unlisted()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Raw spans; zero spans are rejected at registration.
    pub fn with_default_size(mut self, col_span: u16, row_span: u16) -> Self {
        self.default_size = TileSize {
            col_span,
            row_span,
        };
        self
    }

    pub fn with_initial_config<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> TileConfig + Send + Sync + 'static,
    {
        self.initial_config = Some(Arc::new(factory));
        self
    }

    pub fn with_settings<S>(mut self, settings: S) -> Self
    where
        S: TileSettings + 'static,
    {
        self.settings = Some(Arc::new(settings));
        self
    }

    /// Hide from the tile manager's "available" list.
    pub fn unlisted(mut self) -> Self {
        self.listed = false;
        self
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn default_size(&self) -> TileSize {
        self.default_size
    }

    pub fn is_listed(&self) -> bool {
        self.listed
    }

    pub fn renderer(&self) -> &dyn TileRender {
        self.renderer.as_ref()
    }

    pub fn settings(&self) -> Option<&dyn TileSettings> {
        self.settings.as_deref()
    }

    /// Fresh config; empty when the type declares no factory.
    pub fn create_initial_config(&self) -> TileConfig {
        self.initial_config
            .as_ref()
            .map(|factory| factory())
            .unwrap_or_default()
    }

    pub(crate) fn validate(&self) -> Result<(), DefinitionError> {
        if self.type_id.trim().is_empty() {
            return Err(DefinitionError::EmptyTypeId);
        }
        if self.default_size.col_span == 0 || self.default_size.row_span == 0 {
            return Err(DefinitionError::ZeroSize {
                type_id: self.type_id.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for TileDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileDefinition")
            .field("type_id", &self.type_id)
            .field("label", &self.label)
            .field("default_size", &self.default_size)
            .field("listed", &self.listed)
            .field("has_initial_config", &self.initial_config.is_some())
            .field("has_settings", &self.settings.is_some())
            .finish()
    }
}
