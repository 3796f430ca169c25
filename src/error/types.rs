use thiserror::Error;

/// Unified result type for the dashboard crate.
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Result returned by tile render, settings, and timer hooks.
pub type TileResult<T> = std::result::Result<T, TileError>;

/// Result returned by key-value store backends.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the dashboard session and its controllers.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("tile type `{0}` is not registered")]
    UnknownTileType(String),
    #[error("tile instance `{0}` not found")]
    TileNotFound(String),
    #[error("invalid tile definition: {0}")]
    Definition(#[from] DefinitionError),
    #[error("settings for tile `{instance_id}` were rejected: {source}")]
    SettingsRejected {
        instance_id: String,
        #[source]
        source: TileError,
    },
    #[error("persistence error: {0}")]
    Store(#[from] StoreError),
    #[error("terminal backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Registration-time validation failures for tile definitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("tile type id must not be empty")]
    EmptyTypeId,
    #[error("tile type `{0}` is already registered")]
    Duplicate(String),
    #[error("tile type `{type_id}` declares a zero default size")]
    ZeroSize { type_id: String },
}

/// Failures reported by the key-value store behind the layout store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored layout is malformed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("storage quota exceeded ({needed} bytes > {quota} bytes)")]
    QuotaExceeded { needed: usize, quota: usize },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Failure raised by tile code; contained at the per-tile boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TileError {
    #[error("{0}")]
    Message(String),
    #[error("tile panicked: {0}")]
    Panicked(String),
    #[error("settings field `{0}` is missing")]
    MissingField(String),
}

impl TileError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Terminal driver failures.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("dashboard error: {0}")]
    Dashboard(#[from] DashboardError),
    #[error("terminal error: {0}")]
    Terminal(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
