//! Error types for container writing.

use thiserror::Error;
use tile_model::ModelError;

/// Errors surfaced by the container writer, reader and drivers.
///
/// Nothing here is retried internally; retry policy belongs to the caller.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Non-rectilinear geotransform, empty projection or similar.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// An existing container disagrees with the supplied tile.
    #[error("spatial mismatch on {field}: container has {stored}, tile has {requested}")]
    SpatialMismatch {
        field: &'static str,
        stored: String,
        requested: String,
    },

    /// Array shape differs from the tile's (height, width).
    #[error("array shape {found:?} does not match tile shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Existing band has a different dtype or nodata value.
    #[error("band '{band}' is stored as {stored}, requested {requested}")]
    BandTypeMismatch {
        band: String,
        stored: String,
        requested: String,
    },

    /// The writer was already closed.
    #[error("writer for {0} has been closed")]
    UseAfterClose(String),

    /// Storage medium unavailable or write failure.
    #[error("storage error: {0}")]
    Resource(String),

    /// Band handle does not belong to this container.
    #[error("unknown band: {0}")]
    UnknownBand(String),

    /// The tile carries no raster payload.
    #[error("tile has no data to append: {0}")]
    MissingData(String),

    #[error("invalid band: {0}")]
    InvalidBand(String),

    #[error("invalid storage type: {0}")]
    InvalidStorageType(String),

    #[error("unsupported storage driver: {0}")]
    UnsupportedDriver(String),

    /// Container metadata is missing or unreadable.
    #[error("corrupt container: {0}")]
    CorruptContainer(String),
}

impl StoreError {
    /// Create a Resource error.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Create a CorruptContainer error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptContainer(msg.into())
    }

    /// Create a SpatialMismatch error.
    pub fn spatial_mismatch(
        field: &'static str,
        stored: impl ToString,
        requested: impl ToString,
    ) -> Self {
        Self::SpatialMismatch {
            field,
            stored: stored.to_string(),
            requested: requested.to_string(),
        }
    }
}

impl From<ModelError> for StoreError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidGeometry(msg) => Self::InvalidGeometry(msg),
            ModelError::ShapeMismatch { expected, found } => {
                Self::ShapeMismatch { expected, found }
            }
            ModelError::InvalidStorageType { .. } => Self::InvalidStorageType(err.to_string()),
            ModelError::InvalidBand { .. } | ModelError::InvalidAttribute { .. } => {
                Self::InvalidBand(err.to_string())
            }
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Resource(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::CorruptContainer(err.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
