//! Error types for the tile data model.

use thiserror::Error;

/// Result type alias using ModelError.
pub type ModelResult<T> = Result<T, ModelError>;

/// Validation errors raised while constructing model values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Array shape {found:?} does not match tile shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Invalid band descriptor '{name}': {message}")]
    InvalidBand { name: String, message: String },

    #[error("Invalid storage type '{name}': {message}")]
    InvalidStorageType { name: String, message: String },

    #[error("Invalid attribute '{key}': {message}")]
    InvalidAttribute { key: String, message: String },
}

impl ModelError {
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    pub fn invalid_band(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidBand {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn invalid_storage_type(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidStorageType {
            name: name.into(),
            message: message.into(),
        }
    }
}
