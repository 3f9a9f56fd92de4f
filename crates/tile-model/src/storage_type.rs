//! Output format policies.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Chunking axis keys accepted in `storage_spec.chunking`.
pub mod axes {
    /// Growable time axis
    pub const TIME: &str = "t";
    /// Rows
    pub const Y: &str = "y";
    /// Columns
    pub const X: &str = "x";

    pub const ALL: [&str; 3] = [TIME, Y, X];
}

/// Chunk length of the time axis when none is configured.
pub const DEFAULT_TIME_CHUNK: u64 = 1;

/// A named output policy: which driver to use and how to lay data out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageType {
    #[serde(alias = "driver")]
    pub driver_name: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "storage")]
    pub storage_spec: StorageSpec,
}

/// Layout configuration of a storage type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSpec {
    /// Axis name (`t`, `y`, `x`) to chunk length.
    #[serde(default)]
    pub chunking: BTreeMap<String, u64>,
    /// Driver-specific options, kept opaque here.
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl StorageType {
    pub fn new(
        driver_name: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        storage_spec: StorageSpec,
    ) -> Self {
        Self {
            driver_name: driver_name.into(),
            name: name.into(),
            description: description.into(),
            storage_spec,
        }
    }

    /// Check identifiers and chunk lengths.
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::invalid_storage_type(
                &self.name,
                "name must not be empty",
            ));
        }
        if self.driver_name.trim().is_empty() {
            return Err(ModelError::invalid_storage_type(
                &self.name,
                "driver_name must not be empty",
            ));
        }
        self.storage_spec
            .validate()
            .map_err(|message| ModelError::invalid_storage_type(&self.name, message))
    }

    pub fn chunking(&self) -> &BTreeMap<String, u64> {
        &self.storage_spec.chunking
    }
}

impl StorageSpec {
    /// Spec with only chunking set.
    pub fn with_chunking<I, K>(chunking: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        Self {
            chunking: chunking.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            options: serde_json::Map::new(),
        }
    }

    /// Add a driver option.
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    fn validate(&self) -> Result<(), String> {
        for (axis, len) in &self.chunking {
            if !axes::ALL.contains(&axis.as_str()) {
                return Err(format!(
                    "unknown chunking axis '{}', expected one of {:?}",
                    axis,
                    axes::ALL
                ));
            }
            if *len == 0 {
                return Err(format!("chunk length for axis '{}' must be > 0", axis));
            }
        }
        Ok(())
    }

    /// Chunk length for `axis` of current length `axis_len`.
    ///
    /// See [`chunk_length`].
    pub fn chunk_for(&self, axis: &str, axis_len: u64) -> u64 {
        chunk_length(&self.chunking, axis, axis_len)
    }
}

/// Resolve a chunk length from a chunking mapping.
///
/// Fixed axes use the configured length clamped to the axis length, or the
/// whole axis when unspecified. The growable time axis uses the configured
/// length as is, or [`DEFAULT_TIME_CHUNK`].
pub fn chunk_length(chunking: &BTreeMap<String, u64>, axis: &str, axis_len: u64) -> u64 {
    let configured = chunking.get(axis).copied().filter(|len| *len > 0);
    if axis == axes::TIME {
        return configured.unwrap_or(DEFAULT_TIME_CHUNK);
    }
    let whole = axis_len.max(1);
    configured.map(|len| len.min(whole)).unwrap_or(whole)
}
