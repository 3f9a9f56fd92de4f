//! Driver options parsed from a storage type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Zarr driver options taken from `storage_spec` keys other than `chunking`.
///
/// Recognised keys: `compression`, `compression_level`, `shuffle`.
/// Anything else is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZarrOptions {
    /// Compression codec applied to band arrays.
    pub compression: ZarrCompression,

    /// Compression level (1-9).
    pub compression_level: u8,

    /// Enable byte shuffle filter for better compression.
    pub shuffle: bool,
}

impl Default for ZarrOptions {
    fn default() -> Self {
        Self {
            compression: ZarrCompression::None,
            compression_level: 1,
            shuffle: true,
        }
    }
}

impl ZarrOptions {
    /// Read options from a storage spec's option map.
    pub fn from_options(options: &Map<String, Value>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(val) = options.get("compression") {
            let name = match val {
                Value::String(s) => s.as_str(),
                Value::Null => "none",
                other => return Err(format!("compression must be a string, got {}", other)),
            };
            config.compression = ZarrCompression::from_str(name)
                .ok_or_else(|| format!("unknown compression '{}'", name))?;
        }

        if let Some(val) = options.get("compression_level") {
            config.compression_level = val
                .as_u64()
                .and_then(|level| u8::try_from(level).ok())
                .ok_or_else(|| format!("compression_level must be an integer, got {}", val))?;
        }

        if let Some(val) = options.get("shuffle") {
            config.shuffle = match val {
                Value::Bool(b) => *b,
                Value::String(s) => s.to_lowercase() == "true" || s == "1",
                Value::Number(n) => n.as_u64() == Some(1),
                other => return Err(format!("shuffle must be a boolean, got {}", other)),
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.compression_level == 0 || self.compression_level > 9 {
            return Err("compression_level must be 1-9".to_string());
        }

        Ok(())
    }
}

/// Compression codec for band arrays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZarrCompression {
    /// No compression.
    #[default]
    None,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd.
    BloscZstd,
}

impl ZarrCompression {
    /// Parse from string (case-insensitive). `lz4` and `zstd` select the Blosc variants.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "" => Some(Self::None),
            "lz4" | "blosc_lz4" => Some(Self::BloscLz4),
            "zstd" | "blosc_zstd" => Some(Self::BloscZstd),
            _ => None,
        }
    }

    /// Get the codec name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for ZarrCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
