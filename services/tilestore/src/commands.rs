//! Subcommand implementations. Each returns a serializable report.

use crate::config::LocalConfig;
use crate::documents::load_storage_types;
use anyhow::{Context, Result};
use raster_store::{driver_for, ContainerReader, ContainerSummary};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One storage type as listed by `storage-types`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageTypeReport {
    pub name: String,
    pub driver: String,
    pub description: String,
    pub chunking: BTreeMap<String, u64>,
    pub source: PathBuf,
    /// Whether a container driver exists for it and its options parse.
    pub supported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summarise the container at `path`.
pub fn inspect(path: &Path) -> Result<ContainerSummary> {
    let reader = ContainerReader::open(path)
        .with_context(|| format!("Failed to open container {:?}", path))?;
    let summary = reader.summary()?;
    info!(
        path = %path.display(),
        bands = summary.bands.len(),
        time_len = summary.time.len(),
        "Inspected container"
    );
    Ok(summary)
}

/// Load storage type definitions from `files` and check each against the
/// available drivers.
pub fn storage_types(files: &[PathBuf]) -> Result<Vec<StorageTypeReport>> {
    let mut reports = Vec::new();
    for file in files {
        for storage_type in load_storage_types(file)? {
            let error = driver_for(&storage_type, Path::new(&storage_type.name))
                .err()
                .map(|e| e.to_string());
            if let Some(error) = &error {
                warn!(name = %storage_type.name, error = %error, "Storage type not usable");
            }
            reports.push(StorageTypeReport {
                supported: error.is_none(),
                error,
                chunking: storage_type.chunking().clone(),
                name: storage_type.name,
                driver: storage_type.driver_name,
                description: storage_type.description,
                source: file.clone(),
            });
        }
    }
    Ok(reports)
}

/// Effective configuration from `files`, or from the default search path
/// when none are given.
pub fn show_config(files: &[PathBuf]) -> Result<LocalConfig> {
    let config = if files.is_empty() {
        LocalConfig::find_default()?
    } else {
        LocalConfig::find(files)?
    };
    info!(files = ?config.files_loaded, "Resolved configuration");
    Ok(config)
}
