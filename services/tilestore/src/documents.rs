//! Reading YAML and JSON definition documents.
//!
//! A file may hold several YAML documents separated by `---`, a single JSON
//! document, or either of those gzip-compressed (`.yaml.gz`, `.json.gz`).
//!
//! Dataset metadata is located with [`get_metadata_path`]: the path itself
//! if it is a document, else a sibling `<name>.agdc-md.*` file, else an
//! `agdc-metadata.*` file inside the directory.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tile_model::StorageType;
use tracing::debug;

const YAML_EXTENSIONS: [&str; 2] = ["yaml", "yml"];
const JSON_EXTENSIONS: [&str; 1] = ["json"];
const COMPRESSED_EXTENSIONS: [&str; 1] = ["gz"];

/// Appended to a dataset's file name to name its sibling metadata document.
pub const SIBLING_METADATA_SUFFIX: &str = ".agdc-md";
/// Stem of a metadata document describing a whole directory.
pub const DIRECTORY_METADATA_STEM: &str = "agdc-metadata";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Yaml,
    Json,
}

/// One parsed document and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: PathBuf,
    /// Position within a multi-document file.
    pub index: usize,
    pub content: Value,
}

/// Whether `path` names a file [`read_documents`] can parse.
pub fn is_supported_document_type(path: &Path) -> bool {
    document_format(path).is_some()
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

/// Format and compression of `path`, judged by its suffixes.
fn document_format(path: &Path) -> Option<(DocumentFormat, bool)> {
    let mut ext = extension(path)?;
    let mut compressed = false;
    if COMPRESSED_EXTENSIONS.contains(&ext.as_str()) {
        compressed = true;
        ext = extension(Path::new(path.file_stem()?))?;
    }

    if YAML_EXTENSIONS.contains(&ext.as_str()) {
        Some((DocumentFormat::Yaml, compressed))
    } else if JSON_EXTENSIONS.contains(&ext.as_str()) {
        Some((DocumentFormat::Json, compressed))
    } else {
        None
    }
}

/// Parse every document in `path`.
///
/// Empty YAML documents are skipped.
pub fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let Some((format, compressed)) = document_format(path) else {
        bail!("Unsupported document type: {}", path.display());
    };

    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader: Box<dyn Read> = if compressed {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let contents = match format {
        DocumentFormat::Yaml => parse_yaml(reader, path)?,
        DocumentFormat::Json => {
            let value: Value = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
            vec![value]
        }
    };

    debug!(path = %path.display(), count = contents.len(), "Read documents");

    Ok(contents
        .into_iter()
        .enumerate()
        .map(|(index, content)| Document {
            path: path.to_path_buf(),
            index,
            content,
        })
        .collect())
}

fn parse_yaml(reader: Box<dyn Read>, path: &Path) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_reader(reader).enumerate() {
        let value = Value::deserialize(document)
            .with_context(|| format!("Failed to parse YAML document {} from {:?}", index, path))?;
        if !value.is_null() {
            values.push(value);
        }
    }
    Ok(values)
}

/// Locate the metadata document for `dataset_path`.
pub fn get_metadata_path(dataset_path: &Path) -> Result<PathBuf> {
    // A metadata document given directly
    if dataset_path.is_file() && is_supported_document_type(dataset_path) {
        return Ok(dataset_path.to_path_buf());
    }

    if let Some(name) = dataset_path.file_name().and_then(|n| n.to_str()) {
        let parent = dataset_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let prefix = format!("{}{}", name, SIBLING_METADATA_SUFFIX);
        if let Some(found) = find_any_metadata_suffix(parent, &prefix)? {
            return Ok(found);
        }
    }

    if dataset_path.is_dir() {
        if let Some(found) = find_any_metadata_suffix(dataset_path, DIRECTORY_METADATA_STEM)? {
            return Ok(found);
        }
    }

    bail!("No metadata found for input {:?}", dataset_path)
}

/// The single supported document in `dir` whose name starts with `prefix`.
fn find_any_metadata_suffix(dir: &Path, prefix: &str) -> Result<Option<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to list {:?}", dir)),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list {:?}", dir))?
            .path();
        let name_matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix));
        if name_matches && is_supported_document_type(&path) {
            matches.push(path);
        }
    }
    matches.sort();

    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        _ => bail!("Multiple matched metadata files: {:?}", matches),
    }
}

/// Read and validate every storage type defined in `path`.
pub fn load_storage_types(path: &Path) -> Result<Vec<StorageType>> {
    read_documents(path)?
        .into_iter()
        .map(|document| {
            let storage_type: StorageType = serde_json::from_value(document.content)
                .with_context(|| {
                    format!(
                        "Document {} in {:?} is not a storage type",
                        document.index, document.path
                    )
                })?;
            storage_type.validate().with_context(|| {
                format!("Invalid storage type in {:?}", document.path)
            })?;
            Ok(storage_type)
        })
        .collect()
}
