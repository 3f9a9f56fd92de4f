//! Command line support for time-series raster containers.
//!
//! - [`config`]: cascading YAML configuration with `${VAR}` expansion
//! - [`documents`]: YAML/JSON definition documents, optionally gzipped
//! - [`commands`]: the operations behind each subcommand

pub mod commands;
pub mod config;
pub mod documents;

pub use config::{CatalogConfig, LocalConfig};
pub use documents::{
    get_metadata_path, is_supported_document_type, load_storage_types, read_documents, Document,
};
