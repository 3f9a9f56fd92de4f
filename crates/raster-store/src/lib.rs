//! Time-series raster containers.
//!
//! Writes georeferenced 2-D tiles into per-tile containers that grow along
//! an unlimited time axis, one variable per band:
//!
//! - [`WriterHandle`]: exclusive writer with create-or-open, band creation
//!   and append/overwrite of time slots
//! - [`append_to_container`]: open, ensure band, append, close in one call
//! - [`ContainerReader`]: read-only inspection
//!
//! Storage goes through the [`ContainerDriver`] trait; [`ZarrDriver`] writes
//! Zarr V3 directories.

pub mod append;
pub mod config;
pub mod driver;
pub mod error;
pub mod layout;
pub mod reader;
pub mod writer;

pub use append::{append_to_container, AppendResult};
pub use config::{ZarrCompression, ZarrOptions};
pub use driver::{driver_for, ContainerDriver, Dimension, VariableDef, VariableInfo, ZarrDriver};
pub use error::{Result, StoreError};
pub use reader::{BandSummary, ContainerReader, ContainerSummary, DimensionSummary};
pub use writer::{BandHandle, WriterHandle};
