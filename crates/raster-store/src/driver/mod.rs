//! Storage drivers.
//!
//! A [`ContainerDriver`] knows how to persist named dimensions, typed
//! n-dimensional variables with attributes, and container-level attributes.
//! The writer only talks to this trait; the concrete on-disk format is picked
//! from a storage type's `driver_name` by [`driver_for`].

pub mod zarr;

use std::path::Path;

use serde_json::{Map, Value};
use tile_model::{DType, RasterValues, StorageType};

use crate::config::ZarrOptions;
use crate::error::{Result, StoreError};

pub use self::zarr::ZarrDriver;

/// Driver names served by [`ZarrDriver`] (compared case-insensitively).
pub const ZARR_DRIVER_NAMES: [&str; 4] = ["zarr", "zarr-cf", "zarr-v3", "zarr_v3"];

/// NetCDF driver names found in existing storage-type definitions. No
/// NetCDF driver exists; these get an error naming the Zarr replacement.
pub const NETCDF_DRIVER_NAMES: [&str; 3] = ["netcdf-cf", "netcdf_cf", "netcdf"];

/// A named container dimension. `len` is `None` for the growable axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub len: Option<u64>,
}

impl Dimension {
    pub fn fixed(name: impl Into<String>, len: u64) -> Self {
        Self {
            name: name.into(),
            len: Some(len),
        }
    }

    pub fn unlimited(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            len: None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.len.is_none()
    }
}

/// Everything needed to create a variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    pub dtype: DType,
    pub dimensions: Vec<String>,
    pub shape: Vec<u64>,
    pub chunks: Vec<u64>,
    pub fill_value: f64,
    pub attributes: Map<String, Value>,
    /// Apply the driver's configured compression.
    pub compress: bool,
}

/// Shape and metadata of an existing variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub name: String,
    pub dtype: DType,
    pub dimensions: Vec<String>,
    pub shape: Vec<u64>,
    pub chunks: Vec<u64>,
    pub attributes: Map<String, Value>,
}

impl VariableInfo {
    /// Attribute value as a string, if present and textual.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Persistence operations used by the container writer and reader.
///
/// Implementations own their storage exclusively between `create_container`
/// / `open` and `flush`; callers serialise access.
pub trait ContainerDriver: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Location of the container.
    fn path(&self) -> &Path;

    /// Whether a container already exists at [`path`](Self::path).
    fn exists(&self) -> bool;

    /// Initialise an empty container.
    fn create_container(&mut self) -> Result<()>;

    /// Attach to an existing container.
    fn open(&mut self) -> Result<()>;

    /// Remove a container left behind by a failed initialisation.
    fn discard(&mut self) -> Result<()>;

    fn create_dimension(&mut self, dimension: &Dimension) -> Result<()>;

    /// Dimensions in creation order.
    fn dimensions(&self) -> Result<Vec<Dimension>>;

    /// Create a variable. On failure no partial variable remains.
    fn create_variable(&mut self, def: &VariableDef) -> Result<()>;

    fn variable(&self, name: &str) -> Result<Option<VariableInfo>>;

    fn variable_names(&self) -> Result<Vec<String>>;

    /// Change the shape of a variable, keeping existing data.
    fn resize_variable(&mut self, name: &str, shape: &[u64]) -> Result<()>;

    /// Write `values` into the hyper-rectangle at `start` with extent `shape`.
    ///
    /// `values` must already have the variable's dtype.
    fn write_slab(&mut self, name: &str, start: &[u64], shape: &[u64], values: &RasterValues)
        -> Result<()>;

    /// Read the hyper-rectangle at `start` with extent `shape`.
    fn read_slab(&self, name: &str, start: &[u64], shape: &[u64]) -> Result<RasterValues>;

    /// Write a run of coordinate values to a one-dimensional variable.
    fn write_coordinate(&mut self, name: &str, start: u64, values: &[f64]) -> Result<()> {
        self.write_slab(
            name,
            &[start],
            &[values.len() as u64],
            &RasterValues::Float64(values.to_vec()),
        )
    }

    /// Container-level attributes.
    fn read_attributes(&self) -> Result<Map<String, Value>>;

    /// Merge `attributes` into the container-level attributes.
    fn write_attributes(&mut self, attributes: &Map<String, Value>) -> Result<()>;

    /// Make all writes durable.
    fn flush(&mut self) -> Result<()>;
}

/// Select a driver for `storage_type` rooted at `path`.
pub fn driver_for(storage_type: &StorageType, path: &Path) -> Result<Box<dyn ContainerDriver>> {
    let driver_name = storage_type.driver_name.to_lowercase();
    if ZARR_DRIVER_NAMES.contains(&driver_name.as_str()) {
        let options = ZarrOptions::from_options(&storage_type.storage_spec.options).map_err(|e| {
            StoreError::InvalidStorageType(format!("{}: {}", storage_type.name, e))
        })?;
        return Ok(Box::new(ZarrDriver::new(path, options)));
    }

    if NETCDF_DRIVER_NAMES.contains(&driver_name.as_str()) {
        return Err(StoreError::UnsupportedDriver(format!(
            "{} (NetCDF output is not available; use driver 'zarr-cf' for CF-style containers)",
            storage_type.driver_name
        )));
    }

    Err(StoreError::UnsupportedDriver(storage_type.driver_name.clone()))
}
