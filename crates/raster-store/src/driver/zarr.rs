//! Zarr V3 container driver.
//!
//! A container is a directory holding a root group (`zarr.json`) plus one
//! array per variable at `/<name>`. Dimension lengths are kept in the root
//! group attributes under `_dimensions`; each array records its dimension
//! names in `_ARRAY_DIMENSIONS` and its chunk shape in `_ChunkSizes`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tile_model::{DType, RasterValues};
use tracing::{debug, warn};
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::{Group, GroupBuilder};
use zarrs_filesystem::FilesystemStore;

use super::{ContainerDriver, Dimension, VariableDef, VariableInfo};
use crate::config::{ZarrCompression, ZarrOptions};
use crate::error::{Result, StoreError};

/// Root group attribute listing container dimensions.
pub const DIMENSIONS_ATTR: &str = tile_model::attributes::DIMENSIONS_KEY;
/// Array attribute listing the array's dimension names.
pub const ARRAY_DIMENSIONS_ATTR: &str = "_ARRAY_DIMENSIONS";
/// Array attribute recording the chunk shape.
pub const CHUNK_SIZES_ATTR: &str = "_ChunkSizes";

const METADATA_FILE: &str = "zarr.json";

fn storage_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::resource(e.to_string())
}

/// Driver writing Zarr V3 directories through `zarrs`.
pub struct ZarrDriver {
    root: PathBuf,
    options: ZarrOptions,
    store: Option<Arc<FilesystemStore>>,
}

impl ZarrDriver {
    /// Create a driver for the container at `root`. Nothing is touched on disk yet.
    pub fn new(root: impl AsRef<Path>, options: ZarrOptions) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            options,
            store: None,
        }
    }

    pub fn options(&self) -> &ZarrOptions {
        &self.options
    }

    fn store(&self) -> Result<Arc<FilesystemStore>> {
        self.store
            .clone()
            .ok_or_else(|| StoreError::resource(format!("{} is not open", self.root.display())))
    }

    fn connect(&mut self) -> Result<Arc<FilesystemStore>> {
        let store = Arc::new(FilesystemStore::new(&self.root).map_err(storage_err)?);
        self.store = Some(store.clone());
        Ok(store)
    }

    fn open_array(&self, name: &str) -> Result<Array<FilesystemStore>> {
        Array::open(self.store()?, &format!("/{}", name)).map_err(storage_err)
    }

    fn open_group(&self) -> Result<Group<FilesystemStore>> {
        Group::open(self.store()?, "/").map_err(|e| StoreError::corrupt(e.to_string()))
    }

    fn has_array(&self, name: &str) -> bool {
        self.root.join(name).join(METADATA_FILE).is_file()
    }

    /// Create the compression codec based on configuration.
    fn create_compression_codec(
        &self,
        dtype: DType,
    ) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.options.compression_level)
            .map_err(|_| StoreError::InvalidStorageType("invalid compression level".to_string()))?;

        let shuffle = if self.options.shuffle {
            BloscShuffleMode::Shuffle
        } else {
            BloscShuffleMode::NoShuffle
        };

        // typesize is required when shuffle is enabled
        let typesize = if self.options.shuffle {
            Some(dtype.size_of())
        } else {
            None
        };

        let compressor = match self.options.compression {
            ZarrCompression::None => {
                return Err(StoreError::InvalidStorageType(
                    "no compression configured".to_string(),
                ))
            }
            ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
            ZarrCompression::BloscZstd => BloscCompressor::Zstd,
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| StoreError::InvalidStorageType(e.to_string()))?;

        Ok(Arc::new(codec))
    }

    /// Build a Zarr array for `def` with the configured settings.
    fn build_array(&self, def: &VariableDef) -> Result<Array<FilesystemStore>> {
        let mut attrs = def.attributes.clone();
        attrs.insert(ARRAY_DIMENSIONS_ATTR.to_string(), json!(def.dimensions));
        attrs.insert(CHUNK_SIZES_ATTR.to_string(), json!(def.chunks));

        let chunk_grid: zarrs::array::ChunkGrid = def
            .chunks
            .clone()
            .try_into()
            .map_err(|e| StoreError::InvalidStorageType(format!("{:?}", e)))?;

        let mut binding = ArrayBuilder::new(
            def.shape.clone(),
            data_type(def.dtype),
            chunk_grid,
            fill_value(def.dtype, def.fill_value),
        );
        let mut builder = binding
            .attributes(attrs)
            .dimension_names(Some(def.dimensions.iter().map(String::as_str)));

        if def.compress && self.options.compression != ZarrCompression::None {
            let codec = self.create_compression_codec(def.dtype)?;
            builder = builder.bytes_to_bytes_codecs(vec![codec]);
        }

        builder
            .build(self.store()?, &format!("/{}", def.name))
            .map_err(storage_err)
    }
}

impl ContainerDriver for ZarrDriver {
    fn name(&self) -> &'static str {
        "zarr"
    }

    fn path(&self) -> &Path {
        &self.root
    }

    fn exists(&self) -> bool {
        self.root.join(METADATA_FILE).is_file()
    }

    fn create_container(&mut self) -> Result<()> {
        if self.root.exists() {
            if !self.root.is_dir() {
                return Err(StoreError::resource(format!(
                    "{} exists and is not a directory",
                    self.root.display()
                )));
            }
            if fs::read_dir(&self.root)?.next().is_some() {
                return Err(StoreError::resource(format!(
                    "{} exists and is not an empty directory",
                    self.root.display()
                )));
            }
        }
        fs::create_dir_all(&self.root)?;

        let store = self.connect()?;
        let mut attrs = Map::new();
        attrs.insert(DIMENSIONS_ATTR.to_string(), json!([]));
        let group = GroupBuilder::new()
            .attributes(attrs)
            .build(store, "/")
            .map_err(storage_err)?;
        group.store_metadata().map_err(storage_err)?;

        debug!(path = %self.root.display(), "Created Zarr container");
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        if !self.exists() {
            return Err(StoreError::corrupt(format!(
                "{} has no {}",
                self.root.display(),
                METADATA_FILE
            )));
        }
        self.connect()?;
        self.open_group()?;
        Ok(())
    }

    fn discard(&mut self) -> Result<()> {
        self.store = None;
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }

    fn create_dimension(&mut self, dimension: &Dimension) -> Result<()> {
        let mut dimensions = self.dimensions()?;
        if dimensions.iter().any(|d| d.name == dimension.name) {
            return Err(StoreError::resource(format!(
                "dimension '{}' already exists",
                dimension.name
            )));
        }
        dimensions.push(dimension.clone());

        let encoded: Vec<Value> = dimensions
            .iter()
            .map(|d| json!({"name": d.name, "size": d.len}))
            .collect();
        let mut attrs = Map::new();
        attrs.insert(DIMENSIONS_ATTR.to_string(), Value::Array(encoded));
        self.write_attributes(&attrs)
    }

    fn dimensions(&self) -> Result<Vec<Dimension>> {
        let group = self.open_group()?;
        let Some(Value::Array(entries)) = group.attributes().get(DIMENSIONS_ATTR) else {
            return Ok(Vec::new());
        };

        entries
            .iter()
            .map(|entry| {
                let name = entry
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| StoreError::corrupt("dimension entry without a name"))?;
                Ok(Dimension {
                    name: name.to_string(),
                    len: entry.get("size").and_then(Value::as_u64),
                })
            })
            .collect()
    }

    fn create_variable(&mut self, def: &VariableDef) -> Result<()> {
        if self.has_array(&def.name) {
            return Err(StoreError::resource(format!(
                "variable '{}' already exists",
                def.name
            )));
        }
        if def.shape.len() != def.dimensions.len() || def.chunks.len() != def.dimensions.len() {
            return Err(StoreError::resource(format!(
                "variable '{}': shape, chunks and dimensions differ in rank",
                def.name
            )));
        }

        let stored = self
            .build_array(def)
            .and_then(|array| array.store_metadata().map_err(storage_err));
        if let Err(e) = stored {
            let dir = self.root.join(&def.name);
            if dir.exists() {
                if let Err(cleanup) = fs::remove_dir_all(&dir) {
                    warn!(variable = %def.name, error = %cleanup, "Failed to remove partial variable");
                }
            }
            return Err(e);
        }

        debug!(
            variable = %def.name,
            dtype = %def.dtype,
            shape = ?def.shape,
            chunks = ?def.chunks,
            "Created variable"
        );
        Ok(())
    }

    fn variable(&self, name: &str) -> Result<Option<VariableInfo>> {
        if !self.has_array(name) {
            return Ok(None);
        }
        let array = self.open_array(name)?;
        let dtype = dtype_of(array.data_type()).ok_or_else(|| {
            StoreError::corrupt(format!("variable '{}' has unsupported data type", name))
        })?;
        let attributes = array.attributes().clone();

        let dimensions = attributes
            .get(ARRAY_DIMENSIONS_ATTR)
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let chunks = attributes
            .get(CHUNK_SIZES_ATTR)
            .and_then(Value::as_array)
            .map(|sizes| sizes.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default();

        Ok(Some(VariableInfo {
            name: name.to_string(),
            dtype,
            dimensions,
            shape: array.shape().to_vec(),
            chunks,
            attributes,
        }))
    }

    fn variable_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if self.has_array(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn resize_variable(&mut self, name: &str, shape: &[u64]) -> Result<()> {
        let mut array = self.open_array(name)?;
        if array.shape() == shape {
            return Ok(());
        }
        if array.shape().len() != shape.len() {
            return Err(StoreError::resource(format!(
                "cannot resize '{}' from rank {} to rank {}",
                name,
                array.shape().len(),
                shape.len()
            )));
        }
        array.set_shape(shape.to_vec());
        array.store_metadata().map_err(storage_err)?;
        debug!(variable = %name, shape = ?shape, "Resized variable");
        Ok(())
    }

    fn write_slab(
        &mut self,
        name: &str,
        start: &[u64],
        shape: &[u64],
        values: &RasterValues,
    ) -> Result<()> {
        let array = self.open_array(name)?;
        let expected = dtype_of(array.data_type());
        if expected != Some(values.dtype()) {
            return Err(StoreError::BandTypeMismatch {
                band: name.to_string(),
                stored: expected.map(|d| d.to_string()).unwrap_or_default(),
                requested: values.dtype().to_string(),
            });
        }

        let subset = ArraySubset::new_with_start_shape(start.to_vec(), shape.to_vec())
            .map_err(storage_err)?;

        match values {
            RasterValues::Int8(v) => array.store_array_subset_elements(&subset, v),
            RasterValues::UInt8(v) => array.store_array_subset_elements(&subset, v),
            RasterValues::Int16(v) => array.store_array_subset_elements(&subset, v),
            RasterValues::UInt16(v) => array.store_array_subset_elements(&subset, v),
            RasterValues::Int32(v) => array.store_array_subset_elements(&subset, v),
            RasterValues::UInt32(v) => array.store_array_subset_elements(&subset, v),
            RasterValues::Int64(v) => array.store_array_subset_elements(&subset, v),
            RasterValues::UInt64(v) => array.store_array_subset_elements(&subset, v),
            RasterValues::Float32(v) => array.store_array_subset_elements(&subset, v),
            RasterValues::Float64(v) => array.store_array_subset_elements(&subset, v),
        }
        .map_err(storage_err)
    }

    fn read_slab(&self, name: &str, start: &[u64], shape: &[u64]) -> Result<RasterValues> {
        let array = self.open_array(name)?;
        let dtype = dtype_of(array.data_type()).ok_or_else(|| {
            StoreError::corrupt(format!("variable '{}' has unsupported data type", name))
        })?;

        let subset = ArraySubset::new_with_start_shape(start.to_vec(), shape.to_vec())
            .map_err(storage_err)?;

        macro_rules! retrieve {
            ($ty:ty) => {
                RasterValues::from(
                    array
                        .retrieve_array_subset_elements::<$ty>(&subset)
                        .map_err(storage_err)?,
                )
            };
        }

        Ok(match dtype {
            DType::Int8 => retrieve!(i8),
            DType::UInt8 => retrieve!(u8),
            DType::Int16 => retrieve!(i16),
            DType::UInt16 => retrieve!(u16),
            DType::Int32 => retrieve!(i32),
            DType::UInt32 => retrieve!(u32),
            DType::Int64 => retrieve!(i64),
            DType::UInt64 => retrieve!(u64),
            DType::Float32 => retrieve!(f32),
            DType::Float64 => retrieve!(f64),
        })
    }

    fn read_attributes(&self) -> Result<Map<String, Value>> {
        let group = self.open_group()?;
        Ok(group.attributes().clone())
    }

    fn write_attributes(&mut self, attributes: &Map<String, Value>) -> Result<()> {
        let mut group = self.open_group()?;
        group.attributes_mut().extend(attributes.clone());
        group.store_metadata().map_err(storage_err)
    }

    fn flush(&mut self) -> Result<()> {
        // FilesystemStore writes through on every call.
        self.store()?;
        debug!(path = %self.root.display(), "Flushed Zarr container");
        Ok(())
    }
}

fn data_type(dtype: DType) -> DataType {
    match dtype {
        DType::Int8 => DataType::Int8,
        DType::UInt8 => DataType::UInt8,
        DType::Int16 => DataType::Int16,
        DType::UInt16 => DataType::UInt16,
        DType::Int32 => DataType::Int32,
        DType::UInt32 => DataType::UInt32,
        DType::Int64 => DataType::Int64,
        DType::UInt64 => DataType::UInt64,
        DType::Float32 => DataType::Float32,
        DType::Float64 => DataType::Float64,
    }
}

fn dtype_of(data_type: &DataType) -> Option<DType> {
    match data_type {
        DataType::Int8 => Some(DType::Int8),
        DataType::UInt8 => Some(DType::UInt8),
        DataType::Int16 => Some(DType::Int16),
        DataType::UInt16 => Some(DType::UInt16),
        DataType::Int32 => Some(DType::Int32),
        DataType::UInt32 => Some(DType::UInt32),
        DataType::Int64 => Some(DType::Int64),
        DataType::UInt64 => Some(DType::UInt64),
        DataType::Float32 => Some(DType::Float32),
        DataType::Float64 => Some(DType::Float64),
        _ => None,
    }
}

/// Fill value of `dtype` from a nodata sentinel, with `as` conversion.
fn fill_value(dtype: DType, value: f64) -> FillValue {
    match dtype {
        DType::Int8 => FillValue::from(value as i8),
        DType::UInt8 => FillValue::from(value as u8),
        DType::Int16 => FillValue::from(value as i16),
        DType::UInt16 => FillValue::from(value as u16),
        DType::Int32 => FillValue::from(value as i32),
        DType::UInt32 => FillValue::from(value as u32),
        DType::Int64 => FillValue::from(value as i64),
        DType::UInt64 => FillValue::from(value as u64),
        DType::Float32 => FillValue::from(value as f32),
        DType::Float64 => FillValue::from(value),
    }
}
