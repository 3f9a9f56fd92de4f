//! Time-series container writer.
//!
//! A [`WriterHandle`] owns one container exclusively while it is open. It
//! creates the container from a [`TileSpec`] on first use, validates that
//! later tiles share its grid, and appends one 2-D slab per (band, timestamp).
//!
//! Appending to a new timestamp writes the band data before the time
//! coordinate is extended, so a failed write never leaves a time entry
//! without data behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tile_model::attributes::float_from_json;
use tile_model::storage_type::{axes, chunk_length};
use tile_model::time::{from_epoch_seconds, to_epoch_seconds};
use tile_model::{BandDescriptor, DType, RasterArray, RasterValues, StorageType, TileSpec};
use tracing::{debug, info, warn};

use crate::driver::{driver_for, ContainerDriver, Dimension, VariableDef, VariableInfo};
use crate::error::{Result, StoreError};
use crate::layout::{self, Role};

/// Relative tolerance when comparing a stored geotransform with a tile's.
const GEOTRANSFORM_TOLERANCE: f64 = 1e-12;

/// Reference to a band variable inside an open container.
#[derive(Debug, Clone, PartialEq)]
pub struct BandHandle {
    name: String,
    dtype: DType,
    nodata: f64,
}

impl BandHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn nodata(&self) -> f64 {
        self.nodata
    }

    fn matches(&self, other: &BandHandle) -> bool {
        self.name == other.name
            && self.dtype == other.dtype
            && (self.nodata == other.nodata || (self.nodata.is_nan() && other.nodata.is_nan()))
    }

    fn from_variable(info: &VariableInfo) -> Result<Self> {
        let nodata = info
            .attributes
            .get("nodata")
            .and_then(float_from_json)
            .ok_or_else(|| {
                StoreError::corrupt(format!("band '{}' has no nodata attribute", info.name))
            })?;
        Ok(Self {
            name: info.name.clone(),
            dtype: info.dtype,
            nodata,
        })
    }
}

/// Grid facts fixed at container creation.
#[derive(Debug, Clone)]
struct Grid {
    y_name: String,
    x_name: String,
    height: usize,
    width: usize,
}

/// Exclusive handle on an open container.
pub struct WriterHandle {
    driver: Box<dyn ContainerDriver>,
    path: PathBuf,
    grid: Grid,
    /// Time coordinate in epoch seconds, mirrored from storage.
    time: Vec<f64>,
    bands: BTreeMap<String, BandHandle>,
    created: bool,
    closed: bool,
}

impl std::fmt::Debug for WriterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterHandle")
            .field("driver", &self.driver.name())
            .field("path", &self.path)
            .field("time_len", &self.time.len())
            .field("bands", &self.bands.keys().collect::<Vec<_>>())
            .field("closed", &self.closed)
            .finish()
    }
}

impl WriterHandle {
    /// Open the container at `path`, creating it from `tile` if absent.
    ///
    /// A new container gets the time dimension (unlimited), the spatial
    /// dimensions and coordinates, the grid-mapping variable and the global
    /// attributes. An existing container must match the tile's projection,
    /// geotransform and shape or [`StoreError::SpatialMismatch`] is returned.
    pub fn create_or_open(
        path: impl AsRef<Path>,
        tile: &TileSpec,
        storage_type: &StorageType,
    ) -> Result<Self> {
        let path = path.as_ref();
        storage_type.validate()?;
        let driver = driver_for(storage_type, path)?;
        Self::create_or_open_with(driver, tile)
    }

    /// Same as [`create_or_open`](Self::create_or_open) with an explicit driver.
    pub fn create_or_open_with(mut driver: Box<dyn ContainerDriver>, tile: &TileSpec) -> Result<Self> {
        if tile.projection().trim().is_empty() {
            return Err(StoreError::InvalidGeometry(
                "tile projection is empty".to_string(),
            ));
        }
        // Rejects rotated grids before anything touches storage
        let x_axis = tile.x_axis()?;
        let y_axis = tile.y_axis()?;

        let crs = tile.crs_kind();
        let grid = Grid {
            y_name: crs.y_axis().name.to_string(),
            x_name: crs.x_axis().name.to_string(),
            height: tile.height(),
            width: tile.width(),
        };
        let path = driver.path().to_path_buf();

        if driver.exists() {
            driver.open()?;
            let mut writer = Self {
                driver,
                path,
                grid,
                time: Vec::new(),
                bands: BTreeMap::new(),
                created: false,
                closed: false,
            };
            if let Err(e) = writer.load_existing(tile) {
                writer.closed = true;
                return Err(e);
            }
            info!(
                path = %writer.path.display(),
                time_len = writer.time.len(),
                bands = writer.bands.len(),
                "Opened existing container"
            );
            return Ok(writer);
        }

        driver.create_container()?;
        let mut writer = Self {
            driver,
            path,
            grid,
            time: Vec::new(),
            bands: BTreeMap::new(),
            created: true,
            closed: false,
        };
        if let Err(e) = writer.initialise(tile, &x_axis, &y_axis) {
            warn!(path = %writer.path.display(), error = %e, "Container initialisation failed");
            if let Err(cleanup) = writer.driver.discard() {
                warn!(path = %writer.path.display(), error = %cleanup, "Failed to discard container");
            }
            writer.closed = true;
            return Err(e);
        }
        info!(
            path = %writer.path.display(),
            driver = writer.driver.name(),
            height = tile.height(),
            width = tile.width(),
            "Created container"
        );
        Ok(writer)
    }

    /// Lay out dimensions, coordinates, grid mapping and global attributes.
    fn initialise(&mut self, tile: &TileSpec, x_axis: &[f64], y_axis: &[f64]) -> Result<()> {
        let height = self.grid.height as u64;
        let width = self.grid.width as u64;
        let crs = tile.crs_kind();

        self.driver.write_attributes(&layout::global_attributes(tile))?;

        self.driver.create_dimension(&Dimension::unlimited(layout::TIME))?;
        self.driver
            .create_dimension(&Dimension::fixed(&self.grid.y_name, height))?;
        self.driver
            .create_dimension(&Dimension::fixed(&self.grid.x_name, width))?;

        self.driver.create_variable(&VariableDef {
            name: layout::TIME.to_string(),
            dtype: DType::Float64,
            dimensions: vec![layout::TIME.to_string()],
            shape: vec![0],
            chunks: vec![layout::TIME_COORDINATE_CHUNK],
            fill_value: f64::NAN,
            attributes: layout::time_attributes(),
            compress: false,
        })?;

        for (name, len, values, spec) in [
            (&self.grid.y_name, height, y_axis, crs.y_axis()),
            (&self.grid.x_name, width, x_axis, crs.x_axis()),
        ] {
            self.driver.create_variable(&VariableDef {
                name: name.clone(),
                dtype: DType::Float64,
                dimensions: vec![name.clone()],
                shape: vec![len],
                chunks: vec![len],
                fill_value: f64::NAN,
                attributes: layout::axis_attributes(&spec),
                compress: false,
            })?;
            self.driver.write_coordinate(name, 0, values)?;
        }

        self.driver.create_variable(&VariableDef {
            name: layout::CRS.to_string(),
            dtype: DType::Int32,
            dimensions: vec![layout::CRS.to_string()],
            shape: vec![1],
            chunks: vec![1],
            fill_value: 0.0,
            attributes: layout::crs_attributes(tile),
            compress: false,
        })?;

        self.driver.flush()
    }

    /// Check an existing container against `tile` and load its time axis and bands.
    fn load_existing(&mut self, tile: &TileSpec) -> Result<()> {
        let dimensions = self.driver.dimensions()?;
        let fixed: Vec<&Dimension> = dimensions.iter().filter(|d| !d.is_unlimited()).collect();
        let [y_dim, x_dim] = fixed.as_slice() else {
            return Err(StoreError::corrupt(format!(
                "expected two spatial dimensions, found {}",
                fixed.len()
            )));
        };
        let stored_height = y_dim.len.unwrap_or_default();
        let stored_width = x_dim.len.unwrap_or_default();

        let crs = self
            .driver
            .variable(layout::CRS)?
            .ok_or_else(|| StoreError::corrupt("container has no crs variable"))?;
        let stored_projection = crs.attribute_str("crs_wkt").unwrap_or_default();
        if stored_projection.trim() != tile.projection().trim() {
            return Err(StoreError::spatial_mismatch(
                "projection",
                stored_projection,
                tile.projection(),
            ));
        }

        if stored_height != tile.height() as u64 {
            return Err(StoreError::spatial_mismatch("height", stored_height, tile.height()));
        }
        if stored_width != tile.width() as u64 {
            return Err(StoreError::spatial_mismatch("width", stored_width, tile.width()));
        }

        let stored_gt: Vec<f64> = crs
            .attributes
            .get("geotransform")
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(float_from_json).collect())
            .unwrap_or_default();
        let requested_gt = tile.geotransform().to_gdal();
        let same_gt = stored_gt.len() == 6
            && stored_gt.iter().zip(requested_gt.iter()).all(|(a, b)| {
                (a - b).abs() <= GEOTRANSFORM_TOLERANCE * a.abs().max(b.abs()).max(1.0)
            });
        if !same_gt {
            return Err(StoreError::spatial_mismatch(
                "geotransform",
                format!("{:?}", stored_gt),
                format!("{:?}", requested_gt),
            ));
        }

        self.grid.y_name = y_dim.name.clone();
        self.grid.x_name = x_dim.name.clone();

        let time_var = self
            .driver
            .variable(layout::TIME)?
            .ok_or_else(|| StoreError::corrupt("container has no time variable"))?;
        let time_len = time_var.shape.first().copied().unwrap_or_default();
        self.time = if time_len == 0 {
            Vec::new()
        } else {
            self.driver
                .read_slab(layout::TIME, &[0], &[time_len])?
                .to_f64_vec()
        };

        for name in self.driver.variable_names()? {
            if let Some(info) = self.driver.variable(&name)? {
                if Role::from_attributes(&info.attributes) == Some(Role::Band) {
                    self.bands.insert(name, BandHandle::from_variable(&info)?);
                }
            }
        }
        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(StoreError::UseAfterClose(self.path.display().to_string()));
        }
        Ok(())
    }

    /// Return the band variable for `band`, creating it if missing.
    ///
    /// A new band is shaped `[time_len, height, width]` with `nodata` as fill
    /// value, so existing timestamps read as nodata. An existing band must
    /// have the same dtype and nodata, otherwise
    /// [`StoreError::BandTypeMismatch`].
    pub fn ensure_band(
        &mut self,
        band: &BandDescriptor,
        chunking: &BTreeMap<String, u64>,
    ) -> Result<BandHandle> {
        self.check_open()?;

        if let Some(existing) = self.bands.get(band.name()) {
            if !band.is_compatible(existing.dtype, existing.nodata) {
                return Err(StoreError::BandTypeMismatch {
                    band: band.name().to_string(),
                    stored: format!("{} (nodata {})", existing.dtype, existing.nodata),
                    requested: format!("{} (nodata {})", band.dtype(), band.nodata()),
                });
            }
            return Ok(existing.clone());
        }

        if let Some((axis, _)) = chunking.iter().find(|(_, len)| **len == 0) {
            return Err(StoreError::InvalidStorageType(format!(
                "chunk length for axis '{}' must be > 0",
                axis
            )));
        }

        let time_len = self.time.len() as u64;
        let height = self.grid.height as u64;
        let width = self.grid.width as u64;
        let def = VariableDef {
            name: band.name().to_string(),
            dtype: band.dtype(),
            dimensions: vec![
                layout::TIME.to_string(),
                self.grid.y_name.clone(),
                self.grid.x_name.clone(),
            ],
            shape: vec![time_len, height, width],
            chunks: vec![
                chunk_length(chunking, axes::TIME, time_len),
                chunk_length(chunking, axes::Y, height),
                chunk_length(chunking, axes::X, width),
            ],
            fill_value: band.nodata(),
            attributes: layout::band_attributes(band),
            compress: true,
        };
        self.driver.create_variable(&def)?;

        let handle = BandHandle {
            name: band.name().to_string(),
            dtype: band.dtype(),
            nodata: band.nodata(),
        };
        self.bands.insert(handle.name.clone(), handle.clone());
        info!(
            band = %handle.name,
            dtype = %handle.dtype,
            chunks = ?def.chunks,
            "Created band"
        );
        Ok(handle)
    }

    /// Write `array` as the slab of `band` at `timestamp`.
    ///
    /// An existing timestamp is overwritten in place. A new timestamp is
    /// appended as the last time slot, growing every band. Returns the
    /// time index written.
    pub fn append(
        &mut self,
        band: &BandHandle,
        timestamp: DateTime<Utc>,
        array: &RasterArray,
    ) -> Result<usize> {
        self.check_open()?;

        let known = self
            .bands
            .get(&band.name)
            .ok_or_else(|| StoreError::UnknownBand(band.name.clone()))?;
        if !known.matches(band) {
            return Err(StoreError::UnknownBand(band.name.clone()));
        }

        let expected = (self.grid.height, self.grid.width);
        if array.shape() != expected {
            return Err(StoreError::ShapeMismatch {
                expected,
                found: array.shape(),
            });
        }

        let (converted, replaced) = array.cast_or_fill(band.dtype, band.nodata);
        if replaced > 0 {
            warn!(
                band = %band.name,
                %timestamp,
                replaced,
                dtype = %band.dtype,
                "Values not representable in band dtype stored as nodata"
            );
        }
        let values = converted.into_values();
        let seconds = to_epoch_seconds(timestamp);

        if let Some(index) = self.time.iter().position(|t| *t == seconds) {
            self.write_slot(&band.name, index, &values)?;
            debug!(band = %band.name, %timestamp, index, "Overwrote time slot");
            return Ok(index);
        }

        let index = self.time.len();
        if let Some(last) = self.time.last() {
            if seconds < *last {
                warn!(
                    band = %band.name,
                    %timestamp,
                    last = ?from_epoch_seconds(*last),
                    "Timestamp precedes the last time slot; appending out of order"
                );
            }
        }

        let new_len = index as u64 + 1;
        let mut grown = Vec::new();
        if let Err(e) = self.claim_slot(&band.name, index, &values, &mut grown) {
            self.abandon_slot(&grown, index);
            return Err(e);
        }

        let extended = self
            .driver
            .resize_variable(layout::TIME, &[new_len])
            .and_then(|_| self.driver.write_coordinate(layout::TIME, index as u64, &[seconds]));
        if let Err(e) = extended {
            self.rollback(layout::TIME, index);
            self.abandon_slot(&grown, index);
            return Err(e);
        }

        self.time.push(seconds);
        debug!(band = %band.name, %timestamp, index, "Appended time slot");
        Ok(index)
    }

    /// Grow every band to `index + 1` slots and fill slot `index`: `values`
    /// for `target`, nodata for the rest. Bands grown so far are recorded in
    /// `grown`.
    ///
    /// Shrinking a variable leaves its chunks on disk, so the nodata write
    /// keeps data from an abandoned slot from resurfacing when it is reused.
    fn claim_slot(
        &mut self,
        target: &str,
        index: usize,
        values: &RasterValues,
        grown: &mut Vec<String>,
    ) -> Result<()> {
        let shape = [index as u64 + 1, self.grid.height as u64, self.grid.width as u64];
        let handles: Vec<BandHandle> = self.bands.values().cloned().collect();
        for handle in &handles {
            self.driver.resize_variable(&handle.name, &shape)?;
            grown.push(handle.name.clone());
            if handle.name == target {
                self.write_slot(&handle.name, index, values)?;
            } else {
                let fill = self.nodata_slab(handle);
                self.write_slot(&handle.name, index, &fill)?;
            }
        }
        Ok(())
    }

    /// Best-effort reset of slot `index` to nodata in `names`, then shrink
    /// them back to `index` slots.
    fn abandon_slot(&mut self, names: &[String], index: usize) {
        for name in names {
            if let Some(handle) = self.bands.get(name).cloned() {
                let fill = self.nodata_slab(&handle);
                if let Err(e) = self.write_slot(name, index, &fill) {
                    warn!(band = %name, index, error = %e, "Failed to clear abandoned time slot");
                }
            }
            self.rollback(name, index);
        }
    }

    fn write_slot(&mut self, name: &str, index: usize, values: &RasterValues) -> Result<()> {
        let slab = [1, self.grid.height as u64, self.grid.width as u64];
        self.driver
            .write_slab(name, &[index as u64, 0, 0], &slab, values)
    }

    fn nodata_slab(&self, band: &BandHandle) -> RasterValues {
        RasterValues::filled(band.dtype, self.grid.height * self.grid.width, band.nodata)
    }

    /// Best-effort shrink of `name` back to `time_len` slots.
    fn rollback(&mut self, name: &str, time_len: usize) {
        let shape = if name == layout::TIME {
            vec![time_len as u64]
        } else {
            vec![time_len as u64, self.grid.height as u64, self.grid.width as u64]
        };
        if let Err(e) = self.driver.resize_variable(name, &shape) {
            warn!(variable = %name, error = %e, "Failed to roll back variable length");
        }
    }

    /// Read the slab of `band` at `timestamp`, or `None` if the timestamp is absent.
    pub fn read_band(
        &self,
        band: &BandHandle,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<RasterArray>> {
        self.check_open()?;
        if !self.bands.contains_key(&band.name) {
            return Err(StoreError::UnknownBand(band.name.clone()));
        }

        let seconds = to_epoch_seconds(timestamp);
        let Some(index) = self.time.iter().position(|t| *t == seconds) else {
            return Ok(None);
        };
        let values = self.driver.read_slab(
            &band.name,
            &[index as u64, 0, 0],
            &[1, self.grid.height as u64, self.grid.width as u64],
        )?;
        Ok(Some(RasterArray::new(self.grid.height, self.grid.width, values)?))
    }

    /// Timestamps on the time axis, in storage order.
    pub fn time_axis(&self) -> Result<Vec<DateTime<Utc>>> {
        self.check_open()?;
        Ok(self
            .time
            .iter()
            .filter_map(|t| from_epoch_seconds(*t))
            .collect())
    }

    pub fn time_len(&self) -> usize {
        self.time.len()
    }

    /// Handle of an existing band.
    pub fn band(&self, name: &str) -> Result<BandHandle> {
        self.check_open()?;
        self.bands
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownBand(name.to_string()))
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.contains_key(name)
    }

    /// Names of all band variables, sorted.
    pub fn band_names(&self) -> Result<Vec<String>> {
        self.check_open()?;
        Ok(self.bands.keys().cloned().collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this handle created the container.
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Flush and release the container. Later operations fail with
    /// [`StoreError::UseAfterClose`].
    pub fn close(&mut self) -> Result<()> {
        self.check_open()?;
        self.closed = true;
        self.driver.flush()?;
        info!(
            path = %self.path.display(),
            time_len = self.time.len(),
            bands = self.bands.len(),
            "Closed container"
        );
        Ok(())
    }
}

impl Drop for WriterHandle {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        warn!(path = %self.path.display(), "Writer dropped without close; flushing");
        if let Err(e) = self.driver.flush() {
            warn!(path = %self.path.display(), error = %e, "Flush on drop failed");
        }
    }
}
