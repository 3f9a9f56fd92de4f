//! Read-only access to containers.
//!
//! Used to inspect containers and to verify what the writer produced. The
//! reader never modifies storage.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tile_model::attributes::{float_from_json, RESERVED_GLOBAL_KEYS};
use tile_model::time::{from_epoch_seconds, to_epoch_seconds};
use tile_model::{DType, GeoTransform, RasterArray};

use crate::config::ZarrOptions;
use crate::driver::{ContainerDriver, Dimension, VariableInfo, ZarrDriver};
use crate::error::{Result, StoreError};
use crate::layout::{self, Role};

/// Per-dimension entry of a [`ContainerSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSummary {
    pub name: String,
    pub len: u64,
    pub unlimited: bool,
}

/// Per-band entry of a [`ContainerSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandSummary {
    pub name: String,
    pub dtype: DType,
    pub nodata: Option<f64>,
    pub units: Option<String>,
    pub shape: Vec<u64>,
    pub chunks: Vec<u64>,
}

/// Overview of a container's layout and contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerSummary {
    pub path: String,
    pub driver: &'static str,
    pub projection: String,
    pub geotransform: Option<[f64; 6]>,
    pub dimensions: Vec<DimensionSummary>,
    pub time: Vec<DateTime<Utc>>,
    pub bands: Vec<BandSummary>,
    pub attributes: Map<String, Value>,
}

/// Read-only view of a container.
pub struct ContainerReader {
    driver: Box<dyn ContainerDriver>,
    dimensions: Vec<Dimension>,
    time: Vec<f64>,
}

impl ContainerReader {
    /// Open the Zarr container at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(Box::new(ZarrDriver::new(path, ZarrOptions::default())))
    }

    /// Open a container through an explicit driver.
    pub fn open_with(mut driver: Box<dyn ContainerDriver>) -> Result<Self> {
        driver.open()?;
        let dimensions = driver.dimensions()?;

        let time_var = driver
            .variable(layout::TIME)?
            .ok_or_else(|| StoreError::corrupt("container has no time variable"))?;
        let time_len = time_var.shape.first().copied().unwrap_or_default();
        let time = if time_len == 0 {
            Vec::new()
        } else {
            driver.read_slab(layout::TIME, &[0], &[time_len])?.to_f64_vec()
        };

        Ok(Self {
            driver,
            dimensions,
            time,
        })
    }

    pub fn path(&self) -> &Path {
        self.driver.path()
    }

    fn spatial_dimensions(&self) -> Result<(&Dimension, &Dimension)> {
        let mut fixed = self.dimensions.iter().filter(|d| !d.is_unlimited());
        match (fixed.next(), fixed.next()) {
            (Some(y), Some(x)) => Ok((y, x)),
            _ => Err(StoreError::corrupt("container lacks spatial dimensions")),
        }
    }

    /// Grid shape as (height, width).
    pub fn shape(&self) -> Result<(usize, usize)> {
        let (y, x) = self.spatial_dimensions()?;
        Ok((
            y.len.unwrap_or_default() as usize,
            x.len.unwrap_or_default() as usize,
        ))
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Timestamps on the time axis, in storage order.
    pub fn time_axis(&self) -> Vec<DateTime<Utc>> {
        self.time
            .iter()
            .filter_map(|t| from_epoch_seconds(*t))
            .collect()
    }

    fn read_coordinate(&self, dimension: &Dimension) -> Result<Vec<f64>> {
        let len = dimension.len.unwrap_or_default();
        Ok(self
            .driver
            .read_slab(&dimension.name, &[0], &[len])?
            .to_f64_vec())
    }

    /// Column coordinates (longitude or projected x).
    pub fn x_axis(&self) -> Result<Vec<f64>> {
        let (_, x) = self.spatial_dimensions()?;
        self.read_coordinate(x)
    }

    /// Row coordinates (latitude or projected y).
    pub fn y_axis(&self) -> Result<Vec<f64>> {
        let (y, _) = self.spatial_dimensions()?;
        self.read_coordinate(y)
    }

    fn crs(&self) -> Result<VariableInfo> {
        self.driver
            .variable(layout::CRS)?
            .ok_or_else(|| StoreError::corrupt("container has no crs variable"))
    }

    /// Projection WKT stored on the grid-mapping variable.
    pub fn projection(&self) -> Result<String> {
        Ok(self
            .crs()?
            .attribute_str("crs_wkt")
            .unwrap_or_default()
            .to_string())
    }

    /// Geotransform stored on the grid-mapping variable, if present.
    pub fn geotransform(&self) -> Result<Option<GeoTransform>> {
        let crs = self.crs()?;
        let values: Vec<f64> = crs
            .attributes
            .get("geotransform")
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(float_from_json).collect())
            .unwrap_or_default();
        let Ok(gt) = <[f64; 6]>::try_from(values) else {
            return Ok(None);
        };
        Ok(Some(GeoTransform::from_gdal(gt)?))
    }

    /// Container-level attributes, excluding the layout's own keys.
    pub fn global_attributes(&self) -> Result<Map<String, Value>> {
        let mut attrs = self.driver.read_attributes()?;
        attrs.retain(|key, _| !RESERVED_GLOBAL_KEYS.contains(&key.as_str()));
        Ok(attrs)
    }

    /// Names of all band variables, sorted.
    pub fn band_names(&self) -> Result<Vec<String>> {
        Ok(self.bands()?.into_iter().map(|info| info.name).collect())
    }

    fn bands(&self) -> Result<Vec<VariableInfo>> {
        let mut bands = Vec::new();
        for name in self.driver.variable_names()? {
            if let Some(info) = self.driver.variable(&name)? {
                if Role::from_attributes(&info.attributes) == Some(Role::Band) {
                    bands.push(info);
                }
            }
        }
        Ok(bands)
    }

    fn band(&self, name: &str) -> Result<VariableInfo> {
        self.driver
            .variable(name)?
            .filter(|info| Role::from_attributes(&info.attributes) == Some(Role::Band))
            .ok_or_else(|| StoreError::UnknownBand(name.to_string()))
    }

    /// Slab of band `name` at time slot `index`.
    ///
    /// Slots beyond the band's stored length read as nodata.
    pub fn read_band_at(&self, name: &str, index: usize) -> Result<RasterArray> {
        let info = self.band(name)?;
        let (height, width) = self.shape()?;
        if index >= self.time.len() {
            return Err(StoreError::resource(format!(
                "time index {} out of range for axis of length {}",
                index,
                self.time.len()
            )));
        }

        let stored_len = info.shape.first().copied().unwrap_or_default();
        if index as u64 >= stored_len {
            let nodata = info
                .attributes
                .get("nodata")
                .and_then(float_from_json)
                .unwrap_or(f64::NAN);
            return Ok(RasterArray::filled(height, width, info.dtype, nodata));
        }

        let values = self.driver.read_slab(
            name,
            &[index as u64, 0, 0],
            &[1, height as u64, width as u64],
        )?;
        Ok(RasterArray::new(height, width, values)?)
    }

    /// Slab of band `name` at `timestamp`, or `None` if the timestamp is absent.
    pub fn read_band(&self, name: &str, timestamp: DateTime<Utc>) -> Result<Option<RasterArray>> {
        let seconds = to_epoch_seconds(timestamp);
        match self.time.iter().position(|t| *t == seconds) {
            Some(index) => self.read_band_at(name, index).map(Some),
            None => {
                // Still report unknown bands
                self.band(name)?;
                Ok(None)
            }
        }
    }

    /// Collect a [`ContainerSummary`].
    pub fn summary(&self) -> Result<ContainerSummary> {
        let bands = self
            .bands()?
            .into_iter()
            .map(|info| BandSummary {
                nodata: info.attributes.get("nodata").and_then(float_from_json),
                units: info.attribute_str("units").map(str::to_string),
                name: info.name,
                dtype: info.dtype,
                shape: info.shape,
                chunks: info.chunks,
            })
            .collect();

        let dimensions = self
            .dimensions
            .iter()
            .map(|d| DimensionSummary {
                name: d.name.clone(),
                len: d.len.unwrap_or(self.time.len() as u64),
                unlimited: d.is_unlimited(),
            })
            .collect();

        Ok(ContainerSummary {
            path: self.path().display().to_string(),
            driver: self.driver.name(),
            projection: self.projection()?,
            geotransform: self.geotransform()?.map(|gt| gt.to_gdal()),
            dimensions,
            time: self.time_axis(),
            bands,
            attributes: self.global_attributes()?,
        })
    }
}
