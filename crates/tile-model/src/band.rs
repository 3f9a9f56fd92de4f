//! Band descriptors.

use crate::attributes::{AttributeValue, Attributes};
use crate::error::{ModelError, ModelResult};
use crate::raster::DType;
use serde::{Deserialize, Serialize};

/// Variable names the container layout reserves for coordinates and CRS.
pub const RESERVED_NAMES: [&str; 6] = ["time", "latitude", "longitude", "x", "y", "crs"];

/// Units written when a band does not declare any.
pub const DEFAULT_UNITS: &str = "1";

/// Name, element type and fill value of one band variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBandDescriptor", into = "RawBandDescriptor")]
pub struct BandDescriptor {
    name: String,
    dtype: DType,
    nodata: f64,
    units: Option<String>,
    attributes: Attributes,
}

impl BandDescriptor {
    /// Create a validated descriptor.
    pub fn new(name: impl Into<String>, dtype: DType, nodata: f64) -> ModelResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        if !dtype.can_represent(nodata) {
            return Err(ModelError::invalid_band(
                &name,
                format!("nodata {} is not representable as {}", nodata, dtype),
            ));
        }

        Ok(Self {
            name,
            dtype,
            nodata,
            units: None,
            attributes: Attributes::new(),
        })
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn nodata(&self) -> f64 {
        self.nodata
    }

    /// Declared units, or [`DEFAULT_UNITS`].
    pub fn units(&self) -> &str {
        self.units.as_deref().unwrap_or(DEFAULT_UNITS)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Whether a stored band with `dtype`/`nodata` can receive this band's data.
    ///
    /// NaN sentinels compare equal to each other.
    pub fn is_compatible(&self, dtype: DType, nodata: f64) -> bool {
        self.dtype == dtype
            && (self.nodata == nodata || (self.nodata.is_nan() && nodata.is_nan()))
    }
}

fn validate_name(name: &str) -> ModelResult<()> {
    let mut chars = name.chars();
    let first = chars
        .next()
        .ok_or_else(|| ModelError::invalid_band(name, "name is empty"))?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(ModelError::invalid_band(
            name,
            "name must start with a letter or underscore",
        ));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ModelError::invalid_band(
            name,
            "name may only contain letters, digits and underscores",
        ));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(ModelError::invalid_band(
            name,
            "name is reserved for a coordinate variable",
        ));
    }
    Ok(())
}

/// Serialized form; validation happens on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawBandDescriptor {
    #[serde(alias = "varname")]
    name: String,
    dtype: DType,
    nodata: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    units: Option<String>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    attributes: Attributes,
}

impl TryFrom<RawBandDescriptor> for BandDescriptor {
    type Error = ModelError;

    fn try_from(raw: RawBandDescriptor) -> ModelResult<Self> {
        let mut band = BandDescriptor::new(raw.name, raw.dtype, raw.nodata)?;
        band.units = raw.units;
        band.attributes = raw.attributes;
        Ok(band)
    }
}

impl From<BandDescriptor> for RawBandDescriptor {
    fn from(band: BandDescriptor) -> Self {
        Self {
            name: band.name,
            dtype: band.dtype,
            nodata: band.nodata,
            units: band.units,
            attributes: band.attributes,
        }
    }
}
