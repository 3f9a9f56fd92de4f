//! Data model for time-series raster tiles.
//!
//! Describes where a tile sits on the ground ([`GeoTransform`], [`TileSpec`]),
//! what a band looks like ([`BandDescriptor`], [`DType`]) and how output is
//! laid out ([`StorageType`]). Everything here is an immutable value; the
//! `raster-store` crate consumes these to build containers.

pub mod attributes;
pub mod band;
pub mod bounds;
pub mod crs;
pub mod error;
pub mod geotransform;
pub mod raster;
pub mod storage_type;
pub mod tile;
pub mod time;

pub use attributes::{AttributeValue, Attributes};
pub use band::BandDescriptor;
pub use bounds::Bounds;
pub use crs::{AxisSpec, CrsKind};
pub use error::{ModelError, ModelResult};
pub use geotransform::GeoTransform;
pub use raster::{DType, RasterArray, RasterValues};
pub use storage_type::{StorageSpec, StorageType};
pub use tile::TileSpec;
