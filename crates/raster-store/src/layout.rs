//! Variable names and CF attributes of a container.
//!
//! Every container holds a `time` coordinate on the unlimited dimension, a
//! pair of spatial coordinates named after the CRS kind (`latitude` /
//! `longitude` or `y` / `x`), a scalar `crs` grid-mapping variable and any
//! number of band variables shaped `[time, y, x]`. Each variable carries a
//! `_role` attribute so bands can be told apart from support variables.

use chrono::Utc;
use serde_json::{json, Map, Value};
use tile_model::attributes::{attributes_to_json, float_to_json};
use tile_model::crs::AxisSpec;
use tile_model::time::{TIME_CALENDAR, TIME_UNITS};
use tile_model::{BandDescriptor, TileSpec};

/// Time coordinate and unlimited dimension.
pub const TIME: &str = "time";
/// Grid-mapping variable.
pub const CRS: &str = "crs";
/// Attribute naming a variable's role.
pub const ROLE_ATTR: &str = "_role";
/// CF conventions version written to new containers.
pub const CONVENTIONS: &str = "CF-1.6";

/// Chunk length of the time coordinate variable.
pub const TIME_COORDINATE_CHUNK: u64 = 1024;

/// What a variable is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinate,
    GridMapping,
    Band,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Coordinate => "coordinate",
            Role::GridMapping => "grid_mapping",
            Role::Band => "band",
        }
    }

    pub fn from_attributes(attrs: &Map<String, Value>) -> Option<Self> {
        match attrs.get(ROLE_ATTR).and_then(Value::as_str)? {
            "coordinate" => Some(Role::Coordinate),
            "grid_mapping" => Some(Role::GridMapping),
            "band" => Some(Role::Band),
            _ => None,
        }
    }
}

fn with_role(role: Role) -> Map<String, Value> {
    let mut attrs = Map::new();
    attrs.insert(ROLE_ATTR.to_string(), json!(role.as_str()));
    attrs
}

/// Attributes of the time coordinate.
pub fn time_attributes() -> Map<String, Value> {
    let mut attrs = with_role(Role::Coordinate);
    attrs.insert("standard_name".into(), json!("time"));
    attrs.insert("long_name".into(), json!("Time, unix time-stamp"));
    attrs.insert("units".into(), json!(TIME_UNITS));
    attrs.insert("calendar".into(), json!(TIME_CALENDAR));
    attrs.insert("axis".into(), json!("T"));
    attrs
}

/// Attributes of a spatial coordinate.
pub fn axis_attributes(axis: &AxisSpec) -> Map<String, Value> {
    let mut attrs = with_role(Role::Coordinate);
    attrs.insert("standard_name".into(), json!(axis.standard_name));
    attrs.insert("long_name".into(), json!(axis.long_name));
    attrs.insert("units".into(), json!(axis.units));
    attrs.insert("axis".into(), json!(axis.axis));
    attrs
}

/// Attributes of the grid-mapping variable.
pub fn crs_attributes(tile: &TileSpec) -> Map<String, Value> {
    let mut attrs = with_role(Role::GridMapping);
    let gt = tile.geotransform();
    if tile.crs_kind().is_geographic() {
        attrs.insert("grid_mapping_name".into(), json!("latitude_longitude"));
    }
    attrs.insert("crs_wkt".into(), json!(tile.projection()));
    attrs.insert("spatial_ref".into(), json!(tile.projection()));
    attrs.insert("GeoTransform".into(), json!(gt.to_string()));
    attrs.insert(
        "geotransform".into(),
        Value::Array(gt.to_gdal().iter().map(|v| float_to_json(*v)).collect()),
    );
    attrs
}

/// Attributes of a band variable.
pub fn band_attributes(band: &BandDescriptor) -> Map<String, Value> {
    let mut attrs = attributes_to_json(band.attributes());
    attrs.insert("units".into(), json!(band.units()));
    attrs.insert("nodata".into(), float_to_json(band.nodata()));
    attrs.insert("_FillValue".into(), float_to_json(band.nodata()));
    attrs.insert("grid_mapping".into(), json!(CRS));
    attrs.extend(with_role(Role::Band));
    attrs
}

/// Container attributes written at creation: conventions, creation date,
/// spatial extent, then the tile's global attributes verbatim.
pub fn global_attributes(tile: &TileSpec) -> Map<String, Value> {
    let mut attrs = Map::new();
    attrs.insert("Conventions".into(), json!(CONVENTIONS));
    attrs.insert("date_created".into(), json!(Utc::now().to_rfc3339()));

    let bounds = tile.bounds();
    if tile.crs_kind().is_geographic() {
        attrs.insert("geospatial_lat_min".into(), float_to_json(bounds.min_y));
        attrs.insert("geospatial_lat_max".into(), float_to_json(bounds.max_y));
        attrs.insert("geospatial_lat_units".into(), json!("degrees_north"));
        attrs.insert("geospatial_lon_min".into(), float_to_json(bounds.min_x));
        attrs.insert("geospatial_lon_max".into(), float_to_json(bounds.max_x));
        attrs.insert("geospatial_lon_units".into(), json!("degrees_east"));
    }
    if !tile.extent().is_empty() {
        attrs.insert(
            "extent".into(),
            Value::Array(
                tile.extent()
                    .iter()
                    .map(|(x, y)| json!([float_to_json(*x), float_to_json(*y)]))
                    .collect(),
            ),
        );
    }

    attrs.extend(attributes_to_json(tile.global_attrs()));
    attrs
}
