//! Coordinate Reference System classification.
//!
//! The store keeps the projection string verbatim; this module only
//! classifies it far enough to pick CF axis names and units.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad CRS family, decided from the projection descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsKind {
    /// Lat/lon in degrees
    Geographic,
    /// Easting/northing in linear units
    Projected,
}

impl CrsKind {
    /// Classify a projection descriptor.
    ///
    /// Accepts WKT1 (`GEOGCS[...]`, `PROJCS[...]`), WKT2 (`GEOGCRS[...]`,
    /// `PROJCRS[...]`) and a handful of authority codes. Anything not
    /// recognisably geographic is treated as projected.
    pub fn from_projection(projection: &str) -> Self {
        let normalized = projection.trim_start().to_uppercase();

        if normalized.starts_with("PROJCS") || normalized.starts_with("PROJCRS") {
            return CrsKind::Projected;
        }

        if normalized.starts_with("GEOGCS")
            || normalized.starts_with("GEOGCRS")
            || normalized.starts_with("GEODCRS")
        {
            return CrsKind::Geographic;
        }

        match normalized.as_str() {
            "EPSG:4326" | "CRS:84" | "EPSG:4269" | "EPSG:4283" | "EPSG:7844" => {
                CrsKind::Geographic
            }
            _ if normalized.starts_with("+PROJ=LONGLAT") || normalized.starts_with("+PROJ=LATLONG") => {
                CrsKind::Geographic
            }
            _ => CrsKind::Projected,
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsKind::Geographic)
    }

    /// CF axis description for the x (column) dimension.
    pub fn x_axis(&self) -> AxisSpec {
        match self {
            CrsKind::Geographic => AxisSpec {
                name: "longitude",
                standard_name: "longitude",
                long_name: "longitude",
                units: "degrees_east",
                axis: "X",
            },
            CrsKind::Projected => AxisSpec {
                name: "x",
                standard_name: "projection_x_coordinate",
                long_name: "x coordinate of projection",
                units: "m",
                axis: "X",
            },
        }
    }

    /// CF axis description for the y (row) dimension.
    pub fn y_axis(&self) -> AxisSpec {
        match self {
            CrsKind::Geographic => AxisSpec {
                name: "latitude",
                standard_name: "latitude",
                long_name: "latitude",
                units: "degrees_north",
                axis: "Y",
            },
            CrsKind::Projected => AxisSpec {
                name: "y",
                standard_name: "projection_y_coordinate",
                long_name: "y coordinate of projection",
                units: "m",
                axis: "Y",
            },
        }
    }
}

impl fmt::Display for CrsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsKind::Geographic => write!(f, "geographic"),
            CrsKind::Projected => write!(f, "projected"),
        }
    }
}

/// Name and CF attributes of a spatial coordinate variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSpec {
    pub name: &'static str,
    pub standard_name: &'static str,
    pub long_name: &'static str,
    pub units: &'static str,
    pub axis: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    const WGS84: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]]"#;
    const ALBERS: &str = r#"PROJCS["GDA94 / Australian Albers",GEOGCS["GDA94",DATUM["Geocentric_Datum_of_Australia_1994",SPHEROID["GRS 1980",6378137,298.257222101]]],PROJECTION["Albers_Conic_Equal_Area"],UNIT["metre",1]]"#;

    #[test]
    fn test_classify_wkt() {
        assert_eq!(CrsKind::from_projection(WGS84), CrsKind::Geographic);
        assert_eq!(CrsKind::from_projection(ALBERS), CrsKind::Projected);
        assert_eq!(
            CrsKind::from_projection("GEOGCRS[\"WGS 84\"]"),
            CrsKind::Geographic
        );
    }

    #[test]
    fn test_classify_codes() {
        assert!(CrsKind::from_projection("epsg:4326").is_geographic());
        assert!(CrsKind::from_projection("+proj=longlat +datum=WGS84").is_geographic());
        assert!(!CrsKind::from_projection("EPSG:3577").is_geographic());
    }

    #[test]
    fn test_axis_names() {
        assert_eq!(CrsKind::Geographic.x_axis().name, "longitude");
        assert_eq!(CrsKind::Geographic.y_axis().name, "latitude");
        assert_eq!(CrsKind::Projected.x_axis().name, "x");
        assert_eq!(CrsKind::Projected.y_axis().units, "m");
    }
}
