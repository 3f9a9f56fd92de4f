//! Common test fixtures for tilestore tests.
//!
//! This module provides pre-defined tiles, bands and storage types that
//! represent common ingestion scenarios.

use chrono::{DateTime, TimeZone, Utc};
use tile_model::{BandDescriptor, DType, GeoTransform, StorageSpec, StorageType, TileSpec};

/// Common projection strings for testing.
pub mod projection {
    /// WGS 84 geographic, WKT1.
    pub const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

    /// GDA94 / Australian Albers, WKT1.
    pub const ALBERS_WKT: &str = r#"PROJCS["GDA94 / Australian Albers",GEOGCS["GDA94",DATUM["Geocentric_Datum_of_Australia_1994",SPHEROID["GRS 1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]],PROJECTION["Albers_Conic_Equal_Area"],PARAMETER["standard_parallel_1",-18],PARAMETER["standard_parallel_2",-36],PARAMETER["latitude_of_center",0],PARAMETER["longitude_of_center",132],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1],AUTHORITY["EPSG","3577"]]"#;
}

/// Geotransform of the 4000 x 2000 WGS84 tile with its origin at 151E, 29S.
pub fn scenario_geotransform() -> GeoTransform {
    GeoTransform::from_gdal([151.0, 0.00025, 0.0, -29.0, 0.0, -0.0005])
        .expect("valid geotransform")
}

/// Full-size WGS84 tile without payload.
pub fn scenario_tile() -> TileSpec {
    TileSpec::new(
        projection::WGS84_WKT,
        scenario_geotransform(),
        2000,
        4000,
        vec![(151.0, -29.0), (152.0, -29.0), (152.0, -30.0), (151.0, -30.0)],
    )
    .expect("valid tile")
}

/// Small WGS84 tile with the scenario origin, `height` x `width` pixels.
pub fn small_tile(height: usize, width: usize) -> TileSpec {
    TileSpec::new(
        projection::WGS84_WKT,
        GeoTransform::from_gdal([151.0, 0.25, 0.0, -29.0, 0.0, -0.5]).expect("valid geotransform"),
        height,
        width,
        Vec::new(),
    )
    .expect("valid tile")
    .with_global_attrs([("title", "Test tile"), ("source", "test-utils")])
    .expect("valid attributes")
}

/// Small projected tile on a 25 m Albers grid.
pub fn albers_tile(height: usize, width: usize) -> TileSpec {
    TileSpec::new(
        projection::ALBERS_WKT,
        GeoTransform::from_gdal([1_500_000.0, 25.0, 0.0, -3_900_000.0, 0.0, -25.0])
            .expect("valid geotransform"),
        height,
        width,
        Vec::new(),
    )
    .expect("valid tile")
}

/// An int16 band with nodata -999.
pub fn int16_band(name: &str) -> BandDescriptor {
    BandDescriptor::new(name, DType::Int16, -999.0)
        .expect("valid band")
        .with_units("1")
}

/// A float32 band with NaN nodata.
pub fn float32_band(name: &str) -> BandDescriptor {
    BandDescriptor::new(name, DType::Float32, f64::NAN)
        .expect("valid band")
        .with_units("K")
}

/// Zarr storage type with the given `(axis, chunk length)` entries.
pub fn zarr_storage_type(chunking: &[(&str, u64)]) -> StorageType {
    StorageType::new(
        "zarr",
        "test_storage",
        "Storage type for tests",
        StorageSpec::with_chunking(chunking.iter().map(|(axis, len)| (*axis, *len))),
    )
}

/// Midnight UTC on the given date.
pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("valid date")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_model::CrsKind;

    #[test]
    fn test_fixture_crs_kinds() {
        assert_eq!(scenario_tile().crs_kind(), CrsKind::Geographic);
        assert_eq!(albers_tile(2, 2).crs_kind(), CrsKind::Projected);
    }

    #[test]
    fn test_zarr_storage_type_is_valid() {
        let st = zarr_storage_type(&[("t", 1), ("y", 100), ("x", 100)]);
        st.validate().unwrap();
        assert_eq!(st.chunking()["y"], 100);
    }
}
