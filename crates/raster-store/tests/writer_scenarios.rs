//! Writer behaviour on shared timestamps, repeated bands and invalid input.

use chrono::Duration;
use raster_store::{ContainerReader, StoreError, WriterHandle};
use test_utils::{
    date, float32_band, int16_band, int16_raster, small_tile, temp_container, zarr_storage_type,
};
use tile_model::time::quantize;
use tile_model::{BandDescriptor, DType, GeoTransform, RasterArray, TileSpec};

// ============================================================================
// Scenario: two bands, one timestamp
// ============================================================================

#[test]
fn test_two_bands_share_time_slot() {
    let (_temp_dir, path) = temp_container("two_bands.zarr");
    let tile = small_tile(2, 3);
    let storage = zarr_storage_type(&[]);
    let b1_data = int16_raster(2, 3, 1);
    let b2_data = int16_raster(2, 3, 2);

    let mut writer = WriterHandle::create_or_open(&path, &tile, &storage).unwrap();
    let b1 = writer.ensure_band(&int16_band("B1"), storage.chunking()).unwrap();
    assert_eq!(writer.append(&b1, date(2008, 1, 1), &b1_data).unwrap(), 0);
    let b2 = writer.ensure_band(&int16_band("B2"), storage.chunking()).unwrap();
    assert_eq!(writer.append(&b2, date(2008, 1, 1), &b2_data).unwrap(), 0);
    assert_eq!(writer.time_len(), 1);
    writer.close().unwrap();

    let reader = ContainerReader::open(&path).unwrap();
    assert_eq!(reader.time_axis(), vec![date(2008, 1, 1)]);
    assert_eq!(reader.band_names().unwrap(), vec!["B1", "B2"]);
    assert_eq!(reader.read_band("B1", date(2008, 1, 1)).unwrap().unwrap(), b1_data);
    assert_eq!(reader.read_band("B2", date(2008, 1, 1)).unwrap().unwrap(), b2_data);
}

// ============================================================================
// Scenario: repeated ensure_band
// ============================================================================

#[test]
fn test_ensure_band_twice_returns_same_handle() {
    let (_temp_dir, path) = temp_container("ensure.zarr");
    let tile = small_tile(2, 3);
    let storage = zarr_storage_type(&[]);

    let mut writer = WriterHandle::create_or_open(&path, &tile, &storage).unwrap();
    let first = writer.ensure_band(&int16_band("B1"), storage.chunking()).unwrap();
    let second = writer.ensure_band(&int16_band("B1"), storage.chunking()).unwrap();
    assert_eq!(first, second);
    assert_eq!(writer.band_names().unwrap(), vec!["B1"]);
    writer.close().unwrap();

    let reader = ContainerReader::open(&path).unwrap();
    assert_eq!(reader.band_names().unwrap(), vec!["B1"]);
}

#[test]
fn test_nan_nodata_is_compatible_with_itself() {
    let (_temp_dir, path) = temp_container("nan.zarr");
    let tile = small_tile(2, 2);
    let storage = zarr_storage_type(&[]);

    let mut writer = WriterHandle::create_or_open(&path, &tile, &storage).unwrap();
    writer.ensure_band(&float32_band("lst"), storage.chunking()).unwrap();
    writer.close().unwrap();

    // Survives a reopen, where nodata comes back from stored metadata
    let mut writer = WriterHandle::create_or_open(&path, &tile, &storage).unwrap();
    let handle = writer.ensure_band(&float32_band("lst"), storage.chunking()).unwrap();
    assert!(handle.nodata().is_nan());
    writer.close().unwrap();
}

#[test]
fn test_band_type_mismatch() {
    let (_temp_dir, path) = temp_container("mismatch.zarr");
    let tile = small_tile(2, 3);
    let storage = zarr_storage_type(&[]);

    let mut writer = WriterHandle::create_or_open(&path, &tile, &storage).unwrap();
    writer.ensure_band(&int16_band("B1"), storage.chunking()).unwrap();

    let other_dtype = BandDescriptor::new("B1", DType::Float32, -999.0).unwrap();
    assert!(matches!(
        writer.ensure_band(&other_dtype, storage.chunking()),
        Err(StoreError::BandTypeMismatch { .. })
    ));

    let other_nodata = BandDescriptor::new("B1", DType::Int16, 0.0).unwrap();
    assert!(matches!(
        writer.ensure_band(&other_nodata, storage.chunking()),
        Err(StoreError::BandTypeMismatch { .. })
    ));
    writer.close().unwrap();

    // Also detected against a reopened container
    let mut writer = WriterHandle::create_or_open(&path, &tile, &storage).unwrap();
    assert!(matches!(
        writer.ensure_band(&other_dtype, storage.chunking()),
        Err(StoreError::BandTypeMismatch { .. })
    ));
    writer.close().unwrap();
}

// ============================================================================
// Scenario: wrong array shape
// ============================================================================

#[test]
fn test_shape_mismatch_leaves_time_axis_alone() {
    let (_temp_dir, path) = temp_container("shape.zarr");
    let tile = small_tile(2, 3);
    let storage = zarr_storage_type(&[]);

    let mut writer = WriterHandle::create_or_open(&path, &tile, &storage).unwrap();
    let band = writer.ensure_band(&int16_band("B1"), storage.chunking()).unwrap();
    let too_tall = int16_raster(3, 3, 1);

    let err = writer.append(&band, date(2008, 1, 1), &too_tall).unwrap_err();
    assert!(matches!(
        err,
        StoreError::ShapeMismatch {
            expected: (2, 3),
            found: (3, 3)
        }
    ));
    assert_eq!(writer.time_len(), 0);

    // A corrected retry succeeds
    assert_eq!(
        writer
            .append(&band, date(2008, 1, 1), &int16_raster(2, 3, 1))
            .unwrap(),
        0
    );
    writer.close().unwrap();

    let reader = ContainerReader::open(&path).unwrap();
    assert_eq!(reader.band_names().unwrap(), vec!["B1"]);
    assert_eq!(reader.time_axis(), vec![date(2008, 1, 1)]);
}

#[test]
fn test_shape_mismatch_on_fresh_band_keeps_band() {
    let (_temp_dir, path) = temp_container("shape_fresh.zarr");
    let tile = small_tile(2, 3);
    let storage = zarr_storage_type(&[]);

    let mut writer = WriterHandle::create_or_open(&path, &tile, &storage).unwrap();
    let band = writer.ensure_band(&int16_band("B1"), storage.chunking()).unwrap();
    assert!(writer
        .append(&band, date(2008, 1, 1), &int16_raster(3, 3, 1))
        .is_err());
    writer.close().unwrap();

    let reader = ContainerReader::open(&path).unwrap();
    assert_eq!(reader.band_names().unwrap(), vec!["B1"]);
    assert!(reader.time_axis().is_empty());
    assert!(reader.read_band("B1", date(2008, 1, 1)).unwrap().is_none());
}

// ============================================================================
// Scenario: reopen with different geometry
// ============================================================================

#[test]
fn test_reopen_with_other_width_is_spatial_mismatch() {
    let (_temp_dir, path) = temp_container("spatial.zarr");
    let storage = zarr_storage_type(&[]);

    let mut writer = WriterHandle::create_or_open(&path, &small_tile(2, 3), &storage).unwrap();
    writer.close().unwrap();

    let err = WriterHandle::create_or_open(&path, &small_tile(2, 4), &storage).unwrap_err();
    assert!(matches!(
        err,
        StoreError::SpatialMismatch { field: "width", .. }
    ));

    let reader = ContainerReader::open(&path).unwrap();
    assert_eq!(reader.shape().unwrap(), (2, 3));
    assert_eq!(reader.x_axis().unwrap().len(), 3);
}

#[test]
fn test_reopen_with_other_projection_or_origin() {
    let (_temp_dir, path) = temp_container("spatial2.zarr");
    let storage = zarr_storage_type(&[]);
    let tile = small_tile(2, 3);

    let mut writer = WriterHandle::create_or_open(&path, &tile, &storage).unwrap();
    writer.close().unwrap();

    let reprojected = TileSpec::new("EPSG:3577", *tile.geotransform(), 2, 3, Vec::new()).unwrap();
    assert!(matches!(
        WriterHandle::create_or_open(&path, &reprojected, &storage),
        Err(StoreError::SpatialMismatch { field: "projection", .. })
    ));

    let shifted_gt = GeoTransform::from_gdal([152.0, 0.25, 0.0, -29.0, 0.0, -0.5]).unwrap();
    let shifted = TileSpec::new(tile.projection(), shifted_gt, 2, 3, Vec::new()).unwrap();
    assert!(matches!(
        WriterHandle::create_or_open(&path, &shifted, &storage),
        Err(StoreError::SpatialMismatch { field: "geotransform", .. })
    ));
}

// ============================================================================
// Rejections
// ============================================================================

#[test]
fn test_rotated_tile_creates_nothing() {
    let (_temp_dir, path) = temp_container("rotated.zarr");
    let gt = GeoTransform::new(0.0, 1.0, 0.1, 0.0, 0.0, -1.0).unwrap();
    let tile = TileSpec::new(test_utils::projection::WGS84_WKT, gt, 2, 2, Vec::new()).unwrap();

    let err = WriterHandle::create_or_open(&path, &tile, &zarr_storage_type(&[])).unwrap_err();
    assert!(matches!(err, StoreError::InvalidGeometry(_)));
    assert!(!path.exists());
}

#[test]
fn test_empty_projection_is_invalid_geometry() {
    let (_temp_dir, path) = temp_container("noproj.zarr");
    let tile = TileSpec::new("", *small_tile(2, 2).geotransform(), 2, 2, Vec::new()).unwrap();

    let err = WriterHandle::create_or_open(&path, &tile, &zarr_storage_type(&[])).unwrap_err();
    assert!(matches!(err, StoreError::InvalidGeometry(_)));
    assert!(!path.exists());
}

#[test]
fn test_unsupported_driver() {
    let (_temp_dir, path) = temp_container("gtiff.zarr");
    let mut storage = zarr_storage_type(&[]);
    storage.driver_name = "GTiff".to_string();

    let err = WriterHandle::create_or_open(&path, &small_tile(2, 2), &storage).unwrap_err();
    assert!(matches!(err, StoreError::UnsupportedDriver(_)));
}

// ============================================================================
// Value conversion and time resolution
// ============================================================================

#[test]
fn test_unrepresentable_values_stored_as_nodata() {
    let (_temp_dir, path) = temp_container("convert.zarr");
    let tile = small_tile(2, 3);
    let storage = zarr_storage_type(&[]);
    let input = RasterArray::new(2, 3, vec![f64::NAN, 1.0, 2.0, 1e9, -1e9, 5.0]).unwrap();

    let mut writer = WriterHandle::create_or_open(&path, &tile, &storage).unwrap();
    let band = writer.ensure_band(&int16_band("B1"), storage.chunking()).unwrap();
    writer.append(&band, date(2008, 1, 1), &input).unwrap();
    writer.close().unwrap();

    let stored = ContainerReader::open(&path)
        .unwrap()
        .read_band("B1", date(2008, 1, 1))
        .unwrap()
        .unwrap();
    assert_eq!(stored.dtype(), DType::Int16);
    assert_eq!(stored.to_f64_vec(), vec![-999.0, 1.0, 2.0, -999.0, -999.0, 5.0]);
}

#[test]
fn test_sub_microsecond_timestamps_share_slot() {
    let (_temp_dir, path) = temp_container("micros.zarr");
    let tile = small_tile(2, 3);
    let storage = zarr_storage_type(&[]);
    let t = date(2008, 1, 1) + Duration::nanoseconds(123_456_789);

    let mut writer = WriterHandle::create_or_open(&path, &tile, &storage).unwrap();
    let b1 = writer.ensure_band(&int16_band("B1"), storage.chunking()).unwrap();
    let b2 = writer.ensure_band(&int16_band("B2"), storage.chunking()).unwrap();
    assert_eq!(writer.append(&b1, t, &int16_raster(2, 3, 1)).unwrap(), 0);
    assert_eq!(
        writer.append(&b2, t + Duration::nanoseconds(50), &int16_raster(2, 3, 2)).unwrap(),
        0
    );
    assert_eq!(
        writer.append(&b1, t + Duration::microseconds(1), &int16_raster(2, 3, 3)).unwrap(),
        1
    );
    writer.close().unwrap();

    let reader = ContainerReader::open(&path).unwrap();
    assert_eq!(
        reader.time_axis(),
        vec![quantize(t), quantize(t + Duration::microseconds(1))]
    );
    assert_eq!(
        reader.read_band("B2", t).unwrap().unwrap(),
        int16_raster(2, 3, 2)
    );
}

#[test]
fn test_underscore_global_attributes_survive() {
    let (_temp_dir, path) = temp_container("attrs.zarr");
    let tile = small_tile(2, 2)
        .with_global_attrs([("_source", "scene-042")])
        .unwrap();
    let storage = zarr_storage_type(&[]);

    let mut writer = WriterHandle::create_or_open(&path, &tile, &storage).unwrap();
    writer.ensure_band(&int16_band("B1"), storage.chunking()).unwrap();
    writer.close().unwrap();

    let attrs = ContainerReader::open(&path).unwrap().global_attributes().unwrap();
    assert_eq!(attrs.get("_source"), Some(&serde_json::json!("scene-042")));
    assert!(!attrs.contains_key("_dimensions"));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_use_after_close() {
    let (_temp_dir, path) = temp_container("closed.zarr");
    let tile = small_tile(2, 2);
    let storage = zarr_storage_type(&[]);

    let mut writer = WriterHandle::create_or_open(&path, &tile, &storage).unwrap();
    let band = writer.ensure_band(&int16_band("B1"), storage.chunking()).unwrap();
    writer.close().unwrap();
    assert!(writer.is_closed());

    assert!(matches!(writer.close(), Err(StoreError::UseAfterClose(_))));
    assert!(matches!(
        writer.ensure_band(&int16_band("B2"), storage.chunking()),
        Err(StoreError::UseAfterClose(_))
    ));
    assert!(matches!(
        writer.append(&band, date(2008, 1, 1), &RasterArray::filled(2, 2, DType::Int16, 1.0)),
        Err(StoreError::UseAfterClose(_))
    ));
    assert!(matches!(
        writer.read_band(&band, date(2008, 1, 1)),
        Err(StoreError::UseAfterClose(_))
    ));
    assert!(matches!(writer.time_axis(), Err(StoreError::UseAfterClose(_))));
}
