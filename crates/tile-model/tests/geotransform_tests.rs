//! Coordinate axis derivation from geotransforms.

use tile_model::{GeoTransform, ModelError, StorageType};

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

// ============================================================================
// Scenario: 4000 x 2000 WGS84 tile
// ============================================================================

#[test]
fn test_scenario_x_axis() {
    let gt = GeoTransform::from_gdal([151.0, 0.00025, 0.0, -29.0, 0.0, -0.0005]).unwrap();
    let x = gt.x_axis(4000).unwrap();

    assert_eq!(x.len(), 4000);
    assert_eq!(x[0], 151.0);
    assert_close(x[3999], 151.99975);
}

#[test]
fn test_scenario_y_axis() {
    let gt = GeoTransform::from_gdal([151.0, 0.00025, 0.0, -29.0, 0.0, -0.0005]).unwrap();
    let y = gt.y_axis(2000).unwrap();

    assert_eq!(y.len(), 2000);
    assert_eq!(y[0], -29.0);
    assert_close(y[1999], -29.9995);
}

// ============================================================================
// Monotonicity
// ============================================================================

#[test]
fn test_positive_pixel_width_increasing() {
    for (origin, step, len) in [(0.0, 1.0, 10), (-180.0, 0.25, 1440), (500000.0, 25.0, 4000)] {
        let gt = GeoTransform::new(origin, step, 0.0, 0.0, 0.0, -1.0).unwrap();
        let x = gt.x_axis(len).unwrap();
        assert_eq!(x.len(), len);
        assert_eq!(x[0], origin);
        assert_close(x[len - 1], origin + step * (len - 1) as f64);
        assert!(x.windows(2).all(|w| w[1] > w[0]));
    }
}

#[test]
fn test_negative_pixel_height_decreasing() {
    for (origin, step, len) in [(90.0, -0.25, 721), (-29.0, -0.0005, 2000), (10.0, -3.0, 2)] {
        let gt = GeoTransform::new(0.0, 1.0, 0.0, origin, 0.0, step).unwrap();
        let y = gt.y_axis(len).unwrap();
        assert_eq!(y.len(), len);
        assert_eq!(y[0], origin);
        assert_close(y[len - 1], origin + step * (len - 1) as f64);
        assert!(y.windows(2).all(|w| w[1] < w[0]));
    }
}

#[test]
fn test_south_up_y_increasing() {
    let gt = GeoTransform::new(0.0, 1.0, 0.0, -90.0, 0.0, 0.5).unwrap();
    let y = gt.y_axis(5).unwrap();
    assert_eq!(y, vec![-90.0, -89.5, -89.0, -88.5, -88.0]);
}

// ============================================================================
// Rejections
// ============================================================================

#[test]
fn test_rotated_grid_is_invalid_geometry() {
    let gt = GeoTransform::new(0.0, 1.0, 0.0, 0.0, 0.2, -1.0).unwrap();
    assert!(matches!(gt.y_axis(3), Err(ModelError::InvalidGeometry(_))));

    // The full affine map still applies
    let (x, y) = gt.pixel_to_geo(1.0, 1.0);
    assert_close(x, 1.0);
    assert_close(y, -0.8);
}

#[test]
fn test_storage_type_from_yaml() {
    let doc = r#"
driver_name: zarr
name: ls5_nbar_albers
description: Landsat 5 NBAR in 100x100 chunks
storage_spec:
  chunking: {t: 1, y: 100, x: 100}
  compression: blosc_lz4
  compression_level: 3
"#;
    let st: StorageType = serde_yaml::from_str(doc).unwrap();
    st.validate().unwrap();
    assert_eq!(st.chunking()["t"], 1);
    assert_eq!(st.storage_spec.options["compression_level"], 3);
}
