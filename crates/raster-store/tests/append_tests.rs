//! One-shot appends through append_to_container.

use raster_store::{append_to_container, AppendResult, ContainerReader, StoreError};
use test_utils::{
    date, int16_band, int16_raster, small_tile, temp_container, zarr_storage_type,
};
use tile_model::{BandDescriptor, DType};

#[test]
fn test_append_creates_container() {
    let (_temp_dir, path) = temp_container("orchestrated.zarr");
    let data = int16_raster(2, 3, 3);
    let tile = small_tile(2, 3).with_data(data.clone()).unwrap();
    let storage = zarr_storage_type(&[("t", 1), ("y", 2), ("x", 3)]);

    let result =
        append_to_container(&tile, &path, &storage, &int16_band("B1"), date(2008, 1, 1)).unwrap();
    assert_eq!(
        result,
        AppendResult {
            time_index: 0,
            time_len: 1,
            container_created: true,
            band_created: true,
        }
    );

    let reader = ContainerReader::open(&path).unwrap();
    assert_eq!(reader.read_band("B1", date(2008, 1, 1)).unwrap().unwrap(), data);
}

#[test]
fn test_repeated_appends_extend_container() {
    let (_temp_dir, path) = temp_container("orchestrated.zarr");
    let storage = zarr_storage_type(&[]);
    let dates = [date(2008, 1, 1), date(2008, 1, 17), date(2008, 2, 2)];

    for (i, when) in dates.iter().enumerate() {
        for (band, seed) in [("B1", 0), ("B2", 50)] {
            let tile = small_tile(2, 3)
                .with_data(int16_raster(2, 3, seed + i as i16))
                .unwrap();
            let result =
                append_to_container(&tile, &path, &storage, &int16_band(band), *when).unwrap();
            assert_eq!(result.time_index, i);
            assert_eq!(result.time_len, i + 1);
            assert_eq!(result.container_created, i == 0 && band == "B1");
            assert_eq!(result.band_created, i == 0);
        }
    }

    let reader = ContainerReader::open(&path).unwrap();
    assert_eq!(reader.time_axis(), dates.to_vec());
    assert_eq!(reader.band_names().unwrap(), vec!["B1", "B2"]);
    assert_eq!(
        reader.read_band("B2", dates[1]).unwrap().unwrap(),
        int16_raster(2, 3, 51)
    );
}

#[test]
fn test_append_same_timestamp_is_idempotent() {
    let (_temp_dir, path) = temp_container("idempotent.zarr");
    let storage = zarr_storage_type(&[]);
    let tile = small_tile(2, 3).with_data(int16_raster(2, 3, 1)).unwrap();

    let first =
        append_to_container(&tile, &path, &storage, &int16_band("B1"), date(2008, 1, 1)).unwrap();
    let second =
        append_to_container(&tile, &path, &storage, &int16_band("B1"), date(2008, 1, 1)).unwrap();

    assert_eq!(first.time_index, second.time_index);
    assert_eq!(second.time_len, 1);
    assert!(!second.container_created);
    assert!(!second.band_created);
}

#[test]
fn test_missing_data() {
    let (_temp_dir, path) = temp_container("nodata.zarr");
    let err = append_to_container(
        &small_tile(2, 3),
        &path,
        &zarr_storage_type(&[]),
        &int16_band("B1"),
        date(2008, 1, 1),
    )
    .unwrap_err();

    assert!(matches!(err, StoreError::MissingData(_)));
    assert!(!path.exists());
}

#[test]
fn test_failed_append_leaves_container_usable() {
    let (_temp_dir, path) = temp_container("failure.zarr");
    let storage = zarr_storage_type(&[]);
    let tile = small_tile(2, 3).with_data(int16_raster(2, 3, 1)).unwrap();
    append_to_container(&tile, &path, &storage, &int16_band("B1"), date(2008, 1, 1)).unwrap();

    // Same name, different dtype
    let conflicting = BandDescriptor::new("B1", DType::Float64, -999.0).unwrap();
    let err =
        append_to_container(&tile, &path, &storage, &conflicting, date(2008, 2, 1)).unwrap_err();
    assert!(matches!(err, StoreError::BandTypeMismatch { .. }));

    // Nothing grew and a corrected retry succeeds
    let reader = ContainerReader::open(&path).unwrap();
    assert_eq!(reader.time_axis(), vec![date(2008, 1, 1)]);

    let retry =
        append_to_container(&tile, &path, &storage, &int16_band("B1"), date(2008, 2, 1)).unwrap();
    assert_eq!(retry.time_index, 1);
}

#[test]
fn test_append_with_mismatched_tile() {
    let (_temp_dir, path) = temp_container("mismatch.zarr");
    let storage = zarr_storage_type(&[]);
    let tile = small_tile(2, 3).with_data(int16_raster(2, 3, 1)).unwrap();
    append_to_container(&tile, &path, &storage, &int16_band("B1"), date(2008, 1, 1)).unwrap();

    let wider = small_tile(2, 4).with_data(int16_raster(2, 4, 1)).unwrap();
    let err = append_to_container(&wider, &path, &storage, &int16_band("B1"), date(2008, 2, 1))
        .unwrap_err();
    assert!(matches!(err, StoreError::SpatialMismatch { .. }));
}
