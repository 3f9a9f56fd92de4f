//! Spatial tile descriptors.

use crate::attributes::{AttributeValue, Attributes, RESERVED_GLOBAL_KEYS};
use crate::bounds::Bounds;
use crate::crs::CrsKind;
use crate::error::{ModelError, ModelResult};
use crate::geotransform::GeoTransform;
use crate::raster::RasterArray;

/// One rectangular, georeferenced raster grid.
///
/// Produced once by whatever reads the source raster and never mutated
/// afterwards; the writer only derives axes and metadata from it.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSpec {
    projection: String,
    geotransform: GeoTransform,
    height: usize,
    width: usize,
    extent: Vec<(f64, f64)>,
    global_attrs: Attributes,
    data: Option<RasterArray>,
}

impl TileSpec {
    /// Create a tile description. `height` and `width` must be positive.
    pub fn new(
        projection: impl Into<String>,
        geotransform: GeoTransform,
        height: usize,
        width: usize,
        extent: Vec<(f64, f64)>,
    ) -> ModelResult<Self> {
        if height == 0 || width == 0 {
            return Err(ModelError::invalid_geometry(format!(
                "tile must have at least one pixel, got {}x{}",
                height, width
            )));
        }

        Ok(Self {
            projection: projection.into(),
            geotransform,
            height,
            width,
            extent,
            global_attrs: Attributes::new(),
            data: None,
        })
    }

    /// Replace the global attributes copied into the container.
    ///
    /// Keys in [`RESERVED_GLOBAL_KEYS`] belong to the container layout and
    /// are rejected.
    pub fn with_global_attrs<I, K, V>(mut self, attrs: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        let attrs: Attributes = attrs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if let Some(key) = attrs
            .keys()
            .find(|key| RESERVED_GLOBAL_KEYS.contains(&key.as_str()))
        {
            return Err(ModelError::InvalidAttribute {
                key: key.clone(),
                message: "reserved for container bookkeeping".to_string(),
            });
        }
        self.global_attrs = attrs;
        Ok(self)
    }

    /// Attach a payload; its shape must equal (height, width).
    pub fn with_data(mut self, data: RasterArray) -> ModelResult<Self> {
        if data.shape() != self.shape() {
            return Err(ModelError::ShapeMismatch {
                expected: self.shape(),
                found: data.shape(),
            });
        }
        self.data = Some(data);
        Ok(self)
    }

    pub fn projection(&self) -> &str {
        &self.projection
    }

    pub fn geotransform(&self) -> &GeoTransform {
        &self.geotransform
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Shape as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn extent(&self) -> &[(f64, f64)] {
        &self.extent
    }

    pub fn global_attrs(&self) -> &Attributes {
        &self.global_attrs
    }

    pub fn data(&self) -> Option<&RasterArray> {
        self.data.as_ref()
    }

    pub fn crs_kind(&self) -> CrsKind {
        CrsKind::from_projection(&self.projection)
    }

    /// Footprint bounds derived from the geotransform.
    pub fn bounds(&self) -> Bounds {
        self.geotransform.bounds(self.width, self.height)
    }

    /// X coordinate axis (`width` entries).
    pub fn x_axis(&self) -> ModelResult<Vec<f64>> {
        self.geotransform.x_axis(self.width)
    }

    /// Y coordinate axis (`height` entries).
    pub fn y_axis(&self) -> ModelResult<Vec<f64>> {
        self.geotransform.y_axis(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::DType;

    fn tile() -> TileSpec {
        let gt = GeoTransform::new(151.0, 0.25, 0.0, -29.0, 0.0, -0.5).unwrap();
        TileSpec::new("EPSG:4326", gt, 2, 4, vec![(151.0, -29.0), (152.0, -30.0)]).unwrap()
    }

    #[test]
    fn test_zero_size_rejected() {
        let gt = GeoTransform::new(0.0, 1.0, 0.0, 0.0, 0.0, -1.0).unwrap();
        assert!(matches!(
            TileSpec::new("EPSG:4326", gt, 0, 10, vec![]),
            Err(ModelError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_with_data_checks_shape() {
        let ok = tile().with_data(RasterArray::filled(2, 4, DType::Int16, 1.0));
        assert!(ok.unwrap().data().is_some());

        let err = tile().with_data(RasterArray::filled(3, 4, DType::Int16, 1.0));
        assert_eq!(
            err.unwrap_err(),
            ModelError::ShapeMismatch {
                expected: (2, 4),
                found: (3, 4)
            }
        );
    }

    #[test]
    fn test_global_attrs() {
        let tile = tile()
            .with_global_attrs([("test_attribute", "test_value"), ("_source", "scanner")])
            .unwrap();
        assert_eq!(
            tile.global_attrs()["test_attribute"],
            AttributeValue::Text("test_value".into())
        );
        assert_eq!(
            tile.global_attrs()["_source"],
            AttributeValue::Text("scanner".into())
        );
    }

    #[test]
    fn test_reserved_global_attrs_rejected() {
        let err = tile()
            .with_global_attrs([("title", "x"), ("_dimensions", "[]")])
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidAttribute { ref key, .. } if key == "_dimensions"));
    }

    #[test]
    fn test_axes_and_bounds() {
        let tile = tile();
        assert_eq!(tile.x_axis().unwrap(), vec![151.0, 151.25, 151.5, 151.75]);
        assert_eq!(tile.y_axis().unwrap(), vec![-29.0, -29.5]);
        assert_eq!(tile.bounds(), Bounds::new(151.0, -30.0, 152.0, -29.0));
        assert!(tile.crs_kind().is_geographic());
    }
}
