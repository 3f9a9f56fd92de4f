//! Affine pixel-to-ground transform for raster tiles.

use crate::bounds::Bounds;
use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// Six-coefficient affine map in GDAL order.
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * column_rotation + row * pixel_height
/// ```
///
/// `pixel_height` is negative for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    origin_x: f64,
    pixel_width: f64,
    row_rotation: f64,
    origin_y: f64,
    column_rotation: f64,
    pixel_height: f64,
}

impl GeoTransform {
    /// Create a transform, rejecting zero pixel sizes and non-finite terms.
    pub fn new(
        origin_x: f64,
        pixel_width: f64,
        row_rotation: f64,
        origin_y: f64,
        column_rotation: f64,
        pixel_height: f64,
    ) -> ModelResult<Self> {
        let coefficients = [
            origin_x,
            pixel_width,
            row_rotation,
            origin_y,
            column_rotation,
            pixel_height,
        ];
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::invalid_geometry(format!(
                "geotransform coefficients must be finite: {:?}",
                coefficients
            )));
        }
        if pixel_width == 0.0 || pixel_height == 0.0 {
            return Err(ModelError::invalid_geometry(format!(
                "pixel size must be non-zero (width {}, height {})",
                pixel_width, pixel_height
            )));
        }

        Ok(Self {
            origin_x,
            pixel_width,
            row_rotation,
            origin_y,
            column_rotation,
            pixel_height,
        })
    }

    /// Build from a GDAL-ordered coefficient array.
    pub fn from_gdal(gt: [f64; 6]) -> ModelResult<Self> {
        Self::new(gt[0], gt[1], gt[2], gt[3], gt[4], gt[5])
    }

    /// Coefficients in GDAL order.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.column_rotation,
            self.pixel_height,
        ]
    }

    pub fn origin_x(&self) -> f64 {
        self.origin_x
    }

    pub fn origin_y(&self) -> f64 {
        self.origin_y
    }

    pub fn pixel_width(&self) -> f64 {
        self.pixel_width
    }

    pub fn pixel_height(&self) -> f64 {
        self.pixel_height
    }

    pub fn row_rotation(&self) -> f64 {
        self.row_rotation
    }

    pub fn column_rotation(&self) -> f64 {
        self.column_rotation
    }

    /// True when both rotation terms are zero.
    pub fn is_rectilinear(&self) -> bool {
        self.row_rotation == 0.0 && self.column_rotation == 0.0
    }

    /// Apply the full affine map to a pixel edge position.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.column_rotation + row * self.pixel_height,
        )
    }

    /// X coordinate of each column's leading edge.
    ///
    /// The axis has exactly `width` entries and is strictly monotonic in the
    /// sign of `pixel_width`.
    pub fn x_axis(&self, width: usize) -> ModelResult<Vec<f64>> {
        self.require_rectilinear()?;
        Ok(edge_axis(self.origin_x, self.pixel_width, width))
    }

    /// Y coordinate of each row's leading edge.
    pub fn y_axis(&self, height: usize) -> ModelResult<Vec<f64>> {
        self.require_rectilinear()?;
        Ok(edge_axis(self.origin_y, self.pixel_height, height))
    }

    /// Bounds of the full pixel footprint of a `width` x `height` grid.
    pub fn bounds(&self, width: usize, height: usize) -> Bounds {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.pixel_to_geo(0.0, 0.0),
            self.pixel_to_geo(w, 0.0),
            self.pixel_to_geo(0.0, h),
            self.pixel_to_geo(w, h),
        ];
        // Four corners always yield bounds.
        Bounds::from_points(corners).unwrap_or_else(|| Bounds::new(0.0, 0.0, 0.0, 0.0))
    }

    fn require_rectilinear(&self) -> ModelResult<()> {
        if self.is_rectilinear() {
            Ok(())
        } else {
            Err(ModelError::invalid_geometry(format!(
                "rotated grids are not supported (row rotation {}, column rotation {})",
                self.row_rotation, self.column_rotation
            )))
        }
    }
}

fn edge_axis(origin: f64, step: f64, len: usize) -> Vec<f64> {
    (0..len).map(|i| origin + step * i as f64).collect()
}

impl std::fmt::Display for GeoTransform {
    /// Space separated GDAL order, the form GDAL writes into `GeoTransform` attributes.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.column_rotation,
            self.pixel_height
        )
    }
}
