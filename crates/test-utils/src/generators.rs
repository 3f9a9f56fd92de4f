//! Test data generators for creating synthetic raster data.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

use tile_model::RasterArray;

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data is being read/written correctly
/// by checking that grid[row][col] == col * 1000 + row.
///
/// # Returns
///
/// A `Vec<f32>` in row-major order (row 0 first, then row 1, etc.)
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50); // 10 * 5
/// assert_eq!(grid[0], 0.0);   // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);  // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Int16 raster where every cell is `seed * 100 + row * width + col`.
///
/// Different seeds give distinguishable arrays for different bands or
/// timestamps, as long as the grid has fewer than 100 cells per seed step.
pub fn int16_raster(height: usize, width: usize, seed: i16) -> RasterArray {
    let values: Vec<i16> = (0..height * width)
        .map(|i| seed.wrapping_mul(100).wrapping_add(i as i16))
        .collect();
    RasterArray::new(height, width, values).expect("shape matches")
}

/// Float32 raster from [`create_test_grid`] offset by `offset`.
pub fn float32_raster(height: usize, width: usize, offset: f32) -> RasterArray {
    let values: Vec<f32> = create_test_grid(width, height)
        .into_iter()
        .map(|v| v + offset)
        .collect();
    RasterArray::new(height, width, values).expect("shape matches")
}
