//! Axis-aligned bounds of a tile footprint.

use serde::{Deserialize, Serialize};

/// Bounds in the tile's native CRS units (degrees or meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Create new bounds from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest bounds containing every point.
    ///
    /// Returns `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let mut bounds = Self::new(x0, y0, x0, y0);
        for (x, y) in iter {
            bounds.min_x = bounds.min_x.min(x);
            bounds.min_y = bounds.min_y.min(y);
            bounds.max_x = bounds.max_x.max(x);
            bounds.max_y = bounds.max_y.max(y);
        }
        Some(bounds)
    }

    /// Width in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if a point is contained within these bounds.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let bounds = Bounds::from_points(vec![(151.0, -29.0), (152.0, -30.0), (151.5, -29.5)])
            .unwrap();
        assert_eq!(bounds.min_x, 151.0);
        assert_eq!(bounds.min_y, -30.0);
        assert_eq!(bounds.max_x, 152.0);
        assert_eq!(bounds.max_y, -29.0);
        assert!(bounds.contains_point(151.2, -29.9));
        assert!(!bounds.contains_point(150.0, -29.9));
    }

    #[test]
    fn test_from_no_points() {
        assert!(Bounds::from_points(Vec::new()).is_none());
    }
}
