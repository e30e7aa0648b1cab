use nalgebra::Point2;

use crate::{math::Extent, CoreError, CoreResult};

/// North-up affine transform mapping (row, col) cell indices to map coordinates. Row 0 is the top row of the
/// grid, so y decreases with increasing row index
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoTransform {
    origin: Point2<f64>,
    resolution: f64,
}

impl GeoTransform {
    /// Creates a new transform with the top-left corner of cell (0, 0) at `origin` and square cells of size
    /// `resolution`
    pub fn new(origin: Point2<f64>, resolution: f64) -> CoreResult<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(CoreError::InvalidResolution(resolution));
        }
        Ok(Self { origin, resolution })
    }

    /// Top-left corner of cell (0, 0)
    pub fn origin(&self) -> &Point2<f64> {
        &self.origin
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Returns the (possibly negative or out of range) cell containing the given position. Cells include
    /// their left and top edges
    /// ```
    /// # use lascat_core::raster::GeoTransform;
    /// # use lascat_core::nalgebra::Point2;
    /// let transform = GeoTransform::new(Point2::new(100.0, 200.0), 10.0).unwrap();
    /// assert_eq!(transform.cell_of(105.0, 195.0), (0, 0));
    /// assert_eq!(transform.cell_of(110.0, 180.0), (2, 1));
    /// assert_eq!(transform.cell_of(95.0, 205.0), (-1, -1));
    /// ```
    pub fn cell_of(&self, x: f64, y: f64) -> (i64, i64) {
        let col = ((x - self.origin.x) / self.resolution).floor() as i64;
        let row = ((self.origin.y - y) / self.resolution).floor() as i64;
        (row, col)
    }

    /// Map coordinates of the center of the given cell
    pub fn cell_center(&self, row: i64, col: i64) -> Point2<f64> {
        Point2::new(
            self.origin.x + (col as f64 + 0.5) * self.resolution,
            self.origin.y - (row as f64 + 0.5) * self.resolution,
        )
    }

    /// Area covered by the block of `rows` × `cols` cells starting at cell (0, 0)
    pub fn extent_of(&self, rows: usize, cols: usize) -> Extent {
        Extent::from_min_max_unchecked(
            Point2::new(self.origin.x, self.origin.y - rows as f64 * self.resolution),
            Point2::new(self.origin.x + cols as f64 * self.resolution, self.origin.y),
        )
    }

    /// Returns a transform with the same resolution whose cell (0, 0) is cell (`row`, `col`) of this transform
    pub fn shifted(&self, row: i64, col: i64) -> Self {
        Self {
            origin: Point2::new(
                self.origin.x + col as f64 * self.resolution,
                self.origin.y - row as f64 * self.resolution,
            ),
            resolution: self.resolution,
        }
    }

    /// Computes the cell offset of `other`'s cell (0, 0) within this transform. Returns `None` if the two
    /// transforms do not share the same resolution or `other` is not aligned to the cell boundaries of this
    /// transform
    pub fn offset_of(&self, other: &GeoTransform) -> Option<(i64, i64)> {
        let tolerance = self.resolution * 1e-6;
        if (self.resolution - other.resolution).abs() > tolerance {
            return None;
        }
        let col = (other.origin.x - self.origin.x) / self.resolution;
        let row = (self.origin.y - other.origin.y) / self.resolution;
        let aligned = (col - col.round()).abs() * self.resolution <= tolerance
            && (row - row.round()).abs() * self.resolution <= tolerance;
        if !aligned {
            return None;
        }
        Some((row.round() as i64, col.round() as i64))
    }
}
