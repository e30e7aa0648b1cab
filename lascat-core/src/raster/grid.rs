use nalgebra::Point2;

use crate::{math::Extent, CoreResult};

use super::GeoTransform;

/// Default no-data sentinel of raster products
pub const DEFAULT_NODATA: f64 = -9999.0;

/// A 2D grid of cell values stored in row-major order, georeferenced through a [GeoTransform]. Cells that
/// carry no value hold the `nodata` sentinel
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    transform: GeoTransform,
    rows: usize,
    cols: usize,
    nodata: f64,
    data: Vec<f64>,
}

impl RasterGrid {
    /// Creates a new grid of `rows` × `cols` cells, all set to `nodata`
    pub fn new(transform: GeoTransform, rows: usize, cols: usize, nodata: f64) -> Self {
        Self {
            transform,
            rows,
            cols,
            nodata,
            data: vec![nodata; rows * cols],
        }
    }

    /// Creates the smallest grid with cells of size `resolution` whose top-left corner is the top-left corner of
    /// `extent` and that fully covers `extent`. The grid has at least one row and one column
    /// ```
    /// # use lascat_core::math::Extent;
    /// # use lascat_core::raster::{RasterGrid, DEFAULT_NODATA};
    /// let extent = Extent::new(0.0, 0.0, 10.0, 4.5).unwrap();
    /// let grid = RasterGrid::covering(&extent, 2.0, DEFAULT_NODATA).unwrap();
    /// assert_eq!((grid.rows(), grid.cols()), (3, 5));
    /// ```
    pub fn covering(extent: &Extent, resolution: f64, nodata: f64) -> CoreResult<Self> {
        let transform = GeoTransform::new(Point2::new(extent.xmin(), extent.ymax()), resolution)?;
        let cols = ((extent.width() / resolution).ceil() as usize).max(1);
        let rows = ((extent.height() / resolution).ceil() as usize).max(1);
        Ok(Self::new(transform, rows, cols, nodata))
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn nodata(&self) -> f64 {
        self.nodata
    }

    pub fn resolution(&self) -> f64 {
        self.transform.resolution()
    }

    /// Area covered by all cells of this grid
    pub fn extent(&self) -> Extent {
        self.transform.extent_of(self.rows, self.cols)
    }

    /// Cell values in row-major order
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Returns the value of the given cell, or `None` if the cell lies outside of this grid
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.data[row * self.cols + col])
    }

    /// Returns the value of the given cell if the cell lies within this grid and holds data
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.get(row, col).filter(|v| !self.is_nodata(*v))
    }

    /// Sets the value of the given cell
    ///
    /// # Panics
    ///
    /// If the cell lies outside of this grid
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(
            row < self.rows && col < self.cols,
            "Cell ({}, {}) is out of bounds for a {}x{} grid",
            row,
            col,
            self.rows,
            self.cols
        );
        self.data[row * self.cols + col] = value;
    }

    /// Returns the value of the cell containing the given position
    pub fn sample(&self, x: f64, y: f64) -> Option<f64> {
        let (row, col) = self.transform.cell_of(x, y);
        if row < 0 || col < 0 {
            return None;
        }
        self.value(row as usize, col as usize)
    }

    pub fn is_nodata(&self, value: f64) -> bool {
        value == self.nodata || (value.is_nan() && self.nodata.is_nan())
    }

    /// Number of cells that hold a value
    pub fn count_valid(&self) -> usize {
        self.data.iter().filter(|v| !self.is_nodata(**v)).count()
    }
}
