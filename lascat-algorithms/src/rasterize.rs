use std::{fmt, sync::Arc};

use lascat_core::{
    math::percentile,
    points::{PointSet, HEIGHT_ABOVE_GROUND},
    raster::RasterGrid,
    CoreError, CoreResult,
};

use crate::ground::GroundModel;

/// The attributes of a single return that a cell aggregation can look at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSample {
    /// Elevation or height above ground, depending on the [RasterValue] of the product
    pub z: f64,
    pub return_number: u8,
    pub number_of_returns: u8,
}

/// User-defined per-cell reduction. Returning `None` leaves the cell at no-data
#[derive(Clone)]
pub struct CustomReducer(pub Arc<dyn Fn(&[CellSample]) -> Option<f64> + Send + Sync>);

impl fmt::Debug for CustomReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomReducer")
    }
}

/// Reduction of the samples that fall into one raster cell to the cell value
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Aggregation {
    Max,
    Min,
    Mean,
    /// Number of samples in the cell
    Count,
    /// Linearly interpolated percentile in `[0, 100]`
    Percentile(f64),
    #[cfg_attr(feature = "serde", serde(skip))]
    Custom(CustomReducer),
}

impl Aggregation {
    /// Wraps a closure into [Aggregation::Custom]
    /// ```
    /// # use lascat_algorithms::rasterize::{Aggregation, CellSample};
    /// // share of first returns
    /// let first_returns = Aggregation::custom(|samples: &[CellSample]| {
    ///     let first = samples.iter().filter(|s| s.return_number == 1).count();
    ///     Some(first as f64 / samples.len() as f64)
    /// });
    /// let samples = [
    ///     CellSample { z: 10.0, return_number: 1, number_of_returns: 2 },
    ///     CellSample { z: 2.0, return_number: 2, number_of_returns: 2 },
    /// ];
    /// assert_eq!(first_returns.reduce(&samples), Some(0.5));
    /// ```
    pub fn custom<F: Fn(&[CellSample]) -> Option<f64> + Send + Sync + 'static>(reducer: F) -> Self {
        Aggregation::Custom(CustomReducer(Arc::new(reducer)))
    }

    /// Reduces the samples of one cell. Returns `None` for an empty cell
    pub fn reduce(&self, samples: &[CellSample]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        let values = || samples.iter().map(|sample| sample.z);
        match self {
            Aggregation::Max => values().fold(None, |max: Option<f64>, z| {
                Some(max.map_or(z, |max| max.max(z)))
            }),
            Aggregation::Min => values().fold(None, |min: Option<f64>, z| {
                Some(min.map_or(z, |min| min.min(z)))
            }),
            Aggregation::Mean => Some(values().sum::<f64>() / samples.len() as f64),
            Aggregation::Count => Some(samples.len() as f64),
            Aggregation::Percentile(percent) => percentile(&values().collect::<Vec<_>>(), *percent),
            Aggregation::Custom(reducer) => (reducer.0)(samples),
        }
    }
}

impl Default for Aggregation {
    fn default() -> Self {
        Aggregation::Max
    }
}

/// Which per-point value a surface raster aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum RasterValue {
    /// The z coordinate
    Elevation,
    /// The height above ground field attached by normalization
    HeightAboveGround,
}

impl Default for RasterValue {
    fn default() -> Self {
        RasterValue::Elevation
    }
}

/// Turns the points of `points` into cell samples carrying the requested value, in point order
pub fn cell_samples(points: &PointSet, value: RasterValue) -> CoreResult<Vec<CellSample>> {
    let heights = match value {
        RasterValue::Elevation => None,
        RasterValue::HeightAboveGround => Some(
            points
                .field(HEIGHT_ABOVE_GROUND)
                .ok_or_else(|| CoreError::MissingField(HEIGHT_ABOVE_GROUND.into()))?,
        ),
    };
    Ok(points
        .iter()
        .enumerate()
        .map(|(index, point)| CellSample {
            z: heights.map_or(point.z(), |heights| heights[index]),
            return_number: point.return_number,
            number_of_returns: point.number_of_returns,
        })
        .collect())
}

/// Bins the given `(row, col, sample)` triples into the cells of `grid` and replaces the value of every cell
/// that received at least one sample by the aggregation of its samples. Samples outside of the grid are ignored
pub fn aggregate_samples<I: IntoIterator<Item = (usize, usize, CellSample)>>(
    mut grid: RasterGrid,
    samples: I,
    aggregation: &Aggregation,
) -> RasterGrid {
    let (rows, cols) = (grid.rows(), grid.cols());
    let mut cells = vec![Vec::new(); rows * cols];
    for (row, col, sample) in samples {
        if row < rows && col < cols {
            cells[row * cols + col].push(sample);
        }
    }
    for (index, samples) in cells.iter().enumerate() {
        if let Some(value) = aggregation.reduce(samples) {
            grid.set(index / cols, index % cols, value);
        }
    }
    grid
}

/// Rasterizes `points` into `grid`. A point belongs to the cell containing it, where points on the right or
/// bottom edge of the grid belong to the last column or row
/// ```
/// # use lascat_core::math::Extent;
/// # use lascat_core::points::{PointRecord, PointSet};
/// # use lascat_core::raster::{RasterGrid, DEFAULT_NODATA};
/// # use lascat_algorithms::rasterize::{rasterize, Aggregation, RasterValue};
/// let points: PointSet = vec![
///     PointRecord::at(0.5, 0.5, 3.0),
///     PointRecord::at(0.7, 0.2, 5.0),
///     PointRecord::at(2.0, 2.0, 1.0),
/// ]
/// .into_iter()
/// .collect();
/// let grid = RasterGrid::covering(&Extent::new(0.0, 0.0, 2.0, 2.0).unwrap(), 1.0, DEFAULT_NODATA).unwrap();
/// let chm = rasterize(&points, grid, RasterValue::Elevation, &Aggregation::Max).unwrap();
/// assert_eq!(chm.value(1, 0), Some(5.0));
/// assert_eq!(chm.value(0, 1), Some(1.0));
/// assert_eq!(chm.value(0, 0), None);
/// ```
pub fn rasterize(
    points: &PointSet,
    grid: RasterGrid,
    value: RasterValue,
    aggregation: &Aggregation,
) -> CoreResult<RasterGrid> {
    let samples = cell_samples(points, value)?;
    let extent = grid.extent();
    let transform = *grid.transform();
    let (last_row, last_col) = (grid.rows() as i64 - 1, grid.cols() as i64 - 1);
    let located = points
        .iter()
        .zip(samples.into_iter())
        .filter(|(point, _)| extent.contains(point.x(), point.y()))
        .map(|(point, sample)| {
            let (row, col) = transform.cell_of(point.x(), point.y());
            (
                row.max(0).min(last_row) as usize,
                col.max(0).min(last_col) as usize,
                sample,
            )
        });
    Ok(aggregate_samples(grid, located, aggregation))
}

/// Fills every cell of `grid` with the ground elevation at the cell centre. Cells where `ground` is undefined are
/// set to no-data
pub fn rasterize_terrain(mut grid: RasterGrid, ground: &dyn GroundModel) -> RasterGrid {
    let transform = *grid.transform();
    let nodata = grid.nodata();
    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            let center = transform.cell_center(row as i64, col as i64);
            grid.set(row, col, ground.ground_z(center.x, center.y).unwrap_or(nodata));
        }
    }
    grid
}
