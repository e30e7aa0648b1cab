use std::ops::Range;

use lascat_core::{
    math::Extent,
    nalgebra::Point2,
    points::PointSet,
    raster::{GeoTransform, RasterGrid},
    CoreResult,
};

use super::{Chunk, ProcessingError, ProcessingResult};

/// The cell layout of a merged raster product. The frame covers the dataset extent with cells of the output
/// resolution, starting at the top-left corner of the dataset. Each cell is owned by the chunk that owns the cell
/// centre, where centres beyond the dataset extent are clamped onto its boundary
#[derive(Debug, Clone, PartialEq)]
pub struct RasterFrame {
    dataset: Extent,
    transform: GeoTransform,
    rows: usize,
    cols: usize,
    nodata: f64,
}

impl RasterFrame {
    pub fn new(dataset: &Extent, resolution: f64, nodata: f64) -> CoreResult<Self> {
        let template = RasterGrid::covering(dataset, resolution, nodata)?;
        Ok(Self {
            dataset: *dataset,
            transform: *template.transform(),
            rows: template.rows(),
            cols: template.cols(),
            nodata,
        })
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

    /// A grid covering the whole frame with all cells set to no-data
    pub fn empty_grid(&self) -> RasterGrid {
        RasterGrid::new(self.transform, self.rows, self.cols, self.nodata)
    }

    /// Returns the frame cell containing (x, y), or `None` if the position lies outside of the dataset extent.
    /// Positions on the maximum x or minimum y edge of the dataset belong to the last column or row
    pub fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !self.dataset.contains(x, y) {
            return None;
        }
        let (row, col) = self.transform.cell_of(x, y);
        Some((
            row.max(0).min(self.rows as i64 - 1) as usize,
            col.max(0).min(self.cols as i64 - 1) as usize,
        ))
    }

    fn clamped_center(&self, row: usize, col: usize) -> Point2<f64> {
        let center = self.transform.cell_center(row as i64, col as i64);
        Point2::new(
            center.x.max(self.dataset.xmin()).min(self.dataset.xmax()),
            center.y.max(self.dataset.ymin()).min(self.dataset.ymax()),
        )
    }

    /// The block of cells owned by `chunk`, as (rows, cols) ranges. Either range may be empty
    pub fn owned_cells(&self, chunk: &Chunk) -> (Range<usize>, Range<usize>) {
        let rows = (0..self.rows)
            .filter(|row| chunk.owns_y(self.clamped_center(*row, 0).y))
            .collect::<Vec<_>>();
        let cols = (0..self.cols)
            .filter(|col| chunk.owns_x(self.clamped_center(0, *col).x))
            .collect::<Vec<_>>();
        let range = |cells: &[usize]| match (cells.first(), cells.last()) {
            (Some(first), Some(last)) => *first..*last + 1,
            _ => 0..0,
        };
        (range(&rows), range(&cols))
    }

    /// An empty partial grid covering the cells owned by `chunk`
    pub fn partial_grid(&self, chunk: &Chunk) -> RasterGrid {
        let (rows, cols) = self.owned_cells(chunk);
        RasterGrid::new(
            self.transform.shifted(rows.start as i64, cols.start as i64),
            rows.len(),
            cols.len(),
            self.nodata,
        )
    }
}

/// The raster output of one chunk, covering exactly the frame cells owned by the chunk
#[derive(Debug, Clone, PartialEq)]
pub struct PartialRaster {
    pub chunk: usize,
    pub grid: RasterGrid,
}

/// Concatenates the point outputs of all chunks in the given order
pub fn merge_points<I: IntoIterator<Item = PointSet>>(parts: I) -> PointSet {
    PointSet::concat(parts)
}

/// Places each partial raster at its position in the output raster. Cells not covered by any partial raster stay
/// at no-data. A cell covered by two partial rasters is reported as [MergeOverlap](ProcessingError::MergeOverlap)
pub fn merge_rasters(
    frame: &RasterFrame,
    partials: &[PartialRaster],
) -> ProcessingResult<RasterGrid> {
    let mut merged = frame.empty_grid();
    let mut owners: Vec<Option<usize>> = vec![None; frame.rows * frame.cols];
    for partial in partials {
        let grid = &partial.grid;
        if grid.rows() == 0 || grid.cols() == 0 {
            continue;
        }
        let misaligned = ProcessingError::MisalignedRaster {
            chunk: partial.chunk,
        };
        let (row_offset, col_offset) = frame
            .transform
            .offset_of(grid.transform())
            .ok_or_else(|| misaligned.clone())?;
        if row_offset < 0
            || col_offset < 0
            || row_offset as usize + grid.rows() > frame.rows
            || col_offset as usize + grid.cols() > frame.cols
        {
            return Err(misaligned);
        }
        let (row_offset, col_offset) = (row_offset as usize, col_offset as usize);
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                let (target_row, target_col) = (row + row_offset, col + col_offset);
                let owner = &mut owners[target_row * frame.cols + target_col];
                if let Some(first) = *owner {
                    return Err(ProcessingError::MergeOverlap {
                        first,
                        second: partial.chunk,
                    });
                }
                *owner = Some(partial.chunk);
                if let Some(value) = grid.value(row, col) {
                    merged.set(target_row, target_col, value);
                }
            }
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::plan_chunks;
    use lascat_core::{points::PointRecord, raster::DEFAULT_NODATA};

    #[test]
    fn test_owned_cells_partition_the_frame() {
        // chunk boundaries at 7 and 14 do not align with the 2 unit cells
        let dataset = Extent::new(0.0, 0.0, 17.0, 9.0).unwrap();
        let frame = RasterFrame::new(&dataset, 2.0, DEFAULT_NODATA).unwrap();
        assert_eq!((frame.rows(), frame.cols()), (5, 9));

        let chunks = plan_chunks(&dataset, 7.0, 1.0).unwrap();
        let mut counts = vec![0; frame.rows() * frame.cols()];
        for chunk in &chunks {
            let (rows, cols) = frame.owned_cells(chunk);
            for row in rows {
                for col in cols.clone() {
                    counts[row * frame.cols() + col] += 1;
                }
            }
        }
        assert!(counts.iter().all(|count| *count == 1));
    }

    #[test]
    fn test_merge_rasters() {
        let dataset = Extent::new(0.0, 0.0, 4.0, 2.0).unwrap();
        let frame = RasterFrame::new(&dataset, 1.0, DEFAULT_NODATA).unwrap();
        let chunks = plan_chunks(&dataset, 2.0, 0.0).unwrap();
        let partials = chunks
            .iter()
            .map(|chunk| {
                let mut grid = frame.partial_grid(chunk);
                grid.set(0, 0, chunk.id() as f64 + 1.0);
                PartialRaster {
                    chunk: chunk.id(),
                    grid,
                }
            })
            .collect::<Vec<_>>();
        let merged = merge_rasters(&frame, &partials).unwrap();
        // row 0 is the northern row, chunk 1 is the eastern chunk
        assert_eq!(
            merged.data(),
            &[
                1.0,
                DEFAULT_NODATA,
                2.0,
                DEFAULT_NODATA,
                DEFAULT_NODATA,
                DEFAULT_NODATA,
                DEFAULT_NODATA,
                DEFAULT_NODATA
            ]
        );
    }

    #[test]
    fn test_overlapping_partials_are_a_defect() {
        let dataset = Extent::new(0.0, 0.0, 4.0, 4.0).unwrap();
        let frame = RasterFrame::new(&dataset, 1.0, DEFAULT_NODATA).unwrap();
        let whole = Chunk::whole(dataset);
        let partials = vec![
            PartialRaster {
                chunk: 0,
                grid: frame.partial_grid(&whole),
            },
            PartialRaster {
                chunk: 1,
                grid: RasterGrid::new(frame.transform().shifted(2, 2), 1, 1, DEFAULT_NODATA),
            },
        ];
        assert_eq!(
            merge_rasters(&frame, &partials),
            Err(ProcessingError::MergeOverlap {
                first: 0,
                second: 1
            })
        );

        let outside = vec![PartialRaster {
            chunk: 7,
            grid: RasterGrid::new(frame.transform().shifted(3, 3), 2, 2, DEFAULT_NODATA),
        }];
        assert_eq!(
            merge_rasters(&frame, &outside),
            Err(ProcessingError::MisalignedRaster { chunk: 7 })
        );
    }

    #[test]
    fn test_merge_points_keeps_chunk_order() {
        let parts = vec![
            PointSet::from_points(vec![PointRecord::at(1.0, 1.0, 1.0)]),
            PointSet::new(),
            PointSet::from_points(vec![PointRecord::at(2.0, 2.0, 2.0)]),
        ];
        let merged = merge_points(parts);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.points()[1].z(), 2.0);
    }
}
