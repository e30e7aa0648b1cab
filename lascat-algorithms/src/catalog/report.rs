use std::fmt::Display;

use lascat_core::{math::Extent, points::PointSet, raster::RasterGrid};

use super::ProcessingError;

/// The merged product of a catalog run
#[derive(Debug, Clone, PartialEq)]
pub enum MergedProduct {
    Points(PointSet),
    Raster(RasterGrid),
}

impl MergedProduct {
    pub fn points(&self) -> Option<&PointSet> {
        match self {
            MergedProduct::Points(points) => Some(points),
            MergedProduct::Raster(_) => None,
        }
    }

    pub fn raster(&self) -> Option<&RasterGrid> {
        match self {
            MergedProduct::Raster(raster) => Some(raster),
            MergedProduct::Points(_) => None,
        }
    }
}

/// A chunk that did not contribute to the merged product
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkFailure {
    pub chunk: usize,
    /// Padded region of the chunk
    pub extent: Extent,
    pub error: ProcessingError,
}

/// Summary of a catalog run together with its merged product
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Number of planned chunks
    pub planned: usize,
    /// Ids of the chunks that contributed to the product, in plan order
    pub succeeded: Vec<usize>,
    pub failures: Vec<ChunkFailure>,
    /// Ids of the chunks that were not started because the run was cancelled
    pub cancelled: Vec<usize>,
    pub warnings: Vec<String>,
    pub product: MergedProduct,
}

impl RunReport {
    /// Returns true if every planned chunk contributed to the product
    pub fn is_complete(&self) -> bool {
        self.succeeded.len() == self.planned
    }
}

impl Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Chunks planned:   {}", self.planned)?;
        writeln!(f, "Chunks succeeded: {}", self.succeeded.len())?;
        writeln!(f, "Chunks failed:    {}", self.failures.len())?;
        for failure in &self.failures {
            writeln!(f, "  {}", failure.error)?;
        }
        if !self.cancelled.is_empty() {
            writeln!(f, "Chunks cancelled: {}", self.cancelled.len())?;
        }
        for warning in &self.warnings {
            writeln!(f, "Warning: {}", warning)?;
        }
        let completeness = if self.is_complete() {
            "complete"
        } else {
            "partial"
        };
        match &self.product {
            MergedProduct::Points(points) => {
                write!(f, "Product ({}): {} points", completeness, points.len())
            }
            MergedProduct::Raster(raster) => write!(
                f,
                "Product ({}): {}x{} raster at resolution {} covering {}, {} cells with data",
                completeness,
                raster.rows(),
                raster.cols(),
                raster.resolution(),
                raster.extent(),
                raster.count_valid()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lascat_core::points::PointRecord;

    #[test]
    fn test_display() {
        let report = RunReport {
            planned: 2,
            succeeded: vec![1],
            failures: vec![ChunkFailure {
                chunk: 0,
                extent: Extent::new(0.0, 0.0, 10.0, 10.0).unwrap(),
                error: ProcessingError::GroundModelUndetermined {
                    chunk: 0,
                    found: 1,
                    required: 3,
                },
            }],
            cancelled: vec![],
            warnings: vec![],
            product: MergedProduct::Points(PointSet::from_points(vec![PointRecord::at(
                15.0, 5.0, 1.0,
            )])),
        };
        let text = report.to_string();
        assert!(text.contains("Chunks planned:   2"));
        assert!(text.contains("Chunks failed:    1"));
        assert!(text.contains("Ground model of chunk 0 is undetermined"));
        assert!(text.ends_with("Product (partial): 1 points"));
        assert!(!report.is_complete());
    }
}
