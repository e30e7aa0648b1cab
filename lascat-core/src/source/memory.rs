use anyhow::Result;

use crate::{
    math::Extent,
    meta::{TileIndex, TileInfo},
    points::PointRecord,
};

use super::{PointFilter, PointSource};

/// A [PointSource] that serves points held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    points: Vec<PointRecord>,
}

impl MemorySource {
    pub fn new(points: Vec<PointRecord>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[PointRecord] {
        &self.points
    }

    /// Describes the points of this source as a single tile in the coordinate reference system `crs`. The
    /// index is empty if this source holds no points
    pub fn tile_index<S: Into<String>>(&self, crs: S) -> TileIndex {
        let extent = Extent::from_points(self.points.iter().map(PointRecord::xy));
        let tiles = extent
            .map(|extent| {
                vec![TileInfo {
                    name: "memory".into(),
                    extent,
                    point_count: self.points.len(),
                }]
            })
            .unwrap_or_default();
        TileIndex::new(crs, tiles)
    }
}

impl PointSource for MemorySource {
    fn read_extent(&self, extent: &Extent, filter: &PointFilter) -> Result<Vec<PointRecord>> {
        Ok(self
            .points
            .iter()
            .filter(|point| extent.contains(point.x(), point.y()) && filter.accepts(point))
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_extent() -> Result<()> {
        let source = MemorySource::new(vec![
            PointRecord::at(0.0, 0.0, 1.0),
            PointRecord::at(5.0, 5.0, 2.0),
            PointRecord::at(10.0, 10.0, 3.0).with_returns(0, 1),
        ]);
        let extent = Extent::new(0.0, 0.0, 10.0, 10.0)?;
        assert_eq!(source.read_extent(&extent, &PointFilter::accept_all())?.len(), 3);

        let filter = PointFilter {
            drop_zero_return_number: true,
            ..Default::default()
        };
        assert_eq!(source.read_extent(&extent, &filter)?.len(), 2);

        let small = Extent::new(4.0, 4.0, 6.0, 6.0)?;
        let points = source.read_extent(&small, &PointFilter::accept_all())?;
        assert_eq!(points, vec![PointRecord::at(5.0, 5.0, 2.0)]);
        Ok(())
    }

    #[test]
    fn test_tile_index() {
        let source = MemorySource::new(vec![
            PointRecord::at(1.0, 2.0, 0.0),
            PointRecord::at(3.0, -2.0, 0.0),
        ]);
        let index = source.tile_index("EPSG:25832");
        assert_eq!(index.tiles().len(), 1);
        assert_eq!(
            index.total_extent(),
            Some(Extent::new(1.0, -2.0, 3.0, 2.0).unwrap())
        );
        assert!(MemorySource::default().tile_index("EPSG:25832").is_empty());
    }
}
