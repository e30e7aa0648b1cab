mod filter;
pub use self::filter::*;

mod memory;
pub use self::memory::*;

use anyhow::Result;

use crate::{math::Extent, points::PointRecord};

/// Base trait for all providers of raw point data. A `PointSource` is queried by extent and has to be usable
/// from several threads at once, as independent chunks of a dataset are read in parallel
pub trait PointSource: Send + Sync {
    /// Returns all points whose horizontal position lies within `extent` (boundary included) and that are
    /// accepted by `filter`. The order of the returned points is implementation-defined but has to be the same
    /// for repeated queries of the same extent
    fn read_extent(&self, extent: &Extent, filter: &PointFilter) -> Result<Vec<PointRecord>>;
}

impl<T: PointSource + ?Sized> PointSource for &T {
    fn read_extent(&self, extent: &Extent, filter: &PointFilter) -> Result<Vec<PointRecord>> {
        (**self).read_extent(extent, filter)
    }
}

impl<T: PointSource + ?Sized> PointSource for Box<T> {
    fn read_extent(&self, extent: &Extent, filter: &PointFilter) -> Result<Vec<PointRecord>> {
        (**self).read_extent(extent, filter)
    }
}
