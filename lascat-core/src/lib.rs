#![warn(clippy::all)]

//! Core data structures for tiled processing of airborne lidar (ALS) catalogs
//!
//! lascat-core provides the value types that flow through a catalog run: [Extent](crate::math::Extent)s
//! describing rectangular regions, [PointRecord](crate::points::PointRecord)s and [PointSet](crate::points::PointSet)s
//! holding the lidar returns of a region, [RasterGrid](crate::raster::RasterGrid)s for gridded products and the
//! [TileIndex](crate::meta::TileIndex) that describes which spatial extents a dataset covers. Point data enters the
//! system through the [PointSource](crate::source::PointSource) trait.

pub extern crate nalgebra;

mod error;
pub use self::error::*;

/// Useful mathematical tools when working with point cloud extents
pub mod math;
/// Data structures for describing a tiled point cloud dataset
pub mod meta;
/// Point records and immutable point sets
pub mod points;
/// Gridded products and their georeferencing
pub mod raster;
/// Providers of raw point data
pub mod source;
