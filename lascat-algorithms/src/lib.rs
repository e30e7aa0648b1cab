#![warn(clippy::all)]
//! Algorithms that clean, normalize and rasterize lidar point sets, and the catalog machinery that applies
//! them chunk by chunk to datasets that are too large to be processed in one piece.
//!
//! The [catalog] module splits a dataset into buffered chunks, runs the per-chunk pipeline
//! (load, [dedup], [denoise], [normalize], strip buffer) on a worker pool and merges the per-chunk outputs
//! into a single point set or raster.

// Extent of the points in a point set.
pub mod bounds;
// Chunk planning, per-chunk processing, merging and the parallel run engine.
pub mod catalog;
// Removal of exact duplicate returns.
pub mod dedup;
// Percentile-grid based removal of high and low outliers.
pub mod denoise;
// Ground surface interpolation by triangulation or k-nearest-neighbour inverse distance weighting.
pub mod ground;
// Height above ground computation.
pub mod normalize;
// Per-cell aggregation of points into raster grids.
pub mod rasterize;
