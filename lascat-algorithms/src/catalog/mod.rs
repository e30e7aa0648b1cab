//! Chunked processing of point cloud catalogs.
//!
//! A catalog run splits the total extent of a dataset into a grid of chunks ([plan_chunks]). Every chunk loads the
//! points of its padded region (its core region grown by a buffer margin) from a [PointSource], cleans and
//! normalizes them, strips the buffer again and turns the remaining points into its share of the output product
//! ([process_chunk]). Since chunks share no state, they run in parallel on a worker pool ([run]). Finally the
//! per-chunk outputs are merged into a single point set or raster ([merge_points], [merge_rasters]).
//!
//! Errors that only concern a single chunk (failed loads, undetermined ground models) do not abort the run, they
//! are collected in the [RunReport] instead.
//!
//! [PointSource]: lascat_core::source::PointSource

mod chunk;
pub use self::chunk::*;

mod engine;
pub use self::engine::*;

mod error;
pub use self::error::*;

mod merger;
pub use self::merger::*;

mod options;
pub use self::options::*;

mod processor;
pub use self::processor::*;

mod report;
pub use self::report::*;
