use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{info, warn};
use rayon::prelude::*;

use lascat_core::{meta::TileIndex, source::PointSource};

use super::{
    merge_points, merge_rasters, plan_catalog, process_chunk, verify_disjoint_cores,
    CatalogOptions, Chunk, ChunkFailure, ChunkOutput, MergedProduct, ProcessingError,
    ProcessingResult, RasterFrame, RunReport,
};

/// What a run processes
#[derive(Debug, Clone)]
pub enum Target {
    /// A single chunk, processed as given
    Chunk(Chunk),
    /// All chunks planned over the total extent of a tile index
    Catalog(TileIndex),
}

/// Shared flag to stop a running catalog. Chunks that are already running finish, chunks that have not started
/// yet are reported as cancelled
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Processes `target` with the points of `source` and merges the chunk outputs into the configured product
/// ```
/// # use lascat_core::points::PointRecord;
/// # use lascat_core::source::MemorySource;
/// # use lascat_algorithms::catalog::{run, CatalogOptions, Target};
/// let source = MemorySource::new(vec![
///     PointRecord::at(10.0, 10.0, 1.0),
///     PointRecord::at(990.0, 990.0, 2.0),
/// ]);
/// let options = CatalogOptions {
///     chunk_size: 100.0,
///     normalize: None,
///     ..Default::default()
/// };
/// let report = run(&Target::Catalog(source.tile_index("EPSG:25832")), &source, &options).unwrap();
/// assert_eq!(report.planned, 100);
/// assert_eq!(report.product.points().unwrap().len(), 2);
/// ```
pub fn run(
    target: &Target,
    source: &dyn PointSource,
    options: &CatalogOptions,
) -> ProcessingResult<RunReport> {
    run_with_cancellation(target, source, options, &CancellationToken::new())
}

/// Like [run], but stops starting new chunks once `cancellation` is cancelled
pub fn run_with_cancellation(
    target: &Target,
    source: &dyn PointSource,
    options: &CatalogOptions,
    cancellation: &CancellationToken,
) -> ProcessingResult<RunReport> {
    options.validate()?;
    let chunks = match target {
        Target::Chunk(chunk) => vec![chunk.clone()],
        Target::Catalog(index) => {
            plan_catalog(index, options.chunk_size, options.buffer_margin)?
        }
    };
    verify_disjoint_cores(&chunks)?;
    info!(
        "Processing {} chunks on {} worker(s)",
        chunks.len(),
        options.workers
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers)
        .build()
        .map_err(|e| ProcessingError::config(format!("Failed to create worker pool: {}", e)))?;
    // collect() keeps the plan order regardless of the number of workers
    let results = pool.install(|| {
        chunks
            .par_iter()
            .map(|chunk| {
                if cancellation.is_cancelled() {
                    return Err(ProcessingError::Cancelled { chunk: chunk.id() });
                }
                process_chunk(chunk, source, options)
            })
            .collect::<Vec<_>>()
    });

    let mut succeeded = vec![];
    let mut failures = vec![];
    let mut cancelled = vec![];
    let mut warnings = vec![];
    let mut outputs = vec![];
    for (chunk, result) in chunks.iter().zip(results.into_iter()) {
        match result {
            Ok(result) => {
                succeeded.push(chunk.id());
                warnings.extend(result.warnings);
                outputs.push(result.output);
            }
            Err(ProcessingError::Cancelled { chunk }) => cancelled.push(chunk),
            Err(error) if error.is_chunk_local() => {
                warn!("{}", error);
                failures.push(ChunkFailure {
                    chunk: chunk.id(),
                    extent: *chunk.padded(),
                    error,
                });
            }
            Err(error) => return Err(error),
        }
    }

    let planned = chunks.len();
    if !options.allow_partial && succeeded.len() < planned {
        return Err(ProcessingError::IncompleteRun {
            planned,
            failed: planned - succeeded.len(),
        });
    }

    let product = if options.product.is_raster() {
        let dataset = chunks
            .first()
            .map(|chunk| *chunk.dataset())
            .ok_or_else(|| ProcessingError::config("Nothing to process"))?;
        let frame = RasterFrame::new(&dataset, options.output_resolution, options.nodata)?;
        let partials = outputs
            .into_iter()
            .filter_map(|output| match output {
                ChunkOutput::Raster(partial) => Some(partial),
                ChunkOutput::Points(_) => None,
            })
            .collect::<Vec<_>>();
        MergedProduct::Raster(merge_rasters(&frame, &partials)?)
    } else {
        MergedProduct::Points(merge_points(outputs.into_iter().filter_map(
            |output| match output {
                ChunkOutput::Points(points) => Some(points),
                ChunkOutput::Raster(_) => None,
            },
        )))
    };

    let report = RunReport {
        planned,
        succeeded,
        failures,
        cancelled,
        warnings,
        product,
    };
    info!(
        "Finished: {} of {} chunks succeeded",
        report.succeeded.len(),
        planned
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lascat_core::{math::Extent, points::PointRecord, source::MemorySource};

    #[test]
    fn test_single_chunk_target() {
        let source = MemorySource::new(vec![
            PointRecord::at(1.0, 1.0, 1.0),
            PointRecord::at(50.0, 50.0, 1.0),
        ]);
        let dataset = Extent::new(0.0, 0.0, 100.0, 100.0).unwrap();
        let chunk = Chunk::new(0, Extent::new(0.0, 0.0, 10.0, 10.0).unwrap(), 0.0, dataset).unwrap();
        let options = CatalogOptions {
            normalize: None,
            ..Default::default()
        };
        let report = run(&Target::Chunk(chunk), &source, &options).unwrap();
        assert_eq!(report.planned, 1);
        assert_eq!(report.product.points().unwrap().len(), 1);
    }

    #[test]
    fn test_cancelled_run() {
        let source = MemorySource::new(vec![PointRecord::at(1.0, 1.0, 1.0), PointRecord::at(9.0, 9.0, 1.0)]);
        let options = CatalogOptions {
            chunk_size: 2.0,
            normalize: None,
            ..Default::default()
        };
        let token = CancellationToken::new();
        token.cancel();
        let target = Target::Catalog(source.tile_index("local"));
        let report = run_with_cancellation(&target, &source, &options, &token).unwrap();
        assert_eq!(report.cancelled.len(), report.planned);
        assert!(report.succeeded.is_empty());
        assert_eq!(report.product.points().unwrap().len(), 0);

        let strict = CatalogOptions {
            allow_partial: false,
            ..options
        };
        assert_eq!(
            run_with_cancellation(&target, &source, &strict, &token).err(),
            Some(ProcessingError::IncompleteRun {
                planned: 16,
                failed: 16
            })
        );
    }

    #[test]
    fn test_invalid_options_abort_before_processing() {
        let source = MemorySource::new(vec![PointRecord::at(1.0, 1.0, 1.0)]);
        let options = CatalogOptions {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(
            run(&Target::Catalog(source.tile_index("local")), &source, &options),
            Err(ProcessingError::InvalidConfiguration(_))
        ));
    }
}
