use log::{debug, warn};

use lascat_core::{points::PointSet, source::PointSource};

use crate::{
    bounds::{calculate_extent, calculate_z_range},
    dedup::deduplicate,
    denoise::denoise,
    ground::{GroundModel, GroundModelError},
    normalize::{ground_model_for, normalize_height, GroundFailurePolicy},
    rasterize::{aggregate_samples, cell_samples, rasterize_terrain},
};

use super::{
    CatalogOptions, Chunk, OutputProduct, PartialRaster, ProcessingError, ProcessingResult,
    RasterFrame,
};

/// Point counts of the stages of one chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    /// Points loaded from the padded region
    pub loaded: usize,
    pub duplicates: usize,
    pub noise: usize,
    /// Points dropped because the ground model is undefined at their position
    pub unnormalized: usize,
    /// Points outside of the chunk's core region (or owned raster cells)
    pub stripped: usize,
}

/// The product-specific output of one chunk
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutput {
    Points(PointSet),
    Raster(PartialRaster),
}

/// The result of processing one chunk successfully
#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub chunk: usize,
    pub stats: ChunkStats,
    /// Non-fatal problems, e.g. a skipped normalization
    pub warnings: Vec<String>,
    pub output: ChunkOutput,
}

/// Produces the output of `chunk` from the points that are already cleaned (and normalized, if enabled)
fn chunk_output(
    chunk: &Chunk,
    points: &PointSet,
    ground: Option<&dyn GroundModel>,
    options: &CatalogOptions,
) -> ProcessingResult<(ChunkOutput, usize)> {
    let raster_frame = || {
        RasterFrame::new(chunk.dataset(), options.output_resolution, options.nodata)
            .map_err(ProcessingError::from)
    };
    match &options.product {
        OutputProduct::Points => {
            let core_points = points.filter(|point| chunk.owns(point.x(), point.y()));
            let stripped = points.len() - core_points.len();
            Ok((ChunkOutput::Points(core_points), stripped))
        }
        OutputProduct::Surface { aggregation, value } => {
            let frame = raster_frame()?;
            let (rows, cols) = frame.owned_cells(chunk);
            let samples = cell_samples(points, *value)?;
            let located = points
                .iter()
                .zip(samples.into_iter())
                .filter_map(|(point, sample)| {
                    let (row, col) = frame.cell_of(point.x(), point.y())?;
                    if rows.contains(&row) && cols.contains(&col) {
                        Some((row - rows.start, col - cols.start, sample))
                    } else {
                        None
                    }
                })
                .collect::<Vec<_>>();
            let stripped = points.len() - located.len();
            let grid = aggregate_samples(frame.partial_grid(chunk), located, aggregation);
            Ok((
                ChunkOutput::Raster(PartialRaster {
                    chunk: chunk.id(),
                    grid,
                }),
                stripped,
            ))
        }
        OutputProduct::Terrain => {
            let frame = raster_frame()?;
            let partial = frame.partial_grid(chunk);
            let grid = match ground {
                Some(ground) => rasterize_terrain(partial, ground),
                None => partial,
            };
            Ok((
                ChunkOutput::Raster(PartialRaster {
                    chunk: chunk.id(),
                    grid,
                }),
                points.len(),
            ))
        }
    }
}

/// Runs the processing pipeline for a single chunk:
///
/// 1. Load all points inside the padded region of `chunk` from `source`, applying the point filter of `options`
/// 2. Remove exact duplicates
/// 3. Remove outliers on a coarse percentile grid over the padded region
/// 4. Attach the height above ground, computed from a ground model of the ground points in the padded region
/// 5. Strip the buffer, keeping only the points owned by the core region of `chunk`
/// 6. Turn the remaining points into the configured product
///
/// Steps 2 to 4 can be disabled through `options`, which are expected to be
/// [validated](CatalogOptions::validate). A chunk without any points yields an empty output. For raster
/// products, step 5 keeps the points that fall into the raster cells owned by the chunk
pub fn process_chunk(
    chunk: &Chunk,
    source: &dyn PointSource,
    options: &CatalogOptions,
) -> ProcessingResult<ChunkResult> {
    let mut stats = ChunkStats::default();
    let mut warnings = vec![];

    let loaded = source
        .read_extent(chunk.padded(), &options.filter)
        .map_err(|e| ProcessingError::ChunkLoad {
            chunk: chunk.id(),
            extent: *chunk.padded(),
            message: format!("{:#}", e),
        })?;
    let mut points = PointSet::from_points(loaded);
    stats.loaded = points.len();
    if let (Some(extent), Some((zmin, zmax))) = (calculate_extent(&points), calculate_z_range(&points)) {
        debug!(
            "Chunk {}: loaded {} points covering {} with z in [{}, {}]",
            chunk.id(),
            points.len(),
            extent,
            zmin,
            zmax
        );
    }

    if points.is_empty() {
        let (output, _) = chunk_output(chunk, &points, None, options)?;
        return Ok(ChunkResult {
            chunk: chunk.id(),
            stats,
            warnings,
            output,
        });
    }

    if options.deduplicate {
        let deduplicated = deduplicate(&points);
        stats.duplicates = points.len() - deduplicated.len();
        points = deduplicated;
        debug!("Chunk {}: removed {} duplicates", chunk.id(), stats.duplicates);
    }

    if let Some(params) = &options.denoise {
        let denoised = denoise(&points, chunk.padded(), params);
        stats.noise = points.len() - denoised.len();
        points = denoised;
        debug!("Chunk {}: removed {} noise points", chunk.id(), stats.noise);
    }

    let mut ground = None;
    if let Some(params) = &options.normalize {
        match ground_model_for(&points, params) {
            Ok(model) => {
                let normalized = normalize_height(&points, model.as_ref())?;
                stats.unnormalized = points.len() - normalized.len();
                if stats.unnormalized > 0 {
                    warn!(
                        "Chunk {}: dropped {} points outside of the ground model",
                        chunk.id(),
                        stats.unnormalized
                    );
                }
                points = normalized;
                ground = Some(model);
            }
            Err(why) => {
                let (found, required) = match why {
                    GroundModelError::InsufficientPoints { found, required } => (found, required),
                    GroundModelError::Degenerate(found) => (found, params.required_ground_points()),
                };
                match params.on_failure {
                    GroundFailurePolicy::DropChunk => {
                        return Err(ProcessingError::GroundModelUndetermined {
                            chunk: chunk.id(),
                            found,
                            required,
                        })
                    }
                    GroundFailurePolicy::SkipNormalize => {
                        let warning = format!(
                            "Chunk {}: normalization skipped: {}",
                            chunk.id(),
                            why
                        );
                        warn!("{}", warning);
                        warnings.push(warning);
                    }
                }
            }
        }
    }

    let (output, stripped) = chunk_output(chunk, &points, ground.as_deref(), options)?;
    stats.stripped = stripped;
    debug!("Chunk {}: stripped {} buffer points", chunk.id(), stripped);

    Ok(ChunkResult {
        chunk: chunk.id(),
        stats,
        warnings,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        denoise::DenoiseParams,
        ground::GroundAlgorithm,
        normalize::NormalizeParams,
        rasterize::{Aggregation, RasterValue},
    };
    use anyhow::anyhow;
    use lascat_core::{
        math::Extent,
        points::{PointRecord, CLASS_GROUND, HEIGHT_ABOVE_GROUND},
        source::{MemorySource, PointFilter},
    };

    struct FailingSource;

    impl PointSource for FailingSource {
        fn read_extent(
            &self,
            _extent: &Extent,
            _filter: &PointFilter,
        ) -> anyhow::Result<Vec<PointRecord>> {
            Err(anyhow!("Disk on fire"))
        }
    }

    /// Flat ground at z = 100 on a 2 unit grid with a tree at (10, 10)
    fn plot() -> Vec<PointRecord> {
        let mut points = vec![];
        for i in 0..=10 {
            for j in 0..=10 {
                points.push(
                    PointRecord::at(i as f64 * 2.0, j as f64 * 2.0, 100.0)
                        .with_classification(CLASS_GROUND),
                );
            }
        }
        points.push(PointRecord::at(10.5, 10.5, 118.0).with_returns(1, 2));
        points.push(PointRecord::at(10.5, 10.5, 118.0).with_returns(1, 2));
        points
    }

    fn plot_chunks() -> Vec<Chunk> {
        let dataset = Extent::new(0.0, 0.0, 20.0, 20.0).unwrap();
        super::super::plan_chunks(&dataset, 10.0, 2.0).unwrap()
    }

    #[test]
    fn test_points_pipeline() {
        let source = MemorySource::new(plot());
        let chunks = plot_chunks();
        let options = CatalogOptions::default();

        let result = process_chunk(&chunks[3], &source, &options).unwrap();
        assert_eq!(result.stats.duplicates, 1);
        let points = match result.output {
            ChunkOutput::Points(points) => points,
            other => panic!("Unexpected output {:?}", other),
        };
        assert!(points.iter().all(|p| chunks[3].owns(p.x(), p.y())));
        // ground points x, y in {10, 12, ..., 20}, plus the tree
        assert_eq!(points.len(), 37);
        let tree = points
            .iter()
            .position(|p| p.z() == 118.0)
            .expect("tree is kept");
        assert!((points.field(HEIGHT_ABOVE_GROUND).unwrap()[tree] - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_failure() {
        let chunk = plot_chunks().remove(0);
        let err = process_chunk(&chunk, &FailingSource, &CatalogOptions::default())
            .err()
            .unwrap();
        assert_eq!(
            err,
            ProcessingError::ChunkLoad {
                chunk: 0,
                extent: *chunk.padded(),
                message: "Disk on fire".into()
            }
        );
    }

    #[test]
    fn test_empty_chunk() {
        let chunk = plot_chunks().remove(0);
        let source = MemorySource::new(vec![]);
        let result = process_chunk(&chunk, &source, &CatalogOptions::default()).unwrap();
        assert_eq!(result.output, ChunkOutput::Points(PointSet::new()));
        assert_eq!(result.stats, ChunkStats::default());
    }

    #[test]
    fn test_ground_failure_policy() {
        let chunk = plot_chunks().remove(0);
        let source = MemorySource::new(vec![
            PointRecord::at(1.0, 1.0, 100.0).with_classification(CLASS_GROUND),
            PointRecord::at(3.0, 1.0, 100.0).with_classification(CLASS_GROUND),
            PointRecord::at(2.0, 2.0, 112.0),
        ]);

        let mut options = CatalogOptions {
            denoise: None,
            ..Default::default()
        };
        assert_eq!(
            process_chunk(&chunk, &source, &options).err(),
            Some(ProcessingError::GroundModelUndetermined {
                chunk: 0,
                found: 2,
                required: 3
            })
        );

        options.normalize = Some(NormalizeParams {
            on_failure: GroundFailurePolicy::SkipNormalize,
            ..Default::default()
        });
        let result = process_chunk(&chunk, &source, &options).unwrap();
        assert_eq!(result.warnings.len(), 1);
        match result.output {
            ChunkOutput::Points(points) => {
                assert_eq!(points.len(), 3);
                assert!(!points.has_field(HEIGHT_ABOVE_GROUND));
            }
            other => panic!("Unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_collinear_ground_is_undetermined() {
        let chunk = plot_chunks().remove(0);
        let source = MemorySource::new(
            (0..5)
                .map(|i| PointRecord::at(i as f64, 1.0, 100.0).with_classification(CLASS_GROUND))
                .collect(),
        );
        let options = CatalogOptions {
            denoise: None,
            ..Default::default()
        };
        assert!(matches!(
            process_chunk(&chunk, &source, &options),
            Err(ProcessingError::GroundModelUndetermined { found: 5, .. })
        ));
    }

    #[test]
    fn test_canopy_height_partial() {
        let source = MemorySource::new(plot());
        let chunks = plot_chunks();
        let options = CatalogOptions {
            product: OutputProduct::Surface {
                aggregation: Aggregation::Max,
                value: RasterValue::HeightAboveGround,
            },
            output_resolution: 5.0,
            normalize: Some(NormalizeParams {
                algorithm: GroundAlgorithm::knn_idw(),
                ..Default::default()
            }),
            denoise: Some(DenoiseParams::default()),
            ..Default::default()
        };
        let result = process_chunk(&chunks[3], &source, &options).unwrap();
        let partial = match result.output {
            ChunkOutput::Raster(partial) => partial,
            other => panic!("Unexpected output {:?}", other),
        };
        assert_eq!((partial.grid.rows(), partial.grid.cols()), (2, 2));
        // the tree lies in the south-west cell of the north-east chunk
        assert!((partial.grid.value(1, 0).unwrap() - 18.0).abs() < 1e-9);
        assert_eq!(partial.grid.value(0, 1), Some(0.0));
    }
}
