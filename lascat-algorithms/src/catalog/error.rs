use lascat_core::{math::Extent, CoreError};
use thiserror::Error;

/// Errors of catalog processing. Chunk-local errors ([ChunkLoad](ProcessingError::ChunkLoad),
/// [GroundModelUndetermined](ProcessingError::GroundModelUndetermined), [Cancelled](ProcessingError::Cancelled))
/// only fail the affected chunk and are collected in the
/// [RunReport](super::RunReport). All other errors abort the run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessingError {
    /// Invalid options, detected before any chunk runs
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The point source failed to deliver the points of a chunk
    #[error("Failed to load chunk {chunk} with extent {extent}: {message}")]
    ChunkLoad {
        chunk: usize,
        extent: Extent,
        message: String,
    },
    /// Too few (or only collinear) ground points in the padded region of a chunk
    #[error("Ground model of chunk {chunk} is undetermined: found {found} ground points but {required} are required")]
    GroundModelUndetermined {
        chunk: usize,
        found: usize,
        required: usize,
    },
    /// The core regions or output cells of two chunks overlap
    #[error("Outputs of chunks {first} and {second} overlap")]
    MergeOverlap { first: usize, second: usize },
    /// A partial raster of a chunk is not aligned to the cells of the output raster or lies outside of it
    #[error("Partial raster of chunk {chunk} does not fit into the output raster")]
    MisalignedRaster { chunk: usize },
    /// The chunk was not started because the run was cancelled
    #[error("Chunk {chunk} was cancelled")]
    Cancelled { chunk: usize },
    /// Some chunks failed and the options do not allow a partial merge
    #[error("{failed} of {planned} chunks did not succeed and partial results are not allowed")]
    IncompleteRun { planned: usize, failed: usize },
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ProcessingError {
    /// Returns true for errors that only affect a single chunk
    pub fn is_chunk_local(&self) -> bool {
        matches!(
            self,
            ProcessingError::ChunkLoad { .. }
                | ProcessingError::GroundModelUndetermined { .. }
                | ProcessingError::Cancelled { .. }
        )
    }

    pub(crate) fn config<S: Into<String>>(message: S) -> Self {
        ProcessingError::InvalidConfiguration(message.into())
    }
}

/// Result type of catalog processing
pub type ProcessingResult<T> = std::result::Result<T, ProcessingError>;
