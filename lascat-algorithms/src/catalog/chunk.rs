use std::fmt::Display;

use lascat_core::{math::Extent, meta::TileIndex};

use super::{ProcessingError, ProcessingResult};

/// A region of interest of a catalog run. The core region is the part of the dataset that the chunk is
/// responsible for, the padded region is the core grown by the buffer margin (clipped to the dataset) and is the
/// region that the chunk loads and processes.
///
/// Core regions are half-open: a chunk owns the positions in `[xmin, xmax) × [ymin, ymax)` of its core, except
/// at the maximum edges of the dataset, which belong to the chunks touching them. Each position of the dataset
/// extent is thus owned by exactly one chunk of a plan.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chunk {
    id: usize,
    row: usize,
    col: usize,
    core: Extent,
    buffer: f64,
    padded: Extent,
    dataset: Extent,
}

impl Chunk {
    /// Creates a standalone chunk with the given `core` region inside of `dataset`. The chunk is located at grid
    /// position (0, 0)
    pub fn new(id: usize, core: Extent, buffer: f64, dataset: Extent) -> ProcessingResult<Self> {
        Self::at(id, 0, 0, core, buffer, dataset)
    }

    /// Creates a chunk that covers all of `dataset`
    pub fn whole(dataset: Extent) -> Self {
        Self {
            id: 0,
            row: 0,
            col: 0,
            core: dataset,
            buffer: 0.0,
            padded: dataset,
            dataset,
        }
    }

    fn at(
        id: usize,
        row: usize,
        col: usize,
        core: Extent,
        buffer: f64,
        dataset: Extent,
    ) -> ProcessingResult<Self> {
        validate_buffer(buffer)?;
        if !dataset.contains_extent(&core) {
            return Err(ProcessingError::config(format!(
                "Core region {} of chunk {} exceeds the dataset extent {}",
                core, id, dataset
            )));
        }
        // never None, the core lies within the dataset
        let padded = core.expand(buffer).clip_to(&dataset).unwrap_or(core);
        Ok(Self {
            id,
            row,
            col,
            core,
            buffer,
            padded,
            dataset,
        })
    }

    /// Index of this chunk within its plan
    pub fn id(&self) -> usize {
        self.id
    }

    /// (row, column) position in the tiling grid. Row 0 is the southernmost row
    pub fn grid_position(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn core(&self) -> &Extent {
        &self.core
    }

    pub fn buffer(&self) -> f64 {
        self.buffer
    }

    pub fn padded(&self) -> &Extent {
        &self.padded
    }

    /// Total extent of the dataset this chunk was planned from
    pub fn dataset(&self) -> &Extent {
        &self.dataset
    }

    /// Returns true if the x coordinate falls into the half-open x range of the core region
    pub fn owns_x(&self, x: f64) -> bool {
        owns(x, self.core.xmin(), self.core.xmax(), self.dataset.xmax())
    }

    /// Returns true if the y coordinate falls into the half-open y range of the core region
    pub fn owns_y(&self, y: f64) -> bool {
        owns(y, self.core.ymin(), self.core.ymax(), self.dataset.ymax())
    }

    /// Returns true if this chunk owns the position (x, y)
    pub fn owns(&self, x: f64, y: f64) -> bool {
        self.owns_x(x) && self.owns_y(y)
    }
}

impl Display for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "chunk {} ({}, {}) core {} padded {}",
            self.id, self.row, self.col, self.core, self.padded
        )
    }
}

fn owns(value: f64, min: f64, max: f64, dataset_max: f64) -> bool {
    value >= min && (value < max || (max >= dataset_max && value <= max))
}

fn validate_buffer(buffer: f64) -> ProcessingResult<()> {
    if !(buffer.is_finite() && buffer >= 0.0) {
        return Err(ProcessingError::config(format!(
            "Buffer margin must be a finite value >= 0, but was {}",
            buffer
        )));
    }
    Ok(())
}

/// Chunk boundaries along one axis. The first boundary is `min`, the last is `max`, and all but the last interval
/// have length `size`
fn boundaries(min: f64, max: f64, size: f64) -> Vec<f64> {
    let mut boundaries = vec![min];
    let mut index = 1.0;
    loop {
        let boundary = min + index * size;
        if boundary >= max {
            break;
        }
        boundaries.push(boundary);
        index += 1.0;
    }
    boundaries.push(max);
    boundaries
}

/// Splits `dataset` into a grid of chunks with cores of `chunk_size` × `chunk_size` (smaller at the maximum x and
/// y edges) and padded regions grown by `buffer_margin`. The chunks are ordered row-major starting at the
/// minimum corner of `dataset`, and their ids are their positions in this order
/// ```
/// # use lascat_core::math::Extent;
/// # use lascat_algorithms::catalog::plan_chunks;
/// let dataset = Extent::new(0.0, 0.0, 1000.0, 700.0).unwrap();
/// let chunks = plan_chunks(&dataset, 500.0, 20.0).unwrap();
/// assert_eq!(chunks.len(), 4);
/// assert_eq!(*chunks[1].core(), Extent::new(500.0, 0.0, 1000.0, 500.0).unwrap());
/// assert_eq!(*chunks[1].padded(), Extent::new(480.0, 0.0, 1000.0, 520.0).unwrap());
/// assert_eq!(*chunks[3].core(), Extent::new(500.0, 500.0, 1000.0, 700.0).unwrap());
/// ```
pub fn plan_chunks(
    dataset: &Extent,
    chunk_size: f64,
    buffer_margin: f64,
) -> ProcessingResult<Vec<Chunk>> {
    if !(chunk_size.is_finite() && chunk_size > 0.0) {
        return Err(ProcessingError::config(format!(
            "Chunk size must be a finite value > 0, but was {}",
            chunk_size
        )));
    }
    validate_buffer(buffer_margin)?;

    let xs = boundaries(dataset.xmin(), dataset.xmax(), chunk_size);
    let ys = boundaries(dataset.ymin(), dataset.ymax(), chunk_size);
    let mut chunks = Vec::with_capacity((xs.len() - 1) * (ys.len() - 1));
    for (row, y) in ys.windows(2).enumerate() {
        for (col, x) in xs.windows(2).enumerate() {
            let core = Extent::new(x[0], y[0], x[1], y[1])?;
            chunks.push(Chunk::at(
                chunks.len(),
                row,
                col,
                core,
                buffer_margin,
                *dataset,
            )?);
        }
    }
    Ok(chunks)
}

/// Plans the chunks over the total extent of all tiles in `index`
pub fn plan_catalog(
    index: &TileIndex,
    chunk_size: f64,
    buffer_margin: f64,
) -> ProcessingResult<Vec<Chunk>> {
    let dataset = index
        .total_extent()
        .ok_or_else(|| ProcessingError::config("The tile index contains no tiles"))?;
    plan_chunks(&dataset, chunk_size, buffer_margin)
}

/// Checks that no two chunks have overlapping core regions
pub fn verify_disjoint_cores(chunks: &[Chunk]) -> ProcessingResult<()> {
    let mut by_xmin = chunks.iter().collect::<Vec<_>>();
    by_xmin.sort_by(|a, b| a.core.xmin().total_cmp(&b.core.xmin()));
    for (index, chunk) in by_xmin.iter().enumerate() {
        for other in by_xmin[index + 1..]
            .iter()
            .take_while(|other| other.core.xmin() < chunk.core.xmax())
        {
            if chunk.core.overlaps_interior(&other.core) {
                let (first, second) = if chunk.id <= other.id {
                    (chunk.id, other.id)
                } else {
                    (other.id, chunk.id)
                };
                return Err(ProcessingError::MergeOverlap { first, second });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration() {
        let dataset = Extent::new(0.0, 0.0, 100.0, 100.0).unwrap();
        for size in &[0.0, -10.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                plan_chunks(&dataset, *size, 0.0),
                Err(ProcessingError::InvalidConfiguration(_))
            ));
        }
        assert!(matches!(
            plan_chunks(&dataset, 10.0, -1.0),
            Err(ProcessingError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            plan_catalog(&TileIndex::new("EPSG:25832", vec![]), 10.0, 1.0),
            Err(ProcessingError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_single_chunk_for_small_and_degenerate_extents() {
        let small = Extent::new(10.0, 10.0, 20.0, 15.0).unwrap();
        let chunks = plan_chunks(&small, 500.0, 30.0).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(*chunks[0].core(), small);
        assert_eq!(*chunks[0].padded(), small);

        let line = Extent::new(0.0, 5.0, 100.0, 5.0).unwrap();
        let chunks = plan_chunks(&line, 30.0, 0.0).unwrap();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.core().height() == 0.0));
    }

    #[test]
    fn test_row_major_ids() {
        let dataset = Extent::new(0.0, 0.0, 30.0, 20.0).unwrap();
        let chunks = plan_chunks(&dataset, 10.0, 0.0).unwrap();
        let positions = chunks
            .iter()
            .map(|c| (c.id(), c.grid_position()))
            .collect::<Vec<_>>();
        assert_eq!(
            positions,
            vec![
                (0, (0, 0)),
                (1, (0, 1)),
                (2, (0, 2)),
                (3, (1, 0)),
                (4, (1, 1)),
                (5, (1, 2))
            ]
        );
    }

    #[test]
    fn test_ownership_is_half_open() {
        let dataset = Extent::new(0.0, 0.0, 20.0, 20.0).unwrap();
        let chunks = plan_chunks(&dataset, 10.0, 2.0).unwrap();
        let owners = |x: f64, y: f64| {
            chunks
                .iter()
                .filter(|c| c.owns(x, y))
                .map(Chunk::id)
                .collect::<Vec<_>>()
        };
        assert_eq!(owners(10.0, 10.0), vec![3]);
        assert_eq!(owners(9.999, 0.0), vec![0]);
        assert_eq!(owners(20.0, 20.0), vec![3]);
        assert_eq!(owners(20.0, 0.0), vec![1]);
        assert_eq!(owners(20.5, 0.0), Vec::<usize>::new());
    }

    #[test]
    fn test_verify_disjoint_cores() {
        let dataset = Extent::new(0.0, 0.0, 20.0, 20.0).unwrap();
        let mut chunks = plan_chunks(&dataset, 10.0, 5.0).unwrap();
        assert!(verify_disjoint_cores(&chunks).is_ok());

        chunks.push(Chunk::new(4, Extent::new(5.0, 5.0, 15.0, 15.0).unwrap(), 0.0, dataset).unwrap());
        assert!(matches!(
            verify_disjoint_cores(&chunks),
            Err(ProcessingError::MergeOverlap { second: 4, .. })
        ));
    }

    #[test]
    fn test_standalone_chunk() {
        let dataset = Extent::new(0.0, 0.0, 20.0, 20.0).unwrap();
        let outside = Extent::new(15.0, 15.0, 25.0, 25.0).unwrap();
        assert!(Chunk::new(0, outside, 0.0, dataset).is_err());

        let whole = Chunk::whole(dataset);
        assert!(whole.owns(20.0, 20.0));
        assert_eq!(whole.padded(), whole.core());
    }
}
