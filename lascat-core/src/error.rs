use thiserror::Error;

/// Errors raised by the core data structures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// An extent whose minimum corner is not less than or equal to its maximum corner, or that has
    /// non-finite coordinates
    #[error("Invalid extent: min ({xmin}, {ymin}) max ({xmax}, {ymax})")]
    InvalidExtent {
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    },
    /// An auxiliary per-point field whose length does not match the number of points in the set
    #[error("Field {name} has {actual} values but the point set holds {expected} points")]
    FieldLengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    /// A raster resolution that is zero, negative or not finite
    #[error("Invalid raster resolution: {0} (must be > 0)")]
    InvalidResolution(f64),
    /// An operation needs an auxiliary per-point field that the point set does not carry
    #[error("Point set has no field {0}")]
    MissingField(String),
}

/// Result type for operations on the core data structures
pub type CoreResult<T> = std::result::Result<T, CoreError>;
