use lascat_core::{
    nalgebra::Vector3,
    points::{PointSet, CLASS_GROUND, HEIGHT_ABOVE_GROUND},
    CoreResult,
};

use crate::ground::{build_ground_model, GroundAlgorithm, GroundModel, GroundModelError};

/// What to do with a chunk whose ground model can not be built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum GroundFailurePolicy {
    /// The chunk fails and contributes nothing to the merged product
    DropChunk,
    /// The chunk is kept without the height above ground field, and a warning is recorded
    SkipNormalize,
}

impl Default for GroundFailurePolicy {
    fn default() -> Self {
        GroundFailurePolicy::DropChunk
    }
}

/// Parameters of the height normalization stage
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NormalizeParams {
    pub algorithm: GroundAlgorithm,
    /// Classification code of the ground returns that the ground model is built from
    pub ground_class: u8,
    /// Lower bound for the number of ground points. The algorithm's own minimum applies if it is larger
    pub min_ground_points: usize,
    pub on_failure: GroundFailurePolicy,
}

impl NormalizeParams {
    /// The number of ground points that is required for these parameters
    pub fn required_ground_points(&self) -> usize {
        self.min_ground_points.max(self.algorithm.min_points())
    }
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            algorithm: Default::default(),
            ground_class: CLASS_GROUND,
            min_ground_points: 3,
            on_failure: Default::default(),
        }
    }
}

/// Positions of all points in `points` with the classification `ground_class`
pub fn ground_positions(points: &PointSet, ground_class: u8) -> Vec<Vector3<f64>> {
    points
        .iter()
        .filter(|point| point.classification == ground_class)
        .map(|point| point.position)
        .collect()
}

/// Builds the ground model for `points` as configured by `params`
pub fn ground_model_for(
    points: &PointSet,
    params: &NormalizeParams,
) -> Result<Box<dyn GroundModel>, GroundModelError> {
    let ground = ground_positions(points, params.ground_class);
    let required = params.required_ground_points();
    if ground.len() < required {
        return Err(GroundModelError::InsufficientPoints {
            found: ground.len(),
            required,
        });
    }
    build_ground_model(&ground, &params.algorithm)
}

/// Attaches the [HEIGHT_ABOVE_GROUND] field (`z - ground(x, y)`) to all points. Points at positions where the
/// ground model is undefined are dropped
/// ```
/// # use lascat_core::points::{PointRecord, PointSet, CLASS_GROUND, HEIGHT_ABOVE_GROUND};
/// # use lascat_algorithms::ground::GroundModel;
/// # use lascat_algorithms::normalize::normalize_height;
/// struct Flat;
/// impl GroundModel for Flat {
///     fn ground_z(&self, x: f64, _y: f64) -> Option<f64> {
///         if x < 10.0 { Some(100.0) } else { None }
///     }
/// }
/// let points: PointSet = vec![PointRecord::at(1.0, 1.0, 112.5), PointRecord::at(20.0, 1.0, 130.0)]
///     .into_iter()
///     .collect();
/// let normalized = normalize_height(&points, &Flat).unwrap();
/// assert_eq!(normalized.len(), 1);
/// assert_eq!(normalized.field(HEIGHT_ABOVE_GROUND).unwrap(), &[12.5]);
/// ```
pub fn normalize_height(points: &PointSet, ground: &dyn GroundModel) -> CoreResult<PointSet> {
    let heights = points
        .iter()
        .map(|point| match ground.ground_z(point.x(), point.y()) {
            Some(ground_z) => point.z() - ground_z,
            None => f64::NAN,
        })
        .collect::<Vec<_>>();
    let defined = heights.iter().map(|h| !h.is_nan()).collect::<Vec<_>>();
    let with_heights = points.clone().with_field(HEIGHT_ABOVE_GROUND, heights)?;
    if defined.iter().all(|d| *d) {
        return Ok(with_heights);
    }
    Ok(with_heights.filter_indexed(|index, _| defined[index]))
}
