//! Interpolation of a continuous ground surface from the ground-classified returns of a point set

mod idw;
pub use self::idw::*;

mod tin;
pub use self::tin::*;

use lascat_core::nalgebra::Vector3;
use thiserror::Error;

/// A ground surface that can be evaluated at arbitrary horizontal positions
pub trait GroundModel: Send + Sync {
    /// Returns the interpolated ground elevation at (x, y), or `None` if the model is undefined at this position
    fn ground_z(&self, x: f64, y: f64) -> Option<f64>;
}

/// Errors that prevent building a [GroundModel]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GroundModelError {
    /// Fewer ground points than the interpolation algorithm requires
    #[error("Found {found} ground points but at least {required} are required")]
    InsufficientPoints { found: usize, required: usize },
    /// Enough ground points, but they do not span an area (e.g. all on one line)
    #[error("The {0} ground points are collinear and cannot be triangulated")]
    Degenerate(usize),
}

/// Interpolation algorithm for the ground surface
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "algorithm", rename_all = "kebab-case")
)]
pub enum GroundAlgorithm {
    /// Linear interpolation on the Delaunay triangulation of the ground points. Exact within the convex hull of
    /// the ground points and undefined outside of it, unless `extrapolate` is set, in which case positions
    /// outside of the hull are interpolated from their three nearest ground points
    Triangulation { extrapolate: bool },
    /// Inverse distance weighting of the `k` nearest ground points with weights `1 / distance^power`
    KnnIdw { k: usize, power: f64 },
}

impl GroundAlgorithm {
    /// The minimum number of ground points the algorithm needs
    pub fn min_points(&self) -> usize {
        match self {
            GroundAlgorithm::Triangulation { .. } => 3,
            GroundAlgorithm::KnnIdw { .. } => 1,
        }
    }

    /// kNN-IDW with 6 neighbours and a power of 2
    pub fn knn_idw() -> Self {
        GroundAlgorithm::KnnIdw { k: 6, power: 2.0 }
    }
}

impl Default for GroundAlgorithm {
    fn default() -> Self {
        GroundAlgorithm::Triangulation { extrapolate: false }
    }
}

/// Builds the ground model for the given ground positions with the given `algorithm`
pub fn build_ground_model(
    ground: &[Vector3<f64>],
    algorithm: &GroundAlgorithm,
) -> Result<Box<dyn GroundModel>, GroundModelError> {
    let required = algorithm.min_points();
    if ground.len() < required {
        return Err(GroundModelError::InsufficientPoints {
            found: ground.len(),
            required,
        });
    }
    match algorithm {
        GroundAlgorithm::Triangulation { extrapolate } => {
            let model = TinGroundModel::build(ground)?;
            if *extrapolate {
                Ok(Box::new(model.with_extrapolation(IdwGroundModel::build(ground, 3, 1.0)?)))
            } else {
                Ok(Box::new(model))
            }
        }
        GroundAlgorithm::KnnIdw { k, power } => {
            Ok(Box::new(IdwGroundModel::build(ground, *k, *power)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn plane(x: f64, y: f64) -> f64 {
        100.0 + 0.5 * x - 0.25 * y
    }

    fn plane_samples() -> Vec<Vector3<f64>> {
        let mut samples = vec![];
        for i in 0..=10 {
            for j in 0..=10 {
                let (x, y) = (i as f64 * 10.0, j as f64 * 10.0);
                samples.push(Vector3::new(x, y, plane(x, y)));
            }
        }
        samples
    }

    #[test]
    fn test_insufficient_points() {
        let ground = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)];
        let err = build_ground_model(&ground, &GroundAlgorithm::default())
            .err()
            .unwrap();
        assert_eq!(
            err,
            GroundModelError::InsufficientPoints {
                found: 2,
                required: 3
            }
        );
        assert!(build_ground_model(&[], &GroundAlgorithm::knn_idw()).is_err());
        assert!(build_ground_model(&ground[..1], &GroundAlgorithm::knn_idw()).is_ok());
    }

    #[test]
    fn test_tin_reproduces_plane() {
        let model = build_ground_model(&plane_samples(), &GroundAlgorithm::default()).unwrap();
        for (x, y) in &[(5.0, 5.0), (33.3, 71.1), (99.0, 1.0), (50.0, 50.0)] {
            assert_approx_eq!(model.ground_z(*x, *y).unwrap(), plane(*x, *y), 1e-6);
        }
        assert_eq!(model.ground_z(150.0, 50.0), None);
    }

    #[test]
    fn test_tin_extrapolation() {
        let algorithm = GroundAlgorithm::Triangulation { extrapolate: true };
        let model = build_ground_model(&plane_samples(), &algorithm).unwrap();
        assert!(model.ground_z(150.0, 50.0).is_some());
    }

    #[test]
    fn test_idw_exact_at_samples() {
        let model = build_ground_model(&plane_samples(), &GroundAlgorithm::knn_idw()).unwrap();
        assert_approx_eq!(model.ground_z(20.0, 30.0).unwrap(), plane(20.0, 30.0), 1e-9);
        // far outside of the samples the model still answers
        assert!(model.ground_z(1000.0, 1000.0).is_some());
    }
}
