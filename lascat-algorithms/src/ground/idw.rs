use kd_tree::{KdPoint, KdTree};
use lascat_core::nalgebra::Vector3;

use super::{GroundModel, GroundModelError};

/// A ground sample as stored in the kd-tree, indexed by its horizontal position only
#[derive(Debug, Clone, Copy)]
struct GroundSample {
    xy: [f64; 2],
    z: f64,
}

impl KdPoint for GroundSample {
    type Scalar = f64;
    type Dim = typenum::U2;
    fn at(&self, k: usize) -> f64 {
        self.xy[k]
    }
}

/// Ground surface from inverse distance weighting of the k nearest ground points
pub struct IdwGroundModel {
    tree: KdTree<GroundSample>,
    k: usize,
    power: f64,
}

impl IdwGroundModel {
    /// Builds the model over the given ground points, using the `k` nearest of them with weights
    /// `1 / distance^power` for each query
    pub fn build(ground: &[Vector3<f64>], k: usize, power: f64) -> Result<Self, GroundModelError> {
        if ground.is_empty() {
            return Err(GroundModelError::InsufficientPoints {
                found: 0,
                required: 1,
            });
        }
        let samples = ground
            .iter()
            .map(|position| GroundSample {
                xy: [position.x, position.y],
                z: position.z,
            })
            .collect::<Vec<_>>();
        Ok(Self {
            tree: KdTree::build_by_ordered_float(samples),
            k: k.max(1),
            power,
        })
    }
}

impl GroundModel for IdwGroundModel {
    fn ground_z(&self, x: f64, y: f64) -> Option<f64> {
        let query = GroundSample { xy: [x, y], z: 0.0 };
        let neighbours = self.tree.nearests(&query, self.k);
        if neighbours.is_empty() {
            return None;
        }

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for neighbour in &neighbours {
            if neighbour.squared_distance == 0.0 {
                return Some(neighbour.item.z);
            }
            let weight = 1.0 / neighbour.squared_distance.sqrt().powf(self.power);
            weighted_sum += weight * neighbour.item.z;
            weight_total += weight;
        }
        Some(weighted_sum / weight_total)
    }
}
