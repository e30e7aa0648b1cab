use std::collections::HashMap;

use lascat_core::{
    CoreResult,
    math::{percentile_of_sorted, sort_values, Extent},
    points::{PointSet, NOISE},
};

/// Parameters of the percentile-grid noise filter
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DenoiseParams {
    /// Cell size of the coarse grid on which the z percentiles are computed
    pub grid_resolution: f64,
    /// Points higher than the upper percentile of their cell by more than this distance are noise
    pub above_threshold: f64,
    /// Points lower than the lower percentile of their cell by more than this distance are noise
    pub below_threshold: f64,
    /// Upper percentile in `[0, 100]`
    pub upper_percentile: f64,
    /// Lower percentile in `[0, 100]`
    pub lower_percentile: f64,
    /// Cells with fewer points than this pass all their points through unfiltered
    pub min_cell_points: usize,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            grid_resolution: 10.0,
            above_threshold: 5.0,
            below_threshold: 2.0,
            upper_percentile: 99.9,
            lower_percentile: 0.1,
            min_cell_points: 5,
        }
    }
}

/// Coarse grid overlaid on a region, used to bucket points by their horizontal position. Only cells that
/// receive points are materialized, keyed by (row, col)
struct CoarseGrid {
    origin_x: f64,
    origin_y: f64,
    resolution: f64,
    cols: usize,
    rows: usize,
}

impl CoarseGrid {
    fn new(region: &Extent, resolution: f64) -> Self {
        Self {
            origin_x: region.xmin(),
            origin_y: region.ymin(),
            resolution,
            cols: ((region.width() / resolution).ceil() as usize).max(1),
            rows: ((region.height() / resolution).ceil() as usize).max(1),
        }
    }

    /// (row, col) of the cell containing (x, y). Positions outside of the region are clamped to the border cells
    fn cell_of(&self, x: f64, y: f64) -> (usize, usize) {
        let clamp = |value: f64, count: usize| -> usize {
            if value <= 0.0 {
                0
            } else {
                (value as usize).min(count - 1)
            }
        };
        let col = clamp(((x - self.origin_x) / self.resolution).floor(), self.cols);
        let row = clamp(((y - self.origin_y) / self.resolution).floor(), self.rows);
        (row, col)
    }
}

/// Computes for every point in `points` whether it is noise. The percentile grid is laid over `region`, which
/// should be the region the points were loaded from
fn noise_mask(points: &PointSet, region: &Extent, params: &DenoiseParams) -> Vec<bool> {
    let grid = CoarseGrid::new(region, params.grid_resolution);
    let cells = points
        .iter()
        .map(|point| grid.cell_of(point.x(), point.y()))
        .collect::<Vec<_>>();

    let mut cell_values: HashMap<(usize, usize), Vec<f64>> = HashMap::new();
    for (point, cell) in points.iter().zip(cells.iter()) {
        cell_values.entry(*cell).or_default().push(point.z());
    }

    // (lower limit, upper limit) per occupied cell, None for cells that are too sparse
    let limits = cell_values
        .into_iter()
        .map(|(cell, mut values)| {
            if values.len() < params.min_cell_points.max(1) {
                return (cell, None);
            }
            sort_values(&mut values);
            let limits = percentile_of_sorted(&values, params.upper_percentile)
                .zip(percentile_of_sorted(&values, params.lower_percentile))
                .map(|(upper, lower)| {
                    (lower - params.below_threshold, upper + params.above_threshold)
                });
            (cell, limits)
        })
        .collect::<HashMap<_, _>>();

    points
        .iter()
        .zip(cells.iter())
        .map(|(point, cell)| match limits.get(cell).copied().flatten() {
            Some((lower, upper)) => point.z() > upper || point.z() < lower,
            None => false,
        })
        .collect()
}

/// Attaches the [NOISE] field to `points`: 1.0 for points that lie too far above the upper or below the lower
/// z percentile of their coarse grid cell, 0.0 for all other points. No point is removed
pub fn classify_noise(
    points: &PointSet,
    region: &Extent,
    params: &DenoiseParams,
) -> CoreResult<PointSet> {
    let flags = noise_mask(points, region, params)
        .into_iter()
        .map(|noise| if noise { 1.0 } else { 0.0 })
        .collect();
    points.clone().with_field(NOISE, flags)
}

/// Removes all points from `points` that [classify_noise] would flag as noise
/// ```
/// # use lascat_core::math::Extent;
/// # use lascat_core::points::{PointRecord, PointSet};
/// # use lascat_algorithms::denoise::{denoise, DenoiseParams};
/// let mut points = (0..500)
///     .map(|i| PointRecord::at((i % 20) as f64 * 0.5, (i / 20) as f64 * 0.4, 10.0 + (i % 3) as f64))
///     .collect::<Vec<_>>();
/// points.push(PointRecord::at(5.0, 5.0, 200.0));
/// let points = PointSet::from_points(points);
/// let region = Extent::new(0.0, 0.0, 10.0, 10.0).unwrap();
/// let cleaned = denoise(&points, &region, &DenoiseParams::default());
/// assert_eq!(cleaned.len(), 500);
/// ```
pub fn denoise(points: &PointSet, region: &Extent, params: &DenoiseParams) -> PointSet {
    let mask = noise_mask(points, region, params);
    points.filter_indexed(|index, _| !mask[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use lascat_core::points::PointRecord;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn region() -> Extent {
        Extent::new(0.0, 0.0, 20.0, 20.0).unwrap()
    }

    /// 400 points of canopy between 0 and 30 units over a 20x20 region
    fn canopy(seed: u64) -> Vec<PointRecord> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..400)
            .map(|_| {
                PointRecord::at(
                    rng.gen_range(0.0..20.0),
                    rng.gen_range(0.0..20.0),
                    rng.gen_range(0.0..30.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_removes_high_and_low_outliers() {
        let mut points = canopy(1);
        points.push(PointRecord::at(3.0, 3.0, 250.0));
        points.push(PointRecord::at(15.0, 15.0, -40.0));
        let points = PointSet::from_points(points);

        let cleaned = denoise(&points, &region(), &DenoiseParams::default());
        assert_eq!(cleaned.len(), 400);
        assert!(cleaned.iter().all(|p| p.z() >= 0.0 && p.z() < 30.0));
    }

    #[test]
    fn test_fine_grid_over_large_region() {
        // 50 000 x 50 000 cells, of which only the occupied ones are allocated
        let region = Extent::new(0.0, 0.0, 500.0, 500.0).unwrap();
        let params = DenoiseParams {
            grid_resolution: 0.01,
            ..Default::default()
        };
        let mut points = (0..2000)
            .map(|i| PointRecord::at(100.005 + (i % 3) as f64 * 0.001, 100.005, 10.0))
            .collect::<Vec<_>>();
        points.push(PointRecord::at(100.006, 100.005, 500.0));
        // alone in its cell, so it passes through
        points.push(PointRecord::at(400.005, 400.005, 500.0));
        let points = PointSet::from_points(points);
        let cleaned = denoise(&points, &region, &params);
        assert_eq!(cleaned.len(), 2001);
        assert!(cleaned.iter().all(|p| p.z() < 500.0 || p.x() > 400.0));
    }

    #[test]
    fn test_sparse_cells_pass_through() {
        let points = PointSet::from_points(vec![
            PointRecord::at(1.0, 1.0, 0.0),
            PointRecord::at(1.5, 1.0, 0.5),
            PointRecord::at(2.0, 1.0, 900.0),
        ]);
        let cleaned = denoise(&points, &region(), &DenoiseParams::default());
        assert_eq!(cleaned, points);
    }

    #[test]
    fn test_classify_noise_attaches_flags() {
        let mut points = canopy(2);
        points.push(PointRecord::at(3.0, 3.0, 250.0));
        let points = PointSet::from_points(points);
        let classified = classify_noise(&points, &region(), &DenoiseParams::default()).unwrap();
        assert_eq!(classified.len(), points.len());
        let flags = classified.field(NOISE).unwrap();
        assert_eq!(flags.iter().filter(|f| **f == 1.0).count(), 1);
        assert_eq!(flags[400], 1.0);
    }

    #[test]
    fn test_above_threshold_is_monotonic() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut points = canopy(4);
        for _ in 0..40 {
            points.push(PointRecord::at(
                rng.gen_range(0.0..20.0),
                rng.gen_range(0.0..20.0),
                rng.gen_range(30.0..60.0),
            ));
        }
        let points = PointSet::from_points(points);

        let mut previous_removed = usize::MAX;
        for above in &[0.0, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0] {
            let params = DenoiseParams {
                above_threshold: *above,
                below_threshold: f64::INFINITY,
                ..Default::default()
            };
            let removed = points.len() - denoise(&points, &region(), &params).len();
            assert!(
                removed <= previous_removed,
                "raising the threshold to {} removed {} points, more than the {} before",
                above,
                removed,
                previous_removed
            );
            previous_removed = removed;
        }
    }
}
