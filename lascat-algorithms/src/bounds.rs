use lascat_core::{
    math::Extent,
    points::{PointRecord, PointSet},
};

/// Calculate the horizontal extent of the points in the given `points`. Returns `None` if the set contains zero
/// points
pub fn calculate_extent(points: &PointSet) -> Option<Extent> {
    Extent::from_points(points.iter().map(PointRecord::xy))
}

/// Calculate the minimum and maximum z value of the given `points`. Returns `None` if the set contains zero points
pub fn calculate_z_range(points: &PointSet) -> Option<(f64, f64)> {
    points.iter().fold(None, |range, point| match range {
        None => Some((point.z(), point.z())),
        Some((min, max)) => Some((min.min(point.z()), max.max(point.z()))),
    })
}
