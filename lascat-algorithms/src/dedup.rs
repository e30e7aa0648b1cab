use std::collections::HashSet;

use lascat_core::points::PointSet;

/// Removes exact duplicate points from `points`. Two points are duplicates if they share the same x, y and z
/// coordinates, return number and number of returns. The first occurrence of each point is kept, all later
/// occurrences are dropped, so the relative order of the remaining points is unchanged.
///
/// Deduplication is idempotent: applying it to its own output returns an identical set.
/// ```
/// # use lascat_core::points::{PointRecord, PointSet};
/// # use lascat_algorithms::dedup::deduplicate;
/// let points: PointSet = vec![
///     PointRecord::at(1.0, 1.0, 1.0),
///     PointRecord::at(1.0, 1.0, 1.0),
///     PointRecord::at(1.0, 1.0, 1.0).with_returns(2, 2),
/// ]
/// .into_iter()
/// .collect();
/// assert_eq!(deduplicate(&points).len(), 2);
/// ```
pub fn deduplicate(points: &PointSet) -> PointSet {
    let mut seen = HashSet::with_capacity(points.len());
    points.filter(|point| seen.insert(point.duplicate_key()))
}
