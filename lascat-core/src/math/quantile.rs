use float_ord::FloatOrd;

/// Sorts `values` in ascending order. NaN values are placed at the end
pub fn sort_values(values: &mut [f64]) {
    values.sort_by_key(|v| FloatOrd(*v));
}

/// Computes the `percent`-th percentile of the already sorted `values` using linear interpolation between
/// the closest ranks (the default sample quantile definition of most statistics packages). Returns `None`
/// if `values` is empty or `percent` lies outside of `[0, 100]`
/// ```
/// # use lascat_core::math::percentile_of_sorted;
/// let values = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(percentile_of_sorted(&values, 50.0), Some(3.0));
/// assert_eq!(percentile_of_sorted(&values, 100.0), Some(5.0));
/// assert_eq!(percentile_of_sorted(&values, 25.0), Some(2.0));
/// ```
pub fn percentile_of_sorted(values: &[f64], percent: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&percent) {
        return None;
    }
    let rank = (percent / 100.0) * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(values[lower] + (values[upper] - values[lower]) * fraction)
}

/// Computes the `percent`-th percentile of `values`, which do not have to be sorted
pub fn percentile(values: &[f64], percent: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sort_values(&mut sorted);
    percentile_of_sorted(&sorted, percent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_percentile_interpolates() {
        let values = [10.0, 0.0, 5.0, 20.0];
        // sorted: 0, 5, 10, 20; rank = 0.999 * 3 = 2.997
        let p999 = percentile(&values, 99.9).unwrap();
        assert_approx_eq!(p999, 10.0 + 10.0 * 0.997, 1e-9);
        let p001 = percentile(&values, 0.1).unwrap();
        assert_approx_eq!(p001, 5.0 * 0.003, 1e-9);
    }

    #[test]
    fn test_percentile_edge_cases() {
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(percentile(&[3.0], 99.9), Some(3.0));
        assert_eq!(percentile(&[1.0, 2.0], 101.0), None);
        assert_eq!(percentile(&[1.0, 2.0], -1.0), None);
    }
}
