use std::collections::{BTreeMap, BTreeSet};
use std::iter::FromIterator;

use crate::{CoreError, CoreResult};

use super::PointRecord;

/// Name of the auxiliary field holding the height of each point above the interpolated ground surface
pub const HEIGHT_ABOVE_GROUND: &str = "HeightAboveGround";
/// Name of the auxiliary field flagging points as noise (1.0) or regular returns (0.0)
pub const NOISE: &str = "Noise";

/// An ordered collection of [PointRecord]s together with auxiliary per-point scalar fields, addressed by name.
///
/// `PointSet`s are values: all operations that change the content of a set return a new set and leave the
/// original untouched, so sets can be shared freely between threads.
/// ```
/// # use lascat_core::points::{PointRecord, PointSet};
/// let set: PointSet = vec![PointRecord::at(0.0, 0.0, 1.0), PointRecord::at(1.0, 0.0, 2.0)]
///     .into_iter()
///     .collect();
/// let set = set.with_field("Score", vec![0.5, 0.25]).unwrap();
/// let high = set.filter(|point| point.z() > 1.5);
/// assert_eq!(high.len(), 1);
/// assert_eq!(high.field("Score"), Some(&[0.25][..]));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    points: Vec<PointRecord>,
    fields: BTreeMap<String, Vec<f64>>,
}

impl PointSet {
    /// Creates a new empty `PointSet`
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a new `PointSet` holding the given points and no auxiliary fields
    pub fn from_points(points: Vec<PointRecord>) -> Self {
        Self {
            points,
            fields: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PointRecord] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PointRecord> {
        self.points.iter()
    }

    /// Consumes this set and returns its points, dropping all auxiliary fields
    pub fn into_points(self) -> Vec<PointRecord> {
        self.points
    }

    /// Names of all auxiliary fields, in lexicographic order
    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns the values of the auxiliary field `name`, one per point, or `None` if no such field exists
    pub fn field(&self, name: &str) -> Option<&[f64]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    /// Returns a new set with the auxiliary field `name` attached (or replaced). Fails if `values` does not
    /// hold exactly one value per point
    pub fn with_field<S: Into<String>>(self, name: S, values: Vec<f64>) -> CoreResult<Self> {
        let name = name.into();
        if values.len() != self.points.len() {
            return Err(CoreError::FieldLengthMismatch {
                name,
                expected: self.points.len(),
                actual: values.len(),
            });
        }
        let mut fields = self.fields;
        fields.insert(name, values);
        Ok(Self {
            points: self.points,
            fields,
        })
    }

    /// Returns a new set without the auxiliary field `name`
    pub fn without_field(self, name: &str) -> Self {
        let mut fields = self.fields;
        fields.remove(name);
        Self {
            points: self.points,
            fields,
        }
    }

    /// Returns a new set containing all points for which `predicate` returns true, in their original order.
    /// Auxiliary fields are filtered alongside the points
    pub fn filter<F: FnMut(&PointRecord) -> bool>(&self, mut predicate: F) -> Self {
        self.filter_indexed(|_, point| predicate(point))
    }

    /// Like [filter](PointSet::filter), but `predicate` also receives the index of each point within this set
    pub fn filter_indexed<F: FnMut(usize, &PointRecord) -> bool>(&self, mut predicate: F) -> Self {
        let keep = self
            .points
            .iter()
            .enumerate()
            .map(|(index, point)| predicate(index, point))
            .collect::<Vec<_>>();
        let points = self
            .points
            .iter()
            .zip(keep.iter())
            .filter(|(_, keep)| **keep)
            .map(|(point, _)| *point)
            .collect();
        let fields = self
            .fields
            .iter()
            .map(|(name, values)| {
                let kept = values
                    .iter()
                    .zip(keep.iter())
                    .filter(|(_, keep)| **keep)
                    .map(|(value, _)| *value)
                    .collect();
                (name.clone(), kept)
            })
            .collect();
        Self { points, fields }
    }

    /// Concatenates the given sets in order. Fields that are present in only some of the sets are filled
    /// with NaN for the points of the sets that lack them
    /// ```
    /// # use lascat_core::points::{PointRecord, PointSet};
    /// let a = PointSet::from_points(vec![PointRecord::at(0.0, 0.0, 0.0)])
    ///     .with_field("Noise", vec![1.0])
    ///     .unwrap();
    /// let b = PointSet::from_points(vec![PointRecord::at(1.0, 1.0, 1.0)]);
    /// let merged = PointSet::concat(vec![a, b]);
    /// assert_eq!(merged.len(), 2);
    /// assert!(merged.field("Noise").unwrap()[1].is_nan());
    /// ```
    pub fn concat<I: IntoIterator<Item = PointSet>>(sets: I) -> Self {
        let sets = sets.into_iter().collect::<Vec<_>>();
        let names = sets
            .iter()
            .flat_map(|set| set.fields.keys().cloned())
            .collect::<BTreeSet<_>>();
        let total = sets.iter().map(PointSet::len).sum();

        let mut points = Vec::with_capacity(total);
        let mut fields = names
            .into_iter()
            .map(|name| (name, Vec::with_capacity(total)))
            .collect::<BTreeMap<String, Vec<f64>>>();
        for set in sets {
            let count = set.points.len();
            for (name, values) in fields.iter_mut() {
                match set.fields.get(name) {
                    Some(source) => values.extend_from_slice(source),
                    None => values.extend(std::iter::repeat(f64::NAN).take(count)),
                }
            }
            points.extend(set.points);
        }
        Self { points, fields }
    }
}

impl FromIterator<PointRecord> for PointSet {
    fn from_iter<T: IntoIterator<Item = PointRecord>>(iter: T) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a PointRecord;
    type IntoIter = std::slice::Iter<'a, PointRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> PointSet {
        (0..5)
            .map(|i| PointRecord::at(i as f64, 0.0, i as f64 * 2.0))
            .collect()
    }

    #[test]
    fn test_with_field_rejects_wrong_length() {
        let err = sample_set().with_field(NOISE, vec![0.0; 4]).unwrap_err();
        assert_eq!(
            err,
            CoreError::FieldLengthMismatch {
                name: NOISE.into(),
                expected: 5,
                actual: 4
            }
        );
    }

    #[test]
    fn test_filter_keeps_fields_aligned() {
        let set = sample_set()
            .with_field(HEIGHT_ABOVE_GROUND, vec![0.0, 1.0, 2.0, 3.0, 4.0])
            .unwrap();
        let odd = set.filter_indexed(|index, _| index % 2 == 1);
        assert_eq!(odd.len(), 2);
        assert_eq!(odd.points()[0].x(), 1.0);
        assert_eq!(odd.field(HEIGHT_ABOVE_GROUND), Some(&[1.0, 3.0][..]));
        // the source set is untouched
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_concat_preserves_order() {
        let a = sample_set();
        let b = sample_set().filter(|p| p.x() > 2.0);
        let merged = PointSet::concat(vec![a.clone(), b]);
        assert_eq!(merged.len(), 7);
        assert_eq!(&merged.points()[..5], a.points());
        assert_eq!(merged.points()[5].x(), 3.0);
        assert_eq!(merged.field_names().count(), 0);
    }

    #[test]
    fn test_without_field() {
        let set = sample_set().with_field(NOISE, vec![0.0; 5]).unwrap();
        assert!(set.has_field(NOISE));
        assert!(!set.without_field(NOISE).has_field(NOISE));
    }
}
