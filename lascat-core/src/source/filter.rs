use crate::points::{PointRecord, CLASS_HIGH_NOISE, CLASS_LOW_NOISE};

/// Predicate applied by a [PointSource](super::PointSource) while reading, so that unwanted points never
/// reach the processing stages
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PointFilter {
    /// Drop points with an invalid return number of 0
    pub drop_zero_return_number: bool,
    /// Drop points that carry the withheld classification flag
    pub drop_withheld: bool,
    /// Drop points already classified as low or high noise by the data provider
    pub drop_noise_classes: bool,
    /// If set, keep only points with one of these classification codes
    pub keep_classes: Option<Vec<u8>>,
}

impl PointFilter {
    /// A filter that accepts every point
    pub fn accept_all() -> Self {
        Default::default()
    }

    /// Returns true if `point` passes this filter
    /// ```
    /// # use lascat_core::points::PointRecord;
    /// # use lascat_core::source::PointFilter;
    /// let filter = PointFilter { drop_zero_return_number: true, ..Default::default() };
    /// assert!(filter.accepts(&PointRecord::at(0.0, 0.0, 0.0)));
    /// assert!(!filter.accepts(&PointRecord::at(0.0, 0.0, 0.0).with_returns(0, 1)));
    /// ```
    pub fn accepts(&self, point: &PointRecord) -> bool {
        if self.drop_zero_return_number && point.return_number == 0 {
            return false;
        }
        if self.drop_withheld && point.is_withheld() {
            return false;
        }
        if self.drop_noise_classes
            && (point.classification == CLASS_LOW_NOISE
                || point.classification == CLASS_HIGH_NOISE)
        {
            return false;
        }
        match &self.keep_classes {
            Some(classes) => classes.contains(&point.classification),
            None => true,
        }
    }
}
