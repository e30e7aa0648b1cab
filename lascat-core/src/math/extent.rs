use std::fmt::Display;

use nalgebra::Point2;

use crate::{CoreError, CoreResult};

/// 2D axis-aligned rectangle in the horizontal plane of a dataset
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Extent {
    min: Point2<f64>,
    max: Point2<f64>,
}

impl Extent {
    /// Creates a new extent from the given coordinates. Returns an error if the minimum corner is not less
    /// than or equal to the maximum corner, or if any coordinate is not finite
    /// ```
    /// # use lascat_core::math::Extent;
    /// let extent = Extent::new(0.0, 0.0, 10.0, 5.0).unwrap();
    /// assert_eq!(extent.width(), 10.0);
    /// assert!(Extent::new(1.0, 0.0, 0.0, 1.0).is_err());
    /// ```
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> CoreResult<Self> {
        Self::from_min_max(Point2::new(xmin, ymin), Point2::new(xmax, ymax))
    }

    /// Creates a new extent from the given minimum and maximum corners. Fails if the minimum corner is not
    /// less than or equal to the maximum corner
    pub fn from_min_max(min: Point2<f64>, max: Point2<f64>) -> CoreResult<Self> {
        let finite = min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite();
        if !finite || min.x > max.x || min.y > max.y {
            return Err(CoreError::InvalidExtent {
                xmin: min.x,
                ymin: min.y,
                xmax: max.x,
                ymax: max.y,
            });
        }
        Ok(Self { min, max })
    }

    /// Creates a new extent from the given minimum and maximum corners. Similar to [from_min_max](Extent::from_min_max)
    /// but performs no checks that min <= max. If you know that min <= max, prefer this function over [from_min_max](Extent::from_min_max)
    pub fn from_min_max_unchecked(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self { min, max }
    }

    /// Computes the smallest extent containing all of the given points. Returns `None` if the iterator is empty
    /// ```
    /// # use lascat_core::math::Extent;
    /// # use lascat_core::nalgebra::Point2;
    /// let extent = Extent::from_points(vec![Point2::new(1.0, 4.0), Point2::new(-1.0, 2.0)]).unwrap();
    /// assert_eq!(*extent.min(), Point2::new(-1.0, 2.0));
    /// assert_eq!(*extent.max(), Point2::new(1.0, 4.0));
    /// ```
    pub fn from_points<I: IntoIterator<Item = Point2<f64>>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut extent = Self::from_min_max_unchecked(first, first);
        for point in iter {
            extent = Self::extend_with_point(&extent, &point);
        }
        Some(extent)
    }

    /// Returns the minimum corner of this extent
    pub fn min(&self) -> &Point2<f64> {
        &self.min
    }

    /// Returns the maximum corner of this extent
    pub fn max(&self) -> &Point2<f64> {
        &self.max
    }

    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    /// Size of this extent along the x axis
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Size of this extent along the y axis
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Returns true if the given position lies within this extent. Positions right on the boundary
    /// (e.g. x == self.max.x) count as contained
    /// ```
    /// # use lascat_core::math::Extent;
    /// let extent = Extent::new(0.0, 0.0, 1.0, 1.0).unwrap();
    /// assert!(extent.contains(1.0, 0.5));
    /// assert!(!extent.contains(1.0001, 0.5));
    /// ```
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min.x && x <= self.max.x && y >= self.min.y && y <= self.max.y
    }

    /// Returns true if `other` lies completely within this extent
    pub fn contains_extent(&self, other: &Extent) -> bool {
        other.min.x >= self.min.x
            && other.max.x <= self.max.x
            && other.min.y >= self.min.y
            && other.max.y <= self.max.y
    }

    /// Performs an intersection test between this extent and `other`. Extents that merely touch along an edge
    /// or a corner count as intersecting
    pub fn intersects(&self, other: &Extent) -> bool {
        (self.min.x <= other.max.x && self.max.x >= other.min.x)
            && (self.min.y <= other.max.y && self.max.y >= other.min.y)
    }

    /// Returns true if the intersection of this extent and `other` has a positive area. Unlike
    /// [intersects](Extent::intersects), shared edges do not count
    /// ```
    /// # use lascat_core::math::Extent;
    /// let a = Extent::new(0.0, 0.0, 1.0, 1.0).unwrap();
    /// let b = Extent::new(1.0, 0.0, 2.0, 1.0).unwrap();
    /// assert!(a.intersects(&b));
    /// assert!(!a.overlaps_interior(&b));
    /// ```
    pub fn overlaps_interior(&self, other: &Extent) -> bool {
        (self.min.x < other.max.x && self.max.x > other.min.x)
            && (self.min.y < other.max.y && self.max.y > other.min.y)
    }

    /// Computes the intersection of this extent with `other`, or `None` if the two do not intersect
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        if !self.intersects(other) {
            return None;
        }
        Some(Self {
            min: Point2::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y)),
            max: Point2::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y)),
        })
    }

    /// Computes the union of the given extents. The union of two extents a and b is defined as the
    /// smallest extent that fully contains both a and b.
    pub fn union(a: &Extent, b: &Extent) -> Self {
        Self {
            min: Point2::new(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
            max: Point2::new(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
        }
    }

    /// Extends the given extent so that it contains the given point
    pub fn extend_with_point(extent: &Extent, point: &Point2<f64>) -> Extent {
        Self {
            min: Point2::new(extent.min.x.min(point.x), extent.min.y.min(point.y)),
            max: Point2::new(extent.max.x.max(point.x), extent.max.y.max(point.y)),
        }
    }

    /// Grows this extent by `margin` on all four sides. A negative margin shrinks the extent, but never
    /// past its center
    /// ```
    /// # use lascat_core::math::Extent;
    /// let extent = Extent::new(0.0, 0.0, 10.0, 10.0).unwrap().expand(2.5);
    /// assert_eq!(extent, Extent::new(-2.5, -2.5, 12.5, 12.5).unwrap());
    /// ```
    pub fn expand(&self, margin: f64) -> Extent {
        if margin >= 0.0 {
            Self {
                min: Point2::new(self.min.x - margin, self.min.y - margin),
                max: Point2::new(self.max.x + margin, self.max.y + margin),
            }
        } else {
            let center = self.center();
            let half_width = (self.width() / 2.0 + margin).max(0.0);
            let half_height = (self.height() / 2.0 + margin).max(0.0);
            Self {
                min: Point2::new(center.x - half_width, center.y - half_height),
                max: Point2::new(center.x + half_width, center.y + half_height),
            }
        }
    }

    /// Restricts this extent to the area covered by `bounds`. Returns `None` if the two are disjoint
    pub fn clip_to(&self, bounds: &Extent) -> Option<Extent> {
        self.intersection(bounds)
    }
}

impl Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}] - [{}, {}]",
            self.min.x, self.min.y, self.max.x, self.max.y
        )
    }
}
