use nalgebra::{Point2, Vector3};

/// ASPRS classification code for ground points
pub const CLASS_GROUND: u8 = 2;
/// ASPRS classification code for low noise
pub const CLASS_LOW_NOISE: u8 = 7;
/// ASPRS classification code for high noise
pub const CLASS_HIGH_NOISE: u8 = 18;

/// Bit of the classification flags marking a synthetic point
pub const FLAG_SYNTHETIC: u8 = 0b0001;
/// Bit of the classification flags marking a model key-point
pub const FLAG_KEY_POINT: u8 = 0b0010;
/// Bit of the classification flags marking a withheld point
pub const FLAG_WITHHELD: u8 = 0b0100;
/// Bit of the classification flags marking a point in the overlap of two flight lines
pub const FLAG_OVERLAP: u8 = 0b1000;

/// A single lidar return
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointRecord {
    pub position: Vector3<f64>,
    pub intensity: u16,
    pub return_number: u8,
    pub number_of_returns: u8,
    pub classification: u8,
    pub classification_flags: u8,
}

impl PointRecord {
    /// Creates a single-return point at the given position with all other attributes zeroed
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            return_number: 1,
            number_of_returns: 1,
            ..Default::default()
        }
    }

    /// Builder-style setter for the return number and the number of returns of the pulse
    pub fn with_returns(self, return_number: u8, number_of_returns: u8) -> Self {
        Self {
            return_number,
            number_of_returns,
            ..self
        }
    }

    /// Builder-style setter for the classification code
    pub fn with_classification(self, classification: u8) -> Self {
        Self {
            classification,
            ..self
        }
    }

    /// Builder-style setter for the classification flags
    pub fn with_flags(self, classification_flags: u8) -> Self {
        Self {
            classification_flags,
            ..self
        }
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    /// The horizontal position of this point, which is used for all containment tests
    pub fn xy(&self) -> Point2<f64> {
        Point2::new(self.position.x, self.position.y)
    }

    pub fn is_withheld(&self) -> bool {
        self.classification_flags & FLAG_WITHHELD != 0
    }

    /// Identity of this point for duplicate detection: position and return metadata, compared bitwise with -0.0
    /// equal to 0.0
    pub fn duplicate_key(&self) -> (u64, u64, u64, u8, u8) {
        (
            // adding 0.0 turns -0.0 into 0.0
            (self.position.x + 0.0).to_bits(),
            (self.position.y + 0.0).to_bits(),
            (self.position.z + 0.0).to_bits(),
            self.return_number,
            self.number_of_returns,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_treats_signed_zeros_alike() {
        let a = PointRecord::at(0.0, 5.0, 0.0);
        let b = PointRecord::at(-0.0, 5.0, -0.0);
        assert_eq!(a.duplicate_key(), b.duplicate_key());
        assert_ne!(a.duplicate_key(), PointRecord::at(1e-300, 5.0, 0.0).duplicate_key());
    }

    #[test]
    fn test_duplicate_key_ignores_intensity() {
        let a = PointRecord::at(1.0, 2.0, 3.0).with_returns(1, 2);
        let mut b = a;
        b.intensity = 500;
        assert_eq!(a.duplicate_key(), b.duplicate_key());

        let c = a.with_returns(2, 2);
        assert_ne!(a.duplicate_key(), c.duplicate_key());
    }

    #[test]
    fn test_flags() {
        let p = PointRecord::at(0.0, 0.0, 0.0).with_flags(FLAG_WITHHELD | FLAG_OVERLAP);
        assert!(p.is_withheld());
        assert!(!PointRecord::at(0.0, 0.0, 0.0).is_withheld());
    }
}
