//! World positions.
//!
//! Endpoints and receivers report their location as a [`Vec3`]. Only
//! Euclidean distance matters to the topology; axes carry no meaning beyond
//! `y` being altitude for [`RangeConfig`](crate::RangeConfig).

use std::ops::Sub;

/// A position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Origin of the coordinate system.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    /// Create a new position.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean distance. Avoids the square root when only comparing.
    pub fn distance_sq(&self, other: &Self) -> f64 {
        let d = *self - *other;
        d.x * d.x + d.y * d.y + d.z * d.z
    }

    /// Euclidean distance between two positions.
    pub fn distance(&self, other: &Self) -> f64 {
        self.distance_sq(other).sqrt()
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_is_zero() {
        assert_eq!(Vec3::ORIGIN, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(Vec3::ORIGIN.distance(&Vec3::ORIGIN), 0.0);
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 6.0, 3.0);

        assert_eq!(a.distance_sq(&b), 25.0);
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn distance_symmetric() {
        let a = Vec3::new(-3.5, 7.0, 12.25);
        let b = Vec3::new(10.0, -1.0, 0.5);

        assert_eq!(a.distance(&b), b.distance(&a));
    }

    #[test]
    fn subtraction() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, -1.0, 2.0);

        assert_eq!(a - b, Vec3::new(-3.0, 3.0, 1.0));
        assert_eq!(b - b, Vec3::ORIGIN);
    }

    #[test]
    fn display_format() {
        assert_eq!(Vec3::new(1.0, -2.5, 0.0).to_string(), "(1, -2.5, 0)");
    }
}
