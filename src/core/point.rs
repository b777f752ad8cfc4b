//! Three-component point/vector used for ECEF positions and, with `z = 0`,
//! for radar coordinates (`x` = pixel, `y` = line).

use crate::types::{SarError, SarResult};
use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Point in radar geometry: `x` = pixel, `y` = line
    pub const fn new_2d(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub const fn from_array(xyz: [f64; 3]) -> Self {
        Self::new(xyz[0], xyz[1], xyz[2])
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Component-wise difference `self - other`
    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(&self, factor: f64) -> Point {
        Point::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Inner product
    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Outer (cross) product
    pub fn cross(&self, other: &Point) -> Point {
        Point::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm2(&self) -> f64 {
        self.dot(self)
    }

    pub fn norm(&self) -> f64 {
        self.norm2().sqrt()
    }

    /// Unit vector in the direction of `self`
    pub fn normalize(&self) -> SarResult<Point> {
        let norm = self.norm();
        if norm == 0.0 || !norm.is_finite() {
            return Err(SarError::DivisionByZero(format!(
                "cannot normalize vector {} of length {}",
                self, norm
            )));
        }
        Ok(self.scale(1.0 / norm))
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.subtract(other).norm()
    }

    /// Angle between two vectors in radians, in [0, pi]
    pub fn angle(&self, other: &Point) -> SarResult<f64> {
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            return Err(SarError::DivisionByZero(
                "angle with zero-length vector".to_string(),
            ));
        }
        // clamp rounding just outside [-1, 1]
        Ok((self.dot(other) / denom).clamp(-1.0, 1.0).acos())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.6}, {:.6}, {:.6}]", self.x, self.y, self.z)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        self.subtract(&rhs)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        self.scale(rhs)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        self.scale(-1.0)
    }
}

impl From<[f64; 3]> for Point {
    fn from(xyz: [f64; 3]) -> Self {
        Point::from_array(xyz)
    }
}

impl AbsDiffEq for Point {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.x.abs_diff_eq(&other.x, epsilon)
            && self.y.abs_diff_eq(&other.y, epsilon)
            && self.z.abs_diff_eq(&other.z, epsilon)
    }
}

impl RelativeEq for Point {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.x.relative_eq(&other.x, epsilon, max_relative)
            && self.y.relative_eq(&other.y, epsilon, max_relative)
            && self.z.relative_eq(&other.z, epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_arithmetic() {
        let a = Point::new(1.0, 2.0, 3.0);
        let b = Point::new(4.0, -5.0, 6.0);

        assert_eq!(a + b, Point::new(5.0, -3.0, 9.0));
        assert_eq!(a - b, Point::new(-3.0, 7.0, -3.0));
        assert_eq!(a.subtract(&b), a - b);
        assert_eq!(a * 2.0, Point::new(2.0, 4.0, 6.0));
        assert_eq!(-a, Point::new(-1.0, -2.0, -3.0));
        assert_eq!(a.dot(&b), 4.0 - 10.0 + 18.0);
        assert_eq!(a.to_array(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_cross_and_angle() {
        let x = Point::new(1.0, 0.0, 0.0);
        let y = Point::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Point::new(0.0, 0.0, 1.0));
        assert_abs_diff_eq!(x.angle(&y).unwrap(), std::f64::consts::FRAC_PI_2, epsilon = 1e-15);
        assert_abs_diff_eq!(x.angle(&x).unwrap(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_norm_and_normalize() {
        let p = Point::new(3.0, 4.0, 12.0);
        assert_eq!(p.norm(), 13.0);
        assert_eq!(p.distance(&Point::default()), 13.0);

        let unit = p.normalize().unwrap();
        assert_abs_diff_eq!(unit.norm(), 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(unit, Point::new(3.0 / 13.0, 4.0 / 13.0, 12.0 / 13.0), epsilon = 1e-15);
    }

    #[test]
    fn test_normalize_zero_vector_is_error() {
        let zero = Point::default();
        assert!(matches!(zero.normalize(), Err(SarError::DivisionByZero(_))));
        assert!(zero.angle(&Point::new(1.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_2d_point_has_zero_height() {
        let pixel = Point::new_2d(111.0, 11111.0);
        assert_eq!(pixel.z, 0.0);
        assert_eq!(pixel.x, 111.0);
        assert_eq!(pixel.y, 11111.0);
    }
}
