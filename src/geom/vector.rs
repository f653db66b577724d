//! 3D displacement vectors used for moves, normals and wall bases.

use crate::geom::EPS;
use crate::geom::point::Point;
use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Vector {
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.dy * other.dz - self.dz * other.dy,
            self.dz * other.dx - self.dx * other.dz,
            self.dx * other.dy - self.dy * other.dx,
        )
    }

    pub fn dot(self, other: Self) -> f64 {
        self.dx * other.dx + self.dy * other.dy + self.dz * other.dz
    }

    pub fn length(&self) -> f64 {
        self.dot(*self).sqrt()
    }

    pub fn is_close(&self, other: &Self) -> bool {
        (*self - *other).length() < EPS
    }

    /// Unit vector with the same direction; `None` for a zero vector.
    pub fn normalize(&self) -> Option<Self> {
        let len = self.length();
        (len >= EPS).then(|| *self * (1. / len))
    }

    /// Angle to another vector in degrees (0 if either has no length).
    pub fn angle(&self, other: &Self) -> f64 {
        let denom = self.length() * other.length();
        if denom < EPS {
            return 0.;
        }
        (self.dot(*other) / denom).clamp(-1., 1.).acos().to_degrees()
    }

    /// Unit normal of the plane through three points, following their winding.
    ///
    /// `None` when the points are collinear.
    pub fn normal(pt0: Point, pt1: Point, pt2: Point) -> Option<Self> {
        (pt1 - pt0).cross(pt2 - pt0).normalize()
    }
}

impl Add for Vector {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.dx + other.dx, self.dy + other.dy, self.dz + other.dz)
    }
}

impl Sub for Vector {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.dx - other.dx, self.dy - other.dy, self.dz - other.dz)
    }
}

impl Mul<f64> for Vector {
    type Output = Self;
    fn mul(self, factor: f64) -> Self {
        Self::new(self.dx * factor, self.dy * factor, self.dz * factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_of_axes() {
        let up = Vector::new(1., 0., 0.).cross(Vector::new(0., 1., 0.));
        assert_eq!(up, Vector::new(0., 0., 1.));
        assert_eq!(up.length(), 1.);
    }

    #[test]
    fn test_normalize_zero() {
        assert_eq!(Vector::new(0., 4., 0.).normalize(), Some(Vector::new(0., 1., 0.)));
        assert!(Vector::new(0., 0., 0.).normalize().is_none());
    }

    #[test]
    fn test_normal_follows_winding() {
        let a = Point::new(0., 0., 2.);
        let b = Point::new(5., 0., 2.);
        let c = Point::new(5., 5., 2.);
        assert!(Vector::normal(a, b, c).unwrap().is_close(&Vector::new(0., 0., 1.)));
        assert!(Vector::normal(a, c, b).unwrap().is_close(&Vector::new(0., 0., -1.)));
        assert!(Vector::normal(a, b, Point::new(9., 0., 2.)).is_none());
    }

    #[test]
    fn test_angle_between_walls() {
        let south = Vector::new(0., -1., 0.);
        assert!((south.angle(&Vector::new(1., 0., 0.)) - 90.).abs() < 1e-9);
        assert!((south.angle(&Vector::new(0., 3., 0.)) - 180.).abs() < 1e-9);
        assert_eq!(south.angle(&Vector::new(0., 0., 0.)), 0.);
    }
}
