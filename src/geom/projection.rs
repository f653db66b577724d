use crate::geom::point::{Point, Point2};
use crate::geom::vector::Vector;

/// Orthonormal basis for projecting 3D points onto a 2D plane and back.
#[derive(Debug, Clone, Copy)]
pub struct PlaneBasis {
    pub origin: Point,
    pub u: Vector,
    pub v: Vector,
}

impl PlaneBasis {
    /// Creates a `PlaneBasis` from the first three vertices of a polygon.
    pub fn from_polygon(poly: &[Point]) -> Option<Self> {
        if poly.len() < 3 {
            return None;
        }
        let n = Vector::normal(poly[0], poly[1], poly[2])?;

        Self::build(poly[0], n)
    }

    /// Creates a `PlaneBasis` from an origin point and a normal vector.
    pub fn from_normal(origin: Point, normal: Vector) -> Option<Self> {
        let n = normal.normalize()?;
        Self::build(origin, n)
    }

    /// Basis of a vertical wall: `u` runs along the segment, `v` points up.
    ///
    /// For a segment of a counter-clockwise floor plate the normal points outdoors.
    pub fn wall(start: Point, end: Point) -> Option<Self> {
        let u = Vector::new(end.x - start.x, end.y - start.y, 0.).normalize()?;
        Some(Self {
            origin: start,
            u,
            v: Vector::new(0., 0., 1.),
        })
    }

    fn build(origin: Point, n: Vector) -> Option<Self> {
        let helper = if n.dz.abs() < 0.9 {
            Vector::new(0.0, 0.0, 1.0)
        } else {
            Vector::new(0.0, 1.0, 0.0)
        };

        let u = helper.cross(n).normalize()?;
        let v = n.cross(u).normalize()?;

        Some(Self { origin, u, v })
    }

    pub fn normal(&self) -> Vector {
        self.u.cross(self.v)
    }

    /// Projects a 3D point onto the 2D plane, returning (u, v) coordinates.
    pub fn project(&self, p: Point) -> Point2 {
        let r = p - self.origin;
        Point2::new(r.dot(self.u), r.dot(self.v))
    }

    /// Unprojects 2D (u, v) coordinates back to a 3D point on the plane.
    pub fn unproject(&self, p: Point2) -> Point {
        self.origin + self.u * p.x + self.v * p.y
    }

    /// Signed distance of a point from the plane along its normal.
    pub fn distance_to(&self, p: Point) -> f64 {
        (p - self.origin).dot(self.normal())
    }
}
