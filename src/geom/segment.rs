//! Line segment operations in plan.
//!
//! Floor plates are horizontal, so every boundary-segment question the
//! assembly operations ask (adjacency, alignment, alleys) is answered in 2D.

use crate::geom::EPS;
use crate::geom::point::Point2;
use serde::{Deserialize, Serialize};

/// Result of a line segment intersection test.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentIntersection {
    /// Segments intersect at a single point
    Point(Point2),
    /// Segments are collinear and overlap (returns the overlap segment)
    Collinear(Point2, Point2),
    /// No intersection
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment2D {
    pub p1: Point2,
    pub p2: Point2,
}

impl LineSegment2D {
    pub fn new(p1: Point2, p2: Point2) -> Self {
        Self { p1, p2 }
    }

    pub fn length(&self) -> f64 {
        self.p1.distance(&self.p2)
    }

    /// Direction vector (not normalized).
    pub fn direction(&self) -> (f64, f64) {
        (self.p2.x - self.p1.x, self.p2.y - self.p1.y)
    }

    /// Unit direction vector, or None for a zero-length segment.
    pub fn unit_direction(&self) -> Option<(f64, f64)> {
        let len = self.length();
        if len < EPS {
            return None;
        }
        let (dx, dy) = self.direction();
        Some((dx / len, dy / len))
    }

    pub fn midpoint(&self) -> Point2 {
        self.p1.lerp(&self.p2, 0.5)
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.p2, self.p1)
    }

    pub fn point_at(&self, t: f64) -> Point2 {
        self.p1.lerp(&self.p2, t)
    }

    /// Parameter of the projection of `pt` onto the infinite line (0 at p1, 1 at p2).
    pub fn parameter_of(&self, pt: Point2) -> f64 {
        let (dx, dy) = self.direction();
        let len_sq = dx * dx + dy * dy;
        if len_sq < EPS * EPS {
            return 0.;
        }
        ((pt.x - self.p1.x) * dx + (pt.y - self.p1.y) * dy) / len_sq
    }

    /// Finds the closest point on the infinite line to a given point.
    pub fn closest_point_on_line(&self, pt: Point2) -> Point2 {
        self.point_at(self.parameter_of(pt))
    }

    /// Finds the closest point on the segment to a given point.
    pub fn closest_point(&self, pt: Point2) -> Point2 {
        self.point_at(self.parameter_of(pt).clamp(0., 1.))
    }

    /// Minimum distance between a point and the segment.
    pub fn distance_to_point(&self, pt: Point2) -> f64 {
        self.closest_point(pt).distance(&pt)
    }

    /// Distance between a point and the infinite line through the segment.
    pub fn distance_to_line(&self, pt: Point2) -> f64 {
        self.closest_point_on_line(pt).distance(&pt)
    }

    /// Minimum distance between two segments.
    pub fn distance_to_segment(&self, other: &Self) -> f64 {
        if !matches!(self.intersect(other, EPS), SegmentIntersection::None) {
            return 0.;
        }
        self.distance_to_point(other.p1)
            .min(self.distance_to_point(other.p2))
            .min(other.distance_to_point(self.p1))
            .min(other.distance_to_point(self.p2))
    }

    /// True if both segments share their endpoints in the same order.
    pub fn is_equivalent(&self, other: &Self, tol: f64) -> bool {
        self.p1.is_equivalent(&other.p1, tol) && self.p2.is_equivalent(&other.p2, tol)
    }

    /// True if the other segment runs along the same edge in the opposite direction.
    ///
    /// This is how two Room2Ds see a shared wall.
    pub fn is_reversed_equivalent(&self, other: &Self, tol: f64) -> bool {
        self.p1.is_equivalent(&other.p2, tol) && self.p2.is_equivalent(&other.p1, tol)
    }

    /// True if both endpoints of `other` lie within `tol` of this segment's line.
    pub fn is_colinear_with(&self, other: &Self, tol: f64) -> bool {
        self.length() > tol
            && self.distance_to_line(other.p1) <= tol
            && self.distance_to_line(other.p2) <= tol
    }

    /// Length along which two colinear segments overlap (0 if not colinear).
    pub fn overlap_length(&self, other: &Self, tol: f64) -> f64 {
        if !self.is_colinear_with(other, tol) {
            return 0.;
        }
        let t3 = self.parameter_of(other.p1);
        let t4 = self.parameter_of(other.p2);
        let (lo, hi) = if t3 < t4 { (t3, t4) } else { (t4, t3) };
        let start = lo.max(0.);
        let end = hi.min(1.);
        ((end - start) * self.length()).max(0.)
    }

    /// True if `pt` lies on the segment within `tol`.
    pub fn contains_point(&self, pt: Point2, tol: f64) -> bool {
        self.distance_to_point(pt) <= tol
    }

    /// Finds the intersection of two segments.
    pub fn intersect(&self, other: &Self, tol: f64) -> SegmentIntersection {
        let (d1x, d1y) = self.direction();
        let (d2x, d2y) = other.direction();
        let cross = d1x * d2y - d1y * d2x;
        let len1 = self.length();
        let len2 = other.length();
        if len1 < EPS || len2 < EPS {
            return SegmentIntersection::None;
        }

        if cross.abs() < EPS * len1.max(1.) * len2.max(1.) {
            // Parallel: only colinear overlap matters
            if self.distance_to_line(other.p1) > tol {
                return SegmentIntersection::None;
            }
            let t3 = self.parameter_of(other.p1);
            let t4 = self.parameter_of(other.p2);
            let (lo, hi) = if t3 < t4 { (t3, t4) } else { (t4, t3) };
            let start = lo.max(0.);
            let end = hi.min(1.);
            let slack = tol / len1;
            if start > end + slack {
                return SegmentIntersection::None;
            }
            if (end - start) * len1 <= tol {
                return SegmentIntersection::Point(self.point_at((start + end) / 2.));
            }
            return SegmentIntersection::Collinear(self.point_at(start), self.point_at(end));
        }

        let rx = other.p1.x - self.p1.x;
        let ry = other.p1.y - self.p1.y;
        let t = (rx * d2y - ry * d2x) / cross;
        let s = (rx * d1y - ry * d1x) / cross;
        let slack1 = tol / len1;
        let slack2 = tol / len2;
        if (-slack1..=1. + slack1).contains(&t) && (-slack2..=1. + slack2).contains(&s) {
            SegmentIntersection::Point(self.point_at(t.clamp(0., 1.)))
        } else {
            SegmentIntersection::None
        }
    }

    /// Returns true if the two segments run in opposite directions within `angle_tol` degrees.
    pub fn is_anti_parallel(&self, other: &Self, angle_tol: f64) -> bool {
        match (self.unit_direction(), other.unit_direction()) {
            (Some((ax, ay)), Some((bx, by))) => {
                let dot = (ax * bx + ay * by).clamp(-1., 1.);
                dot.acos().to_degrees() >= 180. - angle_tol
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(a: (f64, f64), b: (f64, f64)) -> LineSegment2D {
        LineSegment2D::new(Point2::new(a.0, a.1), Point2::new(b.0, b.1))
    }

    #[test]
    fn test_crossing_segments() {
        let s1 = seg((0., 0.), (2., 2.));
        let s2 = seg((0., 2.), (2., 0.));
        match s1.intersect(&s2, 1e-6) {
            SegmentIntersection::Point(p) => assert!(p.is_equivalent(&Point2::new(1., 1.), 1e-9)),
            other => panic!("Expected a point, got {:?}", other),
        }
    }

    #[test]
    fn test_collinear_overlap() {
        let s1 = seg((0., 0.), (4., 0.));
        let s2 = seg((3., 0.), (1., 0.));
        match s1.intersect(&s2, 1e-6) {
            SegmentIntersection::Collinear(a, b) => {
                assert!(a.is_equivalent(&Point2::new(1., 0.), 1e-9));
                assert!(b.is_equivalent(&Point2::new(3., 0.), 1e-9));
            }
            other => panic!("Expected overlap, got {:?}", other),
        }
        assert!((s1.overlap_length(&s2, 1e-6) - 2.).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_no_intersection() {
        let s1 = seg((0., 0.), (4., 0.));
        let s2 = seg((0., 1.), (4., 1.));
        assert_eq!(s1.intersect(&s2, 1e-6), SegmentIntersection::None);
        assert!((s1.distance_to_segment(&s2) - 1.).abs() < 1e-12);
    }

    #[test]
    fn test_reversed_equivalent() {
        let s1 = seg((10., 0.), (10., 10.));
        let s2 = seg((10., 10.), (10., 0.));
        assert!(s1.is_reversed_equivalent(&s2, 0.01));
        assert!(!s1.is_equivalent(&s2, 0.01));
        assert!(s1.is_anti_parallel(&s2, 1.));
    }

    #[test]
    fn test_distance_to_point() {
        let s = seg((0., 0.), (10., 0.));
        assert!((s.distance_to_point(Point2::new(5., 3.)) - 3.).abs() < 1e-12);
        assert!((s.distance_to_point(Point2::new(13., 4.)) - 5.).abs() < 1e-12);
        assert!((s.distance_to_line(Point2::new(13., 4.)) - 4.).abs() < 1e-12);
    }
}
