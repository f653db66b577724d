//! Single-ring polygons in plan.
//!
//! Room2D floor plates, footprints and roof projections are all handled as
//! `Polygon2D` rings (outer boundaries counter-clockwise, holes clockwise).

pub mod boolean;
pub mod containment;
pub mod offset;
pub mod relations;

use crate::geom::EPS;
use crate::geom::point::Point2;
use crate::geom::segment::{LineSegment2D, SegmentIntersection};
use serde::{Deserialize, Serialize};

pub use containment::PointRelation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon2D {
    vertices: Vec<Point2>,
}

impl Polygon2D {
    pub fn new(vertices: Vec<Point2>) -> Self {
        Self { vertices }
    }

    /// Convenience constructor from coordinate tuples.
    pub fn from_tuples(pts: &[(f64, f64)]) -> Self {
        Self::new(pts.iter().map(|&(x, y)| Point2::new(x, y)).collect())
    }

    /// Axis-aligned rectangle from a corner and dimensions (counter-clockwise).
    pub fn rectangle(origin: Point2, width: f64, height: f64) -> Self {
        Self::new(vec![
            origin,
            Point2::new(origin.x + width, origin.y),
            Point2::new(origin.x + width, origin.y + height),
            Point2::new(origin.x, origin.y + height),
        ])
    }

    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Segment `i` runs from vertex `i` to vertex `i + 1` (wrapping).
    pub fn segment(&self, i: usize) -> LineSegment2D {
        let n = self.vertices.len();
        LineSegment2D::new(self.vertices[i], self.vertices[(i + 1) % n])
    }

    pub fn segments(&self) -> Vec<LineSegment2D> {
        (0..self.vertices.len()).map(|i| self.segment(i)).collect()
    }

    /// Shoelace area, positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.;
        }
        let mut sum = 0.;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        sum / 2.
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn perimeter(&self) -> f64 {
        self.segments().iter().map(|s| s.length()).sum()
    }

    pub fn is_clockwise(&self) -> bool {
        self.signed_area() < 0.
    }

    pub fn reverse(&self) -> Self {
        let mut vertices = self.vertices.clone();
        vertices.reverse();
        Self { vertices }
    }

    /// Returns a counter-clockwise copy.
    pub fn to_ccw(&self) -> Self {
        if self.is_clockwise() {
            self.reverse()
        } else {
            self.clone()
        }
    }

    /// Returns a clockwise copy.
    pub fn to_cw(&self) -> Self {
        if self.is_clockwise() {
            self.clone()
        } else {
            self.reverse()
        }
    }

    /// Area-weighted centroid (falls back to the vertex average for degenerate rings).
    pub fn centroid(&self) -> Point2 {
        let a = self.signed_area();
        let n = self.vertices.len();
        if a.abs() < EPS || n < 3 {
            let (sx, sy) = self
                .vertices
                .iter()
                .fold((0., 0.), |(sx, sy), p| (sx + p.x, sy + p.y));
            let n = n.max(1) as f64;
            return Point2::new(sx / n, sy / n);
        }
        let mut cx = 0.;
        let mut cy = 0.;
        for i in 0..n {
            let p = self.vertices[i];
            let q = self.vertices[(i + 1) % n];
            let f = p.x * q.y - q.x * p.y;
            cx += (p.x + q.x) * f;
            cy += (p.y + q.y) * f;
        }
        Point2::new(cx / (6. * a), cy / (6. * a))
    }

    /// Returns (min, max) corners of the bounding rectangle.
    pub fn bbox(&self) -> (Point2, Point2) {
        let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &self.vertices {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }

    pub fn is_convex(&self) -> bool {
        let n = self.vertices.len();
        if n < 4 {
            return true;
        }
        let mut sign = 0.;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let c = self.vertices[(i + 2) % n];
            let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
            if cross.abs() < EPS {
                continue;
            }
            if sign == 0. {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }

    /// Checks whether any two non-adjacent segments intersect.
    pub fn is_self_intersecting(&self, tol: f64) -> bool {
        let segs = self.segments();
        let n = segs.len();
        for i in 0..n {
            for j in (i + 1)..n {
                if j == i + 1 || (i == 0 && j == n - 1) {
                    continue;
                }
                if !matches!(segs[i].intersect(&segs[j], tol), SegmentIntersection::None) {
                    return true;
                }
            }
        }
        false
    }

    /// Mask of vertices to keep after removing duplicates (including wrap-around).
    ///
    /// Vertex `i` is dropped when it coincides with the last kept vertex.
    pub fn duplicate_vertex_mask(&self, tol: f64) -> Vec<bool> {
        let n = self.vertices.len();
        let mut keep = vec![true; n];
        let mut last: Option<usize> = None;
        for i in 0..n {
            if let Some(l) = last {
                if self.vertices[i].is_equivalent(&self.vertices[l], tol) {
                    keep[i] = false;
                    continue;
                }
            }
            last = Some(i);
        }
        // wrap-around: trailing vertices equal to the first one
        if n > 1 {
            for i in (1..n).rev() {
                if !keep[i] {
                    continue;
                }
                if self.vertices[i].is_equivalent(&self.vertices[0], tol) {
                    keep[i] = false;
                } else {
                    break;
                }
            }
        }
        keep
    }

    pub fn remove_duplicate_vertices(&self, tol: f64) -> Self {
        let mask = self.duplicate_vertex_mask(tol);
        Self::new(
            self.vertices
                .iter()
                .zip(mask)
                .filter_map(|(p, k)| k.then_some(*p))
                .collect(),
        )
    }

    /// Mask of vertices to keep after removing colinear ones.
    ///
    /// A vertex is colinear when it lies within `tol` of the segment joining
    /// its kept neighbours.
    pub fn colinear_vertex_mask(&self, tol: f64) -> Vec<bool> {
        let n = self.vertices.len();
        let mut keep = vec![true; n];
        if n < 3 {
            return keep;
        }
        let mut changed = true;
        while changed {
            changed = false;
            let kept: Vec<usize> = (0..n).filter(|&i| keep[i]).collect();
            if kept.len() <= 3 {
                break;
            }
            let m = kept.len();
            for k in 0..m {
                let prev = self.vertices[kept[(k + m - 1) % m]];
                let cur = self.vertices[kept[k]];
                let next = self.vertices[kept[(k + 1) % m]];
                let seg = LineSegment2D::new(prev, next);
                if seg.distance_to_point(cur) <= tol {
                    keep[kept[k]] = false;
                    changed = true;
                    break;
                }
            }
        }
        keep
    }

    pub fn remove_colinear_vertices(&self, tol: f64) -> Self {
        let mask = self.colinear_vertex_mask(tol);
        Self::new(
            self.vertices
                .iter()
                .zip(mask)
                .filter_map(|(p, k)| k.then_some(*p))
                .collect(),
        )
    }

    pub fn move_by(&self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.vertices
                .iter()
                .map(|p| Point2::new(p.x + dx, p.y + dy))
                .collect(),
        )
    }

    pub fn scale(&self, factor: f64, origin: Point2) -> Self {
        Self::new(self.vertices.iter().map(|p| p.scale(factor, origin)).collect())
    }

    /// True if both rings hold the same vertices in the same cyclic order.
    pub fn is_equivalent(&self, other: &Self, tol: f64) -> bool {
        let n = self.vertices.len();
        if n != other.vertices.len() || n == 0 {
            return false;
        }
        let Some(start) = other
            .vertices
            .iter()
            .position(|p| p.is_equivalent(&self.vertices[0], tol))
        else {
            return false;
        };
        (0..n).all(|i| {
            self.vertices[i].is_equivalent(&other.vertices[(start + i) % n], tol)
        })
    }
}

/// Returns true if two bounding rectangles overlap (touching counts) within `tol`.
pub fn bboxes_overlap(a: (Point2, Point2), b: (Point2, Point2), tol: f64) -> bool {
    !(a.1.x < b.0.x - tol || b.1.x < a.0.x - tol || a.1.y < b.0.y - tol || b.1.y < a.0.y - tol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_and_winding() {
        let sq = Polygon2D::rectangle(Point2::new(0., 0.), 10., 5.);
        assert!((sq.signed_area() - 50.).abs() < 1e-12);
        assert!(!sq.is_clockwise());
        assert!(sq.reverse().is_clockwise());
        assert!((sq.perimeter() - 30.).abs() < 1e-12);
        let c = sq.centroid();
        assert!(c.is_equivalent(&Point2::new(5., 2.5), 1e-12));
    }

    #[test]
    fn test_remove_duplicates_and_colinear() {
        let poly = Polygon2D::from_tuples(&[
            (0., 0.),
            (5., 0.),
            (5., 0.0001),
            (10., 0.),
            (10., 10.),
            (0., 10.),
            (0., 0.),
        ]);
        let dedup = poly.remove_duplicate_vertices(0.001);
        assert_eq!(dedup.len(), 5);
        let clean = dedup.remove_colinear_vertices(0.001);
        assert_eq!(clean.len(), 4);
        assert!((clean.area() - 100.).abs() < 1e-9);
    }

    #[test]
    fn test_self_intersection() {
        let bowtie = Polygon2D::from_tuples(&[(0., 0.), (2., 2.), (2., 0.), (0., 2.)]);
        assert!(bowtie.is_self_intersecting(1e-6));
        let sq = Polygon2D::rectangle(Point2::new(0., 0.), 1., 1.);
        assert!(!sq.is_self_intersecting(1e-6));
        assert!(sq.is_convex());
    }

    #[test]
    fn test_equivalent_with_rotation() {
        let a = Polygon2D::from_tuples(&[(0., 0.), (1., 0.), (1., 1.), (0., 1.)]);
        let b = Polygon2D::from_tuples(&[(1., 1.), (0., 1.), (0., 0.), (1., 0.)]);
        assert!(a.is_equivalent(&b, 1e-9));
        assert!(!a.is_equivalent(&b.reverse(), 1e-9));
    }

    #[test]
    fn test_bbox_overlap() {
        let a = Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.).bbox();
        let b = Polygon2D::rectangle(Point2::new(10., 0.), 10., 10.).bbox();
        let c = Polygon2D::rectangle(Point2::new(30., 0.), 10., 10.).bbox();
        assert!(bboxes_overlap(a, b, 0.01));
        assert!(!bboxes_overlap(a, c, 0.01));
    }
}
