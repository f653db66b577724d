//! Relationships between plan polygons.
//!
//! Segment intersection for adjacency, shared boundary lengths for room
//! joins, overlap areas for validation, and footprint distances for context
//! and alley filtering.

use crate::geom::point::Point2;
use crate::geom::polygon::{Polygon2D, PointRelation, bboxes_overlap, boolean};
use crate::geom::region::Region2D;

impl Polygon2D {
    /// Inserts the vertices of `others` that fall on this ring's segments.
    ///
    /// Returns the new ring and, for each of its segments, the index of the
    /// original segment it came from. A segment that was not split maps to
    /// itself, so a split can be detected by repeated indices.
    pub fn intersect_segments(&self, others: &[&Polygon2D], tol: f64) -> (Polygon2D, Vec<usize>) {
        let mut verts = Vec::with_capacity(self.len());
        let mut source = Vec::with_capacity(self.len());
        for (i, seg) in self.segments().iter().enumerate() {
            let len = seg.length();
            let mut inserts: Vec<(f64, Point2)> = vec![];
            for other in others {
                for p in other.vertices() {
                    if seg.distance_to_point(*p) > tol {
                        continue;
                    }
                    let t = seg.parameter_of(*p);
                    // Ignore points that sit on the segment's own endpoints
                    if t * len <= tol || (1. - t) * len <= tol {
                        continue;
                    }
                    if inserts.iter().any(|(_, q)| q.is_equivalent(p, tol)) {
                        continue;
                    }
                    inserts.push((t, *p));
                }
            }
            inserts.sort_by(|a, b| a.0.total_cmp(&b.0));
            verts.push(seg.p1);
            source.push(i);
            for (_, p) in inserts {
                verts.push(p);
                source.push(i);
            }
        }
        (Polygon2D::new(verts), source)
    }

    /// Total length along which segments of the two rings run over each other
    /// in opposite directions.
    pub fn shared_boundary_length(&self, other: &Polygon2D, tol: f64) -> f64 {
        if !bboxes_overlap(self.bbox(), other.bbox(), tol) {
            return 0.;
        }
        let mut total = 0.;
        for s in self.segments() {
            for o in other.segments() {
                if s.is_colinear_with(&o, tol) && s.is_anti_parallel(&o, 1.) {
                    total += s.overlap_length(&o, tol);
                }
            }
        }
        total
    }

    /// Area shared by the two rings.
    pub fn overlap_area(&self, other: &Polygon2D, tol: f64) -> f64 {
        if !bboxes_overlap(self.bbox(), other.bbox(), tol) {
            return 0.;
        }
        let a = Region2D::from_polygon(self.clone());
        let b = Region2D::from_polygon(other.clone());
        boolean::total_area(&boolean::intersection(&[a], &[b], tol))
    }

    /// True if the rings share more than `tol²` of area.
    pub fn overlaps(&self, other: &Polygon2D, tol: f64) -> bool {
        self.overlap_area(other, tol) > tol * tol
    }

    /// Minimum plan distance between the two rings (0 when they touch or nest).
    pub fn distance_to_polygon(&self, other: &Polygon2D) -> f64 {
        let inside = |a: &Polygon2D, b: &Polygon2D| {
            b.vertices()
                .first()
                .is_some_and(|p| a.point_relationship(*p, 0.) != PointRelation::Outside)
        };
        if inside(self, other) || inside(other, self) {
            return 0.;
        }
        let mut d = f64::INFINITY;
        for s in self.segments() {
            for o in other.segments() {
                d = d.min(s.distance_to_segment(&o));
            }
        }
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_segments_inserts_vertices() {
        let big = Polygon2D::rectangle(Point2::new(0., 0.), 10., 20.);
        let small = Polygon2D::rectangle(Point2::new(10., 5.), 5., 5.);
        let (res, source) = big.intersect_segments(&[&small], 1e-6);
        assert_eq!(res.len(), 6);
        assert_eq!(source, vec![0, 1, 1, 1, 2, 3]);
        assert!((res.area() - big.area()).abs() < 1e-9);
    }

    #[test]
    fn test_shared_boundary_length() {
        let a = Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.);
        let b = Polygon2D::rectangle(Point2::new(10., 2.), 5., 5.);
        assert!((a.shared_boundary_length(&b, 1e-6) - 5.).abs() < 1e-9);
        let c = Polygon2D::rectangle(Point2::new(30., 0.), 5., 5.);
        assert_eq!(a.shared_boundary_length(&c, 1e-6), 0.);
    }

    #[test]
    fn test_overlap_and_distance() {
        let a = Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.);
        let b = Polygon2D::rectangle(Point2::new(8., 0.), 10., 10.);
        assert!((a.overlap_area(&b, 1e-6) - 20.).abs() < 1e-9);
        assert!(a.overlaps(&b, 1e-6));
        let c = Polygon2D::rectangle(Point2::new(10.5, 0.), 10., 10.);
        assert!(!a.overlaps(&c, 1e-6));
        assert!((a.distance_to_polygon(&c) - 0.5).abs() < 1e-9);
        assert_eq!(a.distance_to_polygon(&b), 0.);
    }
}
