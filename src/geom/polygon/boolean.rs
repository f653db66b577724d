//! Boolean operations on plan regions.
//!
//! Union, intersection and difference between sets of [`Region2D`]. Both
//! operands are split at every mutual intersection, each sub-edge is
//! classified against the other operand and the kept edges are chained
//! back into rings. Counter-clockwise rings become outer boundaries and
//! clockwise rings become holes.

use crate::geom::point::Point2;
use crate::geom::polygon::{PointRelation, Polygon2D, bboxes_overlap};
use crate::geom::region::Region2D;
use crate::geom::segment::{LineSegment2D, SegmentIntersection};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoolOp {
    Union,
    Intersection,
    Difference,
}

/// Position of a sub-edge relative to the other operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeClass {
    Inside,
    Outside,
    /// Coincides with an edge of the other operand running the same way
    Shared,
    /// Coincides with an edge of the other operand running the opposite way
    SharedOpposite,
}

/// Vertices snapped together within a tolerance.
struct VertexPool {
    pts: Vec<Point2>,
    tol: f64,
}

impl VertexPool {
    fn new(tol: f64) -> Self {
        Self { pts: vec![], tol }
    }

    fn index(&mut self, p: Point2) -> usize {
        if let Some(i) = self.pts.iter().position(|q| q.is_equivalent(&p, self.tol)) {
            return i;
        }
        self.pts.push(p);
        self.pts.len() - 1
    }

    fn segment(&self, edge: (usize, usize)) -> LineSegment2D {
        LineSegment2D::new(self.pts[edge.0], self.pts[edge.1])
    }
}

/// Union of all regions in the list.
///
/// A single region is returned as is.
pub fn union(regions: &[Region2D], tol: f64) -> Vec<Region2D> {
    let mut iter = regions.iter().map(normalized);
    let Some(first) = iter.next() else {
        return vec![];
    };
    let mut acc = vec![first];
    for r in iter {
        acc = boolean(&acc, &[r], BoolOp::Union, tol);
    }
    acc
}

/// Area common to both sets of regions.
pub fn intersection(a: &[Region2D], b: &[Region2D], tol: f64) -> Vec<Region2D> {
    let a: Vec<Region2D> = a.iter().map(normalized).collect();
    let b: Vec<Region2D> = b.iter().map(normalized).collect();
    boolean(&a, &b, BoolOp::Intersection, tol)
}

/// Area of `a` not covered by `b`.
pub fn difference(a: &[Region2D], b: &[Region2D], tol: f64) -> Vec<Region2D> {
    let a: Vec<Region2D> = a.iter().map(normalized).collect();
    let b: Vec<Region2D> = b.iter().map(normalized).collect();
    boolean(&a, &b, BoolOp::Difference, tol)
}

fn normalized(r: &Region2D) -> Region2D {
    Region2D::new(r.boundary.clone(), r.holes.clone())
}

fn set_bbox(regions: &[Region2D]) -> (Point2, Point2) {
    let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for r in regions {
        let (lo, hi) = r.bbox();
        min = Point2::new(min.x.min(lo.x), min.y.min(lo.y));
        max = Point2::new(max.x.max(hi.x), max.y.max(hi.y));
    }
    (min, max)
}

fn boolean(a: &[Region2D], b: &[Region2D], op: BoolOp, tol: f64) -> Vec<Region2D> {
    if a.is_empty() || b.is_empty() || !bboxes_overlap(set_bbox(a), set_bbox(b), tol) {
        return match op {
            BoolOp::Union => a.iter().chain(b.iter()).cloned().collect(),
            BoolOp::Intersection => vec![],
            BoolOp::Difference => a.to_vec(),
        };
    }

    let segs_a = ring_segments(a);
    let segs_b = ring_segments(b);
    let mut pool = VertexPool::new(tol);
    let edges_a = split_edges(&segs_a, &segs_b, &mut pool, tol);
    let edges_b = split_edges(&segs_b, &segs_a, &mut pool, tol);
    let set_a: HashSet<(usize, usize)> = edges_a.iter().copied().collect();
    let set_b: HashSet<(usize, usize)> = edges_b.iter().copied().collect();

    let mut kept = vec![];
    for &e in &edges_a {
        let class = classify(e, &pool, &set_b, b, tol);
        let keep = match op {
            BoolOp::Union => matches!(class, EdgeClass::Outside | EdgeClass::Shared),
            BoolOp::Intersection => matches!(class, EdgeClass::Inside | EdgeClass::Shared),
            BoolOp::Difference => matches!(class, EdgeClass::Outside | EdgeClass::SharedOpposite),
        };
        if keep {
            kept.push(e);
        }
    }
    for &e in &edges_b {
        let class = classify(e, &pool, &set_a, a, tol);
        match (op, class) {
            (BoolOp::Union, EdgeClass::Outside) => kept.push(e),
            (BoolOp::Intersection, EdgeClass::Inside) => kept.push(e),
            (BoolOp::Difference, EdgeClass::Inside) => kept.push((e.1, e.0)),
            _ => {}
        }
    }

    let loops = chain_loops(&kept, &pool)
        .into_iter()
        .map(|l| l.remove_duplicate_vertices(tol).remove_colinear_vertices(tol))
        .filter(|l| l.len() >= 3 && l.area() > tol * tol)
        .collect();
    assemble(loops, tol)
}

fn ring_segments(regions: &[Region2D]) -> Vec<LineSegment2D> {
    regions
        .iter()
        .flat_map(|r| r.rings().into_iter().flat_map(|ring| ring.segments()))
        .filter(|s| s.length() > 0.)
        .collect()
}

/// Splits every edge at its intersections with `others` and returns pooled sub-edges.
fn split_edges(
    edges: &[LineSegment2D],
    others: &[LineSegment2D],
    pool: &mut VertexPool,
    tol: f64,
) -> Vec<(usize, usize)> {
    let mut out = vec![];
    for e in edges {
        let mut ts = vec![0., 1.];
        for o in others {
            match e.intersect(o, tol) {
                SegmentIntersection::Point(p) => ts.push(e.parameter_of(p)),
                SegmentIntersection::Collinear(p, q) => {
                    ts.push(e.parameter_of(p));
                    ts.push(e.parameter_of(q));
                }
                SegmentIntersection::None => {}
            }
        }
        let mut ts: Vec<f64> = ts.into_iter().map(|t| t.clamp(0., 1.)).collect();
        ts.sort_by(|x, y| x.total_cmp(y));

        let mut prev = pool.index(e.p1);
        for t in ts.into_iter().skip(1) {
            let idx = if t >= 1. {
                pool.index(e.p2)
            } else {
                pool.index(e.point_at(t))
            };
            if idx != prev {
                out.push((prev, idx));
                prev = idx;
            }
        }
    }
    out
}

/// Point just left of the segment midpoint (the interior side of a ring edge).
fn side_probe(seg: &LineSegment2D, offset: f64) -> Point2 {
    let mid = seg.midpoint();
    match seg.unit_direction() {
        Some((ux, uy)) => Point2::new(mid.x - uy * offset, mid.y + ux * offset),
        None => mid,
    }
}

fn classify(
    edge: (usize, usize),
    pool: &VertexPool,
    other_edges: &HashSet<(usize, usize)>,
    other: &[Region2D],
    tol: f64,
) -> EdgeClass {
    if other_edges.contains(&edge) {
        return EdgeClass::Shared;
    }
    if other_edges.contains(&(edge.1, edge.0)) {
        return EdgeClass::SharedOpposite;
    }
    let seg = pool.segment(edge);
    let mid = seg.midpoint();
    let on_boundary = other
        .iter()
        .any(|r| r.point_relationship(mid, tol) == PointRelation::OnBoundary);
    if !on_boundary {
        return if other.iter().any(|r| r.is_point_inside(mid)) {
            EdgeClass::Inside
        } else {
            EdgeClass::Outside
        };
    }

    // Runs along the other boundary without sharing pooled vertices
    let offset = (2. * tol).max(1e-6);
    let left_in = other.iter().any(|r| r.is_point_inside(side_probe(&seg, offset)));
    let right_in = other
        .iter()
        .any(|r| r.is_point_inside(side_probe(&seg.reversed(), offset)));
    match (left_in, right_in) {
        (true, true) => EdgeClass::Inside,
        (false, false) => EdgeClass::Outside,
        (true, false) => EdgeClass::Shared,
        (false, true) => EdgeClass::SharedOpposite,
    }
}

/// Signed turn angle (radians) from `d_in` to `d_out`; a U-turn ranks last.
fn turn(d_in: (f64, f64), d_out: (f64, f64)) -> f64 {
    let cross = d_in.0 * d_out.1 - d_in.1 * d_out.0;
    let dot = d_in.0 * d_out.0 + d_in.1 * d_out.1;
    let a = cross.atan2(dot);
    if a > std::f64::consts::PI - 1e-9 {
        -std::f64::consts::PI
    } else {
        a
    }
}

/// Chains directed edges into closed loops, taking the leftmost turn at each vertex.
fn chain_loops(edges: &[(usize, usize)], pool: &VertexPool) -> Vec<Polygon2D> {
    let mut outgoing: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, e) in edges.iter().enumerate() {
        outgoing.entry(e.0).or_default().push(i);
    }
    let dir = |e: (usize, usize)| pool.segment(e).direction();

    let mut used = vec![false; edges.len()];
    let mut loops = vec![];
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let origin = edges[start].0;
        let mut ring = vec![origin];
        let mut cur = start;
        loop {
            let e = edges[cur];
            if e.1 == origin {
                break;
            }
            ring.push(e.1);
            let d_in = dir(e);
            let next = outgoing
                .get(&e.1)
                .into_iter()
                .flatten()
                .copied()
                .filter(|&i| !used[i])
                .max_by(|&i, &j| turn(d_in, dir(edges[i])).total_cmp(&turn(d_in, dir(edges[j]))));
            match next {
                Some(n) => {
                    used[n] = true;
                    cur = n;
                }
                None => {
                    ring.clear();
                    break;
                }
            }
        }
        if ring.len() >= 3 {
            loops.push(Polygon2D::new(ring.iter().map(|&i| pool.pts[i]).collect()));
        }
    }
    loops
}

/// Groups loops into regions: each hole goes to the smallest outer ring around it.
fn assemble(loops: Vec<Polygon2D>, tol: f64) -> Vec<Region2D> {
    let (holes, outers): (Vec<Polygon2D>, Vec<Polygon2D>) =
        loops.into_iter().partition(|l| l.is_clockwise());
    let mut regions: Vec<Region2D> = outers.into_iter().map(Region2D::from_polygon).collect();
    let offset = (2. * tol).max(1e-6);
    for hole in holes {
        let Some(longest) = hole
            .segments()
            .into_iter()
            .max_by(|s, t| s.length().total_cmp(&t.length()))
        else {
            continue;
        };
        let probe = side_probe(&longest, offset);
        let host = regions
            .iter()
            .enumerate()
            .filter(|(_, r)| r.boundary.is_point_inside(probe))
            .min_by(|x, y| x.1.boundary.area().total_cmp(&y.1.boundary.area()))
            .map(|(i, _)| i);
        if let Some(i) = host {
            regions[i].holes.push(hole);
        }
    }
    regions
}

/// Total area of a region set.
pub fn total_area(regions: &[Region2D]) -> f64 {
    regions.iter().map(|r| r.area()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-6;

    fn square(x: f64, y: f64, size: f64) -> Region2D {
        Region2D::from_polygon(Polygon2D::rectangle(Point2::new(x, y), size, size))
    }

    #[test]
    fn test_union_adjacent_squares() {
        let res = union(&[square(0., 0., 10.), square(10., 0., 10.)], TOL);
        assert_eq!(res.len(), 1);
        assert!((res[0].area() - 200.).abs() < 1e-9);
        assert_eq!(res[0].boundary.len(), 4);
    }

    #[test]
    fn test_union_disjoint() {
        let res = union(&[square(0., 0., 1.), square(5., 5., 1.)], TOL);
        assert_eq!(res.len(), 2);
        assert!((total_area(&res) - 2.).abs() < 1e-12);
    }

    #[test]
    fn test_union_overlapping() {
        let res = union(&[square(0., 0., 10.), square(5., 5., 10.)], TOL);
        assert_eq!(res.len(), 1);
        assert!((res[0].area() - 175.).abs() < 1e-9);
        assert_eq!(res[0].boundary.len(), 8);
    }

    #[test]
    fn test_intersection_overlapping() {
        let res = intersection(&[square(0., 0., 10.)], &[square(5., 5., 10.)], TOL);
        assert_eq!(res.len(), 1);
        assert!((res[0].area() - 25.).abs() < 1e-9);
    }

    #[test]
    fn test_intersection_touching_is_empty() {
        let res = intersection(&[square(0., 0., 10.)], &[square(10., 0., 10.)], TOL);
        assert!(res.is_empty());
    }

    #[test]
    fn test_difference_creates_hole() {
        let res = difference(&[square(0., 0., 10.)], &[square(4., 4., 2.)], TOL);
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].holes.len(), 1);
        assert!((res[0].area() - 96.).abs() < 1e-9);
    }

    #[test]
    fn test_difference_splits_region() {
        let strip = Region2D::from_polygon(Polygon2D::rectangle(Point2::new(4., -1.), 2., 12.));
        let res = difference(&[square(0., 0., 10.)], &[strip], TOL);
        assert_eq!(res.len(), 2);
        assert!((total_area(&res) - 80.).abs() < 1e-9);
    }

    #[test]
    fn test_difference_shared_edge() {
        // subtracting the right half along a shared edge
        let half = Region2D::from_polygon(Polygon2D::rectangle(Point2::new(5., 0.), 5., 10.));
        let res = difference(&[square(0., 0., 10.)], &[half], TOL);
        assert_eq!(res.len(), 1);
        assert!((res[0].area() - 50.).abs() < 1e-9);
    }
}
