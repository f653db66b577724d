//! Plan regions: an outer ring plus holes.

use crate::geom::point::Point2;
use crate::geom::polygon::{PointRelation, Polygon2D};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A polygon with holes in plan.
///
/// The outer boundary is kept counter-clockwise and holes clockwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region2D {
    pub boundary: Polygon2D,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Polygon2D>,
}

impl Region2D {
    pub fn new(boundary: Polygon2D, holes: Vec<Polygon2D>) -> Self {
        Self {
            boundary: boundary.to_ccw(),
            holes: holes.into_iter().map(|h| h.to_cw()).collect(),
        }
    }

    pub fn from_polygon(boundary: Polygon2D) -> Self {
        Self::new(boundary, vec![])
    }

    pub fn area(&self) -> f64 {
        self.boundary.area() - self.holes.iter().map(|h| h.area()).sum::<f64>()
    }

    /// Outer ring followed by holes.
    pub fn rings(&self) -> Vec<&Polygon2D> {
        std::iter::once(&self.boundary).chain(self.holes.iter()).collect()
    }

    pub fn bbox(&self) -> (Point2, Point2) {
        self.boundary.bbox()
    }

    pub fn has_holes(&self) -> bool {
        !self.holes.is_empty()
    }

    pub fn distance_to_boundary(&self, pt: Point2) -> f64 {
        self.rings()
            .iter()
            .map(|r| r.distance_to_boundary(pt))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn point_relationship(&self, pt: Point2, tol: f64) -> PointRelation {
        if self.distance_to_boundary(pt) <= tol {
            return PointRelation::OnBoundary;
        }
        if self.is_point_inside(pt) {
            PointRelation::Inside
        } else {
            PointRelation::Outside
        }
    }

    pub fn is_point_inside(&self, pt: Point2) -> bool {
        self.boundary.is_point_inside(pt) && !self.holes.iter().any(|h| h.is_point_inside(pt))
    }

    /// Distance to the boundary, positive inside and negative outside.
    pub fn signed_distance(&self, pt: Point2) -> f64 {
        let d = self.distance_to_boundary(pt);
        if self.is_point_inside(pt) { d } else { -d }
    }

    pub fn move_by(&self, dx: f64, dy: f64) -> Self {
        Self {
            boundary: self.boundary.move_by(dx, dy),
            holes: self.holes.iter().map(|h| h.move_by(dx, dy)).collect(),
        }
    }

    pub fn scale(&self, factor: f64, origin: Point2) -> Self {
        Self {
            boundary: self.boundary.scale(factor, origin),
            holes: self.holes.iter().map(|h| h.scale(factor, origin)).collect(),
        }
    }

    /// Pole of inaccessibility: the interior point farthest from the boundary.
    ///
    /// Grid-refinement search (polylabel). `precision` bounds how far the
    /// returned distance may be from the true optimum.
    pub fn pole_of_inaccessibility(&self, precision: f64) -> Point2 {
        let (min, max) = self.bbox();
        let width = max.x - min.x;
        let height = max.y - min.y;
        let cell_size = width.min(height);
        if cell_size <= 0. || self.boundary.len() < 3 {
            return self.boundary.vertices().first().copied().unwrap_or(min);
        }
        let precision = precision.max(cell_size * 1e-6);

        let mut queue = BinaryHeap::new();
        let h = cell_size / 2.;
        let mut x = min.x;
        while x < max.x {
            let mut y = min.y;
            while y < max.y {
                queue.push(Cell::new(Point2::new(x + h, y + h), h, self));
                y += cell_size;
            }
            x += cell_size;
        }

        let mut best = Cell::new(self.boundary.centroid(), 0., self);
        let bbox_cell = Cell::new(Point2::new(min.x + width / 2., min.y + height / 2.), 0., self);
        if bbox_cell.d > best.d {
            best = bbox_cell;
        }

        while let Some(cell) = queue.pop() {
            if cell.d > best.d {
                best = cell.clone();
            }
            if cell.max - best.d <= precision {
                continue;
            }
            let h = cell.h / 2.;
            for (sx, sy) in [(-1., -1.), (1., -1.), (-1., 1.), (1., 1.)] {
                queue.push(Cell::new(
                    Point2::new(cell.center.x + sx * h, cell.center.y + sy * h),
                    h,
                    self,
                ));
            }
        }
        best.center
    }
}

#[derive(Debug, Clone)]
struct Cell {
    center: Point2,
    h: f64,
    d: f64,
    max: f64,
}

impl Cell {
    fn new(center: Point2, h: f64, region: &Region2D) -> Self {
        let d = region.signed_distance(center);
        Self {
            center,
            h,
            d,
            max: d + h * std::f64::consts::SQRT_2,
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.max.total_cmp(&other.max) == Ordering::Equal
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.max.total_cmp(&other.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_orientation_and_area() {
        let outer = Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.).reverse();
        let hole = Polygon2D::rectangle(Point2::new(4., 4.), 2., 2.);
        let region = Region2D::new(outer, vec![hole]);
        assert!(!region.boundary.is_clockwise());
        assert!(region.holes[0].is_clockwise());
        assert!((region.area() - 96.).abs() < 1e-12);
        assert!(!region.is_point_inside(Point2::new(5., 5.)));
        assert!(region.is_point_inside(Point2::new(1., 1.)));
    }

    #[test]
    fn test_pole_of_inaccessibility_square() {
        let region = Region2D::from_polygon(Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.));
        let pole = region.pole_of_inaccessibility(0.01);
        assert!(pole.is_equivalent(&Point2::new(5., 5.), 0.1));
    }

    #[test]
    fn test_pole_of_inaccessibility_l_shape_is_inside() {
        let l = Polygon2D::from_tuples(&[(0., 0.), (10., 0.), (10., 2.), (2., 2.), (2., 10.), (0., 10.)]);
        let region = Region2D::from_polygon(l);
        let pole = region.pole_of_inaccessibility(0.01);
        assert!(region.is_point_inside(pole));
        // centroid of this L lies outside the shape
        assert!(!region.is_point_inside(region.boundary.centroid()));
    }
}
