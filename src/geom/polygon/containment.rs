use crate::geom::point::Point2;
use crate::geom::polygon::Polygon2D;

/// Relationship between a point and a closed ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointRelation {
    Inside,
    Outside,
    OnBoundary,
}

impl Polygon2D {
    /// Checks if a point lies inside the ring (even-odd ray casting).
    ///
    /// Points exactly on the boundary may go either way; use
    /// [`Polygon2D::point_relationship`] when the boundary matters.
    pub fn is_point_inside(&self, pt: Point2) -> bool {
        let pts = self.vertices();
        let n = pts.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = pts[i];
            let pj = pts[j];
            if (pi.y > pt.y) != (pj.y > pt.y) {
                let x_cross = (pj.x - pi.x) * (pt.y - pi.y) / (pj.y - pi.y) + pi.x;
                if pt.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Classifies a point as inside, outside or on the boundary within `tol`.
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

    /// Minimum distance from a point to any segment of the ring.
    pub fn distance_to_boundary(&self, pt: Point2) -> f64 {
        self.segments()
            .iter()
            .map(|s| s.distance_to_point(pt))
            .fold(f64::INFINITY, f64::min)
    }

    /// True if every vertex of `other` is inside or on this ring.
    pub fn contains_polygon(&self, other: &Polygon2D, tol: f64) -> bool {
        other
            .vertices()
            .iter()
            .all(|p| self.point_relationship(*p, tol) != PointRelation::Outside)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_shape() -> Polygon2D {
        Polygon2D::from_tuples(&[(0., 0.), (4., 0.), (4., 2.), (2., 2.), (2., 4.), (0., 4.)])
    }

    #[test]
    fn test_point_inside_l_shape() {
        let poly = l_shape();
        assert!(poly.is_point_inside(Point2::new(1., 1.)));
        assert!(poly.is_point_inside(Point2::new(1., 3.)));
        assert!(!poly.is_point_inside(Point2::new(3., 3.)));
        assert!(!poly.is_point_inside(Point2::new(-1., 1.)));
    }

    #[test]
    fn test_point_on_boundary() {
        let poly = l_shape();
        assert_eq!(
            poly.point_relationship(Point2::new(4., 1.), 1e-6),
            PointRelation::OnBoundary
        );
        assert_eq!(
            poly.point_relationship(Point2::new(3., 1.), 1e-6),
            PointRelation::Inside
        );
        assert_eq!(
            poly.point_relationship(Point2::new(3., 3.), 1e-6),
            PointRelation::Outside
        );
    }

    #[test]
    fn test_contains_polygon() {
        let outer = Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.);
        let inner = Polygon2D::rectangle(Point2::new(2., 2.), 3., 3.);
        assert!(outer.contains_polygon(&inner, 1e-6));
        assert!(!inner.contains_polygon(&outer, 1e-6));
    }
}
