//! Roof geometry assigned to a story.

use crate::geom::face::Face3D;
use crate::geom::point::{Point, Point2};
use crate::geom::polygon::{PointRelation, boolean};
use crate::geom::region::Region2D;
use crate::geom::vector::Vector;
use serde::{Deserialize, Serialize};

/// Planar faces covering a story's footprint in plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoofSpecification {
    pub geometry: Vec<Face3D>,
}

impl RoofSpecification {
    pub fn new(geometry: Vec<Face3D>) -> Self {
        Self { geometry }
    }

    /// Number of face pairs whose plan projections overlap by more than `tol²`.
    pub fn overlap_count(&self, tol: f64) -> usize {
        let plans: Vec<Region2D> = self.geometry.iter().map(|f| f.plan_region()).collect();
        let mut count = 0;
        for i in 0..plans.len() {
            for j in (i + 1)..plans.len() {
                let shared = boolean::intersection(&plans[i..=i], &plans[j..=j], tol);
                if boolean::total_area(&shared) > tol * tol {
                    count += 1;
                }
            }
        }
        count
    }

    /// Roof faces clipped to a plan region, each lying on its original plane.
    pub fn clip_to_region(&self, region: &Region2D, tol: f64) -> Vec<Face3D> {
        let target = [region.clone()];
        let mut out = vec![];
        for face in &self.geometry {
            let base_z = face.max_z();
            for piece in boolean::intersection(&[face.plan_region()], &target, tol) {
                if piece.area() <= tol * tol {
                    continue;
                }
                let lift = |p: &Point2| Point::new(p.x, p.y, face.z_at(p.x, p.y).unwrap_or(base_z));
                out.push(Face3D::new(
                    piece.boundary.vertices().iter().map(lift).collect(),
                    piece
                        .holes
                        .iter()
                        .map(|h| h.vertices().iter().map(lift).collect())
                        .collect(),
                ));
            }
        }
        out
    }

    /// Roof elevation above a plan point (highest face that covers it).
    pub fn height_at(&self, pt: Point2, tol: f64) -> Option<f64> {
        self.geometry
            .iter()
            .filter(|f| f.plan_region().point_relationship(pt, tol) != PointRelation::Outside)
            .filter_map(|f| f.z_at(pt.x, pt.y))
            .reduce(f64::max)
    }

    /// Plan union of all roof faces.
    pub fn plan_footprint(&self, tol: f64) -> Vec<Region2D> {
        let plans: Vec<Region2D> = self.geometry.iter().map(|f| f.plan_region()).collect();
        boolean::union(&plans, tol)
    }

    pub fn move_by(&self, v: Vector) -> Self {
        Self::new(self.geometry.iter().map(|f| f.move_by(v)).collect())
    }

    pub fn scale(&self, factor: f64, origin: Option<Point>) -> Self {
        Self::new(self.geometry.iter().map(|f| f.scale(factor, origin)).collect())
    }

    pub fn rotate_xy(&self, angle: f64, origin: Point) -> Self {
        Self::new(self.geometry.iter().map(|f| f.rotate_xy(angle, origin)).collect())
    }
}
