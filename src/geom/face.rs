//! Planar faces in 3D.
//!
//! Floor plates, roofs, walls and every sub-face emitted by the descriptors
//! are `Face3D`s. A face is a closed boundary loop plus optional holes that
//! all lie in one plane; the boundary winding defines the normal.

use crate::geom::EPS;
use crate::geom::point::{Point, Point2};
use crate::geom::polygon::Polygon2D;
use crate::geom::projection::PlaneBasis;
use crate::geom::region::Region2D;
use crate::geom::vector::Vector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
enum Face3DType {
    #[default]
    Face3D,
}

/// Dictionary form, `{"type": "Face3D", "boundary": [...], "holes": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Face3DDict {
    #[serde(rename = "type", default)]
    kind: Face3DType,
    boundary: Vec<Point>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    holes: Vec<Vec<Point>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Face3DDict", into = "Face3DDict")]
pub struct Face3D {
    boundary: Vec<Point>,
    holes: Vec<Vec<Point>>,
}

impl From<Face3DDict> for Face3D {
    fn from(d: Face3DDict) -> Self {
        Self::new(d.boundary, d.holes)
    }
}

impl From<Face3D> for Face3DDict {
    fn from(f: Face3D) -> Self {
        Self {
            kind: Face3DType::Face3D,
            boundary: f.boundary,
            holes: f.holes,
        }
    }
}

impl Face3D {
    pub fn new(boundary: Vec<Point>, holes: Vec<Vec<Point>>) -> Self {
        Self { boundary, holes }
    }

    /// Horizontal face at elevation `z` from a plan region (normal up).
    pub fn from_plan_region(region: &Region2D, z: f64) -> Self {
        let lift = |poly: &Polygon2D| poly.vertices().iter().map(|p| p.at_z(z)).collect();
        Self::new(
            lift(&region.boundary.to_ccw()),
            region.holes.iter().map(|h| lift(&h.to_cw())).collect(),
        )
    }

    pub fn from_plan_polygon(poly: &Polygon2D, z: f64) -> Self {
        Self::from_plan_region(&Region2D::from_polygon(poly.clone()), z)
    }

    /// Lifts a polygon drawn in a plane's (u, v) coordinates back into 3D.
    pub fn from_basis(basis: &PlaneBasis, poly: &Polygon2D) -> Self {
        Self::new(
            poly.vertices().iter().map(|p| basis.unproject(*p)).collect(),
            vec![],
        )
    }

    pub fn boundary(&self) -> &[Point] {
        &self.boundary
    }

    pub fn holes(&self) -> &[Vec<Point>] {
        &self.holes
    }

    pub fn has_holes(&self) -> bool {
        !self.holes.is_empty()
    }

    /// Boundary followed by hole vertices.
    pub fn all_vertices(&self) -> impl Iterator<Item = &Point> {
        self.boundary.iter().chain(self.holes.iter().flatten())
    }

    /// Unit normal from Newell's method (follows the boundary winding).
    pub fn normal(&self) -> Option<Vector> {
        let n = self.boundary.len();
        if n < 3 {
            return None;
        }
        let mut nv = Vector::new(0., 0., 0.);
        for i in 0..n {
            let c = self.boundary[i];
            let nx = self.boundary[(i + 1) % n];
            nv.dx += (c.y - nx.y) * (c.z + nx.z);
            nv.dy += (c.z - nx.z) * (c.x + nx.x);
            nv.dz += (c.x - nx.x) * (c.y + nx.y);
        }
        nv.normalize()
    }

    pub fn basis(&self) -> Option<PlaneBasis> {
        let normal = self.normal()?;
        PlaneBasis::from_normal(*self.boundary.first()?, normal)
    }

    /// Face projected into its own plane coordinates.
    pub fn to_plane_region(&self, basis: &PlaneBasis) -> Region2D {
        let flat = |pts: &[Point]| Polygon2D::new(pts.iter().map(|p| basis.project(*p)).collect());
        Region2D::new(
            flat(&self.boundary),
            self.holes.iter().map(|h| flat(h)).collect(),
        )
    }

    pub fn area(&self) -> f64 {
        match self.basis() {
            Some(b) => self.to_plane_region(&b).area(),
            None => 0.,
        }
    }

    pub fn centroid(&self) -> Point {
        match self.basis() {
            Some(b) => b.unproject(self.to_plane_region(&b).boundary.centroid()),
            None => {
                let n = self.boundary.len().max(1) as f64;
                let (x, y, z) = self
                    .boundary
                    .iter()
                    .fold((0., 0., 0.), |(x, y, z), p| (x + p.x, y + p.y, z + p.z));
                Point::new(x / n, y / n, z / n)
            }
        }
    }

    pub fn min_z(&self) -> f64 {
        self.all_vertices().map(|p| p.z).fold(f64::INFINITY, f64::min)
    }

    pub fn max_z(&self) -> f64 {
        self.all_vertices().map(|p| p.z).fold(f64::NEG_INFINITY, f64::max)
    }

    /// True if the normal is within `angle_tol` degrees of straight up or down.
    pub fn is_horizontal(&self, angle_tol: f64) -> bool {
        match self.normal() {
            Some(n) => {
                let a = n.angle(&Vector::new(0., 0., 1.));
                a <= angle_tol || a >= 180. - angle_tol
            }
            None => false,
        }
    }

    pub fn is_planar(&self, tol: f64) -> bool {
        match self.basis() {
            Some(b) => self.all_vertices().all(|p| b.distance_to(*p).abs() <= tol),
            None => false,
        }
    }

    /// Plan footprint (Z dropped), boundary counter-clockwise.
    pub fn plan_region(&self) -> Region2D {
        let flat = |pts: &[Point]| Polygon2D::new(pts.iter().map(|p| p.to_plan()).collect());
        Region2D::new(
            flat(&self.boundary),
            self.holes.iter().map(|h| flat(h)).collect(),
        )
    }

    pub fn plan_boundary(&self) -> Polygon2D {
        Polygon2D::new(self.boundary.iter().map(|p| p.to_plan()).collect())
    }

    /// Elevation of the face's plane at a plan position (None for vertical faces).
    pub fn z_at(&self, x: f64, y: f64) -> Option<f64> {
        let n = self.normal()?;
        if n.dz.abs() < EPS {
            return None;
        }
        let o = *self.boundary.first()?;
        Some(o.z - (n.dx * (x - o.x) + n.dy * (y - o.y)) / n.dz)
    }

    /// Orthogonal projection of a point onto the face plane.
    pub fn project_point(&self, p: Point) -> Option<Point> {
        let b = self.basis()?;
        Some(p + b.normal() * -b.distance_to(p))
    }

    pub fn distance_to_plane(&self, p: Point) -> Option<f64> {
        Some(self.basis()?.distance_to(p).abs())
    }

    pub fn flip(&self) -> Self {
        let rev = |pts: &Vec<Point>| pts.iter().rev().copied().collect::<Vec<_>>();
        Self::new(rev(&self.boundary), self.holes.iter().map(rev).collect())
    }

    fn map_points(&self, f: impl Fn(&Point) -> Point) -> Self {
        Self::new(
            self.boundary.iter().map(&f).collect(),
            self.holes.iter().map(|h| h.iter().map(&f).collect()).collect(),
        )
    }

    pub fn move_by(&self, v: Vector) -> Self {
        self.map_points(|p| *p + v)
    }

    pub fn scale(&self, factor: f64, origin: Option<Point>) -> Self {
        self.map_points(|p| p.scale(factor, origin))
    }

    pub fn rotate_xy(&self, angle: f64, origin: Point) -> Self {
        self.map_points(|p| p.rotate_xy(angle, origin))
    }

    /// Same face with every vertex set to elevation `z`.
    pub fn at_z(&self, z: f64) -> Self {
        self.map_points(|p| Point::new(p.x, p.y, z))
    }

    pub fn is_equivalent(&self, other: &Self, tol: f64) -> bool {
        self.boundary.len() == other.boundary.len()
            && self.holes.len() == other.holes.len()
            && self
                .all_vertices()
                .zip(other.all_vertices())
                .all(|(a, b)| a.is_equivalent(b, tol))
    }
}

/// Rectangle in a plane's (u, v) coordinates.
pub fn uv_rectangle(u0: f64, v0: f64, width: f64, height: f64) -> Polygon2D {
    Polygon2D::rectangle(Point2::new(u0, v0), width, height)
}
