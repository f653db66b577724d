//! Parametric window, shading, skylight and roof descriptors.
//!
//! Descriptors are value objects. Evaluating one against a host wall (or a
//! roof face) emits concrete sub-face geometry; nothing is stored back.

pub mod roof;
pub mod shading;
pub mod skylight;
pub mod window;

pub use roof::RoofSpecification;
pub use shading::{LouverAxis, ShadingParameter};
pub use skylight::SkylightParameter;
pub use window::WindowParameter;

use crate::error::DragonflyError;
use crate::geom::face::Face3D;
use crate::geom::point::{Point, Point2};
use crate::geom::polygon::Polygon2D;
use crate::geom::projection::PlaneBasis;
use crate::geom::vector::Vector;
use anyhow::Result;

/// A vertical wall extruded from one floor plate segment.
///
/// `start` and `end` sit at floor elevation. Wall-local coordinates run
/// `u` from `start` towards `end` and `v` up from the floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostWall {
    pub start: Point,
    pub end: Point,
    pub height: f64,
}

impl HostWall {
    pub fn new(start: Point, end: Point, height: f64) -> Self {
        Self { start, end, height }
    }

    pub fn width(&self) -> f64 {
        self.start.to_plan().distance(&self.end.to_plan())
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height
    }

    pub fn basis(&self) -> Result<PlaneBasis> {
        PlaneBasis::wall(self.start, self.end).ok_or_else(|| {
            DragonflyError::InvalidGeometry(format!(
                "Wall from {} to {} has no length",
                self.start, self.end
            ))
            .into()
        })
    }

    /// Outward unit normal.
    pub fn normal(&self) -> Result<Vector> {
        Ok(self.basis()?.normal())
    }

    /// Wall outline in wall-local coordinates.
    pub fn uv_outline(&self) -> Polygon2D {
        Polygon2D::rectangle(Point2::new(0., 0.), self.width(), self.height)
    }

    pub fn face(&self) -> Result<Face3D> {
        Ok(Face3D::from_basis(&self.basis()?, &self.uv_outline()))
    }

    /// Lifts wall-local polygons into 3D faces on the wall plane.
    pub fn lift(&self, polygons: &[Polygon2D]) -> Result<Vec<Face3D>> {
        let basis = self.basis()?;
        Ok(polygons.iter().map(|p| Face3D::from_basis(&basis, p)).collect())
    }
}

pub(crate) fn check_positive(name: &str, value: f64) -> Result<()> {
    if value > 0. && value.is_finite() {
        Ok(())
    } else {
        Err(DragonflyError::InvalidDescriptor(format!("{} must be greater than 0, got {}", name, value)).into())
    }
}

pub(crate) fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if value >= 0. && value.is_finite() {
        Ok(())
    } else {
        Err(DragonflyError::InvalidDescriptor(format!("{} must be 0 or greater, got {}", name, value)).into())
    }
}

/// Spacing of repeated windows or louvers; at or below `tol` the repeat count has no bound.
pub(crate) fn check_spacing(name: &str, value: f64, tol: f64) -> Result<()> {
    if value > tol && value.is_finite() {
        Ok(())
    } else {
        Err(DragonflyError::InvalidDescriptor(format!(
            "{} must be greater than the tolerance {}, got {}",
            name, tol, value
        ))
        .into())
    }
}

pub(crate) fn check_ratio(name: &str, value: f64, max: f64) -> Result<()> {
    if (0. ..=max).contains(&value) {
        Ok(())
    } else {
        Err(DragonflyError::InvalidDescriptor(format!(
            "{} must be between 0 and {}, got {}",
            name, max, value
        ))
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_wall_face() -> Result<()> {
        let wall = HostWall::new(Point::new(0., 0., 0.), Point::new(20., 0., 0.), 3.);
        assert!((wall.area() - 60.).abs() < 1e-12);
        let face = wall.face()?;
        assert!((face.area() - 60.).abs() < 1e-9);
        assert!(face.normal().unwrap().is_close(&Vector::new(0., -1., 0.)));
        Ok(())
    }
}
