//! Context shades: geometry that casts shade but is not simulated.

use crate::geom::face::Face3D;
use crate::geom::point::Point;
use crate::geom::region::Region2D;
use crate::geom::vector::Vector;
use crate::id::valid_identifier;
use crate::name::HasIdentifier;
use crate::properties::ExtensionProperties;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct ContextShade {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub geometry: Vec<Face3D>,
    /// Detached shades do not move with a building
    #[serde(default = "default_detached")]
    pub is_detached: bool,
    #[serde(default)]
    pub properties: ExtensionProperties,
}

fn default_detached() -> bool {
    true
}

impl HasIdentifier for ContextShade {
    fn identifier(&self) -> &str {
        &self.identifier
    }
    fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.identifier)
    }
}

impl ContextShade {
    pub fn new(identifier: &str, geometry: Vec<Face3D>) -> Result<Self> {
        Ok(Self {
            identifier: valid_identifier(identifier)?,
            display_name: None,
            geometry,
            is_detached: true,
            properties: ExtensionProperties::new(),
        })
    }

    pub fn area(&self) -> f64 {
        self.geometry.iter().map(|f| f.area()).sum()
    }

    /// Plan projections of the non-vertical faces.
    pub fn plan_regions(&self, angle_tol: f64) -> Vec<Region2D> {
        let up = Vector::new(0., 0., 1.);
        self.geometry
            .iter()
            .filter(|f| f.normal().is_some_and(|n| (n.angle(&up) - 90.).abs() > angle_tol))
            .map(|f| f.plan_region())
            .collect()
    }

    pub fn move_by(&mut self, v: Vector) {
        self.geometry = self.geometry.iter().map(|f| f.move_by(v)).collect();
    }

    pub fn scale(&mut self, factor: f64, origin: Option<Point>) {
        self.geometry = self.geometry.iter().map(|f| f.scale(factor, origin)).collect();
    }

    /// Faces that are not planar within `tol`.
    pub fn check_planar(&self, tol: f64) -> String {
        self.geometry
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_planar(tol))
            .map(|(i, _)| format!("Face {} of ContextShade \"{}\" is not planar.", i, self.identifier))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::point::Point2;
    use crate::geom::polygon::Polygon2D;

    #[test]
    fn test_context_shade_roundtrip() -> Result<()> {
        let canopy = Face3D::from_plan_polygon(&Polygon2D::rectangle(Point2::new(0., 0.), 4., 2.), 3.);
        let wall = Face3D::new(
            vec![
                Point::new(0., 0., 0.),
                Point::new(4., 0., 0.),
                Point::new(4., 0., 3.),
                Point::new(0., 0., 3.),
            ],
            vec![],
        );
        let shade = ContextShade::new("Tree_Canopy", vec![canopy, wall])?;
        assert!((shade.area() - 20.).abs() < 1e-9);
        assert_eq!(shade.plan_regions(1.).len(), 1);
        assert!(shade.check_planar(0.01).is_empty());

        let v = serde_json::to_value(&shade)?;
        assert_eq!(v["type"], "ContextShade");
        let back: ContextShade = serde_json::from_value(v)?;
        assert_eq!(back, shade);
        Ok(())
    }
}
