//! Skylight descriptors.

use crate::error::DragonflyError;
use crate::geom::face::Face3D;
use crate::geom::point::{Point, Point2};
use crate::geom::polygon::{Polygon2D, boolean};
use crate::geom::region::Region2D;
use crate::parameters::check_ratio;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Largest skylight-to-roof ratio.
pub const MAX_SKYLIGHT_RATIO: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SkylightParameter {
    GriddedSkylightRatio {
        skylight_ratio: f64,
        /// Grid cell size; half the smaller plan dimension of the roof when unset
        #[serde(default, skip_serializing_if = "Option::is_none")]
        spacing: Option<f64>,
    },
    /// Skylight outlines in world plan coordinates.
    DetailedSkylights { polygons: Vec<Polygon2D> },
}

impl SkylightParameter {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GriddedSkylightRatio { .. } => "GriddedSkylightRatio",
            Self::DetailedSkylights { .. } => "DetailedSkylights",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::GriddedSkylightRatio {
                skylight_ratio,
                spacing,
            } => {
                check_ratio("skylight_ratio", *skylight_ratio, MAX_SKYLIGHT_RATIO)?;
                if let Some(s) = spacing {
                    crate::parameters::check_positive("spacing", *s)?;
                }
                Ok(())
            }
            Self::DetailedSkylights { polygons } => {
                if polygons.iter().any(|p| p.len() < 3) {
                    return Err(DragonflyError::InvalidDescriptor(
                        "Detailed skylights need at least 3 vertices each".to_string(),
                    )
                    .into());
                }
                Ok(())
            }
        }
    }

    /// Skylight outlines in plan for a roof footprint.
    pub fn apply_plan(&self, roof: &Region2D, tol: f64) -> Result<Vec<Region2D>> {
        self.validate()?;
        match self {
            Self::GriddedSkylightRatio {
                skylight_ratio,
                spacing,
            } => {
                if *skylight_ratio <= 0. {
                    return Ok(vec![]);
                }
                let (min, max) = roof.bbox();
                let spacing = spacing.unwrap_or_else(|| (max.x - min.x).min(max.y - min.y) / 2.);
                if spacing <= tol {
                    return Ok(vec![]);
                }
                let factor = skylight_ratio.sqrt();
                let roof_set = [roof.clone()];
                let mut out = vec![];
                let mut y = min.y;
                while y < max.y - tol {
                    let mut x = min.x;
                    while x < max.x - tol {
                        let cell = Region2D::from_polygon(Polygon2D::rectangle(
                            Point2::new(x, y),
                            spacing,
                            spacing,
                        ));
                        for piece in boolean::intersection(&[cell], &roof_set, tol) {
                            let c = piece.boundary.centroid();
                            out.push(piece.scale(factor, c));
                        }
                        x += spacing;
                    }
                    y += spacing;
                }
                Ok(out)
            }
            Self::DetailedSkylights { polygons } => {
                let roof_set = [roof.clone()];
                let mut out = vec![];
                for poly in polygons {
                    out.extend(boolean::intersection(
                        &[Region2D::from_polygon(poly.clone())],
                        &roof_set,
                        tol,
                    ));
                }
                Ok(out)
            }
        }
    }

    /// Skylight faces lying on the roof face.
    pub fn apply(&self, roof: &Face3D, tol: f64) -> Result<Vec<Face3D>> {
        let plan = roof.plan_region();
        let regions = self.apply_plan(&plan, tol)?;
        let base_z = roof.boundary().first().map(|p| p.z).unwrap_or(0.);
        let lift = |p: &Point2| Point::new(p.x, p.y, roof.z_at(p.x, p.y).unwrap_or(base_z));
        Ok(regions
            .iter()
            .map(|r| {
                Face3D::new(
                    r.boundary.vertices().iter().map(lift).collect(),
                    r.holes
                        .iter()
                        .map(|h| h.vertices().iter().map(lift).collect())
                        .collect(),
                )
            })
            .collect())
    }

    pub fn is_valid_for(&self, roof: &Face3D, tol: f64) -> bool {
        match self.apply_plan(&roof.plan_region(), tol) {
            Ok(regions) => {
                let plan = roof.plan_region();
                regions.iter().all(|r| plan.boundary.contains_polygon(&r.boundary, tol))
            }
            Err(_) => false,
        }
    }

    pub fn scale(&self, factor: f64) -> Self {
        let origin = Point2::new(0., 0.);
        match self {
            Self::GriddedSkylightRatio {
                skylight_ratio,
                spacing,
            } => Self::GriddedSkylightRatio {
                skylight_ratio: *skylight_ratio,
                spacing: spacing.map(|s| s * factor),
            },
            Self::DetailedSkylights { polygons } => Self::DetailedSkylights {
                polygons: polygons.iter().map(|p| p.scale(factor, origin)).collect(),
            },
        }
    }

    /// Moves detailed skylights along with their room.
    pub fn move_by(&self, dx: f64, dy: f64) -> Self {
        match self {
            Self::DetailedSkylights { polygons } => Self::DetailedSkylights {
                polygons: polygons.iter().map(|p| p.move_by(dx, dy)).collect(),
            },
            _ => self.clone(),
        }
    }
}
