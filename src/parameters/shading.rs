//! Shading descriptors: overhangs, extruded borders and louvers.

use crate::error::DragonflyError;
use crate::geom::face::Face3D;
use crate::geom::point::{Point, Point2};
use crate::geom::polygon::Polygon2D;
use crate::geom::vector::Vector;
use crate::parameters::{HostWall, check_non_negative, check_positive, check_spacing};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Direction in which louvers run along the wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LouverAxis {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShadingParameter {
    /// Single shade along the top of the wall, tilted down by `angle` degrees.
    Overhang {
        depth: f64,
        #[serde(default)]
        angle: f64,
    },
    /// Fins around every window of the wall.
    ExtrudedBorder { depth: f64 },
    LouversByCount {
        louver_count: usize,
        depth: f64,
        #[serde(default)]
        offset: f64,
        #[serde(default)]
        angle: f64,
        #[serde(default)]
        axis: LouverAxis,
        #[serde(default)]
        flip_start_side: bool,
    },
    LouversByDistance {
        distance: f64,
        depth: f64,
        #[serde(default)]
        offset: f64,
        #[serde(default)]
        angle: f64,
        #[serde(default)]
        axis: LouverAxis,
        #[serde(default)]
        flip_start_side: bool,
    },
}

impl ShadingParameter {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Overhang { .. } => "Overhang",
            Self::ExtrudedBorder { .. } => "ExtrudedBorder",
            Self::LouversByCount { .. } => "LouversByCount",
            Self::LouversByDistance { .. } => "LouversByDistance",
        }
    }

    pub fn validate(&self) -> Result<()> {
        let check_angle = |angle: f64| {
            if (-90. ..=90.).contains(&angle) {
                Ok(())
            } else {
                Err(DragonflyError::InvalidDescriptor(format!(
                    "Shade angle must be between -90 and 90 degrees, got {}",
                    angle
                )))
            }
        };
        match self {
            Self::Overhang { depth, angle } => {
                check_non_negative("depth", *depth)?;
                check_angle(*angle)?;
            }
            Self::ExtrudedBorder { depth } => check_non_negative("depth", *depth)?,
            Self::LouversByCount {
                louver_count,
                depth,
                offset,
                angle,
                ..
            } => {
                if *louver_count < 1 {
                    return Err(DragonflyError::InvalidDescriptor(
                        "louver_count must be at least 1".to_string(),
                    )
                    .into());
                }
                check_non_negative("depth", *depth)?;
                check_non_negative("offset", *offset)?;
                check_angle(*angle)?;
            }
            Self::LouversByDistance {
                distance,
                depth,
                offset,
                angle,
                ..
            } => {
                check_positive("distance", *distance)?;
                check_non_negative("depth", *depth)?;
                check_non_negative("offset", *offset)?;
                check_angle(*angle)?;
            }
        }
        Ok(())
    }

    /// Shade faces for a host wall.
    ///
    /// `windows` are the wall's window outlines in wall-local coordinates;
    /// only `ExtrudedBorder` uses them.
    pub fn apply(&self, host: &HostWall, windows: &[Polygon2D], tol: f64) -> Result<Vec<Face3D>> {
        self.validate()?;
        let basis = host.basis()?;
        let normal = basis.normal();
        let up = Vector::new(0., 0., 1.);
        let w = host.width();
        let h = host.height;
        let at = |u: f64, v: f64| basis.unproject(Point2::new(u, v));

        match self {
            Self::Overhang { depth, angle } => {
                if *depth <= tol {
                    return Ok(vec![]);
                }
                let a = angle.to_radians();
                let out = normal * (depth * a.cos()) - up * (depth * a.sin());
                let p0 = at(0., h);
                let p1 = at(w, h);
                Ok(vec![quad(p0, p1, p1 + out, p0 + out)])
            }
            Self::ExtrudedBorder { depth } => {
                if *depth <= tol {
                    return Ok(vec![]);
                }
                let out = normal * *depth;
                let mut faces = vec![];
                for win in windows {
                    for seg in win.segments() {
                        if seg.length() <= tol {
                            continue;
                        }
                        let p0 = at(seg.p1.x, seg.p1.y);
                        let p1 = at(seg.p2.x, seg.p2.y);
                        faces.push(quad(p0, p1, p1 + out, p0 + out));
                    }
                }
                Ok(faces)
            }
            Self::LouversByCount {
                louver_count,
                depth,
                offset,
                angle,
                axis,
                flip_start_side,
            } => {
                let span = match axis {
                    LouverAxis::Horizontal => h,
                    LouverAxis::Vertical => w,
                };
                let spacing = span / *louver_count as f64;
                let positions = louver_positions(span, spacing, *louver_count, *axis, *flip_start_side);
                Ok(louvers(host, &positions, *depth, *offset, *angle, *axis, tol)?)
            }
            Self::LouversByDistance {
                distance,
                depth,
                offset,
                angle,
                axis,
                flip_start_side,
            } => {
                let span = match axis {
                    LouverAxis::Horizontal => h,
                    LouverAxis::Vertical => w,
                };
                check_spacing("distance", *distance, tol)?;
                let count = ((span / distance).ceil() as usize).max(1);
                let positions = louver_positions(span, *distance, count, *axis, *flip_start_side);
                Ok(louvers(host, &positions, *depth, *offset, *angle, *axis, tol)?)
            }
        }
    }

    pub fn is_valid_for(&self, host: &HostWall, tol: f64) -> bool {
        let spaced = match self {
            Self::LouversByDistance { distance, .. } => *distance > tol,
            _ => true,
        };
        spaced && self.validate().is_ok() && host.width() > tol && host.height > tol
    }

    pub fn scale(&self, factor: f64) -> Self {
        let mut out = self.clone();
        match &mut out {
            Self::Overhang { depth, .. } | Self::ExtrudedBorder { depth } => *depth *= factor,
            Self::LouversByCount { depth, offset, .. } => {
                *depth *= factor;
                *offset *= factor;
            }
            Self::LouversByDistance {
                distance,
                depth,
                offset,
                ..
            } => {
                *distance *= factor;
                *depth *= factor;
                *offset *= factor;
            }
        }
        out
    }
}

fn quad(p0: Point, p1: Point, p2: Point, p3: Point) -> Face3D {
    Face3D::new(vec![p0, p1, p2, p3], vec![])
}

/// Louver positions along the span, measured from the floor (horizontal
/// louvers) or from the segment start (vertical louvers).
///
/// Horizontal louvers start at the top of the wall and vertical ones at the
/// segment start; `flip` starts them from the opposite edge.
fn louver_positions(span: f64, spacing: f64, count: usize, axis: LouverAxis, flip: bool) -> Vec<f64> {
    let from_high_edge = matches!(axis, LouverAxis::Horizontal) != flip;
    (0..count)
        .map(|k| k as f64 * spacing)
        .filter(|d| *d <= span)
        .map(|d| if from_high_edge { span - d } else { d })
        .collect()
}

fn louvers(
    host: &HostWall,
    positions: &[f64],
    depth: f64,
    offset: f64,
    angle: f64,
    axis: LouverAxis,
    tol: f64,
) -> Result<Vec<Face3D>> {
    if depth <= tol {
        return Ok(vec![]);
    }
    let basis = host.basis()?;
    let normal = basis.normal();
    let a = angle.to_radians();
    let shift = normal * offset;
    let faces = match axis {
        LouverAxis::Horizontal => {
            let out = normal * (depth * a.cos()) - basis.v * (depth * a.sin());
            positions
                .iter()
                .map(|&v| {
                    let p0 = basis.unproject(Point2::new(0., v)) + shift;
                    let p1 = basis.unproject(Point2::new(host.width(), v)) + shift;
                    quad(p0, p1, p1 + out, p0 + out)
                })
                .collect()
        }
        LouverAxis::Vertical => {
            let out = normal * (depth * a.cos()) + basis.u * (depth * a.sin());
            positions
                .iter()
                .map(|&u| {
                    let p0 = basis.unproject(Point2::new(u, 0.)) + shift;
                    let p1 = basis.unproject(Point2::new(u, host.height)) + shift;
                    quad(p0, p1, p1 + out, p0 + out)
                })
                .collect()
        }
    };
    Ok(faces)
}
