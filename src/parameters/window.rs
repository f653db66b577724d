//! Window descriptors.

use crate::error::DragonflyError;
use crate::geom::face::{Face3D, uv_rectangle};
use crate::geom::point::Point2;
use crate::geom::polygon::{Polygon2D, boolean};
use crate::geom::region::Region2D;
use crate::parameters::{HostWall, check_non_negative, check_positive, check_ratio, check_spacing};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Largest window-to-wall ratio a ratio descriptor may ask for.
pub const MAX_WINDOW_RATIO: f64 = 0.95;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WindowParameter {
    SingleWindow {
        width: f64,
        height: f64,
        #[serde(default = "default_sill")]
        sill_height: f64,
    },
    SimpleWindowRatio {
        window_ratio: f64,
    },
    RepeatingWindowRatio {
        window_ratio: f64,
        window_height: f64,
        sill_height: f64,
        horizontal_separation: f64,
        #[serde(default)]
        vertical_separation: f64,
    },
    RepeatingWindowWidthHeight {
        window_height: f64,
        window_width: f64,
        sill_height: f64,
        horizontal_separation: f64,
    },
    /// Explicit windows in wall-local (u, v) coordinates.
    DetailedWindows { polygons: Vec<Polygon2D> },
}

fn default_sill() -> f64 {
    1.
}

impl WindowParameter {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SingleWindow { .. } => "SingleWindow",
            Self::SimpleWindowRatio { .. } => "SimpleWindowRatio",
            Self::RepeatingWindowRatio { .. } => "RepeatingWindowRatio",
            Self::RepeatingWindowWidthHeight { .. } => "RepeatingWindowWidthHeight",
            Self::DetailedWindows { .. } => "DetailedWindows",
        }
    }

    /// Checks the construction-time invariants.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::SingleWindow {
                width,
                height,
                sill_height,
            } => {
                check_positive("width", *width)?;
                check_positive("height", *height)?;
                check_non_negative("sill_height", *sill_height)
            }
            Self::SimpleWindowRatio { window_ratio } => {
                check_ratio("window_ratio", *window_ratio, MAX_WINDOW_RATIO)
            }
            Self::RepeatingWindowRatio {
                window_ratio,
                window_height,
                sill_height,
                horizontal_separation,
                vertical_separation,
            } => {
                check_ratio("window_ratio", *window_ratio, MAX_WINDOW_RATIO)?;
                check_positive("window_height", *window_height)?;
                check_non_negative("sill_height", *sill_height)?;
                check_positive("horizontal_separation", *horizontal_separation)?;
                check_non_negative("vertical_separation", *vertical_separation)
            }
            Self::RepeatingWindowWidthHeight {
                window_height,
                window_width,
                sill_height,
                horizontal_separation,
            } => {
                check_positive("window_height", *window_height)?;
                check_positive("window_width", *window_width)?;
                check_non_negative("sill_height", *sill_height)?;
                check_positive("horizontal_separation", *horizontal_separation)
            }
            Self::DetailedWindows { polygons } => {
                if polygons.iter().any(|p| p.len() < 3) {
                    return Err(DragonflyError::InvalidDescriptor(
                        "Detailed windows need at least 3 vertices each".to_string(),
                    )
                    .into());
                }
                Ok(())
            }
        }
    }

    /// Window outlines in wall-local coordinates.
    pub fn apply_uv(&self, host: &HostWall, tol: f64) -> Result<Vec<Polygon2D>> {
        self.validate()?;
        if let Self::RepeatingWindowRatio { horizontal_separation, .. }
        | Self::RepeatingWindowWidthHeight { horizontal_separation, .. } = self
        {
            check_spacing("horizontal_separation", *horizontal_separation, tol)?;
        }
        let w = host.width();
        let h = host.height;
        if w <= 2. * tol || h <= 2. * tol {
            return Ok(vec![]);
        }
        match self {
            Self::SingleWindow {
                width,
                height,
                sill_height,
            } => {
                let top = h - tol;
                if *sill_height >= top {
                    return Err(DragonflyError::InvalidDescriptor(format!(
                        "Sill height {} is above the {} tall host wall",
                        sill_height, h
                    ))
                    .into());
                }
                let sill = sill_height.max(tol);
                let win_w = width.min(w - 2. * tol);
                let win_h = height.min(top - sill);
                Ok(vec![uv_rectangle((w - win_w) / 2., sill, win_w, win_h)])
            }
            Self::SimpleWindowRatio { window_ratio } => {
                if *window_ratio <= 0. {
                    return Ok(vec![]);
                }
                let s = window_ratio.sqrt();
                let (win_w, win_h) = (w * s, h * s);
                Ok(vec![uv_rectangle((w - win_w) / 2., (h - win_h) / 2., win_w, win_h)])
            }
            Self::RepeatingWindowRatio {
                window_ratio,
                window_height,
                sill_height,
                horizontal_separation,
                vertical_separation,
            } => {
                if *window_ratio <= 0. {
                    return Ok(vec![]);
                }
                Ok(repeating_ratio(
                    w,
                    h,
                    *window_ratio,
                    *window_height,
                    *sill_height,
                    *horizontal_separation,
                    *vertical_separation,
                    tol,
                ))
            }
            Self::RepeatingWindowWidthHeight {
                window_height,
                window_width,
                sill_height,
                horizontal_separation,
            } => {
                let top = h - tol;
                if *sill_height >= top {
                    return Err(DragonflyError::InvalidDescriptor(format!(
                        "Sill height {} is above the {} tall host wall",
                        sill_height, h
                    ))
                    .into());
                }
                let n = bay_count(w, *horizontal_separation);
                let bay = w / n as f64;
                let sill = sill_height.max(tol);
                let win_w = window_width.min(bay - 2. * tol);
                let win_h = window_height.min(top - sill);
                Ok((0..n)
                    .map(|i| uv_rectangle(i as f64 * bay + (bay - win_w) / 2., sill, win_w, win_h))
                    .collect())
            }
            Self::DetailedWindows { polygons } => {
                let host_region = [Region2D::from_polygon(host.uv_outline())];
                let mut out = vec![];
                for poly in polygons {
                    let clipped = boolean::intersection(
                        &[Region2D::from_polygon(poly.clone())],
                        &host_region,
                        tol,
                    );
                    out.extend(clipped.into_iter().map(|r| r.boundary));
                }
                Ok(out)
            }
        }
    }

    /// Window faces on the host wall.
    pub fn apply(&self, host: &HostWall, tol: f64) -> Result<Vec<Face3D>> {
        host.lift(&self.apply_uv(host, tol)?)
    }

    /// True if the descriptor produces windows that fit inside the host.
    pub fn is_valid_for(&self, host: &HostWall, tol: f64) -> bool {
        match self.apply_uv(host, tol) {
            Ok(polys) => {
                let outline = host.uv_outline();
                polys.iter().all(|p| outline.contains_polygon(p, tol))
            }
            Err(_) => false,
        }
    }

    /// Total window area on the host.
    pub fn area_on(&self, host: &HostWall, tol: f64) -> Result<f64> {
        Ok(self.apply_uv(host, tol)?.iter().map(|p| p.area()).sum())
    }

    /// Scales every length by `factor` (ratios are unitless).
    pub fn scale(&self, factor: f64) -> Self {
        match self {
            Self::SingleWindow {
                width,
                height,
                sill_height,
            } => Self::SingleWindow {
                width: width * factor,
                height: height * factor,
                sill_height: sill_height * factor,
            },
            Self::SimpleWindowRatio { .. } => self.clone(),
            Self::RepeatingWindowRatio {
                window_ratio,
                window_height,
                sill_height,
                horizontal_separation,
                vertical_separation,
            } => Self::RepeatingWindowRatio {
                window_ratio: *window_ratio,
                window_height: window_height * factor,
                sill_height: sill_height * factor,
                horizontal_separation: horizontal_separation * factor,
                vertical_separation: vertical_separation * factor,
            },
            Self::RepeatingWindowWidthHeight {
                window_height,
                window_width,
                sill_height,
                horizontal_separation,
            } => Self::RepeatingWindowWidthHeight {
                window_height: window_height * factor,
                window_width: window_width * factor,
                sill_height: sill_height * factor,
                horizontal_separation: horizontal_separation * factor,
            },
            Self::DetailedWindows { polygons } => Self::DetailedWindows {
                polygons: polygons
                    .iter()
                    .map(|p| p.scale(factor, Point2::new(0., 0.)))
                    .collect(),
            },
        }
    }

    /// Same windows seen from a segment that runs the other way.
    pub fn flip(&self, seg_length: f64) -> Self {
        match self {
            Self::DetailedWindows { polygons } => Self::DetailedWindows {
                polygons: polygons
                    .iter()
                    .map(|p| {
                        Polygon2D::new(
                            p.vertices()
                                .iter()
                                .rev()
                                .map(|v| Point2::new(seg_length - v.x, v.y))
                                .collect(),
                        )
                    })
                    .collect(),
            },
            _ => self.clone(),
        }
    }
}

fn bay_count(width: f64, separation: f64) -> usize {
    ((width / separation).round() as usize).max(1)
}

/// Bays of equal width with one window each, sized so their total area is
/// `ratio * w * h`.
#[allow(clippy::too_many_arguments)]
fn repeating_ratio(
    w: f64,
    h: f64,
    ratio: f64,
    window_height: f64,
    sill_height: f64,
    separation: f64,
    vertical_separation: f64,
    tol: f64,
) -> Vec<Polygon2D> {
    let target = ratio * w * h;
    let n = bay_count(w, separation);
    let bay = w / n as f64;
    let max_w = bay - 2. * tol;
    let max_h = h - 2. * tol;

    let mut win_h = window_height.min(max_h);
    let mut win_w = target / (n as f64 * win_h);
    if win_w > max_w {
        // The ratio wins over the requested height
        win_w = max_w;
        win_h = (target / (n as f64 * win_w)).min(max_h);
    }
    let mut sill = sill_height.max(tol);
    if sill + win_h > h - tol {
        sill = (h - tol - win_h).max(tol);
    }

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let u0 = i as f64 * bay + (bay - win_w) / 2.;
        if vertical_separation > 0. && win_h + vertical_separation <= max_h {
            let pane = win_h / 2.;
            let mut lower = sill;
            if lower + win_h + vertical_separation > h - tol {
                lower = h - tol - win_h - vertical_separation;
            }
            out.push(uv_rectangle(u0, lower, win_w, pane));
            out.push(uv_rectangle(u0, lower + pane + vertical_separation, win_w, pane));
        } else {
            out.push(uv_rectangle(u0, sill, win_w, win_h));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::kind;
    use crate::geom::point::Point;

    const TOL: f64 = 0.01;

    fn wall(w: f64, h: f64) -> HostWall {
        HostWall::new(Point::new(0., 0., 0.), Point::new(w, 0., 0.), h)
    }

    #[test]
    fn test_simple_ratio_area() -> Result<()> {
        let host = wall(10., 3.);
        let wp = WindowParameter::SimpleWindowRatio { window_ratio: 0.4 };
        let area = wp.area_on(&host, TOL)?;
        assert!((area - 12.).abs() < 1e-9);
        assert!(wp.is_valid_for(&host, TOL));
        Ok(())
    }

    #[test]
    fn test_separation_below_tolerance_fails() {
        let host = wall(10., 3.);
        let narrow = [
            WindowParameter::RepeatingWindowRatio {
                window_ratio: 0.4,
                window_height: 2.,
                sill_height: 0.8,
                horizontal_separation: 1e-9,
                vertical_separation: 0.,
            },
            WindowParameter::RepeatingWindowWidthHeight {
                window_height: 2.,
                window_width: 1.,
                sill_height: 0.8,
                horizontal_separation: 1e-9,
            },
        ];
        for wp in narrow {
            let err = wp.apply_uv(&host, TOL).unwrap_err();
            assert!(matches!(kind(&err), Some(DragonflyError::InvalidDescriptor(_))));
            assert!(!wp.is_valid_for(&host, TOL));
        }
    }

    #[test]
    fn test_ratio_above_limit_fails() {
        let wp = WindowParameter::SimpleWindowRatio { window_ratio: 0.96 };
        let err = wp.apply_uv(&wall(10., 3.), TOL).unwrap_err();
        assert!(matches!(kind(&err), Some(DragonflyError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_repeating_ratio_on_20x3_wall() -> Result<()> {
        let host = wall(20., 3.);
        let wp = WindowParameter::RepeatingWindowRatio {
            window_ratio: 0.4,
            window_height: 2.,
            sill_height: 0.8,
            horizontal_separation: 3.,
            vertical_separation: 0.,
        };
        let polys = wp.apply_uv(&host, TOL)?;
        assert_eq!(polys.len(), 7);
        let total: f64 = polys.iter().map(|p| p.area()).sum();
        assert!((total - 24.).abs() <= 0.24);
        let outline = host.uv_outline();
        for p in &polys {
            for v in p.vertices() {
                assert!(v.x > 0. && v.x < 20. && v.y > 0. && v.y < 3.);
            }
            assert!(outline.contains_polygon(p, 0.));
            let (lo, hi) = p.bbox();
            assert!(hi.y - lo.y >= 1.);
        }
        Ok(())
    }

    #[test]
    fn test_repeating_ratio_height_grows() -> Result<()> {
        // Two bays of 1 m cannot hold a 2 m tall window at 0.8 ratio
        let host = wall(2., 3.);
        let wp = WindowParameter::RepeatingWindowRatio {
            window_ratio: 0.8,
            window_height: 1.,
            sill_height: 1.,
            horizontal_separation: 1.,
            vertical_separation: 0.,
        };
        let polys = wp.apply_uv(&host, TOL)?;
        let total: f64 = polys.iter().map(|p| p.area()).sum();
        assert!((total - 4.8).abs() < 1e-9);
        assert!(wp.is_valid_for(&host, TOL));
        Ok(())
    }

    #[test]
    fn test_vertical_separation_splits_panes() -> Result<()> {
        let host = wall(6., 4.);
        let wp = WindowParameter::RepeatingWindowRatio {
            window_ratio: 0.3,
            window_height: 2.,
            sill_height: 0.8,
            horizontal_separation: 3.,
            vertical_separation: 0.3,
        };
        let polys = wp.apply_uv(&host, TOL)?;
        assert_eq!(polys.len(), 4);
        let total: f64 = polys.iter().map(|p| p.area()).sum();
        assert!((total - 7.2).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_single_window_truncated_and_sill_check() -> Result<()> {
        let host = wall(2., 3.);
        let wp = WindowParameter::SingleWindow {
            width: 5.,
            height: 1.5,
            sill_height: 1.,
        };
        let polys = wp.apply_uv(&host, TOL)?;
        let (lo, hi) = polys[0].bbox();
        assert!((hi.x - lo.x - 1.98).abs() < 1e-9);
        assert!(wp.is_valid_for(&host, TOL));

        let too_high = WindowParameter::SingleWindow {
            width: 1.,
            height: 1.,
            sill_height: 3.5,
        };
        assert!(too_high.apply_uv(&host, TOL).is_err());
        assert!(!too_high.is_valid_for(&host, TOL));
        Ok(())
    }

    #[test]
    fn test_detailed_windows_clipped_to_host() -> Result<()> {
        let host = wall(4., 3.);
        let wp = WindowParameter::DetailedWindows {
            polygons: vec![Polygon2D::from_tuples(&[(3., 1.), (5., 1.), (5., 2.), (3., 2.)])],
        };
        let polys = wp.apply_uv(&host, TOL)?;
        assert_eq!(polys.len(), 1);
        assert!((polys[0].area() - 1.).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_serde_tag() -> Result<()> {
        let wp: WindowParameter =
            serde_json::from_str(r#"{"type": "SimpleWindowRatio", "window_ratio": 0.3}"#)?;
        assert_eq!(wp, WindowParameter::SimpleWindowRatio { window_ratio: 0.3 });
        Ok(())
    }
}
