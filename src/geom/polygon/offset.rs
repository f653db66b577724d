//! Inward offsets and core/perimeter subdivision.
//!
//! Offsets are mitered: every edge moves inward by the same distance and new
//! vertices sit where neighbouring offset edges meet. This matches the first
//! event-free step of a straight skeleton, so it fails instead of guessing
//! once an edge would collapse or flip.

use crate::error::DragonflyError;
use crate::geom::point::Point2;
use crate::geom::polygon::Polygon2D;
use anyhow::Result;

impl Polygon2D {
    /// Offsets a ring inward by `distance` (negative grows it).
    ///
    /// The ring is treated as counter-clockwise.
    pub fn offset(&self, distance: f64, tol: f64) -> Result<Polygon2D> {
        let ring = self.to_ccw();
        let pts = ring.vertices();
        let n = pts.len();
        if n < 3 {
            return Err(DragonflyError::InvalidGeometry(
                "Cannot offset a polygon with fewer than 3 vertices".to_string(),
            )
            .into());
        }

        let normals: Vec<(f64, f64)> = ring
            .segments()
            .iter()
            .map(|s| {
                s.unit_direction()
                    .map(|(ux, uy)| (-uy, ux))
                    .ok_or_else(|| {
                        DragonflyError::InvalidGeometry(
                            "Cannot offset a polygon with zero-length segments".to_string(),
                        )
                    })
            })
            .collect::<Result<_, _>>()?;

        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let n_prev = normals[(i + n - 1) % n];
            let n_cur = normals[i];
            let denom = 1. + n_prev.0 * n_cur.0 + n_prev.1 * n_cur.1;
            if denom.abs() < 1e-9 {
                return Err(DragonflyError::InvalidGeometry(format!(
                    "Polygon folds back on itself at vertex {}",
                    i
                ))
                .into());
            }
            let f = distance / denom;
            out.push(Point2::new(
                pts[i].x + (n_prev.0 + n_cur.0) * f,
                pts[i].y + (n_prev.1 + n_cur.1) * f,
            ));
        }
        let offset = Polygon2D::new(out);

        // Every offset edge must keep its direction and a length above tolerance
        for (orig, moved) in ring.segments().iter().zip(offset.segments()) {
            let (ax, ay) = orig.direction();
            let (bx, by) = moved.direction();
            if moved.length() <= tol || ax * bx + ay * by <= 0. {
                return Err(DragonflyError::InvalidGeometry(format!(
                    "Offset distance {} collapses the polygon",
                    distance
                ))
                .into());
            }
        }
        if offset.is_self_intersecting(tol) {
            return Err(DragonflyError::InvalidGeometry(format!(
                "Offset distance {} makes the polygon self-intersect",
                distance
            ))
            .into());
        }
        Ok(offset)
    }

    /// Splits the ring into perimeter quads plus a core.
    ///
    /// Returns `(perimeters, core)`. Perimeter `i` runs along segment `i` of
    /// the counter-clockwise ring and is counter-clockwise itself.
    pub fn perimeter_core_subpolygons(
        &self,
        distance: f64,
        tol: f64,
    ) -> Result<(Vec<Polygon2D>, Polygon2D)> {
        if distance <= 0. {
            return Err(DragonflyError::InvalidInput(format!(
                "Perimeter offset must be positive, got {}",
                distance
            ))
            .into());
        }
        let ring = self.to_ccw();
        let core = ring.offset(distance, tol)?;
        let p = ring.vertices();
        let q = core.vertices();
        let n = p.len();
        let perimeters = (0..n)
            .map(|i| {
                let j = (i + 1) % n;
                Polygon2D::new(vec![p[i], p[j], q[j], q[i]])
            })
            .collect();
        Ok((perimeters, core))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::kind;

    #[test]
    fn test_offset_square() -> Result<()> {
        let sq = Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.);
        let inner = sq.offset(2., 1e-6)?;
        assert!((inner.area() - 36.).abs() < 1e-9);
        assert!(inner.vertices()[0].is_equivalent(&Point2::new(2., 2.), 1e-9));
        Ok(())
    }

    #[test]
    fn test_perimeter_core_areas_sum() -> Result<()> {
        let l = Polygon2D::from_tuples(&[(0., 0.), (20., 0.), (20., 10.), (10., 10.), (10., 20.), (0., 20.)]);
        let (perims, core) = l.perimeter_core_subpolygons(3., 1e-6)?;
        assert_eq!(perims.len(), 6);
        let total: f64 = perims.iter().map(|p| p.area()).sum::<f64>() + core.area();
        assert!((total - l.area()).abs() < 1e-6);
        assert!(perims.iter().all(|p| !p.is_clockwise()));
        Ok(())
    }

    #[test]
    fn test_offset_too_deep_fails() {
        let sq = Polygon2D::rectangle(Point2::new(0., 0.), 4., 4.);
        let err = sq.offset(3., 1e-6).unwrap_err();
        assert!(matches!(kind(&err), Some(DragonflyError::InvalidGeometry(_))));
    }
}
