//! Extrusion of Room2Ds into closed 3D rooms.

use crate::boundary::{BoundaryCondition, parse_wall_face_id, wall_face_id};
use crate::error::DragonflyError;
use crate::geom::face::Face3D;
use crate::geom::polygon::{Polygon2D, boolean};
use crate::geom::region::Region2D;
use crate::geom::segment::{LineSegment2D, SegmentIntersection};
use crate::honeybee::{FaceType, HbAperture, HbFace, HbRoom, HbShade, HoneybeeOptions};
use crate::parameters::RoofSpecification;
use crate::properties::ExtensionProperties;
use crate::room2d::Room2D;
use crate::story::Story;
use anyhow::Result;
use log::{debug, warn};
use std::collections::HashMap;

pub const FLOOR_PLENUM: &str = "_Floor_Plenum";
pub const CEILING_PLENUM: &str = "_Ceiling_Plenum";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VolumeKind {
    FloorPlenum,
    Base,
    CeilingPlenum,
}

impl VolumeKind {
    fn suffix(&self) -> &'static str {
        match self {
            Self::FloorPlenum => FLOOR_PLENUM,
            Self::Base => "",
            Self::CeilingPlenum => CEILING_PLENUM,
        }
    }
}

struct Volume {
    kind: VolumeKind,
    identifier: String,
    bottom: f64,
    top: f64,
}

/// Base room identifier and plenum suffix of a lowered room id.
pub fn split_plenum_id(identifier: &str) -> (&str, Option<&'static str>) {
    for suffix in [FLOOR_PLENUM, CEILING_PLENUM] {
        if let Some(base) = identifier.strip_suffix(suffix) {
            return (base, Some(suffix));
        }
    }
    (identifier, None)
}

fn plenum_depths(room: &Room2D, options: &HoneybeeOptions, tol: f64) -> (f64, f64) {
    if options.exclude_plenums {
        return (0., 0.);
    }
    let keep = |d: f64| if d > tol { d } else { 0. };
    (keep(room.floor_plenum_depth), keep(room.ceiling_plenum_depth))
}

/// Lowers every Room2D of a story.
pub(crate) fn lower_story(story: &Story, options: &HoneybeeOptions, tol: f64) -> Result<Vec<HbRoom>> {
    let depths: HashMap<&str, (f64, f64)> = story
        .room_2ds
        .iter()
        .map(|r| (r.identifier.as_str(), plenum_depths(r, options, tol)))
        .collect();
    let mut out = vec![];
    for room in &story.room_2ds {
        out.extend(lower_room(room, story, &depths, options, tol)?);
    }
    debug!("Lowered Story \"{}\" into {} rooms", story.identifier, out.len());
    Ok(out)
}

fn lower_room(
    room: &Room2D,
    story: &Story,
    depths: &HashMap<&str, (f64, f64)>,
    options: &HoneybeeOptions,
    tol: f64,
) -> Result<Vec<HbRoom>> {
    let z0 = room.floor_height();
    let z1 = room.ceiling_height();
    let (fpd, cpd) = depths.get(room.identifier.as_str()).copied().unwrap_or((0., 0.));
    if z1 - cpd - (z0 + fpd) <= tol {
        return Err(DragonflyError::InvalidGeometry(format!(
            "Plenums of Room2D \"{}\" leave no height for the room",
            room.identifier
        ))
        .into());
    }

    let mut volumes = vec![];
    if fpd > 0. {
        volumes.push((VolumeKind::FloorPlenum, z0, z0 + fpd));
    }
    volumes.push((VolumeKind::Base, z0 + fpd, z1 - cpd));
    if cpd > 0. {
        volumes.push((VolumeKind::CeilingPlenum, z1 - cpd, z1));
    }
    let volumes: Vec<Volume> = volumes
        .into_iter()
        .map(|(kind, bottom, top)| Volume {
            kind,
            identifier: format!("{}{}", room.identifier, kind.suffix()),
            bottom,
            top,
        })
        .collect();

    let roof = if room.is_top_exposed { story.roof.as_ref() } else { None };
    let segments = room.floor_segments();
    let n = segments.len();
    let region = room.floor_region();
    let last = volumes.len() - 1;

    let mut rooms = vec![];
    for (k, vol) in volumes.iter().enumerate() {
        let vol_roof = if k == last { roof } else { None };
        let mut faces = vec![];
        let mut shades = vec![];

        for (i, seg) in segments.iter().enumerate() {
            let face_id = wall_face_id(&vol.identifier, i);
            let geometry = wall_geometry(seg, vol.bottom, vol.top, vol_roof, tol);
            let bc = wall_boundary(room, i, vol.kind, depths, tol);
            let is_air = vol.kind == VolumeKind::Base
                && bc.is_surface()
                && room.air_boundaries.get(i).copied().unwrap_or(false);
            let face_type = if is_air { FaceType::AirBoundary } else { FaceType::Wall };
            let mut face = HbFace::new(face_id, geometry, face_type, bc);

            if vol.kind == VolumeKind::Base && !is_air && face.boundary_condition.allows_windows() {
                let windows = room.window_polygons(i, tol)?;
                face.apertures = clip_windows(room, i, &face, &windows, tol)?;
                let shading = room.shading_parameters.get(i).and_then(Option::as_ref);
                if let (true, Some(sp)) = (face.boundary_condition.is_outdoors(), shading) {
                    let host = room.host_wall(i)?;
                    for (s, geometry) in sp.apply(&host, &windows, tol)?.into_iter().enumerate() {
                        shades.push(HbShade {
                            identifier: format!("{}_Shd{}", face.identifier, s),
                            geometry,
                            is_detached: false,
                        });
                    }
                }
            }
            faces.push(face);
        }

        let floor_bc = if k > 0 {
            let below = &volumes[k - 1].identifier;
            BoundaryCondition::surface(&wall_face_id(below, n + 1), below)
        } else if room.is_ground_contact {
            BoundaryCondition::Ground
        } else {
            BoundaryCondition::Adiabatic
        };
        faces.push(HbFace::new(
            wall_face_id(&vol.identifier, n),
            Face3D::from_plan_region(&region, vol.bottom).flip(),
            FaceType::Floor,
            floor_bc,
        ));

        let ceiling_bc = if k < last {
            let above = &volumes[k + 1].identifier;
            BoundaryCondition::surface(&wall_face_id(above, n), above)
        } else if room.is_top_exposed {
            BoundaryCondition::Outdoors
        } else {
            BoundaryCondition::Adiabatic
        };
        for (c, geometry) in ceiling_geometry(room, vol_roof, vol.top, tol).into_iter().enumerate() {
            let mut face = HbFace::new(
                wall_face_id(&vol.identifier, n + 1 + c),
                geometry,
                FaceType::RoofCeiling,
                ceiling_bc.clone(),
            );
            let skylight = room.skylight_parameters.as_ref().filter(|_| k == last && ceiling_bc.is_outdoors());
            if let Some(sky) = skylight {
                face.apertures = sky
                    .apply(&face.geometry, tol)?
                    .into_iter()
                    .enumerate()
                    .map(|(g, geometry)| HbAperture {
                        identifier: format!("{}_Glz{}", face.identifier, g),
                        geometry,
                        boundary_condition: BoundaryCondition::Outdoors,
                        is_operable: false,
                    })
                    .collect();
            }
            faces.push(face);
        }

        let base = vol.kind == VolumeKind::Base;
        rooms.push(HbRoom {
            identifier: vol.identifier.clone(),
            display_name: if base { room.display_name.clone() } else { None },
            faces,
            outdoor_shades: shades,
            multiplier: if options.use_multiplier { story.multiplier.max(1) } else { 1 },
            story: Some(story.identifier.clone()),
            zone: if base { room.zone.clone() } else { None },
            exclude_floor_area: !base,
            properties: if base { room.properties.clone() } else { ExtensionProperties::new() },
        });
    }
    Ok(rooms)
}

/// Boundary condition of the wall built from segment `i` in one volume.
///
/// Surface walls only stay Surface when the neighbour has a volume of the
/// same kind spanning the same heights.
fn wall_boundary(
    room: &Room2D,
    i: usize,
    kind: VolumeKind,
    depths: &HashMap<&str, (f64, f64)>,
    tol: f64,
) -> BoundaryCondition {
    let bc = room.boundary_conditions.get(i).cloned().unwrap_or_default();
    let Some((other, j)) = bc.adjacent_face().and_then(parse_wall_face_id) else {
        return bc;
    };
    let mine = depths.get(room.identifier.as_str());
    let theirs = depths.get(other);
    match (mine, theirs) {
        (Some(a), Some(b)) if (a.0 - b.0).abs() <= tol && (a.1 - b.1).abs() <= tol => {
            let vol = format!("{}{}", other, kind.suffix());
            BoundaryCondition::surface(&wall_face_id(&vol, j), &vol)
        }
        _ => {
            debug!(
                "Wall {} of Room2D \"{}\" set to Adiabatic; plenums of \"{}\" do not line up",
                i, room.identifier, other
            );
            BoundaryCondition::Adiabatic
        }
    }
}

/// Windows of segment `i` clipped to one wall face.
fn clip_windows(room: &Room2D, i: usize, face: &HbFace, windows: &[Polygon2D], tol: f64) -> Result<Vec<HbAperture>> {
    if windows.is_empty() {
        return Ok(vec![]);
    }
    let basis = room.host_wall(i)?.basis()?;
    let outline = Region2D::from_polygon(Polygon2D::new(
        face.geometry.boundary().iter().map(|p| basis.project(*p)).collect(),
    ));
    let outline = [outline];
    let bc = if face.boundary_condition.is_surface() {
        // paired later by pair_apertures
        BoundaryCondition::Surface {
            boundary_condition_objects: vec![],
        }
    } else {
        BoundaryCondition::Outdoors
    };
    let mut out = vec![];
    for win in windows {
        for piece in boolean::intersection(&[Region2D::from_polygon(win.clone())], &outline, tol) {
            if piece.area() <= tol * tol {
                continue;
            }
            out.push(HbAperture {
                identifier: format!("{}_Glz{}", face.identifier, out.len()),
                geometry: Face3D::from_basis(&basis, &piece.boundary),
                boundary_condition: bc.clone(),
                is_operable: false,
            });
        }
    }
    Ok(out)
}

/// Vertical wall over a segment between two elevations.
///
/// With a roof the top edge follows the roof planes, with extra vertices
/// where the segment crosses roof face edges.
pub(crate) fn wall_geometry(
    seg: &LineSegment2D,
    bottom: f64,
    top: f64,
    roof: Option<&RoofSpecification>,
    tol: f64,
) -> Face3D {
    let Some(roof) = roof else {
        return Face3D::new(
            vec![seg.p1.at_z(bottom), seg.p2.at_z(bottom), seg.p2.at_z(top), seg.p1.at_z(top)],
            vec![],
        );
    };
    let len = seg.length().max(f64::EPSILON);
    let mut params = vec![0., 1.];
    for face in &roof.geometry {
        for edge in face.plan_boundary().segments() {
            if let SegmentIntersection::Point(p) = seg.intersect(&edge, tol) {
                params.push(seg.parameter_of(p).clamp(0., 1.));
            }
        }
    }
    params.sort_by(f64::total_cmp);
    params.dedup_by(|a, b| (*a - *b).abs() * len <= tol);
    if let Some(end) = params.last_mut() {
        *end = 1.;
    }

    let mut boundary = vec![seg.p1.at_z(bottom), seg.p2.at_z(bottom)];
    for t in params.iter().rev() {
        let p = seg.point_at(*t);
        let z = roof.height_at(p, tol).unwrap_or(top).max(bottom + tol);
        boundary.push(p.at_z(z));
    }
    Face3D::new(boundary, vec![])
}

/// Ceiling faces of a volume: roof pieces over the room plus a flat
/// remainder where the roof does not reach.
pub(crate) fn ceiling_geometry(room: &Room2D, roof: Option<&RoofSpecification>, top: f64, tol: f64) -> Vec<Face3D> {
    let region = room.floor_region();
    let Some(roof) = roof else {
        return vec![Face3D::from_plan_region(&region, top)];
    };
    let pieces = roof.clip_to_region(&region, tol);
    let covered: Vec<Region2D> = pieces.iter().map(|f| f.plan_region()).collect();
    let mut out = pieces;
    for rest in boolean::difference(&[region], &covered, tol) {
        if rest.area() > tol * tol {
            warn!(
                "Roof does not cover all of Room2D \"{}\"; using a flat ceiling for the rest",
                room.identifier
            );
            out.push(Face3D::from_plan_region(&rest, top));
        }
    }
    out
}

/// Pairs Adiabatic ceilings with Adiabatic floors directly above them.
pub fn solve_ceiling_adjacencies(rooms: &mut [HbRoom], tol: f64) {
    let mut ceilings = vec![];
    let mut floors = vec![];
    for (r, room) in rooms.iter().enumerate() {
        for (f, face) in room.faces.iter().enumerate() {
            if face.boundary_condition != BoundaryCondition::Adiabatic {
                continue;
            }
            match face.face_type {
                FaceType::RoofCeiling => ceilings.push((r, f)),
                FaceType::Floor => floors.push((r, f)),
                _ => {}
            }
        }
    }
    let mut used = vec![false; floors.len()];
    let mut pairs = vec![];
    for &(cr, cf) in &ceilings {
        let ceiling = &rooms[cr].faces[cf].geometry;
        if !ceiling.is_horizontal(1.) {
            continue;
        }
        let plan = ceiling.plan_boundary();
        for (idx, &(fr, ff)) in floors.iter().enumerate() {
            if used[idx] || fr == cr {
                continue;
            }
            let floor = &rooms[fr].faces[ff].geometry;
            if (floor.min_z() - ceiling.max_z()).abs() > tol {
                continue;
            }
            if floor.flip().plan_boundary().is_equivalent(&plan, tol) {
                used[idx] = true;
                pairs.push(((cr, cf), (fr, ff)));
                break;
            }
        }
    }
    for ((cr, cf), (fr, ff)) in pairs {
        let ceiling_id = rooms[cr].faces[cf].identifier.clone();
        let ceiling_room = rooms[cr].identifier.clone();
        let floor_id = rooms[fr].faces[ff].identifier.clone();
        let floor_room = rooms[fr].identifier.clone();
        rooms[cr].faces[cf].boundary_condition = BoundaryCondition::surface(&floor_id, &floor_room);
        rooms[fr].faces[ff].boundary_condition = BoundaryCondition::surface(&ceiling_id, &ceiling_room);
    }
}

/// Matches apertures on interior walls with the aperture on the other side.
///
/// Apertures are matched by centroid; the ones without a partner are removed.
pub fn pair_apertures(rooms: &mut [HbRoom], tol: f64) {
    let mut locations: HashMap<String, (usize, usize)> = HashMap::new();
    for (r, room) in rooms.iter().enumerate() {
        for (f, face) in room.faces.iter().enumerate() {
            locations.insert(face.identifier.clone(), (r, f));
        }
    }

    let mut assignments = vec![];
    for (r, room) in rooms.iter().enumerate() {
        for (f, face) in room.faces.iter().enumerate() {
            if !face.boundary_condition.is_surface() {
                continue;
            }
            let other = face
                .boundary_condition
                .adjacent_face()
                .and_then(|id| locations.get(id))
                .map(|&(orr, of)| &rooms[orr].faces[of]);
            for (a, ap) in face.apertures.iter().enumerate() {
                let partner = other.and_then(|o| {
                    o.apertures
                        .iter()
                        .find(|b| b.geometry.centroid().distance(&ap.geometry.centroid()) <= tol)
                        .map(|b| (b.identifier.clone(), o.identifier.clone()))
                });
                let room_id = face.boundary_condition.adjacent_room().map(str::to_string);
                assignments.push((r, f, a, partner.zip(room_id)));
            }
        }
    }

    let mut dropped: Vec<(usize, usize, usize)> = vec![];
    for (r, f, a, found) in assignments {
        match found {
            Some(((ap_id, face_id), room_id)) => {
                rooms[r].faces[f].apertures[a].boundary_condition = BoundaryCondition::Surface {
                    boundary_condition_objects: vec![ap_id, face_id, room_id],
                };
            }
            None => dropped.push((r, f, a)),
        }
    }
    for (r, f, a) in dropped.into_iter().rev() {
        let ap = rooms[r].faces[f].apertures.remove(a);
        warn!("Aperture \"{}\" has no matching aperture on the adjacent wall and was removed", ap.identifier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::point::{Point, Point2};
    use crate::parameters::WindowParameter;

    const TOL: f64 = 0.01;

    fn pair() -> Result<Story> {
        let mut a = Room2D::from_polygon("A", &Polygon2D::rectangle(Point2::new(0., 0.), 5., 5.), 0., 4.)?;
        let mut b = Room2D::from_polygon("B", &Polygon2D::rectangle(Point2::new(5., 0.), 5., 5.), 0., 4.)?;
        a.ceiling_plenum_depth = 1.;
        b.ceiling_plenum_depth = 1.;
        a.set_outdoor_window_parameters(Some(WindowParameter::SimpleWindowRatio { window_ratio: 0.3 }));
        b.zone = Some("East".to_string());
        let mut story = Story::new("L1", vec![a, b], Some(4.), Some(0.))?;
        story.solve_room_2d_adjacency(TOL, false)?;
        Ok(story)
    }

    #[test]
    fn test_plenum_stack() -> Result<()> {
        let story = pair()?;
        let rooms = lower_story(&story, &HoneybeeOptions::new(), TOL)?;
        let ids: Vec<&str> = rooms.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, ["A", "A_Ceiling_Plenum", "B", "B_Ceiling_Plenum"]);

        let base = &rooms[0];
        let ceiling = base.face("A..Face6").unwrap();
        assert_eq!(ceiling.boundary_condition.adjacent_face(), Some("A_Ceiling_Plenum..Face5"));
        assert!((ceiling.geometry.max_z() - 3.).abs() < 1e-9);

        let plenum = &rooms[1];
        assert!(plenum.exclude_floor_area);
        assert!(plenum.zone.is_none());
        let wall = plenum.face("A_Ceiling_Plenum..Face2").unwrap();
        assert_eq!(wall.boundary_condition.adjacent_room(), Some("B_Ceiling_Plenum"));
        assert!(wall.apertures.is_empty());
        assert_eq!(rooms[2].zone.as_deref(), Some("East"));
        Ok(())
    }

    #[test]
    fn test_mismatched_plenums_become_adiabatic() -> Result<()> {
        let mut story = pair()?;
        story.room_2ds[1].ceiling_plenum_depth = 0.5;
        let rooms = lower_story(&story, &HoneybeeOptions::new(), TOL)?;
        let wall = rooms[0].face("A..Face2").unwrap();
        assert_eq!(wall.boundary_condition, BoundaryCondition::Adiabatic);

        let flat = HoneybeeOptions {
            exclude_plenums: true,
            ..HoneybeeOptions::new()
        };
        let rooms = lower_story(&story, &flat, TOL)?;
        assert_eq!(rooms.len(), 2);
        assert!(rooms[0].face("A..Face2").unwrap().boundary_condition.is_surface());
        Ok(())
    }

    #[test]
    fn test_sloped_roof_walls() -> Result<()> {
        let mut story = pair()?;
        story.set_top_exposed(true);
        let roof = Face3D::new(
            vec![
                Point::new(0., 0., 4.),
                Point::new(10., 0., 4.),
                Point::new(10., 5., 6.),
                Point::new(0., 5., 6.),
            ],
            vec![],
        );
        story.set_roof(RoofSpecification::new(vec![roof]), TOL);
        let flat = HoneybeeOptions {
            exclude_plenums: true,
            ..HoneybeeOptions::new()
        };
        let rooms = lower_story(&story, &flat, TOL)?;
        let east = rooms[0].face("A..Face2").unwrap();
        assert!((east.geometry.max_z() - 6.).abs() < 1e-9);
        let north = rooms[0].face("A..Face3").unwrap();
        assert!((north.geometry.min_z() - 0.).abs() < 1e-9);
        assert!(north.geometry.boundary().iter().skip(2).all(|p| (p.z - 6.).abs() < 1e-9));
        let top = rooms[0].face("A..Face6").unwrap();
        assert!(top.boundary_condition.is_outdoors());
        assert!((top.geometry.plan_region().area() - 25.).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_interior_windows_pair() -> Result<()> {
        let mut story = pair()?;
        let window = Some(WindowParameter::SingleWindow {
            width: 1.,
            height: 1.,
            sill_height: 1.,
        });
        story.room_2ds[0].window_parameters[1] = window.clone();
        story.room_2ds[1].window_parameters[3] = window;
        let options = HoneybeeOptions {
            exclude_plenums: true,
            ..HoneybeeOptions::new()
        };
        let mut rooms = lower_story(&story, &options, TOL)?;
        pair_apertures(&mut rooms, TOL);
        let ap = &rooms[0].face("A..Face2").unwrap().apertures[0];
        assert_eq!(ap.boundary_condition.adjacent_face(), Some("B..Face4_Glz0"));
        assert_eq!(ap.boundary_condition.adjacent_room(), Some("B"));
        Ok(())
    }

    #[test]
    fn test_ceiling_adjacency() -> Result<()> {
        let lower = Room2D::from_polygon("Lower", &Polygon2D::rectangle(Point2::new(0., 0.), 5., 5.), 0., 3.)?;
        let upper = Room2D::from_polygon("Upper", &Polygon2D::rectangle(Point2::new(0., 0.), 5., 5.), 3., 3.)?;
        let s1 = Story::new("S1", vec![lower], Some(3.), Some(0.))?;
        let s2 = Story::new("S2", vec![upper], Some(3.), Some(3.))?;
        let options = HoneybeeOptions::new();
        let mut rooms = lower_story(&s1, &options, TOL)?;
        rooms.extend(lower_story(&s2, &options, TOL)?);
        solve_ceiling_adjacencies(&mut rooms, TOL);
        let ceiling = rooms[0].face("Lower..Face6").unwrap();
        assert_eq!(ceiling.boundary_condition.adjacent_face(), Some("Upper..Face5"));
        let floor = rooms[1].face("Upper..Face5").unwrap();
        assert_eq!(floor.boundary_condition.adjacent_room(), Some("Lower"));
        Ok(())
    }

    #[test]
    fn test_split_plenum_id() {
        assert_eq!(split_plenum_id("Office_Ceiling_Plenum"), ("Office", Some(CEILING_PLENUM)));
        assert_eq!(split_plenum_id("Office"), ("Office", None));
    }
}
