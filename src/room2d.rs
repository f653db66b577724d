//! Room2D: a single floor plate extruded by a floor-to-ceiling height.
//!
//! Per-segment lists (`boundary_conditions`, `window_parameters`,
//! `shading_parameters`, `air_boundaries`) run over the outer boundary
//! segments first and then over every hole's segments. Segment `i` goes
//! from vertex `i` to vertex `i + 1` of its ring.

use crate::boundary::{BoundaryCondition, wall_face_id};
use crate::error::DragonflyError;
use crate::geom::face::Face3D;
use crate::geom::point::{Point, Point2};
use crate::geom::polygon::Polygon2D;
use crate::geom::region::Region2D;
use crate::geom::segment::LineSegment2D;
use crate::geom::vector::Vector;
use crate::id::valid_identifier;
use crate::name::HasIdentifier;
use crate::parameters::{HostWall, ShadingParameter, SkylightParameter, WindowParameter};
use crate::properties::ExtensionProperties;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Where a rebuilt segment takes its attributes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSource {
    /// Index of the original segment
    pub index: usize,
    /// Distance from the original segment start to the new segment start
    pub u_offset: f64,
}

impl SegmentSource {
    pub fn same(index: usize) -> Self {
        Self { index, u_offset: 0. }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
enum Room2DType {
    #[default]
    Room2D,
}

/// Dictionary form of a Room2D (floor stored as plan rings plus an elevation).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Room2DDict {
    #[serde(rename = "type", default)]
    kind: Room2DType,
    identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    floor_boundary: Vec<Point2>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    floor_holes: Vec<Vec<Point2>>,
    floor_height: f64,
    floor_to_ceiling_height: f64,
    #[serde(default)]
    is_ground_contact: bool,
    #[serde(default)]
    is_top_exposed: bool,
    #[serde(default)]
    boundary_conditions: Vec<BoundaryCondition>,
    #[serde(default)]
    window_parameters: Vec<Option<WindowParameter>>,
    #[serde(default)]
    shading_parameters: Vec<Option<ShadingParameter>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    air_boundaries: Vec<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    skylight_parameters: Option<SkylightParameter>,
    #[serde(default)]
    ceiling_plenum_depth: f64,
    #[serde(default)]
    floor_plenum_depth: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zone: Option<String>,
    #[serde(default)]
    properties: ExtensionProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Room2DDict", into = "Room2DDict")]
pub struct Room2D {
    pub identifier: String,
    pub display_name: Option<String>,
    floor_geometry: Face3D,
    pub floor_to_ceiling_height: f64,
    pub boundary_conditions: Vec<BoundaryCondition>,
    pub window_parameters: Vec<Option<WindowParameter>>,
    pub shading_parameters: Vec<Option<ShadingParameter>>,
    pub air_boundaries: Vec<bool>,
    pub skylight_parameters: Option<SkylightParameter>,
    pub is_ground_contact: bool,
    pub is_top_exposed: bool,
    pub ceiling_plenum_depth: f64,
    pub floor_plenum_depth: f64,
    /// Rooms sharing a zone are merged into one 3D room on lowering
    pub zone: Option<String>,
    pub properties: ExtensionProperties,
    /// Set when alignment or vertex removal collapsed the floor plate
    pub degenerate: bool,
    /// Identifier of the owning Story (lookup only)
    pub parent: Option<String>,
}

impl From<Room2DDict> for Room2D {
    fn from(d: Room2DDict) -> Self {
        let region = Region2D::new(
            Polygon2D::new(d.floor_boundary),
            d.floor_holes.into_iter().map(Polygon2D::new).collect(),
        );
        let floor_geometry = Face3D::from_plan_region(&region, d.floor_height);
        let n = segment_count_of(&region);
        let mut room = Room2D::bare(d.identifier, floor_geometry, d.floor_to_ceiling_height, n);
        room.display_name = d.display_name;
        if !d.boundary_conditions.is_empty() {
            room.boundary_conditions = d.boundary_conditions;
        }
        if !d.window_parameters.is_empty() {
            room.window_parameters = d.window_parameters;
        }
        if !d.shading_parameters.is_empty() {
            room.shading_parameters = d.shading_parameters;
        }
        if !d.air_boundaries.is_empty() {
            room.air_boundaries = d.air_boundaries;
        }
        room.skylight_parameters = d.skylight_parameters;
        room.is_ground_contact = d.is_ground_contact;
        room.is_top_exposed = d.is_top_exposed;
        room.ceiling_plenum_depth = d.ceiling_plenum_depth;
        room.floor_plenum_depth = d.floor_plenum_depth;
        room.zone = d.zone;
        room.properties = d.properties;
        room
    }
}

impl From<Room2D> for Room2DDict {
    fn from(r: Room2D) -> Self {
        let region = r.floor_region();
        let floor_height = r.floor_height();
        let air_boundaries = if r.air_boundaries.iter().any(|a| *a) {
            r.air_boundaries
        } else {
            vec![]
        };
        Self {
            kind: Room2DType::Room2D,
            identifier: r.identifier,
            display_name: r.display_name,
            floor_boundary: region.boundary.vertices().to_vec(),
            floor_holes: region.holes.iter().map(|h| h.vertices().to_vec()).collect(),
            floor_height,
            floor_to_ceiling_height: r.floor_to_ceiling_height,
            is_ground_contact: r.is_ground_contact,
            is_top_exposed: r.is_top_exposed,
            boundary_conditions: r.boundary_conditions,
            window_parameters: r.window_parameters,
            shading_parameters: r.shading_parameters,
            air_boundaries,
            skylight_parameters: r.skylight_parameters,
            ceiling_plenum_depth: r.ceiling_plenum_depth,
            floor_plenum_depth: r.floor_plenum_depth,
            zone: r.zone,
            properties: r.properties,
        }
    }
}

fn segment_count_of(region: &Region2D) -> usize {
    region.rings().iter().map(|r| r.len()).sum()
}

impl HasIdentifier for Room2D {
    fn identifier(&self) -> &str {
        &self.identifier
    }
    fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.identifier)
    }
}

impl Room2D {
    fn bare(identifier: String, floor_geometry: Face3D, floor_to_ceiling_height: f64, n: usize) -> Self {
        Self {
            identifier,
            display_name: None,
            floor_geometry,
            floor_to_ceiling_height,
            boundary_conditions: vec![BoundaryCondition::Outdoors; n],
            window_parameters: vec![None; n],
            shading_parameters: vec![None; n],
            air_boundaries: vec![false; n],
            skylight_parameters: None,
            is_ground_contact: false,
            is_top_exposed: false,
            ceiling_plenum_depth: 0.,
            floor_plenum_depth: 0.,
            zone: None,
            properties: ExtensionProperties::new(),
            degenerate: false,
            parent: None,
        }
    }

    /// Creates a Room2D from a horizontal floor face.
    ///
    /// A floor facing down is flipped. Every segment starts Outdoors with no
    /// windows or shades.
    pub fn new(
        identifier: &str,
        floor_geometry: Face3D,
        floor_to_ceiling_height: f64,
        angle_tol: f64,
    ) -> Result<Self> {
        let identifier = valid_identifier(identifier)?;
        if !floor_geometry.is_horizontal(angle_tol) {
            return Err(DragonflyError::InvalidGeometry(format!(
                "Floor geometry of Room2D \"{}\" is not horizontal",
                identifier
            ))
            .into());
        }
        if floor_to_ceiling_height <= 0. {
            return Err(DragonflyError::InvalidGeometry(format!(
                "Room2D \"{}\" needs a positive floor-to-ceiling height, got {}",
                identifier, floor_to_ceiling_height
            ))
            .into());
        }
        let z = floor_geometry.min_z();
        let region = floor_geometry.plan_region();
        let floor = Face3D::from_plan_region(&region, z);
        let n = segment_count_of(&region);
        Ok(Self::bare(identifier, floor, floor_to_ceiling_height, n))
    }

    /// Creates a Room2D from a plan polygon at a given elevation.
    pub fn from_polygon(
        identifier: &str,
        boundary: &Polygon2D,
        floor_height: f64,
        floor_to_ceiling_height: f64,
    ) -> Result<Self> {
        Self::from_region(
            identifier,
            &Region2D::from_polygon(boundary.clone()),
            floor_height,
            floor_to_ceiling_height,
        )
    }

    pub fn from_region(
        identifier: &str,
        region: &Region2D,
        floor_height: f64,
        floor_to_ceiling_height: f64,
    ) -> Result<Self> {
        Self::new(
            identifier,
            Face3D::from_plan_region(region, floor_height),
            floor_to_ceiling_height,
            1.,
        )
    }

    pub fn floor_geometry(&self) -> &Face3D {
        &self.floor_geometry
    }

    pub fn floor_height(&self) -> f64 {
        self.floor_geometry.min_z()
    }

    pub fn ceiling_height(&self) -> f64 {
        self.floor_height() + self.floor_to_ceiling_height
    }

    pub fn floor_region(&self) -> Region2D {
        self.floor_geometry.plan_region()
    }

    pub fn floor_area(&self) -> f64 {
        self.floor_region().area()
    }

    pub fn volume(&self) -> f64 {
        self.floor_area() * self.floor_to_ceiling_height
    }

    pub fn segment_count(&self) -> usize {
        segment_count_of(&self.floor_region())
    }

    /// Plan segments: outer boundary first, then holes.
    pub fn floor_segments(&self) -> Vec<LineSegment2D> {
        self.floor_region()
            .rings()
            .iter()
            .flat_map(|r| r.segments())
            .collect()
    }

    pub fn segment(&self, index: usize) -> Result<LineSegment2D> {
        self.floor_segments()
            .get(index)
            .copied()
            .ok_or_else(|| self.bad_index(index))
    }

    fn bad_index(&self, index: usize) -> anyhow::Error {
        DragonflyError::InvalidInput(format!(
            "Segment index {} is out of range for Room2D \"{}\" with {} segments",
            index,
            self.identifier,
            self.segment_count()
        ))
        .into()
    }

    /// Host wall of segment `index` at the room's floor elevation.
    pub fn host_wall(&self, index: usize) -> Result<HostWall> {
        let seg = self.segment(index)?;
        let z = self.floor_height();
        Ok(HostWall::new(seg.p1.at_z(z), seg.p2.at_z(z), self.floor_to_ceiling_height))
    }

    /// Identifier of the 3D wall built from segment `index`.
    pub fn wall_id(&self, index: usize) -> String {
        wall_face_id(&self.identifier, index)
    }

    /// Window outlines of a segment in wall-local coordinates.
    pub fn window_polygons(&self, index: usize, tol: f64) -> Result<Vec<Polygon2D>> {
        match self.window_parameters.get(index) {
            Some(Some(wp)) => wp.apply_uv(&self.host_wall(index)?, tol),
            Some(None) => Ok(vec![]),
            None => Err(self.bad_index(index)),
        }
    }

    pub fn exterior_wall_area(&self) -> f64 {
        self.floor_segments()
            .iter()
            .zip(&self.boundary_conditions)
            .filter(|(_, bc)| bc.is_outdoors())
            .map(|(s, _)| s.length() * self.floor_to_ceiling_height)
            .sum()
    }

    /// Replaces the floor plate and rebuilds every per-segment list.
    ///
    /// `sources[i]` says which original segment new segment `i` inherits its
    /// attributes from; `None` gives the defaults.
    pub fn rebuild_floor(&mut self, region: &Region2D, sources: &[Option<SegmentSource>]) {
        let z = self.floor_height();
        let n = segment_count_of(region);
        let old_bcs = std::mem::take(&mut self.boundary_conditions);
        let old_windows = std::mem::take(&mut self.window_parameters);
        let old_shades = std::mem::take(&mut self.shading_parameters);
        let old_air = std::mem::take(&mut self.air_boundaries);

        self.floor_geometry = Face3D::from_plan_region(region, z);
        self.boundary_conditions = vec![BoundaryCondition::Outdoors; n];
        self.window_parameters = vec![None; n];
        self.shading_parameters = vec![None; n];
        self.air_boundaries = vec![false; n];
        for (i, src) in sources.iter().enumerate().take(n) {
            let Some(src) = src else { continue };
            if let Some(bc) = old_bcs.get(src.index) {
                self.boundary_conditions[i] = bc.clone();
            }
            if let Some(Some(wp)) = old_windows.get(src.index) {
                self.window_parameters[i] = Some(if src.u_offset.abs() > 0. {
                    wp.shift_u(-src.u_offset)
                } else {
                    wp.clone()
                });
            }
            if let Some(sp) = old_shades.get(src.index) {
                self.shading_parameters[i] = sp.clone();
            }
            if let Some(ab) = old_air.get(src.index) {
                self.air_boundaries[i] = *ab;
            }
        }
    }

    /// Removes vertices per ring and carries attributes over from the longest
    /// merged segment.
    fn rebuild_with_masks(&mut self, rings: &[Polygon2D], masks: &[Vec<bool>], tol: f64) -> bool {
        let mut new_rings = vec![];
        let mut sources = vec![];
        let mut offset = 0;
        for (ring_i, (ring, mask)) in rings.iter().zip(masks).enumerate() {
            let kept: Vec<usize> = (0..ring.len()).filter(|&i| mask[i]).collect();
            let m = kept.len();
            if m < 3 {
                if ring_i == 0 {
                    return false;
                }
                // degenerate hole
                offset += ring.len();
                continue;
            }
            let n = ring.len();
            let mut ring_sources = vec![];
            for k in 0..m {
                let start = kept[k];
                let end = kept[(k + 1) % m];
                let run: Vec<usize> = if end > start {
                    (start..end).collect()
                } else {
                    (start..n).chain(0..end).collect()
                };
                let mut best = run[0];
                let mut best_len = -1.;
                let mut u = 0.;
                let mut best_u = 0.;
                for &s in &run {
                    let len = ring.segment(s).length();
                    if len > best_len {
                        best_len = len;
                        best = s;
                        best_u = u;
                    }
                    u += len;
                }
                ring_sources.push(Some(SegmentSource {
                    index: offset + best,
                    u_offset: -best_u,
                }));
            }
            let verts: Vec<Point2> = kept.iter().map(|&i| ring.vertices()[i]).collect();
            let poly = Polygon2D::new(verts);
            if ring_i > 0 && poly.area() <= tol * tol {
                offset += n;
                continue;
            }
            new_rings.push(poly);
            sources.extend(ring_sources);
            offset += n;
        }
        let mut iter = new_rings.into_iter();
        let Some(boundary) = iter.next() else {
            return false;
        };
        let region = Region2D::new(boundary, iter.collect());
        self.rebuild_floor(&region, &sources);
        true
    }

    fn ring_masks(&self, f: impl Fn(&Polygon2D) -> Vec<bool>) -> (Vec<Polygon2D>, Vec<Vec<bool>>) {
        let region = self.floor_region();
        let rings: Vec<Polygon2D> = region.rings().into_iter().cloned().collect();
        let masks = rings.iter().map(&f).collect();
        (rings, masks)
    }

    /// Snaps every vertex within `dist` of the line onto it.
    ///
    /// Collapsed segments lose their descriptors, holes that become
    /// degenerate are dropped, and a floor that collapses below `tol²` marks
    /// the room as degenerate.
    pub fn align(&mut self, line: &LineSegment2D, dist: f64, tol: f64) {
        let region = self.floor_region();
        let snap = |poly: &Polygon2D| {
            Polygon2D::new(
                poly.vertices()
                    .iter()
                    .map(|p| {
                        if line.distance_to_line(*p) <= dist {
                            line.closest_point_on_line(*p)
                        } else {
                            *p
                        }
                    })
                    .collect(),
            )
        };
        // keep vertex order so that segment indices still line up
        let moved = Region2D {
            boundary: snap(&region.boundary),
            holes: region.holes.iter().map(snap).collect(),
        };
        let z = self.floor_height();
        self.floor_geometry = Face3D::new(
            moved.boundary.vertices().iter().map(|p| p.at_z(z)).collect(),
            moved
                .holes
                .iter()
                .map(|h| h.vertices().iter().map(|p| p.at_z(z)).collect())
                .collect(),
        );
        if self.remove_duplicate_vertices(tol, true).is_err() || self.floor_area() <= tol * tol {
            self.degenerate = true;
        }
    }

    /// Removes vertices that are colinear with their neighbours.
    pub fn remove_colinear_vertices(&mut self, tol: f64) -> Result<()> {
        let (rings, masks) = self.ring_masks(|r| r.colinear_vertex_mask(tol));
        if !self.rebuild_with_masks(&rings, &masks, tol) {
            return Err(DragonflyError::InvalidGeometry(format!(
                "Room2D \"{}\" is degenerate after removing colinear vertices",
                self.identifier
            ))
            .into());
        }
        Ok(())
    }

    /// Removes duplicate vertices.
    ///
    /// Returns `Ok(false)` when the room became degenerate and
    /// `delete_degenerate` is set (the room is marked degenerate); fails
    /// otherwise.
    pub fn remove_duplicate_vertices(&mut self, tol: f64, delete_degenerate: bool) -> Result<bool> {
        let (rings, masks) = self.ring_masks(|r| r.duplicate_vertex_mask(tol));
        let ok = self.rebuild_with_masks(&rings, &masks, tol) && self.floor_area() > tol * tol;
        if ok {
            return Ok(true);
        }
        if delete_degenerate {
            self.degenerate = true;
            return Ok(false);
        }
        Err(DragonflyError::InvalidGeometry(format!(
            "Room2D \"{}\" is degenerate after removing duplicate vertices",
            self.identifier
        ))
        .into())
    }

    /// Re-clips detailed windows to their (possibly changed) host walls.
    pub fn rebuild_detailed_windows(&mut self, tol: f64) -> Result<()> {
        for i in 0..self.window_parameters.len() {
            if let Some(WindowParameter::DetailedWindows { .. }) = &self.window_parameters[i] {
                let polys = self.window_polygons(i, tol)?;
                let polys: Vec<Polygon2D> = polys.into_iter().filter(|p| p.area() > tol * tol).collect();
                self.window_parameters[i] = if polys.is_empty() {
                    None
                } else {
                    Some(WindowParameter::DetailedWindows { polygons: polys })
                };
            }
        }
        Ok(())
    }

    /// Sets the window descriptor of every Outdoors segment.
    pub fn set_outdoor_window_parameters(&mut self, wp: Option<WindowParameter>) {
        for (bc, w) in self.boundary_conditions.iter().zip(self.window_parameters.iter_mut()) {
            if bc.is_outdoors() {
                *w = wp.clone();
            }
        }
    }

    /// Sets the shading descriptor of every Outdoors segment.
    pub fn set_outdoor_shading_parameters(&mut self, sp: Option<ShadingParameter>) {
        for (bc, s) in self.boundary_conditions.iter().zip(self.shading_parameters.iter_mut()) {
            if bc.is_outdoors() {
                *s = sp.clone();
            }
        }
    }

    /// Sets the boundary condition of one segment.
    ///
    /// Adiabatic and Ground segments lose their window descriptor.
    pub fn set_boundary_condition(&mut self, index: usize, bc: BoundaryCondition) -> Result<()> {
        if index >= self.boundary_conditions.len() {
            return Err(self.bad_index(index));
        }
        if matches!(bc, BoundaryCondition::Adiabatic | BoundaryCondition::Ground) {
            self.clear_window(index);
        }
        if !bc.is_surface() {
            if let Some(air) = self.air_boundaries.get_mut(index) {
                *air = false;
            }
        }
        self.boundary_conditions[index] = bc;
        Ok(())
    }

    /// Drops the window descriptor of a segment, if the list reaches it.
    pub(crate) fn clear_window(&mut self, index: usize) {
        if let Some(wp) = self.window_parameters.get_mut(index) {
            *wp = None;
        }
    }

    /// Marks a Surface segment as an air boundary.
    pub fn set_air_boundary(&mut self, index: usize) -> Result<()> {
        match self.boundary_conditions.get(index) {
            Some(bc) if bc.is_surface() => {
                if index >= self.air_boundaries.len() {
                    return Err(self.bad_index(index));
                }
                self.air_boundaries[index] = true;
                self.clear_window(index);
                Ok(())
            }
            Some(bc) => Err(DragonflyError::InvalidAssembly(format!(
                "Segment {} of Room2D \"{}\" is {} and cannot be an air boundary",
                index,
                self.identifier,
                bc.name()
            ))
            .into()),
            None => Err(self.bad_index(index)),
        }
    }

    /// Makes two matching segments Surface-adjacent to each other.
    ///
    /// Windows are dropped on both sides unless both descriptors are equal.
    pub fn set_adjacency(
        &mut self,
        other: &mut Room2D,
        my_index: usize,
        their_index: usize,
        tol: f64,
    ) -> Result<()> {
        let mine = self.segment(my_index)?;
        let theirs = other.segment(their_index)?;
        if my_index >= self.boundary_conditions.len() {
            return Err(self.bad_index(my_index));
        }
        if their_index >= other.boundary_conditions.len() {
            return Err(other.bad_index(their_index));
        }
        if !mine.is_reversed_equivalent(&theirs, tol) {
            return Err(DragonflyError::InvalidAssembly(format!(
                "Segment {} of \"{}\" does not match segment {} of \"{}\"",
                my_index, self.identifier, their_index, other.identifier
            ))
            .into());
        }
        self.boundary_conditions[my_index] =
            BoundaryCondition::surface(&other.wall_id(their_index), &other.identifier);
        other.boundary_conditions[their_index] =
            BoundaryCondition::surface(&self.wall_id(my_index), &self.identifier);
        let same = match (
            self.window_parameters.get(my_index).cloned().flatten(),
            other.window_parameters.get(their_index).cloned().flatten(),
        ) {
            (Some(a), Some(b)) => a == b.flip(theirs.length()),
            (None, None) => true,
            _ => false,
        };
        if !same {
            self.clear_window(my_index);
            other.clear_window(their_index);
        }
        Ok(())
    }

    /// Resets Surface segments to Outdoors.
    pub fn reset_adjacency(&mut self) {
        for (bc, air) in self.boundary_conditions.iter_mut().zip(self.air_boundaries.iter_mut()) {
            if bc.is_surface() {
                *bc = BoundaryCondition::Outdoors;
                *air = false;
            }
        }
    }

    /// Assigns explicit windows and skylights to matching walls or the ceiling.
    ///
    /// Vertical sub-faces within `project_dist` of a wall plane (and facing
    /// the same way within `angle_tol`) become detailed windows on that
    /// wall; horizontal ones near the ceiling become detailed skylights.
    /// Returns the indices of the sub-faces that matched nothing.
    pub fn assign_sub_faces(
        &mut self,
        sub_faces: &[Face3D],
        project_dist: f64,
        tol: f64,
        angle_tol: f64,
    ) -> Result<Vec<usize>> {
        let mut unassigned = vec![];
        let ceiling = self.ceiling_height();
        let plan = self.floor_region();
        for (k, face) in sub_faces.iter().enumerate() {
            let Some(normal) = face.normal() else {
                unassigned.push(k);
                continue;
            };
            if face.is_horizontal(angle_tol) {
                let near = face.all_vertices().all(|p| (p.z - ceiling).abs() <= project_dist);
                let sky = face.plan_boundary().to_ccw();
                if near && plan.boundary.contains_polygon(&sky, tol) {
                    let mut polys = match &self.skylight_parameters {
                        Some(SkylightParameter::DetailedSkylights { polygons }) => polygons.clone(),
                        _ => vec![],
                    };
                    polys.push(sky);
                    self.skylight_parameters = Some(SkylightParameter::DetailedSkylights { polygons: polys });
                } else {
                    unassigned.push(k);
                }
                continue;
            }
            let mut placed = false;
            for i in 0..self.segment_count() {
                if !self.boundary_conditions.get(i).is_some_and(|bc| bc.allows_windows()) {
                    continue;
                }
                let host = self.host_wall(i)?;
                let basis = host.basis()?;
                if normal.angle(&basis.normal()) > angle_tol {
                    continue;
                }
                if face.all_vertices().any(|p| basis.distance_to(*p).abs() > project_dist) {
                    continue;
                }
                let uv = Polygon2D::new(face.boundary().iter().map(|p| basis.project(*p)).collect()).to_ccw();
                if !host.uv_outline().contains_polygon(&uv, tol) {
                    continue;
                }
                let mut polys = self.window_polygons(i, tol)?;
                polys.push(uv);
                let Some(slot) = self.window_parameters.get_mut(i) else { continue };
                *slot = Some(WindowParameter::DetailedWindows { polygons: polys });
                placed = true;
                break;
            }
            if !placed {
                unassigned.push(k);
            }
        }
        Ok(unassigned)
    }

    pub fn move_by(&mut self, v: Vector) {
        self.floor_geometry = self.floor_geometry.move_by(v);
        if let Some(sp) = &self.skylight_parameters {
            self.skylight_parameters = Some(sp.move_by(v.dx, v.dy));
        }
    }

    /// Scales geometry and descriptor lengths by `factor` about `origin`.
    pub fn scale(&mut self, factor: f64, origin: Option<Point>) {
        self.floor_geometry = self.floor_geometry.scale(factor, origin);
        self.floor_to_ceiling_height *= factor;
        self.ceiling_plenum_depth *= factor;
        self.floor_plenum_depth *= factor;
        for w in self.window_parameters.iter_mut().flatten() {
            *w = w.scale(factor);
        }
        for s in self.shading_parameters.iter_mut().flatten() {
            *s = s.scale(factor);
        }
        if let Some(sp) = &self.skylight_parameters {
            let o = origin.unwrap_or(Point::new(0., 0., 0.));
            let moved = sp.move_by(-o.x, -o.y).scale(factor).move_by(o.x, o.y);
            self.skylight_parameters = Some(moved);
        }
    }

    /// Ratio of window area to exterior wall area.
    pub fn window_ratio(&self, tol: f64) -> Result<f64> {
        let mut glazed = 0.;
        for i in 0..self.segment_count() {
            if self.boundary_conditions[i].is_outdoors() {
                glazed += self.window_polygons(i, tol)?.iter().map(|p| p.area()).sum::<f64>();
            }
        }
        let wall = self.exterior_wall_area();
        Ok(if wall > 0. { glazed / wall } else { 0. })
    }

    /// Lengths of per-segment lists that disagree with the segment count.
    pub fn check_segment_lists(&self) -> String {
        let n = self.segment_count();
        let mut msgs = vec![];
        for (name, len) in [
            ("boundary_conditions", self.boundary_conditions.len()),
            ("window_parameters", self.window_parameters.len()),
            ("shading_parameters", self.shading_parameters.len()),
            ("air_boundaries", self.air_boundaries.len()),
        ] {
            if len != n {
                msgs.push(format!(
                    "Room2D \"{}\" has {} {} for {} segments.",
                    self.identifier, len, name, n
                ));
            }
        }
        msgs.join("\n")
    }

    pub fn check_plenum_depths(&self) -> String {
        let neg = self.ceiling_plenum_depth < 0. || self.floor_plenum_depth < 0.;
        let total = self.ceiling_plenum_depth + self.floor_plenum_depth;
        if neg || total >= self.floor_to_ceiling_height {
            format!(
                "Room2D \"{}\" has plenum depths ({} + {}) that do not fit its {} floor-to-ceiling height.",
                self.identifier,
                self.ceiling_plenum_depth,
                self.floor_plenum_depth,
                self.floor_to_ceiling_height
            )
        } else {
            String::new()
        }
    }

    /// Descriptors that fail on their host, and windows on Adiabatic or Ground walls.
    pub fn check_descriptors(&self, tol: f64) -> String {
        let mut msgs = vec![];
        for i in 0..self.segment_count().min(self.window_parameters.len()) {
            let Ok(host) = self.host_wall(i) else { continue };
            if let Some(wp) = &self.window_parameters[i] {
                if !wp.is_valid_for(&host, tol) {
                    msgs.push(format!(
                        "{} on segment {} of Room2D \"{}\" is not valid for its wall.",
                        wp.name(),
                        i,
                        self.identifier
                    ));
                }
                if let Some(bc) = self.boundary_conditions.get(i) {
                    if !bc.allows_windows() {
                        msgs.push(format!(
                            "Segment {} of Room2D \"{}\" is {} but has windows.",
                            i,
                            self.identifier,
                            bc.name()
                        ));
                    }
                }
            }
            if let Some(Some(sp)) = self.shading_parameters.get(i) {
                if !sp.is_valid_for(&host, tol) {
                    msgs.push(format!(
                        "{} on segment {} of Room2D \"{}\" is not valid for its wall.",
                        sp.name(),
                        i,
                        self.identifier
                    ));
                }
            }
        }
        if let Some(sky) = &self.skylight_parameters {
            let roof = self.floor_geometry.at_z(self.ceiling_height());
            if !sky.is_valid_for(&roof, tol) {
                msgs.push(format!(
                    "{} of Room2D \"{}\" does not fit its ceiling.",
                    sky.name(),
                    self.identifier
                ));
            }
        }
        msgs.join("\n")
    }
}

/// Maps new segments onto old ones they lie on (colinear, same direction, contained).
pub fn match_segments(
    old: &[LineSegment2D],
    new: &[LineSegment2D],
    tol: f64,
) -> Vec<Option<SegmentSource>> {
    new.iter()
        .map(|n| {
            old.iter().enumerate().find_map(|(i, o)| {
                let on = o.contains_point(n.p1, tol) && o.contains_point(n.p2, tol);
                let (dx, dy) = o.direction();
                let (ex, ey) = n.direction();
                (on && dx * ex + dy * ey > 0.).then(|| SegmentSource {
                    index: i,
                    u_offset: o.p1.distance(&n.p1),
                })
            })
        })
        .collect()
}

impl WindowParameter {
    /// Moves detailed windows along the wall by `du`.
    pub fn shift_u(&self, du: f64) -> Self {
        match self {
            Self::DetailedWindows { polygons } => Self::DetailedWindows {
                polygons: polygons.iter().map(|p| p.move_by(du, 0.)).collect(),
            },
            _ => self.clone(),
        }
    }
}
