//! Building: unique stories stacked bottom-up plus optional detailed 3D rooms.

use crate::boundary::BoundaryCondition;
use crate::error::DragonflyError;
use crate::geom::point::Point;
use crate::geom::polygon::{Polygon2D, boolean};
use crate::geom::region::Region2D;
use crate::geom::segment::LineSegment2D;
use crate::geom::vector::Vector;
use crate::honeybee::HbRoom;
use crate::id::valid_identifier;
use crate::name::{HasIdentifier, first_duplicate};
use crate::properties::ExtensionProperties;
use crate::room2d::Room2D;
use crate::story::{Story, covered_by};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Angle tolerance (degrees) for facing walls across an alley.
const ALLEY_ANGLE_TOL: f64 = 1.;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Building {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub unique_stories: Vec<Story>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub room_3ds: Vec<HbRoom>,
    #[serde(default)]
    pub properties: ExtensionProperties,
    #[serde(skip)]
    pub parent: Option<String>,
}

impl HasIdentifier for Building {
    fn identifier(&self) -> &str {
        &self.identifier
    }
    fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.identifier)
    }
}

impl Building {
    /// Creates a Building; stories are sorted by floor elevation.
    pub fn new(identifier: &str, mut unique_stories: Vec<Story>) -> Result<Self> {
        let identifier = valid_identifier(identifier)?;
        unique_stories.sort_by(|a, b| a.floor_height.total_cmp(&b.floor_height));
        let mut building = Self {
            identifier,
            display_name: None,
            unique_stories,
            room_3ds: vec![],
            properties: ExtensionProperties::new(),
            parent: None,
        };
        building.check_unique_ids()?;
        building.set_parents();
        Ok(building)
    }

    /// Extrudes plan footprints into one story per floor-to-floor height.
    ///
    /// With a positive `perimeter_offset`, every footprint is split into
    /// perimeter zones and a core. The first story touches the ground and the
    /// last one is top-exposed.
    pub fn from_footprint(
        identifier: &str,
        footprints: &[Polygon2D],
        floor_to_floor_heights: &[f64],
        perimeter_offset: f64,
        tol: f64,
    ) -> Result<Self> {
        let regions: Vec<Region2D> = footprints.iter().cloned().map(Region2D::from_polygon).collect();
        Self::from_footprint_regions(identifier, &regions, floor_to_floor_heights, perimeter_offset, tol)
    }

    /// Same as [`Building::from_footprint`] for footprints with courtyards.
    ///
    /// Holes are kept in the floor plates. A footprint with holes cannot be
    /// split into perimeter zones and fails with `InvalidGeometry` when
    /// `perimeter_offset` is positive.
    pub fn from_footprint_regions(
        identifier: &str,
        footprints: &[Region2D],
        floor_to_floor_heights: &[f64],
        perimeter_offset: f64,
        tol: f64,
    ) -> Result<Self> {
        if footprints.is_empty() || floor_to_floor_heights.is_empty() {
            return Err(DragonflyError::InvalidInput(
                "A building needs at least one footprint and one floor height".to_string(),
            )
            .into());
        }
        if perimeter_offset > 0. && footprints.iter().any(|f| f.has_holes()) {
            return Err(DragonflyError::InvalidGeometry(format!(
                "Footprints of \"{}\" have holes and cannot take a perimeter offset",
                identifier
            ))
            .into());
        }
        let footprints: Vec<Region2D> = footprints
            .iter()
            .map(|f| {
                Region2D::new(
                    f.boundary.remove_colinear_vertices(tol),
                    f.holes.iter().map(|h| h.remove_colinear_vertices(tol)).collect(),
                )
            })
            .collect();
        let mut stories = vec![];
        let mut z = 0.;
        for (i, ftf) in floor_to_floor_heights.iter().enumerate() {
            let story_id = format!("{}_Floor{}", identifier, i + 1);
            let mut rooms = vec![];
            for footprint in &footprints {
                let plates = if perimeter_offset > 0. {
                    let (plates, core) = footprint.boundary.perimeter_core_subpolygons(perimeter_offset, tol)?;
                    plates
                        .into_iter()
                        .chain(std::iter::once(core))
                        .map(Region2D::from_polygon)
                        .collect()
                } else {
                    vec![footprint.clone()]
                };
                for plate in plates {
                    let room_id = format!("{}_Room{}", story_id, rooms.len() + 1);
                    rooms.push(Room2D::from_region(&room_id, &plate, z, *ftf)?);
                }
            }
            let mut story = Story::new(&story_id, rooms, Some(*ftf), Some(z))?;
            story.solve_room_2d_adjacency(tol, true)?;
            stories.push(story);
            z += ftf;
        }
        if let Some(first) = stories.first_mut() {
            first.set_ground_contact(true);
        }
        if let Some(last) = stories.last_mut() {
            last.set_top_exposed(true);
        }
        Self::new(identifier, stories)
    }

    pub(crate) fn set_parents(&mut self) {
        for story in &mut self.unique_stories {
            story.parent = Some(self.identifier.clone());
            story.set_parents();
        }
    }

    fn check_unique_ids(&self) -> Result<()> {
        if let Some(dup) = first_duplicate(self.unique_stories.iter().map(|s| s.identifier.as_str())) {
            return Err(DragonflyError::InvalidAssembly(format!(
                "Story \"{}\" appears more than once in Building \"{}\"",
                dup, self.identifier
            ))
            .into());
        }
        let rooms = self
            .unique_room_2ds()
            .map(|r| r.identifier.as_str())
            .chain(self.room_3ds.iter().map(|r| r.identifier.as_str()));
        if let Some(dup) = first_duplicate(rooms) {
            return Err(DragonflyError::InvalidAssembly(format!(
                "Room \"{}\" appears more than once in Building \"{}\"",
                dup, self.identifier
            ))
            .into());
        }
        Ok(())
    }

    pub fn add_stories(&mut self, stories: Vec<Story>) -> Result<()> {
        let before = self.unique_stories.clone();
        self.unique_stories.extend(stories);
        self.unique_stories
            .sort_by(|a, b| a.floor_height.total_cmp(&b.floor_height));
        if let Err(e) = self.check_unique_ids() {
            self.unique_stories = before;
            return Err(e);
        }
        self.set_parents();
        Ok(())
    }

    /// Adds detailed 3D rooms that bypass the extruded representation.
    pub fn add_room_3ds(&mut self, rooms: Vec<HbRoom>) -> Result<()> {
        let before = self.room_3ds.len();
        self.room_3ds.extend(rooms);
        if let Err(e) = self.check_unique_ids() {
            self.room_3ds.truncate(before);
            return Err(e);
        }
        Ok(())
    }

    pub fn unique_room_2ds(&self) -> impl Iterator<Item = &Room2D> {
        self.unique_stories.iter().flat_map(|s| s.room_2ds.iter())
    }

    /// Every story repeat as its own story with multiplier 1.
    ///
    /// Repeat `k > 0` is raised by `k` floor-to-floor heights and gets a
    /// `_<k>` suffix on its story and room identifiers.
    pub fn all_stories(&self) -> Vec<Story> {
        let mut out = vec![];
        for story in &self.unique_stories {
            for k in 0..story.multiplier.max(1) {
                let mut copy = if k == 0 {
                    story.clone()
                } else {
                    let mut c = story.with_suffix(&format!("_{}", k));
                    c.move_by(Vector::new(0., 0., story.floor_to_floor_height * k as f64));
                    c
                };
                copy.multiplier = 1;
                out.push(copy);
            }
        }
        out
    }

    /// Every Room2D of the building with multipliers expanded.
    pub fn all_room_2ds(&self) -> Vec<Room2D> {
        self.all_stories()
            .into_iter()
            .flat_map(|s| s.room_2ds.into_iter())
            .collect()
    }

    pub fn story_count(&self) -> u32 {
        self.unique_stories.iter().map(|s| s.multiplier).sum()
    }

    /// Stories whose floor is at or above the lowest ground-contact floor.
    pub fn story_count_above_ground(&self) -> u32 {
        let ground = self
            .unique_stories
            .iter()
            .filter(|s| s.room_2ds.iter().any(|r| r.is_ground_contact))
            .map(|s| s.floor_height)
            .reduce(f64::min);
        match ground {
            Some(z) => self
                .unique_stories
                .iter()
                .filter(|s| s.floor_height >= z)
                .map(|s| s.multiplier)
                .sum(),
            None => self.story_count(),
        }
    }

    /// Floor area with multipliers applied.
    pub fn floor_area(&self) -> f64 {
        let extruded: f64 = self
            .unique_stories
            .iter()
            .map(|s| s.floor_area() * s.multiplier as f64)
            .sum();
        extruded + self.room_3ds.iter().map(|r| r.floor_area()).sum::<f64>()
    }

    pub fn min_height(&self) -> f64 {
        self.unique_stories
            .iter()
            .map(|s| s.floor_height)
            .reduce(f64::min)
            .unwrap_or(0.)
    }

    pub fn max_height(&self) -> f64 {
        self.unique_stories
            .iter()
            .map(|s| s.top_height())
            .reduce(f64::max)
            .unwrap_or(0.)
    }

    /// Plan union of every unique room.
    pub fn footprint(&self, tol: f64) -> Vec<Region2D> {
        let regions: Vec<Region2D> = self.unique_room_2ds().map(|r| r.floor_region()).collect();
        boolean::union(&regions, tol)
    }

    /// Splits repeated stories into a bottom, a middle and a top story.
    ///
    /// The bottom keeps the original identifiers, the middle carries the
    /// remaining repeats (`_Middle`) and the top is a single floor (`_Top`).
    /// Ground contact is set on the bottom of the lowest story and top
    /// exposure on the top of the highest. The `_Top` copies of lower stories
    /// stay covered by the stories above them, so their rooms keep
    /// `is_top_exposed` false.
    pub fn separate_top_bottom_floors(&mut self) {
        let count = self.unique_stories.len();
        let mut out = vec![];
        for (idx, story) in std::mem::take(&mut self.unique_stories).into_iter().enumerate() {
            if story.multiplier <= 1 {
                out.push(story);
                continue;
            }
            let ftf = story.floor_to_floor_height;
            let mult = story.multiplier;

            let mut middle = story.with_suffix("_Middle");
            middle.move_by(Vector::new(0., 0., ftf));
            middle.multiplier = mult - 2;
            middle.set_ground_contact(false);
            middle.set_top_exposed(false);
            middle.roof = None;

            let mut top = story.with_suffix("_Top");
            top.move_by(Vector::new(0., 0., ftf * (mult - 1) as f64));
            top.multiplier = 1;
            top.set_ground_contact(false);
            if idx + 1 == count {
                top.set_top_exposed(true);
            }

            let mut bottom = story;
            bottom.multiplier = 1;
            bottom.set_top_exposed(false);
            bottom.roof = None;
            if idx == 0 {
                bottom.set_ground_contact(true);
            }

            out.push(bottom);
            if middle.multiplier > 0 {
                out.push(middle);
            }
            out.push(top);
        }
        self.unique_stories = out;
        self.set_parents();
    }

    /// Splits the last repeat off stories whose top is partly exposed.
    ///
    /// The repeat is probed against the story above (pole of
    /// inaccessibility within `p_tol`); when any of its rooms is exposed it
    /// becomes its own `_Upper` story and the rest keeps repeating with its
    /// top covered.
    pub fn separate_mid_floors(&mut self, p_tol: f64) {
        let stories = std::mem::take(&mut self.unique_stories);
        let mut out = vec![];
        for (idx, story) in stories.iter().enumerate() {
            if story.multiplier <= 1 {
                out.push(story.clone());
                continue;
            }
            let mut upper = story.with_suffix("_Upper");
            upper.move_by(Vector::new(
                0.,
                0.,
                story.floor_to_floor_height * (story.multiplier - 1) as f64,
            ));
            upper.multiplier = 1;
            upper.set_ground_contact(false);
            match stories.get(idx + 1) {
                Some(above) => upper.set_top_exposed_by_story_above(above, p_tol),
                None => upper.set_top_exposed(true),
            }
            if !upper.room_2ds.iter().any(|r| r.is_top_exposed) {
                out.push(story.clone());
                continue;
            }
            let mut lower = story.clone();
            lower.multiplier -= 1;
            lower.set_top_exposed(false);
            lower.roof = None;
            out.push(lower);
            out.push(upper);
        }
        self.unique_stories = out;
        self.set_parents();
    }

    /// Turns the lowest `count` stories into basements.
    ///
    /// Outdoors walls become Ground; with `remove_windows` unset, walls that
    /// carry windows stay Outdoors. Ground contact of the basements and the
    /// story right above them follows what lies underneath (pole probe
    /// within `p_tol`).
    pub fn make_basement_stories(&mut self, count: usize, remove_windows: bool, p_tol: f64) -> Result<()> {
        let count = count.min(self.unique_stories.len());
        if let Some(s) = self.unique_stories[..count].iter().find(|s| s.multiplier > 1) {
            return Err(DragonflyError::InvalidAssembly(format!(
                "Story \"{}\" has a multiplier of {} and cannot be a basement",
                s.identifier, s.multiplier
            ))
            .into());
        }
        for story in &mut self.unique_stories[..count] {
            for room in &mut story.room_2ds {
                for i in 0..room.boundary_conditions.len() {
                    let keep = !remove_windows && room.window_parameters.get(i).is_some_and(|w| w.is_some());
                    if room.boundary_conditions[i].is_outdoors() && !keep {
                        room.set_boundary_condition(i, BoundaryCondition::Ground)?;
                    }
                }
            }
        }
        let last = (count + 1).min(self.unique_stories.len());
        for i in 0..last {
            if i == 0 {
                self.unique_stories[0].set_ground_contact(true);
                continue;
            }
            let below: Vec<Region2D> = self.unique_stories[i - 1]
                .room_2ds
                .iter()
                .map(|r| r.floor_region())
                .collect();
            for room in &mut self.unique_stories[i].room_2ds {
                room.is_ground_contact = !covered_by(&room.floor_region(), &below, p_tol);
            }
        }
        Ok(())
    }

    /// Clears windows on Outdoors walls that face another building within `dist`.
    ///
    /// Facing walls must run anti-parallel, overlap along their length and
    /// share part of their height. With `adiabatic` the walls also become
    /// Adiabatic.
    pub fn process_alleys(buildings: &mut [Building], dist: f64, adiabatic: bool, tol: f64) -> Result<()> {
        struct Wall {
            building: usize,
            story: usize,
            room: usize,
            seg: usize,
            line: LineSegment2D,
            outdoors: bool,
            z0: f64,
            z1: f64,
        }
        let mut walls = vec![];
        for (b, bldg) in buildings.iter().enumerate() {
            for (s, story) in bldg.unique_stories.iter().enumerate() {
                for (r, room) in story.room_2ds.iter().enumerate() {
                    for (seg, line) in room.floor_segments().into_iter().enumerate() {
                        walls.push(Wall {
                            building: b,
                            story: s,
                            room: r,
                            seg,
                            line,
                            outdoors: room.boundary_conditions.get(seg).is_some_and(|bc| bc.is_outdoors()),
                            z0: story.floor_height,
                            z1: story.top_height(),
                        });
                    }
                }
            }
        }
        let faces = |w: &Wall, o: &Wall| {
            if w.building == o.building || w.z1.min(o.z1) - w.z0.max(o.z0) <= tol {
                return false;
            }
            if !w.line.is_anti_parallel(&o.line, ALLEY_ANGLE_TOL) || w.line.distance_to_segment(&o.line) > dist {
                return false;
            }
            let (dx, dy) = w.line.direction();
            let (mw, mo) = (w.line.midpoint(), o.line.midpoint());
            if (mo.x - mw.x) * dy - (mo.y - mw.y) * dx < -tol {
                return false;
            }
            let t3 = w.line.parameter_of(o.line.p1);
            let t4 = w.line.parameter_of(o.line.p2);
            let overlap = (t3.max(t4).min(1.) - t3.min(t4).max(0.)) * w.line.length();
            overlap > tol
        };
        let hits: BTreeSet<(usize, usize, usize, usize)> = walls
            .iter()
            .filter(|w| w.outdoors)
            .filter(|w| walls.iter().any(|o| faces(w, o)))
            .map(|w| (w.building, w.story, w.room, w.seg))
            .collect();
        for (b, s, r, seg) in hits {
            let room = &mut buildings[b].unique_stories[s].room_2ds[r];
            room.clear_window(seg);
            if adiabatic {
                room.set_boundary_condition(seg, BoundaryCondition::Adiabatic)?;
            }
        }
        Ok(())
    }

    pub fn move_by(&mut self, v: Vector) {
        for story in &mut self.unique_stories {
            story.move_by(v);
        }
        for room in &mut self.room_3ds {
            room.move_by(v);
        }
    }

    pub fn scale(&mut self, factor: f64, origin: Option<Point>) {
        for story in &mut self.unique_stories {
            story.scale(factor, origin);
        }
        for room in &mut self.room_3ds {
            room.scale(factor, origin);
        }
    }

    /// Stories that overlap vertically or leave a gap.
    pub fn check_story_order(&self, tol: f64) -> String {
        self.unique_stories
            .windows(2)
            .filter_map(|pair| {
                let gap = pair[1].floor_height - pair[0].top_height();
                if gap < -tol {
                    Some(format!(
                        "Story \"{}\" starts {:.4} below the top of Story \"{}\" in Building \"{}\".",
                        pair[1].identifier, -gap, pair[0].identifier, self.identifier
                    ))
                } else if gap > tol {
                    Some(format!(
                        "Story \"{}\" leaves a {:.4} gap above Story \"{}\" in Building \"{}\".",
                        pair[1].identifier, gap, pair[0].identifier, self.identifier
                    ))
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::point::Point2;
    use crate::parameters::WindowParameter;

    const TOL: f64 = 0.01;

    fn square(size: f64) -> Polygon2D {
        Polygon2D::rectangle(Point2::new(0., 0.), size, size)
    }

    #[test]
    fn test_from_footprint_core_perimeter() -> Result<()> {
        let bldg = Building::from_footprint("Office", &[square(30.)], &[4., 4., 4.], 5., TOL)?;
        assert_eq!(bldg.unique_stories.len(), 3);
        assert_eq!(bldg.unique_stories[0].room_2ds.len(), 5);
        assert!((bldg.floor_area() - 2700.).abs() < 1e-6);
        assert!(bldg.unique_stories[0].room_2ds.iter().all(|r| r.is_ground_contact));
        assert!(bldg.unique_stories[2].room_2ds.iter().all(|r| r.is_top_exposed));
        // the core touches all four perimeter zones
        let core = bldg.unique_stories[0].room_2d("Office_Floor1_Room5")?;
        assert_eq!(core.boundary_conditions.iter().filter(|b| b.is_surface()).count(), 4);
        assert!(bldg.check_story_order(TOL).is_empty());
        Ok(())
    }

    #[test]
    fn test_separate_top_bottom() -> Result<()> {
        let mut bldg = Building::from_footprint("Tower", &[square(10.)], &[4., 4.], 0., TOL)?;
        bldg.unique_stories[1].multiplier = 5;
        let before: u32 = bldg.story_count();
        bldg.separate_top_bottom_floors();
        let mults: Vec<u32> = bldg.unique_stories.iter().map(|s| s.multiplier).collect();
        assert_eq!(mults, vec![1, 1, 3, 1]);
        assert_eq!(bldg.story_count(), before);
        let heights: Vec<f64> = bldg.unique_stories.iter().map(|s| s.floor_height).collect();
        assert_eq!(heights, vec![0., 4., 8., 20.]);
        assert!(bldg.unique_stories[0].room_2ds[0].is_ground_contact);
        let top = &bldg.unique_stories[3];
        assert_eq!(top.identifier, "Tower_Floor2_Top");
        assert!(top.room_2ds[0].is_top_exposed);
        assert!(!bldg.unique_stories[1].room_2ds[0].is_top_exposed);
        Ok(())
    }

    #[test]
    fn test_lower_top_copy_stays_covered() -> Result<()> {
        let mut bldg = Building::from_footprint("Tower", &[square(10.)], &[4., 4.], 0., TOL)?;
        bldg.unique_stories[0].multiplier = 2;
        bldg.unique_stories[1].move_by(Vector::new(0., 0., 4.));
        bldg.separate_top_bottom_floors();
        let ids: Vec<&str> = bldg.unique_stories.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(ids, vec!["Tower_Floor1", "Tower_Floor1_Top", "Tower_Floor2"]);
        assert!(!bldg.unique_stories[1].room_2ds[0].is_top_exposed);
        assert!(bldg.unique_stories[2].room_2ds[0].is_top_exposed);
        Ok(())
    }

    #[test]
    fn test_all_room_2ds_expands_multipliers() -> Result<()> {
        let mut bldg = Building::from_footprint("Tower", &[square(10.)], &[3.], 0., TOL)?;
        bldg.unique_stories[0].multiplier = 3;
        let rooms = bldg.all_room_2ds();
        assert_eq!(rooms.len(), 3);
        assert_eq!(rooms[2].identifier, "Tower_Floor1_Room1_2");
        assert!((rooms[2].floor_height() - 6.).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_separate_mid_floors_setback() -> Result<()> {
        let base = Building::from_footprint("B", &[square(20.)], &[3.], 0., TOL)?;
        let mut stories = base.unique_stories.clone();
        stories[0].multiplier = 3;
        let small = Room2D::from_polygon("Penthouse", &square(5.), 9., 3.)?;
        stories.push(Story::new("Roof", vec![small], Some(3.), None)?);
        let mut bldg = Building::new("B", stories)?;
        bldg.separate_mid_floors(TOL);
        let mults: Vec<u32> = bldg.unique_stories.iter().map(|s| s.multiplier).collect();
        assert_eq!(mults, vec![2, 1, 1]);
        assert!(bldg.unique_stories[1].room_2ds[0].is_top_exposed);
        assert!((bldg.unique_stories[1].floor_height - 6.).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_basement_keeps_windowed_walls() -> Result<()> {
        let mut bldg = Building::from_footprint("B", &[square(10.)], &[3., 3.], 0., TOL)?;
        let room = &mut bldg.unique_stories[0].room_2ds[0];
        room.window_parameters[0] = Some(WindowParameter::SimpleWindowRatio { window_ratio: 0.2 });
        bldg.make_basement_stories(1, false, TOL)?;
        let room = &bldg.unique_stories[0].room_2ds[0];
        assert!(room.boundary_conditions[0].is_outdoors());
        assert_eq!(room.boundary_conditions.iter().filter(|b| matches!(b, BoundaryCondition::Ground)).count(), 3);
        assert!(!bldg.unique_stories[1].room_2ds[0].is_ground_contact);

        bldg.make_basement_stories(1, true, TOL)?;
        let room = &bldg.unique_stories[0].room_2ds[0];
        assert!(room.window_parameters.iter().all(|w| w.is_none()));
        Ok(())
    }

    #[test]
    fn test_basement_with_multiplier_fails() -> Result<()> {
        let mut bldg = Building::from_footprint("B", &[square(10.)], &[3.], 0., TOL)?;
        bldg.unique_stories[0].multiplier = 2;
        assert!(bldg.make_basement_stories(1, true, TOL).is_err());
        Ok(())
    }

    #[test]
    fn test_duplicate_story_ids_fail() -> Result<()> {
        let a = Building::from_footprint("A", &[square(10.)], &[3.], 0., TOL)?;
        let mut stories = a.unique_stories.clone();
        stories.extend(a.unique_stories.clone());
        assert!(Building::new("A", stories).is_err());
        Ok(())
    }
}
