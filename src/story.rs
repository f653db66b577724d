//! Story: Room2Ds sharing a floor elevation, repeated `multiplier` times.

use crate::boundary::{BoundaryCondition, parse_wall_face_id, wall_face_id};
use crate::error::DragonflyError;
use crate::geom::point::Point;
use crate::geom::polygon::{PointRelation, Polygon2D, bboxes_overlap, boolean};
use crate::geom::region::Region2D;
use crate::geom::segment::LineSegment2D;
use crate::geom::vector::Vector;
use crate::id::valid_identifier;
use crate::name::{HasIdentifier, first_duplicate};
use crate::parameters::RoofSpecification;
use crate::properties::ExtensionProperties;
use crate::room2d::{Room2D, match_segments};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Story {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub room_2ds: Vec<Room2D>,
    pub floor_to_floor_height: f64,
    pub floor_height: f64,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roof: Option<RoofSpecification>,
    #[serde(default)]
    pub properties: ExtensionProperties,
    #[serde(skip)]
    pub parent: Option<String>,
}

fn default_multiplier() -> u32 {
    1
}

impl HasIdentifier for Story {
    fn identifier(&self) -> &str {
        &self.identifier
    }
    fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.identifier)
    }
}

/// Two distinct mutable elements of a slice.
fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    if i < j {
        let (lo, hi) = items.split_at_mut(j);
        (&mut lo[i], &mut hi[0])
    } else {
        let (lo, hi) = items.split_at_mut(i);
        (&mut hi[0], &mut lo[j])
    }
}

impl Story {
    /// Creates a Story.
    ///
    /// # Arguments
    /// * `identifier` - Story identifier
    /// * `room_2ds` - Rooms of the story (unique identifiers)
    /// * `floor_to_floor_height` - Defaults to the tallest room
    /// * `floor_height` - Defaults to the lowest room floor
    pub fn new(
        identifier: &str,
        room_2ds: Vec<Room2D>,
        floor_to_floor_height: Option<f64>,
        floor_height: Option<f64>,
    ) -> Result<Self> {
        let identifier = valid_identifier(identifier)?;
        if let Some(dup) = first_duplicate(room_2ds.iter().map(|r| r.identifier.as_str())) {
            return Err(DragonflyError::InvalidAssembly(format!(
                "Room2D \"{}\" appears more than once in Story \"{}\"",
                dup, identifier
            ))
            .into());
        }
        let floor_height = floor_height.unwrap_or_else(|| {
            room_2ds
                .iter()
                .map(|r| r.floor_height())
                .reduce(f64::min)
                .unwrap_or(0.)
        });
        let floor_to_floor_height = floor_to_floor_height.unwrap_or_else(|| {
            room_2ds
                .iter()
                .map(|r| r.ceiling_height() - floor_height)
                .reduce(f64::max)
                .unwrap_or(3.)
        });
        if floor_to_floor_height <= 0. {
            return Err(DragonflyError::InvalidAssembly(format!(
                "Story \"{}\" needs a positive floor-to-floor height",
                identifier
            ))
            .into());
        }
        let mut story = Self {
            identifier,
            display_name: None,
            room_2ds,
            floor_to_floor_height,
            floor_height,
            multiplier: 1,
            roof: None,
            properties: ExtensionProperties::new(),
            parent: None,
        };
        story.set_parents();
        Ok(story)
    }

    pub(crate) fn set_parents(&mut self) {
        for room in &mut self.room_2ds {
            room.parent = Some(self.identifier.clone());
        }
    }

    pub fn add_room_2d(&mut self, mut room: Room2D) -> Result<()> {
        if self.room_2ds.iter().any(|r| r.identifier == room.identifier) {
            return Err(DragonflyError::InvalidAssembly(format!(
                "Room2D \"{}\" is already in Story \"{}\"",
                room.identifier, self.identifier
            ))
            .into());
        }
        room.parent = Some(self.identifier.clone());
        self.room_2ds.push(room);
        Ok(())
    }

    pub fn room_2d(&self, identifier: &str) -> Result<&Room2D> {
        self.room_2ds
            .iter()
            .find(|r| r.identifier == identifier)
            .ok_or_else(|| {
                DragonflyError::NotFound(format!(
                    "Room2D \"{}\" is not in Story \"{}\"",
                    identifier, self.identifier
                ))
                .into()
            })
    }

    /// Elevation of the top of the last repeat.
    pub fn top_height(&self) -> f64 {
        self.floor_height + self.floor_to_floor_height * self.multiplier as f64
    }

    pub fn floor_area(&self) -> f64 {
        self.room_2ds.iter().map(|r| r.floor_area()).sum()
    }

    pub fn volume(&self) -> f64 {
        self.room_2ds.iter().map(|r| r.volume()).sum()
    }

    pub fn exterior_wall_area(&self) -> f64 {
        self.room_2ds.iter().map(|r| r.exterior_wall_area()).sum()
    }

    /// Plan union of the room floor plates.
    pub fn footprint(&self, tol: f64) -> Vec<Region2D> {
        let regions: Vec<Region2D> = self.room_2ds.iter().map(|r| r.floor_region()).collect();
        boolean::union(&regions, tol)
    }

    /// Assigns a roof and warns when its faces overlap in plan.
    pub fn set_roof(&mut self, roof: RoofSpecification, tol: f64) {
        let overlaps = roof.overlap_count(tol);
        if overlaps > 0 {
            log::warn!(
                "Roof of Story \"{}\" has {} overlapping face pair(s) in plan",
                self.identifier,
                overlaps
            );
        }
        self.roof = Some(roof);
    }

    /// Room indices sorted by identifier.
    fn id_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.room_2ds.len()).collect();
        order.sort_by(|&a, &b| self.room_2ds[a].identifier.cmp(&self.room_2ds[b].identifier));
        order
    }

    /// Pairs coincident segments of different rooms as Surface adjacencies.
    ///
    /// With `intersect`, colinear overlapping segments are split first so
    /// that shared edges match on both sides. Pairs are found in room
    /// identifier order, then segment order; unpaired segments keep their
    /// boundary condition.
    pub fn solve_room_2d_adjacency(&mut self, tol: f64, intersect: bool) -> Result<()> {
        if intersect {
            self.intersect_room_2d_adjacency(tol);
        }
        let segs: Vec<Vec<LineSegment2D>> = self.room_2ds.iter().map(|r| r.floor_segments()).collect();
        let bbs: Vec<_> = self.room_2ds.iter().map(|r| r.floor_region().bbox()).collect();
        let mut paired: Vec<Vec<bool>> = segs.iter().map(|s| vec![false; s.len()]).collect();
        let order = self.id_order();
        for (pos, &i) in order.iter().enumerate() {
            for &j in &order[pos + 1..] {
                if !bboxes_overlap(bbs[i], bbs[j], tol) {
                    continue;
                }
                for (si, s) in segs[i].iter().enumerate() {
                    if paired[i][si] {
                        continue;
                    }
                    let found = segs[j]
                        .iter()
                        .enumerate()
                        .find(|(sj, o)| !paired[j][*sj] && s.is_reversed_equivalent(o, tol))
                        .map(|(sj, _)| sj);
                    if let Some(sj) = found {
                        let (a, b) = pair_mut(&mut self.room_2ds, i, j);
                        a.set_adjacency(b, si, sj, tol)?;
                        paired[i][si] = true;
                        paired[j][sj] = true;
                    }
                }
            }
        }
        Ok(())
    }

    /// Splits segments where a neighbouring room's vertices touch them.
    ///
    /// Split segments lose their boundary conditions and descriptors.
    pub fn intersect_room_2d_adjacency(&mut self, tol: f64) {
        let regions: Vec<Region2D> = self.room_2ds.iter().map(|r| r.floor_region()).collect();
        let bbs: Vec<_> = regions.iter().map(|r| r.bbox()).collect();
        let mut updates = vec![];
        for (i, region) in regions.iter().enumerate() {
            let others: Vec<&Polygon2D> = regions
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i && bboxes_overlap(bbs[i], bbs[*j], tol))
                .flat_map(|(_, r)| r.rings())
                .collect();
            if others.is_empty() {
                continue;
            }
            let mut rings = vec![];
            let mut sources = vec![];
            let mut offset = 0;
            for ring in region.rings() {
                let (poly, src) = ring.intersect_segments(&others, tol);
                for &s in &src {
                    let split = src.iter().filter(|&&o| o == s).count() > 1;
                    sources.push((!split).then(|| crate::room2d::SegmentSource::same(offset + s)));
                }
                offset += ring.len();
                rings.push(poly);
            }
            if sources.len() == offset {
                continue;
            }
            let mut iter = rings.into_iter();
            if let Some(boundary) = iter.next() {
                let new_region = Region2D {
                    boundary,
                    holes: iter.collect(),
                };
                updates.push((i, new_region, sources));
            }
        }
        for (i, region, sources) in updates {
            self.room_2ds[i].rebuild_floor(&region, &sources);
        }
    }

    pub fn reset_adjacency(&mut self) {
        for room in &mut self.room_2ds {
            room.reset_adjacency();
        }
    }

    /// Merges rooms smaller than `area_threshold` into a neighbour.
    ///
    /// Small rooms are visited from the smallest up. Each one joins the
    /// neighbour it shares the longest boundary with, preferring large
    /// neighbours when `join_into_large` (small ones otherwise) and falling
    /// back to any neighbour. The neighbour keeps its identity and
    /// attributes. Adjacency is solved again afterwards.
    pub fn join_small_room_2ds(&mut self, area_threshold: f64, join_into_large: bool, tol: f64) -> Result<()> {
        let mut stuck: HashSet<String> = HashSet::new();
        loop {
            let regions: Vec<Region2D> = self.room_2ds.iter().map(|r| r.floor_region()).collect();
            let areas: Vec<f64> = regions.iter().map(|r| r.area()).collect();
            let mut order: Vec<usize> = (0..self.room_2ds.len()).collect();
            order.sort_by(|&a, &b| {
                areas[a]
                    .total_cmp(&areas[b])
                    .then_with(|| self.room_2ds[a].identifier.cmp(&self.room_2ds[b].identifier))
            });
            let id_order = self.id_order();

            let mut join = None;
            for &i in &order {
                if areas[i] >= area_threshold {
                    break;
                }
                if stuck.contains(&self.room_2ds[i].identifier) {
                    continue;
                }
                let mut preferred: Option<(usize, f64)> = None;
                let mut fallback: Option<(usize, f64)> = None;
                for &j in &id_order {
                    if j == i {
                        continue;
                    }
                    let shared = shared_length(&regions[i], &regions[j], tol);
                    if shared <= tol {
                        continue;
                    }
                    let slot = if (areas[j] >= area_threshold) == join_into_large {
                        &mut preferred
                    } else {
                        &mut fallback
                    };
                    if slot.is_none_or(|(_, best)| shared > best + tol) {
                        *slot = Some((j, shared));
                    }
                }
                match preferred.or(fallback) {
                    Some((j, _)) => {
                        join = Some((j, i));
                        break;
                    }
                    None => {
                        stuck.insert(self.room_2ds[i].identifier.clone());
                    }
                }
            }
            let Some((host, small)) = join else { break };
            let merged = boolean::union(&[regions[host].clone(), regions[small].clone()], tol);
            if merged.len() != 1 {
                stuck.insert(self.room_2ds[small].identifier.clone());
                continue;
            }
            let room = &mut self.room_2ds[host];
            let old = room.floor_segments();
            let new: Vec<LineSegment2D> = merged[0].rings().iter().flat_map(|r| r.segments()).collect();
            room.rebuild_floor(&merged[0], &match_segments(&old, &new, tol));
            room.remove_colinear_vertices(tol)?;
            room.rebuild_detailed_windows(tol)?;
            let gone = self.room_2ds.remove(small);
            log::info!(
                "Joined Room2D \"{}\" into \"{}\"",
                gone.identifier,
                self.room_2ds[if small < host { host - 1 } else { host }].identifier
            );
        }
        self.reset_adjacency();
        self.solve_room_2d_adjacency(tol, true)
    }

    /// Splits rooms into the parts covered and exposed by the story above.
    ///
    /// Split pieces are named `<room>_Covered_<k>` and `<room>_Exposed_<k>`
    /// and take over the attributes of the segments they lie on. Attributes
    /// on segments that no piece matches are dropped with a warning.
    pub fn split_with_story_above(&mut self, above: &Story, tol: f64) -> Result<()> {
        let above_fp = above.footprint(tol);
        let min_area = tol * tol;
        let mut rooms = vec![];
        let mut split_any = false;
        for mut room in std::mem::take(&mut self.room_2ds) {
            let region = [room.floor_region()];
            let covered: Vec<Region2D> = boolean::intersection(&region, &above_fp, tol)
                .into_iter()
                .filter(|r| r.area() > min_area)
                .collect();
            let exposed: Vec<Region2D> = boolean::difference(&region, &above_fp, tol)
                .into_iter()
                .filter(|r| r.area() > min_area)
                .collect();
            if exposed.is_empty() || covered.is_empty() {
                room.is_top_exposed = !exposed.is_empty();
                rooms.push(room);
                continue;
            }
            split_any = true;
            let old = room.floor_segments();
            let mut matched = vec![false; old.len()];
            for (label, pieces, is_exposed) in [("Covered", covered, false), ("Exposed", exposed, true)] {
                for (k, piece) in pieces.iter().enumerate() {
                    let mut part = room.clone();
                    part.identifier = format!("{}_{}_{}", room.identifier, label, k);
                    let new: Vec<LineSegment2D> = piece.rings().iter().flat_map(|r| r.segments()).collect();
                    let sources = match_segments(&old, &new, tol);
                    for s in sources.iter().flatten() {
                        matched[s.index] = true;
                    }
                    part.rebuild_floor(piece, &sources);
                    part.is_top_exposed = is_exposed;
                    if !is_exposed {
                        part.skylight_parameters = None;
                    }
                    part.rebuild_detailed_windows(tol)?;
                    rooms.push(part);
                }
            }
            let dropped = matched.iter().enumerate().filter(|(i, m)| {
                !**m && (room.window_parameters.get(*i).is_some_and(|w| w.is_some())
                    || room.shading_parameters.get(*i).is_some_and(|s| s.is_some())
                    || room.boundary_conditions.get(*i).is_some_and(|b| !b.is_outdoors()))
            });
            let dropped: Vec<usize> = dropped.map(|(i, _)| i).collect();
            if !dropped.is_empty() {
                log::warn!(
                    "Room2D \"{}\" was split by the story above; attributes of segments {:?} were dropped",
                    room.identifier,
                    dropped
                );
            }
        }
        self.room_2ds = rooms;
        self.set_parents();
        if split_any {
            self.reset_adjacency();
            self.solve_room_2d_adjacency(tol, true)?;
        }
        Ok(())
    }

    /// Sets `is_top_exposed` on every room by probing its pole of
    /// inaccessibility against the rooms of the story above.
    pub fn set_top_exposed_by_story_above(&mut self, above: &Story, p_tol: f64) {
        let above_regions: Vec<Region2D> = above.room_2ds.iter().map(|r| r.floor_region()).collect();
        for room in &mut self.room_2ds {
            room.is_top_exposed = !covered_by(&room.floor_region(), &above_regions, p_tol);
        }
    }

    pub fn align(&mut self, line: &LineSegment2D, dist: f64, tol: f64) {
        for room in &mut self.room_2ds {
            room.align(line, dist, tol);
        }
    }

    pub fn rebuild_detailed_windows(&mut self, tol: f64) -> Result<()> {
        for room in &mut self.room_2ds {
            room.rebuild_detailed_windows(tol)?;
        }
        Ok(())
    }

    /// Removes duplicate vertices from every room.
    ///
    /// With `delete_degenerate`, rooms that collapse are removed and their
    /// identifiers returned; otherwise the first collapse is an error.
    pub fn remove_room_2d_duplicate_vertices(&mut self, tol: f64, delete_degenerate: bool) -> Result<Vec<String>> {
        for room in &mut self.room_2ds {
            room.remove_duplicate_vertices(tol, delete_degenerate)?;
        }
        Ok(if delete_degenerate {
            self.delete_degenerate_room_2ds()
        } else {
            vec![]
        })
    }

    /// Removes rooms flagged as degenerate and returns their identifiers.
    pub fn delete_degenerate_room_2ds(&mut self) -> Vec<String> {
        let (bad, good): (Vec<Room2D>, Vec<Room2D>) =
            std::mem::take(&mut self.room_2ds).into_iter().partition(|r| r.degenerate);
        self.room_2ds = good;
        let ids: Vec<String> = bad.into_iter().map(|r| r.identifier).collect();
        if !ids.is_empty() {
            log::warn!(
                "Removed degenerate Room2Ds from Story \"{}\": {}",
                self.identifier,
                ids.join(", ")
            );
        }
        ids
    }

    pub fn set_ground_contact(&mut self, value: bool) {
        for room in &mut self.room_2ds {
            room.is_ground_contact = value;
        }
    }

    pub fn set_top_exposed(&mut self, value: bool) {
        for room in &mut self.room_2ds {
            room.is_top_exposed = value;
        }
    }

    pub fn move_by(&mut self, v: Vector) {
        for room in &mut self.room_2ds {
            room.move_by(v);
        }
        if let Some(roof) = &self.roof {
            self.roof = Some(roof.move_by(v));
        }
        self.floor_height += v.dz;
    }

    pub fn scale(&mut self, factor: f64, origin: Option<Point>) {
        for room in &mut self.room_2ds {
            room.scale(factor, origin);
        }
        if let Some(roof) = &self.roof {
            self.roof = Some(roof.scale(factor, origin));
        }
        let oz = origin.map(|o| o.z).unwrap_or(0.);
        self.floor_height = oz + (self.floor_height - oz) * factor;
        self.floor_to_floor_height *= factor;
    }

    /// Copy with `suffix` appended to the story and room identifiers.
    ///
    /// Surface references between rooms of this story follow the rename.
    pub fn with_suffix(&self, suffix: &str) -> Story {
        let renamed: HashMap<String, String> = self
            .room_2ds
            .iter()
            .map(|r| (r.identifier.clone(), format!("{}{}", r.identifier, suffix)))
            .collect();
        let mut story = self.clone();
        story.identifier = format!("{}{}", self.identifier, suffix);
        for room in &mut story.room_2ds {
            if let Some(new_id) = renamed.get(&room.identifier) {
                room.identifier = new_id.clone();
            }
            for bc in &mut room.boundary_conditions {
                let target = bc
                    .adjacent_face()
                    .and_then(parse_wall_face_id)
                    .and_then(|(rid, i)| renamed.get(rid).map(|n| (n.clone(), i)));
                if let Some((new_room, i)) = target {
                    *bc = BoundaryCondition::surface(&wall_face_id(&new_room, i), &new_room);
                }
            }
        }
        story.set_parents();
        story
    }

    /// Rooms whose floor elevation differs from the story's.
    pub fn check_room_elevations(&self, tol: f64) -> String {
        self.room_2ds
            .iter()
            .filter(|r| (r.floor_height() - self.floor_height).abs() > tol)
            .map(|r| {
                format!(
                    "Room2D \"{}\" has floor height {} but Story \"{}\" is at {}.",
                    r.identifier,
                    r.floor_height(),
                    self.identifier,
                    self.floor_height
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Pairs of rooms whose floor plates overlap in plan.
    pub fn check_room_overlaps(&self, tol: f64) -> String {
        let regions: Vec<Region2D> = self.room_2ds.iter().map(|r| r.floor_region()).collect();
        let mut msgs = vec![];
        for i in 0..regions.len() {
            for j in (i + 1)..regions.len() {
                let shared = boolean::intersection(&regions[i..=i], &regions[j..=j], tol);
                let area = boolean::total_area(&shared);
                if area > tol * tol {
                    msgs.push(format!(
                        "Room2D \"{}\" overlaps Room2D \"{}\" by {:.4} in Story \"{}\".",
                        self.room_2ds[i].identifier, self.room_2ds[j].identifier, area, self.identifier
                    ));
                }
            }
        }
        msgs.join("\n")
    }
}

/// Shared boundary length across every ring pair of two regions.
fn shared_length(a: &Region2D, b: &Region2D, tol: f64) -> f64 {
    a.rings()
        .iter()
        .flat_map(|ra| b.rings().into_iter().map(move |rb| ra.shared_boundary_length(rb, tol)))
        .sum()
}

/// True if the pole of inaccessibility of `region` falls inside any of `cover`.
pub(crate) fn covered_by(region: &Region2D, cover: &[Region2D], p_tol: f64) -> bool {
    let probe = region.pole_of_inaccessibility(p_tol);
    cover
        .iter()
        .any(|c| c.point_relationship(probe, p_tol) != PointRelation::Outside)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::point::Point2;
    use crate::parameters::WindowParameter;

    const TOL: f64 = 0.01;

    fn rect_room(id: &str, x: f64, y: f64, w: f64, h: f64) -> Room2D {
        Room2D::from_polygon(id, &Polygon2D::rectangle(Point2::new(x, y), w, h), 0., 3.).unwrap()
    }

    #[test]
    fn test_two_rectangles_adjacency() -> Result<()> {
        let mut story = Story::new(
            "Level1",
            vec![rect_room("Left", 0., 0., 10., 10.), rect_room("Right", 10., 0., 10., 10.)],
            Some(3.),
            None,
        )?;
        story.solve_room_2d_adjacency(TOL, true)?;
        let left = story.room_2d("Left")?;
        let right = story.room_2d("Right")?;
        assert_eq!(left.boundary_conditions[1].adjacent_room(), Some("Right"));
        assert_eq!(right.boundary_conditions[3].adjacent_room(), Some("Left"));
        let outdoors = left
            .boundary_conditions
            .iter()
            .chain(&right.boundary_conditions)
            .filter(|bc| bc.is_outdoors())
            .count();
        assert_eq!(outdoors, 6);
        Ok(())
    }

    #[test]
    fn test_intersect_splits_long_edge() -> Result<()> {
        let mut story = Story::new(
            "Level1",
            vec![
                rect_room("Big", 0., 0., 10., 20.),
                rect_room("SmallA", 10., 0., 10., 10.),
                rect_room("SmallB", 10., 10., 10., 10.),
            ],
            None,
            None,
        )?;
        story.room_2ds[0].set_outdoor_window_parameters(Some(WindowParameter::SimpleWindowRatio { window_ratio: 0.3 }));
        story.solve_room_2d_adjacency(TOL, true)?;
        let big = story.room_2d("Big")?;
        assert_eq!(big.segment_count(), 5);
        let surfaces = big.boundary_conditions.iter().filter(|bc| bc.is_surface()).count();
        assert_eq!(surfaces, 2);
        // untouched segments keep their windows
        assert!(big.window_parameters[0].is_some());
        assert!(story.check_room_overlaps(TOL).is_empty());
        Ok(())
    }

    #[test]
    fn test_join_small_room() -> Result<()> {
        let mut story = Story::new(
            "Level1",
            vec![
                rect_room("A", 0., 0., 10., 5.),
                rect_room("B", 0., 5., 9.8, 5.),
                rect_room("C", 9.8, 5., 0.2, 2.5),
            ],
            None,
            None,
        )?;
        story.join_small_room_2ds(1., true, TOL)?;
        assert_eq!(story.room_2ds.len(), 2);
        // C shares 2.5 m with B and 0.2 m with A
        let b = story.room_2d("B")?;
        assert!((b.floor_area() - 49.5).abs() < 1e-6);
        assert!((story.floor_area() - 99.5).abs() < 1e-6);
        assert!(b.check_segment_lists().is_empty());
        Ok(())
    }

    #[test]
    fn test_split_with_story_above() -> Result<()> {
        let mut lower = Story::new("Lower", vec![rect_room("Podium", 0., 0., 20., 10.)], Some(3.), None)?;
        let upper_room =
            Room2D::from_polygon("Tower", &Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.), 3., 3.)?;
        let upper = Story::new("Upper", vec![upper_room], Some(3.), None)?;
        lower.split_with_story_above(&upper, TOL)?;
        assert_eq!(lower.room_2ds.len(), 2);
        let covered = lower.room_2d("Podium_Covered_0")?;
        let exposed = lower.room_2d("Podium_Exposed_0")?;
        assert!(!covered.is_top_exposed);
        assert!(exposed.is_top_exposed);
        assert!((covered.floor_area() - 100.).abs() < 1e-6);
        // the two pieces are adjacent along x = 10
        assert_eq!(covered.boundary_conditions.iter().filter(|b| b.is_surface()).count(), 1);
        Ok(())
    }

    #[test]
    fn test_top_exposed_probe() -> Result<()> {
        let mut lower = Story::new(
            "Lower",
            vec![rect_room("West", 0., 0., 10., 10.), rect_room("East", 10., 0., 10., 10.)],
            Some(3.),
            None,
        )?;
        let upper_room =
            Room2D::from_polygon("Above", &Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.), 3., 3.)?;
        let upper = Story::new("Upper", vec![upper_room], Some(3.), None)?;
        lower.set_top_exposed_by_story_above(&upper, TOL);
        assert!(!lower.room_2d("West")?.is_top_exposed);
        assert!(lower.room_2d("East")?.is_top_exposed);
        Ok(())
    }

    #[test]
    fn test_with_suffix_keeps_adjacency() -> Result<()> {
        let mut story = Story::new(
            "Level1",
            vec![rect_room("Left", 0., 0., 10., 10.), rect_room("Right", 10., 0., 10., 10.)],
            None,
            None,
        )?;
        story.solve_room_2d_adjacency(TOL, false)?;
        let top = story.with_suffix("_Top");
        assert_eq!(top.identifier, "Level1_Top");
        let left = top.room_2d("Left_Top")?;
        assert_eq!(left.boundary_conditions[1].adjacent_room(), Some("Right_Top"));
        assert_eq!(left.boundary_conditions[1].adjacent_face(), Some("Right_Top..Face4"));
        Ok(())
    }

    #[test]
    fn test_duplicate_room_ids_fail() {
        let err = Story::new(
            "Level1",
            vec![rect_room("Same", 0., 0., 5., 5.), rect_room("Same", 5., 0., 5., 5.)],
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(crate::error::kind(&err), Some(DragonflyError::InvalidAssembly(_))));
    }
}
