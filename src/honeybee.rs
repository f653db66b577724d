//! 3D room-by-room models produced by lowering a dragonfly Model.
//!
//! Every Room2D becomes one closed room (or a stack of a floor plenum, the
//! room itself and a ceiling plenum). Walls carry the apertures and shades
//! evaluated from the segment descriptors, and roofs replace the ceilings of
//! top-exposed rooms.

mod lower;
mod merge;

use crate::boundary::BoundaryCondition;
use crate::building::Building;
use crate::error::DragonflyError;
use crate::geom::face::Face3D;
use crate::geom::point::Point;
use crate::geom::region::Region2D;
use crate::geom::vector::Vector;
use crate::model::Model;
use crate::properties::ExtensionProperties;
use crate::units::Units;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

pub use lower::{pair_apertures, solve_ceiling_adjacencies};
pub use merge::merge_rooms;

/// Schema version written into 3D models.
pub const HONEYBEE_SCHEMA_VERSION: &str = "1.58.0";

/// How rooms are grouped into output models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectPerModel {
    /// One model with every building
    District,
    /// One model per building, other buildings become shades
    #[default]
    Building,
    /// One model per story
    Story,
}

impl FromStr for ObjectPerModel {
    type Err = DragonflyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "district" => Ok(Self::District),
            "building" => Ok(Self::Building),
            "story" => Ok(Self::Story),
            _ => Err(DragonflyError::InvalidInput(format!(
                "\"{}\" is not a valid object-per-model (District, Building, Story)",
                s
            ))),
        }
    }
}

/// How lowered rooms are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergeMethod {
    #[default]
    None,
    /// Rooms sharing a zone
    Zones,
    /// Rooms sharing a zone, plus their plenums
    PlenumZones,
    /// Rooms on the same story
    Stories,
    /// Rooms on the same story, plus their plenums
    PlenumStories,
}

impl MergeMethod {
    pub fn merges_plenums(&self) -> bool {
        matches!(self, Self::PlenumZones | Self::PlenumStories)
    }
}

impl FromStr for MergeMethod {
    type Err = DragonflyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "none" => Ok(Self::None),
            "zones" => Ok(Self::Zones),
            "plenumzones" => Ok(Self::PlenumZones),
            "stories" => Ok(Self::Stories),
            "plenumstories" => Ok(Self::PlenumStories),
            _ => Err(DragonflyError::InvalidInput(format!(
                "\"{}\" is not a valid merge method",
                s
            ))),
        }
    }
}

/// Options for lowering to 3D.
#[derive(Debug, Clone, PartialEq)]
pub struct HoneybeeOptions {
    pub object_per_model: ObjectPerModel,
    /// Other buildings within this plan distance become shades; `None`
    /// includes all of them and `0` includes none.
    pub shade_distance: Option<f64>,
    /// Emit one copy of each unique story carrying its multiplier
    pub use_multiplier: bool,
    /// Ignore plenum depths and lower each Room2D at full height
    pub exclude_plenums: bool,
    /// Add top faces to buildings turned into shades
    pub cap: bool,
    pub solve_ceiling_adjacencies: bool,
    pub merge_method: MergeMethod,
    /// Overrides the model tolerance
    pub tolerance: Option<f64>,
}

impl HoneybeeOptions {
    pub fn new() -> Self {
        Self {
            object_per_model: ObjectPerModel::Building,
            shade_distance: None,
            use_multiplier: true,
            exclude_plenums: false,
            cap: false,
            solve_ceiling_adjacencies: false,
            merge_method: MergeMethod::None,
            tolerance: None,
        }
    }
}

impl Default for HoneybeeOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceType {
    Wall,
    Floor,
    RoofCeiling,
    AirBoundary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Aperture")]
pub struct HbAperture {
    pub identifier: String,
    pub geometry: Face3D,
    pub boundary_condition: BoundaryCondition,
    #[serde(default)]
    pub is_operable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Shade")]
pub struct HbShade {
    pub identifier: String,
    pub geometry: Face3D,
    #[serde(default)]
    pub is_detached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Face")]
pub struct HbFace {
    pub identifier: String,
    pub geometry: Face3D,
    pub face_type: FaceType,
    pub boundary_condition: BoundaryCondition,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apertures: Vec<HbAperture>,
}

impl HbFace {
    pub fn new(identifier: String, geometry: Face3D, face_type: FaceType, boundary_condition: BoundaryCondition) -> Self {
        Self {
            identifier,
            geometry,
            face_type,
            boundary_condition,
            apertures: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Room")]
pub struct HbRoom {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub faces: Vec<HbFace>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outdoor_shades: Vec<HbShade>,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Plenums do not count towards floor area
    #[serde(default)]
    pub exclude_floor_area: bool,
    #[serde(default)]
    pub properties: ExtensionProperties,
}

fn default_multiplier() -> u32 {
    1
}

impl HbRoom {
    pub fn face(&self, identifier: &str) -> Option<&HbFace> {
        self.faces.iter().find(|f| f.identifier == identifier)
    }

    pub fn floor_area(&self) -> f64 {
        self.faces
            .iter()
            .filter(|f| f.face_type == FaceType::Floor)
            .map(|f| f.geometry.area())
            .sum()
    }

    pub fn aperture_count(&self) -> usize {
        self.faces.iter().map(|f| f.apertures.len()).sum()
    }

    pub fn move_by(&mut self, v: Vector) {
        for face in &mut self.faces {
            face.geometry = face.geometry.move_by(v);
            for ap in &mut face.apertures {
                ap.geometry = ap.geometry.move_by(v);
            }
        }
        for shd in &mut self.outdoor_shades {
            shd.geometry = shd.geometry.move_by(v);
        }
    }

    pub fn scale(&mut self, factor: f64, origin: Option<Point>) {
        for face in &mut self.faces {
            face.geometry = face.geometry.scale(factor, origin);
            for ap in &mut face.apertures {
                ap.geometry = ap.geometry.scale(factor, origin);
            }
        }
        for shd in &mut self.outdoor_shades {
            shd.geometry = shd.geometry.scale(factor, origin);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Model")]
pub struct HbModel {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub units: Units,
    pub tolerance: f64,
    pub angle_tolerance: f64,
    pub rooms: Vec<HbRoom>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orphaned_shades: Vec<HbShade>,
    #[serde(default)]
    pub properties: ExtensionProperties,
    pub version: String,
}

impl HbModel {
    /// Conditioned floor area with multipliers (plenums excluded).
    pub fn floor_area(&self) -> f64 {
        self.rooms
            .iter()
            .filter(|r| !r.exclude_floor_area)
            .map(|r| r.floor_area() * r.multiplier as f64)
            .sum()
    }

    pub fn room(&self, identifier: &str) -> Option<&HbRoom> {
        self.rooms.iter().find(|r| r.identifier == identifier)
    }

    /// Writes the model as pretty JSON.
    ///
    /// # Arguments
    /// * `path` - Path to the output file
    pub fn to_hbjson(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to serialize model to: {}", path.display()))?;
        Ok(())
    }
}

/// Lowers a dragonfly Model into one or more 3D models.
pub fn model_to_honeybee(model: &Model, options: &HoneybeeOptions) -> Result<Vec<HbModel>> {
    let tol = options.tolerance.unwrap_or(model.tolerance);
    let context: Vec<HbShade> = model
        .context_shades
        .iter()
        .flat_map(|shade| {
            shade.geometry.iter().enumerate().map(move |(k, f)| HbShade {
                identifier: format!("{}_{}", shade.identifier, k),
                geometry: f.clone(),
                is_detached: shade.is_detached,
            })
        })
        .collect();

    let mut per_building = vec![];
    for bldg in &model.buildings {
        per_building.push(lower_building(bldg, options, tol)?);
    }

    let new_model = |identifier: &str, display_name: Option<String>, rooms: Vec<HbRoom>, shades: Vec<HbShade>| HbModel {
        identifier: identifier.to_string(),
        display_name,
        units: model.units,
        tolerance: tol,
        angle_tolerance: model.angle_tolerance,
        rooms,
        orphaned_shades: shades,
        properties: model.properties.clone(),
        version: HONEYBEE_SCHEMA_VERSION.to_string(),
    };

    let models = match options.object_per_model {
        ObjectPerModel::District => {
            let rooms = per_building.into_iter().flatten().collect();
            vec![new_model(&model.identifier, model.display_name.clone(), rooms, context)]
        }
        ObjectPerModel::Building => {
            let footprints: Vec<Vec<Region2D>> = model.buildings.iter().map(|b| b.footprint(tol)).collect();
            let mut out = vec![];
            for (i, (bldg, rooms)) in model.buildings.iter().zip(per_building).enumerate() {
                let mut shades = context.clone();
                shades.extend(neighbor_shades(model, &footprints, i, options, tol));
                out.push(new_model(&bldg.identifier, bldg.display_name.clone(), rooms, shades));
            }
            out
        }
        ObjectPerModel::Story => {
            let footprints: Vec<Vec<Region2D>> = model.buildings.iter().map(|b| b.footprint(tol)).collect();
            let mut out = vec![];
            for (i, rooms) in per_building.into_iter().enumerate() {
                let shades: Vec<HbShade> = context
                    .iter()
                    .cloned()
                    .chain(neighbor_shades(model, &footprints, i, options, tol))
                    .collect();
                let mut groups: Vec<(String, Vec<HbRoom>)> = vec![];
                for room in rooms {
                    let key = room.story.clone().unwrap_or_else(|| model.buildings[i].identifier.clone());
                    match groups.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, members)) => members.push(room),
                        None => groups.push((key, vec![room])),
                    }
                }
                for (key, members) in groups {
                    out.push(new_model(&key, None, members, shades.clone()));
                }
            }
            out
        }
    };
    Ok(models)
}

/// Lowers, adjoins and merges every room of one building.
fn lower_building(bldg: &Building, options: &HoneybeeOptions, tol: f64) -> Result<Vec<HbRoom>> {
    let stories = if options.use_multiplier {
        bldg.unique_stories.clone()
    } else {
        bldg.all_stories()
    };
    let mut lowered = vec![];
    for story in &stories {
        lowered.extend(lower::lower_story(story, options, tol)?);
    }
    if options.solve_ceiling_adjacencies {
        solve_ceiling_adjacencies(&mut lowered, tol);
    }
    pair_apertures(&mut lowered, tol);
    let mut rooms = merge_rooms(lowered, options.merge_method)?;
    rooms.extend(bldg.room_3ds.iter().cloned());
    Ok(rooms)
}

/// Shades standing in for the buildings around building `focus`.
fn neighbor_shades(
    model: &Model,
    footprints: &[Vec<Region2D>],
    focus: usize,
    options: &HoneybeeOptions,
    tol: f64,
) -> Vec<HbShade> {
    let mut out = vec![];
    for (i, bldg) in model.buildings.iter().enumerate() {
        if i == focus {
            continue;
        }
        let include = match options.shade_distance {
            None => true,
            Some(d) if d <= 0. => false,
            Some(d) => footprint_distance(&footprints[focus], &footprints[i]) <= d,
        };
        if include {
            out.extend(building_shades(bldg, options.cap, tol));
        }
    }
    out
}

/// Minimum plan distance between two footprints.
pub fn footprint_distance(a: &[Region2D], b: &[Region2D]) -> f64 {
    a.iter()
        .flat_map(|ra| b.iter().map(move |rb| ra.boundary.distance_to_polygon(&rb.boundary)))
        .fold(f64::INFINITY, f64::min)
}

/// Exterior walls of a building (plus roofs when `cap`) as detached shades.
pub fn building_shades(bldg: &Building, cap: bool, tol: f64) -> Vec<HbShade> {
    let mut faces = vec![];
    for story in bldg.all_stories() {
        for room in &story.room_2ds {
            let z0 = room.floor_height();
            let z1 = room.ceiling_height();
            for (i, seg) in room.floor_segments().iter().enumerate() {
                if room.boundary_conditions.get(i).is_some_and(|bc| bc.is_surface()) {
                    continue;
                }
                faces.push(lower::wall_geometry(seg, z0, z1, None, tol));
            }
            if cap && room.is_top_exposed {
                faces.extend(lower::ceiling_geometry(room, story.roof.as_ref(), z1, tol));
            }
        }
    }
    for room in &bldg.room_3ds {
        for face in &room.faces {
            if face.boundary_condition.is_outdoors() && (cap || face.face_type == FaceType::Wall) {
                faces.push(face.geometry.clone());
            }
        }
    }
    faces
        .into_iter()
        .enumerate()
        .map(|(k, geometry)| HbShade {
            identifier: format!("{}_Shade{}", bldg.identifier, k),
            geometry,
            is_detached: true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::point::Point2;
    use crate::geom::polygon::Polygon2D;
    use crate::parameters::{ShadingParameter, WindowParameter};
    use crate::room2d::Room2D;
    use crate::story::Story;

    const TOL: f64 = 0.01;

    fn two_room_model() -> Result<Model> {
        let mut left = Room2D::from_polygon("Left", &Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.), 0., 3.)?;
        left.set_outdoor_window_parameters(Some(WindowParameter::SimpleWindowRatio { window_ratio: 0.4 }));
        left.set_outdoor_shading_parameters(Some(ShadingParameter::Overhang { depth: 0.5, angle: 0. }));
        let right = Room2D::from_polygon("Right", &Polygon2D::rectangle(Point2::new(10., 0.), 10., 10.), 0., 3.)?;
        let mut story = Story::new("Level1", vec![left, right], Some(3.), Some(0.))?;
        story.solve_room_2d_adjacency(TOL, true)?;
        story.set_ground_contact(true);
        story.set_top_exposed(true);
        let bldg = Building::new("Office", vec![story])?;
        Model::new("Campus", vec![bldg], vec![], Units::Meters, TOL, 1.)
    }

    #[test]
    fn test_lower_simple_rooms() -> Result<()> {
        let model = two_room_model()?;
        let hb = model_to_honeybee(&model, &HoneybeeOptions::new())?;
        assert_eq!(hb.len(), 1);
        let left = hb[0].room("Left").unwrap();
        assert_eq!(left.faces.len(), 6);
        // windows on the three outdoor walls only
        assert_eq!(left.aperture_count(), 3);
        assert_eq!(left.outdoor_shades.len(), 3);
        let wall = left.face("Left..Face2").unwrap();
        assert_eq!(wall.boundary_condition.adjacent_face(), Some("Right..Face4"));
        let floor = left.face("Left..Face5").unwrap();
        assert_eq!(floor.face_type, FaceType::Floor);
        assert!(matches!(floor.boundary_condition, BoundaryCondition::Ground));
        assert!(floor.geometry.normal().unwrap().dz < 0.);
        assert!((hb[0].floor_area() - 200.).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_parse_options() {
        assert_eq!("plenum-zones".parse::<MergeMethod>().unwrap(), MergeMethod::PlenumZones);
        assert_eq!("District".parse::<ObjectPerModel>().unwrap(), ObjectPerModel::District);
        assert!("Campus".parse::<ObjectPerModel>().is_err());
    }

    #[test]
    fn test_shade_distance() -> Result<()> {
        let a = Building::from_footprint("A", &[Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.)], &[3.], 0., TOL)?;
        let b = Building::from_footprint("B", &[Polygon2D::rectangle(Point2::new(15., 0.), 10., 10.)], &[3.], 0., TOL)?;
        let model = Model::new("Site", vec![a, b], vec![], Units::Meters, TOL, 1.)?;
        let mut options = HoneybeeOptions::new();
        let all = model_to_honeybee(&model, &options)?;
        assert_eq!(all[0].orphaned_shades.len(), 4);
        options.shade_distance = Some(0.);
        assert!(model_to_honeybee(&model, &options)?[0].orphaned_shades.is_empty());
        options.shade_distance = Some(4.);
        assert!(model_to_honeybee(&model, &options)?[0].orphaned_shades.is_empty());
        options.shade_distance = Some(6.);
        options.cap = true;
        assert_eq!(model_to_honeybee(&model, &options)?[0].orphaned_shades.len(), 5);
        Ok(())
    }

    #[test]
    fn test_story_grouping_without_multiplier() -> Result<()> {
        let mut bldg = Building::from_footprint("Tower", &[Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.)], &[3.], 0., TOL)?;
        bldg.unique_stories[0].multiplier = 3;
        let model = Model::new("Site", vec![bldg], vec![], Units::Meters, TOL, 1.)?;
        let options = HoneybeeOptions {
            object_per_model: ObjectPerModel::Story,
            use_multiplier: false,
            ..HoneybeeOptions::new()
        };
        let hb = model_to_honeybee(&model, &options)?;
        assert_eq!(hb.len(), 3);
        assert_eq!(hb[2].identifier, "Tower_Floor1_2");
        assert!((hb.iter().map(|m| m.floor_area()).sum::<f64>() - 300.).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_write_hbjson() -> Result<()> {
        let model = two_room_model()?;
        let hb = model_to_honeybee(&model, &HoneybeeOptions::new())?;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("office.hbjson");
        hb[0].to_hbjson(&path)?;
        let text = std::fs::read_to_string(&path)?;
        let back: HbModel = serde_json::from_str(&text)?;
        assert_eq!(back.rooms.len(), 2);
        assert!(text.contains("\"type\": \"Aperture\""));
        Ok(())
    }
}
