//! Model validation.
//!
//! Every check takes the model and returns a report: one line per problem,
//! empty when the check passes.

use crate::boundary::parse_wall_face_id;
use crate::error::DragonflyError;
use crate::model::Model;
use crate::properties::{ENERGY, ExtensionProperties, RADIANCE};
use anyhow::Result;
use log::debug;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub type Check = fn(&Model) -> String;

/// Geometry and assembly checks run for every extension.
pub const BASE_CHECKS: &[(&str, Check)] = &[
    ("duplicate identifiers", check_duplicate_ids),
    ("degenerate rooms", check_degenerate_rooms),
    ("self-intersecting floors", check_self_intersecting),
    ("segment lists", check_segment_lists),
    ("room elevations", check_room_elevations),
    ("story order", check_story_order),
    ("room overlaps", check_room_overlaps),
    ("plenum depths", check_plenum_depths),
    ("descriptors", check_descriptors),
    ("surface adjacency", check_surface_adjacency),
    ("context planarity", check_context_planar),
];

const ENERGY_CHECKS: &[(&str, Check)] = &[("energy references", check_energy_references)];

const RADIANCE_CHECKS: &[(&str, Check)] = &[("radiance references", check_radiance_references)];

fn join(lines: impl IntoIterator<Item = String>) -> String {
    lines
        .into_iter()
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn run(model: &Model, checks: &[(&str, Check)]) -> String {
    join(checks.iter().map(|(name, check)| {
        let report = check(model);
        debug!("Check {}: {}", name, if report.is_empty() { "passed" } else { "failed" });
        report
    }))
}

fn finish(report: String, raise_exception: bool) -> Result<String> {
    if raise_exception && !report.is_empty() {
        Err(DragonflyError::Invalid(report).into())
    } else {
        Ok(report)
    }
}

impl Model {
    /// Runs the geometry and assembly checks.
    pub fn check_all(&self, raise_exception: bool) -> Result<String> {
        finish(run(self, BASE_CHECKS), raise_exception)
    }

    /// Runs the base checks plus the checks of one extension.
    ///
    /// # Arguments
    /// * `name` - "Dragonfly", "Energy" or "Radiance" (case-insensitive)
    /// * `raise_exception` - Fail with `Invalid` instead of returning a non-empty report
    pub fn check_for_extension(&self, name: &str, raise_exception: bool) -> Result<String> {
        let extra: &[(&str, Check)] = match name.to_ascii_lowercase().as_str() {
            "dragonfly" | "core" => &[],
            "energy" => ENERGY_CHECKS,
            "radiance" => RADIANCE_CHECKS,
            _ => {
                return Err(DragonflyError::InvalidInput(format!(
                    "Unknown extension \"{}\"; use Dragonfly, Energy or Radiance",
                    name
                ))
                .into());
            }
        };
        let report = join([run(self, BASE_CHECKS), run(self, extra)]);
        finish(report, raise_exception)
    }
}

/// Identifiers must be unique within each entity class.
pub fn check_duplicate_ids(model: &Model) -> String {
    let mut out = vec![];
    let classes: [(&str, Vec<&str>); 4] = [
        ("Building", model.buildings.iter().map(|b| b.identifier.as_str()).collect()),
        ("ContextShade", model.context_shades.iter().map(|s| s.identifier.as_str()).collect()),
        ("Story", model.stories().map(|s| s.identifier.as_str()).collect()),
        (
            "Room",
            model
                .room_2ds()
                .map(|r| r.identifier.as_str())
                .chain(model.buildings.iter().flat_map(|b| b.room_3ds.iter().map(|r| r.identifier.as_str())))
                .collect(),
        ),
    ];
    for (class, ids) in classes {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for id in ids {
            if !seen.insert(id) && reported.insert(id) {
                out.push(format!("{} identifier \"{}\" is used more than once.", class, id));
            }
        }
    }
    out.join("\n")
}

pub fn check_degenerate_rooms(model: &Model) -> String {
    let tol = model.tolerance;
    join(
        model
            .room_2ds()
            .filter(|r| r.degenerate || r.floor_area() <= tol * tol)
            .map(|r| format!("Room2D \"{}\" is degenerate.", r.identifier)),
    )
}

pub fn check_self_intersecting(model: &Model) -> String {
    let tol = model.tolerance;
    join(
        model
            .room_2ds()
            .filter(|r| r.floor_region().rings().iter().any(|ring| ring.is_self_intersecting(tol)))
            .map(|r| format!("Room2D \"{}\" has a self-intersecting floor plate.", r.identifier)),
    )
}

pub fn check_segment_lists(model: &Model) -> String {
    join(model.room_2ds().map(|r| r.check_segment_lists()))
}

pub fn check_room_elevations(model: &Model) -> String {
    join(model.stories().map(|s| s.check_room_elevations(model.tolerance)))
}

pub fn check_story_order(model: &Model) -> String {
    join(model.buildings.iter().map(|b| b.check_story_order(model.tolerance)))
}

pub fn check_room_overlaps(model: &Model) -> String {
    join(model.stories().map(|s| s.check_room_overlaps(model.tolerance)))
}

pub fn check_plenum_depths(model: &Model) -> String {
    join(model.room_2ds().map(|r| r.check_plenum_depths()))
}

pub fn check_descriptors(model: &Model) -> String {
    join(model.room_2ds().map(|r| r.check_descriptors(model.tolerance)))
}

/// Surface conditions must point at an existing wall that points back.
pub fn check_surface_adjacency(model: &Model) -> String {
    let mut out = vec![];
    for story in model.stories() {
        let rooms: HashMap<&str, _> = story.room_2ds.iter().map(|r| (r.identifier.as_str(), r)).collect();
        for room in &story.room_2ds {
            for (i, bc) in room.boundary_conditions.iter().enumerate() {
                let Some(face) = bc.adjacent_face() else {
                    continue;
                };
                let back = parse_wall_face_id(face).and_then(|(other, j)| {
                    let other = rooms.get(other)?;
                    other.boundary_conditions.get(j)?.adjacent_face().map(str::to_string)
                });
                if back.as_deref() != Some(room.wall_id(i).as_str()) {
                    out.push(format!(
                        "Segment {} of Room2D \"{}\" is adjacent to \"{}\" which does not point back.",
                        i, room.identifier, face
                    ));
                }
            }
        }
    }
    out.join("\n")
}

pub fn check_context_planar(model: &Model) -> String {
    join(model.context_shades.iter().map(|s| s.check_planar(model.tolerance)))
}

/// Identifiers listed under `extension.library_key` in the model library.
fn library_ids<'a>(model: &'a Model, extension: &str, library_key: &str) -> HashSet<&'a str> {
    model
        .properties
        .field(extension, library_key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|v| v.get("identifier").and_then(Value::as_str))
        .collect()
}

/// Every object that carries extension properties, with a label.
fn property_owners(model: &Model) -> Vec<(String, &ExtensionProperties)> {
    let mut out = vec![];
    for bldg in &model.buildings {
        out.push((format!("Building \"{}\"", bldg.identifier), &bldg.properties));
        for story in &bldg.unique_stories {
            out.push((format!("Story \"{}\"", story.identifier), &story.properties));
            for room in &story.room_2ds {
                out.push((format!("Room2D \"{}\"", room.identifier), &room.properties));
            }
        }
        for room in &bldg.room_3ds {
            out.push((format!("Room \"{}\"", room.identifier), &room.properties));
        }
    }
    out
}

fn check_references(model: &Model, extension: &str, refs: &[(&str, &str)]) -> String {
    let libraries: Vec<(&str, HashSet<&str>)> = refs
        .iter()
        .map(|(key, lib)| (*key, library_ids(model, extension, lib)))
        .collect();
    let mut out = vec![];
    for (label, props) in property_owners(model) {
        for (key, ids) in &libraries {
            if let Some(id) = props.str_field(extension, key) {
                if !ids.contains(id) {
                    out.push(
                        DragonflyError::NotFound(format!("{} {} \"{}\" is not in the model library.", label, key, id))
                            .to_string(),
                    );
                }
            }
        }
    }
    out.join("\n")
}

pub fn check_energy_references(model: &Model) -> String {
    check_references(
        model,
        ENERGY,
        &[
            ("program_type", "program_types"),
            ("construction_set", "construction_sets"),
            ("hvac", "hvacs"),
            ("shw", "shws"),
        ],
    )
}

pub fn check_radiance_references(model: &Model) -> String {
    check_references(model, RADIANCE, &[("modifier_set", "modifier_sets")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryCondition;
    use crate::building::Building;
    use crate::geom::point::Point2;
    use crate::geom::polygon::Polygon2D;
    use crate::room2d::Room2D;
    use crate::story::Story;
    use crate::units::Units;
    use serde_json::json;

    const TOL: f64 = 0.01;

    fn model() -> Result<Model> {
        let bldg = Building::from_footprint(
            "Shop",
            &[Polygon2D::rectangle(Point2::new(0., 0.), 20., 10.)],
            &[3.5],
            0.,
            TOL,
        )?;
        Model::new("Main_Street", vec![bldg], vec![], Units::Meters, TOL, 1.)
    }

    #[test]
    fn test_valid_model_passes() -> Result<()> {
        let model = model()?;
        assert_eq!(model.check_all(true)?, "");
        assert_eq!(model.check_for_extension("Energy", false)?, "");
        Ok(())
    }

    #[test]
    fn test_report_and_raise() -> Result<()> {
        let mut model = model()?;
        let room = &mut model.buildings[0].unique_stories[0].room_2ds[0];
        room.boundary_conditions[0] = BoundaryCondition::surface("Ghost..Face1", "Ghost");
        room.floor_plenum_depth = 5.;
        let report = model.check_all(false)?;
        assert_eq!(report.lines().count(), 2);
        assert!(report.contains("does not point back"));
        let err = model.check_all(true).unwrap_err();
        assert!(matches!(crate::error::kind(&err), Some(DragonflyError::Invalid(_))));
        Ok(())
    }

    #[test]
    fn test_overlapping_rooms() -> Result<()> {
        let a = Room2D::from_polygon("A", &Polygon2D::rectangle(Point2::new(0., 0.), 5., 5.), 0., 3.)?;
        let b = Room2D::from_polygon("B", &Polygon2D::rectangle(Point2::new(4., 0.), 5., 5.), 0., 3.)?;
        let story = Story::new("Level", vec![a, b], Some(3.), Some(0.))?;
        let bldg = Building::new("Lab", vec![story])?;
        let model = Model::new("Lab_Site", vec![bldg], vec![], Units::Meters, TOL, 1.)?;
        assert!(!check_room_overlaps(&model).is_empty());
        Ok(())
    }

    #[test]
    fn test_energy_references() -> Result<()> {
        let mut model = model()?;
        model.properties.set(ENERGY, json!({"program_types": [{"identifier": "Retail"}]}));
        model.buildings[0].unique_stories[0].room_2ds[0]
            .properties
            .set_program_type("Retail");
        assert_eq!(model.check_for_extension("energy", false)?, "");
        model.buildings[0].properties.set_hvac("Missing_VAV");
        let report = model.check_for_extension("Energy", false)?;
        assert!(report.starts_with("Not found"));
        assert!(report.contains("Missing_VAV"));
        assert!(model.check_for_extension("Acoustics", false).is_err());
        Ok(())
    }
}
