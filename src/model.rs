//! Model: the root of the tree, holding buildings, context shades, units
//! and tolerances.

use crate::building::Building;
use crate::context::ContextShade;
use crate::error::DragonflyError;
use crate::geom::point::Point;
use crate::geom::vector::Vector;
use crate::honeybee::{HbModel, HoneybeeOptions, model_to_honeybee};
use crate::id::valid_identifier;
use crate::name::{HasIdentifier, SortByIdentifier};
use crate::properties::{ENERGY, ExtensionProperties, RADIANCE};
use crate::room2d::Room2D;
use crate::story::Story;
use crate::units::Units;
use crate::version::{SCHEMA_VERSION, upgrade};
use anyhow::{Context, Result};
use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Library lists that abridged dictionaries leave out, per extension.
const LIBRARY_KEYS: &[(&str, &[&str])] = &[
    (
        ENERGY,
        &[
            "materials",
            "constructions",
            "construction_sets",
            "schedule_type_limits",
            "schedules",
            "program_types",
            "hvacs",
            "shws",
        ],
    ),
    (RADIANCE, &["modifiers", "modifier_sets"]),
];

/// Load objects and the density field diversified in each.
const DIVERSIFIED_LOADS: &[(&str, &str)] = &[
    ("people", "people_per_area"),
    ("lighting", "watts_per_area"),
    ("electric_equipment", "watts_per_area"),
    ("gas_equipment", "watts_per_area"),
];

fn default_tolerance() -> f64 {
    0.01
}

fn default_angle_tolerance() -> f64 {
    1.
}

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Model {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub buildings: Vec<Building>,
    #[serde(default)]
    pub context_shades: Vec<ContextShade>,
    #[serde(default)]
    pub units: Units,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Degrees
    #[serde(default = "default_angle_tolerance")]
    pub angle_tolerance: f64,
    /// Model-wide extension data, including the resource libraries
    #[serde(default)]
    pub properties: ExtensionProperties,
    #[serde(default = "default_version")]
    pub version: String,
}

impl HasIdentifier for Model {
    fn identifier(&self) -> &str {
        &self.identifier
    }
    fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.identifier)
    }
}

impl Model {
    /// Creates a Model.
    ///
    /// # Arguments
    /// * `tolerance` - Length tolerance in model units, greater than 0
    /// * `angle_tolerance` - Angle tolerance in degrees, greater than 0
    pub fn new(
        identifier: &str,
        buildings: Vec<Building>,
        context_shades: Vec<ContextShade>,
        units: Units,
        tolerance: f64,
        angle_tolerance: f64,
    ) -> Result<Self> {
        if tolerance <= 0. || angle_tolerance <= 0. {
            return Err(DragonflyError::InvalidInput(format!(
                "Tolerances must be greater than 0, got {} and {}",
                tolerance, angle_tolerance
            ))
            .into());
        }
        let mut model = Self {
            identifier: valid_identifier(identifier)?,
            display_name: None,
            buildings,
            context_shades,
            units,
            tolerance,
            angle_tolerance,
            properties: ExtensionProperties::new(),
            version: SCHEMA_VERSION.to_string(),
        };
        model.check_unique_ids()?;
        model.set_parents();
        Ok(model)
    }

    /// Creates a Model from loose objects.
    ///
    /// Stories and Room2Ds without a Building are collected into a Building
    /// named `<identifier>_Building`; Room2Ds are grouped into one Story per
    /// floor elevation.
    pub fn from_objects(
        identifier: &str,
        mut buildings: Vec<Building>,
        mut stories: Vec<Story>,
        rooms: Vec<Room2D>,
        context_shades: Vec<ContextShade>,
        units: Units,
        tolerance: f64,
    ) -> Result<Self> {
        let orphan_stories = stories.len();
        let mut by_height: Vec<(f64, Vec<Room2D>)> = vec![];
        for room in rooms {
            let z = room.floor_height();
            match by_height.iter_mut().find(|(h, _)| (h - z).abs() <= tolerance) {
                Some((_, group)) => group.push(room),
                None => by_height.push((z, vec![room])),
            }
        }
        by_height.sort_by(|a, b| a.0.total_cmp(&b.0));
        let orphan_rooms = by_height.iter().map(|(_, g)| g.len()).sum::<usize>();
        for (k, (z, group)) in by_height.into_iter().enumerate() {
            let story_id = format!("{}_Story{}", identifier, k + 1);
            stories.push(Story::new(&story_id, group, None, Some(z))?);
        }
        if !stories.is_empty() {
            warn!(
                "{} orphaned Stories and {} orphaned Room2Ds were collected into Building \"{}_Building\"",
                orphan_stories,
                orphan_rooms,
                identifier
            );
            buildings.push(Building::new(&format!("{}_Building", identifier), stories)?);
        }
        Self::new(
            identifier,
            buildings,
            context_shades,
            units,
            tolerance,
            default_angle_tolerance(),
        )
    }

    pub(crate) fn set_parents(&mut self) {
        for bldg in &mut self.buildings {
            bldg.parent = Some(self.identifier.clone());
            bldg.set_parents();
        }
    }

    fn check_unique_ids(&self) -> Result<()> {
        let report = crate::check::check_duplicate_ids(self);
        if report.is_empty() {
            Ok(())
        } else {
            Err(DragonflyError::InvalidAssembly(report).into())
        }
    }

    /// Deep copy of the whole tree.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    pub fn add_building(&mut self, building: Building) -> Result<()> {
        self.buildings.push(building);
        if let Err(e) = self.check_unique_ids() {
            self.buildings.pop();
            return Err(e);
        }
        self.set_parents();
        Ok(())
    }

    pub fn add_context_shade(&mut self, shade: ContextShade) -> Result<()> {
        self.context_shades.push(shade);
        if let Err(e) = self.check_unique_ids() {
            self.context_shades.pop();
            return Err(e);
        }
        Ok(())
    }

    pub fn building(&self, identifier: &str) -> Result<&Building> {
        self.buildings
            .iter()
            .find(|b| b.identifier == identifier)
            .ok_or_else(|| DragonflyError::NotFound(format!("Building \"{}\" is not in the model", identifier)).into())
    }

    pub fn stories(&self) -> impl Iterator<Item = &Story> {
        self.buildings.iter().flat_map(|b| b.unique_stories.iter())
    }

    pub fn room_2ds(&self) -> impl Iterator<Item = &Room2D> {
        self.stories().flat_map(|s| s.room_2ds.iter())
    }

    /// Floor area of all buildings with multipliers applied.
    pub fn floor_area(&self) -> f64 {
        self.buildings.iter().map(|b| b.floor_area()).sum()
    }

    pub fn exterior_wall_area(&self) -> f64 {
        self.stories()
            .map(|s| s.exterior_wall_area() * s.multiplier as f64)
            .sum()
    }

    pub fn move_by(&mut self, v: Vector) {
        for bldg in &mut self.buildings {
            bldg.move_by(v);
        }
        for shade in &mut self.context_shades {
            shade.move_by(v);
        }
    }

    pub fn scale(&mut self, factor: f64, origin: Option<Point>) {
        for bldg in &mut self.buildings {
            bldg.scale(factor, origin);
        }
        for shade in &mut self.context_shades {
            shade.scale(factor, origin);
        }
    }

    /// Copy of the model expressed in other units.
    ///
    /// Geometry is scaled about the origin and the tolerance follows.
    pub fn convert_to_units(&self, units: Units) -> Self {
        let mut out = self.duplicate();
        if units == self.units {
            return out;
        }
        let factor = self.units.conversion_factor(units);
        out.scale(factor, None);
        out.tolerance = self.tolerance * factor;
        out.units = units;
        out
    }

    /// Serializes the model.
    ///
    /// Abridged dictionaries drop the resource libraries and keep only the
    /// identifiers that reference them.
    pub fn to_dict(&self, abridged: bool) -> Result<Value> {
        let mut out = serde_json::to_value(self).context("Failed to serialize model")?;
        if let Some(obj) = out.as_object_mut() {
            obj.insert("version".to_string(), json!(SCHEMA_VERSION));
        }
        if abridged {
            for (extension, keys) in LIBRARY_KEYS {
                if let Some(Value::Object(ext)) = out.get_mut("properties").and_then(|p| p.get_mut(*extension)) {
                    for key in keys.iter() {
                        ext.remove(*key);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Loads a model dictionary, upgrading older schema versions.
    pub fn from_dict(mut data: Value) -> Result<Self> {
        match data.get("type").and_then(Value::as_str) {
            Some("Model") => {}
            other => {
                return Err(DragonflyError::InvalidInput(format!(
                    "Expected a dictionary of type Model, got {:?}",
                    other
                ))
                .into());
            }
        }
        upgrade(&mut data)?;
        let mut model: Model = serde_json::from_value(data).context("Failed to read model dictionary")?;
        if model.tolerance <= 0. {
            model.tolerance = model.units.default_tolerance();
        }
        model.check_unique_ids()?;
        model.set_parents();
        Ok(model)
    }

    /// Lowers the model into one or more 3D models.
    pub fn to_honeybee(&self, options: &HoneybeeOptions) -> Result<Vec<HbModel>> {
        model_to_honeybee(self, options)
    }

    /// Applies random variation to the room load densities.
    ///
    /// Every Room2D with energy loads has its densities multiplied by a
    /// normally distributed factor (mean 1, `std_dev`), clamped at 0, and
    /// gets a whole-hour schedule offset drawn from
    /// `-schedule_offset..=schedule_offset`. Rooms are visited in identifier
    /// order so a seed always gives the same result.
    pub fn diversify_loads(&mut self, seed: u64, std_dev: f64, schedule_offset: u32) -> Result<()> {
        if !(0. ..1.).contains(&std_dev) {
            return Err(DragonflyError::InvalidInput(format!(
                "Load standard deviation must be between 0 and 1, got {}",
                std_dev
            ))
            .into());
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut rooms: Vec<&mut Room2D> = self
            .buildings
            .iter_mut()
            .flat_map(|b| b.unique_stories.iter_mut())
            .flat_map(|s| s.room_2ds.iter_mut())
            .collect();
        rooms.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        for room in rooms {
            let Some(Value::Object(mut energy)) = room.properties.get(ENERGY).cloned() else {
                continue;
            };
            for (load, key) in DIVERSIFIED_LOADS {
                let value = energy.get(*load).and_then(|l| l.get(*key)).and_then(Value::as_f64);
                if let (Some(v), Some(Value::Object(obj))) = (value, energy.get_mut(*load)) {
                    let factor = (1. + std_dev * standard_normal(&mut rng)).max(0.);
                    obj.insert(key.to_string(), json!(v * factor));
                }
            }
            if schedule_offset > 0 {
                let offset = rng.gen_range(-(schedule_offset as i64)..=schedule_offset as i64);
                energy.insert("schedule_offset".to_string(), json!(offset));
            }
            room.properties.set(ENERGY, Value::Object(energy));
        }
        Ok(())
    }

    /// Buildings sorted by identifier.
    pub fn sorted_buildings(&self) -> Vec<Building> {
        let mut out = self.buildings.clone();
        out.sort_by_identifier();
        out
    }
}

/// Box-Muller sample of the standard normal distribution.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.);
    let u2: f64 = rng.r#gen();
    (-2. * u1.ln()).sqrt() * (2. * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::point::Point2;
    use crate::geom::polygon::Polygon2D;

    const TOL: f64 = 0.01;

    fn office() -> Result<Model> {
        let bldg = Building::from_footprint(
            "Office",
            &[Polygon2D::rectangle(Point2::new(0., 0.), 30., 20.)],
            &[4., 4.],
            5.,
            TOL,
        )?;
        let mut model = Model::new("Campus", vec![bldg], vec![], Units::Meters, TOL, 1.)?;
        model.properties.set(
            ENERGY,
            json!({"constructions": [{"identifier": "Wall"}], "global_construction_set": "Default"}),
        );
        Ok(model)
    }

    #[test]
    fn test_duplicate_and_roundtrip() -> Result<()> {
        let model = office()?;
        assert_eq!(model.duplicate().to_dict(false)?, model.to_dict(false)?);
        let back = Model::from_dict(model.to_dict(false)?)?;
        assert_eq!(back, model);
        Ok(())
    }

    #[test]
    fn test_abridged_drops_library() -> Result<()> {
        let model = office()?;
        let d = model.to_dict(true)?;
        assert!(d["properties"]["energy"].get("constructions").is_none());
        assert_eq!(d["properties"]["energy"]["global_construction_set"], "Default");
        assert_eq!(d["version"], SCHEMA_VERSION);
        Ok(())
    }

    #[test]
    fn test_convert_units() -> Result<()> {
        let model = office()?;
        let feet = model.convert_to_units(Units::Feet);
        assert_eq!(feet.units, Units::Feet);
        assert!((feet.floor_area() - model.floor_area() / (0.3048 * 0.3048)).abs() < 1e-6);
        let back = feet.convert_to_units(Units::Meters);
        let a: Vec<Point> = model.room_2ds().flat_map(|r| r.floor_geometry().boundary().to_vec()).collect();
        let b: Vec<Point> = back.room_2ds().flat_map(|r| r.floor_geometry().boundary().to_vec()).collect();
        for (p, q) in a.iter().zip(&b) {
            assert!(p.distance(q) <= 100. * TOL);
        }
        // the original is left alone
        assert_eq!(model.units, Units::Meters);
        Ok(())
    }

    #[test]
    fn test_from_dict_rejects_other_types() {
        let err = Model::from_dict(json!({"type": "Building", "identifier": "B"})).unwrap_err();
        assert!(matches!(crate::error::kind(&err), Some(DragonflyError::InvalidInput(_))));
    }

    #[test]
    fn test_from_objects_collects_orphans() -> Result<()> {
        let a = Room2D::from_polygon("A", &Polygon2D::rectangle(Point2::new(0., 0.), 5., 5.), 0., 3.)?;
        let b = Room2D::from_polygon("B", &Polygon2D::rectangle(Point2::new(0., 0.), 5., 5.), 3., 3.)?;
        let model = Model::from_objects("Site", vec![], vec![], vec![b, a], vec![], Units::Meters, TOL)?;
        assert_eq!(model.buildings.len(), 1);
        let bldg = &model.buildings[0];
        assert_eq!(bldg.identifier, "Site_Building");
        assert_eq!(bldg.unique_stories[0].room_2ds[0].identifier, "A");
        assert_eq!(bldg.unique_stories[1].identifier, "Site_Story2");
        Ok(())
    }

    #[test]
    fn test_duplicate_building_ids() -> Result<()> {
        let mut model = office()?;
        let twin = model.buildings[0].clone();
        let err = model.add_building(twin).unwrap_err();
        assert!(matches!(crate::error::kind(&err), Some(DragonflyError::InvalidAssembly(_))));
        assert_eq!(model.buildings.len(), 1);
        Ok(())
    }

    #[test]
    fn test_diversify_loads_seeded() -> Result<()> {
        let mut model = office()?;
        for bldg in &mut model.buildings {
            for story in &mut bldg.unique_stories {
                for room in &mut story.room_2ds {
                    room.properties.set_field(ENERGY, "lighting", json!({"watts_per_area": 10.0}));
                }
            }
        }
        let mut a = model.duplicate();
        let mut b = model.duplicate();
        a.diversify_loads(7, 0.2, 2)?;
        b.diversify_loads(7, 0.2, 2)?;
        assert_eq!(a, b);
        let values: Vec<f64> = a
            .room_2ds()
            .filter_map(|r| r.properties.field(ENERGY, "lighting"))
            .filter_map(|l| l["watts_per_area"].as_f64())
            .collect();
        assert_eq!(values.len(), 10);
        assert!(values.iter().all(|v| *v >= 0.));
        assert!(values.iter().any(|v| (v - 10.).abs() > 1e-9));
        assert!(model.duplicate().diversify_loads(7, 1.5, 0).is_err());
        Ok(())
    }
}
