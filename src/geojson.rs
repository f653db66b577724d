//! GeoJSON export and import of building footprints.
//!
//! Footprints are placed on the globe with a [`GeoTransform`]: the model
//! `origin` sits at the location's longitude and latitude.

use crate::building::Building;
use crate::error::DragonflyError;
use crate::geom::point::Point2;
use crate::geom::polygon::Polygon2D;
use crate::geom::region::Region2D;
use crate::honeybee::{HbModel, HoneybeeOptions, ObjectPerModel};
use crate::io::project::ProjectFolder;
use crate::location::{GeoTransform, Location};
use crate::model::Model;
use crate::units::Units;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Folder below the project root holding the detailed 3D models.
pub const DETAILED_MODEL_FOLDER: &str = "hb_json";

const SQ_FEET_PER_SQ_METER: f64 = 1. / (0.3048 * 0.3048);

/// Floor-to-floor height in meters assumed for imported buildings without a height.
const DEFAULT_STORY_HEIGHT: f64 = 3.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkKind {
    Electrical,
    Road,
}

/// A connected electrical or road network drawn as polylines in model
/// plan coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub identifier: String,
    pub kind: NetworkKind,
    pub segments: Vec<Vec<Point2>>,
}

impl Network {
    fn feature_type(&self) -> &'static str {
        match self.kind {
            NetworkKind::Electrical => "ElectricalConnector",
            NetworkKind::Road => "Road",
        }
    }
}

fn ring(poly: &Polygon2D, geo: &GeoTransform) -> Value {
    let mut coords: Vec<Value> = poly
        .vertices()
        .iter()
        .map(|p| {
            let (lon, lat) = geo.to_lon_lat(*p);
            json!([lon, lat])
        })
        .collect();
    if let Some(first) = coords.first().cloned() {
        coords.push(first);
    }
    Value::Array(coords)
}

fn polygon_coordinates(region: &Region2D, geo: &GeoTransform) -> Value {
    let mut rings = vec![ring(&region.boundary, geo)];
    rings.extend(region.holes.iter().map(|h| ring(h, geo)));
    Value::Array(rings)
}

/// GeoJSON Feature for one building.
///
/// `detailed_model` is the identifier of the 3D model holding the building.
pub fn building_feature(bldg: &Building, detailed_model: &str, geo: &GeoTransform, units: Units, tol: f64) -> Value {
    let footprint = bldg.footprint(tol);
    let geometry = if footprint.len() == 1 {
        json!({"type": "Polygon", "coordinates": polygon_coordinates(&footprint[0], geo)})
    } else {
        let polys: Vec<Value> = footprint.iter().map(|r| polygon_coordinates(r, geo)).collect();
        json!({"type": "MultiPolygon", "coordinates": polys})
    };
    let area_factor = units.to_meters().powi(2) * SQ_FEET_PER_SQ_METER;
    let footprint_area: f64 = footprint.iter().map(|r| r.area()).sum();
    json!({
        "type": "Feature",
        "properties": {
            "id": bldg.identifier,
            "name": bldg.display_name.as_deref().unwrap_or(&bldg.identifier),
            "type": "Building",
            "floor_area": bldg.floor_area() * area_factor,
            "footprint_area": footprint_area * area_factor,
            "number_of_stories": bldg.story_count(),
            "number_of_stories_above_ground": bldg.story_count_above_ground(),
            "maximum_roof_height": bldg.max_height() * units.to_meters(),
            "detailed_model_filename": format!("{}/{}.json", DETAILED_MODEL_FOLDER, detailed_model),
        },
        "geometry": geometry,
    })
}

/// GeoJSON Features for a network.
pub fn network_features(network: &Network, geo: &GeoTransform) -> Vec<Value> {
    network
        .segments
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let coords: Vec<Value> = line
                .iter()
                .map(|p| {
                    let (lon, lat) = geo.to_lon_lat(*p);
                    json!([lon, lat])
                })
                .collect();
            json!({
                "type": "Feature",
                "properties": {
                    "id": format!("{}_{}", network.identifier, i),
                    "type": network.feature_type(),
                },
                "geometry": {"type": "LineString", "coordinates": coords},
            })
        })
        .collect()
}

/// The FeatureCollection of a model, with a `project` header.
///
/// With `district` set, every Building points to one detailed model named
/// after the Model.
pub fn model_to_geojson_dict(
    model: &Model,
    location: &Location,
    origin: Point2,
    network: Option<&Network>,
    district: bool,
    tol: f64,
) -> Value {
    let geo = GeoTransform::new(location, origin, model.units);
    let mut features: Vec<Value> = model
        .buildings
        .iter()
        .map(|b| {
            let detailed = if district { &model.identifier } else { &b.identifier };
            building_feature(b, detailed, &geo, model.units, tol)
        })
        .collect();
    if let Some(net) = network {
        features.extend(network_features(net, &geo));
    }
    json!({
        "type": "FeatureCollection",
        "project": {
            "id": model.identifier,
            "name": model.display_name.as_deref().unwrap_or(&model.identifier),
            "city": location.city,
            "latitude": location.latitude,
            "longitude": location.longitude,
            "time_zone": location.time_zone,
            "surface_elevation": location.elevation,
        },
        "features": features,
    })
}

/// Writes `<model>.geojson` plus one detailed 3D model per building.
///
/// # Arguments
/// * `folder` - Project folder; created if missing and locked while writing
/// * `options` - Lowering options; `District` writes a single detailed model
///
/// # Returns
/// Path of the geoJSON file
pub fn write_geojson_project(
    model: &Model,
    location: &Location,
    origin: Point2,
    folder: &Path,
    network: Option<&Network>,
    options: &HoneybeeOptions,
) -> Result<PathBuf> {
    let project = ProjectFolder::acquire(folder)?;
    let path = emit_geojson(&project, model, location, origin, network, options)?;
    info!("Wrote geoJSON project to {}", project.root().display());
    Ok(path)
}

/// Writes the geoJSON, the detailed models and `network.json` into a held folder.
pub(crate) fn emit_geojson(
    project: &ProjectFolder,
    model: &Model,
    location: &Location,
    origin: Point2,
    network: Option<&Network>,
    options: &HoneybeeOptions,
) -> Result<PathBuf> {
    let tol = options.tolerance.unwrap_or(model.tolerance);
    let hb_models = write_detailed_models(project, model, options)?;
    if let Some(net) = network {
        project.write_json("network.json", net)?;
    }
    let district = options.object_per_model == ObjectPerModel::District;
    debug!("Wrote {} detailed models", hb_models.len());
    let dict = model_to_geojson_dict(model, location, origin, network, district, tol);
    project.write_json(format!("{}.geojson", model.identifier), &dict)
}

fn write_detailed_models(project: &ProjectFolder, model: &Model, options: &HoneybeeOptions) -> Result<Vec<HbModel>> {
    let mut options = options.clone();
    if options.object_per_model == ObjectPerModel::Story {
        warn!("Story grouping is not supported for geoJSON projects; writing one model per building");
        options.object_per_model = ObjectPerModel::Building;
    }
    let hb_models = model.to_honeybee(&options)?;
    for hb in &hb_models {
        project.write_json(format!("{}/{}.json", DETAILED_MODEL_FOLDER, hb.identifier), hb)?;
    }
    Ok(hb_models)
}

fn parse_ring(ring: &Value, geo: &GeoTransform) -> Result<Polygon2D> {
    let coords = ring
        .as_array()
        .ok_or_else(|| DragonflyError::InvalidInput("GeoJSON ring is not an array".to_string()))?;
    let mut pts = vec![];
    for c in coords {
        match (c.get(0).and_then(Value::as_f64), c.get(1).and_then(Value::as_f64)) {
            (Some(lon), Some(lat)) => pts.push(geo.to_point(lon, lat)),
            _ => {
                return Err(DragonflyError::InvalidInput(format!("Invalid GeoJSON coordinate {}", c)).into());
            }
        }
    }
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    Ok(Polygon2D::new(pts))
}

/// Footprint regions of a Polygon or MultiPolygon; inner rings become holes.
fn feature_regions(geometry: &Value, geo: &GeoTransform) -> Result<Vec<Region2D>> {
    let coords = geometry.get("coordinates").cloned().unwrap_or(Value::Null);
    let polygons: Vec<Value> = match geometry.get("type").and_then(Value::as_str) {
        Some("Polygon") => vec![coords],
        Some("MultiPolygon") => coords.as_array().cloned().unwrap_or_default(),
        other => {
            return Err(DragonflyError::InvalidInput(format!(
                "Building geometry must be a Polygon or MultiPolygon, got {:?}",
                other
            ))
            .into());
        }
    };
    let mut regions = vec![];
    for p in &polygons {
        let mut rings = p
            .as_array()
            .into_iter()
            .flatten()
            .map(|r| parse_ring(r, geo))
            .collect::<Result<Vec<_>>>()?
            .into_iter();
        if let Some(outer) = rings.next() {
            regions.push(Region2D::new(outer, rings.collect()));
        }
    }
    Ok(regions)
}

impl Model {
    /// Writes a geoJSON project; see [`write_geojson_project`].
    pub fn to_geojson(&self, location: &Location, origin: Point2, folder: &Path, tol: Option<f64>) -> Result<PathBuf> {
        let options = HoneybeeOptions {
            tolerance: tol,
            ..HoneybeeOptions::new()
        };
        write_geojson_project(self, location, origin, folder, None, &options)
    }

    /// Builds a model from the Building features of a FeatureCollection.
    ///
    /// Each footprint is extruded into `number_of_stories` equal stories
    /// reaching `maximum_roof_height` (meters). Without a `location`, the
    /// collection's `project` latitude and longitude are used.
    pub fn from_geojson_dict(
        data: &Value,
        location: Option<&Location>,
        origin: Point2,
        units: Units,
        tol: f64,
    ) -> Result<Self> {
        let location = match location {
            Some(loc) => loc.clone(),
            None => {
                let project = data.get("project");
                let field = |k: &str| project.and_then(|p| p.get(k)).and_then(Value::as_f64);
                match (field("latitude"), field("longitude")) {
                    (Some(lat), Some(lon)) => Location::new(lat, lon),
                    _ => {
                        return Err(DragonflyError::InvalidInput(
                            "GeoJSON has no project location and none was given".to_string(),
                        )
                        .into());
                    }
                }
            }
        };
        let geo = GeoTransform::new(&location, origin, units);
        let empty = Map::new();
        let mut buildings = vec![];
        for (i, feature) in data
            .get("features")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .enumerate()
        {
            let props = feature.get("properties").and_then(Value::as_object).unwrap_or(&empty);
            if props.get("type").and_then(Value::as_str) != Some("Building") {
                continue;
            }
            let identifier = props
                .get("id")
                .and_then(Value::as_str)
                .map(crate::id::clean_string)
                .unwrap_or_else(|| format!("Building_{}", i));
            let geometry = feature.get("geometry").cloned().unwrap_or(Value::Null);
            let footprints = feature_regions(&geometry, &geo)?;
            let stories = props
                .get("number_of_stories")
                .and_then(Value::as_u64)
                .unwrap_or(1)
                .max(1) as usize;
            let height_m = props
                .get("maximum_roof_height")
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_STORY_HEIGHT * stories as f64);
            let ftf = height_m / units.to_meters() / stories as f64;
            let mut bldg = Building::from_footprint_regions(&identifier, &footprints, &vec![ftf; stories], 0., tol)
                .with_context(|| format!("Failed to build \"{}\" from its footprint", identifier))?;
            bldg.display_name = props.get("name").and_then(Value::as_str).map(str::to_string);
            buildings.push(bldg);
        }
        let id = data
            .get("project")
            .and_then(|p| p.get("id"))
            .and_then(Value::as_str)
            .map(crate::id::clean_string)
            .unwrap_or_else(|| "GeoJSON_Model".to_string());
        Model::new(&id, buildings, vec![], units, tol, 1.)
    }

    pub fn from_geojson(path: &Path, location: Option<&Location>, origin: Point2, units: Units, tol: f64) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        let data: Value = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse geoJSON from: {}", path.display()))?;
        Self::from_geojson_dict(&data, location, origin, units, tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 0.01;

    fn model() -> Result<Model> {
        let a = Building::from_footprint("Hall", &[Polygon2D::rectangle(Point2::new(0., 0.), 20., 10.)], &[4., 4.], 0., TOL)?;
        let b = Building::from_footprint("Annex", &[Polygon2D::rectangle(Point2::new(30., 0.), 10., 10.)], &[3.], 0., TOL)?;
        Model::new("Campus", vec![a, b], vec![], Units::Meters, TOL, 1.)
    }

    #[test]
    fn test_feature_properties() -> Result<()> {
        let model = model()?;
        let loc = Location::new(42.36, -71.06);
        let dict = model_to_geojson_dict(&model, &loc, Point2::new(0., 0.), None, false, TOL);
        let hall = &dict["features"][0];
        assert_eq!(hall["properties"]["type"], "Building");
        assert_eq!(hall["properties"]["number_of_stories"], 2);
        assert_eq!(hall["properties"]["detailed_model_filename"], "hb_json/Hall.json");
        let ft2 = hall["properties"]["floor_area"].as_f64().unwrap();
        assert!((ft2 - 400. * SQ_FEET_PER_SQ_METER).abs() < 1e-6);
        let ring = hall["geometry"]["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);
        Ok(())
    }

    #[test]
    fn test_network_features() -> Result<()> {
        let model = model()?;
        let net = Network {
            identifier: "Feeder".to_string(),
            kind: NetworkKind::Electrical,
            segments: vec![vec![Point2::new(0., -5.), Point2::new(40., -5.)]],
        };
        let loc = Location::new(42.36, -71.06);
        let dict = model_to_geojson_dict(&model, &loc, Point2::new(0., 0.), Some(&net), false, TOL);
        let features = dict["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[2]["properties"]["type"], "ElectricalConnector");
        assert_eq!(features[2]["geometry"]["type"], "LineString");
        Ok(())
    }

    #[test]
    fn test_write_project() -> Result<()> {
        let model = model()?;
        let dir = tempfile::tempdir()?;
        let loc = Location::new(42.36, -71.06);
        let path = model.to_geojson(&loc, Point2::new(0., 0.), dir.path(), None)?;
        assert!(path.ends_with("Campus.geojson"));
        assert!(dir.path().join("hb_json/Hall.json").exists());
        assert!(dir.path().join("hb_json/Annex.json").exists());
        Ok(())
    }

    #[test]
    fn test_import_keeps_courtyard() -> Result<()> {
        let outer = Polygon2D::rectangle(Point2::new(0., 0.), 30., 30.);
        let hole = Polygon2D::rectangle(Point2::new(10., 10.), 10., 10.);
        let cloister = Building::from_footprint_regions("Cloister", &[Region2D::new(outer, vec![hole])], &[3.], 0., TOL)?;
        let model = Model::new("Abbey", vec![cloister], vec![], Units::Meters, TOL, 1.)?;
        let loc = Location::new(42.36, -71.06);
        let dict = model_to_geojson_dict(&model, &loc, Point2::new(0., 0.), None, false, TOL);
        assert_eq!(dict["features"][0]["geometry"]["coordinates"].as_array().unwrap().len(), 2);

        let imported = Model::from_geojson_dict(&dict, Some(&loc), Point2::new(0., 0.), Units::Meters, TOL)?;
        let room = &imported.buildings[0].unique_stories[0].room_2ds[0];
        assert_eq!(room.floor_region().holes.len(), 1);
        assert!((imported.floor_area() - 800.).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_courtyard_rejects_perimeter_offset() {
        let outer = Polygon2D::rectangle(Point2::new(0., 0.), 30., 30.);
        let hole = Polygon2D::rectangle(Point2::new(10., 10.), 10., 10.);
        let err = Building::from_footprint_regions("Cloister", &[Region2D::new(outer, vec![hole])], &[3.], 4., TOL)
            .unwrap_err();
        assert!(matches!(crate::error::kind(&err), Some(DragonflyError::InvalidGeometry(_))));
    }
}
