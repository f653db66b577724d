//! District energy system (DES) projects.
//!
//! Every Building must carry `energy.des_loads` with `cooling`, `heating`
//! and `hot_water` series in watts. The loads are written as Modelica
//! tables and referenced from a system-parameter JSON, from which an
//! external translator (or the built-in skeleton) builds the Modelica tree.

use crate::building::Building;
use crate::error::DragonflyError;
use crate::external::{CancelFlag, ExternalCommand};
use crate::io::project::ProjectFolder;
use crate::model::Model;
use crate::properties::ENERGY;
use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const SYSTEM_PARAMETER_FILE: &str = "system_parameter.json";
pub const MODELICA_FOLDER: &str = "modelica";
const LOADS_KEY: &str = "des_loads";

/// Topology of the district loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DesLoop {
    /// Central heating and cooling plants with hot and chilled water loops
    #[default]
    FourthGeneration,
    /// Ambient loop with a ground heat exchanger
    FifthGeneration,
}

impl fmt::Display for DesLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesLoop::FourthGeneration => write!(f, "fourth_generation"),
            DesLoop::FifthGeneration => write!(f, "fifth_generation"),
        }
    }
}

impl FromStr for DesLoop {
    type Err = DragonflyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "fourth_generation" | "4g" => Ok(DesLoop::FourthGeneration),
            "fifth_generation" | "5g" => Ok(DesLoop::FifthGeneration),
            _ => Err(DragonflyError::InvalidInput(format!("Unknown DES loop \"{}\"", s))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DesOptions {
    pub loop_kind: DesLoop,
    /// Weather file; a `.ddy` with the same stem is expected beside it
    pub epw: PathBuf,
    /// Translator invoked as `<program> <args..> <system_parameter> <geojson> <modelica folder>`
    pub translator: Option<ExternalCommand>,
    pub cancel: CancelFlag,
}

impl DesOptions {
    pub fn new(epw: &Path) -> Self {
        Self {
            loop_kind: DesLoop::default(),
            epw: epw.to_path_buf(),
            translator: None,
            cancel: CancelFlag::new(),
        }
    }
}

/// Hourly (or sub-hourly) thermal loads of one Building, in watts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesLoads {
    pub cooling: Vec<f64>,
    pub heating: Vec<f64>,
    pub hot_water: Vec<f64>,
    /// Values per hour
    #[serde(default = "default_timestep")]
    pub timestep: u32,
}

fn default_timestep() -> u32 {
    1
}

fn peak(values: &[f64]) -> f64 {
    values.iter().fold(0., |acc: f64, v| acc.max(v.abs()))
}

impl DesLoads {
    /// Reads the loads assigned to a Building.
    pub fn from_building(bldg: &Building) -> Result<Self> {
        let value = bldg.properties.field(ENERGY, LOADS_KEY).ok_or_else(|| {
            DragonflyError::InvalidInput(format!("Building \"{}\" has no DES loads assigned", bldg.identifier))
        })?;
        let loads: DesLoads = serde_json::from_value(value.clone()).map_err(|e| {
            DragonflyError::InvalidInput(format!("Building \"{}\" has invalid DES loads: {}", bldg.identifier, e))
        })?;
        let n = loads.cooling.len();
        if n == 0 || loads.heating.len() != n || loads.hot_water.len() != n || loads.timestep == 0 {
            return Err(DragonflyError::InvalidInput(format!(
                "DES loads of \"{}\" must be non-empty series of equal length",
                bldg.identifier
            ))
            .into());
        }
        Ok(loads)
    }

    /// Modelica combi-time-table with columns time, cooling, heating, hot water.
    ///
    /// Cooling is written as a negative heat flow.
    pub fn to_mos(&self) -> String {
        let step = 3600. / self.timestep as f64;
        let mut text = String::from("#1\n");
        text.push_str(&format!("#Peak space cooling load = {} Watts\n", peak(&self.cooling)));
        text.push_str(&format!("#Peak space heating load = {} Watts\n", peak(&self.heating)));
        text.push_str(&format!("#Peak water heating load = {} Watts\n", peak(&self.hot_water)));
        text.push_str(&format!("double tab1({},4)\n", self.cooling.len()));
        for i in 0..self.cooling.len() {
            text.push_str(&format!(
                "{},{},{},{}\n",
                i as f64 * step,
                -self.cooling[i].abs(),
                self.heating[i],
                self.hot_water[i]
            ));
        }
        text
    }
}

impl Building {
    pub fn set_des_loads(&mut self, loads: &DesLoads) -> Result<()> {
        let value = serde_json::to_value(loads)?;
        self.properties.set_field(ENERGY, LOADS_KEY, value);
        Ok(())
    }
}

fn loads_file(bldg: &Building) -> String {
    format!("{}/Loads/Resources/Data/{}/modelica.mos", MODELICA_FOLDER, bldg.identifier)
}

/// The system-parameter document for a model whose loads are already read.
pub fn system_parameter(model: &Model, loads: &[DesLoads], options: &DesOptions) -> Value {
    let buildings: Vec<Value> = model
        .buildings
        .iter()
        .map(|b| {
            json!({
                "geojson_id": b.identifier,
                "load_model": "time_series",
                "load_model_parameters": {
                    "time_series": {
                        "filepath": loads_file(b),
                        "delta_temp_air_cooling": 10,
                        "delta_temp_air_heating": 18,
                        "has_liquid_cooling": true,
                        "has_liquid_heating": true,
                        "temp_chw_supply": 7,
                        "temp_chw_return": 12,
                        "temp_hw_supply": 50,
                        "temp_hw_return": 35,
                        "temp_setpoint_cooling": 24,
                        "temp_setpoint_heating": 20,
                    }
                },
                "ets_model": "None",
            })
        })
        .collect();
    let cooling: f64 = loads.iter().map(|l| peak(&l.cooling)).sum();
    let heating: f64 = loads.iter().map(|l| peak(&l.heating) + peak(&l.hot_water)).sum();
    let district = match options.loop_kind {
        DesLoop::FourthGeneration => json!({
            "fourth_generation": {
                "central_cooling_plant_parameters": {"heat_flow_nominal": cooling},
                "central_heating_plant_parameters": {"heat_flow_nominal": heating},
            }
        }),
        DesLoop::FifthGeneration => json!({
            "fifth_generation": {
                "ghe_parameters": {"peak_cooling_load": cooling, "peak_heating_load": heating},
                "central_pump_parameters": {"pump_design_head": 60000},
            }
        }),
    };
    json!({
        "buildings": buildings,
        "district_system": district,
        "weather": options.epw.to_string_lossy(),
    })
}

/// Writes loads, system parameters and the Modelica tree into a held folder.
///
/// # Returns
/// Path of the system-parameter JSON
pub(crate) fn emit_des(
    project: &ProjectFolder,
    model: &Model,
    geojson: Option<&Path>,
    options: &DesOptions,
) -> Result<PathBuf> {
    let loads = model
        .buildings
        .iter()
        .map(DesLoads::from_building)
        .collect::<Result<Vec<_>>>()?;
    if !options.epw.with_extension("ddy").exists() {
        warn!(
            "No .ddy file found next to {}; design days must be supplied separately",
            options.epw.display()
        );
    }
    for (bldg, load) in model.buildings.iter().zip(&loads) {
        project.write(loads_file(bldg), load.to_mos().as_bytes())?;
    }
    let sys_param = project.write_json(SYSTEM_PARAMETER_FILE, &system_parameter(model, &loads, options))?;

    match (&options.translator, geojson) {
        (Some(cmd), Some(geojson)) => {
            cmd.clone()
                .arg(&sys_param)
                .arg(geojson)
                .arg(project.path(MODELICA_FOLDER))
                .current_dir(project.root())
                .run(&options.cancel)?;
        }
        (Some(_), None) => {
            warn!("The DES translator needs a geoJSON file; writing the Modelica skeleton instead");
            write_modelica_skeleton(project, model)?;
        }
        (None, _) => write_modelica_skeleton(project, model)?,
    }
    info!("Wrote DES project for {} buildings", model.buildings.len());
    Ok(sys_param)
}

fn package_mo(name: &str, within: &str) -> String {
    format!("within {};\npackage {}\n  extends Modelica.Icons.Package;\nend {};\n", within, name, name)
}

fn write_modelica_skeleton(project: &ProjectFolder, model: &Model) -> Result<()> {
    let root = crate::id::clean_string(&model.identifier);
    project.write(format!("{}/package.mo", MODELICA_FOLDER), package_mo(&root, "").as_bytes())?;
    project.write(format!("{}/package.order", MODELICA_FOLDER), b"Loads\nDistricts\n")?;
    project.write(
        format!("{}/Loads/package.mo", MODELICA_FOLDER),
        package_mo("Loads", &root).as_bytes(),
    )?;
    let order: String = model
        .buildings
        .iter()
        .map(|b| format!("B_{}\n", crate::id::clean_string(&b.identifier)))
        .collect();
    project.write(format!("{}/Loads/package.order", MODELICA_FOLDER), order.as_bytes())?;
    project.write(
        format!("{}/Districts/package.mo", MODELICA_FOLDER),
        package_mo("Districts", &root).as_bytes(),
    )?;
    Ok(())
}

impl Model {
    /// Writes a DES project into `folder`; see [`emit_des`].
    pub fn to_urbanopt_des(&self, folder: &Path, geojson: Option<&Path>, options: &DesOptions) -> Result<PathBuf> {
        let project = ProjectFolder::acquire(folder)?;
        emit_des(&project, self, geojson, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::point::Point2;
    use crate::geom::polygon::Polygon2D;
    use crate::units::Units;

    fn loads(n: usize) -> DesLoads {
        DesLoads {
            cooling: vec![1000.; n],
            heating: (0..n).map(|i| i as f64 * 100.).collect(),
            hot_water: vec![50.; n],
            timestep: 1,
        }
    }

    fn model(with_loads: bool) -> Result<Model> {
        let mut bldg = Building::from_footprint("Clinic", &[Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.)], &[3.], 0., 0.01)?;
        if with_loads {
            bldg.set_des_loads(&loads(24))?;
        }
        Model::new("Ward", vec![bldg], vec![], Units::Meters, 0.01, 1.)
    }

    #[test]
    fn test_mos_table() {
        let mos = loads(3).to_mos();
        let lines: Vec<&str> = mos.lines().collect();
        assert_eq!(lines[0], "#1");
        assert_eq!(lines[4], "double tab1(3,4)");
        assert_eq!(lines[5], "0,-1000,0,50");
        assert_eq!(lines[7], "7200,-1000,200,50");
    }

    #[test]
    fn test_missing_loads() -> Result<()> {
        let model = model(false)?;
        let dir = tempfile::tempdir()?;
        let options = DesOptions::new(&dir.path().join("city.epw"));
        let err = model.to_urbanopt_des(dir.path(), None, &options).unwrap_err();
        assert!(matches!(crate::error::kind(&err), Some(DragonflyError::InvalidInput(_))));
        Ok(())
    }

    #[test]
    fn test_skeleton_project() -> Result<()> {
        let model = model(true)?;
        let dir = tempfile::tempdir()?;
        let options = DesOptions::new(&dir.path().join("city.epw"));
        let path = model.to_urbanopt_des(dir.path(), None, &options)?;
        let sys: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(sys["buildings"][0]["geojson_id"], "Clinic");
        assert_eq!(sys["district_system"]["fourth_generation"]["central_cooling_plant_parameters"]["heat_flow_nominal"], 1000.);
        assert!(dir.path().join("modelica/Loads/Resources/Data/Clinic/modelica.mos").exists());
        assert!(dir.path().join("modelica/package.mo").exists());
        Ok(())
    }

    #[test]
    fn test_loop_parse() -> Result<()> {
        assert_eq!("5G".parse::<DesLoop>()?, DesLoop::FifthGeneration);
        assert_eq!("fourth generation".parse::<DesLoop>()?, DesLoop::FourthGeneration);
        assert!("steam".parse::<DesLoop>().is_err());
        Ok(())
    }
}
