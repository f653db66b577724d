//! URBANopt projects: the geoJSON project plus a scenario CSV and, when
//! requested, a district energy system.

use crate::des::{DesOptions, emit_des};
use crate::geojson::{Network, emit_geojson};
use crate::geom::point::Point2;
use crate::honeybee::HoneybeeOptions;
use crate::io::project::ProjectFolder;
use crate::location::Location;
use crate::model::Model;
use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};

pub const SCENARIO_HEADER: &str = "Feature Id,Feature Name,Mapper Class";
pub const DEFAULT_MAPPER: &str = "URBANopt::Scenario::BaselineMapper";

#[derive(Debug, Clone)]
pub struct UrbanoptOptions {
    pub location: Location,
    /// Model point placed at the location's longitude and latitude
    pub origin: Point2,
    pub network: Option<Network>,
    pub honeybee: HoneybeeOptions,
    pub scenario: String,
    pub mapper_class: String,
    pub des: Option<DesOptions>,
}

impl UrbanoptOptions {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            origin: Point2::new(0., 0.),
            network: None,
            honeybee: HoneybeeOptions::new(),
            scenario: "baseline".to_string(),
            mapper_class: DEFAULT_MAPPER.to_string(),
            des: None,
        }
    }
}

/// Files written for an URBANopt project.
#[derive(Debug, Clone, PartialEq)]
pub struct UrbanoptProject {
    pub folder: PathBuf,
    pub geojson: PathBuf,
    pub scenario: PathBuf,
    pub system_parameter: Option<PathBuf>,
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Scenario CSV mapping every Building feature to a mapper class.
pub fn scenario_csv(model: &Model, mapper_class: &str) -> String {
    let mut text = format!("{}\n", SCENARIO_HEADER);
    for bldg in &model.buildings {
        let name = bldg.display_name.as_deref().unwrap_or(&bldg.identifier);
        text.push_str(&format!(
            "{},{},{}\n",
            csv_field(&bldg.identifier),
            csv_field(name),
            csv_field(mapper_class)
        ));
    }
    text
}

impl Model {
    /// Writes an URBANopt project into `folder`.
    ///
    /// The folder stays locked until every file, including the DES tree,
    /// has been written.
    pub fn to_urbanopt(&self, folder: &Path, options: &UrbanoptOptions) -> Result<UrbanoptProject> {
        let project = ProjectFolder::acquire(folder)?;
        let geojson = emit_geojson(
            &project,
            self,
            &options.location,
            options.origin,
            options.network.as_ref(),
            &options.honeybee,
        )?;
        let scenario = project.write(
            format!("{}_scenario.csv", options.scenario),
            scenario_csv(self, &options.mapper_class).as_bytes(),
        )?;
        let system_parameter = match &options.des {
            Some(des) => Some(emit_des(&project, self, Some(&geojson), des)?),
            None => None,
        };
        info!(
            "Wrote URBANopt project with {} buildings to {}",
            self.buildings.len(),
            project.root().display()
        );
        Ok(UrbanoptProject {
            folder: project.root().to_path_buf(),
            geojson,
            scenario,
            system_parameter,
        })
    }
}
