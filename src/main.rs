//! Command line interface for validating and translating dragonfly models.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dragonfly::config::Config;
use dragonfly::{HoneybeeOptions, Location, MergeMethod, Model, ObjectPerModel, Point2, Units};
use log::info;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser, Debug)]
#[command(name = "dragonfly", version, about)]
struct Cli {
    /// JSON config file; `DRAGONFLY_*` variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a model and print the report
    Validate {
        model: PathBuf,
        /// Dragonfly, Core, Energy or Radiance
        #[arg(long, default_value = "Dragonfly")]
        extension: String,
    },
    /// Lower a model to honeybee JSON files
    ToHbjson {
        model: PathBuf,
        /// Output folder; defaults to the simulation folder
        #[arg(long)]
        folder: Option<PathBuf>,
        #[arg(long, default_value = "Building")]
        object_per_model: ObjectPerModel,
        #[arg(long)]
        shade_distance: Option<f64>,
        /// Write every story repeat as its own geometry
        #[arg(long)]
        no_multiplier: bool,
        #[arg(long)]
        exclude_plenums: bool,
        #[arg(long)]
        cap: bool,
        #[arg(long)]
        ceiling_adjacency: bool,
        #[arg(long, default_value = "None")]
        merge_method: MergeMethod,
    },
    /// Write a geoJSON project with detailed models
    ToGeojson {
        model: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,
        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
        #[arg(long, default_value_t = 0., allow_hyphen_values = true)]
        origin_x: f64,
        #[arg(long, default_value_t = 0., allow_hyphen_values = true)]
        origin_y: f64,
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Convert a model to other units
    ConvertUnits {
        model: PathBuf,
        units: Units,
        output: PathBuf,
    },
    /// Package a model as POMF
    ToPomf { model: PathBuf, output: PathBuf },
}

fn load_model(path: &Path) -> Result<Model> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("pomf") => Model::from_pomf(path),
        _ => Model::from_dfjson(path),
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Validate { model, extension } => {
            let model = load_model(&model)?;
            let report = model.check_for_extension(&extension, false)?;
            if report.is_empty() {
                println!("Model \"{}\" is valid", model.identifier);
            } else {
                println!("{}", report);
                process::exit(2);
            }
        }
        Commands::ToHbjson {
            model,
            folder,
            object_per_model,
            shade_distance,
            no_multiplier,
            exclude_plenums,
            cap,
            ceiling_adjacency,
            merge_method,
        } => {
            let model = load_model(&model)?;
            let options = HoneybeeOptions {
                object_per_model,
                shade_distance,
                use_multiplier: !no_multiplier,
                exclude_plenums,
                cap,
                solve_ceiling_adjacencies: ceiling_adjacency,
                merge_method,
                tolerance: Some(model.tolerance),
            };
            let folder = folder.unwrap_or_else(|| config.simulation_folder.join(&model.identifier));
            std::fs::create_dir_all(&folder)
                .with_context(|| format!("Failed to create folder: {}", folder.display()))?;
            for hb in model.to_honeybee(&options)? {
                let path = folder.join(format!("{}.hbjson", hb.identifier));
                hb.to_hbjson(&path)?;
                info!("Wrote {}", path.display());
            }
        }
        Commands::ToGeojson {
            model,
            latitude,
            longitude,
            origin_x,
            origin_y,
            folder,
        } => {
            let model = load_model(&model)?;
            let folder = folder.unwrap_or_else(|| config.simulation_folder.join(&model.identifier));
            let location = Location::new(latitude, longitude);
            let path = model.to_geojson(&location, Point2::new(origin_x, origin_y), &folder, None)?;
            println!("{}", path.display());
        }
        Commands::ConvertUnits { model, units, output } => {
            let model = load_model(&model)?.convert_to_units(units);
            model.to_dfjson(&output)?;
        }
        Commands::ToPomf { model, output } => {
            load_model(&model)?.to_pomf(&output)?;
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
