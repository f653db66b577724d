//! Environment configuration.
//!
//! Values start from defaults, can be loaded from a JSON file and are then
//! overridden by `DRAGONFLY_*` environment variables.

use crate::units::Units;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const ENV_SIMULATION_FOLDER: &str = "DRAGONFLY_SIMULATION_FOLDER";
pub const ENV_UNITS: &str = "DRAGONFLY_UNITS";
pub const ENV_TOLERANCE: &str = "DRAGONFLY_TOLERANCE";
pub const ENV_ANGLE_TOLERANCE: &str = "DRAGONFLY_ANGLE_TOLERANCE";

/// Settings shared by the CLI and the translators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder where project folders are written
    pub simulation_folder: PathBuf,
    pub units: Units,
    /// Length tolerance in model units
    pub tolerance: f64,
    /// Angle tolerance in degrees
    pub angle_tolerance: f64,
}

impl Config {
    pub fn new() -> Self {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            simulation_folder: home.join("ladybug_tools").join("simulation"),
            units: Units::Meters,
            tolerance: 0.01,
            angle_tolerance: 1.0,
        }
    }

    /// Reads a JSON config file (missing keys keep their defaults).
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Applies `DRAGONFLY_*` environment variable overrides.
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(folder) = get(ENV_SIMULATION_FOLDER) {
            self.simulation_folder = PathBuf::from(folder);
        }
        if let Some(units) = get(ENV_UNITS) {
            self.units = units.parse()?;
        }
        if let Some(tol) = get(ENV_TOLERANCE) {
            self.tolerance = tol
                .parse()
                .with_context(|| format!("{} must be a number, got \"{}\"", ENV_TOLERANCE, tol))?;
        }
        if let Some(tol) = get(ENV_ANGLE_TOLERANCE) {
            self.angle_tolerance = tol.parse().with_context(|| {
                format!("{} must be a number, got \"{}\"", ENV_ANGLE_TOLERANCE, tol)
            })?;
        }
        Ok(self)
    }

    /// Defaults, then the optional file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::new(),
        };
        base.with_env()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_simulation_folder() {
        let config = Config::new();
        assert!(config.simulation_folder.ends_with("ladybug_tools/simulation"));
        assert_eq!(config.units, Units::Meters);
    }

    #[test]
    fn test_overrides() -> Result<()> {
        let config = Config::new().with_vars(|key| match key {
            ENV_UNITS => Some("Feet".to_string()),
            ENV_TOLERANCE => Some("0.03".to_string()),
            _ => None,
        })?;
        assert_eq!(config.units, Units::Feet);
        assert_eq!(config.tolerance, 0.03);
        assert_eq!(config.angle_tolerance, 1.0);

        let bad = Config::new().with_vars(|key| (key == ENV_TOLERANCE).then(|| "abc".to_string()));
        assert!(bad.is_err());
        Ok(())
    }

    #[test]
    fn test_from_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        let mut f = File::create(&path)?;
        write!(f, r#"{{"units": "Millimeters", "tolerance": 1.0}}"#)?;
        let config = Config::from_file(&path)?;
        assert_eq!(config.units, Units::Millimeters);
        assert_eq!(config.tolerance, 1.0);
        assert_eq!(config.angle_tolerance, 1.0);
        Ok(())
    }
}
