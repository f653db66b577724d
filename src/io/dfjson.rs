//! DFJSON: the JSON serialization of a dragonfly Model.

use crate::model::Model;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Writes a model to a DFJSON file.
///
/// # Arguments
/// * `path` - Path to the output file
/// * `model` - The model to serialize
/// * `abridged` - Leave out the resource libraries
pub fn write_dfjson(path: &Path, model: &Model, abridged: bool) -> Result<()> {
    let data = model.to_dict(abridged)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, &data)
        .with_context(|| format!("Failed to serialize model to: {}", path.display()))?;

    Ok(())
}

/// Reads a model from a DFJSON file, upgrading older versions.
///
/// # Arguments
/// * `path` - Path to the input file
pub fn read_dfjson(path: &Path) -> Result<Model> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let data: Value = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse JSON from: {}", path.display()))?;

    Model::from_dict(data).with_context(|| format!("Failed to load model from: {}", path.display()))
}

/// Serializes a model to a DFJSON string.
pub fn to_dfjson_string(model: &Model, abridged: bool) -> Result<String> {
    serde_json::to_string_pretty(&model.to_dict(abridged)?).context("Failed to serialize model to string")
}

/// Deserializes a model from a DFJSON string.
pub fn from_dfjson_string(json: &str) -> Result<Model> {
    let data: Value = serde_json::from_str(json).context("Failed to parse model string")?;
    Model::from_dict(data)
}

impl Model {
    /// Writes the full (non-abridged) model to a DFJSON file.
    pub fn to_dfjson(&self, path: &Path) -> Result<()> {
        write_dfjson(path, self, false)
    }

    pub fn from_dfjson(path: &Path) -> Result<Self> {
        read_dfjson(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::Building;
    use crate::geom::point::Point2;
    use crate::geom::polygon::Polygon2D;
    use crate::units::Units;

    fn model() -> Result<Model> {
        let bldg = Building::from_footprint(
            "Library",
            &[Polygon2D::rectangle(Point2::new(0., 0.), 12., 8.)],
            &[3., 3.],
            0.,
            0.01,
        )?;
        Model::new("Town", vec![bldg], vec![], Units::Meters, 0.01, 1.)
    }

    #[test]
    fn test_write_read_file() -> Result<()> {
        let model = model()?;
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("town.dfjson");

        model.to_dfjson(&path)?;
        assert!(path.exists());
        let loaded = Model::from_dfjson(&path)?;
        assert_eq!(loaded, model);
        Ok(())
    }

    #[test]
    fn test_string_roundtrip() -> Result<()> {
        let model = model()?;
        let json = to_dfjson_string(&model, true)?;
        assert!(json.contains("\"type\": \"Room2D\""));
        let loaded = from_dfjson_string(&json)?;
        assert_eq!(loaded.buildings[0].unique_stories.len(), 2);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let result = read_dfjson(Path::new("/nonexistent/town.dfjson"));
        assert!(result.is_err());
    }
}
