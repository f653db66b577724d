//! POMF: a zip archive whose first entry, `model.json`, is a DFJSON model.

use crate::error::DragonflyError;
use crate::model::Model;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

pub const MODEL_ENTRY: &str = "model.json";

/// Writes a model to a POMF archive.
///
/// # Arguments
/// * `path` - Path to the output file
/// * `model` - The model to package
pub fn write_pomf(path: &Path, model: &Model) -> Result<()> {
    let json = serde_json::to_vec_pretty(&model.to_dict(false)?).context("Failed to serialize model")?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options: FileOptions<'_, ()> = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(MODEL_ENTRY, options)
        .with_context(|| format!("Failed to add {} to: {}", MODEL_ENTRY, path.display()))?;
    zip.write_all(&json)
        .with_context(|| format!("Failed to write {} to: {}", MODEL_ENTRY, path.display()))?;
    zip.finish()
        .with_context(|| format!("Failed to finish archive: {}", path.display()))?;
    Ok(())
}

/// Reads the model stored in the first entry of a POMF archive.
pub fn read_pomf(path: &Path) -> Result<Model> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Not a zip archive: {}", path.display()))?;
    if archive.is_empty() {
        return Err(DragonflyError::InvalidInput(format!("Archive {} is empty", path.display())).into());
    }
    let mut entry = archive
        .by_index(0)
        .with_context(|| format!("Failed to read first entry of: {}", path.display()))?;
    if entry.name() != MODEL_ENTRY {
        return Err(DragonflyError::InvalidInput(format!(
            "First entry of {} is \"{}\", expected \"{}\"",
            path.display(),
            entry.name(),
            MODEL_ENTRY
        ))
        .into());
    }
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .with_context(|| format!("Failed to read {} from: {}", MODEL_ENTRY, path.display()))?;
    let data: Value = serde_json::from_str(&text).context("Failed to parse model.json")?;
    Model::from_dict(data)
}

impl Model {
    pub fn to_pomf(&self, path: &Path) -> Result<()> {
        write_pomf(path, self)
    }

    pub fn from_pomf(path: &Path) -> Result<Self> {
        read_pomf(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::Building;
    use crate::geom::point::Point2;
    use crate::geom::polygon::Polygon2D;
    use crate::units::Units;

    #[test]
    fn test_pomf_roundtrip() -> Result<()> {
        let bldg = Building::from_footprint(
            "Depot",
            &[Polygon2D::rectangle(Point2::new(0., 0.), 40., 25.)],
            &[6.],
            0.,
            0.01,
        )?;
        let model = Model::new("Yard", vec![bldg], vec![], Units::Meters, 0.01, 1.)?;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("yard.pomf");
        model.to_pomf(&path)?;

        let mut archive = ZipArchive::new(File::open(&path)?)?;
        assert_eq!(archive.by_index(0)?.name(), MODEL_ENTRY);
        assert_eq!(Model::from_pomf(&path)?, model);
        Ok(())
    }

    #[test]
    fn test_wrong_first_entry() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bad.pomf");
        let mut zip = ZipWriter::new(File::create(&path)?);
        zip.start_file("readme.txt", FileOptions::<'_, ()>::default())?;
        zip.write_all(b"hello")?;
        zip.finish()?;
        let err = read_pomf(&path).unwrap_err();
        assert!(matches!(crate::error::kind(&err), Some(DragonflyError::InvalidInput(_))));
        Ok(())
    }
}
