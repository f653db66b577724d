//! Schema versions and upgrades of serialized models.

use crate::error::DragonflyError;
use anyhow::Result;
use log::{info, warn};
use serde_json::{Value, json};
use std::cmp::Ordering;

/// Schema version written into every serialized model.
pub const SCHEMA_VERSION: &str = "1.12.0";

/// Parses an `x.y.z` version string.
pub fn parse_version(version: &str) -> Result<(u32, u32, u32)> {
    let bad = || DragonflyError::SchemaMismatch(format!("\"{}\" is not a valid x.y.z version", version));
    let mut parts = version.trim().split('.').map(|p| p.parse::<u32>());
    let mut next = || -> Result<u32> { Ok(parts.next().unwrap_or(Ok(0)).map_err(|_| bad())?) };
    let out = (next()?, next()?, next()?);
    Ok(out)
}

pub fn compare_versions(a: &str, b: &str) -> Result<Ordering> {
    Ok(parse_version(a)?.cmp(&parse_version(b)?))
}

type Migration = fn(&mut Value);

/// Upgrades in the order they were introduced, keyed by the first version
/// that no longer needs them.
const MIGRATIONS: &[(&str, Migration)] = &[("1.4.0", rename_stories), ("1.7.0", integer_multipliers)];

/// Buildings used to list their stories under `stories`.
fn rename_stories(model: &mut Value) {
    for bldg in buildings_mut(model) {
        if let Some(obj) = bldg.as_object_mut() {
            if !obj.contains_key("unique_stories") {
                if let Some(stories) = obj.remove("stories") {
                    obj.insert("unique_stories".to_string(), stories);
                }
            }
        }
    }
}

/// Story multipliers used to be written as floats.
fn integer_multipliers(model: &mut Value) {
    for bldg in buildings_mut(model) {
        let stories = bldg.get_mut("unique_stories").and_then(Value::as_array_mut);
        for story in stories.into_iter().flatten() {
            let value = story.get("multiplier").and_then(Value::as_f64);
            if let (Some(m), Some(obj)) = (value, story.as_object_mut()) {
                obj.insert("multiplier".to_string(), json!(m.round().max(1.) as u64));
            }
        }
    }
}

fn buildings_mut(model: &mut Value) -> impl Iterator<Item = &mut Value> {
    model
        .get_mut("buildings")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
}

/// Brings a serialized model to the installed schema.
///
/// Older models are upgraded in place; newer ones only produce a warning.
pub fn upgrade(model: &mut Value) -> Result<()> {
    let found = model
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or("0.0.0")
        .to_string();
    match compare_versions(&found, SCHEMA_VERSION)? {
        Ordering::Greater => {
            warn!(
                "Model version {} is newer than the installed schema {}; unknown fields are ignored",
                found, SCHEMA_VERSION
            );
        }
        Ordering::Less => {
            for (introduced, migrate) in MIGRATIONS {
                if compare_versions(&found, introduced)? == Ordering::Less {
                    migrate(model);
                }
            }
            info!("Upgraded model from version {} to {}", found, SCHEMA_VERSION);
        }
        Ordering::Equal => {}
    }
    if let Some(obj) = model.as_object_mut() {
        obj.insert("version".to_string(), json!(SCHEMA_VERSION));
    }
    Ok(())
}
