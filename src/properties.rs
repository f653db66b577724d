//! Extension property bundles.
//!
//! Each entity carries a map from extension name ("energy", "radiance",
//! "uwg", ...) to an opaque JSON value. The bundles are copied and routed
//! verbatim; only the energy helpers below look inside.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub const ENERGY: &str = "energy";
pub const RADIANCE: &str = "radiance";
pub const UWG: &str = "uwg";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionProperties(Map<String, Value>);

impl ExtensionProperties {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, extension: &str) -> Option<&Value> {
        self.0.get(extension)
    }

    pub fn set(&mut self, extension: &str, value: Value) {
        self.0.insert(extension.to_string(), value);
    }

    pub fn remove(&mut self, extension: &str) -> Option<Value> {
        self.0.remove(extension)
    }

    pub fn has(&self, extension: &str) -> bool {
        self.0.contains_key(extension)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mutable object for one extension, created on first use.
    fn object_mut(&mut self, extension: &str) -> &mut Map<String, Value> {
        let entry = self
            .0
            .entry(extension.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(map) => map,
            _ => unreachable!("entry was just replaced by an object"),
        }
    }

    /// Reads a string field of an extension object.
    pub fn str_field(&self, extension: &str, key: &str) -> Option<&str> {
        self.get(extension)?.get(key)?.as_str()
    }

    pub fn field(&self, extension: &str, key: &str) -> Option<&Value> {
        self.get(extension)?.get(key)
    }

    pub fn set_field(&mut self, extension: &str, key: &str, value: Value) {
        self.object_mut(extension).insert(key.to_string(), value);
    }

    pub fn set_program_type(&mut self, identifier: &str) {
        self.set_field(ENERGY, "program_type", json!(identifier));
    }

    pub fn set_construction_set(&mut self, identifier: &str) {
        self.set_field(ENERGY, "construction_set", json!(identifier));
    }

    pub fn set_hvac(&mut self, identifier: &str) {
        self.set_field(ENERGY, "hvac", json!(identifier));
    }

    pub fn set_shw(&mut self, identifier: &str) {
        self.set_field(ENERGY, "shw", json!(identifier));
    }

    /// Appends a process load definition (kept as given).
    pub fn add_process_load(&mut self, load: Value) {
        let obj = self.object_mut(ENERGY);
        let loads = obj
            .entry("process_loads".to_string())
            .or_insert_with(|| Value::Array(vec![]));
        if let Value::Array(list) = loads {
            list.push(load);
        } else {
            *loads = Value::Array(vec![load]);
        }
    }

    pub fn set_window_vent_control(&mut self, control: Value) {
        self.set_field(ENERGY, "window_vent_control", control);
    }

    /// Sets the urban weather generator flags of a room.
    pub fn set_uwg_flags(&mut self, is_residential: bool, fract_heat_to_canyon: f64) {
        self.set_field(UWG, "is_residential", json!(is_residential));
        self.set_field(UWG, "fract_heat_to_canyon", json!(fract_heat_to_canyon));
    }

    /// Scales every numeric field with the given name inside an extension object.
    pub fn scale_numeric(&mut self, extension: &str, key: &str, factor: f64) {
        if let Some(Value::Object(map)) = self.0.get_mut(extension) {
            if let Some(v) = map.get_mut(key).and_then(|v| v.as_f64()) {
                map.insert(key.to_string(), json!(v * factor));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_helpers() {
        let mut props = ExtensionProperties::new();
        props.set_program_type("Generic Office Program");
        props.set_hvac("VAV_1");
        props.add_process_load(json!({"identifier": "Oven", "watts": 2000}));
        props.add_process_load(json!({"identifier": "Fridge", "watts": 300}));
        assert_eq!(props.str_field(ENERGY, "program_type"), Some("Generic Office Program"));
        assert_eq!(props.str_field(ENERGY, "hvac"), Some("VAV_1"));
        assert_eq!(props.field(ENERGY, "process_loads").and_then(|v| v.as_array()).map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_opaque_roundtrip() -> anyhow::Result<()> {
        let raw = json!({"radiance": {"modifier_set": "Generic"}, "zzz": [1, 2, 3]});
        let props: ExtensionProperties = serde_json::from_value(raw.clone())?;
        assert!(props.has(RADIANCE));
        assert_eq!(serde_json::to_value(&props)?, raw);
        Ok(())
    }
}
