//! Model length units.

use crate::error::DragonflyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Units {
    #[default]
    Meters,
    Millimeters,
    Centimeters,
    Feet,
    Inches,
}

impl Units {
    /// Length of one unit in meters.
    pub fn to_meters(&self) -> f64 {
        match self {
            Units::Meters => 1.,
            Units::Millimeters => 0.001,
            Units::Centimeters => 0.01,
            Units::Feet => 0.3048,
            Units::Inches => 0.0254,
        }
    }

    /// Factor that converts a length in `self` to a length in `target`.
    pub fn conversion_factor(&self, target: Units) -> f64 {
        self.to_meters() / target.to_meters()
    }

    /// Default length tolerance for models in these units.
    pub fn default_tolerance(&self) -> f64 {
        match self {
            Units::Meters => 0.01,
            Units::Millimeters => 1.,
            Units::Centimeters => 0.1,
            Units::Feet => 0.03,
            Units::Inches => 0.4,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Units::Meters => "Meters",
            Units::Millimeters => "Millimeters",
            Units::Centimeters => "Centimeters",
            Units::Feet => "Feet",
            Units::Inches => "Inches",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Units {
    type Err = DragonflyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "meters" | "meter" | "m" => Ok(Units::Meters),
            "millimeters" | "millimeter" | "mm" => Ok(Units::Millimeters),
            "centimeters" | "centimeter" | "cm" => Ok(Units::Centimeters),
            "feet" | "foot" | "ft" => Ok(Units::Feet),
            "inches" | "inch" | "in" => Ok(Units::Inches),
            other => Err(DragonflyError::InvalidInput(format!(
                "Unrecognized units \"{}\"",
                other
            ))),
        }
    }
}
