//! Boundary conditions of Room2D wall segments.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BoundaryCondition {
    #[default]
    Outdoors,
    Ground,
    Adiabatic,
    /// Adjacent to another room's wall.
    ///
    /// `boundary_condition_objects` holds the adjacent face id followed by
    /// the adjacent room id.
    Surface {
        boundary_condition_objects: Vec<String>,
    },
}

impl BoundaryCondition {
    pub fn surface(face_id: &str, room_id: &str) -> Self {
        Self::Surface {
            boundary_condition_objects: vec![face_id.to_string(), room_id.to_string()],
        }
    }

    pub fn is_outdoors(&self) -> bool {
        matches!(self, Self::Outdoors)
    }

    pub fn is_surface(&self) -> bool {
        matches!(self, Self::Surface { .. })
    }

    /// Windows are only permitted on Outdoors segments (and on interior
    /// Surface walls between rooms).
    pub fn allows_windows(&self) -> bool {
        matches!(self, Self::Outdoors | Self::Surface { .. })
    }

    /// Adjacent room id of a Surface condition.
    pub fn adjacent_room(&self) -> Option<&str> {
        match self {
            Self::Surface {
                boundary_condition_objects,
            } => boundary_condition_objects.last().map(String::as_str),
            _ => None,
        }
    }

    /// Adjacent face id of a Surface condition.
    pub fn adjacent_face(&self) -> Option<&str> {
        match self {
            Self::Surface {
                boundary_condition_objects,
            } => boundary_condition_objects.first().map(String::as_str),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Outdoors => "Outdoors",
            Self::Ground => "Ground",
            Self::Adiabatic => "Adiabatic",
            Self::Surface { .. } => "Surface",
        }
    }
}

/// Face id of the wall built from segment `index` (0-based) of a room.
pub fn wall_face_id(room_id: &str, index: usize) -> String {
    format!("{}..Face{}", room_id, index + 1)
}

/// Splits a wall face id back into room id and 0-based segment index.
pub fn parse_wall_face_id(face_id: &str) -> Option<(&str, usize)> {
    let (room, face) = face_id.rsplit_once("..Face")?;
    let n: usize = face.parse().ok()?;
    n.checked_sub(1).map(|i| (room, i))
}
