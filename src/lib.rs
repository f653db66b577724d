pub mod boundary;
pub mod building;
pub mod check;
pub mod config;
pub mod context;
pub mod des;
pub mod error;
pub mod external;
pub mod geojson;
pub mod geom;
pub mod honeybee;
mod id;
pub mod io;
pub mod location;
pub mod model;
pub mod name;
pub mod parameters;
pub mod properties;
pub mod room2d;
pub mod story;
pub mod units;
pub mod urbanopt;
pub mod version;

// Prelude
pub use boundary::BoundaryCondition;
pub use building::Building;
pub use context::ContextShade;
pub use error::DragonflyError;
pub use geom::face::Face3D;
pub use geom::point::{Point, Point2};
pub use geom::polygon::Polygon2D;
pub use geom::vector::Vector;
pub use honeybee::{HoneybeeOptions, MergeMethod, ObjectPerModel};
pub use location::Location;
pub use model::Model;
pub use room2d::Room2D;
pub use story::Story;
pub use units::Units;
// Identifier helpers
pub use id::{clean_and_id_string, clean_string, random_id};
