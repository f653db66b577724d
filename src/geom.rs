pub mod face;
pub mod point;
pub mod polygon;
pub mod projection;
pub mod region;
pub mod segment;
pub mod vector;

/// Geometric precision
const EPS: f64 = 1e-13;
