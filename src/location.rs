//! Geographic location and the plan-to-longitude/latitude transform.

use crate::geom::point::Point2;
use crate::units::Units;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default = "default_city")]
    pub city: String,
    /// Degrees north
    pub latitude: f64,
    /// Degrees east
    pub longitude: f64,
    /// Hours from UTC
    #[serde(default)]
    pub time_zone: f64,
    /// Meters above sea level
    #[serde(default)]
    pub elevation: f64,
}

fn default_city() -> String {
    "-".to_string()
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            city: default_city(),
            latitude,
            longitude,
            time_zone: 0.,
            elevation: 0.,
        }
    }
}

/// Meters spanned by one degree of latitude and of longitude at a latitude.
pub fn meters_per_degree(latitude: f64) -> (f64, f64) {
    let phi = latitude.to_radians();
    let lat = 111132.92 - 559.82 * (2. * phi).cos() + 1.175 * (4. * phi).cos() - 0.0023 * (6. * phi).cos();
    let lon = 111412.84 * phi.cos() - 93.5 * (3. * phi).cos() + 0.118 * (5. * phi).cos();
    (lat, lon)
}

/// Converts between model plan coordinates and longitude/latitude.
///
/// `origin` is the model point that sits at the location's longitude and
/// latitude. The meters-per-degree factors are taken at the location's
/// latitude, so both directions are exact inverses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    origin: Point2,
    longitude: f64,
    latitude: f64,
    meters_per_unit: f64,
    meters_per_lat: f64,
    meters_per_lon: f64,
}

impl GeoTransform {
    pub fn new(location: &Location, origin: Point2, units: Units) -> Self {
        let (meters_per_lat, meters_per_lon) = meters_per_degree(location.latitude);
        Self {
            origin,
            longitude: location.longitude,
            latitude: location.latitude,
            meters_per_unit: units.to_meters(),
            meters_per_lat,
            meters_per_lon,
        }
    }

    /// Model point to `(longitude, latitude)`.
    pub fn to_lon_lat(&self, pt: Point2) -> (f64, f64) {
        let dx = (pt.x - self.origin.x) * self.meters_per_unit;
        let dy = (pt.y - self.origin.y) * self.meters_per_unit;
        (
            self.longitude + dx / self.meters_per_lon,
            self.latitude + dy / self.meters_per_lat,
        )
    }

    /// `(longitude, latitude)` back to a model point.
    pub fn to_point(&self, lon: f64, lat: f64) -> Point2 {
        let dx = (lon - self.longitude) * self.meters_per_lon;
        let dy = (lat - self.latitude) * self.meters_per_lat;
        Point2::new(
            self.origin.x + dx / self.meters_per_unit,
            self.origin.y + dy / self.meters_per_unit,
        )
    }
}
