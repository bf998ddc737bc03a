//! Geofence Library
//!
//! Decides whether a coordinate lies inside a country's true border rather
//! than only its bounding box. Every check runs in two stages:
//!
//! 1. O(1) bounding-box reject for points far outside the region
//! 2. O(n) ray-casting point-in-polygon over the border ring
//!
//! Nothing here allocates per check and nothing here fails at check time:
//! `Region::is_within_region` always answers with a boolean.

use thiserror::Error;

pub mod pakistan;
pub mod point;
pub mod polygon;
pub mod region;
pub mod validation;

pub use point::{haversine_m, GeoPoint, EARTH_RADIUS_M};
pub use polygon::{BorderPolygon, BoundingBox};
pub use region::Region;
pub use validation::{nearby_major_cities, validate_location, LocationValidation, NearbyCity};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("Invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
    #[error("Border ring needs at least 3 points, got {0}")]
    DegenerateRing(usize),
    #[error("GeoJSON error: {0}")]
    GeoJson(String),
}

pub type Result<T> = std::result::Result<T, GeoError>;
