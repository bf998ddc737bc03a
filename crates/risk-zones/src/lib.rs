//! Risk Zones Library
//!
//! Named circular risk zones (center, radius, risk level) and the pure
//! proximity evaluator that turns a location sample plus the previous watch
//! state into a new state and the transition events to alert on.
//!
//! Registry order is meaningful: the evaluator picks the first matching zone,
//! not the closest one.

use geofence::GeoPoint;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod proximity;
pub mod registry;

pub use proximity::{
    classify, evaluate, Evaluation, Proximity, ProximityConfig, TransitionEvent, WatchSessionState,
    NEAR_BUFFER_M,
};
pub use registry::{ZoneRegistry, ZoneSource, ZoneUpdate};

#[derive(Error, Debug)]
pub enum ZoneError {
    #[error("Zone not found: {0}")]
    NotFound(String),
    #[error("Duplicate zone id: {0}")]
    DuplicateId(String),
    #[error("Invalid radius for zone {id}: {radius_m}")]
    InvalidRadius { id: String, radius_m: f64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Zone source unavailable: {0}")]
    SourceUnavailable(String),
}

pub type Result<T> = std::result::Result<T, ZoneError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskZone {
    pub id: String,
    pub name: String,
    pub center: GeoPoint,
    pub radius_m: f64,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RiskZone {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        center: GeoPoint,
        radius_m: f64,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            center,
            radius_m,
            risk_level,
            description: None,
            active: true,
        }
    }

    /// Great-circle distance from the zone center in meters
    pub fn distance_m(&self, point: &GeoPoint) -> f64 {
        self.center.distance_m(point)
    }
}
