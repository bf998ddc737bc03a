//! Zone registry: ordered, validated, read-only during a watch session

use crate::{Result, RiskLevel, RiskZone, ZoneError};
use async_trait::async_trait;
use geofence::GeoPoint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Remote registry (restricted-areas endpoint or similar)
#[async_trait]
pub trait ZoneSource: Send + Sync {
    async fn fetch_zones(&self, include_inactive: bool) -> Result<Vec<RiskZone>>;
}

/// Partial update for the administrative bulk-update path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneUpdate {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub center: Option<GeoPoint>,
    #[serde(default)]
    pub radius_m: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    zones: Vec<RiskZone>,
}

impl ZoneRegistry {
    /// Validates ids are unique and radii are finite and positive.
    /// Input order is kept: it is the evaluator's tie-break.
    pub fn new(zones: Vec<RiskZone>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(zones.len());
        for zone in &zones {
            if !seen.insert(zone.id.as_str()) {
                return Err(ZoneError::DuplicateId(zone.id.clone()));
            }
            if !zone.radius_m.is_finite() || zone.radius_m <= 0.0 {
                return Err(ZoneError::InvalidRadius {
                    id: zone.id.clone(),
                    radius_m: zone.radius_m,
                });
            }
        }
        Ok(Self { zones })
    }

    /// Five reference zones across Karachi, Lahore, Islamabad and Quetta
    pub fn with_default_zones() -> Self {
        let reference = [
            ("1", "Karachi Saddar", 24.8607, 67.0011, 3000.0, RiskLevel::High),
            ("2", "Lahore Liberty", 31.5204, 74.3587, 2000.0, RiskLevel::Medium),
            ("3", "Islamabad F-7", 33.6844, 73.0479, 1500.0, RiskLevel::Low),
            ("4", "Quetta Center", 30.1798, 66.975, 2500.0, RiskLevel::High),
            ("5", "Gulshan e Ghazali", 24.871335, 67.173782, 1000.0, RiskLevel::Medium),
        ];

        let zones = reference
            .into_iter()
            .filter_map(|(id, name, lat, lon, radius, level)| {
                GeoPoint::new(lat, lon)
                    .ok()
                    .map(|center| RiskZone::new(id, name, center, radius, level))
            })
            .collect();

        Self { zones }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading risk zones from {:?}", path);

        let file = File::open(path)?;
        let zones: Vec<RiskZone> = serde_json::from_reader(BufReader::new(file))?;
        let registry = Self::new(zones)?;

        info!("Loaded {} risk zones", registry.len());
        Ok(registry)
    }

    /// One-time remote fetch. Inactive zones are dropped, order is kept.
    pub async fn fetch(source: &dyn ZoneSource) -> Result<Self> {
        let fetched = source.fetch_zones(false).await?;
        let total = fetched.len();
        let zones: Vec<RiskZone> = fetched.into_iter().filter(|z| z.active).collect();

        info!(
            "Fetched {} risk zones ({} inactive skipped)",
            zones.len(),
            total - zones.len()
        );
        Self::new(zones)
    }

    pub fn list(&self) -> &[RiskZone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn get(&self, id: &str) -> Result<&RiskZone> {
        self.zones
            .iter()
            .find(|z| z.id == id)
            .ok_or_else(|| ZoneError::NotFound(id.to_string()))
    }

    pub fn by_risk_level(&self, level: RiskLevel) -> impl Iterator<Item = &RiskZone> {
        self.zones.iter().filter(move |z| z.risk_level == level)
    }

    /// Case-insensitive substring match on the zone name
    pub fn search<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a RiskZone> {
        let needle = query.trim().to_lowercase();
        self.zones
            .iter()
            .filter(move |z| z.name.to_lowercase().contains(&needle))
    }

    /// Zones whose center lies within `radius_km` of `point`, registry order
    pub fn nearby(&self, point: &GeoPoint, radius_km: f64) -> Vec<&RiskZone> {
        let radius_m = radius_km * 1000.0;
        self.zones
            .iter()
            .filter(|z| z.distance_m(point) <= radius_m)
            .collect()
    }

    /// Apply administrative updates, producing a new registry.
    ///
    /// Sessions hold their registry behind an `Arc`, so a running watch keeps
    /// evaluating against the snapshot it started with.
    pub fn with_updates(&self, updates: &[ZoneUpdate]) -> Result<Self> {
        let mut zones = self.zones.clone();

        for update in updates {
            let zone = zones
                .iter_mut()
                .find(|z| z.id == update.id)
                .ok_or_else(|| ZoneError::NotFound(update.id.clone()))?;

            if let Some(name) = &update.name {
                zone.name = name.clone();
            }
            if let Some(center) = update.center {
                zone.center = center;
            }
            if let Some(radius_m) = update.radius_m {
                zone.radius_m = radius_m;
            }
            if let Some(level) = update.risk_level {
                zone.risk_level = level;
            }
            if let Some(description) = &update.description {
                zone.description = Some(description.clone());
            }
            if let Some(active) = update.active {
                zone.active = active;
            }
            debug!("Applied update to zone {}", zone.id);
        }

        Self::new(zones)
    }
}
