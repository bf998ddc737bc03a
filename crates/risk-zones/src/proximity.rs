//! Proximity evaluator
//!
//! Pure function over (sample, zones, previous state). Alerts fire on
//! transitions only: a stream of samples inside the same zone yields one
//! `ZoneEntered`, and leaving a zone yields nothing.

use crate::RiskZone;
use geofence::GeoPoint;
use serde::{Deserialize, Serialize};

/// Width of the "near" ring outside each zone's radius
pub const NEAR_BUFFER_M: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityConfig {
    pub near_buffer_m: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            near_buffer_m: NEAR_BUFFER_M,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proximity {
    Contained,
    Near,
    Outside,
}

pub fn classify(distance_m: f64, radius_m: f64, near_buffer_m: f64) -> Proximity {
    if distance_m <= radius_m {
        Proximity::Contained
    } else if distance_m <= radius_m + near_buffer_m {
        Proximity::Near
    } else {
        Proximity::Outside
    }
}

/// Last zone ids seen by one watch session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchSessionState {
    pub last_contained_zone_id: Option<String>,
    pub last_near_zone_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransitionEvent {
    ZoneEntered { zone: RiskZone, distance_m: f64 },
    ZoneApproached { zone: RiskZone, distance_m: f64 },
}

impl TransitionEvent {
    pub fn zone(&self) -> &RiskZone {
        match self {
            Self::ZoneEntered { zone, .. } | Self::ZoneApproached { zone, .. } => zone,
        }
    }

    pub fn distance_m(&self) -> f64 {
        match self {
            Self::ZoneEntered { distance_m, .. } | Self::ZoneApproached { distance_m, .. } => *distance_m,
        }
    }

    pub fn is_entry(&self) -> bool {
        matches!(self, Self::ZoneEntered { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub new_state: WatchSessionState,
    pub events: Vec<TransitionEvent>,
}

/// Classify `sample` against every active zone.
///
/// First match wins in registry order, separately for containment and for
/// nearness. An event is emitted when the chosen id differs from the previous
/// one and the new id is present.
pub fn evaluate(
    sample: &GeoPoint,
    zones: &[RiskZone],
    previous: &WatchSessionState,
    config: &ProximityConfig,
) -> Evaluation {
    let mut contained: Option<(&RiskZone, f64)> = None;
    let mut near: Option<(&RiskZone, f64)> = None;

    for zone in zones.iter().filter(|z| z.active) {
        if contained.is_some() && near.is_some() {
            break;
        }
        let distance = zone.distance_m(sample);
        match classify(distance, zone.radius_m, config.near_buffer_m) {
            Proximity::Contained if contained.is_none() => contained = Some((zone, distance)),
            Proximity::Near if near.is_none() => near = Some((zone, distance)),
            _ => {}
        }
    }

    let new_state = WatchSessionState {
        last_contained_zone_id: contained.map(|(z, _)| z.id.clone()),
        last_near_zone_id: near.map(|(z, _)| z.id.clone()),
    };

    let mut events = Vec::new();
    if let Some((zone, distance_m)) = contained {
        if previous.last_contained_zone_id.as_deref() != Some(zone.id.as_str()) {
            events.push(TransitionEvent::ZoneEntered {
                zone: zone.clone(),
                distance_m,
            });
        }
    }
    if let Some((zone, distance_m)) = near {
        if previous.last_near_zone_id.as_deref() != Some(zone.id.as_str()) {
            events.push(TransitionEvent::ZoneApproached {
                zone: zone.clone(),
                distance_m,
            });
        }
    }

    Evaluation { new_state, events }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RiskLevel;

    fn pt(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn zone(id: &str, lat: f64, lon: f64, radius_m: f64) -> RiskZone {
        RiskZone::new(id, format!("Zone {id}"), pt(lat, lon), radius_m, RiskLevel::Medium)
    }

    #[test]
    fn test_classify_edges() {
        assert_eq!(classify(0.0, 100.0, 200.0), Proximity::Contained);
        assert_eq!(classify(100.0, 100.0, 200.0), Proximity::Contained);
        assert_eq!(classify(100.1, 100.0, 200.0), Proximity::Near);
        assert_eq!(classify(300.0, 100.0, 200.0), Proximity::Near);
        assert_eq!(classify(300.1, 100.0, 200.0), Proximity::Outside);
    }

    #[test]
    fn test_entry_fires_once() {
        let zones = vec![zone("a", 24.8607, 67.0011, 3000.0)];
        let config = ProximityConfig::default();

        let first = evaluate(&pt(24.8607, 67.0011), &zones, &WatchSessionState::default(), &config);
        assert_eq!(first.events.len(), 1);
        assert!(first.events[0].is_entry());
        assert_eq!(first.new_state.last_contained_zone_id.as_deref(), Some("a"));

        let second = evaluate(&pt(24.8610, 67.0015), &zones, &first.new_state, &config);
        assert!(second.events.is_empty());
        assert_eq!(second.new_state, first.new_state);
    }

    #[test]
    fn test_leaving_emits_nothing() {
        let zones = vec![zone("a", 0.0, 0.0, 500.0)];
        let inside = WatchSessionState {
            last_contained_zone_id: Some("a".to_string()),
            last_near_zone_id: None,
        };
        // ~11 km north
        let out = evaluate(&pt(0.1, 0.0), &zones, &inside, &ProximityConfig::default());
        assert!(out.events.is_empty());
        assert_eq!(out.new_state, WatchSessionState::default());
    }

    #[test]
    fn test_near_ring_emits_approach() {
        let zones = vec![zone("a", 0.0, 0.0, 1000.0)];
        // 0.01 deg latitude ~ 1112 m: outside the radius, inside the buffer
        let out = evaluate(&pt(0.01, 0.0), &zones, &WatchSessionState::default(), &ProximityConfig::default());
        assert_eq!(out.events.len(), 1);
        assert!(matches!(&out.events[0], TransitionEvent::ZoneApproached { zone, .. } if zone.id == "a"));
        assert_eq!(out.new_state.last_contained_zone_id, None);
        assert_eq!(out.new_state.last_near_zone_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_buffer_is_configurable() {
        let zones = vec![zone("a", 0.0, 0.0, 1000.0)];
        let tight = ProximityConfig { near_buffer_m: 50.0 };
        let out = evaluate(&pt(0.01, 0.0), &zones, &WatchSessionState::default(), &tight);
        assert!(out.events.is_empty());
    }

    #[test]
    fn test_first_match_wins_not_closest() {
        // "wide" is listed first; the sample sits at the center of "tight"
        let zones = vec![zone("wide", 0.0, 0.0, 5000.0), zone("tight", 0.01, 0.0, 500.0)];
        let out = evaluate(&pt(0.01, 0.0), &zones, &WatchSessionState::default(), &ProximityConfig::default());
        assert_eq!(out.new_state.last_contained_zone_id.as_deref(), Some("wide"));
        assert_eq!(out.events.len(), 1);
    }

    #[test]
    fn test_contained_and_near_are_independent() {
        // inside "a", in the near ring of "b"
        let zones = vec![zone("a", 0.0, 0.0, 1000.0), zone("b", 0.0, 0.0054, 500.0)];
        let out = evaluate(&pt(0.0, 0.0), &zones, &WatchSessionState::default(), &ProximityConfig::default());
        assert_eq!(out.new_state.last_contained_zone_id.as_deref(), Some("a"));
        assert_eq!(out.new_state.last_near_zone_id.as_deref(), Some("b"));
        assert_eq!(out.events.len(), 2);
        assert!(out.events[0].is_entry());
        assert!(!out.events[1].is_entry());
    }

    #[test]
    fn test_switching_zones_fires_again() {
        let zones = vec![zone("a", 0.0, 0.0, 500.0), zone("b", 1.0, 1.0, 500.0)];
        let config = ProximityConfig::default();
        let in_a = evaluate(&pt(0.0, 0.0), &zones, &WatchSessionState::default(), &config);
        let in_b = evaluate(&pt(1.0, 1.0), &zones, &in_a.new_state, &config);
        assert_eq!(in_b.events.len(), 1);
        assert_eq!(in_b.events[0].zone().id, "b");
    }

    #[test]
    fn test_inactive_zones_ignored() {
        let mut z = zone("a", 0.0, 0.0, 500.0);
        z.active = false;
        let out = evaluate(&pt(0.0, 0.0), &[z], &WatchSessionState::default(), &ProximityConfig::default());
        assert!(out.events.is_empty());
        assert_eq!(out.new_state, WatchSessionState::default());
    }
}
