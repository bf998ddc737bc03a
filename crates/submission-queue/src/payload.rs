//! Typed submission records, one per backend resource
//!
//! Optional fields left empty are omitted from the wire JSON.

use chrono::{DateTime, Utc};
use geofence::{GeoError, GeoPoint};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationDetails {
    pub province: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl LocationDetails {
    /// `None` unless both coordinates are present
    pub fn point(&self) -> Option<std::result::Result<GeoPoint, GeoError>> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }

    /// True when any address field is still blank
    pub fn needs_address(&self) -> bool {
        [&self.district, &self.neighborhood, &self.street_address]
            .iter()
            .any(|f| is_blank(f.as_deref()))
            || self.city.trim().is_empty()
            || self.province.trim().is_empty()
    }
}

pub(crate) fn is_blank(s: Option<&str>) -> bool {
    s.map_or(true, |s| s.trim().is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VictimDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentTypeDetails {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StolenItemDetails {
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_estimate: Option<f64>,

    // Phones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imei: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_model: Option<String>,

    // Vehicles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chassis_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentDetails {
    pub occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_estimate: Option<f64>,
    #[serde(default)]
    pub fir_filed: bool,
}

/// Complete report, submitted as one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    pub location: LocationDetails,
    #[serde(default)]
    pub victim: VictimDetails,
    pub incident_type: IncidentTypeDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stolen_item: Option<StolenItemDetails>,
    pub incident: IncidentDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionPayload {
    Report(IncidentReport),
    Location(LocationDetails),
    Victim(VictimDetails),
    IncidentType(IncidentTypeDetails),
    StolenItem(StolenItemDetails),
    Incident(IncidentDetails),
}

impl SubmissionPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Report(_) => "report",
            Self::Location(_) => "location",
            Self::Victim(_) => "victim",
            Self::IncidentType(_) => "incident_type",
            Self::StolenItem(_) => "stolen_item",
            Self::Incident(_) => "incident",
        }
    }

    /// Location record carried by this payload, if any
    pub fn location(&self) -> Option<&LocationDetails> {
        match self {
            Self::Report(r) => Some(&r.location),
            Self::Location(l) => Some(l),
            _ => None,
        }
    }

    pub fn location_mut(&mut self) -> Option<&mut LocationDetails> {
        match self {
            Self::Report(r) => Some(&mut r.location),
            Self::Location(l) => Some(l),
            _ => None,
        }
    }

    /// Request body for the backend: the record itself, without the tag
    pub fn body(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::Report(r) => serde_json::to_value(r),
            Self::Location(l) => serde_json::to_value(l),
            Self::Victim(v) => serde_json::to_value(v),
            Self::IncidentType(t) => serde_json::to_value(t),
            Self::StolenItem(s) => serde_json::to_value(s),
            Self::Incident(i) => serde_json::to_value(i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn location() -> LocationDetails {
        LocationDetails {
            province: "Sindh".into(),
            city: "Karachi".into(),
            latitude: Some(24.8607),
            longitude: Some(67.0011),
            ..Default::default()
        }
    }

    #[test]
    fn test_tagged_by_kind() {
        let payload = SubmissionPayload::Location(location());
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["kind"], "location");
        assert_eq!(value["city"], "Karachi");
        // empty optionals are omitted
        assert!(value.get("district").is_none());

        let back: SubmissionPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_body_has_no_tag() {
        let body = SubmissionPayload::Location(location()).body().unwrap();
        assert!(body.get("kind").is_none());
        assert_eq!(body["latitude"], 24.8607);
    }

    #[test]
    fn test_report_shape() {
        let report: SubmissionPayload = serde_json::from_value(json!({
            "kind": "report",
            "location": {"province": "Punjab", "city": "Lahore"},
            "incident_type": {"category": "Mobile Snatching"},
            "incident": {"occurred_at": "2024-03-01T10:00:00Z", "fir_filed": true}
        }))
        .unwrap();

        assert_eq!(report.kind(), "report");
        let loc = report.location().unwrap();
        assert_eq!(loc.city, "Lahore");
        assert!(loc.point().is_none());
        assert!(loc.needs_address());
    }

    #[test]
    fn test_location_point() {
        let mut loc = location();
        assert!(loc.point().unwrap().is_ok());
        loc.latitude = Some(123.0);
        assert!(loc.point().unwrap().is_err());
    }

    #[test]
    fn test_non_location_payloads() {
        let victim = SubmissionPayload::Victim(VictimDetails::default());
        assert!(victim.location().is_none());
        assert_eq!(victim.kind(), "victim");
    }
}
