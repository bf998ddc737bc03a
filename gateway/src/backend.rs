//! HTTP adapters: incident backend and Nominatim reverse geocoding

use crate::config::{BackendConfig, GeocoderConfig};
use anyhow::Result;
use async_trait::async_trait;
use geofence::GeoPoint;
use reqwest::StatusCode;
use risk_zones::{RiskLevel, RiskZone, ZoneError, ZoneSource};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use submission_queue::{Address, ReverseGeocoder, SubmissionPayload, SubmissionReceipt, SubmitError, Submitter};
use tracing::{debug, warn};

/// Incident reporting backend
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Resource path for each submission kind
pub fn endpoint_for(payload: &SubmissionPayload) -> &'static str {
    match payload {
        SubmissionPayload::Report(_) => "/incidents/submit",
        SubmissionPayload::Location(_) => "/locations",
        SubmissionPayload::Victim(_) => "/victims",
        SubmissionPayload::IncidentType(_) => "/incident-types",
        SubmissionPayload::StolenItem(_) => "/stolen-items",
        SubmissionPayload::Incident(_) => "/incidents",
    }
}

fn transport_error(e: reqwest::Error) -> SubmitError {
    if e.is_timeout() {
        SubmitError::Timeout
    } else {
        SubmitError::Network(e.to_string())
    }
}

/// Map a non-success response body to the submission error taxonomy:
/// 4xx is the backend refusing the payload, anything else is transient.
pub fn error_from_response(status: StatusCode, body: &Value) -> SubmitError {
    let message = body
        .get("message")
        .or_else(|| body.get("detail"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));

    if !status.is_client_error() {
        return SubmitError::Network(message);
    }

    let errors = match body.get("errors") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect(),
        Some(Value::Object(fields)) => fields
            .iter()
            .map(|(field, v)| match v {
                Value::String(s) => format!("{field}: {s}"),
                other => format!("{field}: {other}"),
            })
            .collect(),
        _ => Vec::new(),
    };
    SubmitError::Rejected { message, errors }
}

#[async_trait]
impl Submitter for HttpBackend {
    async fn submit(&self, payload: &SubmissionPayload) -> std::result::Result<SubmissionReceipt, SubmitError> {
        let body = payload.body().map_err(|e| SubmitError::Rejected {
            message: format!("payload not serializable: {e}"),
            errors: Vec::new(),
        })?;
        let url = self.url(endpoint_for(payload));
        debug!("POST {}", url);

        let response = self
            .authorize(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let data: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(error_from_response(status, &data));
        }

        Ok(SubmissionReceipt {
            id: data.get("id").and_then(Value::as_i64),
            message: data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Report submitted successfully")
                .to_string(),
        })
    }
}

/// Restricted area as the backend serves it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestrictedArea {
    id: String,
    name: String,
    coordinates: Coordinates,
    radius: f64,
    risk_level: RiskLevel,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "active_by_default")]
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    latitude: f64,
    longitude: f64,
}

fn active_by_default() -> bool {
    true
}

impl RestrictedArea {
    fn into_zone(self) -> Option<RiskZone> {
        let center = match GeoPoint::new(self.coordinates.latitude, self.coordinates.longitude) {
            Ok(center) => center,
            Err(e) => {
                warn!("Skipping restricted area {}: {}", self.id, e);
                return None;
            }
        };
        let mut zone = RiskZone::new(self.id, self.name, center, self.radius, self.risk_level);
        zone.description = self.description.filter(|d| !d.is_empty());
        zone.active = self.is_active;
        Some(zone)
    }
}

#[async_trait]
impl ZoneSource for HttpBackend {
    async fn fetch_zones(&self, include_inactive: bool) -> risk_zones::Result<Vec<RiskZone>> {
        let url = self.url(&format!("/restricted-areas?include_inactive={include_inactive}"));
        let unavailable = |e: reqwest::Error| ZoneError::SourceUnavailable(e.to_string());

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(unavailable)?;
        if !response.status().is_success() {
            return Err(ZoneError::SourceUnavailable(format!(
                "restricted-areas returned {}",
                response.status()
            )));
        }

        let areas: Vec<RestrictedArea> = response.json().await.map_err(unavailable)?;
        Ok(areas.into_iter().filter_map(RestrictedArea::into_zone).collect())
    }
}

/// OpenStreetMap Nominatim reverse geocoder
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: NominatimAddress,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    road: Option<String>,
    house_number: Option<String>,
    neighbourhood: Option<String>,
    suburb: Option<String>,
    county: Option<String>,
    state_district: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

impl From<NominatimResponse> for Address {
    fn from(r: NominatimResponse) -> Self {
        let a = r.address;
        let street = match (a.house_number, a.road) {
            (Some(number), Some(road)) => Some(format!("{number} {road}")),
            (None, Some(road)) => Some(road),
            _ => None,
        };
        Address {
            street_address: r.display_name.or(street).unwrap_or_default(),
            neighborhood: a.neighbourhood.or(a.suburb).unwrap_or_default(),
            district: a.county.or(a.state_district).unwrap_or_default(),
            city: a.city.or(a.town).or(a.village).unwrap_or_default(),
            province: a.state.unwrap_or_default(),
            country: a.country.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse_geocode(&self, point: &GeoPoint) -> std::result::Result<Address, SubmitError> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", point.latitude().to_string()),
                ("lon", point.longitude().to_string()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(SubmitError::Network(format!("geocoder returned {}", response.status())));
        }

        let body: NominatimResponse = response.json().await.map_err(transport_error)?;
        if body.display_name.is_none() && body.address.road.is_none() {
            return Err(SubmitError::Network("Geocoding failed: no address found".to_string()));
        }
        Ok(body.into())
    }
}
