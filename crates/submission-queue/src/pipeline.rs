//! Report submission pipeline
//!
//! ```text
//! region gate -> offline? queue : reverse geocode -> submit -> transient failure? queue
//! ```

use crate::payload::{is_blank, LocationDetails, SubmissionPayload};
use crate::queue::OfflineQueue;
use crate::submitter::{Address, ReverseGeocoder, SubmissionReceipt, SubmitError, Submitter};
use crate::QueueError;
use geofence::{validate_location, GeoPoint, Region};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SubmissionError {
    /// Local rejection before any network call; never queued
    #[error("Invalid location: {}", .errors.join("; "))]
    ValidationRejected { errors: Vec<String> },

    #[error("Rejected by backend: {message}")]
    Rejected { message: String, errors: Vec<String> },

    #[error(transparent)]
    Queue(#[from] QueueError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Submitted {
        receipt: SubmissionReceipt,
    },
    Queued {
        queue_id: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub geocode_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            geocode_timeout_ms: 10_000,
        }
    }
}

pub struct ReportPipeline {
    region: Arc<Region>,
    geocoder: Arc<dyn ReverseGeocoder>,
    submitter: Arc<dyn Submitter>,
    queue: Arc<OfflineQueue>,
    config: PipelineConfig,
}

impl ReportPipeline {
    pub fn new(
        region: Arc<Region>,
        geocoder: Arc<dyn ReverseGeocoder>,
        submitter: Arc<dyn Submitter>,
        queue: Arc<OfflineQueue>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            region,
            geocoder,
            submitter,
            queue,
            config,
        }
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.queue
    }

    pub async fn submit(&self, mut payload: SubmissionPayload) -> Result<SubmissionOutcome, SubmissionError> {
        let point = match payload.location() {
            Some(location) => self.check_region(location)?,
            None => None,
        };

        if !self.queue.connectivity().is_online() {
            return self.defer(payload, "offline").await;
        }

        if let (Some(point), Some(location)) = (point, payload.location_mut()) {
            if location.needs_address() {
                self.complete_address(location, &point).await;
            }
        }

        let result = match timeout(self.queue.config().submit_timeout(), self.submitter.submit(&payload)).await {
            Ok(result) => result,
            Err(_) => Err(SubmitError::Timeout),
        };

        match result {
            Ok(receipt) => {
                info!("{} submitted (id {:?})", payload.kind(), receipt.id);
                Ok(SubmissionOutcome::Submitted { receipt })
            }
            Err(e) if e.is_transient() => {
                let reason = e.to_string();
                self.defer(payload, &reason).await
            }
            Err(e) => {
                warn!("{} not accepted: {}", payload.kind(), e);
                let (message, errors) = match e {
                    SubmitError::Rejected { message, errors } => (message, errors),
                    other => (other.to_string(), Vec::new()),
                };
                Err(SubmissionError::Rejected { message, errors })
            }
        }
    }

    /// Hard region gate; soft warnings are only logged
    fn check_region(&self, location: &LocationDetails) -> Result<Option<GeoPoint>, SubmissionError> {
        let point = match location.point() {
            None => return Ok(None),
            Some(Ok(point)) => point,
            Some(Err(e)) => {
                return Err(SubmissionError::ValidationRejected {
                    errors: vec![e.to_string()],
                })
            }
        };

        if !self.region.is_within_region(&point) {
            return Err(SubmissionError::ValidationRejected {
                errors: vec![format!("Location is outside {}", self.region.name)],
            });
        }

        let checked = validate_location(
            &self.region,
            Some(location.province.as_str()),
            Some(location.city.as_str()),
            Some(&point),
        );
        for warning in &checked.warnings {
            debug!("Location warning: {}", warning);
        }
        Ok(Some(point))
    }

    /// Fill blank address fields. A failed lookup still yields a street
    /// address made of the coordinates.
    async fn complete_address(&self, location: &mut LocationDetails, point: &GeoPoint) {
        let lookup = timeout(
            Duration::from_millis(self.config.geocode_timeout_ms),
            self.geocoder.reverse_geocode(point),
        )
        .await
        .unwrap_or(Err(SubmitError::Timeout));

        match lookup {
            Ok(address) => fill_blanks(location, address),
            Err(e) => {
                warn!("Reverse geocoding failed for {}: {}", point, e);
                if is_blank(location.street_address.as_deref()) {
                    location.street_address = Some(point.to_string());
                }
            }
        }
    }

    async fn defer(&self, payload: SubmissionPayload, reason: &str) -> Result<SubmissionOutcome, SubmissionError> {
        let queue_id = self.queue.enqueue(payload).await?;
        Ok(SubmissionOutcome::Queued {
            queue_id,
            reason: reason.to_string(),
        })
    }
}

fn fill_blanks(location: &mut LocationDetails, address: Address) {
    fn fill(field: &mut Option<String>, value: String) {
        if is_blank(field.as_deref()) && !value.trim().is_empty() {
            *field = Some(value);
        }
    }

    fill(&mut location.street_address, address.street_address);
    fill(&mut location.neighborhood, address.neighborhood);
    fill(&mut location.district, address.district);
    if location.city.trim().is_empty() {
        location.city = address.city;
    }
    if location.province.trim().is_empty() {
        location.province = address.province;
    }
}
