//! Backend seams: submission endpoint and reverse geocoder

use crate::payload::SubmissionPayload;
use async_trait::async_trait;
use geofence::GeoPoint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    #[error("Network failure: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// Structured validation error from the backend; not retried
    #[error("Rejected by backend: {message}")]
    Rejected { message: String, errors: Vec<String> },
}

impl SubmitError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Created resource id
    pub id: Option<i64>,
    pub message: String,
}

#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, SubmitError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street_address: String,
    pub neighborhood: String,
    pub district: String,
    pub city: String,
    pub province: String,
    pub country: String,
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, point: &GeoPoint) -> Result<Address, SubmitError>;
}
