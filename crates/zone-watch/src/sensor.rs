//! Location sensor seam
//!
//! Samples arrive already resolved to lat/lon/accuracy. A subscription is a
//! concrete resource: dropping or cancelling it releases the sensor side.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geofence::GeoPoint;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub point: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    pub fn now(point: GeoPoint) -> Self {
        Self {
            point,
            accuracy_m: None,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionScope {
    Foreground,
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("sensor unavailable: {0}")]
    Unavailable(String),
    #[error("no location fix yet")]
    NoFix,
    #[error("sensor timed out")]
    Timeout,
}

pub type SensorReading = std::result::Result<LocationSample, SensorError>;

/// Cadence hint passed to the sensor; the watcher enforces it as well
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubscriptionOptions {
    pub interval: Duration,
    pub min_distance_m: f64,
}

pub trait SubscriptionHandle: Send {
    fn unsubscribe(&mut self);
}

pub struct Subscription {
    pub readings: mpsc::Receiver<SensorReading>,
    handle: Option<Box<dyn SubscriptionHandle>>,
}

impl Subscription {
    pub fn new(readings: mpsc::Receiver<SensorReading>, handle: Box<dyn SubscriptionHandle>) -> Self {
        Self {
            readings,
            handle: Some(handle),
        }
    }

    /// Release the sensor side. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.unsubscribe();
        }
        self.readings.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[async_trait]
pub trait LocationSensor: Send + Sync {
    async fn request_permission(&self, scope: PermissionScope) -> std::result::Result<PermissionStatus, SensorError>;

    async fn current_location(&self) -> SensorReading;

    async fn subscribe(&self, options: SubscriptionOptions) -> std::result::Result<Subscription, SensorError>;
}
