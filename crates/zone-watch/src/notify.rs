//! Alert composition and the notification sink seam

use crate::sensor::LocationSample;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use risk_zones::{RiskLevel, TransitionEvent};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Alerts kept by `NotificationHistory`
pub const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub metadata: serde_json::Value,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    #[error("notification rejected: {0}")]
    Rejected(String),
    #[error("notification sink unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver and return the sink's notification id
    async fn deliver(&self, notification: &Notification) -> Result<String, SinkError>;
}

/// Build the alert for a transition event
pub fn geofence_alert(event: &TransitionEvent, sample: &LocationSample) -> Notification {
    let zone = event.zone();
    let (body, kind) = match event {
        TransitionEvent::ZoneEntered { .. } => (format!("You entered restricted area: {}", zone.name), "zone_entered"),
        TransitionEvent::ZoneApproached { .. } => {
            (format!("You are near restricted area: {}", zone.name), "zone_approached")
        }
    };
    let priority = if event.is_entry() && zone.risk_level == RiskLevel::High {
        Priority::Critical
    } else {
        Priority::High
    };

    Notification {
        title: format!("{} Risk Area Alert", zone.risk_level),
        body,
        priority,
        metadata: json!({
            "type": "geofencing",
            "event": kind,
            "zone_id": zone.id,
            "zone_name": zone.name,
            "risk_level": zone.risk_level,
            "distance_m": event.distance_m(),
            "latitude": sample.point.latitude(),
            "longitude": sample.point.longitude(),
        }),
    }
}

/// Sink that only writes alerts to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> Result<String, SinkError> {
        let id = Uuid::new_v4().to_string();
        info!(
            "[{:?}] {}: {} ({})",
            notification.priority, notification.title, notification.body, id
        );
        Ok(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    #[serde(flatten)]
    pub notification: Notification,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// Decorator keeping the most recent alerts delivered through `inner`
pub struct NotificationHistory<S> {
    inner: S,
    records: Mutex<VecDeque<NotificationRecord>>,
}

impl<S> NotificationHistory<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            records: Mutex::new(VecDeque::with_capacity(HISTORY_LIMIT)),
        }
    }

    fn records(&self) -> MutexGuard<'_, VecDeque<NotificationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Newest first
    pub fn history(&self) -> Vec<NotificationRecord> {
        self.records().iter().cloned().collect()
    }

    pub fn unread_count(&self) -> usize {
        self.records().iter().filter(|r| !r.read).count()
    }

    /// Returns false when no record has this id
    pub fn mark_read(&self, id: &str) -> bool {
        match self.records().iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&self) {
        self.records().iter_mut().for_each(|r| r.read = true);
    }

    pub fn clear(&self) {
        self.records().clear();
    }
}

#[async_trait]
impl<S: NotificationSink> NotificationSink for NotificationHistory<S> {
    async fn deliver(&self, notification: &Notification) -> Result<String, SinkError> {
        let id = match self.inner.deliver(notification).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Alert delivery failed: {}", e);
                return Err(e);
            }
        };

        let mut records = self.records();
        records.push_front(NotificationRecord {
            id: id.clone(),
            notification: notification.clone(),
            timestamp: Utc::now(),
            read: false,
        });
        records.truncate(HISTORY_LIMIT);
        Ok(id)
    }
}
