//! Zone Watch Library
//!
//! The stateful driver of the geofencing engine. A `ZoneWatcher` owns one
//! watch session: it subscribes to a location sensor, gates samples on a
//! time-or-distance cadence, runs the proximity evaluator against the risk
//! zone registry and dispatches alerts on transitions only.
//!
//! ```text
//! Stopped -> Starting (permissions) -> Running -> Stopped
//! ```
//!
//! External collaborators sit behind traits: `LocationSensor` for samples
//! and permissions, `NotificationSink` for alert delivery.

use thiserror::Error;

pub mod channel;
pub mod notify;
pub mod sensor;
pub mod throttle;
pub mod watcher;

pub use channel::{ChannelSensor, SampleFeeder};
pub use notify::{
    geofence_alert, LogSink, Notification, NotificationHistory, NotificationRecord, NotificationSink, Priority,
    SinkError,
};
pub use sensor::{
    LocationSample, LocationSensor, PermissionScope, PermissionStatus, SensorError, SensorReading, Subscription,
    SubscriptionHandle, SubscriptionOptions,
};
pub use throttle::SampleThrottle;
pub use watcher::{WatchConfig, WatchStatus, ZoneWatcher};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WatchError {
    #[error("Location permission denied: {0:?}")]
    PermissionDenied(PermissionScope),
    #[error("Location sensor unavailable: {0}")]
    SensorUnavailable(String),
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
}

impl From<SensorError> for WatchError {
    fn from(e: SensorError) -> Self {
        match e {
            SensorError::Timeout => WatchError::Timeout("location sensor"),
            other => WatchError::SensorUnavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;
