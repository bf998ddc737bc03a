//! In-process sensor fed by pushing samples.
//!
//! Devices that resolve their own fixes push them through a `SampleFeeder`;
//! every active subscription receives each reading.

use crate::sensor::{
    LocationSample, LocationSensor, PermissionScope, PermissionStatus, SensorError, SensorReading,
    Subscription, SubscriptionHandle, SubscriptionOptions,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Readings buffered per subscriber before new ones are dropped
const SUBSCRIBER_CAPACITY: usize = 64;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    subscribers: Mutex<HashMap<u64, mpsc::Sender<SensorReading>>>,
    last_fix: Mutex<Option<LocationSample>>,
    next_id: AtomicU64,
    foreground_granted: AtomicBool,
    background_granted: AtomicBool,
}

#[derive(Clone)]
pub struct ChannelSensor {
    shared: Arc<Shared>,
}

/// Producer side of a `ChannelSensor`
#[derive(Clone)]
pub struct SampleFeeder {
    shared: Arc<Shared>,
}

impl ChannelSensor {
    /// Sensor with both permissions granted
    pub fn new() -> (Self, SampleFeeder) {
        let shared = Arc::new(Shared {
            subscribers: Mutex::new(HashMap::new()),
            last_fix: Mutex::new(None),
            next_id: AtomicU64::new(1),
            foreground_granted: AtomicBool::new(true),
            background_granted: AtomicBool::new(true),
        });
        (
            Self {
                shared: shared.clone(),
            },
            SampleFeeder { shared },
        )
    }

    pub fn set_permission(&self, scope: PermissionScope, granted: bool) {
        let flag = match scope {
            PermissionScope::Foreground => &self.shared.foreground_granted,
            PermissionScope::Background => &self.shared.background_granted,
        };
        flag.store(granted, Ordering::Release);
    }

    pub fn active_subscriptions(&self) -> usize {
        lock(&self.shared.subscribers).len()
    }
}

impl SampleFeeder {
    /// Deliver a fix to every subscriber; returns how many received it.
    pub fn push(&self, sample: LocationSample) -> usize {
        *lock(&self.shared.last_fix) = Some(sample);
        self.broadcast(Ok(sample))
    }

    /// Report a sensor-side failure to every subscriber
    pub fn push_error(&self, error: SensorError) -> usize {
        self.broadcast(Err(error))
    }

    /// Close every subscription, as a sensor that has gone away would
    pub fn shutdown(&self) {
        lock(&self.shared.subscribers).clear();
    }

    fn broadcast(&self, reading: SensorReading) -> usize {
        let mut subscribers = lock(&self.shared.subscribers);
        let mut delivered = 0;
        subscribers.retain(|id, tx| match tx.try_send(reading.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Subscriber {} is lagging, reading dropped", id);
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        delivered
    }
}

struct ChannelHandle {
    id: u64,
    shared: Arc<Shared>,
}

impl SubscriptionHandle for ChannelHandle {
    fn unsubscribe(&mut self) {
        if lock(&self.shared.subscribers).remove(&self.id).is_some() {
            debug!("Subscription {} released", self.id);
        }
    }
}

#[async_trait]
impl LocationSensor for ChannelSensor {
    async fn request_permission(&self, scope: PermissionScope) -> Result<PermissionStatus, SensorError> {
        let granted = match scope {
            PermissionScope::Foreground => self.shared.foreground_granted.load(Ordering::Acquire),
            PermissionScope::Background => self.shared.background_granted.load(Ordering::Acquire),
        };
        Ok(if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        })
    }

    async fn current_location(&self) -> SensorReading {
        lock(&self.shared.last_fix).ok_or(SensorError::NoFix)
    }

    async fn subscribe(&self, options: SubscriptionOptions) -> Result<Subscription, SensorError> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.subscribers).insert(id, tx);

        debug!(
            "Subscription {} opened ({:?} / {} m)",
            id, options.interval, options.min_distance_m
        );

        Ok(Subscription::new(
            rx,
            Box::new(ChannelHandle {
                id,
                shared: self.shared.clone(),
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofence::GeoPoint;
    use std::time::Duration;

    fn options() -> SubscriptionOptions {
        SubscriptionOptions {
            interval: Duration::from_secs(5),
            min_distance_m: 100.0,
        }
    }

    #[tokio::test]
    async fn test_push_reaches_subscriber() {
        let (sensor, feeder) = ChannelSensor::new();
        let mut sub = sensor.subscribe(options()).await.unwrap();

        let sample = LocationSample::now(GeoPoint::new(24.86, 67.0).unwrap());
        assert_eq!(feeder.push(sample), 1);
        assert_eq!(sub.readings.recv().await, Some(Ok(sample)));
        assert_eq!(sensor.current_location().await, Ok(sample));
    }

    #[tokio::test]
    async fn test_cancel_releases_subscription() {
        let (sensor, feeder) = ChannelSensor::new();
        let mut sub = sensor.subscribe(options()).await.unwrap();
        assert_eq!(sensor.active_subscriptions(), 1);

        sub.cancel();
        sub.cancel();
        assert_eq!(sensor.active_subscriptions(), 0);
        assert_eq!(feeder.push(LocationSample::now(GeoPoint::new(0.0, 0.0).unwrap())), 0);

        let sub2 = sensor.subscribe(options()).await.unwrap();
        assert_eq!(sensor.active_subscriptions(), 1);
        drop(sub2);
        assert_eq!(sensor.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_no_fix_before_first_sample() {
        let (sensor, _feeder) = ChannelSensor::new();
        assert_eq!(sensor.current_location().await, Err(SensorError::NoFix));
    }

    #[tokio::test]
    async fn test_permissions_configurable() {
        let (sensor, _feeder) = ChannelSensor::new();
        sensor.set_permission(PermissionScope::Background, false);
        assert_eq!(
            sensor.request_permission(PermissionScope::Foreground).await,
            Ok(PermissionStatus::Granted)
        );
        assert_eq!(
            sensor.request_permission(PermissionScope::Background).await,
            Ok(PermissionStatus::Denied)
        );
    }
}
