use async_trait::async_trait;
use geofence::GeoPoint;
use risk_zones::ZoneRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use zone_watch::{
    ChannelSensor, LocationSample, Notification, NotificationSink, PermissionScope, Priority, SampleFeeder,
    SensorError, SinkError, WatchConfig, WatchError, WatchStatus, ZoneWatcher,
};

/// Forwards every alert to the test
struct RecordingSink(mpsc::UnboundedSender<Notification>);

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, notification: &Notification) -> Result<String, SinkError> {
        self.0
            .send(notification.clone())
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        Ok("recorded".to_string())
    }
}

struct Harness {
    watcher: ZoneWatcher,
    sensor: ChannelSensor,
    feeder: SampleFeeder,
    alerts: mpsc::UnboundedReceiver<Notification>,
}

fn harness() -> Harness {
    let (sensor, feeder) = ChannelSensor::new();
    let (tx, alerts) = mpsc::unbounded_channel();
    let watcher = ZoneWatcher::new(
        Arc::new(sensor.clone()),
        Arc::new(RecordingSink(tx)),
        Arc::new(ZoneRegistry::with_default_zones()),
        WatchConfig::default(),
    );
    Harness {
        watcher,
        sensor,
        feeder,
        alerts,
    }
}

fn at(lat: f64, lon: f64) -> LocationSample {
    LocationSample::now(GeoPoint::new(lat, lon).unwrap())
}

const SADDAR: (f64, f64) = (24.8607, 67.0011);
const AWAY: (f64, f64) = (24.9607, 67.0011);

async fn next_alert(alerts: &mut mpsc::UnboundedReceiver<Notification>) -> Notification {
    tokio::time::timeout(Duration::from_secs(1), alerts.recv())
        .await
        .expect("alert expected")
        .expect("sink channel open")
}

async fn assert_silent(alerts: &mut mpsc::UnboundedReceiver<Notification>) {
    let res = tokio::time::timeout(Duration::from_millis(200), alerts.recv()).await;
    assert!(res.is_err(), "unexpected alert: {:?}", res);
}

#[tokio::test]
async fn start_is_idempotent() {
    let h = harness();
    h.watcher.start().await.unwrap();
    h.watcher.start().await.unwrap();

    assert_eq!(h.watcher.status(), WatchStatus::Running);
    assert_eq!(h.sensor.active_subscriptions(), 1);

    h.watcher.stop().await;
    assert_eq!(h.sensor.active_subscriptions(), 0);
}

#[tokio::test]
async fn stop_while_stopped_is_noop() {
    let h = harness();
    h.watcher.stop().await;
    assert_eq!(h.watcher.status(), WatchStatus::Stopped);

    h.watcher.start().await.unwrap();
    h.watcher.stop().await;
    h.watcher.stop().await;
    assert_eq!(h.watcher.status(), WatchStatus::Stopped);
}

#[tokio::test]
async fn denied_permission_is_reported() {
    let h = harness();
    h.sensor.set_permission(PermissionScope::Background, false);

    let err = h.watcher.start().await.unwrap_err();
    assert_eq!(err, WatchError::PermissionDenied(PermissionScope::Background));
    assert_eq!(h.watcher.status(), WatchStatus::Stopped);
    assert_eq!(h.sensor.active_subscriptions(), 0);

    // caller retries after the user grants it
    h.sensor.set_permission(PermissionScope::Background, true);
    h.watcher.start().await.unwrap();
    assert_eq!(h.watcher.status(), WatchStatus::Running);
}

#[tokio::test]
async fn foreground_only_when_background_not_required() {
    let (sensor, _feeder) = ChannelSensor::new();
    sensor.set_permission(PermissionScope::Background, false);
    let (tx, _rx) = mpsc::unbounded_channel();
    let config = WatchConfig {
        require_background: false,
        ..WatchConfig::default()
    };
    let watcher = ZoneWatcher::new(
        Arc::new(sensor),
        Arc::new(RecordingSink(tx)),
        Arc::new(ZoneRegistry::with_default_zones()),
        config,
    );
    watcher.start().await.unwrap();
    assert_eq!(watcher.status(), WatchStatus::Running);
}

#[tokio::test]
async fn entry_alert_fires_once() {
    let mut h = harness();
    h.watcher.start().await.unwrap();

    h.feeder.push(at(SADDAR.0, SADDAR.1));
    let alert = next_alert(&mut h.alerts).await;
    assert_eq!(alert.title, "HIGH Risk Area Alert");
    assert_eq!(alert.body, "You entered restricted area: Karachi Saddar");
    assert_eq!(alert.priority, Priority::Critical);

    // moving inside the zone, far enough to pass the throttle
    h.feeder.push(at(SADDAR.0 + 0.002, SADDAR.1));
    h.feeder.push(at(SADDAR.0 + 0.004, SADDAR.1));
    assert_silent(&mut h.alerts).await;

    let state = h.watcher.session_state().await;
    assert_eq!(state.last_contained_zone_id.as_deref(), Some("1"));
}

#[tokio::test]
async fn reentry_fires_again() {
    let mut h = harness();
    h.watcher.start().await.unwrap();

    h.feeder.push(at(SADDAR.0, SADDAR.1));
    next_alert(&mut h.alerts).await;

    h.feeder.push(at(AWAY.0, AWAY.1));
    assert_silent(&mut h.alerts).await;

    h.feeder.push(at(SADDAR.0, SADDAR.1));
    let alert = next_alert(&mut h.alerts).await;
    assert!(alert.body.contains("Karachi Saddar"));
}

#[tokio::test]
async fn no_alerts_after_stop() {
    let mut h = harness();
    h.watcher.start().await.unwrap();
    h.watcher.stop().await;

    assert_eq!(h.feeder.push(at(SADDAR.0, SADDAR.1)), 0);
    assert_silent(&mut h.alerts).await;
    assert_eq!(h.watcher.session_state().await, Default::default());
}

#[tokio::test]
async fn restart_begins_with_fresh_state() {
    let mut h = harness();
    h.watcher.start().await.unwrap();
    h.feeder.push(at(SADDAR.0, SADDAR.1));
    next_alert(&mut h.alerts).await;

    h.watcher.stop().await;
    h.watcher.start().await.unwrap();

    // Same position inside the 5 s interval, but a new session starts with a
    // new throttle and empty state: the entry is announced again
    h.feeder.push(at(SADDAR.0, SADDAR.1));
    next_alert(&mut h.alerts).await;
}

#[tokio::test]
async fn sensor_errors_do_not_stop_the_session() {
    let mut h = harness();
    h.watcher.start().await.unwrap();

    h.feeder.push_error(SensorError::Unavailable("gps glitch".into()));
    h.feeder.push_error(SensorError::NoFix);
    h.feeder.push(at(SADDAR.0, SADDAR.1));

    next_alert(&mut h.alerts).await;
    assert_eq!(h.watcher.status(), WatchStatus::Running);
}

#[tokio::test]
async fn closed_sensor_moves_to_stopped() {
    let h = harness();
    h.watcher.start().await.unwrap();
    let mut status = h.watcher.subscribe_status();

    h.feeder.shutdown();
    tokio::time::timeout(Duration::from_secs(1), status.wait_for(|s| *s == WatchStatus::Stopped))
        .await
        .expect("watcher should stop")
        .unwrap();

    // and can be started again
    h.watcher.start().await.unwrap();
    assert_eq!(h.watcher.status(), WatchStatus::Running);
    assert_eq!(h.sensor.active_subscriptions(), 1);
}

#[tokio::test]
async fn current_location_needs_a_fix() {
    let h = harness();
    assert!(matches!(
        h.watcher.current_location().await,
        Err(WatchError::SensorUnavailable(_))
    ));

    let sample = at(31.5204, 74.3587);
    h.feeder.push(sample);
    assert_eq!(h.watcher.current_location().await.unwrap(), sample);
}
