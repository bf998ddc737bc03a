//! Zone watcher: one watch session over a sensor subscription
//!
//! Samples are consumed by a single task, so the evaluate-and-update step
//! never interleaves. The session state is additionally behind a mutex so
//! readers (status endpoints) see a consistent snapshot.

use crate::notify::{geofence_alert, NotificationSink};
use crate::sensor::{LocationSample, LocationSensor, PermissionScope, PermissionStatus, Subscription, SubscriptionOptions};
use crate::throttle::SampleThrottle;
use crate::{Result, WatchError};
use risk_zones::{evaluate, ProximityConfig, WatchSessionState, ZoneRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Evaluate at least this often while stationary
    pub interval_ms: u64,
    /// ... or whenever the device has moved this far
    pub min_distance_m: f64,
    pub permission_timeout_ms: u64,
    pub fix_timeout_ms: u64,
    pub dispatch_timeout_ms: u64,
    /// Ask for background permission as well as foreground
    pub require_background: bool,
    pub proximity: ProximityConfig,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            min_distance_m: 100.0,
            permission_timeout_ms: 30_000,
            fix_timeout_ms: 15_000,
            dispatch_timeout_ms: 10_000,
            require_background: true,
            proximity: ProximityConfig::default(),
        }
    }
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    fn subscription_options(&self) -> SubscriptionOptions {
        SubscriptionOptions {
            interval: self.interval(),
            min_distance_m: self.min_distance_m,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchStatus {
    Stopped,
    Starting,
    Running,
}

struct RunningSession {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Everything the session task needs, cloned out of the watcher
#[derive(Clone)]
struct SessionContext {
    sink: Arc<dyn NotificationSink>,
    zones: Arc<ZoneRegistry>,
    config: WatchConfig,
    state: Arc<Mutex<WatchSessionState>>,
    status: Arc<watch::Sender<WatchStatus>>,
}

pub struct ZoneWatcher {
    sensor: Arc<dyn LocationSensor>,
    ctx: SessionContext,
    lifecycle: Mutex<Option<RunningSession>>,
}

impl ZoneWatcher {
    pub fn new(
        sensor: Arc<dyn LocationSensor>,
        sink: Arc<dyn NotificationSink>,
        zones: Arc<ZoneRegistry>,
        config: WatchConfig,
    ) -> Self {
        let (status, _) = watch::channel(WatchStatus::Stopped);
        Self {
            sensor,
            ctx: SessionContext {
                sink,
                zones,
                config,
                state: Arc::new(Mutex::new(WatchSessionState::default())),
                status: Arc::new(status),
            },
            lifecycle: Mutex::new(None),
        }
    }

    /// Start a session. A no-op while one is already running.
    ///
    /// Permission denial is returned to the caller and not retried; the
    /// watcher goes back to `Stopped`.
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.is_some() && self.status() != WatchStatus::Stopped {
            debug!("Zone watcher already running");
            return Ok(());
        }
        // A session that ended on its own (sensor gone) is reaped first
        if let Some(stale) = lifecycle.take() {
            if let Err(e) = stale.task.await {
                warn!("Zone watch task ended abnormally: {}", e);
            }
        }

        self.ctx.status.send_replace(WatchStatus::Starting);
        let subscription = match self.open_subscription().await {
            Ok(sub) => sub,
            Err(e) => {
                warn!("Zone watcher failed to start: {}", e);
                self.ctx.status.send_replace(WatchStatus::Stopped);
                return Err(e);
            }
        };

        *self.ctx.state.lock().await = WatchSessionState::default();
        self.ctx.status.send_replace(WatchStatus::Running);

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_session(subscription, stop_rx, self.ctx.clone()));
        *lifecycle = Some(RunningSession { stop_tx, task });

        info!(
            "Zone watcher started ({} zones, every {} ms or {} m)",
            self.ctx.zones.len(),
            self.ctx.config.interval_ms,
            self.ctx.config.min_distance_m
        );
        Ok(())
    }

    /// Stop the session and drop its state. A no-op while stopped.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(session) = lifecycle.take() else {
            debug!("Zone watcher already stopped");
            return;
        };

        // The task may already have exited after a sensor failure
        let _ = session.stop_tx.send(());
        if let Err(e) = session.task.await {
            warn!("Zone watch task ended abnormally: {}", e);
        }

        *self.ctx.state.lock().await = WatchSessionState::default();
        self.ctx.status.send_replace(WatchStatus::Stopped);
        info!("Zone watcher stopped");
    }

    pub fn status(&self) -> WatchStatus {
        *self.ctx.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<WatchStatus> {
        self.ctx.status.subscribe()
    }

    pub async fn session_state(&self) -> WatchSessionState {
        self.ctx.state.lock().await.clone()
    }

    pub fn zones(&self) -> &ZoneRegistry {
        &self.ctx.zones
    }

    pub fn config(&self) -> &WatchConfig {
        &self.ctx.config
    }

    /// One-shot fix from the sensor, outside any session
    pub async fn current_location(&self) -> Result<LocationSample> {
        let fix = timeout(
            Duration::from_millis(self.ctx.config.fix_timeout_ms),
            self.sensor.current_location(),
        )
        .await
        .map_err(|_| WatchError::Timeout("location fix"))?;
        Ok(fix?)
    }

    async fn open_subscription(&self) -> Result<Subscription> {
        let permission_timeout = Duration::from_millis(self.ctx.config.permission_timeout_ms);
        let mut scopes = vec![PermissionScope::Foreground];
        if self.ctx.config.require_background {
            scopes.push(PermissionScope::Background);
        }

        for scope in scopes {
            let status = timeout(permission_timeout, self.sensor.request_permission(scope))
                .await
                .map_err(|_| WatchError::Timeout("location permission"))??;
            if status == PermissionStatus::Denied {
                return Err(WatchError::PermissionDenied(scope));
            }
        }

        let subscription = timeout(
            permission_timeout,
            self.sensor.subscribe(self.ctx.config.subscription_options()),
        )
        .await
        .map_err(|_| WatchError::Timeout("location subscription"))??;
        Ok(subscription)
    }
}

async fn run_session(mut subscription: Subscription, mut stop_rx: oneshot::Receiver<()>, ctx: SessionContext) {
    let mut throttle = SampleThrottle::new(ctx.config.interval(), ctx.config.min_distance_m);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            reading = subscription.readings.recv() => match reading {
                Some(Ok(sample)) => {
                    if throttle.should_evaluate(&sample) {
                        ctx.handle_sample(&sample).await;
                    } else {
                        debug!("Sample at {} throttled", sample.point);
                    }
                }
                Some(Err(e)) => warn!("Location sensor error: {}", e),
                None => {
                    warn!("Location sensor closed the subscription, stopping watch");
                    *ctx.state.lock().await = WatchSessionState::default();
                    ctx.status.send_replace(WatchStatus::Stopped);
                    break;
                }
            },
        }
    }

    subscription.cancel();
}

impl SessionContext {
    async fn handle_sample(&self, sample: &LocationSample) {
        let events = {
            let mut state = self.state.lock().await;
            let eval = evaluate(&sample.point, self.zones.list(), &state, &self.config.proximity);
            *state = eval.new_state;
            eval.events
        };

        debug!("Evaluated sample at {}: {} event(s)", sample.point, events.len());

        let dispatch_timeout = Duration::from_millis(self.config.dispatch_timeout_ms);
        for event in &events {
            let zone = event.zone();
            info!(
                "{} zone {} ({}) at {:.0} m",
                if event.is_entry() { "Entered" } else { "Approaching" },
                zone.id,
                zone.name,
                event.distance_m()
            );

            let alert = geofence_alert(event, sample);
            match timeout(dispatch_timeout, self.sink.deliver(&alert)).await {
                Ok(Ok(id)) => debug!("Alert {} delivered", id),
                Ok(Err(e)) => warn!("Alert for zone {} not delivered: {}", zone.id, e),
                Err(_) => warn!("Alert for zone {} timed out", zone.id),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert_eq!(config.min_distance_m, 100.0);
        assert_eq!(config.proximity.near_buffer_m, 200.0);
    }

    #[test]
    fn test_config_partial_json() {
        let config: WatchConfig = serde_json::from_str(r#"{"interval_ms": 1000}"#).unwrap();
        assert_eq!(config.interval_ms, 1000);
        assert_eq!(config.min_distance_m, 100.0);
        assert!(config.require_background);
    }
}
