//! Engine session owned by the gateway

use crate::config::GatewayConfig;
use anyhow::Result;
use geofence::Region;
use risk_zones::ZoneRegistry;
use std::sync::Arc;
use submission_queue::{ConnectivityMonitor, KeyValueStore, OfflineQueue, ReportPipeline, ReverseGeocoder, Submitter};
use tokio::task::JoinHandle;
use zone_watch::{ChannelSensor, LogSink, NotificationHistory, SampleFeeder, ZoneWatcher};

/// External collaborators the engine is wired to
pub struct Collaborators {
    pub submitter: Arc<dyn Submitter>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    pub store: Arc<dyn KeyValueStore>,
}

#[derive(Clone)]
pub struct AppState {
    pub region: Arc<Region>,
    pub watcher: Arc<ZoneWatcher>,
    pub sensor: ChannelSensor,
    pub feeder: SampleFeeder,
    pub notifications: Arc<NotificationHistory<LogSink>>,
    pub pipeline: Arc<ReportPipeline>,
    pub queue: Arc<OfflineQueue>,
    pub connectivity: ConnectivityMonitor,
}

impl AppState {
    /// Wire up one session. The returned task replays the offline queue on
    /// every reconnect.
    pub async fn new(
        region: Region,
        zones: ZoneRegistry,
        collaborators: Collaborators,
        config: &GatewayConfig,
    ) -> Result<(Self, JoinHandle<()>)> {
        let region = Arc::new(region);
        let connectivity = ConnectivityMonitor::new(config.start_online);

        let (sensor, feeder) = ChannelSensor::new();
        let notifications = Arc::new(NotificationHistory::new(LogSink));
        let watcher = Arc::new(ZoneWatcher::new(
            Arc::new(sensor.clone()),
            notifications.clone(),
            Arc::new(zones),
            config.watch.clone(),
        ));

        let queue = Arc::new(
            OfflineQueue::open(
                collaborators.store,
                collaborators.submitter.clone(),
                connectivity.clone(),
                config.queue.clone(),
            )
            .await?,
        );
        let replay = queue.spawn_connectivity_listener();

        let pipeline = Arc::new(ReportPipeline::new(
            region.clone(),
            collaborators.geocoder,
            collaborators.submitter,
            queue.clone(),
            config.pipeline.clone(),
        ));

        let state = Self {
            region,
            watcher,
            sensor,
            feeder,
            notifications,
            pipeline,
            queue,
            connectivity,
        };
        Ok((state, replay))
    }
}
