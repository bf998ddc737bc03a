use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use geofence::{nearby_major_cities, validate_location, GeoPoint, NearbyCity};
use risk_zones::{RiskLevel, RiskZone, WatchSessionState};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use submission_queue::{ProcessSummary, QueuedSubmission, SubmissionOutcome, SubmissionPayload};
use zone_watch::{LocationSample, NotificationRecord, WatchStatus};

use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/region/check", get(check_region))
        .route("/region/nearby-cities", get(nearby_cities))
        .route("/zones", get(list_zones))
        .route("/watch/start", post(start_watch))
        .route("/watch/stop", post(stop_watch))
        .route("/watch/status", get(watch_status))
        .route("/watch/samples", post(push_sample))
        .route("/notifications", get(list_notifications).delete(clear_notifications))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/:id/read", post(mark_read))
        .route("/reports", post(submit_report))
        .route("/queue", get(list_queue).delete(clear_queue))
        .route("/queue/process", post(process_queue))
        .route("/connectivity", get(connectivity).post(set_connectivity))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct RegionQuery {
    pub lat: f64,
    pub lon: f64,
    pub province: Option<String>,
    pub city: Option<String>,
}

#[derive(Serialize)]
pub struct RegionCheckResponse {
    pub region: String,
    pub within_region: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

async fn check_region(
    State(state): State<AppState>,
    Query(q): Query<RegionQuery>,
) -> ApiResult<Json<RegionCheckResponse>> {
    let point = GeoPoint::new(q.lat, q.lon)?;
    let validation = validate_location(&state.region, q.province.as_deref(), q.city.as_deref(), Some(&point));

    Ok(Json(RegionCheckResponse {
        region: state.region.name.clone(),
        within_region: state.region.is_within_region(&point),
        errors: validation.errors,
        warnings: validation.warnings,
    }))
}

#[derive(Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
}

fn default_radius_km() -> f64 {
    50.0
}

async fn nearby_cities(Query(q): Query<NearbyQuery>) -> ApiResult<Json<Vec<NearbyCity>>> {
    let point = GeoPoint::new(q.lat, q.lon)?;
    Ok(Json(nearby_major_cities(&point, q.radius_km)))
}

// ---------------------------------------------------------------------------
// Zones
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
pub struct ZoneQuery {
    pub risk_level: Option<RiskLevel>,
    pub q: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_km: Option<f64>,
}

async fn list_zones(State(state): State<AppState>, Query(q): Query<ZoneQuery>) -> ApiResult<Json<Vec<RiskZone>>> {
    let registry = state.watcher.zones();

    let mut zones: Vec<&RiskZone> = match (q.lat, q.lon) {
        (Some(lat), Some(lon)) => {
            let point = GeoPoint::new(lat, lon)?;
            registry.nearby(&point, q.radius_km.unwrap_or_else(default_radius_km))
        }
        (None, None) => registry.list().iter().collect(),
        _ => return Err(ApiError::BadRequest("lat and lon must be given together".to_string())),
    };

    if let Some(level) = q.risk_level {
        let allowed: Vec<&str> = registry.by_risk_level(level).map(|z| z.id.as_str()).collect();
        zones.retain(|z| allowed.contains(&z.id.as_str()));
    }
    if let Some(query) = q.q.as_deref().filter(|s| !s.trim().is_empty()) {
        let matched: Vec<&str> = registry.search(query).map(|z| z.id.as_str()).collect();
        zones.retain(|z| matched.contains(&z.id.as_str()));
    }

    Ok(Json(zones.into_iter().cloned().collect()))
}

// ---------------------------------------------------------------------------
// Watch session
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct WatchStatusResponse {
    pub status: WatchStatus,
    pub session: WatchSessionState,
    pub zones: usize,
    pub subscriptions: usize,
}

async fn status_of(state: &AppState) -> WatchStatusResponse {
    WatchStatusResponse {
        status: state.watcher.status(),
        session: state.watcher.session_state().await,
        zones: state.watcher.zones().len(),
        subscriptions: state.sensor.active_subscriptions(),
    }
}

async fn start_watch(State(state): State<AppState>) -> ApiResult<Json<WatchStatusResponse>> {
    state.watcher.start().await?;
    Ok(Json(status_of(&state).await))
}

async fn stop_watch(State(state): State<AppState>) -> Json<WatchStatusResponse> {
    state.watcher.stop().await;
    Json(status_of(&state).await)
}

async fn watch_status(State(state): State<AppState>) -> Json<WatchStatusResponse> {
    Json(status_of(&state).await)
}

#[derive(Deserialize)]
pub struct SampleRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

async fn push_sample(State(state): State<AppState>, Json(req): Json<SampleRequest>) -> ApiResult<Json<Value>> {
    let sample = LocationSample {
        point: GeoPoint::new(req.latitude, req.longitude)?,
        accuracy_m: req.accuracy_m,
        timestamp: req.timestamp.unwrap_or_else(Utc::now),
    };
    let delivered = state.feeder.push(sample);
    Ok(Json(json!({ "delivered": delivered })))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct NotificationsResponse {
    pub unread: usize,
    pub items: Vec<NotificationRecord>,
}

async fn list_notifications(State(state): State<AppState>) -> Json<NotificationsResponse> {
    Json(NotificationsResponse {
        unread: state.notifications.unread_count(),
        items: state.notifications.history(),
    })
}

async fn mark_read(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.notifications.mark_read(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn mark_all_read(State(state): State<AppState>) -> StatusCode {
    state.notifications.mark_all_read();
    StatusCode::NO_CONTENT
}

async fn clear_notifications(State(state): State<AppState>) -> StatusCode {
    state.notifications.clear();
    StatusCode::NO_CONTENT
}

// ---------------------------------------------------------------------------
// Reports and offline queue
// ---------------------------------------------------------------------------

async fn submit_report(
    State(state): State<AppState>,
    Json(payload): Json<SubmissionPayload>,
) -> ApiResult<(StatusCode, Json<SubmissionOutcome>)> {
    let outcome = state.pipeline.submit(payload).await?;
    let status = match outcome {
        SubmissionOutcome::Submitted { .. } => StatusCode::CREATED,
        SubmissionOutcome::Queued { .. } => StatusCode::ACCEPTED,
    };
    Ok((status, Json(outcome)))
}

#[derive(Serialize)]
pub struct QueueResponse {
    pub length: usize,
    pub processing: bool,
    pub online: bool,
    pub items: Vec<QueuedSubmission>,
}

async fn list_queue(State(state): State<AppState>) -> Json<QueueResponse> {
    let items = state.queue.items().await;
    Json(QueueResponse {
        length: items.len(),
        processing: state.queue.is_processing(),
        online: state.connectivity.is_online(),
        items,
    })
}

async fn clear_queue(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.queue.clear_queue().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn process_queue(State(state): State<AppState>) -> Json<ProcessSummary> {
    Json(state.queue.process_queue().await)
}

#[derive(Deserialize)]
pub struct ConnectivityRequest {
    pub online: bool,
}

async fn connectivity(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "online": state.connectivity.is_online() }))
}

async fn set_connectivity(State(state): State<AppState>, Json(req): Json<ConnectivityRequest>) -> Json<Value> {
    let changed = state.connectivity.set_online(req.online);
    Json(json!({ "online": req.online, "changed": changed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::state::{AppState, Collaborators};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use geofence::Region;
    use risk_zones::ZoneRegistry;
    use std::sync::Arc;
    use submission_queue::{
        Address, MemoryStore, ReverseGeocoder, SubmissionReceipt, SubmitError, Submitter,
    };
    use tower::ServiceExt;

    struct Offline;

    #[async_trait]
    impl Submitter for Offline {
        async fn submit(&self, _: &SubmissionPayload) -> Result<SubmissionReceipt, SubmitError> {
            Err(SubmitError::Network("connection refused".into()))
        }
    }

    #[async_trait]
    impl ReverseGeocoder for Offline {
        async fn reverse_geocode(&self, _: &GeoPoint) -> Result<Address, SubmitError> {
            Err(SubmitError::Network("connection refused".into()))
        }
    }

    async fn app() -> (Router, AppState) {
        let (state, _replay) = AppState::new(
            Region::pakistan(),
            ZoneRegistry::with_default_zones(),
            Collaborators {
                submitter: Arc::new(Offline),
                geocoder: Arc::new(Offline),
                store: Arc::new(MemoryStore::new()),
            },
            &GatewayConfig::default(),
        )
        .await
        .unwrap();
        (api_routes(state.clone()), state)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_region_check() {
        let (app, _) = app().await;

        let (status, body) = call(&app, "GET", "/region/check?lat=31.5204&lon=74.3587", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["within_region"], true);

        // Amritsar
        let (_, body) = call(&app, "GET", "/region/check?lat=31.634&lon=74.8723", None).await;
        assert_eq!(body["within_region"], false);

        let (status, _) = call(&app, "GET", "/region/check?lat=120&lon=74", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_zone_filters() {
        let (app, _) = app().await;

        let (_, body) = call(&app, "GET", "/zones", None).await;
        assert_eq!(body.as_array().unwrap().len(), 5);

        let (_, body) = call(&app, "GET", "/zones?risk_level=HIGH", None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) = call(&app, "GET", "/zones?q=lahore", None).await;
        assert_eq!(body[0]["id"], "2");

        let (status, _) = call(&app, "GET", "/zones?lat=24.86", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_watch_lifecycle_over_http() {
        let (app, _) = app().await;

        let (status, body) = call(&app, "POST", "/watch/start", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");
        call(&app, "POST", "/watch/start", None).await;

        let (_, body) = call(&app, "GET", "/watch/status", None).await;
        assert_eq!(body["subscriptions"], 1);

        let (_, body) = call(
            &app,
            "POST",
            "/watch/samples",
            Some(json!({"latitude": 24.8607, "longitude": 67.0011})),
        )
        .await;
        assert_eq!(body["delivered"], 1);

        let (_, body) = call(&app, "POST", "/watch/stop", None).await;
        assert_eq!(body["status"], "stopped");
        assert_eq!(body["subscriptions"], 0);
    }

    #[tokio::test]
    async fn test_denied_permission_is_forbidden() {
        let (app, state) = app().await;
        state
            .sensor
            .set_permission(zone_watch::PermissionScope::Foreground, false);

        let (status, _) = call(&app, "POST", "/watch/start", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_reports_queue_when_backend_unreachable() {
        let (app, _) = app().await;
        let report = json!({
            "kind": "location",
            "province": "Punjab",
            "city": "Lahore",
            "latitude": 31.5204,
            "longitude": 74.3587
        });

        let (status, body) = call(&app, "POST", "/reports", Some(report)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["outcome"], "queued");

        let (_, body) = call(&app, "GET", "/queue", None).await;
        assert_eq!(body["length"], 1);
        // geocoding failed, so the coordinates stand in for the street
        assert_eq!(body["items"][0]["payload"]["street_address"], "31.520400, 74.358700");

        let (status, _) = call(&app, "DELETE", "/queue", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, body) = call(&app, "GET", "/queue", None).await;
        assert_eq!(body["length"], 0);
    }

    #[tokio::test]
    async fn test_report_outside_region_rejected() {
        let (app, _) = app().await;
        let report = json!({
            "kind": "location",
            "province": "Punjab",
            "city": "Amritsar",
            "latitude": 31.634,
            "longitude": 74.8723
        });
        let (status, body) = call(&app, "POST", "/reports", Some(report)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Invalid location");

        let (_, body) = call(&app, "GET", "/queue", None).await;
        assert_eq!(body["length"], 0);
    }

    #[tokio::test]
    async fn test_offline_processing_is_skipped() {
        let (app, _) = app().await;
        let (_, body) = call(&app, "POST", "/connectivity", Some(json!({"online": false}))).await;
        assert_eq!(body["changed"], true);

        let (_, body) = call(&app, "POST", "/queue/process", None).await;
        assert_eq!(body["status"], "offline");
    }
}
