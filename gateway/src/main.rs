use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use clap::Parser;
use geofence::Region;
use risk_zones::ZoneRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use submission_queue::FileStore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod backend;
mod config;
mod error;
mod routes;
mod state;

use backend::{HttpBackend, NominatimGeocoder};
use config::GatewayConfig;
use state::{AppState, Collaborators};

#[derive(Parser, Debug)]
#[command(name = "geofence-gateway")]
#[command(about = "Geofencing and location validation gateway")]
struct Args {
    /// JSON config file
    #[arg(short, long, env = "GEOFENCE_CONFIG")]
    config: Option<PathBuf>,

    #[arg(short, long, env = "GEOFENCE_PORT")]
    port: Option<u16>,

    /// Directory for the persisted offline queue
    #[arg(long, env = "GEOFENCE_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Incident backend base URL
    #[arg(long, env = "GEOFENCE_BACKEND_URL")]
    backend_url: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "geofence_gateway=trace,zone_watch=debug,submission_queue=debug,info"
    } else {
        "geofence_gateway=debug,info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = GatewayConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = args.store_dir {
        config.store_dir = dir;
    }
    if let Some(url) = args.backend_url {
        config.backend.base_url = url;
    }

    let region = load_region(&config)?;
    tracing::info!("   Region: {} ({} border points)", region.name, region.border.len());

    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let zones = load_zones(&config, backend.as_ref()).await?;
    tracing::info!("   Loaded {} risk zones", zones.len());

    let store = FileStore::open(&config.store_dir)
        .await
        .with_context(|| format!("opening store at {}", config.store_dir.display()))?;
    tracing::info!("   Offline queue stored in {}", config.store_dir.display());

    let collaborators = Collaborators {
        submitter: backend,
        geocoder: Arc::new(NominatimGeocoder::new(&config.geocoder)?),
        store: Arc::new(store),
    };
    let (state, replay) = AppState::new(region, zones, collaborators, &config).await?;

    let pending = state.queue.len().await;
    if pending > 0 {
        tracing::info!("   {} queued submissions waiting for replay", pending);
        let queue = state.queue.clone();
        tokio::spawn(async move {
            let summary = queue.process_queue().await;
            tracing::info!("Startup replay: {:?}", summary);
        });
    }

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Geofence Gateway starting on {}", addr);
    tracing::info!("   Backend: {}", config.backend.base_url);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.watcher.stop().await;
    replay.abort();
    tracing::info!("Gateway stopped");

    Ok(())
}

fn load_region(config: &GatewayConfig) -> Result<Region> {
    match &config.region_geojson {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading region border {}", path.display()))?;
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Region".to_string());
            Region::from_geojson(name, None, &text)
                .with_context(|| format!("parsing region border {}", path.display()))
        }
        None => Ok(Region::pakistan()),
    }
}

async fn load_zones(config: &GatewayConfig, backend: &HttpBackend) -> Result<ZoneRegistry> {
    if let Some(path) = &config.zones.file {
        return ZoneRegistry::from_json_file(path)
            .with_context(|| format!("loading zones from {}", path.display()));
    }
    if config.zones.fetch_from_backend {
        match ZoneRegistry::fetch(backend).await {
            Ok(zones) => return Ok(zones),
            Err(e) => tracing::warn!("Zone fetch failed, using reference zones: {}", e),
        }
    }
    Ok(ZoneRegistry::with_default_zones())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown requested");
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "geofence-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
