//! Gateway configuration
//!
//! Every field has a default so the service starts with no file at all.
//! Command-line flags and environment variables override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use submission_queue::{PipelineConfig, QueueConfig};
use zone_watch::WatchConfig;

pub const DEFAULT_PORT: u16 = 18610;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub port: u16,
    /// Directory for the persisted offline queue
    pub store_dir: PathBuf,
    /// Whether the session starts online
    pub start_online: bool,
    pub backend: BackendConfig,
    pub geocoder: GeocoderConfig,
    pub zones: ZonesConfig,
    /// GeoJSON Polygon replacing the built-in Pakistan border
    pub region_geojson: Option<PathBuf>,
    pub watch: WatchConfig,
    pub queue: QueueConfig,
    pub pipeline: PipelineConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            store_dir: PathBuf::from(".geofence-store"),
            start_online: true,
            backend: BackendConfig::default(),
            geocoder: GeocoderConfig::default(),
            zones: ZonesConfig::default(),
            region_geojson: None,
            watch: WatchConfig::default(),
            queue: QueueConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Incident reporting backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Bearer token, if the backend requires one
    pub auth_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_sec: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            auth_token: None,
            timeout_sec: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_sec: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: format!("geofence-gateway/{}", env!("CARGO_PKG_VERSION")),
            timeout_sec: 10,
        }
    }
}

/// Where the risk zone registry comes from; first match wins:
/// file, then backend fetch, then the built-in reference zones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonesConfig {
    pub file: Option<PathBuf>,
    pub fetch_from_backend: bool,
}

impl GatewayConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_file() {
        let config = GatewayConfig::load(None).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.queue.max_retries, 3);
        assert_eq!(config.watch.interval_ms, 5000);
    }

    #[test]
    fn test_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"port": 9000, "backend": {{"base_url": "http://backend:8000/api"}}, "queue": {{"max_retries": 5}}}}"#
        )
        .unwrap();

        let config = GatewayConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.backend.base_url, "http://backend:8000/api");
        assert_eq!(config.backend.timeout_sec, 30);
        assert_eq!(config.queue.max_retries, 5);
        assert_eq!(config.queue.storage_key, "offline_queue");
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(GatewayConfig::load(Some(file.path())).is_err());
    }
}
