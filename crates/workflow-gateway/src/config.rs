//! Gateway configuration
//!
//! Stored as `gateway.json` in a caller-chosen directory. Every field has a
//! default, so a partial file (or no file at all) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::defaults;

/// Which storage backend a configuration selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSelection {
    /// Remote workflow server at the given base URL
    Http(String),
    /// One JSON file per document in a local directory
    File(PathBuf),
    /// Process-local storage, lost on exit
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Base URL of the workflow server (e.g., "http://localhost:8000/api")
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Per-node delay used by the local simulated executor
    pub simulated_step_ms: u64,
    /// Directory for file-backed storage
    pub storage_dir: Option<PathBuf>,
    /// Undo history depth for editor sessions
    pub history_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            simulated_step_ms: defaults::SIMULATED_STEP_MS,
            storage_dir: None,
            history_capacity: defaults::HISTORY_CAPACITY,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from disk, or return defaults if not found
    pub async fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(defaults::CONFIG_FILE);

        if !config_path.exists() {
            log::debug!("No gateway config at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .await
            .map_err(ConfigError::Io)?;

        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save configuration to disk
    pub async fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        // Ensure directory exists
        fs::create_dir_all(config_dir)
            .await
            .map_err(ConfigError::Io)?;

        let config_path = config_dir.join(defaults::CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        fs::write(&config_path, contents)
            .await
            .map_err(ConfigError::Io)?;

        log::info!("Gateway configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Pick the backend: a base URL wins over a storage directory
    pub fn backend_selection(&self) -> BackendSelection {
        match (&self.base_url, &self.storage_dir) {
            (Some(url), _) if !url.trim().is_empty() => {
                BackendSelection::Http(url.trim_end_matches('/').to_string())
            }
            (_, Some(dir)) => BackendSelection::File(dir.clone()),
            _ => BackendSelection::Memory,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn simulated_step(&self) -> Duration {
        Duration::from_millis(self.simulated_step_ms)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GatewayConfig::load(dir.path()).await.unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.backend_selection(), BackendSelection::Memory);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = GatewayConfig {
            storage_dir: Some(dir.path().join("workflows")),
            history_capacity: 20,
            ..Default::default()
        };
        config.save(dir.path()).await.unwrap();

        let loaded = GatewayConfig::load(dir.path()).await.unwrap();
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.backend_selection(),
            BackendSelection::File(dir.path().join("workflows"))
        );
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("gateway.json"),
            r#"{"baseUrl": "http://localhost:8000/api/"}"#,
        )
        .unwrap();

        let config = GatewayConfig::load(dir.path()).await.unwrap();
        assert_eq!(config.poll_interval_ms, defaults::POLL_INTERVAL_MS);
        assert_eq!(
            config.backend_selection(),
            BackendSelection::Http("http://localhost:8000/api".to_string())
        );
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gateway.json"), "{not json").unwrap();
        let err = GatewayConfig::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
