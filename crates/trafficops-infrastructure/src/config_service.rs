//! Configuration service implementation.
//!
//! Loads `ClientConfig` from `config.toml` and applies environment overrides.

use crate::paths::TrafficOpsPaths;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use trafficops_core::config::ClientConfig;
use trafficops_core::error::{Result, TrafficOpsError};

/// Environment variable overriding `api_base_url`.
pub const API_URL_ENV: &str = "TRAFFICOPS_API_URL";

/// Configuration service that loads and caches the client configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: TrafficOpsPaths,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<ClientConfig>>>,
}

impl ConfigService {
    pub fn new(base_path: Option<&Path>) -> Self {
        Self {
            paths: TrafficOpsPaths::new(base_path),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// A missing file yields defaults. A file that exists but does not parse
    /// is reported as `TrafficOpsError::Config`.
    pub async fn get_config(&self) -> Result<ClientConfig> {
        {
            let cached = self.config.read().await;
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let mut loaded = self.load_from_file().await?;
        if let Ok(url) = env::var(API_URL_ENV) {
            apply_api_url_override(&mut loaded, &url);
        }

        *self.config.write().await = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub async fn invalidate_cache(&self) {
        *self.config.write().await = None;
    }

    async fn load_from_file(&self) -> Result<ClientConfig> {
        let path = self.paths.config_file()?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    "[ConfigService] No config at {}, using defaults",
                    path.display()
                );
                return Ok(ClientConfig::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config = toml::from_str::<ClientConfig>(&content).map_err(|e| {
            TrafficOpsError::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        tracing::info!("[ConfigService] Loaded config from {}", path.display());
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new(None)
    }
}

fn apply_api_url_override(config: &mut ClientConfig, url: &str) {
    let url = url.trim();
    if !url.is_empty() {
        config.api_base_url = url.to_string();
    }
}
