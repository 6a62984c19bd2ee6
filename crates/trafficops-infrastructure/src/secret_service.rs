//! Secret service implementation.
//!
//! Resolves the bearer token for the backend.
//!
//! Configuration priority: secret.json > environment variables

use crate::paths::TrafficOpsPaths;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use trafficops_core::config::SecretConfig;
use trafficops_core::error::{Result, TrafficOpsError};

/// Environment variable consulted when secret.json carries no token.
pub const API_TOKEN_ENV: &str = "TRAFFICOPS_API_TOKEN";

/// Service for reading secret.json.
///
/// The parsed file is cached; a missing file counts as empty.
#[derive(Debug, Clone)]
pub struct SecretService {
    paths: TrafficOpsPaths,
    secrets: Arc<RwLock<Option<SecretConfig>>>,
}

impl SecretService {
    pub fn new(base_path: Option<&Path>) -> Self {
        Self {
            paths: TrafficOpsPaths::new(base_path),
            secrets: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn load_secrets(&self) -> Result<SecretConfig> {
        {
            let cached = self.secrets.read().await;
            if let Some(secrets) = cached.as_ref() {
                return Ok(secrets.clone());
            }
        }

        let path = self.paths.secret_file()?;
        let loaded = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str::<SecretConfig>(&content).map_err(|e| {
                TrafficOpsError::config(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SecretConfig::default(),
            Err(e) => return Err(e.into()),
        };

        *self.secrets.write().await = Some(loaded.clone());
        Ok(loaded)
    }

    /// Returns the bearer token, if any.
    ///
    /// Priority:
    /// 1. secret.json `api_token`
    /// 2. `TRAFFICOPS_API_TOKEN`
    pub async fn api_token(&self) -> Result<Option<String>> {
        let secrets = self.load_secrets().await?;
        let token = non_empty(secrets.api_token).or_else(|| non_empty(env::var(API_TOKEN_ENV).ok()));
        if token.is_none() {
            tracing::debug!("[SecretService] No API token configured; requests are unauthenticated");
        }
        Ok(token)
    }
}

impl Default for SecretService {
    fn default() -> Self {
        Self::new(None)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
