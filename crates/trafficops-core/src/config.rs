//! Client configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer. Every field has a
//! default so a missing or partial file is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

/// Root of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub defaults: RunDefaults,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            polling: PollingConfig::default(),
            http: HttpConfig::default(),
            defaults: RunDefaults::default(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

/// Status polling cadence.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Abort after this many status fetches without a terminal state.
    /// `None` or `0` polls until `ready` or `failed`.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: None,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// `max_attempts` with `0` read as unlimited.
    pub fn attempt_limit(&self) -> Option<u32> {
        self.max_attempts.filter(|max| *max > 0)
    }
}

fn default_interval_ms() -> u64 {
    2000
}

/// HTTP timeouts.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// The preprocess trigger may block server-side until work completes
    #[serde(default = "default_preprocess_timeout_secs")]
    pub preprocess_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            preprocess_timeout_secs: default_preprocess_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_preprocess_timeout_secs() -> u64 {
    600
}

/// Initial values for the run parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RunDefaults {
    #[serde(default = "default_k")]
    pub k: u32,
    #[serde(default = "default_time_horizon")]
    pub time_horizon: u32,
    #[serde(default = "default_model_type")]
    pub model_type: String,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            k: default_k(),
            time_horizon: default_time_horizon(),
            model_type: default_model_type(),
        }
    }
}

fn default_k() -> u32 {
    10
}

fn default_time_horizon() -> u32 {
    30
}

fn default_model_type() -> String {
    "LIM".to_string()
}

/// Contents of `secret.json`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretConfig {
    /// Bearer token for upload, preprocess and run calls
    #[serde(default)]
    pub api_token: Option<String>,
}
