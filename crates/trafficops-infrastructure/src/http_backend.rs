//! RestTrafficBackend - reqwest implementation of `TrafficBackend`.
//!
//! Configuration priority for the bearer token: secret.json > environment
//! variables. The base URL comes from `config.toml` or `TRAFFICOPS_API_URL`.

use crate::config_service::ConfigService;
use crate::dto::{
    ActiveAlgorithmsResponse, ActiveSessionInfoResponse, PreprocessRequest, RunModelRequest,
    RunModelResponse, SessionIdResponse, SessionStatusResponse, parse_envelope,
};
use crate::secret_service::SecretService;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use std::time::Duration;
use trafficops_core::analysis::{ActiveAlgorithm, ModelRunParameters, ModelRunReport};
use trafficops_core::backend::TrafficBackend;
use trafficops_core::config::HttpConfig;
use trafficops_core::error::{Result, TrafficOpsError};
use trafficops_core::session::{ActiveSessionInfo, SelectedFile, SessionId, SessionSnapshot};

/// Backend client talking to the traffic REST API.
#[derive(Clone)]
pub struct RestTrafficBackend {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    request_timeout: Duration,
    /// Preprocess and model runs do their work inside the request
    long_request_timeout: Duration,
}

impl RestTrafficBackend {
    pub fn new(base_url: impl Into<String>, api_token: Option<String>, http: &HttpConfig) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            api_token,
            request_timeout: Duration::from_secs(http.request_timeout_secs),
            long_request_timeout: Duration::from_secs(http.preprocess_timeout_secs),
        }
    }

    /// Builds a backend from config.toml and secret.json.
    pub async fn from_services(config: &ConfigService, secrets: &SecretService) -> Result<Self> {
        let config = config.get_config().await?;
        let api_token = secrets.api_token().await?;
        tracing::info!(
            "[RestTrafficBackend] Using {} ({})",
            config.api_base_url,
            if api_token.is_some() {
                "authenticated"
            } else {
                "unauthenticated"
            }
        );
        Ok(Self::new(config.api_base_url, api_token, &config.http))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `path` followed by the session id as one escaped path segment.
    fn session_url(&self, path: &str, session_id: &SessionId) -> Result<Url> {
        let mut url = Url::parse(&self.url(path))
            .map_err(|e| TrafficOpsError::config(format!("Invalid API URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| TrafficOpsError::config(format!("API URL {} cannot have a path", self.base_url)))?
            .push(session_id.as_str());
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Sends a request and validates its envelope.
    async fn send<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("[RestTrafficBackend] {} request failed: {}", operation, e);
            TrafficOpsError::transport(format!("{} request failed: {}", operation, e))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            TrafficOpsError::transport(format!("Failed to read {} response: {}", operation, e))
        })?;

        let parsed = parse_envelope::<T>(status.as_u16(), &body);
        if let Err(e) = &parsed {
            tracing::debug!("[RestTrafficBackend] {} ({}) -> {}", operation, status, e);
        }
        parsed
    }

    async fn upload_file(&self, path: &str, session_id: &SessionId, file: &SelectedFile) -> Result<()> {
        let bytes = tokio::fs::read(&file.path).await.map_err(|e| {
            TrafficOpsError::io(format!("Failed to read {}: {}", file.path.display(), e))
        })?;
        tracing::debug!(
            "[RestTrafficBackend] Uploading {} ({} bytes) to session {}",
            file.file_name,
            bytes.len(),
            session_id
        );

        let form = Form::new()
            .text("session_id", session_id.to_string())
            .part("file", Part::bytes(bytes).file_name(file.file_name.clone()));

        let request = self
            .authorized(self.client.post(self.url(path)))
            .multipart(form)
            .timeout(self.long_request_timeout);

        self.send::<IgnoredAny>(file.kind.label(), request).await?;
        Ok(())
    }
}

#[async_trait]
impl TrafficBackend for RestTrafficBackend {
    async fn create_session(&self) -> Result<SessionId> {
        let request = self
            .authorized(self.client.post(self.url("/api/upload/create-session")))
            .timeout(self.request_timeout);
        let response: SessionIdResponse = self.send("create session", request).await?;
        tracing::info!("[RestTrafficBackend] Created session {}", response.session_id);
        Ok(SessionId::new(response.session_id))
    }

    async fn upload_road_network(&self, session_id: &SessionId, file: &SelectedFile) -> Result<()> {
        self.upload_file("/api/upload/road-network", session_id, file).await
    }

    async fn upload_gps_trajectories(
        &self,
        session_id: &SessionId,
        file: &SelectedFile,
    ) -> Result<()> {
        self.upload_file("/api/upload/gps-trajectories", session_id, file).await
    }

    async fn trigger_preprocessing(&self, session_id: &SessionId) -> Result<()> {
        let request = self
            .authorized(self.client.post(self.url("/api/upload/preprocess")))
            .json(&PreprocessRequest {
                session_id: session_id.as_str(),
            })
            .timeout(self.long_request_timeout);
        self.send::<IgnoredAny>("preprocess", request).await?;
        Ok(())
    }

    async fn session_status(&self, session_id: &SessionId) -> Result<SessionSnapshot> {
        let request = self
            .client
            .get(self.session_url("/api/upload/session-status", session_id)?)
            .timeout(self.request_timeout);
        let response: SessionStatusResponse = self.send("session status", request).await?;
        response.session.try_into()
    }

    async fn active_algorithms(&self) -> Result<Vec<ActiveAlgorithm>> {
        let request = self
            .client
            .get(self.url("/api/algorithms/active"))
            .timeout(self.request_timeout);
        let response: ActiveAlgorithmsResponse = self.send("active algorithms", request).await?;
        Ok(response.algorithms)
    }

    async fn run_model(
        &self,
        session_id: &SessionId,
        params: &ModelRunParameters,
    ) -> Result<ModelRunReport> {
        let body = RunModelRequest {
            session_id: session_id.as_str(),
            k: params.k(),
            time_horizon: params.time_horizon().minutes(),
            model_type: params.model_type(),
        };
        let request = self
            .authorized(self.client.post(self.url("/api/bottlenecks/run-model")))
            .json(&body)
            .timeout(self.long_request_timeout);
        let response: RunModelResponse = self.send("run model", request).await?;
        Ok(response.into())
    }

    async fn active_session_info(&self) -> Result<ActiveSessionInfo> {
        let request = self
            .client
            .get(self.url("/api/upload/active-session-info"))
            .timeout(self.request_timeout);
        let response: ActiveSessionInfoResponse = self.send("active session info", request).await?;
        response.try_into()
    }

    async fn restore_sample_session(&self) -> Result<SessionId> {
        let request = self
            .authorized(self.client.post(self.url("/api/upload/restore-preinserted")))
            .timeout(self.request_timeout);
        let response: SessionIdResponse = self.send("restore sample session", request).await?;
        Ok(SessionId::new(response.session_id))
    }
}
