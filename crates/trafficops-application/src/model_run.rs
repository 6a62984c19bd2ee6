//! Model run trigger.

use crate::algorithm_gate::{AlgorithmGate, NO_ACTIVE_ALGORITHMS};
use std::sync::Arc;
use trafficops_core::analysis::{ModelRunParameters, Navigator, ResultsRoute};
use trafficops_core::backend::TrafficBackend;
use trafficops_core::error::{Result, TrafficOpsError};
use trafficops_core::notification::{Notification, Notifier};
use trafficops_core::session::{SessionId, SessionStatus, UploadSession};

/// Raw run inputs as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub k: u32,
    /// Minutes
    pub time_horizon: u32,
    /// `None` uses the gate's current selection
    pub model_type: Option<String>,
}

/// Runs the bottleneck model once every precondition holds.
///
/// Nothing is sent to the backend unless the session is `ready`, the
/// active-algorithm set is non-empty, the model type is in that set and
/// the parameters are in range.
pub struct ModelRunTrigger {
    backend: Arc<dyn TrafficBackend>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl ModelRunTrigger {
    pub fn new(
        backend: Arc<dyn TrafficBackend>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            backend,
            notifier,
            navigator,
        }
    }

    pub async fn run(
        &self,
        session: &UploadSession,
        gate: &AlgorithmGate,
        request: &RunRequest,
    ) -> Result<ResultsRoute> {
        let checked = self.check(session, gate, request).await;
        let (session_id, params) = match checked {
            Ok(ready) => ready,
            Err(e) => {
                tracing::warn!("[ModelRunTrigger] Run rejected: {}", e);
                self.notifier.notify(Notification::error(e.user_message()));
                return Err(e);
            }
        };

        tracing::info!(
            "[ModelRunTrigger] Running {} on {} (k={}, horizon={})",
            params.model_type(),
            session_id,
            params.k(),
            params.time_horizon()
        );

        match self.backend.run_model(&session_id, &params).await {
            Ok(report) => {
                let route = ResultsRoute::new(session_id, &params);
                self.notifier.notify(Notification::success(format!(
                    "Found {} bottlenecks{}",
                    report.bottlenecks.len(),
                    if report.cached { " (cached)" } else { "" }
                )));
                self.navigator.navigate(&route, &report);
                Ok(route)
            }
            Err(e) => {
                tracing::error!("[ModelRunTrigger] Run failed: {}", e);
                self.notifier.notify(Notification::error(e.user_message()));
                Err(e)
            }
        }
    }

    async fn check(
        &self,
        session: &UploadSession,
        gate: &AlgorithmGate,
        request: &RunRequest,
    ) -> Result<(SessionId, ModelRunParameters)> {
        if session.status() != SessionStatus::Ready {
            return Err(TrafficOpsError::invalid_state(format!(
                "Session is not ready. Current status: {}",
                session.status()
            )));
        }
        let session_id = session
            .id()
            .cloned()
            .ok_or_else(|| TrafficOpsError::invalid_state("Session has no id"))?;

        if gate.disabled_reason().await.is_some() {
            return Err(TrafficOpsError::invalid_state(NO_ACTIVE_ALGORITHMS));
        }

        let model_type = match &request.model_type {
            Some(model_type) => model_type.clone(),
            None => gate
                .selected_model_type()
                .await
                .ok_or_else(|| TrafficOpsError::invalid_state(NO_ACTIVE_ALGORITHMS))?,
        };
        if !gate.is_active(&model_type).await {
            return Err(TrafficOpsError::validation(format!(
                "Model type {} is not currently active",
                model_type
            )));
        }

        let params = ModelRunParameters::new(request.k, request.time_horizon, model_type)?;
        Ok((session_id, params))
    }
}
