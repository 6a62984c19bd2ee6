//! Upload, preprocess and analyze workflow.
//!
//! `AnalysisWorkflow` owns one `UploadSession` for the lifetime of one view.
//! It wires the upload coordinator, status poller, algorithm gate and run
//! trigger together and guarantees at most one running poll.

use crate::algorithm_gate::{AlgorithmGate, Availability};
use crate::model_run::{ModelRunTrigger, RunRequest};
use crate::scheduler::PollScheduler;
use crate::status_poller::{AbortReason, PollHandle, PollObserver, PollOutcome};
use crate::upload_coordinator::UploadCoordinator;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use trafficops_core::analysis::{Navigator, ResultsRoute};
use trafficops_core::backend::TrafficBackend;
use trafficops_core::error::{Result, TrafficOpsError};
use trafficops_core::notification::{Notification, Notifier};
use trafficops_core::session::{
    FileKind, SelectedFile, SessionId, SessionStatus, UploadSession,
};

/// Tunables taken from the client configuration.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub max_poll_attempts: Option<u32>,
    pub default_model_type: String,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_poll_attempts: None,
            default_model_type: "LIM".to_string(),
        }
    }
}

/// Collaborators injected into a workflow.
pub struct WorkflowDeps {
    pub backend: Arc<dyn TrafficBackend>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
    pub scheduler: Arc<dyn PollScheduler>,
}

/// One view's worth of upload/preprocess/analyze state.
///
/// Dropping the workflow cancels any running poll. After
/// [`teardown`](Self::teardown) no new poll is ever started.
pub struct AnalysisWorkflow {
    backend: Arc<dyn TrafficBackend>,
    notifier: Arc<dyn Notifier>,
    scheduler: Arc<dyn PollScheduler>,
    session: Arc<RwLock<UploadSession>>,
    uploads: UploadCoordinator,
    gate: AlgorithmGate,
    trigger: ModelRunTrigger,
    poll: Mutex<Option<PollHandle>>,
    torn_down: CancellationToken,
    settings: WorkflowSettings,
}

impl AnalysisWorkflow {
    pub fn new(deps: WorkflowDeps, settings: WorkflowSettings) -> Self {
        let WorkflowDeps {
            backend,
            notifier,
            navigator,
            scheduler,
        } = deps;

        Self {
            uploads: UploadCoordinator::new(backend.clone(), notifier.clone()),
            gate: AlgorithmGate::new(
                backend.clone(),
                notifier.clone(),
                settings.default_model_type.clone(),
            ),
            trigger: ModelRunTrigger::new(backend.clone(), notifier.clone(), navigator),
            session: Arc::new(RwLock::new(UploadSession::new())),
            poll: Mutex::new(None),
            torn_down: CancellationToken::new(),
            backend,
            notifier,
            scheduler,
            settings,
        }
    }

    /// Loads the active algorithm set. Call once when the view opens.
    pub async fn mount(&self) -> Availability {
        self.gate.refresh().await
    }

    /// A copy of the current session state.
    pub async fn session(&self) -> UploadSession {
        self.session.read().await.clone()
    }

    pub fn gate(&self) -> &AlgorithmGate {
        &self.gate
    }

    // ============================================================================
    // Upload
    // ============================================================================

    pub async fn select_road_network_file(&self, path: impl Into<PathBuf>) -> Result<SelectedFile> {
        self.select_file(FileKind::RoadNetwork, path.into()).await
    }

    pub async fn select_gps_file(&self, path: impl Into<PathBuf>) -> Result<SelectedFile> {
        self.select_file(FileKind::GpsTrajectories, path.into()).await
    }

    /// A new selection discards the server session, so its poll goes too.
    async fn select_file(&self, kind: FileKind, path: PathBuf) -> Result<SelectedFile> {
        let file = self.uploads.select_file(&self.session, kind, path).await?;
        if self.session.read().await.id().is_none() {
            self.stop_polling().await;
        }
        Ok(file)
    }

    /// Uploads both files into a brand-new session.
    ///
    /// Any poll of a previous session is stopped first.
    pub async fn upload_all(&self) -> Result<SessionId> {
        self.ensure_not_uploading().await?;
        self.stop_polling().await;
        self.uploads.upload_all(&self.session).await
    }

    // ============================================================================
    // Preprocessing
    // ============================================================================

    /// Triggers preprocessing and starts polling for its completion.
    ///
    /// The status becomes `preprocessing` immediately and reverts to
    /// `uploaded` if the trigger call fails.
    pub async fn start_preprocessing(&self) -> Result<()> {
        if self.torn_down.is_cancelled() {
            return Err(TrafficOpsError::invalid_state("Workflow has been torn down"));
        }
        let begun = self.session.write().await.begin_preprocessing();
        let session_id = match begun {
            Ok(id) => id,
            Err(e) => {
                self.notifier.notify(Notification::error(e.user_message()));
                return Err(e);
            }
        };

        self.stop_polling().await;
        self.notifier
            .notify(Notification::info(format!("Preprocessing session {}", session_id)));

        if let Err(e) = self.backend.trigger_preprocessing(&session_id).await {
            tracing::error!("[AnalysisWorkflow] Preprocess trigger failed: {}", e);
            let mut session = self.session.write().await;
            if session.id() == Some(&session_id) {
                session.revert_preprocessing();
            }
            drop(session);
            self.notifier.notify(Notification::error(format!(
                "Preprocessing failed to start: {}",
                e.user_message()
            )));
            return Err(e);
        }

        self.start_polling(session_id).await
    }

    /// Starts a fresh poll for a session still in `preprocessing`.
    ///
    /// Used after a poll was aborted by a failed status check.
    pub async fn resume_polling(&self) -> Result<()> {
        if self.torn_down.is_cancelled() {
            return Err(TrafficOpsError::invalid_state("Workflow has been torn down"));
        }
        let session_id = {
            let session = self.session.read().await;
            if session.status() != SessionStatus::Preprocessing {
                return Err(TrafficOpsError::invalid_state(format!(
                    "Cannot resume polling from status {}",
                    session.status()
                )));
            }
            session
                .id()
                .cloned()
                .ok_or_else(|| TrafficOpsError::invalid_state("Session has no id"))?
        };
        if self.is_polling().await {
            return Err(TrafficOpsError::invalid_state(format!(
                "Already polling session {}",
                session_id
            )));
        }
        self.start_polling(session_id).await
    }

    async fn start_polling(&self, session_id: SessionId) -> Result<()> {
        {
            let session = self.session.read().await;
            if session.id() != Some(&session_id)
                || session.status() != SessionStatus::Preprocessing
            {
                tracing::debug!(
                    "[AnalysisWorkflow] Session changed before polling {} started",
                    session_id
                );
                return Ok(());
            }
        }

        // checked under the poll lock; teardown cancels before taking it
        let mut poll = self.poll.lock().await;
        if self.torn_down.is_cancelled() {
            tracing::debug!(
                "[AnalysisWorkflow] Torn down; not polling {}",
                session_id
            );
            return Ok(());
        }

        let observer = Arc::new(SessionPollObserver {
            session: Arc::clone(&self.session),
            notifier: Arc::clone(&self.notifier),
        });
        let handle = PollHandle::spawn(
            Arc::clone(&self.backend),
            self.scheduler.as_ref(),
            session_id,
            self.settings.max_poll_attempts,
            observer,
        );

        let previous = poll.replace(handle);
        drop(poll);
        if let Some(previous) = previous {
            previous.shutdown().await;
        }
        Ok(())
    }

    /// Waits for the current poll to end. Returns `None` if none was started.
    pub async fn wait_for_preprocessing(&self) -> Option<PollOutcome> {
        let watch = self.poll.lock().await.as_ref().map(PollHandle::watch)?;
        Some(watch.outcome().await)
    }

    pub async fn is_polling(&self) -> bool {
        self.poll
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    async fn stop_polling(&self) {
        let handle = self.poll.lock().await.take();
        if let Some(handle) = handle {
            tracing::debug!("[AnalysisWorkflow] Stopping poll of {}", handle.session_id());
            handle.shutdown().await;
        }
    }

    // ============================================================================
    // Analysis
    // ============================================================================

    /// Targets a session that already exists on the backend.
    ///
    /// Rejected while an upload is in flight.
    pub async fn attach_existing(&self, session_id: SessionId) -> Result<UploadSession> {
        self.ensure_not_uploading().await?;
        self.stop_polling().await;
        let snapshot = match self.backend.session_status(&session_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.notifier.notify(Notification::error(e.user_message()));
                return Err(e);
            }
        };
        let observed = UploadSession::observed(session_id.clone(), &snapshot);
        {
            let mut session = self.session.write().await;
            if session.is_uploading() {
                drop(session);
                return Err(self.upload_in_progress());
            }
            *session = observed.clone();
        }

        if observed.status() == SessionStatus::Preprocessing {
            self.start_polling(session_id).await?;
        }
        Ok(observed)
    }

    async fn ensure_not_uploading(&self) -> Result<()> {
        if self.session.read().await.is_uploading() {
            return Err(self.upload_in_progress());
        }
        Ok(())
    }

    fn upload_in_progress(&self) -> TrafficOpsError {
        let e = TrafficOpsError::invalid_state("An upload is already in progress");
        self.notifier.notify(Notification::error(e.user_message()));
        e
    }

    /// Runs the bottleneck model on the current session.
    pub async fn run_model(&self, request: &RunRequest) -> Result<ResultsRoute> {
        let session = self.session().await;
        self.trigger.run(&session, &self.gate, request).await
    }

    /// Stops background work for good. Safe to call more than once.
    pub async fn teardown(&self) {
        self.torn_down.cancel();
        self.stop_polling().await;
    }
}

/// Applies poll outcomes to the workflow's session.
struct SessionPollObserver {
    session: Arc<RwLock<UploadSession>>,
    notifier: Arc<dyn Notifier>,
}

#[async_trait]
impl PollObserver for SessionPollObserver {
    async fn on_outcome(&self, session_id: &SessionId, outcome: &PollOutcome) {
        let mut session = self.session.write().await;
        if session.id() != Some(session_id) {
            tracing::debug!("[AnalysisWorkflow] Ignoring outcome for stale session {}", session_id);
            return;
        }

        let notification = match outcome {
            PollOutcome::Ready(stats) => match session.mark_ready(stats.clone()) {
                Ok(()) => Notification::success(format!(
                    "Preprocessing complete: {} roads, {} GPS points{}",
                    stats.road_count,
                    stats.gps_point_count,
                    stats
                        .processing_seconds
                        .map(|secs| format!(" in {:.2}s", secs))
                        .unwrap_or_default()
                )),
                Err(e) => Notification::error(e.user_message()),
            },
            PollOutcome::Failed(message) => match session.mark_failed(message.clone()) {
                Ok(()) => Notification::error(
                    TrafficOpsError::PreprocessingFailed(message.clone()).to_string(),
                ),
                Err(e) => Notification::error(e.user_message()),
            },
            PollOutcome::Aborted(AbortReason::Cancelled) => return,
            PollOutcome::Aborted(reason @ AbortReason::AttemptsExhausted(_)) => {
                Notification::warning(format!("Stopped waiting: {}", reason))
            }
            PollOutcome::Aborted(
                reason @ (AbortReason::Transport(_) | AbortReason::Internal(_)),
            ) => Notification::error(format!("Stopped waiting: {}", reason)),
        };
        drop(session);
        self.notifier.notify(notification);
    }
}
