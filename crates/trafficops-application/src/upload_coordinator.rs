//! Upload coordinator: file selection and the three-call upload sequence.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use trafficops_core::backend::TrafficBackend;
use trafficops_core::error::{Result, TrafficOpsError};
use trafficops_core::notification::{Notification, Notifier};
use trafficops_core::session::{FileKind, SelectedFile, SessionId, UploadSession, UploadStep};

/// Materializes one backend session holding both input files.
///
/// The session lock is never held across a network call; each step takes
/// it briefly to record progress.
pub struct UploadCoordinator {
    backend: Arc<dyn TrafficBackend>,
    notifier: Arc<dyn Notifier>,
}

impl UploadCoordinator {
    pub fn new(backend: Arc<dyn TrafficBackend>, notifier: Arc<dyn Notifier>) -> Self {
        Self { backend, notifier }
    }

    /// Validates and stores a file selection.
    ///
    /// A rejected file leaves the previous selection of that slot in place.
    pub async fn select_file(
        &self,
        session: &RwLock<UploadSession>,
        kind: FileKind,
        path: impl Into<PathBuf>,
    ) -> Result<SelectedFile> {
        let result = match SelectedFile::new(kind, path) {
            Ok(file) => session
                .write()
                .await
                .select_file(file.clone())
                .map(|_| file),
            Err(e) => Err(e),
        };

        match &result {
            Ok(file) => {
                tracing::debug!("[UploadCoordinator] Selected {} file {}", kind.label(), file.path.display());
                self.notifier.notify(Notification::success(format!(
                    "Selected {} file: {}",
                    kind.label(),
                    file.file_name
                )));
            }
            Err(e) => {
                tracing::warn!("[UploadCoordinator] Rejected {} file: {}", kind.label(), e);
                self.notifier.notify(Notification::error(e.user_message()));
            }
        }
        result
    }

    /// Creates a session and uploads road network then GPS trajectories.
    ///
    /// Steps run strictly in order and the first failure aborts the rest.
    /// On failure the session returns to `pending` without an id, so the
    /// next call starts over with a fresh session.
    pub async fn upload_all(&self, session: &RwLock<UploadSession>) -> Result<SessionId> {
        let begun = session.write().await.begin_upload();
        let (road, gps) = match begun {
            Ok(files) => files,
            Err(e) => {
                self.notifier.notify(Notification::error(e.user_message()));
                return Err(e);
            }
        };

        let session_id = match self.backend.create_session().await {
            Ok(id) => id,
            Err(e) => return Err(self.fail(session, UploadStep::CreateSession, e).await),
        };
        let attached = session.write().await.attach_session(session_id.clone());
        if let Err(e) = attached {
            return Err(self.fail(session, UploadStep::CreateSession, e).await);
        }
        tracing::info!("[UploadCoordinator] Session {} created", session_id);

        if let Err(e) = self.backend.upload_road_network(&session_id, &road).await {
            return Err(self.fail(session, UploadStep::RoadNetwork, e).await);
        }
        let completed = session.write().await.complete_upload(FileKind::RoadNetwork);
        if let Err(e) = completed {
            return Err(self.fail(session, UploadStep::RoadNetwork, e).await);
        }
        self.notifier
            .notify(Notification::info(format!("Uploaded {}", road.file_name)));

        if let Err(e) = self.backend.upload_gps_trajectories(&session_id, &gps).await {
            return Err(self.fail(session, UploadStep::GpsTrajectories, e).await);
        }
        let completed = session.write().await.complete_upload(FileKind::GpsTrajectories);
        if let Err(e) = completed {
            return Err(self.fail(session, UploadStep::GpsTrajectories, e).await);
        }
        self.notifier
            .notify(Notification::info(format!("Uploaded {}", gps.file_name)));

        tracing::info!("[UploadCoordinator] Session {} has both files", session_id);
        self.notifier.notify(Notification::success(
            "Files uploaded. Ready to start preprocessing.",
        ));
        Ok(session_id)
    }

    async fn fail(
        &self,
        session: &RwLock<UploadSession>,
        step: UploadStep,
        error: TrafficOpsError,
    ) -> TrafficOpsError {
        let message = error.user_message();
        tracing::error!("[UploadCoordinator] {}: {}", step.failure_prefix(), message);
        session.write().await.fail_upload(step, message.clone());
        self.notifier.notify(Notification::error(format!(
            "{}: {}",
            step.failure_prefix(),
            message
        )));
        error
    }
}
