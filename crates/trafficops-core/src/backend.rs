//! REST backend trait.
//!
//! Defines the logical operations the workflow consumes from the traffic
//! backend, decoupling the client state machines from HTTP.

use crate::analysis::{ActiveAlgorithm, ModelRunParameters, ModelRunReport};
use crate::error::Result;
use crate::session::{ActiveSessionInfo, SelectedFile, SessionId, SessionSnapshot};
use async_trait::async_trait;

/// The traffic backend as seen by the upload/preprocess/analyze workflow.
///
/// Every method is one request. Implementations map `success: false`
/// responses to `TrafficOpsError::ServerRejection` carrying the server text
/// and network failures to `TrafficOpsError::Transport`. Nothing is retried
/// at this level.
#[async_trait]
pub trait TrafficBackend: Send + Sync {
    /// Creates a new upload session.
    ///
    /// # Returns
    ///
    /// - `Ok(SessionId)`: Id issued by the backend
    /// - `Err(_)`: Transport failure or rejection
    async fn create_session(&self) -> Result<SessionId>;

    /// Uploads the road-network file into `session_id`.
    async fn upload_road_network(&self, session_id: &SessionId, file: &SelectedFile) -> Result<()>;

    /// Uploads the GPS-trajectory file into `session_id`.
    async fn upload_gps_trajectories(
        &self,
        session_id: &SessionId,
        file: &SelectedFile,
    ) -> Result<()>;

    /// Asks the backend to preprocess both uploaded files.
    async fn trigger_preprocessing(&self, session_id: &SessionId) -> Result<()>;

    /// Fetches the current server-side state of a session.
    async fn session_status(&self, session_id: &SessionId) -> Result<SessionSnapshot>;

    /// Lists algorithms that may currently be selected, in server order.
    async fn active_algorithms(&self) -> Result<Vec<ActiveAlgorithm>>;

    /// Runs the bottleneck model on a ready session.
    async fn run_model(
        &self,
        session_id: &SessionId,
        params: &ModelRunParameters,
    ) -> Result<ModelRunReport>;

    /// Describes the session the backend currently treats as active.
    async fn active_session_info(&self) -> Result<ActiveSessionInfo>;

    /// Re-activates the bundled sample session and returns its id.
    async fn restore_sample_session(&self) -> Result<SessionId>;
}
