//! Upload session domain model.
//!
//! An `UploadSession` is the client-side view of one server-side ingestion and
//! preprocessing job. It is owned by a single workflow instance and discarded
//! with it; nothing here is persisted.

use super::file_slot::{FileKind, FileSlot, SelectedFile};
use crate::error::{Result, TrafficOpsError};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

/// Opaque session identifier issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of an upload session.
///
/// Transitions only move forward (`pending -> uploaded -> preprocessing ->
/// ready | failed`). `failed` is terminal and reachable from `preprocessing`
/// only; recovering from it means starting a new upload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Uploaded,
    Preprocessing,
    Ready,
    Failed,
}

impl SessionStatus {
    /// Returns true for `ready` and `failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Ready | SessionStatus::Failed)
    }

    /// Returns true if `next` is a legal forward transition from `self`.
    pub fn can_advance_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Pending, Uploaded)
                | (Uploaded, Preprocessing)
                | (Preprocessing, Ready)
                | (Preprocessing, Failed)
        )
    }
}

/// Step of the three-call upload sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStep {
    CreateSession,
    RoadNetwork,
    GpsTrajectories,
}

impl UploadStep {
    /// Prefix of the user-visible message when this step fails.
    pub fn failure_prefix(self) -> &'static str {
        match self {
            UploadStep::CreateSession => "Failed to create upload session",
            UploadStep::RoadNetwork => "Road network upload failed",
            UploadStep::GpsTrajectories => "GPS trajectory upload failed",
        }
    }

    fn file_kind(self) -> Option<FileKind> {
        match self {
            UploadStep::CreateSession => None,
            UploadStep::RoadNetwork => Some(FileKind::RoadNetwork),
            UploadStep::GpsTrajectories => Some(FileKind::GpsTrajectories),
        }
    }
}

/// Counts reported by the backend once preprocessing is `ready`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreprocessingStats {
    pub road_count: u64,
    pub gps_point_count: u64,
    /// Seconds between start and completion, two-decimal precision
    pub processing_seconds: Option<f64>,
}

/// Server-authoritative view of a session, as returned by a status fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    #[serde(default)]
    pub road_count: Option<u64>,
    #[serde(default)]
    pub gps_point_count: Option<u64>,
    #[serde(default)]
    pub preprocessing_started_at: Option<String>,
    #[serde(default)]
    pub preprocessing_completed_at: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl SessionSnapshot {
    /// A snapshot carrying only a status.
    pub fn with_status(status: SessionStatus) -> Self {
        Self {
            status,
            road_count: None,
            gps_point_count: None,
            preprocessing_started_at: None,
            preprocessing_completed_at: None,
            error_message: None,
        }
    }

    /// Extracts the preprocessing statistics.
    pub fn stats(&self) -> PreprocessingStats {
        PreprocessingStats {
            road_count: self.road_count.unwrap_or(0),
            gps_point_count: self.gps_point_count.unwrap_or(0),
            processing_seconds: processing_duration_secs(
                self.preprocessing_started_at.as_deref(),
                self.preprocessing_completed_at.as_deref(),
            ),
        }
    }

    /// The failure text, with a fallback when the backend sent none.
    pub fn failure_message(&self) -> String {
        self.error_message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Preprocessing failed".to_string())
    }
}

/// Parses an ISO-8601 timestamp with or without an offset.
fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").ok())
}

/// `completed - started` in seconds, rounded to two decimals.
///
/// Returns `None` when either timestamp is missing or unparseable.
pub fn processing_duration_secs(started: Option<&str>, completed: Option<&str>) -> Option<f64> {
    let started = parse_timestamp(started?)?;
    let completed = parse_timestamp(completed?)?;
    let millis = (completed - started).num_milliseconds() as f64;
    Some((millis / 10.0).round() / 100.0)
}

/// What the backend reports as its currently active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSessionInfo {
    pub session_id: SessionId,
    pub status: SessionStatus,
    /// True for the bundled sample data set
    pub is_preinserted: bool,
    pub road_count: u64,
    pub gps_count: u64,
}

/// Client-side state of one upload session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSession {
    id: Option<SessionId>,
    status: SessionStatus,
    road_network: FileSlot,
    gps_trajectories: FileSlot,
    stats: Option<PreprocessingStats>,
    error_message: Option<String>,
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadSession {
    /// A fresh `pending` session with no files selected.
    pub fn new() -> Self {
        Self {
            id: None,
            status: SessionStatus::Pending,
            road_network: FileSlot::Unselected,
            gps_trajectories: FileSlot::Unselected,
            stats: None,
            error_message: None,
        }
    }

    /// Builds a session from a server snapshot of an existing session.
    ///
    /// Used to target sessions created elsewhere (another run, the sample
    /// data set). File slots stay unselected.
    pub fn observed(id: SessionId, snapshot: &SessionSnapshot) -> Self {
        let mut session = Self::new();
        session.id = Some(id);
        session.status = snapshot.status;
        match snapshot.status {
            SessionStatus::Ready => session.stats = Some(snapshot.stats()),
            SessionStatus::Failed => session.error_message = Some(snapshot.failure_message()),
            _ => {}
        }
        session
    }

    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn road_network(&self) -> &FileSlot {
        &self.road_network
    }

    pub fn gps_trajectories(&self) -> &FileSlot {
        &self.gps_trajectories
    }

    pub fn slot(&self, kind: FileKind) -> &FileSlot {
        match kind {
            FileKind::RoadNetwork => &self.road_network,
            FileKind::GpsTrajectories => &self.gps_trajectories,
        }
    }

    fn slot_mut(&mut self, kind: FileKind) -> &mut FileSlot {
        match kind {
            FileKind::RoadNetwork => &mut self.road_network,
            FileKind::GpsTrajectories => &mut self.gps_trajectories,
        }
    }

    pub fn stats(&self) -> Option<&PreprocessingStats> {
        self.stats.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn road_network_uploaded(&self) -> bool {
        self.road_network.is_uploaded()
    }

    pub fn gps_uploaded(&self) -> bool {
        self.gps_trajectories.is_uploaded()
    }

    /// True while the three-call upload sequence is in flight.
    pub fn is_uploading(&self) -> bool {
        self.road_network.is_uploading() || self.gps_trajectories.is_uploading()
    }

    // ============================================================================
    // File selection
    // ============================================================================

    /// Stores a validated selection in its slot.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<()> {
        if self.is_uploading() {
            return Err(TrafficOpsError::invalid_state(
                "Cannot change files while an upload is in progress",
            ));
        }
        let kind = file.kind;
        *self.slot_mut(kind) = FileSlot::Selected { file };
        if self.id.is_some() || self.status != SessionStatus::Pending {
            self.discard_session();
        }
        Ok(())
    }

    /// Drops the server session so a new selection is uploaded from scratch.
    /// Files that were already sent go back to `Selected`.
    fn discard_session(&mut self) {
        self.id = None;
        self.status = SessionStatus::Pending;
        self.stats = None;
        self.error_message = None;
        for slot in [&mut self.road_network, &mut self.gps_trajectories] {
            let file = match slot {
                FileSlot::Uploaded { file } | FileSlot::Failed { file, .. } => file.clone(),
                _ => continue,
            };
            *slot = FileSlot::Selected { file };
        }
    }

    // ============================================================================
    // Upload sequence
    // ============================================================================

    /// Starts a new upload, discarding any previous session id and results.
    ///
    /// Returns the two files to send, road network first.
    pub fn begin_upload(&mut self) -> Result<(SelectedFile, SelectedFile)> {
        if self.is_uploading() {
            return Err(TrafficOpsError::invalid_state(
                "An upload is already in progress",
            ));
        }
        let road = self.road_network.file().cloned().ok_or_else(|| {
            TrafficOpsError::validation("Select a road network file before uploading")
        })?;
        let gps = self.gps_trajectories.file().cloned().ok_or_else(|| {
            TrafficOpsError::validation("Select a GPS trajectories file before uploading")
        })?;

        self.id = None;
        self.status = SessionStatus::Pending;
        self.stats = None;
        self.error_message = None;
        self.road_network = FileSlot::Uploading { file: road.clone() };
        self.gps_trajectories = FileSlot::Selected { file: gps.clone() };

        Ok((road, gps))
    }

    /// Records the id of the session created for the current upload.
    pub fn attach_session(&mut self, id: SessionId) -> Result<()> {
        if !self.is_uploading() {
            return Err(TrafficOpsError::invalid_state(
                "No upload in progress to attach a session to",
            ));
        }
        self.id = Some(id);
        Ok(())
    }

    /// Marks one file as uploaded. The GPS slot starts uploading once the road
    /// network is done; the session becomes `uploaded` when both are.
    pub fn complete_upload(&mut self, kind: FileKind) -> Result<()> {
        if self.id.is_none() {
            return Err(TrafficOpsError::invalid_state(
                "Cannot complete an upload without a session",
            ));
        }
        let file = match self.slot(kind) {
            FileSlot::Uploading { file } => file.clone(),
            other => {
                return Err(TrafficOpsError::invalid_state(format!(
                    "{} file is {}, not uploading",
                    kind.label(),
                    other.state_name()
                )));
            }
        };
        *self.slot_mut(kind) = FileSlot::Uploaded { file };

        if kind == FileKind::RoadNetwork
            && let Some(gps) = self.gps_trajectories.file().cloned()
        {
            self.gps_trajectories = FileSlot::Uploading { file: gps };
        }

        if self.road_network_uploaded() && self.gps_uploaded() {
            self.status = SessionStatus::Uploaded;
        }
        Ok(())
    }

    /// Rolls the whole upload back to `pending`.
    ///
    /// Partial uploads are not resumable: the session id is dropped, the slot
    /// of the failing step is marked failed and every other slot returns to
    /// `selected` so the user can retry from scratch.
    pub fn fail_upload(&mut self, step: UploadStep, message: impl Into<String>) {
        let message = message.into();
        self.id = None;
        self.status = SessionStatus::Pending;
        self.stats = None;

        for kind in [FileKind::RoadNetwork, FileKind::GpsTrajectories] {
            let Some(file) = self.slot(kind).file().cloned() else {
                continue;
            };
            *self.slot_mut(kind) = if step.file_kind() == Some(kind) {
                FileSlot::Failed {
                    file,
                    error: message.clone(),
                }
            } else {
                FileSlot::Selected { file }
            };
        }
    }

    // ============================================================================
    // Preprocessing
    // ============================================================================

    /// Optimistically moves to `preprocessing`; returns the id to trigger.
    pub fn begin_preprocessing(&mut self) -> Result<SessionId> {
        if !(self.road_network_uploaded() && self.gps_uploaded()) {
            return Err(TrafficOpsError::invalid_state(
                "Both road network and GPS trajectories must be uploaded first",
            ));
        }
        if self.status != SessionStatus::Uploaded {
            return Err(TrafficOpsError::invalid_state(format!(
                "Cannot start preprocessing from status {}",
                self.status
            )));
        }
        let id = self
            .id
            .clone()
            .ok_or_else(|| TrafficOpsError::invalid_state("Session has no id"))?;
        self.status = SessionStatus::Preprocessing;
        Ok(id)
    }

    /// Undoes the optimistic `preprocessing` status after a failed trigger.
    pub fn revert_preprocessing(&mut self) {
        if self.status == SessionStatus::Preprocessing {
            self.status = SessionStatus::Uploaded;
        }
    }

    /// Server confirmed `ready`.
    pub fn mark_ready(&mut self, stats: PreprocessingStats) -> Result<()> {
        self.advance(SessionStatus::Ready)?;
        self.stats = Some(stats);
        Ok(())
    }

    /// Server reported `failed`.
    pub fn mark_failed(&mut self, message: impl Into<String>) -> Result<()> {
        self.advance(SessionStatus::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    fn advance(&mut self, next: SessionStatus) -> Result<()> {
        if !self.status.can_advance_to(next) {
            return Err(TrafficOpsError::invalid_state(format!(
                "Illegal status transition {} -> {}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn road() -> SelectedFile {
        SelectedFile::new(FileKind::RoadNetwork, "roads.geojson").unwrap()
    }

    fn gps() -> SelectedFile {
        SelectedFile::new(FileKind::GpsTrajectories, "gps.csv").unwrap()
    }

    fn uploaded_session() -> UploadSession {
        let mut session = UploadSession::new();
        session.select_file(road()).unwrap();
        session.select_file(gps()).unwrap();
        session.begin_upload().unwrap();
        session.attach_session(SessionId::new("s-1")).unwrap();
        session.complete_upload(FileKind::RoadNetwork).unwrap();
        session.complete_upload(FileKind::GpsTrajectories).unwrap();
        session
    }

    #[test]
    fn test_status_round_trips_as_snake_case() {
        assert_eq!(SessionStatus::Preprocessing.to_string(), "preprocessing");
        assert_eq!(SessionStatus::from_str("ready").unwrap(), SessionStatus::Ready);
        let json = serde_json::to_string(&SessionStatus::Uploaded).unwrap();
        assert_eq!(json, "\"uploaded\"");
    }

    #[test]
    fn test_failed_only_reachable_from_preprocessing() {
        assert!(SessionStatus::Preprocessing.can_advance_to(SessionStatus::Failed));
        assert!(!SessionStatus::Uploaded.can_advance_to(SessionStatus::Failed));
        assert!(!SessionStatus::Pending.can_advance_to(SessionStatus::Failed));
        assert!(!SessionStatus::Ready.can_advance_to(SessionStatus::Preprocessing));
        assert!(!SessionStatus::Failed.can_advance_to(SessionStatus::Ready));
    }

    #[test]
    fn test_begin_upload_requires_both_files() {
        let mut session = UploadSession::new();
        session.select_file(road()).unwrap();
        let err = session.begin_upload().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(session.road_network().state_name(), "selected");
    }

    #[test]
    fn test_upload_sequence_reaches_uploaded() {
        let session = uploaded_session();
        assert_eq!(session.status(), SessionStatus::Uploaded);
        assert!(session.road_network_uploaded());
        assert!(session.gps_uploaded());
        assert_eq!(session.id(), Some(&SessionId::new("s-1")));
    }

    #[test]
    fn test_gps_starts_uploading_after_road_network() {
        let mut session = UploadSession::new();
        session.select_file(road()).unwrap();
        session.select_file(gps()).unwrap();
        session.begin_upload().unwrap();
        assert!(session.road_network().is_uploading());
        assert_eq!(session.gps_trajectories().state_name(), "selected");

        session.attach_session(SessionId::new("s-1")).unwrap();
        session.complete_upload(FileKind::RoadNetwork).unwrap();
        assert!(session.gps_trajectories().is_uploading());
        assert_eq!(session.status(), SessionStatus::Pending);
    }

    #[test]
    fn test_second_upload_is_rejected_while_in_flight() {
        let mut session = UploadSession::new();
        session.select_file(road()).unwrap();
        session.select_file(gps()).unwrap();
        session.begin_upload().unwrap();
        assert!(session.begin_upload().unwrap_err().is_invalid_state());
        assert!(session.select_file(road()).unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_fail_upload_resets_to_pending() {
        let mut session = UploadSession::new();
        session.select_file(road()).unwrap();
        session.select_file(gps()).unwrap();
        session.begin_upload().unwrap();
        session.attach_session(SessionId::new("s-1")).unwrap();
        session.complete_upload(FileKind::RoadNetwork).unwrap();

        session.fail_upload(UploadStep::GpsTrajectories, "disk full");

        assert_eq!(session.status(), SessionStatus::Pending);
        assert!(session.id().is_none());
        assert_eq!(session.road_network().state_name(), "selected");
        assert_eq!(
            session.gps_trajectories(),
            &FileSlot::Failed {
                file: gps(),
                error: "disk full".to_string()
            }
        );
        assert!(!session.is_uploading());
    }

    #[test]
    fn test_new_selection_discards_uploaded_session() {
        let mut session = uploaded_session();
        let replacement = SelectedFile::new(FileKind::GpsTrajectories, "gps-2.csv").unwrap();

        session.select_file(replacement.clone()).unwrap();

        assert_eq!(session.status(), SessionStatus::Pending);
        assert!(session.id().is_none());
        assert_eq!(
            session.gps_trajectories(),
            &FileSlot::Selected { file: replacement }
        );
        assert_eq!(session.road_network(), &FileSlot::Selected { file: road() });
        assert!(session.begin_preprocessing().is_err());
    }

    #[test]
    fn test_new_selection_clears_ready_results() {
        let mut session = uploaded_session();
        session.begin_preprocessing().unwrap();
        session
            .mark_ready(PreprocessingStats {
                road_count: 1,
                gps_point_count: 1,
                processing_seconds: None,
            })
            .unwrap();

        session.select_file(road()).unwrap();

        assert_eq!(session.status(), SessionStatus::Pending);
        assert!(session.stats().is_none());
        assert_eq!(session.gps_trajectories().state_name(), "selected");
    }

    #[test]
    fn test_preprocessing_transitions() {
        let mut session = uploaded_session();
        let id = session.begin_preprocessing().unwrap();
        assert_eq!(id.as_str(), "s-1");
        assert_eq!(session.status(), SessionStatus::Preprocessing);

        session.revert_preprocessing();
        assert_eq!(session.status(), SessionStatus::Uploaded);

        session.begin_preprocessing().unwrap();
        session
            .mark_ready(PreprocessingStats {
                road_count: 12,
                gps_point_count: 3400,
                processing_seconds: Some(1.5),
            })
            .unwrap();
        assert_eq!(session.status(), SessionStatus::Ready);
        assert_eq!(session.stats().unwrap().road_count, 12);
    }

    #[test]
    fn test_mark_failed_requires_preprocessing() {
        let mut session = uploaded_session();
        assert!(session.mark_failed("bad geometry").is_err());

        session.begin_preprocessing().unwrap();
        session.mark_failed("bad geometry").unwrap();
        assert_eq!(session.status(), SessionStatus::Failed);
        assert_eq!(session.error_message(), Some("bad geometry"));
        assert!(session.begin_preprocessing().is_err());
    }

    #[test]
    fn test_processing_duration_two_decimals() {
        let secs = processing_duration_secs(
            Some("2024-05-01T10:00:00.000000"),
            Some("2024-05-01T10:00:12.345678"),
        );
        assert_eq!(secs, Some(12.35));

        let with_offset = processing_duration_secs(
            Some("2024-05-01T10:00:00+00:00"),
            Some("2024-05-01T10:01:30+00:00"),
        );
        assert_eq!(with_offset, Some(90.0));

        assert_eq!(processing_duration_secs(None, Some("2024-05-01T10:00:00")), None);
        assert_eq!(processing_duration_secs(Some("yesterday"), Some("today")), None);
    }

    #[test]
    fn test_observed_ready_session() {
        let snapshot = SessionSnapshot {
            status: SessionStatus::Ready,
            road_count: Some(5),
            gps_point_count: Some(99),
            preprocessing_started_at: None,
            preprocessing_completed_at: None,
            error_message: None,
        };
        let session = UploadSession::observed(SessionId::new("sample"), &snapshot);
        assert_eq!(session.status(), SessionStatus::Ready);
        assert_eq!(session.stats().unwrap().gps_point_count, 99);
        assert_eq!(session.road_network(), &FileSlot::Unselected);
    }
}
