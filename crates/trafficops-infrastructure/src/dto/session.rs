//! Upload-session DTOs.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use trafficops_core::error::{Result, TrafficOpsError};
use trafficops_core::session::{ActiveSessionInfo, SessionId, SessionSnapshot, SessionStatus};

/// `POST /api/upload/create-session` and `POST /api/upload/restore-preinserted`
#[derive(Debug, Deserialize)]
pub struct SessionIdResponse {
    pub session_id: String,
}

/// `POST /api/upload/preprocess`
#[derive(Debug, Serialize)]
pub struct PreprocessRequest<'a> {
    pub session_id: &'a str,
}

/// `GET /api/upload/session-status/{id}`
#[derive(Debug, Deserialize)]
pub struct SessionStatusResponse {
    pub session: SessionRecord,
}

#[derive(Debug, Deserialize)]
pub struct SessionRecord {
    pub status: String,
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

impl TryFrom<SessionRecord> for SessionSnapshot {
    type Error = TrafficOpsError;

    fn try_from(record: SessionRecord) -> Result<Self> {
        Ok(SessionSnapshot {
            status: parse_status(&record.status)?,
            road_count: record.road_count,
            gps_point_count: record.gps_point_count,
            preprocessing_started_at: record.preprocessing_started_at,
            preprocessing_completed_at: record.preprocessing_completed_at,
            error_message: record.error_message,
        })
    }
}

/// `GET /api/upload/active-session-info`
#[derive(Debug, Deserialize)]
pub struct ActiveSessionInfoResponse {
    pub session_id: String,
    pub status: String,
    #[serde(default)]
    pub is_preinserted: bool,
    #[serde(default)]
    pub road_count: Option<u64>,
    #[serde(default)]
    pub gps_count: Option<u64>,
}

impl TryFrom<ActiveSessionInfoResponse> for ActiveSessionInfo {
    type Error = TrafficOpsError;

    fn try_from(response: ActiveSessionInfoResponse) -> Result<Self> {
        Ok(ActiveSessionInfo {
            session_id: SessionId::new(response.session_id),
            status: parse_status(&response.status)?,
            is_preinserted: response.is_preinserted,
            road_count: response.road_count.unwrap_or(0),
            gps_count: response.gps_count.unwrap_or(0),
        })
    }
}

fn parse_status(value: &str) -> Result<SessionStatus> {
    SessionStatus::from_str(value).map_err(|_| TrafficOpsError::Serialization {
        format: "JSON".to_string(),
        message: format!("Unknown session status: {}", value),
    })
}
