//! Error types for the TrafficOps client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire TrafficOps client.
///
/// Every failure in the upload/preprocess/analyze workflow lands in one of
/// these variants. The application layer converts them into user-visible
/// notifications at the operation boundary.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrafficOpsError {
    /// Client-side rejection of an input (file type, parameter range, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network or HTTP-layer failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Well-formed response carrying `success: false`
    #[error("{0}")]
    ServerRejection(String),

    /// The backend reported the session as `failed`
    #[error("Preprocessing failed: {0}")]
    PreprocessingFailed(String),

    /// An operation was attempted from a workflow state that does not allow it
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (reading upload files, config files)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrafficOpsError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a ServerRejection error from the server-supplied message
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::ServerRejection(message.into())
    }

    /// Creates an InvalidState error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a Transport error
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this is a ServerRejection
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::ServerRejection(_))
    }

    /// Check if this is an InvalidState error
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    /// Text shown to the user.
    ///
    /// Server rejections and preprocessing failures are passed through
    /// without re-interpretation; the server owns that wording.
    pub fn user_message(&self) -> String {
        match self {
            Self::ServerRejection(message) | Self::PreprocessingFailed(message) => {
                message.clone()
            }
            Self::Validation(message)
            | Self::Transport(message)
            | Self::InvalidState(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for TrafficOpsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for TrafficOpsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TrafficOpsError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for TrafficOpsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Serialization {
                format: "JSON".to_string(),
                message: err.to_string(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// A type alias for `Result<T, TrafficOpsError>`.
pub type Result<T> = std::result::Result<T, TrafficOpsError>;
