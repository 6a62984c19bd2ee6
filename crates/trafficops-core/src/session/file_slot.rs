//! Per-file upload state.
//!
//! Each of the two input files moves through a single tagged state instead of
//! a pair of "selected" / "uploaded" flags, so impossible combinations such as
//! "uploaded but never selected" cannot be represented.

use crate::error::{Result, TrafficOpsError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The two typed inputs a session needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Road network as GeoJSON
    RoadNetwork,
    /// GPS trajectories as CSV
    GpsTrajectories,
}

impl FileKind {
    /// Extensions accepted for this kind (lowercase, without the dot).
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            FileKind::RoadNetwork => &["geojson", "json"],
            FileKind::GpsTrajectories => &["csv"],
        }
    }

    /// Human-readable label used in messages.
    pub fn label(self) -> &'static str {
        match self {
            FileKind::RoadNetwork => "road network",
            FileKind::GpsTrajectories => "GPS trajectories",
        }
    }

    /// Returns true when the path's extension is allowed for this kind.
    ///
    /// The comparison is case-insensitive; a path without an extension is
    /// never accepted.
    pub fn accepts(self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions().contains(&ext.as_str())
            })
            .unwrap_or(false)
    }
}

/// A file the user picked for upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFile {
    pub kind: FileKind,
    pub path: PathBuf,
    pub file_name: String,
}

impl SelectedFile {
    /// Validates the extension against `kind` and builds the selection.
    pub fn new(kind: FileKind, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !kind.accepts(&path) {
            return Err(TrafficOpsError::validation(format!(
                "Invalid file type for {}: {}. Allowed types: {}",
                kind.label(),
                path.display(),
                kind.allowed_extensions().join(", ")
            )));
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            kind,
            path,
            file_name,
        })
    }
}

/// Upload state of one file slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileSlot {
    #[default]
    Unselected,
    Selected { file: SelectedFile },
    Uploading { file: SelectedFile },
    Uploaded { file: SelectedFile },
    Failed { file: SelectedFile, error: String },
}

impl FileSlot {
    /// The file held by this slot, if any.
    pub fn file(&self) -> Option<&SelectedFile> {
        match self {
            FileSlot::Unselected => None,
            FileSlot::Selected { file }
            | FileSlot::Uploading { file }
            | FileSlot::Uploaded { file }
            | FileSlot::Failed { file, .. } => Some(file),
        }
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self, FileSlot::Uploading { .. })
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self, FileSlot::Uploaded { .. })
    }

    /// Short state name for logs and CLI output.
    pub fn state_name(&self) -> &'static str {
        match self {
            FileSlot::Unselected => "unselected",
            FileSlot::Selected { .. } => "selected",
            FileSlot::Uploading { .. } => "uploading",
            FileSlot::Uploaded { .. } => "uploaded",
            FileSlot::Failed { .. } => "failed",
        }
    }
}
