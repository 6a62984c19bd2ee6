//! Upload session domain module.
//!
//! # Module Structure
//!
//! - `file_slot`: Typed input files and their per-file upload state
//! - `model`: `UploadSession`, its status lifecycle and server snapshots

mod file_slot;
mod model;

pub use file_slot::{FileKind, FileSlot, SelectedFile};
pub use model::{
    ActiveSessionInfo, PreprocessingStats, SessionId, SessionSnapshot, SessionStatus, UploadSession, UploadStep,
    processing_duration_secs,
};
