//! Domain layer for the TrafficOps client.
//!
//! Holds the upload-session model, run parameters, the error type and the
//! traits the application layer is written against. Nothing in this crate
//! performs I/O.

pub mod analysis;
pub mod backend;
pub mod config;
pub mod error;
pub mod notification;
pub mod session;

// Re-export common error type
pub use error::{Result, TrafficOpsError};
