//! Application layer for the TrafficOps client.
//!
//! This crate coordinates the upload, preprocessing and analysis use cases
//! against the `TrafficBackend` trait from the domain layer.

pub mod algorithm_gate;
pub mod model_run;
pub mod notification_hub;
pub mod scheduler;
pub mod status_poller;
pub mod upload_coordinator;
pub mod workflow;

#[cfg(test)]
mod test_support;

pub use algorithm_gate::{AlgorithmGate, Availability};
pub use model_run::{ModelRunTrigger, RunRequest};
pub use notification_hub::NotificationHub;
pub use scheduler::{IntervalScheduler, PollScheduler};
pub use status_poller::{AbortReason, PollOutcome, StatusPoller};
pub use upload_coordinator::UploadCoordinator;
pub use workflow::{AnalysisWorkflow, WorkflowDeps, WorkflowSettings};
