//! Wire-format DTOs for the traffic REST backend.
//!
//! Every response is first checked against the `{success, error}` envelope;
//! only a response with `success: true` is decoded into its payload type.
//! The DTOs are private to the infrastructure layer and converted into
//! `trafficops-core` domain types before leaving it.

pub mod analysis;
pub mod envelope;
pub mod session;

pub use analysis::{ActiveAlgorithmsResponse, RunModelRequest, RunModelResponse};
pub use envelope::parse_envelope;
pub use session::{
    ActiveSessionInfoResponse, PreprocessRequest, SessionIdResponse,
    SessionStatusResponse,
};
