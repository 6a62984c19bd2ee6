//! Bottleneck analysis domain module.
//!
//! - `model`: Run parameters, active algorithms and run results
//! - `route`: The results-view hand-off (`ResultsRoute`, `Navigator`)

mod model;
mod route;

pub use model::{
    ActiveAlgorithm, BottleneckRanking, K_RANGE, ModelRunParameters, ModelRunReport, TimeHorizon,
};
pub use route::{Navigator, ResultsRoute};
