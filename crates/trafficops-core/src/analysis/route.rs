//! Navigation to the results view.

use super::model::{ModelRunParameters, ModelRunReport};
use crate::session::SessionId;
use serde::{Deserialize, Serialize};

const RESULTS_BASE: &str = "app://trafficops/results";

/// Route parameters of the results view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsRoute {
    pub session_id: SessionId,
    pub k: u32,
    pub time_horizon: u32,
    pub model_type: String,
}

impl ResultsRoute {
    pub fn new(session_id: SessionId, params: &ModelRunParameters) -> Self {
        Self {
            session_id,
            k: params.k(),
            time_horizon: params.time_horizon().minutes(),
            model_type: params.model_type().to_string(),
        }
    }

    /// Renders `/results?session_id=..&k=..&time_horizon=..&model_type=..`.
    pub fn to_path(&self) -> String {
        let k = self.k.to_string();
        let time_horizon = self.time_horizon.to_string();
        let params = [
            ("session_id", self.session_id.as_str()),
            ("k", k.as_str()),
            ("time_horizon", time_horizon.as_str()),
            ("model_type", self.model_type.as_str()),
        ];

        match reqwest::Url::parse_with_params(RESULTS_BASE, params) {
            Ok(url) => match url.query() {
                Some(query) => format!("{}?{}", url.path(), query),
                None => url.path().to_string(),
            },
            Err(_) => "/results".to_string(),
        }
    }
}

/// Receives the hand-off to the results view after a successful run.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &ResultsRoute, report: &ModelRunReport);
}
