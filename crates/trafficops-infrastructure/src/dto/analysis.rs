//! Algorithm and model-run DTOs.

use serde::{Deserialize, Serialize};
use trafficops_core::analysis::{ActiveAlgorithm, BottleneckRanking, ModelRunReport};

/// `GET /api/algorithms/active`
#[derive(Debug, Deserialize)]
pub struct ActiveAlgorithmsResponse {
    #[serde(default)]
    pub algorithms: Vec<ActiveAlgorithm>,
}

/// `POST /api/bottlenecks/run-model`
#[derive(Debug, Serialize)]
pub struct RunModelRequest<'a> {
    pub session_id: &'a str,
    pub k: u32,
    pub time_horizon: u32,
    pub model_type: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RunModelResponse {
    #[serde(default)]
    pub bottlenecks: Vec<BottleneckRecord>,
    #[serde(default)]
    pub cached: bool,
}

#[derive(Debug, Deserialize)]
pub struct BottleneckRecord {
    pub rank: u32,
    /// Numeric or string depending on the road source
    #[serde(default)]
    pub road_id: Option<serde_json::Value>,
    #[serde(default)]
    pub road_name: Option<String>,
    #[serde(default)]
    pub benefit_score: Option<f64>,
    #[serde(default)]
    pub affected_roads_count: Option<u64>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Deserialize)]
pub struct Coordinates {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl From<BottleneckRecord> for BottleneckRanking {
    fn from(record: BottleneckRecord) -> Self {
        let road_id = record.road_id.and_then(|id| match id {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });
        let (lat, lon) = record
            .coordinates
            .map(|c| (c.lat, c.lon))
            .unwrap_or((None, None));

        BottleneckRanking {
            rank: record.rank,
            road_id,
            road_name: record.road_name,
            benefit_score: record.benefit_score,
            affected_roads_count: record.affected_roads_count,
            lat,
            lon,
        }
    }
}

impl From<RunModelResponse> for ModelRunReport {
    fn from(response: RunModelResponse) -> Self {
        ModelRunReport {
            bottlenecks: response.bottlenecks.into_iter().map(Into::into).collect(),
            cached: response.cached,
        }
    }
}
