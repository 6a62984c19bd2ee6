//! Model run parameters and backend-reported analysis types.

use crate::error::{Result, TrafficOpsError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Allowed range for the number of bottlenecks requested.
pub const K_RANGE: RangeInclusive<u32> = 5..=20;

/// Prediction horizon offered by the upload page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TimeHorizon {
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
}

impl TimeHorizon {
    pub const ALL: [TimeHorizon; 3] = [
        TimeHorizon::FiveMinutes,
        TimeHorizon::FifteenMinutes,
        TimeHorizon::ThirtyMinutes,
    ];

    pub fn minutes(self) -> u32 {
        match self {
            TimeHorizon::FiveMinutes => 5,
            TimeHorizon::FifteenMinutes => 15,
            TimeHorizon::ThirtyMinutes => 30,
        }
    }
}

impl TryFrom<u32> for TimeHorizon {
    type Error = TrafficOpsError;

    fn try_from(minutes: u32) -> Result<Self> {
        TimeHorizon::ALL
            .into_iter()
            .find(|h| h.minutes() == minutes)
            .ok_or_else(|| {
                TrafficOpsError::validation(format!(
                    "Time horizon must be one of 5, 15 or 30 minutes (got {})",
                    minutes
                ))
            })
    }
}

impl From<TimeHorizon> for u32 {
    fn from(horizon: TimeHorizon) -> Self {
        horizon.minutes()
    }
}

impl fmt::Display for TimeHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.minutes())
    }
}

/// Validated parameters for one bottleneck model run.
///
/// Membership of `model_type` in the active-algorithm set is not checked
/// here: that set lives in the availability gate and can change between
/// construction and submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRunParameters {
    k: u32,
    time_horizon: TimeHorizon,
    model_type: String,
}

impl ModelRunParameters {
    pub fn new(k: u32, time_horizon_minutes: u32, model_type: impl Into<String>) -> Result<Self> {
        if !K_RANGE.contains(&k) {
            return Err(TrafficOpsError::validation(format!(
                "k must be between {} and {} (got {})",
                K_RANGE.start(),
                K_RANGE.end(),
                k
            )));
        }
        let time_horizon = TimeHorizon::try_from(time_horizon_minutes)?;
        let model_type = model_type.into();
        if model_type.trim().is_empty() {
            return Err(TrafficOpsError::validation("A model type is required"));
        }

        Ok(Self {
            k,
            time_horizon,
            model_type,
        })
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn time_horizon(&self) -> TimeHorizon {
        self.time_horizon
    }

    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    /// Same parameters with a different model type.
    pub fn with_model_type(mut self, model_type: impl Into<String>) -> Self {
        self.model_type = model_type.into();
        self
    }
}

/// An algorithm the backend currently permits selecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAlgorithm {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ActiveAlgorithm {
    /// Builds an algorithm keyed by `model_type`.
    pub fn new(id: i64, model_type: impl Into<String>) -> Self {
        Self {
            id: serde_json::Value::from(id),
            model_type: Some(model_type.into()),
            name: None,
            display_name: None,
            description: None,
        }
    }

    /// The value submitted as `model_type`: the model type, else the name.
    pub fn key(&self) -> Option<&str> {
        self.model_type
            .as_deref()
            .or(self.name.as_deref())
            .filter(|k| !k.is_empty())
    }

    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.name.as_deref())
            .or(self.model_type.as_deref())
            .unwrap_or("unnamed")
    }
}

/// One ranked bottleneck returned by a model run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckRanking {
    pub rank: u32,
    #[serde(default)]
    pub road_id: Option<String>,
    #[serde(default)]
    pub road_name: Option<String>,
    #[serde(default)]
    pub benefit_score: Option<f64>,
    #[serde(default)]
    pub affected_roads_count: Option<u64>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// Result of a successful model run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelRunReport {
    pub bottlenecks: Vec<BottleneckRanking>,
    pub cached: bool,
}
