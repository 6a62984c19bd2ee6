//! Algorithm availability gate.
//!
//! Tracks which model types the backend currently allows and keeps the
//! selected model type inside that set.

use std::sync::Arc;
use tokio::sync::RwLock;
use trafficops_core::analysis::ActiveAlgorithm;
use trafficops_core::backend::TrafficBackend;
use trafficops_core::error::{Result, TrafficOpsError};
use trafficops_core::notification::{Notification, Notifier};

/// Explanation shown while the run control is disabled.
pub const NO_ACTIVE_ALGORITHMS: &str = "No active algorithms available";

/// What the last refresh learned.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability {
    /// Not fetched yet
    Unknown,
    /// The fetch failed
    Unavailable(String),
    /// The backend has no active algorithm
    Empty,
    /// Active algorithms in server order
    Available(Vec<ActiveAlgorithm>),
}

impl Availability {
    pub fn algorithms(&self) -> &[ActiveAlgorithm] {
        match self {
            Availability::Available(algorithms) => algorithms,
            _ => &[],
        }
    }

    pub fn contains(&self, model_type: &str) -> bool {
        self.algorithms()
            .iter()
            .any(|algorithm| algorithm.key() == Some(model_type))
    }
}

/// Picks the model type to keep after a refresh.
///
/// The current choice survives if it is still active; otherwise the first
/// algorithm in server order wins. Returns `None` when nothing is active.
pub fn reconcile_model_type(current: &str, algorithms: &[ActiveAlgorithm]) -> Option<String> {
    if algorithms.iter().any(|a| a.key() == Some(current)) {
        return Some(current.to_string());
    }
    algorithms
        .iter()
        .find_map(|a| a.key())
        .map(str::to_string)
}

#[derive(Debug)]
struct GateState {
    availability: Availability,
    model_type: String,
}

pub struct AlgorithmGate {
    backend: Arc<dyn TrafficBackend>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<GateState>,
}

impl AlgorithmGate {
    pub fn new(
        backend: Arc<dyn TrafficBackend>,
        notifier: Arc<dyn Notifier>,
        default_model_type: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            notifier,
            state: RwLock::new(GateState {
                availability: Availability::Unknown,
                model_type: default_model_type.into(),
            }),
        }
    }

    /// Fetches the active algorithm set.
    ///
    /// A failed fetch leaves the gate closed; it never falls back to a
    /// default model type.
    pub async fn refresh(&self) -> Availability {
        let fetched = self.backend.active_algorithms().await;
        let mut state = self.state.write().await;

        let availability = match fetched {
            Err(e) => {
                tracing::warn!("[AlgorithmGate] Failed to fetch active algorithms: {}", e);
                self.notifier.notify(Notification::error(format!(
                    "Failed to load active algorithms: {}",
                    e.user_message()
                )));
                Availability::Unavailable(e.user_message())
            }
            Ok(algorithms) if algorithms.iter().all(|a| a.key().is_none()) => {
                tracing::info!("[AlgorithmGate] No active algorithms");
                self.notifier.notify(Notification::warning(NO_ACTIVE_ALGORITHMS));
                Availability::Empty
            }
            Ok(algorithms) => {
                if let Some(next) = reconcile_model_type(&state.model_type, &algorithms)
                    && next != state.model_type
                {
                    tracing::info!(
                        "[AlgorithmGate] Model type {} is not active, switching to {}",
                        state.model_type,
                        next
                    );
                    state.model_type = next;
                }
                Availability::Available(algorithms)
            }
        };
        state.availability = availability.clone();
        availability
    }

    pub async fn availability(&self) -> Availability {
        self.state.read().await.availability.clone()
    }

    /// The selected model type, if it is currently runnable.
    pub async fn selected_model_type(&self) -> Option<String> {
        let state = self.state.read().await;
        state
            .availability
            .contains(&state.model_type)
            .then(|| state.model_type.clone())
    }

    /// Chooses a model type; it must be in the active set.
    pub async fn select_model_type(&self, model_type: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.availability.contains(model_type) {
            return Err(TrafficOpsError::validation(format!(
                "Model type {} is not currently active",
                model_type
            )));
        }
        state.model_type = model_type.to_string();
        Ok(())
    }

    pub async fn is_active(&self, model_type: &str) -> bool {
        self.state.read().await.availability.contains(model_type)
    }

    /// Why runs are blocked, or `None` when a run may proceed.
    pub async fn disabled_reason(&self) -> Option<&'static str> {
        match self.state.read().await.availability {
            Availability::Available(_) => None,
            _ => Some(NO_ACTIVE_ALGORITHMS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockBackend, RecordingNotifier};
    use trafficops_core::notification::NotificationLevel;

    fn gate(backend: Arc<MockBackend>, default: &str) -> (AlgorithmGate, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        (AlgorithmGate::new(backend, notifier.clone(), default), notifier)
    }

    #[test]
    fn test_fallback_picks_first_in_server_order() {
        let algorithms = vec![ActiveAlgorithm::new(1, "LIM"), ActiveAlgorithm::new(2, "LTM")];
        assert_eq!(reconcile_model_type("GREEDY", &algorithms).as_deref(), Some("LIM"));

        let reversed = vec![ActiveAlgorithm::new(2, "LTM"), ActiveAlgorithm::new(1, "LIM")];
        assert_eq!(reconcile_model_type("GREEDY", &reversed).as_deref(), Some("LTM"));
        assert_eq!(reconcile_model_type("LIM", &reversed).as_deref(), Some("LIM"));
        assert_eq!(reconcile_model_type("LIM", &[]), None);
    }

    #[test]
    fn test_name_used_when_model_type_missing() {
        let algorithm = ActiveAlgorithm {
            model_type: None,
            name: Some("SIR".to_string()),
            ..ActiveAlgorithm::new(7, "")
        };
        assert_eq!(reconcile_model_type("LIM", &[algorithm]).as_deref(), Some("SIR"));
    }

    #[tokio::test]
    async fn test_refresh_replaces_inactive_selection() {
        let backend = Arc::new(MockBackend::new());
        let (gate, _) = gate(backend.clone(), "GREEDY");

        assert_eq!(gate.selected_model_type().await, None);
        let availability = gate.refresh().await;
        assert_eq!(availability.algorithms().len(), 2);
        assert_eq!(gate.selected_model_type().await.as_deref(), Some("LIM"));
        assert_eq!(gate.disabled_reason().await, None);
    }

    #[tokio::test]
    async fn test_empty_set_disables_runs() {
        let backend = Arc::new(MockBackend::new());
        backend.set_algorithms(Ok(vec![]));
        let (gate, notifier) = gate(backend, "LIM");

        assert_eq!(gate.refresh().await, Availability::Empty);
        assert_eq!(gate.selected_model_type().await, None);
        assert_eq!(gate.disabled_reason().await, Some(NO_ACTIVE_ALGORITHMS));
        assert_eq!(
            notifier.messages(NotificationLevel::Warning),
            vec![NO_ACTIVE_ALGORITHMS]
        );
    }

    #[tokio::test]
    async fn test_fetch_error_keeps_gate_closed() {
        let backend = Arc::new(MockBackend::new());
        backend.set_algorithms(Err(TrafficOpsError::transport("connection refused")));
        let (gate, notifier) = gate(backend, "LIM");

        assert_eq!(
            gate.refresh().await,
            Availability::Unavailable("connection refused".to_string())
        );
        assert_eq!(gate.selected_model_type().await, None);
        assert!(!gate.is_active("LIM").await);
        assert_eq!(gate.disabled_reason().await, Some(NO_ACTIVE_ALGORITHMS));
        assert_eq!(notifier.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_select_model_type_must_be_active() {
        let backend = Arc::new(MockBackend::new());
        let (gate, _) = gate(backend, "LIM");
        gate.refresh().await;

        gate.select_model_type("LTM").await.unwrap();
        assert_eq!(gate.selected_model_type().await.as_deref(), Some("LTM"));
        assert!(gate.select_model_type("SIS").await.unwrap_err().is_validation());
        assert_eq!(gate.selected_model_type().await.as_deref(), Some("LTM"));
    }
}
