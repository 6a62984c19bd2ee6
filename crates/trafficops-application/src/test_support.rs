//! Test doubles for the application layer.

use crate::scheduler::{PollScheduler, PollTicker};
use crate::status_poller::{PollObserver, PollOutcome};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use trafficops_core::analysis::{
    ActiveAlgorithm, ModelRunParameters, ModelRunReport, Navigator, ResultsRoute,
};
use trafficops_core::backend::TrafficBackend;
use trafficops_core::error::{Result, TrafficOpsError};
use trafficops_core::notification::{Notification, NotificationLevel, Notifier};
use trafficops_core::session::{
    ActiveSessionInfo, SelectedFile, SessionId, SessionSnapshot, SessionStatus,
};

/// Operations of the mock backend that can be made to fail or held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CreateSession,
    UploadRoadNetwork,
    UploadGps,
    Preprocess,
    RunModel,
}

/// Pauses one backend call until the test releases it.
pub struct CallGate {
    entered: Notify,
    open: Semaphore,
}

impl CallGate {
    fn new() -> Self {
        Self {
            entered: Notify::new(),
            open: Semaphore::new(0),
        }
    }

    /// Resolves once the held call has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.open.add_permits(1);
    }

    async fn pass(&self) {
        self.entered.notify_one();
        if let Ok(permit) = self.open.acquire().await {
            permit.forget();
        }
    }
}

#[derive(Default)]
struct Counters {
    create_session: AtomicUsize,
    upload_road: AtomicUsize,
    upload_gps: AtomicUsize,
    preprocess: AtomicUsize,
    status: AtomicUsize,
    algorithms: AtomicUsize,
    run_model: AtomicUsize,
}

/// Scripted in-memory backend.
///
/// Session ids are `session-1`, `session-2`, ... Status fetches pop the
/// scripted queue and report `preprocessing` once it is empty.
pub struct MockBackend {
    counters: Counters,
    statuses: Mutex<VecDeque<Result<SessionSnapshot>>>,
    failures: Mutex<Vec<(Op, TrafficOpsError)>>,
    gates: Mutex<Vec<(Op, Arc<CallGate>)>>,
    algorithms: Mutex<Result<Vec<ActiveAlgorithm>>>,
    report: Mutex<ModelRunReport>,
    run_calls: Mutex<Vec<(SessionId, ModelRunParameters)>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            counters: Counters::default(),
            statuses: Mutex::new(VecDeque::new()),
            failures: Mutex::new(Vec::new()),
            gates: Mutex::new(Vec::new()),
            algorithms: Mutex::new(Ok(vec![
                ActiveAlgorithm::new(1, "LIM"),
                ActiveAlgorithm::new(2, "LTM"),
            ])),
            report: Mutex::new(ModelRunReport::default()),
            run_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script_statuses(&self, statuses: Vec<Result<SessionSnapshot>>) {
        *self.statuses.lock().unwrap() = statuses.into();
    }

    /// Makes the next call to `op` fail with `error`.
    pub fn fail_next(&self, op: Op, error: TrafficOpsError) {
        self.failures.lock().unwrap().push((op, error));
    }

    /// Holds the next call to `op` until the returned gate is released.
    pub fn hold(&self, op: Op) -> Arc<CallGate> {
        let gate = Arc::new(CallGate::new());
        self.gates.lock().unwrap().push((op, Arc::clone(&gate)));
        gate
    }

    pub fn set_algorithms(&self, algorithms: Result<Vec<ActiveAlgorithm>>) {
        *self.algorithms.lock().unwrap() = algorithms;
    }

    pub fn set_report(&self, report: ModelRunReport) {
        *self.report.lock().unwrap() = report;
    }

    pub fn create_session_calls(&self) -> usize {
        self.counters.create_session.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> (usize, usize) {
        (
            self.counters.upload_road.load(Ordering::SeqCst),
            self.counters.upload_gps.load(Ordering::SeqCst),
        )
    }

    pub fn preprocess_calls(&self) -> usize {
        self.counters.preprocess.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.counters.status.load(Ordering::SeqCst)
    }

    pub fn algorithm_calls(&self) -> usize {
        self.counters.algorithms.load(Ordering::SeqCst)
    }

    pub fn run_model_calls(&self) -> usize {
        self.counters.run_model.load(Ordering::SeqCst)
    }

    pub fn run_requests(&self) -> Vec<(SessionId, ModelRunParameters)> {
        self.run_calls.lock().unwrap().clone()
    }

    async fn pass_gate(&self, op: Op) {
        let gate = {
            let mut gates = self.gates.lock().unwrap();
            gates
                .iter()
                .position(|(o, _)| *o == op)
                .map(|index| gates.remove(index).1)
        };
        if let Some(gate) = gate {
            gate.pass().await;
        }
    }

    fn take_failure(&self, op: Op) -> Result<()> {
        let mut failures = self.failures.lock().unwrap();
        match failures.iter().position(|(o, _)| *o == op) {
            Some(index) => Err(failures.remove(index).1),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TrafficBackend for MockBackend {
    async fn create_session(&self) -> Result<SessionId> {
        let n = self.counters.create_session.fetch_add(1, Ordering::SeqCst) + 1;
        self.take_failure(Op::CreateSession)?;
        Ok(SessionId::new(format!("session-{}", n)))
    }

    async fn upload_road_network(&self, _session_id: &SessionId, _file: &SelectedFile) -> Result<()> {
        self.counters.upload_road.fetch_add(1, Ordering::SeqCst);
        self.pass_gate(Op::UploadRoadNetwork).await;
        self.take_failure(Op::UploadRoadNetwork)
    }

    async fn upload_gps_trajectories(
        &self,
        _session_id: &SessionId,
        _file: &SelectedFile,
    ) -> Result<()> {
        self.counters.upload_gps.fetch_add(1, Ordering::SeqCst);
        self.pass_gate(Op::UploadGps).await;
        self.take_failure(Op::UploadGps)
    }

    async fn trigger_preprocessing(&self, _session_id: &SessionId) -> Result<()> {
        self.counters.preprocess.fetch_add(1, Ordering::SeqCst);
        self.pass_gate(Op::Preprocess).await;
        self.take_failure(Op::Preprocess)
    }

    async fn session_status(&self, _session_id: &SessionId) -> Result<SessionSnapshot> {
        self.counters.status.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SessionSnapshot::with_status(SessionStatus::Preprocessing)))
    }

    async fn active_algorithms(&self) -> Result<Vec<ActiveAlgorithm>> {
        self.counters.algorithms.fetch_add(1, Ordering::SeqCst);
        self.algorithms.lock().unwrap().clone()
    }

    async fn run_model(
        &self,
        session_id: &SessionId,
        params: &ModelRunParameters,
    ) -> Result<ModelRunReport> {
        self.counters.run_model.fetch_add(1, Ordering::SeqCst);
        self.run_calls
            .lock()
            .unwrap()
            .push((session_id.clone(), params.clone()));
        self.take_failure(Op::RunModel)?;
        Ok(self.report.lock().unwrap().clone())
    }

    async fn active_session_info(&self) -> Result<ActiveSessionInfo> {
        Ok(ActiveSessionInfo {
            session_id: SessionId::new("sample"),
            status: SessionStatus::Ready,
            is_preinserted: true,
            road_count: 10,
            gps_count: 200,
        })
    }

    async fn restore_sample_session(&self) -> Result<SessionId> {
        Ok(SessionId::new("sample"))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn messages(&self, level: NotificationLevel) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.message)
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(NotificationLevel::Error)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<(ResultsRoute, ModelRunReport)>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<(ResultsRoute, ModelRunReport)> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &ResultsRoute, report: &ModelRunReport) {
        self.visits
            .lock()
            .unwrap()
            .push((route.clone(), report.clone()));
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    outcomes: Mutex<Vec<(SessionId, PollOutcome)>>,
}

impl RecordingObserver {
    pub fn outcomes(&self) -> Vec<(SessionId, PollOutcome)> {
        self.outcomes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PollObserver for RecordingObserver {
    async fn on_outcome(&self, session_id: &SessionId, outcome: &PollOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .push((session_id.clone(), outcome.clone()));
    }
}

/// Scheduler whose ticks are released by the test.
///
/// All tickers started from one scheduler share the same permit pool.
#[derive(Clone)]
pub struct ManualScheduler {
    permits: Arc<Semaphore>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
        }
    }

    /// Allows `n` more ticks to fire.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }
}

impl PollScheduler for ManualScheduler {
    fn start(&self) -> Box<dyn PollTicker> {
        Box::new(ManualTicker {
            permits: Arc::clone(&self.permits),
        })
    }
}

struct ManualTicker {
    permits: Arc<Semaphore>,
}

#[async_trait]
impl PollTicker for ManualTicker {
    async fn tick(&mut self) {
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

/// Scheduler that ticks immediately.
pub struct InstantScheduler;

impl PollScheduler for InstantScheduler {
    fn start(&self) -> Box<dyn PollTicker> {
        Box::new(InstantTicker)
    }
}

struct InstantTicker;

#[async_trait]
impl PollTicker for InstantTicker {
    async fn tick(&mut self) {
        tokio::task::yield_now().await;
    }
}
