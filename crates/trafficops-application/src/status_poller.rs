//! Status poller: waits for server-side preprocessing to finish.
//!
//! [`StatusPoller`] is a pure state machine fed one status response per
//! tick. [`PollHandle`] drives it on a spawned task with an injected
//! [`PollScheduler`] and a cancellation token.

use crate::scheduler::{PollScheduler, PollTicker};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use trafficops_core::backend::TrafficBackend;
use trafficops_core::error::{Result, TrafficOpsError};
use trafficops_core::session::{PreprocessingStats, SessionId, SessionSnapshot, SessionStatus};

/// Why a poll ended without a terminal session status.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    /// A status fetch failed; polling stops on the first failure
    Transport(String),
    /// The owner cancelled the poll
    Cancelled,
    /// `max_attempts` fetches returned a non-terminal status
    AttemptsExhausted(u32),
    /// The poll state machine rejected a transition
    Internal(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Transport(message) => write!(f, "status check failed: {}", message),
            AbortReason::Cancelled => f.write_str("cancelled"),
            AbortReason::AttemptsExhausted(n) => {
                write!(f, "still preprocessing after {} status checks", n)
            }
            AbortReason::Internal(message) => write!(f, "internal error: {}", message),
        }
    }
}

/// Final result of one polling run.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Ready(PreprocessingStats),
    Failed(String),
    Aborted(AbortReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollerState {
    Idle,
    Polling { session_id: SessionId, attempts: u32 },
    Ready(PreprocessingStats),
    Failed(String),
    Aborted(AbortReason),
}

/// What the driver should do after a response was recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    Continue,
    Done(PollOutcome),
}

/// `idle -> polling -> ready | failed | aborted`
#[derive(Debug, Clone)]
pub struct StatusPoller {
    state: PollerState,
    max_attempts: Option<u32>,
}

impl StatusPoller {
    /// `max_attempts` of `None` or `Some(0)` polls without a limit.
    pub fn new(max_attempts: Option<u32>) -> Self {
        Self {
            state: PollerState::Idle,
            max_attempts: max_attempts.filter(|max| *max > 0),
        }
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.state, PollerState::Polling { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self.state {
            PollerState::Polling { attempts, .. } => attempts,
            _ => 0,
        }
    }

    /// Begins polling `session_id`. Any earlier terminal state is discarded.
    pub fn start(&mut self, session_id: SessionId) -> Result<()> {
        if let PollerState::Polling { session_id: current, .. } = &self.state {
            return Err(TrafficOpsError::invalid_state(format!(
                "Already polling session {}",
                current
            )));
        }
        self.state = PollerState::Polling {
            session_id,
            attempts: 0,
        };
        Ok(())
    }

    /// Records the result of one status fetch.
    pub fn record(&mut self, response: Result<SessionSnapshot>) -> Result<PollStep> {
        let attempts = match &mut self.state {
            PollerState::Polling { attempts, .. } => {
                *attempts += 1;
                *attempts
            }
            _ => {
                return Err(TrafficOpsError::invalid_state(
                    "Status response received while not polling",
                ));
            }
        };

        let outcome = match response {
            Ok(snapshot) => match snapshot.status {
                SessionStatus::Ready => PollOutcome::Ready(snapshot.stats()),
                SessionStatus::Failed => PollOutcome::Failed(snapshot.failure_message()),
                _ => match self.max_attempts {
                    Some(max) if attempts >= max => {
                        PollOutcome::Aborted(AbortReason::AttemptsExhausted(max))
                    }
                    _ => return Ok(PollStep::Continue),
                },
            },
            Err(e) => PollOutcome::Aborted(AbortReason::Transport(e.user_message())),
        };

        self.finish(outcome.clone());
        Ok(PollStep::Done(outcome))
    }

    /// Stops an active poll. Returns the resulting outcome if one was running.
    pub fn cancel(&mut self) -> Option<PollOutcome> {
        if !self.is_polling() {
            return None;
        }
        let outcome = PollOutcome::Aborted(AbortReason::Cancelled);
        self.finish(outcome.clone());
        Some(outcome)
    }

    fn finish(&mut self, outcome: PollOutcome) {
        self.state = match outcome {
            PollOutcome::Ready(stats) => PollerState::Ready(stats),
            PollOutcome::Failed(message) => PollerState::Failed(message),
            PollOutcome::Aborted(reason) => PollerState::Aborted(reason),
        };
    }
}

/// Receives the outcome of a poll that ended on its own.
///
/// Cancelled polls do not reach the observer.
#[async_trait]
pub trait PollObserver: Send + Sync {
    async fn on_outcome(&self, session_id: &SessionId, outcome: &PollOutcome);
}

/// Awaitable outcome of a [`PollHandle`].
#[derive(Clone)]
pub struct PollWatch {
    rx: watch::Receiver<Option<PollOutcome>>,
}

impl PollWatch {
    /// Waits until the poll ends. A driver that vanished counts as cancelled.
    pub async fn outcome(mut self) -> PollOutcome {
        match self.rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome
                .clone()
                .unwrap_or(PollOutcome::Aborted(AbortReason::Cancelled)),
            Err(_) => PollOutcome::Aborted(AbortReason::Cancelled),
        }
    }
}

/// Owner of one running poll.
///
/// Dropping the handle cancels the poll: the timer stops and an in-flight
/// status fetch is abandoned.
pub struct PollHandle {
    session_id: SessionId,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    outcome: watch::Receiver<Option<PollOutcome>>,
}

impl PollHandle {
    /// Starts polling `session_id` on a new task.
    pub fn spawn(
        backend: Arc<dyn TrafficBackend>,
        scheduler: &dyn PollScheduler,
        session_id: SessionId,
        max_attempts: Option<u32>,
        observer: Arc<dyn PollObserver>,
    ) -> Self {
        let token = CancellationToken::new();
        let (tx, rx) = watch::channel(None);
        let ticker = scheduler.start();

        let driver = PollDriver {
            backend,
            ticker,
            poller: StatusPoller::new(max_attempts),
            session_id: session_id.clone(),
            observer,
            token: token.clone(),
        };

        tracing::info!("[StatusPoller] Polling session {}", session_id);
        let task = tokio::spawn(async move {
            let outcome = driver.run().await;
            tx.send_replace(Some(outcome));
        });

        Self {
            session_id,
            token,
            task: Some(task),
            outcome: rx,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// True once the driver task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn watch(&self) -> PollWatch {
        PollWatch {
            rx: self.outcome.clone(),
        }
    }

    /// Cancels the poll and waits for the driver task to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!("[StatusPoller] Driver for {} ended abnormally: {}", self.session_id, e);
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct PollDriver {
    backend: Arc<dyn TrafficBackend>,
    ticker: Box<dyn PollTicker>,
    poller: StatusPoller,
    session_id: SessionId,
    observer: Arc<dyn PollObserver>,
    token: CancellationToken,
}

impl PollDriver {
    async fn run(mut self) -> PollOutcome {
        if let Err(e) = self.poller.start(self.session_id.clone()) {
            return self.internal_error(e).await;
        }

        loop {
            let cancelled = tokio::select! {
                biased;
                _ = self.token.cancelled() => true,
                _ = self.ticker.tick() => false,
            };
            if cancelled {
                return self.cancelled();
            }

            let response = tokio::select! {
                biased;
                _ = self.token.cancelled() => None,
                response = self.backend.session_status(&self.session_id) => Some(response),
            };
            let Some(response) = response else {
                return self.cancelled();
            };

            tracing::debug!(
                "[StatusPoller] {} attempt {}: {:?}",
                self.session_id,
                self.poller.attempts() + 1,
                response.as_ref().map(|s| s.status)
            );

            match self.poller.record(response) {
                Ok(PollStep::Continue) => continue,
                Ok(PollStep::Done(outcome)) => {
                    tracing::info!("[StatusPoller] {} finished: {:?}", self.session_id, outcome);
                    self.observer.on_outcome(&self.session_id, &outcome).await;
                    return outcome;
                }
                Err(e) => return self.internal_error(e).await,
            }
        }
    }

    async fn internal_error(&self, error: TrafficOpsError) -> PollOutcome {
        tracing::error!("[StatusPoller] Polling of {} aborted: {}", self.session_id, error);
        let outcome = PollOutcome::Aborted(AbortReason::Internal(error.to_string()));
        self.observer.on_outcome(&self.session_id, &outcome).await;
        outcome
    }

    fn cancelled(&mut self) -> PollOutcome {
        tracing::debug!("[StatusPoller] Cancelled polling of {}", self.session_id);
        self.poller
            .cancel()
            .unwrap_or(PollOutcome::Aborted(AbortReason::Cancelled))
    }
}
