//! Tick sources for status polling.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// A running sequence of poll ticks.
#[async_trait]
pub trait PollTicker: Send + Sync {
    /// Completes when the next poll is due.
    async fn tick(&mut self);
}

/// Creates one ticker per polling run.
pub trait PollScheduler: Send + Sync {
    fn start(&self) -> Box<dyn PollTicker>;
}

/// Fixed-period scheduler on the tokio timer.
///
/// The first tick fires one period after `start`, and a slow fetch delays
/// the following ticks instead of bunching them up.
#[derive(Debug, Clone)]
pub struct IntervalScheduler {
    period: Duration,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl PollScheduler for IntervalScheduler {
    fn start(&self) -> Box<dyn PollTicker> {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Box::new(IntervalTicker { interval })
    }
}

struct IntervalTicker {
    interval: Interval,
}

#[async_trait]
impl PollTicker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
