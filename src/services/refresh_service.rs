use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::services::aggregate_service::{AggregateResult, AggregateService};

pub const TOTAL_FAILURE_WARNING: &str = "Failed to load some feeds. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The run produced episodes and replaced the previous result.
    Updated,
    /// The run came back empty; the earlier result stays visible.
    KeptPrevious,
    /// The very first run came back empty.
    EmptyFirstLoad,
}

#[derive(Debug, Clone, Default)]
pub struct BoardSnapshot {
    pub latest: Option<Arc<AggregateResult>>,
    pub warning: Option<String>,
    pub runs: u64,
}

/// Holds the most recent aggregation result for whoever is displaying it.
pub struct FeedBoard {
    state: RwLock<BoardSnapshot>,
    version: watch::Sender<u64>,
}

impl Default for FeedBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedBoard {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: RwLock::new(BoardSnapshot::default()),
            version,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BoardSnapshot> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BoardSnapshot> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publish(&self, result: AggregateResult) -> PublishOutcome {
        let outcome = {
            let mut state = self.write();
            state.runs += 1;

            if !result.is_empty() {
                state.latest = Some(Arc::new(result));
                state.warning = None;
                PublishOutcome::Updated
            } else if state.latest.as_ref().is_some_and(|l| !l.is_empty()) {
                state.warning = Some(TOTAL_FAILURE_WARNING.to_string());
                PublishOutcome::KeptPrevious
            } else {
                state.latest = Some(Arc::new(result));
                state.warning = Some(TOTAL_FAILURE_WARNING.to_string());
                PublishOutcome::EmptyFirstLoad
            }
        };

        match outcome {
            PublishOutcome::Updated => debug!("feed board updated"),
            PublishOutcome::KeptPrevious => {
                warn!("all sources came back empty, keeping previous results")
            }
            PublishOutcome::EmptyFirstLoad => warn!("all sources came back empty on first load"),
        }

        self.version.send_modify(|v| *v += 1);
        outcome
    }

    pub fn latest(&self) -> Option<Arc<AggregateResult>> {
        self.read().latest.clone()
    }

    pub fn warning(&self) -> Option<String> {
        self.read().warning.clone()
    }

    pub fn runs(&self) -> u64 {
        self.read().runs
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.read().clone()
    }

    /// Notified after every publish.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

pub struct RefreshService {
    aggregator: Arc<AggregateService>,
    board: Arc<FeedBoard>,
    interval: Duration,
}

impl RefreshService {
    pub fn new(
        aggregator: Arc<AggregateService>,
        board: Arc<FeedBoard>,
        interval: Duration,
    ) -> Self {
        Self {
            aggregator,
            board,
            interval,
        }
    }

    pub fn board(&self) -> &Arc<FeedBoard> {
        &self.board
    }

    /// Run one aggregation and publish it to the board.
    pub async fn refresh_once(&self) -> PublishOutcome {
        let result = self.aggregator.aggregate().await;
        self.board.publish(result)
    }

    /// Start the refresh loop. The first run happens immediately, then once
    /// per interval, plus whenever `RefreshHandle::refresh_now` is called.
    pub fn spawn(self) -> RefreshHandle {
        let (trigger, mut requests) = mpsc::channel::<()>(1);
        let every = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => debug!("scheduled refresh"),
                    Some(()) = requests.recv() => debug!("manual refresh"),
                }
                self.refresh_once().await;
            }
        });

        info!(interval_secs = every.as_secs(), "refresh loop started");
        RefreshHandle { trigger, task }
    }
}

/// Controls a running refresh loop. Dropping the handle stops the loop.
pub struct RefreshHandle {
    trigger: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Ask for a refresh outside the schedule. Returns false once the loop
    /// has stopped.
    pub fn refresh_now(&self) -> bool {
        match self.trigger.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Closed(())) => false,
        }
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
