//! Shared run counters and the background progress reporter.

use crate::types::StatusEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Interval between progress samples
pub(crate) const PROGRESS_UPDATE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
struct CounterValues {
    queued: AtomicU64,
    saved: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    dispatched: AtomicU64,
}

/// Process-wide counters of one run, cheap to clone.
///
/// `queued` is the number of tasks in flight: incremented on dispatch and
/// decremented when a save worker finishes (or abandons) the task. Outcome
/// counters are bumped before `queued` is released, so
/// `saved + failed + queued` never under-reports work handed out.
#[derive(Clone, Debug, Default)]
pub struct Counters {
    inner: Arc<CounterValues>,
}

/// Point-in-time copy of the counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Tasks in flight
    pub queued: u64,
    /// Items saved
    pub saved: u64,
    /// Items that failed
    pub failed: u64,
    /// Items skipped by filters or duplicate checks
    pub skipped: u64,
    /// Tasks handed to the save workers
    pub dispatched: u64,
}

impl CounterSnapshot {
    /// Items with a final outcome (saved or failed)
    pub fn completed(&self) -> u64 {
        self.saved + self.failed
    }

    /// Everything the pipeline has decided on so far
    pub fn total(&self) -> u64 {
        self.saved + self.failed + self.skipped
    }

    /// Status event carrying these counts
    pub fn to_event(self, error: Option<String>) -> StatusEvent {
        StatusEvent {
            finished: self.saved,
            failed: self.failed,
            skipped: self.skipped,
            queued: self.queued,
            error,
        }
    }
}

impl Counters {
    /// A task was handed to the save workers
    pub fn record_dispatch(&self) {
        self.inner.dispatched.fetch_add(1, Ordering::SeqCst);
        self.inner.queued.fetch_add(1, Ordering::SeqCst);
    }

    /// A dispatched task never reached a worker or was never started
    pub fn record_abandoned(&self) {
        self.inner.dispatched.fetch_sub(1, Ordering::SeqCst);
        self.inner.queued.fetch_sub(1, Ordering::SeqCst);
    }

    /// A task finished with the file saved
    pub fn record_saved(&self) {
        self.inner.saved.fetch_add(1, Ordering::SeqCst);
        self.inner.queued.fetch_sub(1, Ordering::SeqCst);
    }

    /// A task finished with an error
    pub fn record_failed(&self) {
        self.inner.failed.fetch_add(1, Ordering::SeqCst);
        self.inner.queued.fetch_sub(1, Ordering::SeqCst);
    }

    /// An item was rejected before dispatch
    pub fn record_skipped(&self) {
        self.inner.skipped.fetch_add(1, Ordering::SeqCst);
    }

    /// Read all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            queued: self.inner.queued.load(Ordering::SeqCst),
            saved: self.inner.saved.load(Ordering::SeqCst),
            failed: self.inner.failed.load(Ordering::SeqCst),
            skipped: self.inner.skipped.load(Ordering::SeqCst),
            dispatched: self.inner.dispatched.load(Ordering::SeqCst),
        }
    }
}

/// Non-fatal errors collected for the end-of-run summary
#[derive(Clone, Debug, Default)]
pub struct ErrorLog {
    errors: Arc<Mutex<Vec<String>>>,
}

impl ErrorLog {
    /// Record an error message
    pub fn push(&self, message: impl Into<String>) {
        let mut errors = match self.errors.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        errors.push(message.into());
    }

    /// Copy of every recorded message, oldest first
    pub fn snapshot(&self) -> Vec<String> {
        match self.errors.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Parameters for spawning a progress reporter background task
pub(crate) struct ProgressReporterParams {
    /// Counters to sample
    pub counters: Counters,
    /// Status event broadcast sender
    pub event_tx: broadcast::Sender<StatusEvent>,
    /// Log a line for every advance
    pub show_progress: bool,
    /// Sampling interval
    pub interval: Duration,
    /// Stops the reporter
    pub cancel_token: CancellationToken,
}

/// Spawn a background task that periodically reports run progress.
///
/// An event is emitted only when the number of decided items advanced since
/// the previous sample. The reporter only reads the counters.
pub(crate) fn spawn_progress_reporter(
    params: ProgressReporterParams,
) -> tokio::task::JoinHandle<()> {
    let ProgressReporterParams {
        counters,
        event_tx,
        show_progress,
        interval,
        cancel_token,
    } = params;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last_total = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let snapshot = counters.snapshot();
                    let total = snapshot.total();
                    if total == last_total {
                        continue;
                    }
                    last_total = total;

                    if show_progress {
                        info!(
                            saved = snapshot.saved,
                            failed = snapshot.failed,
                            skipped = snapshot.skipped,
                            in_flight = snapshot.queued,
                            "Progress"
                        );
                    }
                    event_tx.send(snapshot.to_event(None)).ok();
                }
                _ = cancel_token.cancelled() => {
                    break;
                }
            }
        }
    })
}
