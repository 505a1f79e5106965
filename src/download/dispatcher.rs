//! Download dispatcher -- pulls items from the fan-in stream and hands
//! accepted ones to the save workers until the target count is reached.
//!
//! Admission is counted against `saved + failed + queued`, so the dispatcher
//! never has more work outstanding than the target still needs. Save workers
//! signal the shared [`Notify`] after every completed task.

use super::DownloadTask;
use crate::error::ListingError;
use crate::filter::FilterChain;
use crate::stats::{Counters, ErrorLog};
use crate::stream::{FanInStream, StreamEvent};
use crate::types::{MediaItem, StatusEvent, StopReason};
use crate::utils::sanitize_filename;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything the dispatcher task needs
pub(crate) struct DispatcherParams {
    pub stream: FanInStream,
    pub stream_rx: mpsc::Receiver<StreamEvent>,
    pub filters: FilterChain,
    pub task_tx: mpsc::Sender<DownloadTask>,
    pub counters: Counters,
    pub errors: ErrorLog,
    pub event_tx: broadcast::Sender<StatusEvent>,
    pub progress: Arc<Notify>,
    pub target: u64,
    pub download_dir: PathBuf,
    pub subreddit_dirs: bool,
    pub cancel: CancellationToken,
}

pub(crate) struct Dispatcher {
    stream: FanInStream,
    stream_rx: mpsc::Receiver<StreamEvent>,
    filters: FilterChain,
    task_tx: mpsc::Sender<DownloadTask>,
    counters: Counters,
    errors: ErrorLog,
    event_tx: broadcast::Sender<StatusEvent>,
    progress: Arc<Notify>,
    target: u64,
    download_dir: PathBuf,
    subreddit_dirs: bool,
    seen: HashSet<String>,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub(crate) fn new(params: DispatcherParams) -> Self {
        Self {
            stream: params.stream,
            stream_rx: params.stream_rx,
            filters: params.filters,
            task_tx: params.task_tx,
            counters: params.counters,
            errors: params.errors,
            event_tx: params.event_tx,
            progress: params.progress,
            target: params.target,
            download_dir: params.download_dir,
            subreddit_dirs: params.subreddit_dirs,
            seen: HashSet::new(),
            cancel: params.cancel,
        }
    }

    /// Dispatch until the target is reached, the stream runs dry, or the run
    /// is cancelled. Closes the stream and waits for its workers before
    /// returning; dropping `self` closes the task queue.
    pub(crate) async fn run(mut self) -> StopReason {
        let reason = self.dispatch_loop().await;

        self.stream.close();
        self.stream.wait().await;

        info!(
            reason = %reason,
            exhausted_subreddits = self.stream.exhausted_count(),
            dispatched = self.counters.snapshot().dispatched,
            "Dispatcher stopped"
        );
        reason
    }

    async fn dispatch_loop(&mut self) -> StopReason {
        loop {
            if let Some(reason) = self.wait_for_capacity().await {
                return reason;
            }

            if self.stream.request_next() {
                return self.end_of_stream();
            }

            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return StopReason::Cancelled,
                event = self.stream_rx.recv() => event,
            };

            match event {
                Some(StreamEvent::Item(item)) => {
                    if !self.dispatch(item).await {
                        return StopReason::Cancelled;
                    }
                }
                Some(StreamEvent::Error { subreddit, error }) => {
                    self.report_listing_error(&subreddit, &error);
                }
                Some(StreamEvent::Exhausted { subreddit }) => {
                    debug!(subreddit = %subreddit, "Subreddit exhausted");
                }
                None => return self.end_of_stream(),
            }
        }
    }

    fn end_of_stream(&self) -> StopReason {
        if self.cancel.is_cancelled() {
            StopReason::Cancelled
        } else {
            StopReason::SourcesExhausted
        }
    }

    /// Wait until another task may be dispatched.
    ///
    /// Returns the stop reason if the run should end instead.
    async fn wait_for_capacity(&self) -> Option<StopReason> {
        loop {
            if self.cancel.is_cancelled() {
                return Some(StopReason::Cancelled);
            }
            let snapshot = self.counters.snapshot();
            if snapshot.completed() >= self.target {
                return Some(StopReason::TargetReached);
            }
            if snapshot.completed() + snapshot.queued < self.target {
                return None;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Some(StopReason::Cancelled),
                _ = self.progress.notified() => {}
            }
        }
    }

    /// Filter and enqueue one item. Returns `false` if the run was cancelled
    /// while waiting for queue space.
    async fn dispatch(&mut self, item: MediaItem) -> bool {
        if let Some(reason) = self.filters.rejection(&item) {
            debug!(id = %item.id, subreddit = %item.subreddit, filter = reason, "Item filtered");
            self.counters.record_skipped();
            return true;
        }
        if !self.seen.insert(item.id.clone()) {
            debug!(id = %item.id, "Duplicate item skipped");
            self.counters.record_skipped();
            return true;
        }

        let task = self.build_task(item);
        self.counters.record_dispatch();

        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            result = self.task_tx.send(task) => result.is_ok(),
        };
        if !sent {
            self.counters.record_abandoned();
        }
        sent
    }

    fn build_task(&self, item: MediaItem) -> DownloadTask {
        let mut base_name = sanitize_filename(&item.title);
        if base_name.is_empty() {
            base_name = sanitize_filename(&item.id);
        }

        let destination = if self.subreddit_dirs {
            let dir = sanitize_filename(&item.subreddit);
            if dir.is_empty() {
                self.download_dir.clone()
            } else {
                self.download_dir.join(dir)
            }
        } else {
            self.download_dir.clone()
        };

        DownloadTask {
            item,
            base_name,
            destination,
        }
    }

    fn report_listing_error(&self, subreddit: &str, error: &ListingError) {
        warn!(subreddit = %subreddit, error = %error, transient = error.is_transient(), "Listing page failed");
        let message = error.to_string();
        self.errors.push(message.clone());
        self.event_tx
            .send(self.counters.snapshot().to_event(Some(message)))
            .ok();
    }
}
