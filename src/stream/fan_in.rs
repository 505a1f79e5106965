//! Fan-in stream -- merges several subreddit workers behind one channel.
//!
//! Workers only pull when the consumer asks for more: every call to
//! [`FanInStream::request_next`] adds one permit to a shared demand semaphore,
//! and whichever idle worker takes the permit performs exactly one pull and
//! sends exactly one [`StreamEvent`]. Termination is a single cancellation
//! token observed by every worker at each suspension point.

use super::worker::SubredditWorker;
use crate::error::ListingError;
use crate::types::MediaItem;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One unit of output from a worker
#[derive(Debug)]
pub enum StreamEvent {
    /// Next item of a subreddit's listing
    Item(MediaItem),
    /// A page fetch failed; the worker stays alive unless the error is permanent
    Error {
        /// Subreddit whose page failed
        subreddit: String,
        /// The failure
        error: ListingError,
    },
    /// The subreddit's listing is exhausted; its worker has stopped
    Exhausted {
        /// Subreddit that ran out of items
        subreddit: String,
    },
}

/// Demand-driven merge of N subreddit workers
pub struct FanInStream {
    workers: Vec<SubredditWorker>,
    worker_count: usize,
    demand: Arc<Semaphore>,
    exhausted: Arc<AtomicUsize>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl FanInStream {
    /// Create a stream over the given workers.
    ///
    /// `cancel` terminates every worker; pass a child of the run's token so
    /// closing the stream does not cancel the rest of the run.
    pub fn new(workers: Vec<SubredditWorker>, cancel: CancellationToken) -> Self {
        Self {
            worker_count: workers.len(),
            workers,
            demand: Arc::new(Semaphore::new(0)),
            exhausted: Arc::new(AtomicUsize::new(0)),
            cancel,
            handles: Vec::new(),
        }
    }

    /// Spawn one task per worker and return the merged event channel.
    ///
    /// The channel closes once every worker task has ended. Calling `start`
    /// a second time returns an already-closed channel.
    pub fn start(&mut self) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(self.worker_count.max(1));
        let prefetch = self.worker_count > 1;

        for worker in self.workers.drain(..) {
            let handle = tokio::spawn(run_worker(WorkerTaskParams {
                worker,
                tx: tx.clone(),
                demand: Arc::clone(&self.demand),
                exhausted: Arc::clone(&self.exhausted),
                cancel: self.cancel.clone(),
                prefetch,
            }));
            self.handles.push(handle);
        }

        rx
    }

    /// Ask for one more event.
    ///
    /// Returns `true` when the stream has completed (every worker exhausted)
    /// or has been closed; no demand is registered in that case.
    pub fn request_next(&self) -> bool {
        if self.is_done() || self.cancel.is_cancelled() {
            return true;
        }
        self.demand.add_permits(1);
        false
    }

    /// Whether every worker has reached exhaustion
    pub fn is_done(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst) >= self.worker_count
    }

    /// Number of workers that have reached exhaustion
    pub fn exhausted_count(&self) -> usize {
        self.exhausted.load(Ordering::SeqCst)
    }

    /// Broadcast termination to every worker. Safe to call more than once.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            debug!(workers = self.worker_count, "Closing fan-in stream");
        }
        self.cancel.cancel();
        self.demand.close();
    }

    /// Wait for every worker task to finish.
    ///
    /// Call after [`close`](Self::close) or once the stream is done.
    pub async fn wait(&mut self) {
        for result in futures::future::join_all(self.handles.drain(..)).await {
            if let Err(e) = result {
                warn!(error = %e, "Subreddit worker task failed");
            }
        }
    }
}

struct WorkerTaskParams {
    worker: SubredditWorker,
    tx: mpsc::Sender<StreamEvent>,
    demand: Arc<Semaphore>,
    exhausted: Arc<AtomicUsize>,
    cancel: CancellationToken,
    prefetch: bool,
}

async fn run_worker(params: WorkerTaskParams) {
    let WorkerTaskParams {
        mut worker,
        tx,
        demand,
        exhausted,
        cancel,
        prefetch,
    } = params;

    if prefetch {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = worker.prefetch() => {}
        }
    }

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = demand.acquire() => match permit {
                Ok(permit) => permit.forget(),
                Err(_) => break,
            },
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = worker.pull() => outcome,
        };

        let event = match outcome {
            Ok(Some(item)) => StreamEvent::Item(item),
            Ok(None) => {
                exhausted.fetch_add(1, Ordering::SeqCst);
                StreamEvent::Exhausted {
                    subreddit: worker.subreddit().to_string(),
                }
            }
            Err(error) => StreamEvent::Error {
                subreddit: worker.subreddit().to_string(),
                error,
            },
        };
        let last = matches!(event, StreamEvent::Exhausted { .. });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = tx.send(event) => {
                if sent.is_err() {
                    break;
                }
            }
        }

        if last {
            break;
        }
    }

    debug!(
        subreddit = %worker.subreddit(),
        pages = worker.pages_fetched(),
        exhausted = worker.is_exhausted(),
        "Subreddit worker stopped"
    );
}
