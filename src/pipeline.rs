//! Pipeline orchestration -- wires listing, fan-in, filters, dispatcher,
//! save workers and the progress reporter into one run.

use crate::config::{Config, normalize_subreddit};
use crate::download::dispatcher::{Dispatcher, DispatcherParams};
use crate::download::pool::{SaveContext, spawn_save_workers};
use crate::download::{ContentFetcher, FileStore, HttpFetcher, LocalStore};
use crate::error::{Error, Result};
use crate::filter::FilterChain;
use crate::listing::{ListingSource, RedditListing};
use crate::stats::{
    Counters, ErrorLog, PROGRESS_UPDATE_INTERVAL, ProgressReporterParams, spawn_progress_reporter,
};
use crate::stream::{FanInStream, PageSettings, SubredditWorker};
use crate::types::{RunSummary, StatusEvent};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Notify, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Capacity of the status event channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// A configured download run, ready to start
pub struct Pipeline {
    config: Config,
    filters: FilterChain,
    source: Arc<dyn ListingSource>,
    fetcher: Arc<dyn ContentFetcher>,
    store: Arc<dyn FileStore>,
}

/// A running pipeline
///
/// `events` yields [`StatusEvent`]s until the run completes, after which the
/// channel reports closed. A receiver that falls more than
/// 1000 events behind observes `RecvError::Lagged` and keeps going.
pub struct PipelineHandle {
    /// Status updates of the run
    pub events: broadcast::Receiver<StatusEvent>,
    cancel: CancellationToken,
    task: JoinHandle<RunSummary>,
}

impl PipelineHandle {
    /// Token that cancels the run
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ask the run to stop; in-flight downloads are aborted
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to complete and return its summary
    ///
    /// # Errors
    /// Returns error if the run task panicked or was aborted
    pub async fn wait(self) -> Result<RunSummary> {
        self.task.await.map_err(|e| {
            if e.is_cancelled() {
                Error::Cancelled
            } else {
                Error::Other(format!("Pipeline task failed: {}", e))
            }
        })
    }
}

impl Pipeline {
    /// Create a pipeline from a configuration and its collaborators
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the configuration is invalid
    pub fn new(
        config: Config,
        source: Arc<dyn ListingSource>,
        fetcher: Arc<dyn ContentFetcher>,
        store: Arc<dyn FileStore>,
    ) -> Result<Self> {
        config.validate()?;
        let filters = FilterChain::standard(config.filters.clone());
        Ok(Self {
            config,
            filters,
            source,
            fetcher,
            store,
        })
    }

    /// Spawn the run.
    ///
    /// Cancelling `cancel` stops every stage; the summary is still produced.
    pub fn start(self, cancel: CancellationToken) -> PipelineHandle {
        let (event_tx, events) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let task = tokio::spawn(self.run(event_tx, cancel.clone()));
        PipelineHandle {
            events,
            cancel,
            task,
        }
    }

    fn subreddits(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.config
            .listing
            .subreddits
            .iter()
            .map(|s| normalize_subreddit(s).to_string())
            .filter(|s| seen.insert(s.to_lowercase()))
            .collect()
    }

    async fn run(
        self,
        event_tx: broadcast::Sender<StatusEvent>,
        cancel: CancellationToken,
    ) -> RunSummary {
        let started = Instant::now();
        let counters = Counters::default();
        let errors = ErrorLog::default();
        let progress = Arc::new(Notify::new());
        let download = &self.config.download;

        let subreddits = self.subreddits();
        info!(
            subreddits = ?subreddits,
            target = download.target_count,
            workers = download.workers,
            dir = %download.download_dir.display(),
            "Starting run"
        );

        let settings = PageSettings::from(&self.config.listing);
        let workers = subreddits
            .iter()
            .map(|name| SubredditWorker::new(name.as_str(), self.source.clone(), settings.clone()))
            .collect();
        let mut stream = FanInStream::new(workers, cancel.child_token());
        let stream_rx = stream.start();

        let (task_tx, task_rx) = mpsc::channel(download.queue_capacity);
        let task_rx = Arc::new(Mutex::new(task_rx));
        let save_workers = spawn_save_workers(
            download.workers,
            Arc::clone(&task_rx),
            SaveContext {
                fetcher: self.fetcher.clone(),
                store: self.store.clone(),
                counters: counters.clone(),
                errors: errors.clone(),
                event_tx: event_tx.clone(),
                progress: progress.clone(),
                cancel: cancel.clone(),
            },
        );

        let reporter_cancel = cancel.child_token();
        let reporter = spawn_progress_reporter(ProgressReporterParams {
            counters: counters.clone(),
            event_tx: event_tx.clone(),
            show_progress: self.config.show_progress,
            interval: PROGRESS_UPDATE_INTERVAL,
            cancel_token: reporter_cancel.clone(),
        });

        let stop_reason = Dispatcher::new(DispatcherParams {
            stream,
            stream_rx,
            filters: self.filters,
            task_tx,
            counters: counters.clone(),
            errors: errors.clone(),
            event_tx: event_tx.clone(),
            progress,
            target: download.target_count,
            download_dir: download.download_dir.clone(),
            subreddit_dirs: download.subreddit_dirs,
            cancel: cancel.clone(),
        })
        .run()
        .await;

        // The task queue is closed now; let in-flight saves finish
        for result in futures::future::join_all(save_workers).await {
            if let Err(e) = result {
                error!(error = %e, "Save worker task failed");
            }
        }

        let abandoned = {
            let mut rx = task_rx.lock().await;
            let mut abandoned = 0u64;
            while rx.try_recv().is_ok() {
                counters.record_abandoned();
                abandoned += 1;
            }
            abandoned
        };
        if abandoned > 0 {
            debug!(abandoned, "Dropped queued tasks that never started");
        }

        reporter_cancel.cancel();
        if let Err(e) = reporter.await {
            error!(error = %e, "Progress reporter task failed");
        }

        let snapshot = counters.snapshot();
        event_tx.send(snapshot.to_event(None)).ok();

        let summary = RunSummary {
            saved: snapshot.saved,
            failed: snapshot.failed,
            skipped: snapshot.skipped,
            dispatched: snapshot.dispatched,
            errors: errors.snapshot(),
            elapsed: started.elapsed(),
            stop_reason,
        };
        info!(
            saved = summary.saved,
            failed = summary.failed,
            skipped = summary.skipped,
            reason = %summary.stop_reason,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Run complete"
        );
        summary
    }
}

/// Start a run against the Reddit listing API, saving into the local filesystem.
///
/// Creates the download directory first.
///
/// # Errors
/// Returns error if the configuration is invalid, the download directory
/// cannot be created, or an HTTP client cannot be built
pub async fn run_pipeline(config: Config, cancel: CancellationToken) -> Result<PipelineHandle> {
    config.validate()?;

    tokio::fs::create_dir_all(config.download_dir())
        .await
        .map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create download directory '{}': {}",
                    config.download_dir().display(),
                    e
                ),
            ))
        })?;

    let source = Arc::new(RedditListing::new(&config.listing)?);
    let fetcher = Arc::new(HttpFetcher::new(&config.listing)?);
    let store = Arc::new(LocalStore::new());

    Ok(Pipeline::new(config, source, fetcher, store)?.start(cancel))
}
