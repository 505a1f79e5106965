//! Save worker pool -- fetches, names and writes dispatched items.

use super::{ContentFetcher, DownloadTask, FileStore};
use crate::classify::url_extension;
use crate::error::DownloadError;
use crate::stats::{Counters, ErrorLog};
use crate::types::{ContentType, StatusEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Extensions accepted from the media URL when the response did not name one
const KNOWN_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "mp4", "webm", "mov",
];

/// Shared state handed to every save worker
#[derive(Clone)]
pub(crate) struct SaveContext {
    pub fetcher: Arc<dyn ContentFetcher>,
    pub store: Arc<dyn FileStore>,
    pub counters: Counters,
    pub errors: ErrorLog,
    pub event_tx: broadcast::Sender<StatusEvent>,
    pub progress: Arc<Notify>,
    pub cancel: CancellationToken,
}

/// Spawn `workers` save workers sharing one task receiver.
///
/// Workers exit once the queue is closed and empty, or when the run is
/// cancelled. Tasks still queued after cancellation are left for the caller
/// to drain.
pub(crate) fn spawn_save_workers(
    workers: usize,
    task_rx: Arc<Mutex<mpsc::Receiver<DownloadTask>>>,
    ctx: SaveContext,
) -> Vec<JoinHandle<()>> {
    (0..workers)
        .map(|worker_id| {
            let task_rx = Arc::clone(&task_rx);
            let ctx = ctx.clone();
            tokio::spawn(async move { run_save_worker(worker_id, task_rx, ctx).await })
        })
        .collect()
}

async fn run_save_worker(
    worker_id: usize,
    task_rx: Arc<Mutex<mpsc::Receiver<DownloadTask>>>,
    ctx: SaveContext,
) {
    loop {
        let task = {
            let mut rx = task_rx.lock().await;
            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => None,
                task = rx.recv() => task,
            }
        };
        let Some(task) = task else {
            break;
        };

        let id = task.item.id.clone();
        let url = task.item.url.clone();
        let outcome = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(DownloadError::Fetch {
                url,
                reason: "cancelled".to_string(),
            }),
            outcome = save(&ctx, task) => outcome,
        };

        match outcome {
            Ok(path) => {
                debug!(worker_id, id = %id, path = %path.display(), "Saved");
                ctx.counters.record_saved();
            }
            Err(e) => {
                warn!(worker_id, id = %id, error = %e, "Download failed");
                ctx.counters.record_failed();
                let message = format!("{}: {}", id, e);
                ctx.errors.push(message.clone());
                ctx.event_tx
                    .send(ctx.counters.snapshot().to_event(Some(message)))
                    .ok();
            }
        }
        ctx.progress.notify_one();
    }

    debug!(worker_id, "Save worker stopped");
}

async fn save(ctx: &SaveContext, task: DownloadTask) -> Result<PathBuf, DownloadError> {
    let fetched = ctx.fetcher.fetch_bytes(&task.item.url).await?;
    let extension = pick_extension(fetched.extension.as_deref(), &task.item.url, task.item.content_type);

    let path = ctx
        .store
        .make_unique_filename(&task.destination, &task.base_name, &extension)?;
    ctx.store.persist(&path, &fetched.data).await?;
    Ok(path)
}

/// Detected extension, else a known media extension from the URL, else the
/// default for the content type.
fn pick_extension(detected: Option<&str>, url: &str, content_type: ContentType) -> String {
    if let Some(ext) = detected.filter(|e| !e.is_empty()) {
        return ext.to_string();
    }
    if let Some(ext) = url_extension(url)
        && KNOWN_EXTENSIONS.contains(&ext.as_str())
    {
        return if ext == "jpeg" { "jpg".to_string() } else { ext };
    }
    match content_type {
        ContentType::Image => "jpg",
        ContentType::Video => "mp4",
        ContentType::Text => "html",
    }
    .to_string()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::LocalStore;
    use crate::test_helpers::{MockFetcher, media_item};
    use tempfile::TempDir;

    fn context(fetcher: Arc<MockFetcher>) -> (SaveContext, broadcast::Receiver<StatusEvent>) {
        let (event_tx, event_rx) = broadcast::channel(64);
        let ctx = SaveContext {
            fetcher,
            store: Arc::new(LocalStore::new()),
            counters: Counters::default(),
            errors: ErrorLog::default(),
            event_tx,
            progress: Arc::new(Notify::new()),
            cancel: CancellationToken::new(),
        };
        (ctx, event_rx)
    }

    fn task(id: &str, url: &str, dir: &std::path::Path) -> DownloadTask {
        let mut item = media_item(id);
        item.url = url.to_string();
        DownloadTask {
            item,
            base_name: "same_name".to_string(),
            destination: dir.to_path_buf(),
        }
    }

    #[test]
    fn extension_precedence() {
        assert_eq!(
            pick_extension(Some("png"), "https://i.redd.it/x.jpg", ContentType::Image),
            "png"
        );
        assert_eq!(
            pick_extension(None, "https://i.redd.it/x.JPEG", ContentType::Image),
            "jpg"
        );
        assert_eq!(
            pick_extension(None, "https://v.redd.it/x/DASH_720", ContentType::Video),
            "mp4"
        );
        assert_eq!(
            pick_extension(None, "https://example.com/page.php", ContentType::Image),
            "jpg"
        );
    }

    #[tokio::test]
    async fn saves_every_task_and_counts_outcomes() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        fetcher.fail_url("https://i.redd.it/bad.jpg");
        let (ctx, mut event_rx) = context(fetcher.clone());
        let (task_tx, task_rx) = mpsc::channel(8);

        for (i, url) in [
            "https://i.redd.it/one.jpg",
            "https://i.redd.it/bad.jpg",
            "https://i.redd.it/two.jpg",
        ]
        .into_iter()
        .enumerate()
        {
            ctx.counters.record_dispatch();
            task_tx.send(task(&i.to_string(), url, temp_dir.path())).await.unwrap();
        }
        drop(task_tx);

        let handles = spawn_save_workers(2, Arc::new(Mutex::new(task_rx)), ctx.clone());
        futures::future::join_all(handles).await;

        let snap = ctx.counters.snapshot();
        assert_eq!(snap.saved, 2);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.queued, 0);
        assert_eq!(fetcher.calls(), 3);

        assert!(temp_dir.path().join("same_name.jpg").exists());
        assert!(temp_dir.path().join("same_name (1).jpg").exists());

        let errors = ctx.errors.snapshot();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("1: "));
        let event = event_rx.recv().await.unwrap();
        assert_eq!(event.failed, 1);
        assert!(event.error.is_some());
    }

    #[tokio::test]
    async fn cancelled_workers_leave_queued_tasks() {
        let temp_dir = TempDir::new().unwrap();
        let (ctx, _event_rx) = context(MockFetcher::new());
        let (task_tx, task_rx) = mpsc::channel(8);
        task_tx
            .send(task("a", "https://i.redd.it/a.jpg", temp_dir.path()))
            .await
            .unwrap();

        ctx.cancel.cancel();
        let task_rx = Arc::new(Mutex::new(task_rx));
        let handles = spawn_save_workers(2, task_rx.clone(), ctx.clone());
        futures::future::join_all(handles).await;

        assert!(task_rx.lock().await.try_recv().is_ok(), "task left for draining");
        assert_eq!(ctx.counters.snapshot().saved, 0);
    }
}
