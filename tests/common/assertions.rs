//! Custom assertions for pipeline runs

use std::path::Path;
use std::time::Duration;
use subreddit_dl::{PipelineHandle, RunSummary, StatusEvent};
use tokio::sync::broadcast::error::RecvError;

/// Drain status events until the channel closes, then wait for the summary.
///
/// Panics if the run does not finish within `timeout`.
pub async fn run_to_completion(
    mut handle: PipelineHandle,
    timeout: Duration,
) -> (Vec<StatusEvent>, RunSummary) {
    tokio::time::timeout(timeout, async move {
        let mut events = Vec::new();
        loop {
            match handle.events.recv().await {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        let summary = handle.wait().await.expect("pipeline task failed");
        (events, summary)
    })
    .await
    .expect("pipeline did not finish in time")
}

/// Counter invariants that must hold for every event and the final summary
pub fn assert_counter_invariants(events: &[StatusEvent], summary: &RunSummary) {
    for event in events {
        assert!(
            event.finished + event.failed <= summary.dispatched,
            "completed work exceeds dispatched tasks: {:?}",
            event
        );
    }
    assert!(summary.saved + summary.failed <= summary.dispatched);

    let last = events.last().expect("at least the final event is emitted");
    assert_eq!(last.queued, 0, "nothing may be in flight at completion");
    assert_eq!(last.finished, summary.saved);
    assert_eq!(last.failed, summary.failed);
}

/// Number of regular files directly inside `dir`
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .count()
        })
        .unwrap_or(0)
}
