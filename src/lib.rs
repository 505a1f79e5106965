//! # subreddit-dl
//!
//! Concurrent media downloader for subreddit listings.
//!
//! ## Design Philosophy
//!
//! subreddit-dl is designed to be:
//! - **Demand-driven** - listing pages are only fetched when the downloader needs more items
//! - **Sensible defaults** - only the subreddit list has to be provided
//! - **Library-first** - the CLI is a thin wrapper around [`run_pipeline`]
//! - **Event-driven** - consumers subscribe to status events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use subreddit_dl::{Config, run_pipeline, run_until_signal};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.listing.subreddits = vec!["EarthPorn".to_string()];
//!     config.download.target_count = 10;
//!
//!     let handle = run_pipeline(config, CancellationToken::new()).await?;
//!     let summary = run_until_signal(handle).await?;
//!     println!("saved {} files", summary.saved);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Item classification
pub mod classify;
/// Configuration types
pub mod config;
/// Dispatching and saving media
pub mod download;
/// Error types
pub mod error;
/// Item filters
pub mod filter;
/// Listing sources
pub mod listing;
/// Run orchestration
pub mod pipeline;
/// Counters and progress reporting
pub mod stats;
/// Per-subreddit pagination and fan-in
pub mod stream;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::Config;
pub use download::{ContentFetcher, Fetched, FileStore, HttpFetcher, LocalStore};
pub use error::{DownloadError, Error, ListingError, Result};
pub use filter::FilterChain;
pub use listing::{ListingSource, Page, PageRequest, RedditListing};
pub use pipeline::{Pipeline, PipelineHandle, run_pipeline};
pub use types::{
    ContentType, MediaItem, Orientation, RunSummary, SortMode, StatusEvent, StopReason, Timeframe,
};

/// Wait for a run to finish, cancelling it on a termination signal.
///
/// The summary is returned either way; a cancelled run reports
/// [`StopReason::Cancelled`].
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Errors
/// Returns error if the run task failed
pub async fn run_until_signal(handle: PipelineHandle) -> Result<RunSummary> {
    let cancel = handle.cancel_token();
    let watcher = tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                tracing::info!("Cancelling run");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    });

    let result = handle.wait().await;
    watcher.abort();
    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
