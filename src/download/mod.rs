//! Download stage -- dispatching accepted items and saving them to disk.
//!
//! - [`dispatcher`] - admission control, filtering and task hand-off
//! - [`pool`] - fixed pool of save workers
//! - [`fetcher`] - [`ContentFetcher`] seam and its HTTP implementation
//! - [`storage`] - [`FileStore`] seam and the local filesystem store

pub(crate) mod dispatcher;
pub mod fetcher;
pub(crate) mod pool;
pub mod storage;

pub use fetcher::{ContentFetcher, Fetched, HttpFetcher};
pub use storage::{FileStore, LocalStore};

use crate::types::MediaItem;
use std::path::PathBuf;

/// One accepted item on its way to a save worker
#[derive(Clone, Debug)]
pub struct DownloadTask {
    /// The item to save
    pub item: MediaItem,
    /// Sanitized file stem, without extension
    pub base_name: String,
    /// Directory the file goes into
    pub destination: PathBuf,
}
