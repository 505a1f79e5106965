//! Listing fixtures and mock collaborators

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subreddit_dl::config::{DownloadConfig, ListingConfig};
use subreddit_dl::listing::{ImageSource, Preview, PreviewImage, RawPost};
use subreddit_dl::{
    Config, ContentFetcher, DownloadError, Fetched, ListingError, ListingSource, Page,
    PageRequest,
};

/// Direct image post of the given size
pub fn image_post(id: &str, subreddit: &str, width: u32, height: u32) -> RawPost {
    let url = format!("https://i.redd.it/{}.jpg", id);
    RawPost {
        id: id.to_string(),
        title: format!("Photo {}", id),
        url: Some(url.clone()),
        subreddit: subreddit.to_string(),
        post_hint: Some("image".to_string()),
        preview: Some(Preview {
            images: vec![PreviewImage {
                source: ImageSource { url, width, height },
            }],
        }),
        ..Default::default()
    }
}

/// Page of 1920x1080 image posts
pub fn page(subreddit: &str, ids: &[&str], next: Option<&str>) -> Page {
    Page {
        items: ids
            .iter()
            .map(|id| image_post(id, subreddit, 1920, 1080))
            .collect(),
        next: next.map(str::to_string),
    }
}

/// Configuration for a fast local run
pub fn test_config(dir: &Path, subreddits: &[&str], target: u64) -> Config {
    Config {
        listing: ListingConfig {
            subreddits: subreddits.iter().map(|s| s.to_string()).collect(),
            page_delay: Duration::ZERO,
            ..Default::default()
        },
        download: DownloadConfig {
            target_count: target,
            download_dir: dir.to_path_buf(),
            workers: 4,
            queue_capacity: 8,
            ..Default::default()
        },
        show_progress: false,
        ..Default::default()
    }
}

/// Listing source serving a fixed script of pages per subreddit.
///
/// A subreddit whose script has run out gets empty pages.
#[derive(Default)]
pub struct MockListing {
    scripts: Mutex<Vec<(String, VecDeque<Result<Page, ListingError>>)>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl MockListing {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_pages(
        self: Arc<Self>,
        subreddit: &str,
        pages: Vec<Result<Page, ListingError>>,
    ) -> Arc<Self> {
        self.scripts
            .lock()
            .unwrap()
            .push((subreddit.to_string(), pages.into()));
        self
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_for(&self, subreddit: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.subreddit == subreddit)
            .count()
    }
}

#[async_trait::async_trait]
impl ListingSource for MockListing {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page, ListingError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut scripts = self.scripts.lock().unwrap();
        scripts
            .iter_mut()
            .find(|(name, _)| *name == request.subreddit)
            .and_then(|(_, pages)| pages.pop_front())
            .unwrap_or_else(|| Ok(Page::default()))
    }
}

/// Fetcher that serves a small body for every URL, optionally failing some
/// and optionally taking a while per request
#[derive(Default)]
pub struct MockFetcher {
    failing: Mutex<HashSet<String>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(self: Arc<Self>, url: &str) -> Arc<Self> {
        self.failing.lock().unwrap().insert(url.to_string());
        self
    }

    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Fetched, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(url) {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: 502,
            });
        }
        Ok(Fetched {
            data: url.as_bytes().to_vec(),
            extension: Some("jpg".to_string()),
        })
    }
}
