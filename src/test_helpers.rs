//! Shared test helpers: scripted listing sources, mock fetchers and sample items.

use crate::download::{ContentFetcher, Fetched};
use crate::error::{DownloadError, ListingError};
use crate::listing::{ImageSource, ListingSource, Page, PageRequest, Preview, PreviewImage, RawPost};
use crate::stream::PageSettings;
use crate::types::{ContentType, MediaItem, Orientation, SortMode, Timeframe};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Listing source that replays a fixed script of pages.
///
/// Once the script runs out every further call returns an empty page.
pub(crate) struct ScriptedSource {
    script: Mutex<VecDeque<Result<Page, ListingError>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedSource {
    pub(crate) fn new(script: Vec<Result<Page, ListingError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ListingSource for ScriptedSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page, ListingError> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Page::default()))
    }
}

/// A direct 1920x1080 `i.redd.it` image post from r/pics
pub(crate) fn image_post(id: &str) -> RawPost {
    let url = format!("https://i.redd.it/{}.jpg", id);
    RawPost {
        id: id.to_string(),
        title: id.to_string(),
        url: Some(url.clone()),
        subreddit: "pics".to_string(),
        post_hint: Some("image".to_string()),
        preview: Some(Preview {
            images: vec![PreviewImage {
                source: ImageSource {
                    url,
                    width: 1920,
                    height: 1080,
                },
            }],
        }),
        ..Default::default()
    }
}

/// Page of [`image_post`]s with the given ids and next cursor
pub(crate) fn image_page(ids: &[&str], next: Option<&str>) -> Page {
    Page {
        items: ids.iter().map(|id| image_post(id)).collect(),
        next: next.map(str::to_string),
    }
}

/// Paging settings without any delay
pub(crate) fn settings() -> PageSettings {
    PageSettings {
        page_size: 25,
        sort: SortMode::Hot,
        timeframe: Timeframe::Day,
        page_delay: Duration::ZERO,
    }
}

/// Classified landscape image item
pub(crate) fn media_item(id: &str) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        title: id.to_string(),
        url: format!("https://i.redd.it/{}.jpg", id),
        width: 1920,
        height: 1080,
        content_type: ContentType::Image,
        orientation: Orientation::Landscape,
        nsfw: false,
        subreddit: "pics".to_string(),
        created_at: None,
    }
}

/// Fetcher returning a few bytes for every URL except those marked as failing
#[derive(Default)]
pub(crate) struct MockFetcher {
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_url(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Fetched, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(url) {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: 500,
            });
        }
        Ok(Fetched {
            data: url.as_bytes().to_vec(),
            extension: None,
        })
    }
}
