//! Subreddit worker -- pagination state for one subreddit.
//!
//! The worker owns its cursor and item buffer; nothing else touches them.
//! Each [`pull`](SubredditWorker::pull) yields the next classified item,
//! fetching further pages whenever the buffer runs dry, until the upstream
//! listing stops making progress.

use crate::classify::classify_all;
use crate::config::ListingConfig;
use crate::error::ListingError;
use crate::listing::{ListingSource, PageRequest};
use crate::types::{MediaItem, SortMode, Timeframe};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Paging parameters shared by every worker of a run
#[derive(Clone, Debug)]
pub struct PageSettings {
    /// Posts requested per page
    pub page_size: u32,
    /// Listing sort order
    pub sort: SortMode,
    /// Time window for sorts that use one
    pub timeframe: Timeframe,
    /// Minimum spacing between two fetches of the same worker
    pub page_delay: Duration,
}

impl From<&ListingConfig> for PageSettings {
    fn from(config: &ListingConfig) -> Self {
        Self {
            page_size: config.page_size,
            sort: config.sort,
            timeframe: config.timeframe,
            page_delay: config.page_delay,
        }
    }
}

/// Lifecycle of a worker's upstream listing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListingState {
    /// More pages may follow
    Open,
    /// Upstream reported no further page; the buffer is all that is left
    Drained,
    /// Terminal: no items left and no upstream calls will be made
    Exhausted,
}

/// Pagination state for a single subreddit
pub struct SubredditWorker {
    subreddit: String,
    cursor: String,
    buffer: VecDeque<MediaItem>,
    state: ListingState,
    source: Arc<dyn ListingSource>,
    settings: PageSettings,
    last_fetch: Option<Instant>,
    pages_fetched: u64,
    pending_error: Option<ListingError>,
}

impl SubredditWorker {
    /// Create a worker positioned at the start of the listing
    pub fn new(
        subreddit: impl Into<String>,
        source: Arc<dyn ListingSource>,
        settings: PageSettings,
    ) -> Self {
        Self {
            subreddit: subreddit.into(),
            cursor: String::new(),
            buffer: VecDeque::new(),
            state: ListingState::Open,
            source,
            settings,
            last_fetch: None,
            pages_fetched: 0,
            pending_error: None,
        }
    }

    /// Subreddit this worker pages through
    pub fn subreddit(&self) -> &str {
        &self.subreddit
    }

    /// Current listing state
    pub fn state(&self) -> ListingState {
        self.state
    }

    /// Whether the worker has reached its terminal state
    pub fn is_exhausted(&self) -> bool {
        self.state == ListingState::Exhausted
    }

    /// Number of pages successfully fetched so far
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Eagerly load the first page so the first pull does not wait on the network.
    ///
    /// Does nothing if items are already buffered, the listing is closed, or
    /// an earlier failure is still unreported. A failure is held back and
    /// returned by the next [`pull`](Self::pull).
    pub async fn prefetch(&mut self) {
        if self.pending_error.is_some()
            || !self.buffer.is_empty()
            || self.state != ListingState::Open
        {
            return;
        }
        if let Err(e) = self.fetch_next_page().await {
            debug!(subreddit = %self.subreddit, error = %e, "Prefetch failed");
            self.pending_error = Some(e);
        }
    }

    /// Yield the next item, or `Ok(None)` once the listing is exhausted.
    ///
    /// A transient fetch error leaves the worker unchanged; the next pull
    /// retries the same cursor. A permanent one (e.g. a banned or private
    /// subreddit) is reported once and ends the listing.
    pub async fn pull(&mut self) -> Result<Option<MediaItem>, ListingError> {
        if let Some(e) = self.pending_error.take() {
            return Err(e);
        }
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            match self.state {
                ListingState::Exhausted => return Ok(None),
                ListingState::Drained => {
                    self.state = ListingState::Exhausted;
                    debug!(subreddit = %self.subreddit, pages = self.pages_fetched, "Listing exhausted");
                    return Ok(None);
                }
                ListingState::Open => self.fetch_next_page().await?,
            }
        }
    }

    async fn fetch_next_page(&mut self) -> Result<(), ListingError> {
        self.wait_page_delay().await;
        self.last_fetch = Some(Instant::now());

        let request = PageRequest {
            subreddit: self.subreddit.clone(),
            cursor: self.cursor.clone(),
            page_size: self.settings.page_size,
            sort: self.settings.sort,
            timeframe: self.settings.timeframe,
        };
        let page = match self.source.fetch_page(&request).await {
            Ok(page) => page,
            Err(e) => {
                if !e.is_transient() {
                    warn!(subreddit = %self.subreddit, error = %e, "Listing unavailable, giving up on subreddit");
                    self.state = ListingState::Exhausted;
                }
                return Err(e);
            }
        };
        self.pages_fetched += 1;

        if page.items.is_empty() {
            debug!(subreddit = %self.subreddit, cursor = %self.cursor, "Empty page, listing exhausted");
            self.state = ListingState::Exhausted;
            return Ok(());
        }

        match page.next {
            Some(next) if next == self.cursor => {
                // Upstream handed back the page we already had
                debug!(subreddit = %self.subreddit, cursor = %self.cursor, "Cursor stalled, listing exhausted");
                self.state = ListingState::Exhausted;
                return Ok(());
            }
            Some(next) => self.cursor = next,
            None => self.state = ListingState::Drained,
        }

        let raw_count = page.items.len();
        let mut items = classify_all(page.items);
        for item in &mut items {
            if item.subreddit.is_empty() {
                item.subreddit = self.subreddit.clone();
            }
        }
        debug!(
            subreddit = %self.subreddit,
            raw = raw_count,
            usable = items.len(),
            "Buffered listing page"
        );
        self.buffer.extend(items);
        Ok(())
    }

    async fn wait_page_delay(&self) {
        if let Some(last) = self.last_fetch {
            tokio::time::sleep_until(last + self.settings.page_delay).await;
        }
    }
}
