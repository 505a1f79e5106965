//! Listing source -- fetches pages of raw posts from the upstream listing API.
//!
//! The pipeline only depends on the [`ListingSource`] trait: given a subreddit
//! and a cursor, return a page of raw posts plus the cursor of the next page.
//! [`RedditListing`] is the production implementation over `reqwest`.

mod reddit;
mod wire;

pub use reddit::RedditListing;
pub use wire::{ImageSource, Media, Preview, PreviewImage, RawPost, RedditVideo};

use crate::error::ListingError;
use crate::types::{SortMode, Timeframe};

/// Parameters of one page request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// Subreddit to list
    pub subreddit: String,
    /// Opaque cursor; empty for the start of the listing
    pub cursor: String,
    /// Maximum number of posts on the page
    pub page_size: u32,
    /// Sort order
    pub sort: SortMode,
    /// Time window (only sent for sorts that use it)
    pub timeframe: Timeframe,
}

/// One page of a listing
#[derive(Clone, Debug, Default)]
pub struct Page {
    /// Raw posts in upstream order
    pub items: Vec<RawPost>,
    /// Cursor of the following page; `None` when upstream reports no more pages
    pub next: Option<String>,
}

/// Abstraction over the upstream listing API, enabling testability.
///
/// Implementations signal exhaustion by returning an empty page or a `next`
/// cursor equal to the requested one. Transport and decoding failures are
/// returned as [`ListingError`] and are never treated as exhaustion.
#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch the page that starts at `request.cursor`
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page, ListingError>;
}
