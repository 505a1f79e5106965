//! Wire format of the Reddit listing endpoint.
//!
//! Only the fields the classifier needs are decoded; everything else in the
//! (very large) post object is ignored.

use serde::Deserialize;

/// Top-level `{"kind": "Listing", "data": {...}}` envelope
#[derive(Debug, Deserialize)]
pub(crate) struct ListingEnvelope {
    pub(crate) data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData {
    #[serde(default)]
    pub(crate) after: Option<String>,
    #[serde(default)]
    pub(crate) children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Child {
    pub(crate) data: RawPost,
}

/// A post as returned by the listing API, before classification
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawPost {
    /// Post id without the `t3_` prefix
    #[serde(default)]
    pub id: String,
    /// Post title
    #[serde(default)]
    pub title: String,
    /// Link target (media URL, gallery URL, or permalink for self posts)
    #[serde(default)]
    pub url: Option<String>,
    /// Subreddit name
    #[serde(default)]
    pub subreddit: String,
    /// Over-18 marker
    #[serde(default)]
    pub over_18: bool,
    /// Self (text) post
    #[serde(default)]
    pub is_self: bool,
    /// Reddit-hosted video
    #[serde(default)]
    pub is_video: bool,
    /// Upstream hint: "image", "hosted:video", "rich:video", "link", "self"
    #[serde(default)]
    pub post_hint: Option<String>,
    /// Creation time in seconds since the epoch
    #[serde(default)]
    pub created_utc: Option<f64>,
    /// Preview renditions with source dimensions
    #[serde(default)]
    pub preview: Option<Preview>,
    /// Hosted media (reddit video)
    #[serde(default)]
    pub media: Option<Media>,
    /// Set on cross-posts and removed posts
    #[serde(default)]
    pub removed_by_category: Option<String>,
}

/// `preview` object of a post
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Preview {
    /// Preview images; the first one describes the linked media
    #[serde(default)]
    pub images: Vec<PreviewImage>,
}

/// One preview image with its source rendition
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PreviewImage {
    /// Full-size rendition
    pub source: ImageSource,
}

/// Full-size rendition of a preview image
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ImageSource {
    /// Rendition URL (HTML-escaped unless `raw_json=1` was requested)
    #[serde(default)]
    pub url: String,
    /// Width in pixels
    #[serde(default)]
    pub width: u32,
    /// Height in pixels
    #[serde(default)]
    pub height: u32,
}

/// `media` object of a post
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Media {
    /// Present for reddit-hosted videos
    #[serde(default)]
    pub reddit_video: Option<RedditVideo>,
}

/// Reddit-hosted video renditions
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RedditVideo {
    /// Progressive MP4 URL
    #[serde(default)]
    pub fallback_url: String,
    /// Width in pixels
    #[serde(default)]
    pub width: u32,
    /// Height in pixels
    #[serde(default)]
    pub height: u32,
}
