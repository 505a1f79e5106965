//! Configuration types for subreddit-dl
//!
//! One [`Config`] value is built at startup (from JSON and/or the command
//! line), validated, and handed to the pipeline.

use crate::error::{Error, Result};
use crate::types::{ContentType, Orientation, SortMode, Timeframe};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Maximum page size accepted by the listing endpoint
pub const MAX_PAGE_SIZE: u32 = 100;

/// Listing source settings (which subreddits, how to page through them)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Subreddits to pull from, without the `r/` prefix
    #[serde(default)]
    pub subreddits: Vec<String>,

    /// Sort order of the listing (default: hot)
    #[serde(default)]
    pub sort: SortMode,

    /// Time window for `top`/`controversial` (default: day)
    #[serde(default)]
    pub timeframe: Timeframe,

    /// Posts requested per page (default: 100, the upstream maximum)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Fixed delay between consecutive page fetches of one subreddit (default: 1s)
    #[serde(default = "default_page_delay", with = "duration_serde")]
    pub page_delay: Duration,

    /// Base URL of the listing API (default: "https://www.reddit.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (default: 30s)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            subreddits: Vec::new(),
            sort: SortMode::default(),
            timeframe: Timeframe::default(),
            page_size: default_page_size(),
            page_delay: default_page_delay(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Requested orientation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationFilter {
    /// No filtering on orientation
    #[default]
    #[serde(alias = "", alias = "all")]
    Any,
    /// Only wider-than-tall items
    Landscape,
    /// Only taller-than-wide items
    Portrait,
    /// Only square items
    Square,
}

impl OrientationFilter {
    /// Whether an item with the given orientation satisfies this filter
    pub fn accepts(&self, orientation: Orientation) -> bool {
        match self {
            OrientationFilter::Any => true,
            OrientationFilter::Landscape => orientation == Orientation::Landscape,
            OrientationFilter::Portrait => orientation == Orientation::Portrait,
            OrientationFilter::Square => orientation == Orientation::Square,
        }
    }
}

/// Requested media kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFilter {
    /// Images and videos
    #[default]
    #[serde(alias = "", alias = "all")]
    Any,
    /// Images only
    Image,
    /// Videos only
    Video,
    /// Text posts only
    Text,
}

impl ContentFilter {
    /// Whether an item of the given type satisfies this filter.
    ///
    /// `Any` accepts everything downloadable, which excludes text posts.
    pub fn accepts(&self, content_type: ContentType) -> bool {
        match self {
            ContentFilter::Any => content_type != ContentType::Text,
            ContentFilter::Image => content_type == ContentType::Image,
            ContentFilter::Video => content_type == ContentType::Video,
            ContentFilter::Text => content_type == ContentType::Text,
        }
    }
}

/// How NSFW-marked posts are treated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NsfwPolicy {
    /// Download regardless of the NSFW flag
    #[default]
    #[serde(alias = "", alias = "all")]
    Allow,
    /// Skip NSFW posts
    Deny,
    /// Download only NSFW posts
    Only,
}

impl FromStr for OrientationFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" | "all" => Ok(OrientationFilter::Any),
            "landscape" => Ok(OrientationFilter::Landscape),
            "portrait" => Ok(OrientationFilter::Portrait),
            "square" => Ok(OrientationFilter::Square),
            other => Err(Error::config(
                "orientation",
                format!("unknown orientation '{}'", other),
            )),
        }
    }
}

impl FromStr for ContentFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" | "all" => Ok(ContentFilter::Any),
            "image" | "images" => Ok(ContentFilter::Image),
            "video" | "videos" => Ok(ContentFilter::Video),
            "text" => Ok(ContentFilter::Text),
            other => Err(Error::config(
                "content",
                format!("unknown content type '{}'", other),
            )),
        }
    }
}

impl FromStr for NsfwPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "allow" | "all" => Ok(NsfwPolicy::Allow),
            "deny" => Ok(NsfwPolicy::Deny),
            "only" => Ok(NsfwPolicy::Only),
            other => Err(Error::config(
                "nsfw",
                format!("unknown NSFW policy '{}'", other),
            )),
        }
    }
}

/// Item filter settings evaluated by the filter chain
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Minimum width in pixels (0 = no minimum)
    #[serde(default)]
    pub min_width: u32,

    /// Minimum height in pixels (0 = no minimum)
    #[serde(default)]
    pub min_height: u32,

    /// Requested orientation
    #[serde(default)]
    pub orientation: OrientationFilter,

    /// Requested media kind
    #[serde(default)]
    pub content: ContentFilter,

    /// NSFW handling
    #[serde(default)]
    pub nsfw: NsfwPolicy,

    /// Regex patterns; a title matching any of them is skipped
    #[serde(default)]
    pub title_exclude: Vec<String>,

    /// Skip posts older than this (None = no age limit)
    #[serde(default, with = "optional_duration_serde")]
    pub max_age: Option<Duration>,
}

/// Download behavior settings (target, directories, concurrency)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Number of items to save or fail before stopping (default: 25)
    #[serde(default = "default_target_count")]
    pub target_count: u64,

    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Save each subreddit's media into its own sub-directory
    #[serde(default)]
    pub subreddit_dirs: bool,

    /// Number of concurrent save workers (default: 4)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the bounded task queue between dispatcher and workers (default: 16)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            target_count: default_target_count(),
            download_dir: default_download_dir(),
            subreddit_dirs: false,
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Main configuration for a download run
///
/// Fields are organized into logical sub-configs:
/// - [`listing`](ListingConfig) - subreddits, sort, pagination
/// - [`filters`](FilterConfig) - resolution, orientation, type, NSFW
/// - [`download`](DownloadConfig) - target count, directory, concurrency
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listing source settings
    #[serde(default)]
    pub listing: ListingConfig,

    /// Item filters
    #[serde(default)]
    pub filters: FilterConfig,

    /// Download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Log a progress line whenever the counters advance
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Check the configuration for values that would make a run meaningless.
    ///
    /// Called before any worker starts; every error here is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.listing.subreddits.is_empty() {
            return Err(Error::config(
                "subreddits",
                "at least one subreddit is required",
            ));
        }
        if let Some(blank) = self
            .listing
            .subreddits
            .iter()
            .find(|s| normalize_subreddit(s).is_empty())
        {
            return Err(Error::config(
                "subreddits",
                format!("invalid subreddit name '{}'", blank),
            ));
        }
        if self.listing.page_size == 0 || self.listing.page_size > MAX_PAGE_SIZE {
            return Err(Error::config(
                "page_size",
                format!("page size must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }
        if url::Url::parse(&self.listing.base_url).is_err() {
            return Err(Error::config(
                "base_url",
                format!("'{}' is not a valid URL", self.listing.base_url),
            ));
        }
        if self.download.target_count == 0 {
            return Err(Error::config(
                "target_count",
                "target count must be greater than zero",
            ));
        }
        if self.download.workers == 0 {
            return Err(Error::config("workers", "at least one worker is required"));
        }
        if self.download.queue_capacity == 0 {
            return Err(Error::config(
                "queue_capacity",
                "queue capacity must be greater than zero",
            ));
        }
        for pattern in &self.filters.title_exclude {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(Error::config(
                    "title_exclude",
                    format!("invalid pattern '{}': {}", pattern, e),
                ));
            }
        }
        Ok(())
    }
}

/// Strip an optional `r/` or `/r/` prefix and surrounding whitespace
pub fn normalize_subreddit(name: &str) -> &str {
    let name = name.trim();
    let name = name.strip_prefix('/').unwrap_or(name);
    let name = name.strip_prefix("r/").unwrap_or(name);
    name.trim_matches('/')
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_page_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_base_url() -> String {
    "https://www.reddit.com".to_string()
}

fn default_user_agent() -> String {
    format!("subreddit-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_target_count() -> u64 {
    25
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    16
}

fn default_true() -> bool {
    true
}

// Durations are stored as milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
