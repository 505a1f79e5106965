//! Core types shared across the pipeline stages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Kind of media a post points at
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Still image (jpg, png, gif)
    #[default]
    Image,
    /// Video (reddit-hosted or direct mp4/webm)
    Video,
    /// Self/text post
    Text,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Image => write!(f, "image"),
            ContentType::Video => write!(f, "video"),
            ContentType::Text => write!(f, "text"),
        }
    }
}

/// Aspect orientation of a media item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Wider than tall
    Landscape,
    /// Taller than wide
    Portrait,
    /// Equal sides, or dimensions unknown
    #[default]
    Square,
}

impl Orientation {
    /// Derive the orientation from pixel dimensions.
    ///
    /// Unknown dimensions (either side zero) are reported as square.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return Orientation::Square;
        }
        match width.cmp(&height) {
            std::cmp::Ordering::Greater => Orientation::Landscape,
            std::cmp::Ordering::Less => Orientation::Portrait,
            std::cmp::Ordering::Equal => Orientation::Square,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Landscape => write!(f, "landscape"),
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::Square => write!(f, "square"),
        }
    }
}

/// Listing sort order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Currently trending posts
    #[default]
    Hot,
    /// Newest first
    New,
    /// Highest score within a timeframe
    Top,
    /// Rising posts
    Rising,
    /// Most contested within a timeframe
    Controversial,
}

impl SortMode {
    /// Path segment used by the listing endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Hot => "hot",
            SortMode::New => "new",
            SortMode::Top => "top",
            SortMode::Rising => "rising",
            SortMode::Controversial => "controversial",
        }
    }

    /// Whether the listing endpoint honours a timeframe for this sort
    pub fn uses_timeframe(&self) -> bool {
        matches!(self, SortMode::Top | SortMode::Controversial)
    }
}

impl FromStr for SortMode {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hot" => Ok(SortMode::Hot),
            "new" => Ok(SortMode::New),
            "top" => Ok(SortMode::Top),
            "rising" => Ok(SortMode::Rising),
            "controversial" => Ok(SortMode::Controversial),
            other => Err(crate::error::Error::config(
                "sort",
                format!("unknown sort mode '{}'", other),
            )),
        }
    }
}

/// Time window for `top` and `controversial` listings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Past hour
    Hour,
    /// Past 24 hours
    #[default]
    Day,
    /// Past week
    Week,
    /// Past month
    Month,
    /// Past year
    Year,
    /// All time
    All,
}

impl Timeframe {
    /// Query value used by the listing endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Hour => "hour",
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::Year => "year",
            Timeframe::All => "all",
        }
    }
}

impl FromStr for Timeframe {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(Timeframe::Hour),
            "day" => Ok(Timeframe::Day),
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            "year" => Ok(Timeframe::Year),
            "all" => Ok(Timeframe::All),
            other => Err(crate::error::Error::config(
                "timeframe",
                format!("unknown timeframe '{}'", other),
            )),
        }
    }
}

/// A classified post, ready for filtering and download.
///
/// Derived fields (orientation, dimensions) are computed once by the classifier.
/// Items are handed from stage to stage by value and never mutated in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Upstream post id (e.g. "1abcde")
    pub id: String,
    /// Post title
    pub title: String,
    /// Direct media URL
    pub url: String,
    /// Width in pixels (0 if unknown)
    pub width: u32,
    /// Height in pixels (0 if unknown)
    pub height: u32,
    /// Classified media kind
    pub content_type: ContentType,
    /// Orientation derived from the dimensions
    pub orientation: Orientation,
    /// Marked as over-18 upstream
    pub nsfw: bool,
    /// Subreddit the item was listed in
    pub subreddit: String,
    /// Creation time reported upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Status update emitted while a pipeline runs.
///
/// The event channel closes once the run has completed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Items saved so far
    pub finished: u64,
    /// Items that failed to download or save
    pub failed: u64,
    /// Items rejected by filters or duplicate checks
    pub skipped: u64,
    /// Tasks currently in flight
    pub queued: u64,
    /// Error that triggered this event, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Why the dispatcher stopped handing out work
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Saved plus failed reached the target count
    TargetReached,
    /// Every subreddit ran out of items first
    #[default]
    SourcesExhausted,
    /// The run was cancelled
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::TargetReached => "target reached",
            StopReason::SourcesExhausted => "sources exhausted",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Final statistics of a completed run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items saved to disk
    pub saved: u64,
    /// Items that failed to download or save
    pub failed: u64,
    /// Items rejected by filters or duplicate checks
    pub skipped: u64,
    /// Download tasks handed to the save workers
    pub dispatched: u64,
    /// Non-fatal errors collected during the run
    pub errors: Vec<String>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Why the run stopped
    pub stop_reason: StopReason,
}
