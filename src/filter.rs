//! Filter chain -- decides which classified items are worth downloading.
//!
//! Each predicate answers "should this item be rejected?". The chain rejects
//! an item as soon as any predicate does; predicates are pure and never
//! modify the item.

use crate::config::{FilterConfig, NsfwPolicy};
use crate::types::MediaItem;
use chrono::Utc;
use regex::Regex;
use tracing::warn;

/// A rejection predicate: returns `true` if the item must be skipped
pub type Predicate = fn(&MediaItem, &FilterConfig) -> bool;

/// Ordered list of named predicates evaluated against one configuration
pub struct FilterChain {
    config: FilterConfig,
    predicates: Vec<(&'static str, Predicate)>,
    title_excludes: Vec<Regex>,
}

impl FilterChain {
    /// Chain with no predicates (accepts everything)
    pub fn empty(config: FilterConfig) -> Self {
        let title_excludes = compile_patterns(&config.title_exclude);
        Self {
            config,
            predicates: Vec::new(),
            title_excludes,
        }
    }

    /// The built-in predicates, cheapest first
    pub fn standard(config: FilterConfig) -> Self {
        Self::empty(config)
            .with("url", reject_invalid_url)
            .with("content_type", reject_content_type)
            .with("nsfw", reject_nsfw)
            .with("resolution", reject_resolution)
            .with("orientation", reject_orientation)
            .with("max_age", reject_too_old)
    }

    /// Append a predicate to the end of the chain
    pub fn with(mut self, name: &'static str, predicate: Predicate) -> Self {
        self.predicates.push((name, predicate));
        self
    }

    /// Whether any predicate rejects the item
    pub fn is_filtered(&self, item: &MediaItem) -> bool {
        self.rejection(item).is_some()
    }

    /// Name of the first predicate rejecting the item, if any
    pub fn rejection(&self, item: &MediaItem) -> Option<&'static str> {
        if let Some((name, _)) = self
            .predicates
            .iter()
            .find(|(_, predicate)| predicate(item, &self.config))
        {
            return Some(*name);
        }
        if self.title_excludes.iter().any(|re| re.is_match(&item.title)) {
            return Some("title");
        }
        None
    }

    /// Configuration the predicates are evaluated against
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

/// Compile title patterns, dropping (and logging) invalid ones.
///
/// `Config::validate` rejects invalid patterns up front, so this only drops
/// patterns for chains built from unvalidated configs.
fn compile_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Ignoring invalid title pattern");
                None
            }
        })
        .collect()
}

/// Reject unless both dimensions meet the configured minimums
pub fn reject_resolution(item: &MediaItem, config: &FilterConfig) -> bool {
    item.width < config.min_width || item.height < config.min_height
}

/// Reject empty URLs and anything that is not an absolute http(s) URL with a host
pub fn reject_invalid_url(item: &MediaItem, _config: &FilterConfig) -> bool {
    if item.url.is_empty() {
        return true;
    }
    match url::Url::parse(&item.url) {
        Ok(url) => !matches!(url.scheme(), "http" | "https") || url.host_str().is_none(),
        Err(_) => true,
    }
}

/// Reject items whose orientation differs from the requested one
pub fn reject_orientation(item: &MediaItem, config: &FilterConfig) -> bool {
    !config.orientation.accepts(item.orientation)
}

/// Reject items whose media kind differs from the requested one
pub fn reject_content_type(item: &MediaItem, config: &FilterConfig) -> bool {
    !config.content.accepts(item.content_type)
}

/// Apply the NSFW policy
pub fn reject_nsfw(item: &MediaItem, config: &FilterConfig) -> bool {
    match config.nsfw {
        NsfwPolicy::Allow => false,
        NsfwPolicy::Deny => item.nsfw,
        NsfwPolicy::Only => !item.nsfw,
    }
}

/// Reject items older than `max_age`; items without a timestamp pass
pub fn reject_too_old(item: &MediaItem, config: &FilterConfig) -> bool {
    let (Some(max_age), Some(created_at)) = (config.max_age, item.created_at) else {
        return false;
    };
    let age = Utc::now().signed_duration_since(created_at);
    age.to_std().map(|age| age > max_age).unwrap_or(false)
}
