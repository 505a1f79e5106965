//! Error types for subreddit-dl
//!
//! Errors are split by where they can occur in a run:
//! - [`Error`] - top-level errors surfaced to the caller (configuration, startup)
//! - [`ListingError`] - transient failures fetching a listing page
//! - [`DownloadError`] - per-item failures fetching or persisting media
//!
//! Only configuration errors abort a run. Listing and download errors are
//! counted, logged and reported through status events.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for subreddit-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for subreddit-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "subreddits")
        key: Option<String>,
    },

    /// Listing page could not be fetched or decoded
    #[error("listing error: {0}")]
    Listing(#[from] ListingError),

    /// Media item could not be fetched or saved
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The run was cancelled before it completed
    #[error("run cancelled")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a configuration error for the given key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Failure fetching one page of a listing.
///
/// Transient failures never terminate a subreddit worker: the same worker
/// retries on its next demand pull. Source exhaustion is not an error and has
/// no variant here.
#[derive(Debug, Error)]
pub enum ListingError {
    /// Connection, timeout or other transport failure
    #[error("request for r/{subreddit} failed: {reason}")]
    Transport {
        /// Subreddit being listed
        subreddit: String,
        /// Underlying transport error
        reason: String,
    },

    /// Upstream answered with a non-success status
    #[error("r/{subreddit} returned HTTP {status}")]
    Status {
        /// Subreddit being listed
        subreddit: String,
        /// HTTP status code
        status: u16,
    },

    /// Response body was not a listing
    #[error("could not decode listing for r/{subreddit}: {reason}")]
    Decode {
        /// Subreddit being listed
        subreddit: String,
        /// Decoder error message
        reason: String,
    },
}

impl ListingError {
    /// Whether retrying the same request later could succeed.
    ///
    /// Client errors other than 408/429 (e.g. a private or banned subreddit)
    /// will keep failing; a worker gives up on its subreddit after reporting one.
    pub fn is_transient(&self) -> bool {
        match self {
            ListingError::Transport { .. } | ListingError::Decode { .. } => true,
            ListingError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
        }
    }
}

/// Failure downloading or saving a single media item
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Fetching the media bytes failed
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        /// Media URL
        url: String,
        /// Failure description
        reason: String,
    },

    /// Media host answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Media URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Filename could not be derived
    #[error("invalid filename: {reason}")]
    InvalidName {
        /// Why the name was rejected
        reason: String,
    },

    /// No free filename found after exhausting rename attempts
    #[error("no free filename for {path}")]
    FileCollision {
        /// The path whose variants were all taken
        path: PathBuf,
    },

    /// Writing the file failed
    #[error("failed to write {path}: {source}")]
    Persist {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_carries_key() {
        let err = Error::config("target_count", "must be greater than zero");
        match &err {
            Error::Config { key, message } => {
                assert_eq!(key.as_deref(), Some("target_count"));
                assert_eq!(message, "must be greater than zero");
            }
            other => panic!("expected Config error, got {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "configuration error: must be greater than zero"
        );
    }

    #[test]
    fn listing_status_transience() {
        let status = |status| ListingError::Status {
            subreddit: "pics".to_string(),
            status,
        };
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(status(408).is_transient());
        assert!(!status(403).is_transient());
        assert!(!status(404).is_transient());
    }

    #[test]
    fn transport_and_decode_are_transient() {
        let transport = ListingError::Transport {
            subreddit: "pics".to_string(),
            reason: "connection reset".to_string(),
        };
        let decode = ListingError::Decode {
            subreddit: "pics".to_string(),
            reason: "expected value".to_string(),
        };
        assert!(transport.is_transient());
        assert!(decode.is_transient());
    }

    #[test]
    fn listing_error_converts_into_error() {
        let err: Error = ListingError::Status {
            subreddit: "earthporn".to_string(),
            status: 500,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "listing error: r/earthporn returned HTTP 500"
        );
    }
}
