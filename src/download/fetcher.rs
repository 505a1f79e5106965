//! Media byte fetching

use crate::config::ListingConfig;
use crate::error::{DownloadError, Result};
use crate::utils::extension_from_content_type;
use tracing::debug;

/// Body of a fetched media URL
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fetched {
    /// Raw response body
    pub data: Vec<u8>,
    /// Extension detected from the response's content type, if recognizable
    pub extension: Option<String>,
}

/// Abstraction over retrieving media bytes, enabling testability.
#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch the full body of `url`
    async fn fetch_bytes(&self, url: &str) -> std::result::Result<Fetched, DownloadError>;
}

/// Production [`ContentFetcher`] over HTTP
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher sharing the listing's user agent and timeout
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &ListingConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http_client })
    }
}

#[async_trait::async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> std::result::Result<Fetched, DownloadError> {
        debug!(url, "Fetching media");
        let fetch_error = |e: reqwest::Error| DownloadError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.http_client.get(url).send().await.map_err(fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let extension = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(extension_from_content_type)
            .map(str::to_string);
        let data = response.bytes().await.map_err(fetch_error)?.to_vec();

        Ok(Fetched { data, extension })
    }
}
