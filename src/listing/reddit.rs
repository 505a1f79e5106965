//! Reddit JSON listing client

use super::wire::ListingEnvelope;
use super::{ListingSource, Page, PageRequest};
use crate::config::ListingConfig;
use crate::error::{ListingError, Result};
use tracing::debug;

/// [`ListingSource`] backed by `GET /r/{subreddit}/{sort}.json`
pub struct RedditListing {
    http_client: reqwest::Client,
    base_url: String,
}

impl RedditListing {
    /// Create a client from the listing settings
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &ListingConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the listing endpoint for a subreddit and sort
    fn endpoint(&self, request: &PageRequest) -> String {
        format!(
            "{}/r/{}/{}.json",
            self.base_url,
            request.subreddit,
            request.sort.as_str()
        )
    }

    fn query(request: &PageRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("limit", request.page_size.to_string()),
            ("raw_json", "1".to_string()),
        ];
        if !request.cursor.is_empty() {
            query.push(("after", request.cursor.clone()));
        }
        if request.sort.uses_timeframe() {
            query.push(("t", request.timeframe.as_str().to_string()));
        }
        query
    }
}

#[async_trait::async_trait]
impl ListingSource for RedditListing {
    async fn fetch_page(&self, request: &PageRequest) -> std::result::Result<Page, ListingError> {
        let url = self.endpoint(request);
        debug!(subreddit = %request.subreddit, cursor = %request.cursor, "Fetching listing page");

        let response = self
            .http_client
            .get(&url)
            .query(&Self::query(request))
            .send()
            .await
            .map_err(|e| ListingError::Transport {
                subreddit: request.subreddit.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListingError::Status {
                subreddit: request.subreddit.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| ListingError::Transport {
            subreddit: request.subreddit.clone(),
            reason: e.to_string(),
        })?;

        let envelope: ListingEnvelope =
            serde_json::from_slice(&body).map_err(|e| ListingError::Decode {
                subreddit: request.subreddit.clone(),
                reason: e.to_string(),
            })?;

        let items: Vec<_> = envelope
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .collect();
        let next = envelope.data.after.filter(|after| !after.is_empty());

        debug!(
            subreddit = %request.subreddit,
            items = items.len(),
            next = next.as_deref().unwrap_or(""),
            "Fetched listing page"
        );

        Ok(Page { items, next })
    }
}
