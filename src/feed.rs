use crate::utils::error_chain_fmt;
use actix_web::web::Bytes;
use moka::future::Cache;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = concat!("marketing-api-feed-proxy/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug, PartialEq)]
pub struct FeedDocument {
    pub body: Bytes,
    pub content_type: Option<String>,
}

#[derive(thiserror::Error)]
pub enum FeedError {
    #[error("{0}")]
    InvalidUrl(String),
    #[error("Failed to fetch the feed.")]
    FetchFailed(#[source] Arc<reqwest::Error>),
}

impl std::fmt::Debug for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Fetches remote feed documents, keeping each successful response for
/// a fixed time-to-live under the exact URL string that was requested.
/// Concurrent misses on the same URL share a single origin request.
pub struct FeedProxy {
    http_client: Client,
    cache: Cache<String, FeedDocument>,
}

impl FeedProxy {
    pub fn new(
        cache_ttl: Duration,
        cache_max_capacity: u64,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        let cache = Cache::builder()
            .time_to_live(cache_ttl)
            .max_capacity(cache_max_capacity)
            .build();

        Ok(Self { http_client, cache })
    }

    #[tracing::instrument(name = "Fetching feed", skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<FeedDocument, FeedError> {
        let target = parse_feed_url(url)?;

        // Errors are handed to every waiter and never inserted.
        self.cache
            .try_get_with(url.to_string(), self.fetch_from_origin(target))
            .await
            .map_err(FeedError::FetchFailed)
    }

    async fn fetch_from_origin(&self, target: Url) -> Result<FeedDocument, reqwest::Error> {
        tracing::debug!(%target, "Feed not cached, requesting origin");
        let response = self
            .http_client
            .get(target)
            .send()
            .await?
            .error_for_status()?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);

        Ok(FeedDocument {
            body: response.bytes().await?,
            content_type,
        })
    }
}

fn parse_feed_url(url: &str) -> Result<Url, FeedError> {
    if url.trim().is_empty() {
        return Err(FeedError::InvalidUrl(
            "URL parameter is required.".to_string(),
        ));
    }

    let parsed = Url::parse(url)
        .map_err(|_| FeedError::InvalidUrl(format!("{} is not a valid URL.", url)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(FeedError::InvalidUrl(format!(
            "Unsupported URL scheme: {}.",
            scheme
        ))),
    }
}
