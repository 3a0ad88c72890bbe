use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use url::Url;

use super::parser::{parse_feed, RawEntries};
use crate::config::AppConfig;
use crate::{Error, Result};

const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;
const MAX_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY_MS: u64 = 500;
const CLIENT_USER_AGENT: &str = concat!("newswire/", env!("CARGO_PKG_VERSION"));

/// Why a feed produced no entries this time
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    #[error("invalid feed URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("HTTP {status} for URL: {url}")]
    Status { url: String, status: u16 },

    #[error("feed too large ({size} bytes) for URL: {url}")]
    TooLarge { url: String, size: usize },

    #[error("feed at {url} could not be parsed: {reason}")]
    Parse { url: String, reason: String },
}

/// Result of reading one feed: entries on success, a failure otherwise
#[derive(Debug)]
pub struct FetchOutcome {
    pub entries: RawEntries,
    pub failure: Option<FetchFailure>,
}

impl FetchOutcome {
    pub fn success(entries: RawEntries) -> Self {
        Self {
            entries,
            failure: None,
        }
    }

    pub fn failed(failure: FetchFailure) -> Self {
        Self {
            entries: RawEntries::empty(),
            failure: Some(failure),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Anything that can turn a feed URL into raw entries.
///
/// Implementations never return an error: a failed read is reported
/// through [`FetchOutcome::failure`] with an empty entry sequence.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

/// HTTP feed client
pub struct FeedClient {
    client: Client,
    max_retries: u32,
    initial_retry_delay: Duration,
}

impl FeedClient {
    /// Create a new feed client with configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Self::build_client(config.sync.request_timeout_secs)?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
            initial_retry_delay: Duration::from_millis(INITIAL_RETRY_DELAY_MS),
        })
    }

    /// Override the transient-error retry budget
    pub fn with_retry(mut self, max_retries: u32, initial_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.initial_retry_delay = initial_delay;
        self
    }

    fn build_client(timeout_secs: u64) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .default_headers(Self::build_headers())
            .build()
            .map_err(Error::Http)
    }

    fn build_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "application/rss+xml,application/atom+xml,application/xml;q=0.9,text/xml;q=0.8,*/*;q=0.5",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers
    }

    /// Fetch with retry and exponential backoff on 429/503 and transport errors
    async fn fetch_with_retry(&self, url: &str) -> std::result::Result<(StatusCode, Bytes), FetchFailure> {
        let mut last_failure = None;
        let mut delay = self.initial_retry_delay;

        for attempt in 0..self.max_retries {
            tracing::debug!("Fetch attempt {} for {}", attempt + 1, url);

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS
                        || status == StatusCode::SERVICE_UNAVAILABLE
                    {
                        tracing::warn!(
                            "Received {} for {}, retrying after {}ms...",
                            status,
                            url,
                            delay.as_millis()
                        );
                        last_failure = Some(FetchFailure::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    } else {
                        match response.bytes().await {
                            Ok(bytes) => return Ok((status, bytes)),
                            Err(e) => {
                                tracing::warn!("Failed to read response body from {}: {}", url, e);
                                last_failure = Some(FetchFailure::Transport {
                                    url: url.to_string(),
                                    reason: e.to_string(),
                                });
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Request failed for {} (attempt {}): {}", url, attempt + 1, e);
                    last_failure = Some(FetchFailure::Transport {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
            }

            if attempt + 1 < self.max_retries {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        Err(last_failure.unwrap_or_else(|| FetchFailure::Transport {
            url: url.to_string(),
            reason: format!("no response after {} attempts", self.max_retries),
        }))
    }

    async fn try_fetch(&self, url: &str) -> std::result::Result<RawEntries, FetchFailure> {
        Url::parse(url).map_err(|e| FetchFailure::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!("Fetching feed from: {}", url);

        let (status, content) = self.fetch_with_retry(url).await?;

        if !status.is_success() {
            return Err(FetchFailure::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if content.len() > MAX_FEED_BYTES {
            return Err(FetchFailure::TooLarge {
                url: url.to_string(),
                size: content.len(),
            });
        }

        parse_feed(&content).map_err(|e| FetchFailure::Parse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        match self.try_fetch(url).await {
            Ok(entries) => FetchOutcome::success(entries),
            Err(failure) => {
                tracing::warn!("{}", failure);
                FetchOutcome::failed(failure)
            }
        }
    }
}
