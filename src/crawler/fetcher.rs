//! Page fetcher for the GraphQL search API
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with timeouts and user agent
//! - Gating every attempt through the shared rate limiter
//! - Feeding quota telemetry back into the limiter
//! - Classifying failures as transient or hard
//! - Downgrading exhausted failures to an abandoned page

use crate::config::{ApiConfig, RateLimitConfig, RetryConfig};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::response::{quota_from_headers, FetchedRecord, GraphQlResponse, SearchRequest};
use crate::crawler::retry::RetryPolicy;
use crate::query::SearchQuery;
use crate::state::QuotaInfo;
use crate::{FetchError, FetchResult};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Error bodies longer than this are truncated before logging
const MAX_ERROR_BODY: usize = 512;

/// One successfully fetched page
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub records: Vec<FetchedRecord>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Result of fetching one page, as seen by the scheduler
#[derive(Debug)]
pub enum PageOutcome {
    /// The page was fetched
    Fetched(FetchedPage),

    /// The page could not be fetched; treated as an empty last page
    Abandoned { error: FetchError },
}

impl PageOutcome {
    pub fn records(&self) -> &[FetchedRecord] {
        match self {
            Self::Fetched(page) => &page.records,
            Self::Abandoned { .. } => &[],
        }
    }

    /// Cursor for the next page, if the server reported one
    pub fn continuation(&self) -> Option<&str> {
        match self {
            Self::Fetched(page) if page.has_next_page => page.end_cursor.as_deref(),
            _ => None,
        }
    }

    pub fn is_abandoned(&self) -> bool {
        matches!(self, Self::Abandoned { .. })
    }

    pub fn into_records(self) -> Vec<FetchedRecord> {
        match self {
            Self::Fetched(page) => page.records,
            Self::Abandoned { .. } => Vec::new(),
        }
    }
}

/// Anything that can produce one page of search results
///
/// Implementations never fail: errors are folded into
/// [`PageOutcome::Abandoned`] so one bad page cannot abort a crawl.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, query: &SearchQuery, cursor: Option<&str>) -> PageOutcome;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use star_crawler::config::ApiConfig;
/// use star_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&ApiConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher backed by the GraphQL search endpoint
pub struct GraphQlFetcher {
    client: Client,
    endpoint: Url,
    token: String,
    page_size: u32,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl GraphQlFetcher {
    /// Creates a fetcher with its own rate limiter
    ///
    /// # Arguments
    ///
    /// * `api` - Endpoint, page size and timeouts
    /// * `rate_limit` - Limiter ceilings
    /// * `retry` - Backoff settings
    /// * `token` - Bearer credential
    pub fn new(
        api: &ApiConfig,
        rate_limit: &RateLimitConfig,
        retry: &RetryConfig,
        token: String,
    ) -> Result<Self, crate::CrawlError> {
        let endpoint = Url::parse(&api.endpoint).map_err(|e| {
            crate::ConfigError::InvalidUrl(format!("Invalid endpoint '{}': {}", api.endpoint, e))
        })?;

        Ok(Self {
            client: build_http_client(api)?,
            endpoint,
            token,
            page_size: api.page_size,
            limiter: Arc::new(RateLimiter::new(rate_limit)),
            retry: RetryPolicy::new(retry),
        })
    }

    /// The limiter every call of this fetcher passes through
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Performs exactly one rate-limited API call
    pub async fn execute(&self, query: &SearchQuery, cursor: Option<&str>) -> FetchResult<FetchedPage> {
        self.limiter.acquire().await;

        let request = SearchRequest::new(query.as_str(), self.page_size, cursor);
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| FetchError::from_transport(&e))?;

        let status = response.status();
        let header_quota = quota_from_headers(response.headers());

        if !status.is_success() {
            let quota_exhausted = header_quota.map_or(false, |q| q.remaining == 0);
            self.limiter.update_from_response(header_quota).await;
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(FetchError::from_status(status.as_u16(), body, quota_exhausted));
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| FetchError::from_transport(&e))?;
        let fetched_at = Utc::now();

        let GraphQlResponse { data, errors } = body;
        let (search, rate_limit) = match data {
            Some(data) => (data.search, data.rate_limit),
            None => (None, None),
        };

        self.limiter
            .update_from_response(rate_limit.map(QuotaInfo::from).or(header_quota))
            .await;

        let messages = errors
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");

        let Some(search) = search else {
            let reason = if messages.is_empty() {
                "response contains no search results".to_string()
            } else {
                messages
            };
            return Err(FetchError::GraphQl(reason));
        };

        if !messages.is_empty() {
            tracing::warn!("Partial errors for '{}': {}", query, messages);
        }

        let records = search
            .nodes
            .into_iter()
            .flatten()
            .map(|node| node.into_record(fetched_at))
            .collect();

        Ok(FetchedPage {
            records,
            has_next_page: search.page_info.has_next_page,
            end_cursor: search.page_info.end_cursor,
        })
    }
}

#[async_trait]
impl PageSource for GraphQlFetcher {
    async fn fetch_page(&self, query: &SearchQuery, cursor: Option<&str>) -> PageOutcome {
        match self.retry.run(|| self.execute(query, cursor)).await {
            Ok(page) => {
                tracing::debug!(
                    "Fetched {} records for '{}' (more: {})",
                    page.records.len(),
                    query,
                    page.has_next_page
                );
                PageOutcome::Fetched(page)
            }
            Err(error) => {
                if error.is_transient() {
                    tracing::warn!(
                        "Giving up on page of '{}' after {} attempts: {}",
                        query,
                        self.retry.max_attempts(),
                        error
                    );
                } else {
                    tracing::error!("Fetch failed for '{}': {}", query, error);
                }
                PageOutcome::Abandoned { error }
            }
        }
    }
}
