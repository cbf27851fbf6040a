use chrono::NaiveDate;
use serde::Deserialize;

/// Main configuration structure for Star-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Search API connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// GraphQL endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Name of the environment variable holding the bearer token
    #[serde(rename = "token-env", default = "default_token_env")]
    pub token_env: String,

    /// Items requested per page (server caps this at 100)
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Total request timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Crawl loop settings
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of records after which the crawl stops
    #[serde(rename = "target-count", default = "default_target_count")]
    pub target_count: usize,

    /// Maximum number of page fetches in flight at once
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Buffered record count that triggers a bulk write
    #[serde(rename = "flush-threshold", default = "default_flush_threshold")]
    pub flush_threshold: usize,
}

/// Rate limiter settings
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Proactive ceiling of calls per rolling window
    #[serde(rename = "requests-per-hour", default = "default_requests_per_hour")]
    pub requests_per_hour: u32,

    /// Length of the rolling window in seconds
    #[serde(rename = "window-secs", default = "default_window_secs")]
    pub window_secs: u64,

    /// Server-reported remaining quota below which calls wait for the reset
    #[serde(rename = "quota-floor", default = "default_quota_floor")]
    pub quota_floor: u32,

    /// Extra seconds slept past the server's reset instant
    #[serde(rename = "reset-margin-secs", default = "default_reset_margin")]
    pub reset_margin_secs: u64,
}

/// Retry policy settings for transient fetch failures
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(rename = "initial-backoff-ms", default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Upper bound on any single retry delay (milliseconds)
    #[serde(rename = "max-backoff-ms", default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

/// Storage settings
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Attempts per bulk write before the crawl is aborted
    #[serde(rename = "flush-attempts", default = "default_flush_attempts")]
    pub flush_attempts: u32,
}

/// Facet dimensions used to partition the search space
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchConfig {
    /// Category values (programming languages)
    #[serde(default)]
    pub languages: Vec<String>,

    /// Calendar years, each expanded to a full-year creation window
    #[serde(default)]
    pub years: Vec<i32>,

    /// Explicit creation-date windows
    #[serde(default)]
    pub windows: Vec<WindowEntry>,

    /// Popularity ranges
    #[serde(rename = "star-buckets", default)]
    pub star_buckets: Vec<StarBucketEntry>,
}

/// Inclusive creation-date window
#[derive(Debug, Clone, Deserialize)]
pub struct WindowEntry {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Inclusive popularity range; a missing `max` is open-ended
#[derive(Debug, Clone, Deserialize)]
pub struct StarBucketEntry {
    pub min: u64,
    #[serde(default)]
    pub max: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token_env: default_token_env(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            target_count: default_target_count(),
            max_concurrency: default_max_concurrency(),
            flush_threshold: default_flush_threshold(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_hour: default_requests_per_hour(),
            window_secs: default_window_secs(),
            quota_floor: default_quota_floor(),
            reset_margin_secs: default_reset_margin(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.github.com/graphql".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("star-crawler/{}", env!("CARGO_PKG_VERSION"))
}

fn default_target_count() -> usize {
    100_000
}

fn default_max_concurrency() -> usize {
    20
}

fn default_flush_threshold() -> usize {
    5000
}

fn default_requests_per_hour() -> u32 {
    4900
}

fn default_window_secs() -> u64 {
    3600
}

fn default_quota_floor() -> u32 {
    100
}

fn default_reset_margin() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff() -> u64 {
    4000
}

fn default_max_backoff() -> u64 {
    60_000
}

fn default_flush_attempts() -> u32 {
    3
}
