//! Star-Crawler: a quota-aware repository search harvester
//!
//! This crate crawls a paginated, rate-limited GraphQL search API, working
//! around its per-query result cap by partitioning the search space into
//! disjoint facets, and persists every repository it sees together with a
//! daily popularity history.

pub mod config;
pub mod crawler;
pub mod output;
pub mod query;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Missing API credential: environment variable {0} is not set")]
    MissingToken(String),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Overlapping facets: {0}")]
    OverlappingFacets(String),
}

/// Errors raised by a single search API call
///
/// Transient variants are retried by the retry policy; everything else
/// fails the call immediately.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Server unavailable (HTTP {status})")]
    ServerUnavailable { status: u16 },

    #[error("Authorization failed (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("Quota denied by server (HTTP {status})")]
    QuotaDenied { status: u16 },

    #[error("Request rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Query rejected: {0}")]
    GraphQl(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Returns true if the failure is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Connection(_) | Self::ServerUnavailable { .. }
        )
    }

    /// Classifies a transport-level reqwest error
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() || err.is_request() || err.is_body() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }

    /// Classifies a non-success HTTP status
    pub fn from_status(status: u16, body: String, quota_exhausted: bool) -> Self {
        match status {
            500 | 502 | 503 | 504 => Self::ServerUnavailable { status },
            429 => Self::QuotaDenied { status },
            403 if quota_exhausted => Self::QuotaDenied { status },
            401 | 403 => Self::Unauthorized { status },
            _ => Self::Rejected { status, body },
        }
    }
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for single API calls
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use config::Config;
pub use query::{build_queries, SearchFacet, SearchQuery};
pub use state::{CrawlPhase, RateBudgetState};
