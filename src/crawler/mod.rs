//! Crawler module for harvesting repository search results
//!
//! This module contains the core crawling logic, including:
//! - Rate limiting and retry of API calls
//! - GraphQL page fetching and response decoding
//! - Bounded, cursor-following pagination
//! - Buffering and bulk writing of fetched records
//! - Overall crawl coordination

mod buffer;
mod coordinator;
mod fetcher;
mod rate_limiter;
mod response;
mod retry;
mod scheduler;

pub use buffer::IngestionBuffer;
pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, FetchedPage, GraphQlFetcher, PageOutcome, PageSource};
pub use rate_limiter::RateLimiter;
pub use response::{FetchedRecord, SearchRequest, SEARCH_DOCUMENT};
pub use retry::RetryPolicy;
pub use scheduler::{BatchReport, CrawlProgress, PaginationUnit, Scheduler};
