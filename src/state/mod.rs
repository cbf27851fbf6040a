//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: lifecycle of a crawl run (running, draining, done)
//! - `RateBudgetState`: call timestamps and server quota behind the rate limiter
//! - `QuotaInfo`: quota telemetry reported with each API response

mod crawl_phase;
mod rate_budget;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use rate_budget::{QuotaInfo, RateBudgetState};
