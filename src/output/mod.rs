//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - The end-of-crawl summary (records, elapsed time, throughput)
//! - Database statistics for `--stats`

pub mod stats;

pub use stats::{load_statistics, print_statistics, DbStatistics};

use std::fmt;
use std::time::Duration;

/// Summary of one finished crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub run_id: i64,

    /// Number of generated search queries
    pub queries: usize,

    /// Records written to storage
    pub records: usize,

    pub pages_fetched: usize,

    /// Pages given up on after a hard or exhausted error
    pub pages_abandoned: usize,

    /// Number of bulk writes performed
    pub batches: usize,

    pub elapsed: Duration,

    /// True if the crawl stopped early on request
    pub interrupted: bool,
}

impl CrawlSummary {
    /// Records written per second of wall-clock time
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.records as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Crawl Summary (run #{}) ===", self.run_id)?;
        if self.interrupted {
            writeln!(f, "  Status: interrupted")?;
        }
        writeln!(f, "  Queries: {}", self.queries)?;
        writeln!(f, "  Records crawled: {}", self.records)?;
        writeln!(f, "  Pages fetched: {}", self.pages_fetched)?;
        writeln!(f, "  Pages abandoned: {}", self.pages_abandoned)?;
        writeln!(f, "  Flush batches: {}", self.batches)?;
        writeln!(f, "  Elapsed: {:.1}s", self.elapsed.as_secs_f64())?;
        write!(f, "  Throughput: {:.1} records/s", self.throughput())
    }
}
