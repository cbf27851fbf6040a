//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! repository and history statistics from the storage layer.

use crate::storage::{RepositoryRecord, RepositoryStore, RunRecord};
use crate::CrawlError;
use chrono::NaiveDate;

/// Number of repositories listed in the popularity ranking
pub const TOP_REPOSITORIES: usize = 10;

/// Database statistics summary
#[derive(Debug, Clone)]
pub struct DbStatistics {
    /// Total number of repositories stored
    pub repositories: u64,

    /// Total number of popularity samples
    pub samples: u64,

    /// Samples recorded on `today`
    pub samples_today: u64,

    /// Day the `samples_today` count refers to
    pub today: NaiveDate,

    /// Most popular repositories
    pub top_repositories: Vec<RepositoryRecord>,

    /// Most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `today` - The day to count fresh samples for
///
/// # Returns
///
/// * `Ok(DbStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Failed to query statistics
pub fn load_statistics(
    storage: &dyn RepositoryStore,
    today: NaiveDate,
) -> Result<DbStatistics, CrawlError> {
    Ok(DbStatistics {
        repositories: storage.count_repositories()?,
        samples: storage.count_samples()?,
        samples_today: storage.count_samples_on(today)?,
        today,
        top_repositories: storage.top_repositories(TOP_REPOSITORIES)?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &DbStatistics) {
    println!("=== Repository Statistics ===\n");

    println!("Overview:");
    println!("  Repositories: {}", stats.repositories);
    println!("  History samples: {}", stats.samples);
    println!("  Samples recorded {}: {}", stats.today, stats.samples_today);
    println!();

    if !stats.top_repositories.is_empty() {
        println!("Most Starred:");
        for (rank, repo) in stats.top_repositories.iter().enumerate() {
            println!("  {:>2}. {} ({} stars)", rank + 1, repo.full_name, repo.stars);
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  Run #{}: {}", run.id, run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Records crawled: {}", run.records_crawled);
            println!("  Flush batches: {}", run.flush_batches);
        }
        None => println!("No crawl runs recorded"),
    }
}
