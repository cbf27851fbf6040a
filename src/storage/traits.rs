//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::FetchedRecord;
use crate::storage::{PopularitySample, RepositoryRecord, RunRecord, RunStatus, WriteReport};
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Repository {0} was written but could not be resolved")]
    UnresolvedRepository(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The crawl driver only ever calls a store from its own control flow, so
/// implementations need not be shareable across tasks.
pub trait RepositoryStore {
    // ===== Run Management =====

    /// Creates a new crawl run in the running state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Records the final status and totals of a run
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        records_crawled: usize,
        flush_batches: usize,
    ) -> StorageResult<()>;

    // ===== Bulk Writer =====

    /// Writes one batch atomically
    ///
    /// Every record is upserted by external id, then one popularity sample
    /// per repository is recorded for the day of `crawled_at`. Same-day
    /// samples that already exist are left untouched. Any failure rolls the
    /// whole batch back, so the same records can be written again.
    fn write_batch(
        &mut self,
        records: &[FetchedRecord],
        crawled_at: DateTime<Utc>,
    ) -> StorageResult<WriteReport>;

    // ===== Queries =====

    /// Gets a repository by its external id
    fn get_repository(&self, external_id: &str) -> StorageResult<Option<RepositoryRecord>>;

    /// Gets the popularity history of a repository, oldest first
    fn get_history(&self, external_id: &str) -> StorageResult<Vec<PopularitySample>>;

    /// Gets total repository count
    fn count_repositories(&self) -> StorageResult<u64>;

    /// Gets total popularity sample count
    fn count_samples(&self) -> StorageResult<u64>;

    /// Counts samples recorded on one day
    fn count_samples_on(&self, day: NaiveDate) -> StorageResult<u64>;

    /// Gets the most popular repositories, highest count first
    fn top_repositories(&self, limit: usize) -> StorageResult<Vec<RepositoryRecord>>;
}
