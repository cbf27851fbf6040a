//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - The bulk writer (repository upserts and daily popularity samples)
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{RepositoryStore, StorageError, StorageResult};

/// A persisted repository
#[derive(Debug, Clone)]
pub struct RepositoryRecord {
    pub id: i64,
    pub repo_id: String,
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub stars: i64,
    pub created_at: String,
    pub updated_at: String,
    pub last_crawled_at: String,
}

/// One daily popularity sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopularitySample {
    pub stars: i64,
    pub recorded_at: String,
}

/// What one bulk write changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Records in the batch, duplicates included
    pub records: usize,

    /// Distinct repositories touched
    pub repositories: usize,

    /// Samples actually inserted (same-day duplicates excluded)
    pub samples_inserted: usize,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub records_crawled: i64,
    pub flush_batches: i64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
