//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RepositoryStore trait.

use crate::crawler::FetchedRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RepositoryStore, StorageError, StorageResult};
use crate::storage::{PopularitySample, RepositoryRecord, RunRecord, RunStatus, WriteReport};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Ids per `IN (...)` lookup, well under SQLite's bound-parameter limit
const LOOKUP_CHUNK: usize = 500;

const UPSERT_REPOSITORY_SQL: &str = "
    INSERT INTO repositories
        (repo_id, owner, name, full_name, stars, created_at, updated_at, last_crawled_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(repo_id) DO UPDATE SET
        stars = excluded.stars,
        updated_at = excluded.updated_at,
        last_crawled_at = excluded.last_crawled_at";

const INSERT_SAMPLE_SQL: &str = "
    INSERT INTO repository_star_history (repository_id, stars, recorded_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(repository_id, recorded_at) DO NOTHING";

const REPOSITORY_COLUMNS: &str =
    "id, repo_id, owner, name, full_name, stars, created_at, updated_at, last_crawled_at";

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, records_crawled, flush_batches";

/// Formats a date the way `recorded_at` stores it
fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn repository_from_row(row: &Row<'_>) -> rusqlite::Result<RepositoryRecord> {
    Ok(RepositoryRecord {
        id: row.get(0)?,
        repo_id: row.get(1)?,
        owner: row.get(2)?,
        name: row.get(3)?,
        full_name: row.get(4)?,
        stars: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        last_crawled_at: row.get(8)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        records_crawled: row.get(5)?,
        flush_batches: row.get(6)?,
    })
}

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Maps external ids to surrogate ids inside an open transaction
    fn resolve_ids(
        tx: &rusqlite::Transaction<'_>,
        external_ids: &[&str],
    ) -> StorageResult<HashMap<String, i64>> {
        let mut resolved = HashMap::with_capacity(external_ids.len());

        for chunk in external_ids.chunks(LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT repo_id, id FROM repositories WHERE repo_id IN ({})",
                placeholders
            );
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (repo_id, id) = row?;
                resolved.insert(repo_id, id);
            }
        }

        Ok(resolved)
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl RepositoryStore for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawl_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM crawl_runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!(
            "SELECT {} FROM crawl_runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        );
        Ok(self.conn.query_row(&sql, [], run_from_row).optional()?)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        records_crawled: usize,
        flush_batches: usize,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE crawl_runs
             SET status = ?1, finished_at = ?2, records_crawled = ?3, flush_batches = ?4
             WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                records_crawled as i64,
                flush_batches as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Bulk Writer =====

    fn write_batch(
        &mut self,
        records: &[FetchedRecord],
        crawled_at: DateTime<Utc>,
    ) -> StorageResult<WriteReport> {
        if records.is_empty() {
            return Ok(WriteReport::default());
        }

        let crawled = crawled_at.to_rfc3339();
        let day = day_key(crawled_at.date_naive());

        // Dropping the transaction without commit rolls everything back
        let tx = self.conn.transaction()?;

        {
            let mut upsert = tx.prepare_cached(UPSERT_REPOSITORY_SQL)?;
            for record in records {
                upsert.execute(params![
                    record.external_id,
                    record.owner,
                    record.name,
                    record.full_name(),
                    record.stars,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                    crawled,
                ])?;
            }
        }

        let mut seen = HashSet::new();
        let distinct: Vec<&str> = records
            .iter()
            .map(|r| r.external_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect();
        let ids = Self::resolve_ids(&tx, &distinct)?;

        let mut samples_inserted = 0;
        {
            let mut insert = tx.prepare_cached(INSERT_SAMPLE_SQL)?;
            for record in records {
                let id = ids
                    .get(&record.external_id)
                    .ok_or_else(|| StorageError::UnresolvedRepository(record.external_id.clone()))?;
                samples_inserted += insert.execute(params![id, record.stars, day])?;
            }
        }

        tx.commit()?;

        Ok(WriteReport {
            records: records.len(),
            repositories: distinct.len(),
            samples_inserted,
        })
    }

    // ===== Queries =====

    fn get_repository(&self, external_id: &str) -> StorageResult<Option<RepositoryRecord>> {
        let sql = format!(
            "SELECT {} FROM repositories WHERE repo_id = ?1",
            REPOSITORY_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![external_id], repository_from_row)
            .optional()?)
    }

    fn get_history(&self, external_id: &str) -> StorageResult<Vec<PopularitySample>> {
        let mut stmt = self.conn.prepare(
            "SELECT h.stars, h.recorded_at
             FROM repository_star_history h
             JOIN repositories r ON r.id = h.repository_id
             WHERE r.repo_id = ?1
             ORDER BY h.recorded_at",
        )?;
        let samples = stmt
            .query_map(params![external_id], |row| {
                Ok(PopularitySample {
                    stars: row.get(0)?,
                    recorded_at: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(samples)
    }

    fn count_repositories(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM repositories")
    }

    fn count_samples(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM repository_star_history")
    }

    fn count_samples_on(&self, day: NaiveDate) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM repository_star_history WHERE recorded_at = ?1",
            params![day_key(day)],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn top_repositories(&self, limit: usize) -> StorageResult<Vec<RepositoryRecord>> {
        let sql = format!(
            "SELECT {} FROM repositories ORDER BY stars DESC, full_name LIMIT ?1",
            REPOSITORY_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let repositories = stmt
            .query_map(params![limit as i64], repository_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(repositories)
    }
}
