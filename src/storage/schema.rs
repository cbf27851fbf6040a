//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Star-Crawler database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS crawl_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    records_crawled INTEGER NOT NULL DEFAULT 0,
    flush_batches INTEGER NOT NULL DEFAULT 0
);

-- One row per repository, keyed by the API's node id
CREATE TABLE IF NOT EXISTS repositories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repo_id TEXT NOT NULL UNIQUE,
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    full_name TEXT NOT NULL,
    stars INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_repositories_stars ON repositories(stars);

-- Daily popularity samples; recorded_at is a YYYY-MM-DD date
CREATE TABLE IF NOT EXISTS repository_star_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repository_id INTEGER NOT NULL REFERENCES repositories(id),
    stars INTEGER NOT NULL,
    recorded_at TEXT NOT NULL,
    UNIQUE(repository_id, recorded_at)
);

CREATE INDEX IF NOT EXISTS idx_star_history_recorded ON repository_star_history(recorded_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["crawl_runs", "repositories", "repository_star_history"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_history_rejects_same_day_duplicate() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO repositories (repo_id, owner, name, full_name, stars, created_at, updated_at, last_crawled_at)
             VALUES ('R_1', 'o', 'n', 'o/n', 1, 't', 't', 't')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO repository_star_history (repository_id, stars, recorded_at) VALUES (1, 1, '2024-05-01')",
            [],
        )
        .unwrap();

        let duplicate = conn.execute(
            "INSERT INTO repository_star_history (repository_id, stars, recorded_at) VALUES (1, 2, '2024-05-01')",
            [],
        );
        assert!(duplicate.is_err());
    }
}
