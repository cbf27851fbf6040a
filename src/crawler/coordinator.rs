//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Building the query set and seeding the scheduler
//! - Running fetch batches until the target is met or the queue is empty
//! - Flushing full buffer batches to storage, with retry
//! - Draining the final partial batch
//! - Recording the run outcome and producing the summary

use crate::config::Config;
use crate::crawler::buffer::IngestionBuffer;
use crate::crawler::fetcher::{GraphQlFetcher, PageSource};
use crate::crawler::scheduler::{CrawlProgress, Scheduler};
use crate::output::CrawlSummary;
use crate::query::{build_queries, FacetDimensions};
use crate::state::CrawlPhase;
use crate::storage::{RepositoryStore, RunStatus, SqliteStorage};
use crate::CrawlError;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pause between attempts of a failed bulk write
const FLUSH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Main crawler coordinator structure
pub struct Coordinator<S: PageSource = GraphQlFetcher, W: RepositoryStore = SqliteStorage> {
    source: S,
    storage: W,
    scheduler: Scheduler,
    buffer: IngestionBuffer,
    progress: CrawlProgress,
    phase: CrawlPhase,
    run_id: i64,
    queries: usize,
    flush_attempts: u32,
    batches: usize,
    records_written: usize,
    shutdown: Arc<AtomicBool>,
}

impl Coordinator {
    /// Creates a coordinator that crawls the live API into SQLite
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `token` - Bearer credential for the search API
    /// * `config_hash` - Hash of the configuration file, recorded with the run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - Failed to initialize
    pub fn new(config: &Config, token: String, config_hash: &str) -> Result<Self, CrawlError> {
        let source = GraphQlFetcher::new(&config.api, &config.rate_limit, &config.retry, token)?;
        let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
        Self::with_parts(config, source, storage, config_hash)
    }
}

impl<S: PageSource, W: RepositoryStore> Coordinator<S, W> {
    /// Creates a coordinator from an explicit page source and store
    ///
    /// Builds the query set from the search dimensions and opens a new run.
    pub fn with_parts(
        config: &Config,
        source: S,
        mut storage: W,
        config_hash: &str,
    ) -> Result<Self, CrawlError> {
        let dimensions = FacetDimensions::from_config(&config.search)?;
        let queries = build_queries(&dimensions);
        if queries.is_empty() {
            tracing::warn!("Search dimensions produce no queries, nothing will be crawled");
        }

        let run_id = storage.create_run(config_hash)?;
        let query_count = queries.len();

        Ok(Self {
            source,
            storage,
            scheduler: Scheduler::new(queries, config.crawler.max_concurrency),
            buffer: IngestionBuffer::new(config.crawler.flush_threshold),
            progress: CrawlProgress::new(config.crawler.target_count),
            phase: CrawlPhase::Running,
            run_id,
            queries: query_count,
            flush_attempts: config.storage.flush_attempts.max(1),
            batches: 0,
            records_written: 0,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Flag that stops dispatching after the in-flight batch when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Gives access to the store, e.g. for statistics after a crawl
    pub fn storage(&self) -> &W {
        &self.storage
    }

    /// Runs the crawl to completion and records its outcome
    ///
    /// A storage failure that survives every flush attempt marks the run
    /// failed and is returned as an error. Fetch failures never are.
    pub async fn run(&mut self) -> Result<CrawlSummary, CrawlError> {
        if !self.phase.accepts_fetches() {
            return Err(CrawlError::InvalidTransition {
                from: self.phase,
                to: CrawlPhase::Running,
            });
        }

        tracing::info!(
            "Starting crawl run {} ({} queries, target {} records)",
            self.run_id,
            self.queries,
            self.progress.target
        );
        let started = Instant::now();

        let outcome = self.drive().await;

        let status = match &outcome {
            Ok(true) => RunStatus::Interrupted,
            Ok(false) => RunStatus::Completed,
            Err(_) => RunStatus::Failed,
        };
        let recorded =
            self.storage
                .finish_run(self.run_id, status, self.records_written, self.batches);

        let interrupted = match (outcome, recorded) {
            (Ok(interrupted), Ok(())) => interrupted,
            (Ok(_), Err(e)) => return Err(e.into()),
            (Err(e), recorded) => {
                if let Err(record_error) = recorded {
                    tracing::warn!("Could not mark run {} as failed: {}", self.run_id, record_error);
                }
                return Err(e);
            }
        };

        let summary = CrawlSummary {
            run_id: self.run_id,
            queries: self.queries,
            records: self.records_written,
            pages_fetched: self.progress.pages_fetched,
            pages_abandoned: self.progress.pages_abandoned,
            batches: self.batches,
            elapsed: started.elapsed(),
            interrupted,
        };

        tracing::info!(
            "Crawl {}: {} records in {} batches, {:.1?} ({:.1} records/s)",
            status.to_db_string(),
            summary.records,
            summary.batches,
            summary.elapsed,
            summary.throughput()
        );

        Ok(summary)
    }

    /// RUNNING until the queue empties, the target is met or a shutdown is
    /// requested, then DRAINING for the final flush, then DONE
    ///
    /// Returns true if the crawl was cut short by a shutdown request.
    async fn drive(&mut self) -> Result<bool, CrawlError> {
        let mut interrupted = false;

        loop {
            let Some(report) = self
                .scheduler
                .run_batch(&self.source, &mut self.buffer, &mut self.progress)
                .await
            else {
                break;
            };

            tracing::debug!(
                "Batch of {} pages: {} records, {} abandoned, {} queued",
                report.dispatched,
                report.records,
                report.abandoned,
                self.scheduler.pending()
            );

            while self.buffer.is_ready() {
                self.flush(false).await?;
            }

            if self.shutdown.load(Ordering::SeqCst) {
                tracing::warn!("Shutdown requested, stopping after the current batch");
                interrupted = true;
                break;
            }
        }

        if self.progress.target_met() {
            tracing::info!("Target of {} records reached", self.progress.target);
        } else if !interrupted {
            tracing::info!("All queries exhausted");
        }

        self.transition(CrawlPhase::Draining)?;
        if !self.buffer.is_empty() {
            self.flush(true).await?;
        }
        self.transition(CrawlPhase::Done)?;
        debug_assert!(self.phase.is_terminal() && self.buffer.is_empty());

        Ok(interrupted)
    }

    /// Writes the next batch, retrying the same contents on failure
    ///
    /// With `drain` set the whole buffer is written, otherwise exactly one
    /// threshold-sized batch. Records leave the buffer only after commit.
    async fn flush(&mut self, drain: bool) -> Result<(), CrawlError> {
        let mut attempt = 1;

        let report = loop {
            let batch = if drain {
                self.buffer.peek_all()
            } else {
                self.buffer.peek_batch()
            };

            match self.storage.write_batch(batch, Utc::now()) {
                Ok(report) => break report,
                Err(e) if attempt < self.flush_attempts => {
                    tracing::warn!(
                        "Flush attempt {}/{} failed: {}",
                        attempt,
                        self.flush_attempts,
                        e
                    );
                    tokio::time::sleep(FLUSH_RETRY_DELAY).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        "Flush failed after {} attempts, aborting crawl: {}",
                        self.flush_attempts,
                        e
                    );
                    return Err(e.into());
                }
            }
        };

        self.buffer.consume(report.records);
        self.batches += 1;
        self.records_written += report.records;

        tracing::info!(
            "Flushed batch {}: {} records, {} repositories, {} new samples ({}/{} collected)",
            self.batches,
            report.records,
            report.repositories,
            report.samples_inserted,
            self.progress.collected,
            self.progress.target
        );

        Ok(())
    }

    fn transition(&mut self, next: CrawlPhase) -> Result<(), CrawlError> {
        if !self.phase.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!("Crawl phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }
}

/// Runs the main crawl operation against the live API
///
/// This function orchestrates the entire crawl process:
///
/// 1. Open storage and start a run
/// 2. Build the query set from the search dimensions
/// 3. Fetch pages in bounded batches, following cursors
/// 4. Flush the buffer to storage whenever a batch is full
/// 5. Flush the remainder and mark the run as finished
///
/// # Example
///
/// ```no_run
/// use star_crawler::config::load_config_with_hash;
/// use star_crawler::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let summary = run_crawl(&config, "ghp_example".to_string(), &hash).await?;
/// println!("{}", summary);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    token: String,
    config_hash: &str,
) -> Result<CrawlSummary, CrawlError> {
    let mut coordinator = Coordinator::new(config, token, config_hash)?;
    coordinator.run().await
}
