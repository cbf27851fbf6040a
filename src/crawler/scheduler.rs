//! Pagination scheduler
//!
//! This module handles:
//! - The FIFO work queue of (query, cursor) units
//! - Bounded fan-out of page fetches and fan-in of their outcomes
//! - Re-enqueueing continuations while the target is unmet
//! - Truncating the last pages to the target record count
//!
//! Every batch is awaited in full before the next one is drawn, so no
//! fetch outlives its batch and at most `max_concurrency` are in flight.

use crate::crawler::buffer::IngestionBuffer;
use crate::crawler::fetcher::{PageOutcome, PageSource};
use crate::query::SearchQuery;
use futures::future::join_all;
use std::collections::VecDeque;

/// One page request: a query plus the cursor of the page to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationUnit {
    pub query: SearchQuery,

    /// None for the first page of a query
    pub cursor: Option<String>,
}

impl PaginationUnit {
    pub fn first_page(query: SearchQuery) -> Self {
        Self {
            query,
            cursor: None,
        }
    }

    /// The unit for the page after this one, in the same query lineage
    pub fn next_page(&self, cursor: &str) -> Self {
        Self {
            query: self.query.clone(),
            cursor: Some(cursor.to_string()),
        }
    }
}

/// Running totals toward the target record count
#[derive(Debug, Clone, Default)]
pub struct CrawlProgress {
    pub target: usize,
    pub collected: usize,
    pub pages_fetched: usize,
    pub pages_abandoned: usize,
}

impl CrawlProgress {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.target.saturating_sub(self.collected)
    }

    pub fn target_met(&self) -> bool {
        self.collected >= self.target
    }
}

/// What one dispatched batch produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub dispatched: usize,
    pub records: usize,
    pub abandoned: usize,
    pub continuations: usize,
}

/// Scheduler owns the work queue and drives fetch batches
pub struct Scheduler {
    queue: VecDeque<PaginationUnit>,
    max_concurrency: usize,
}

impl Scheduler {
    /// Creates a scheduler seeded with the first page of every query
    pub fn new(queries: Vec<SearchQuery>, max_concurrency: usize) -> Self {
        Self {
            queue: queries.into_iter().map(PaginationUnit::first_page).collect(),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Returns the number of units waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Appends a unit to the back of the queue
    pub fn enqueue(&mut self, unit: PaginationUnit) {
        self.queue.push_back(unit);
    }

    /// Draws the next batch from the front of the queue
    ///
    /// The batch holds at most `max_concurrency` units, no more than the
    /// records still wanted, and no more than are queued.
    pub fn next_batch(&mut self, remaining_target: usize) -> Vec<PaginationUnit> {
        let size = self
            .max_concurrency
            .min(remaining_target)
            .min(self.queue.len());
        self.queue.drain(..size).collect()
    }

    /// Fetches every unit of the batch concurrently and waits for all of them
    ///
    /// Outcomes are returned in batch order.
    pub async fn dispatch<S>(source: &S, batch: Vec<PaginationUnit>) -> Vec<(PaginationUnit, PageOutcome)>
    where
        S: PageSource + ?Sized,
    {
        join_all(batch.into_iter().map(|unit| async move {
            let outcome = source.fetch_page(&unit.query, unit.cursor.as_deref()).await;
            (unit, outcome)
        }))
        .await
    }

    /// Moves fetched records into the buffer and queues continuations
    ///
    /// Records beyond the target are dropped. A continuation is queued only
    /// for a non-empty page that reports more pages, and only while the
    /// target is unmet.
    pub fn absorb(
        &mut self,
        results: Vec<(PaginationUnit, PageOutcome)>,
        buffer: &mut IngestionBuffer,
        progress: &mut CrawlProgress,
    ) -> BatchReport {
        let mut report = BatchReport {
            dispatched: results.len(),
            ..BatchReport::default()
        };

        for (unit, outcome) in results {
            if outcome.is_abandoned() {
                progress.pages_abandoned += 1;
                report.abandoned += 1;
                continue;
            }
            progress.pages_fetched += 1;

            let next = outcome.continuation().map(|cursor| unit.next_page(cursor));
            let mut records = outcome.into_records();
            let had_records = !records.is_empty();
            records.truncate(progress.remaining());

            progress.collected += records.len();
            report.records += records.len();
            buffer.push_all(records);

            match next {
                Some(next) if had_records && !progress.target_met() => {
                    self.enqueue(next);
                    report.continuations += 1;
                }
                Some(_) if !had_records => {
                    tracing::debug!("Empty page for '{}' claims more pages, stopping", unit.query);
                }
                _ => {}
            }
        }

        report
    }

    /// Draws, fetches and absorbs one batch
    ///
    /// Returns None when there is nothing left to dispatch (queue empty or
    /// target met).
    pub async fn run_batch<S>(
        &mut self,
        source: &S,
        buffer: &mut IngestionBuffer,
        progress: &mut CrawlProgress,
    ) -> Option<BatchReport>
    where
        S: PageSource + ?Sized,
    {
        let batch = self.next_batch(progress.remaining());
        if batch.is_empty() {
            return None;
        }
        tracing::trace!("Dispatching batch of {} pages", batch.len());
        let results = Self::dispatch(source, batch).await;
        Some(self.absorb(results, buffer, progress))
    }
}
