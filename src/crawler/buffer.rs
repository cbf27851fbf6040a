//! Ingestion buffer between the fetch loop and the bulk writer
//!
//! Records accumulate in arrival order. A batch is only removed from the
//! buffer after the writer has committed it, so a failed flush can be
//! retried with exactly the same contents.

use crate::crawler::response::FetchedRecord;

#[derive(Debug)]
pub struct IngestionBuffer {
    records: Vec<FetchedRecord>,
    threshold: usize,
}

impl IngestionBuffer {
    pub fn new(threshold: usize) -> Self {
        Self {
            records: Vec::new(),
            threshold: threshold.max(1),
        }
    }

    pub fn push_all(&mut self, records: impl IntoIterator<Item = FetchedRecord>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns true once a full batch is buffered
    pub fn is_ready(&self) -> bool {
        self.records.len() >= self.threshold
    }

    /// The first `threshold` records (or fewer, when draining)
    pub fn peek_batch(&self) -> &[FetchedRecord] {
        let end = self.records.len().min(self.threshold);
        &self.records[..end]
    }

    /// Everything buffered, for the final flush
    pub fn peek_all(&self) -> &[FetchedRecord] {
        &self.records
    }

    /// Drops the first `count` records after they were written
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.records.len());
        self.records.drain(..count);
    }
}
