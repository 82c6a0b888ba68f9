//! Deduplicating, batched sink owned by a single job

use log::{debug, warn};
use std::collections::HashSet;

use super::destination::{BatchDestination, CsvDestination};
use crate::error::{HarvestError, HarvestResult};
use crate::records::SinkRecord;
use crate::utils::preview;

/// Counters describing what a sink did over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Records accepted into the buffer
    pub admitted: usize,
    /// Records dropped because their identity key was already seen
    pub dropped: usize,
    /// Successful non-empty flushes
    pub flushes: usize,
    /// Rows appended to the destination
    pub rows_written: usize,
    /// Flush attempts that failed and kept their batch
    pub failed_flushes: usize,
}

/// Buffers records, drops duplicate identity keys, and appends batches to a
/// destination once the buffer reaches `flush_threshold`.
///
/// Seen keys are never evicted: a key admitted once stays excluded after the
/// buffer is flushed, and after the sink is closed.
pub struct DedupSink<R: SinkRecord, D: BatchDestination<R> = CsvDestination> {
    destination: D,
    pending: Vec<R>,
    seen: HashSet<String>,
    flush_threshold: usize,
    closed: bool,
    stats: SinkStats,
}

impl<R: SinkRecord, D: BatchDestination<R>> DedupSink<R, D> {
    /// Create a sink; a threshold of 0 is treated as 1
    #[must_use]
    pub fn new(destination: D, flush_threshold: usize) -> Self {
        Self {
            destination,
            pending: Vec::new(),
            seen: HashSet::new(),
            flush_threshold: flush_threshold.max(1),
            closed: false,
            stats: SinkStats::default(),
        }
    }

    /// Mark keys as already seen, e.g. rows persisted by an earlier run
    ///
    /// Returns how many keys were new to the seen set.
    pub fn preload_keys<I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        keys.into_iter()
            .filter(|key| self.seen.insert(key.trim().to_string()))
            .count()
    }

    /// Admit a record unless its identity key was seen before
    ///
    /// Returns `Ok(false)` for a dropped duplicate. When admission fills the
    /// buffer the sink flushes immediately; a failed flush is returned as an
    /// error while the record stays admitted and pending.
    pub async fn admit(&mut self, record: R) -> HarvestResult<bool> {
        if self.closed {
            return Err(HarvestError::SinkClosed(
                self.destination.location().to_path_buf(),
            ));
        }

        let key = record.identity_key().trim().to_string();
        if self.seen.contains(&key) {
            warn!(
                "Duplicate record dropped for {}: '{}'",
                self.destination.location().display(),
                preview(&key, 80)
            );
            self.stats.dropped += 1;
            return Ok(false);
        }

        self.seen.insert(key);
        self.pending.push(record);
        self.stats.admitted += 1;

        if self.pending.len() >= self.flush_threshold {
            self.flush().await?;
        }

        Ok(true)
    }

    /// Append all pending records to the destination
    ///
    /// An empty buffer performs no write. On failure the batch is put back in
    /// front of anything admitted meanwhile, so a later flush retries it.
    pub async fn flush(&mut self) -> HarvestResult<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let mut batch = std::mem::take(&mut self.pending);
        match self.destination.append(&batch).await {
            Ok(rows) => {
                self.stats.flushes += 1;
                self.stats.rows_written += rows;
                debug!(
                    "Flushed {rows} rows to {}",
                    self.destination.location().display()
                );
                Ok(rows)
            }
            Err(e) => {
                self.stats.failed_flushes += 1;
                warn!(
                    "Flush of {} rows to {} failed, keeping batch pending: {e}",
                    batch.len(),
                    self.destination.location().display()
                );
                batch.append(&mut self.pending);
                self.pending = batch;
                Err(e)
            }
        }
    }

    /// Final flush; closing again afterwards is a no-op
    ///
    /// The sink only counts as closed once the final flush succeeded, so a
    /// failed close can be retried without losing or duplicating rows.
    pub async fn close(&mut self) -> HarvestResult<()> {
        if self.closed {
            return Ok(());
        }
        self.flush().await?;
        self.closed = true;
        Ok(())
    }

    #[must_use]
    pub fn pending(&self) -> &[R] {
        &self.pending
    }

    #[must_use]
    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn has_seen(&self, key: &str) -> bool {
        self.seen.contains(key.trim())
    }

    #[must_use]
    pub fn destination(&self) -> &D {
        &self.destination
    }
}

impl<R: SinkRecord> DedupSink<R, CsvDestination> {
    /// Seed the seen set from rows already in the destination file
    pub async fn preload_from_destination(&mut self) -> HarvestResult<usize> {
        let keys = self
            .destination
            .read_identity_keys(R::IDENTITY_COLUMN)
            .await?;
        Ok(self.preload_keys(keys))
    }
}

impl<R: SinkRecord, D: BatchDestination<R>> Drop for DedupSink<R, D> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                "Sink for {} dropped with {} unflushed records",
                self.destination.location().display(),
                self.pending.len()
            );
        }
    }
}
