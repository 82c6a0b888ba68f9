//! Batched, deduplicating persistence
//!
//! Each job owns one [`DedupSink`] writing to one CSV file. Records are
//! buffered, deduplicated by identity key for the sink's whole lifetime and
//! appended to the destination in batches.

mod dedup_sink;
mod destination;

pub use dedup_sink::{DedupSink, SinkStats};
pub use destination::{BatchDestination, CsvDestination, read_csv_column};
