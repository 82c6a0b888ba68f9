//! Bounded-concurrency harvesting of search results and answers
//!
//! Discovery jobs search one query each and persist the matching results;
//! answer jobs then visit every discovered URL and persist its answers. Jobs
//! run under a concurrency ceiling, retry failed attempts, and write through
//! per-job deduplicating CSV sinks.

pub mod browser;
pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod proxy;
pub mod records;
pub mod scheduler;
pub mod sink;
pub mod utils;

pub use browser::{ChromiumProvider, ChromiumSession};
pub use config::{HarvestConfig, ProxySettings};
pub use error::{HarvestError, HarvestResult};
pub use job::{
    Extractor, JobEvent, JobOutcome, JobState, PageSession, RetryPolicy, RetryableJob,
    SessionProvider, SuccessCriterion, WaitPolicy,
};
pub use pipeline::{
    AnswerExtractor, DomainFilter, FileNaming, Harvester, PhaseReport, PipelineReport,
    SearchResultsExtractor, SlugNaming,
};
pub use proxy::{DirectRewriter, ProxyRewriter, UrlRewriter};
pub use records::{AnswerRecord, ExtractedRecord, RecordKind, SearchRecord, validate};
pub use scheduler::{run_all, run_all_spawned};
pub use sink::{BatchDestination, CsvDestination, DedupSink, SinkStats};
