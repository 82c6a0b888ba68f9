//! Error types for the extraction pipeline
//!
//! Validation defaults and duplicate drops are not errors: they are logged and
//! the pipeline carries on. Everything here is either retried inside a job or
//! reported as that job's failure.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type HarvestResult<T> = Result<T, HarvestError>;

/// Error types for pipeline operations
#[derive(Debug, Error)]
pub enum HarvestError {
    /// A single navigate + extract attempt failed (transient)
    #[error("Attempt {attempt} for '{target}' failed: {message}")]
    AttemptFailed {
        target: String,
        attempt: u32,
        message: String,
    },

    /// A single attempt ran past its deadline (transient)
    #[error("Attempt {attempt} for '{target}' timed out after {timeout:?}")]
    AttemptTimeout {
        target: String,
        attempt: u32,
        timeout: Duration,
    },

    /// Every attempt of a job was consumed
    #[error("All {attempts} attempts for '{target}' were consumed; last error: {last_error}")]
    JobExhausted {
        target: String,
        attempts: u32,
        last_error: String,
    },

    /// The browser session could not be opened
    #[error("Failed to open a browser session for '{target}': {message}")]
    SessionUnavailable { target: String, message: String },

    /// A batch could not be written; the batch is kept pending
    #[error("Failed to write {rows} rows to {}: {message}", path.display())]
    SinkWriteFailed {
        path: PathBuf,
        rows: usize,
        message: String,
    },

    /// Records were admitted after the sink was closed
    #[error("Sink for {} is already closed", .0.display())]
    SinkClosed(PathBuf),

    /// A job panicked; the scheduler isolated it
    #[error("Job '{target}' panicked: {message}")]
    JobPanicked { target: String, message: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl HarvestError {
    /// Target locator the error refers to, if any
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            HarvestError::AttemptFailed { target, .. }
            | HarvestError::AttemptTimeout { target, .. }
            | HarvestError::JobExhausted { target, .. }
            | HarvestError::SessionUnavailable { target, .. }
            | HarvestError::JobPanicked { target, .. } => Some(target),
            _ => None,
        }
    }
}
