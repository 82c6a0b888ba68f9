//! Append-only CSV destinations

use log::debug;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{HarvestError, HarvestResult};
use crate::records::SinkRecord;

/// Serializes blocking appends so two sinks sharing a new file cannot both
/// see it empty and write the header twice
static APPEND_LOCK: Mutex<()> = Mutex::new(());

/// Where a sink's batches end up
#[allow(async_fn_in_trait)]
pub trait BatchDestination<R> {
    /// File (or other resource) the batches are appended to
    fn location(&self) -> &Path;

    /// Append one non-empty batch, returning the number of rows written
    ///
    /// On error nothing may be considered written; the caller keeps the batch.
    async fn append(&mut self, batch: &[R]) -> HarvestResult<usize>;
}

/// Appends records as CSV rows, writing the header row only when the file is
/// created (or still empty) at the time of the first flush.
#[derive(Debug, Clone)]
pub struct CsvDestination {
    path: PathBuf,
}

impl CsvDestination {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity keys already present in the file (empty when it does not exist)
    pub async fn read_identity_keys(&self, column: &str) -> HarvestResult<Vec<String>> {
        read_csv_column(&self.path, column).await
    }

    fn write_error(&self, rows: usize, message: impl Into<String>) -> HarvestError {
        HarvestError::SinkWriteFailed {
            path: self.path.clone(),
            rows,
            message: message.into(),
        }
    }
}

impl<R: SinkRecord> BatchDestination<R> for CsvDestination {
    fn location(&self) -> &Path {
        &self.path
    }

    async fn append(&mut self, batch: &[R]) -> HarvestResult<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        // Serialize on the caller's task so the batch never leaves the sink
        let header = encode_header(R::HEADERS).map_err(|e| self.write_error(batch.len(), e.to_string()))?;
        let rows = encode_rows(batch).map_err(|e| self.write_error(batch.len(), e.to_string()))?;

        let path = self.path.clone();
        let write_task = tokio::task::spawn_blocking(move || append_rows(&path, &header, &rows));

        match write_task.await {
            Ok(Ok(wrote_header)) => {
                debug!(
                    "Appended {} rows to {} (header written: {})",
                    batch.len(),
                    self.path.display(),
                    wrote_header
                );
                Ok(batch.len())
            }
            Ok(Err(e)) => Err(self.write_error(batch.len(), e.to_string())),
            Err(e) => Err(self.write_error(batch.len(), format!("write task panicked: {e}"))),
        }
    }
}

fn encode_header(headers: &[&str]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(headers)?;
    writer.into_inner().map_err(into_inner_error)
}

fn encode_rows<R: SinkRecord>(batch: &[R]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for record in batch {
        writer.serialize(record)?;
    }
    writer.into_inner().map_err(into_inner_error)
}

fn into_inner_error(e: csv::IntoInnerError<csv::Writer<Vec<u8>>>) -> csv::Error {
    csv::Error::from(std::io::Error::new(e.error().kind(), e.error().to_string()))
}

/// Blocking append; returns whether the header row was written
fn append_rows(path: &Path, header: &[u8], rows: &[u8]) -> std::io::Result<bool> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let _guard = APPEND_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;

    // Single write so a failure cannot leave a header without its rows
    let mut buffer = Vec::with_capacity(header.len() + rows.len());
    if is_new {
        buffer.extend_from_slice(header);
    }
    buffer.extend_from_slice(rows);

    file.write_all(&buffer)?;
    file.sync_data()?;
    Ok(is_new)
}

/// Read one named column from a CSV file with a header row
///
/// A missing file yields an empty list: jobs that never flushed leave no file.
pub async fn read_csv_column(path: &Path, column: &str) -> HarvestResult<Vec<String>> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(Vec::new());
    }

    let path = path.to_path_buf();
    let column = column.to_string();
    let task = tokio::task::spawn_blocking(move || -> HarvestResult<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(&path)?;
        let Some(index) = reader.headers()?.iter().position(|h| h == column) else {
            return Err(HarvestError::Config(format!(
                "column '{column}' not found in {}",
                path.display()
            )));
        };

        let mut values = Vec::new();
        for row in reader.records() {
            if let Some(value) = row?.get(index) {
                values.push(value.to_string());
            }
        }
        Ok(values)
    });

    task.await
        .map_err(|e| HarvestError::Io(std::io::Error::other(e)))?
}
