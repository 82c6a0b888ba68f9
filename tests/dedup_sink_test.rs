//! Batching, deduplication and failure handling of the per-job sink

use answer_harvest::records::{AnswerRecord, SearchRecord};
use answer_harvest::sink::{BatchDestination, CsvDestination, DedupSink};
use answer_harvest::{HarvestError, HarvestResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

mod common;
use common::{create_test_dir, read_file, read_rows};

fn search(rank: u32, title: &str) -> SearchRecord {
    SearchRecord {
        rank,
        title: title.to_string(),
        url: format!("https://www.quora.com/{}", title.replace(' ', "-")),
    }
}

/// Records every batch it receives; can be told to fail the next appends
#[derive(Clone, Default)]
struct RecordingDestination {
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    failures_left: Arc<Mutex<usize>>,
    path: PathBuf,
}

impl RecordingDestination {
    fn failing(times: usize) -> Self {
        let destination = Self::default();
        *destination.failures_left.lock().unwrap() = times;
        destination
    }

    fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    fn titles(&self) -> Vec<String> {
        self.batches.lock().unwrap().concat()
    }
}

impl BatchDestination<SearchRecord> for RecordingDestination {
    fn location(&self) -> &Path {
        &self.path
    }

    async fn append(&mut self, batch: &[SearchRecord]) -> HarvestResult<usize> {
        {
            let mut failures = self.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(HarvestError::SinkWriteFailed {
                    path: self.path.clone(),
                    rows: batch.len(),
                    message: "disk full".to_string(),
                });
            }
        }
        self.batches
            .lock()
            .unwrap()
            .push(batch.iter().map(|r| r.title.clone()).collect());
        Ok(batch.len())
    }
}

#[tokio::test]
async fn test_duplicates_are_dropped_within_a_run() {
    let dir = create_test_dir();
    let path = dir.path().join("results.csv");
    let mut sink = DedupSink::new(CsvDestination::new(&path), 10);

    assert!(sink.admit(search(1, "A")).await.unwrap());
    assert!(sink.admit(search(2, "B")).await.unwrap());
    assert!(!sink.admit(search(3, "A")).await.unwrap());
    assert!(sink.admit(search(4, "C")).await.unwrap());
    sink.close().await.unwrap();

    let rows = read_rows(&path);
    let titles: Vec<&str> = rows.iter().map(|r| r[1].as_str()).collect();
    assert_eq!(titles, vec!["A", "B", "C"]);
    assert!(read_file(&path).starts_with("rank,title,url\n"));

    let stats = sink.stats();
    assert_eq!(stats.admitted, 3);
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.rows_written, 3);
}

#[tokio::test]
async fn test_flushes_when_threshold_is_reached() {
    let destination = RecordingDestination::default();
    let mut sink = DedupSink::new(destination.clone(), 2);

    for (i, title) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        sink.admit(search(i as u32 + 1, title)).await.unwrap();
    }
    assert_eq!(destination.batch_sizes(), vec![2, 2]);
    assert_eq!(sink.pending().len(), 1);

    sink.close().await.unwrap();
    assert_eq!(destination.batch_sizes(), vec![2, 2, 1]);
    assert_eq!(destination.titles(), vec!["a", "b", "c", "d", "e"]);
    assert_eq!(sink.stats().flushes, 3);
}

#[tokio::test]
async fn test_empty_flush_writes_nothing() {
    let dir = create_test_dir();
    let path = dir.path().join("empty.csv");
    let mut sink: DedupSink<SearchRecord> = DedupSink::new(CsvDestination::new(&path), 5);

    assert_eq!(sink.flush().await.unwrap(), 0);
    sink.close().await.unwrap();
    assert!(!path.exists(), "a job that admitted nothing leaves no file");

    let mut sink = DedupSink::new(CsvDestination::new(&path), 5);
    sink.admit(search(1, "only")).await.unwrap();
    sink.flush().await.unwrap();
    let before = std::fs::metadata(&path).unwrap().len();

    assert_eq!(sink.flush().await.unwrap(), 0);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), before);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let destination = RecordingDestination::default();
    let mut sink = DedupSink::new(destination.clone(), 10);
    sink.admit(search(1, "x")).await.unwrap();

    sink.close().await.unwrap();
    sink.close().await.unwrap();

    assert!(sink.is_closed());
    assert_eq!(destination.batch_sizes(), vec![1]);
}

#[tokio::test]
async fn test_seen_keys_survive_flushes() {
    let destination = RecordingDestination::default();
    let mut sink = DedupSink::new(destination.clone(), 1);

    assert!(sink.admit(search(1, "same")).await.unwrap());
    assert!(sink.pending().is_empty());
    assert!(!sink.admit(search(2, "same")).await.unwrap());
    assert!(sink.has_seen("  same "));

    sink.close().await.unwrap();
    assert_eq!(destination.titles(), vec!["same"]);
}

#[tokio::test]
async fn test_keys_are_compared_trimmed() {
    let destination = RecordingDestination::default();
    let mut sink = DedupSink::new(destination.clone(), 10);

    assert!(sink.admit(search(1, "Title")).await.unwrap());
    assert!(!sink.admit(search(2, "  Title  ")).await.unwrap());
    assert!(sink.admit(search(3, "title")).await.unwrap());
}

#[tokio::test]
async fn test_admit_after_close_is_rejected() {
    let dir = create_test_dir();
    let path = dir.path().join("closed.csv");
    let mut sink = DedupSink::new(CsvDestination::new(&path), 10);
    sink.close().await.unwrap();

    let err = sink.admit(search(1, "late")).await.unwrap_err();
    assert!(matches!(err, HarvestError::SinkClosed(p) if p == path));
}

#[tokio::test]
async fn test_failed_flush_keeps_the_batch() {
    let destination = RecordingDestination::failing(1);
    let mut sink = DedupSink::new(destination.clone(), 10);
    sink.admit(search(1, "first")).await.unwrap();
    sink.admit(search(2, "second")).await.unwrap();

    let err = sink.flush().await.unwrap_err();
    assert!(matches!(err, HarvestError::SinkWriteFailed { rows: 2, .. }));
    assert_eq!(sink.pending().len(), 2);
    assert_eq!(sink.stats().failed_flushes, 1);

    sink.admit(search(3, "third")).await.unwrap();
    assert_eq!(sink.flush().await.unwrap(), 3);
    assert_eq!(destination.titles(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_failed_close_can_be_retried() {
    let destination = RecordingDestination::failing(1);
    let mut sink = DedupSink::new(destination.clone(), 10);
    sink.admit(search(1, "kept")).await.unwrap();

    assert!(sink.close().await.is_err());
    assert!(!sink.is_closed());

    sink.close().await.unwrap();
    assert!(sink.is_closed());
    assert_eq!(destination.titles(), vec!["kept"]);
}

#[tokio::test]
async fn test_header_written_once_across_flushes() {
    let dir = create_test_dir();
    let path = dir.path().join("answers").join("What-is-Rust.csv");
    let mut sink = DedupSink::new(CsvDestination::new(&path), 1);

    for author in ["Ada", "Grace", "Linus"] {
        sink.admit(AnswerRecord {
            author: author.to_string(),
            body: format!("{author}'s answer"),
        })
        .await
        .unwrap();
    }
    sink.close().await.unwrap();

    let content = read_file(&path);
    assert_eq!(content.matches("title,answer").count(), 1);
    assert_eq!(read_rows(&path).len(), 3);
}

#[tokio::test]
async fn test_fields_are_csv_escaped() {
    let dir = create_test_dir();
    let path = dir.path().join("escaped.csv");
    let mut sink = DedupSink::new(CsvDestination::new(&path), 10);

    let body = "Two lines,\nwith \"quotes\" and a comma";
    sink.admit(AnswerRecord {
        author: "Ada, Countess".to_string(),
        body: body.to_string(),
    })
    .await
    .unwrap();
    sink.close().await.unwrap();

    let rows = read_rows(&path);
    assert_eq!(rows, vec![vec!["Ada, Countess".to_string(), body.to_string()]]);
}

#[tokio::test]
async fn test_resume_skips_rows_already_on_disk() {
    let dir = create_test_dir();
    let path = dir.path().join("resume.csv");

    let mut first = DedupSink::new(CsvDestination::new(&path), 10);
    first.admit(search(1, "A")).await.unwrap();
    first.admit(search(2, "B")).await.unwrap();
    first.close().await.unwrap();

    let mut second = DedupSink::new(CsvDestination::new(&path), 10);
    assert_eq!(second.preload_from_destination().await.unwrap(), 2);
    assert!(!second.admit(search(1, "A")).await.unwrap());
    assert!(second.admit(search(3, "C")).await.unwrap());
    second.close().await.unwrap();

    let titles: Vec<String> = read_rows(&path).into_iter().map(|r| r[1].clone()).collect();
    assert_eq!(titles, vec!["A", "B", "C"]);
    assert_eq!(read_file(&path).matches("rank,title,url").count(), 1);
}

#[tokio::test]
async fn test_preload_from_missing_file_is_empty() {
    let dir = create_test_dir();
    let mut sink: DedupSink<SearchRecord> =
        DedupSink::new(CsvDestination::new(dir.path().join("none.csv")), 10);
    assert_eq!(sink.preload_from_destination().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sinks_on_a_new_file_share_one_header() {
    let dir = create_test_dir();
    let path = dir.path().join("answers").join("Shared.csv");

    let writers = (0..8).map(|i| {
        let path = path.clone();
        tokio::spawn(async move {
            let mut sink = DedupSink::new(CsvDestination::new(path), 10);
            sink.admit(AnswerRecord {
                author: format!("author {i}"),
                body: "same page".to_string(),
            })
            .await
            .unwrap();
            sink.close().await.unwrap();
        })
    });
    for writer in futures::future::join_all(writers).await {
        writer.unwrap();
    }

    let content = read_file(&path);
    assert_eq!(content.matches("title,answer").count(), 1);
    assert!(content.starts_with("title,answer"));
    assert_eq!(read_rows(&path).len(), 8);
}
