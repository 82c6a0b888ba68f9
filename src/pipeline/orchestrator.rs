//! Two-phase harvest orchestration
//!
//! Phase 1 runs one discovery job per query, each writing the matching search
//! results to its own file. The URLs in those files, in query order, become
//! phase 2: one answer job per URL, again one file per job.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use super::extractors::{AnswerExtractor, SearchResultsExtractor};
use super::filter::DomainFilter;
use super::naming::{FileNaming, SlugNaming};
use crate::config::HarvestConfig;
use crate::error::{HarvestError, HarvestResult};
use crate::job::{Extractor, JobOutcome, RetryableJob, SessionProvider, SuccessCriterion};
use crate::proxy::UrlRewriter;
use crate::records::{AnswerRecord, FromRaw, SearchRecord, SinkRecord};
use crate::scheduler::run_all;
use crate::sink::{CsvDestination, DedupSink, read_csv_column};

/// Column of the discovery files holding the URLs fed into phase 2
const URL_COLUMN: &str = "url";

/// Outcomes of one scheduling phase
#[derive(Debug, Default)]
pub struct PhaseReport {
    pub outcomes: Vec<JobOutcome>,
}

impl PhaseReport {
    #[must_use]
    pub fn jobs(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.jobs() - self.succeeded()
    }

    /// Records admitted across all successful jobs
    #[must_use]
    pub fn admitted(&self) -> usize {
        self.outcomes.iter().filter_map(JobOutcome::admitted).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Summary of a full run
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub discovery: PhaseReport,
    /// URLs read back from the discovery files and scheduled in phase 2
    pub discovered_urls: usize,
    pub answers: PhaseReport,
}

/// Runs discovery and answer extraction over a shared session provider
pub struct Harvester<P, D = SearchResultsExtractor, A = AnswerExtractor> {
    provider: P,
    config: HarvestConfig,
    discovery: D,
    answers: A,
    filter: DomainFilter,
    rewriter: Box<dyn UrlRewriter>,
    naming: Box<dyn FileNaming>,
}

impl<P: SessionProvider> Harvester<P> {
    /// Harvester with the default extractors, the configured proxy and slug file names
    pub fn new(provider: P, config: HarvestConfig) -> HarvestResult<Self> {
        let rewriter = config.url_rewriter()?;
        Ok(Self {
            filter: DomainFilter::from_config(&config),
            answers: AnswerExtractor::from_config(&config),
            discovery: SearchResultsExtractor::default(),
            rewriter,
            naming: Box::new(SlugNaming),
            provider,
            config,
        })
    }
}

impl<P, D, A> Harvester<P, D, A>
where
    P: SessionProvider,
    D: Extractor,
    A: Extractor,
{
    /// Swap the page-specific extraction logic of either phase
    pub fn with_extractors<D2, A2>(self, discovery: D2, answers: A2) -> Harvester<P, D2, A2>
    where
        D2: Extractor,
        A2: Extractor,
    {
        Harvester {
            provider: self.provider,
            config: self.config,
            discovery,
            answers,
            filter: self.filter,
            rewriter: self.rewriter,
            naming: self.naming,
        }
    }

    #[must_use]
    pub fn with_rewriter(mut self, rewriter: impl UrlRewriter + 'static) -> Self {
        self.rewriter = Box::new(rewriter);
        self
    }

    #[must_use]
    pub fn with_naming(mut self, naming: impl FileNaming + 'static) -> Self {
        self.naming = Box::new(naming);
        self
    }

    #[must_use]
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub fn discovery_file(&self, query: &str) -> PathBuf {
        self.naming.discovery_file(self.config.output_dir(), query)
    }

    /// Discovery file of each query, in order
    ///
    /// Queries whose names collide (`Rust Books` and `rust books`) get a
    /// numbered suffix, so every query writes its own file.
    #[must_use]
    pub fn discovery_files(&self, queries: &[String]) -> Vec<PathBuf> {
        let mut claimed = HashSet::new();
        queries
            .iter()
            .map(|query| {
                let base = self.discovery_file(query);
                let mut path = base.clone();
                let mut n = 2;
                while !claimed.insert(path.clone()) {
                    path = numbered(&base, n);
                    n += 1;
                }
                if path != base {
                    warn!(
                        "Query '{query}' shares a file name with an earlier query, writing {}",
                        path.display()
                    );
                }
                path
            })
            .collect()
    }

    #[must_use]
    pub fn answer_file(&self, url: &str) -> PathBuf {
        self.naming.answer_file(self.config.output_dir(), url)
    }

    /// Search engine URL restricted to the target domain
    pub fn search_url(&self, query: &str) -> HarvestResult<String> {
        let mut url = Url::parse(self.config.search_engine_url()).map_err(|e| {
            HarvestError::Config(format!(
                "invalid search engine URL '{}': {e}",
                self.config.search_engine_url()
            ))
        })?;
        url.query_pairs_mut().append_pair(
            "q",
            &format!("site:{} {}", self.config.target_domain(), query.trim()),
        );
        Ok(url.into())
    }

    /// Run both phases
    ///
    /// Individual job failures are reported in the result, never returned as
    /// errors; only an unusable output directory fails the run.
    pub async fn run(&self, queries: &[String]) -> HarvestResult<PipelineReport> {
        let started = Instant::now();
        tokio::fs::create_dir_all(self.config.output_dir()).await?;

        let queries: Vec<String> = queries
            .iter()
            .map(|q| q.trim().to_string())
            .filter(|q| {
                if q.is_empty() {
                    warn!("Skipping empty query");
                }
                !q.is_empty()
            })
            .collect();

        let discovery = self.discover(&queries).await;
        let urls = self.collect_urls(&queries).await;
        let answers = self.harvest_answers(&urls).await;

        let report = PipelineReport {
            discovery,
            discovered_urls: urls.len(),
            answers,
        };
        info!(
            "Harvest finished in {:.1}s: {} URLs discovered, {}/{} answer jobs succeeded, {} answers saved",
            started.elapsed().as_secs_f64(),
            report.discovered_urls,
            report.answers.succeeded(),
            report.answers.jobs(),
            report.answers.admitted()
        );
        Ok(report)
    }

    /// Phase 1: one discovery job per query at the discovery concurrency
    pub async fn discover(&self, queries: &[String]) -> PhaseReport {
        info!(
            "Discovery: {} queries at concurrency {}",
            queries.len(),
            self.config.discovery_concurrency()
        );
        let files = self.discovery_files(queries);
        let jobs = queries
            .iter()
            .zip(&files)
            .map(|(query, path)| move || self.discovery_job(query, path));
        let report = PhaseReport {
            outcomes: run_all(jobs, self.config.discovery_concurrency()).await,
        };
        self.log_phase("Discovery", &report);
        report
    }

    /// Read the URL column of every discovery file, in query order
    ///
    /// Missing files (failed jobs) contribute nothing. Duplicates across files
    /// are kept unless `dedup_discovered_urls` is set.
    pub async fn collect_urls(&self, queries: &[String]) -> Vec<String> {
        let mut urls = Vec::new();
        let mut seen = HashSet::new();

        for path in self.discovery_files(queries) {
            let column = match read_csv_column(&path, URL_COLUMN).await {
                Ok(column) => column,
                Err(e) => {
                    warn!("Skipping unreadable discovery file {}: {e}", path.display());
                    continue;
                }
            };
            debug!("{} URLs in {}", column.len(), path.display());

            for url in column {
                if self.config.dedup_discovered_urls() && !seen.insert(url.clone()) {
                    continue;
                }
                urls.push(url);
            }
        }

        info!("Collected {} URLs for answer extraction", urls.len());
        urls
    }

    /// Phase 2: one answer job per URL at the answer concurrency
    pub async fn harvest_answers(&self, urls: &[String]) -> PhaseReport {
        info!(
            "Answers: {} URLs at concurrency {}",
            urls.len(),
            self.config.answer_concurrency()
        );
        let jobs = urls.iter().map(|url| move || self.answer_job(url));
        let report = PhaseReport {
            outcomes: run_all(jobs, self.config.answer_concurrency()).await,
        };
        self.log_phase("Answers", &report);
        report
    }

    async fn discovery_job(&self, query: &str, path: &Path) -> JobOutcome {
        let sink = match self.open_sink::<SearchRecord>(path.to_path_buf()).await {
            Ok(sink) => sink,
            Err(e) => return JobOutcome::failure(query, e),
        };
        let navigable = match self
            .search_url(query)
            .and_then(|url| self.rewriter.rewrite(&url))
        {
            Ok(url) => url,
            Err(e) => return JobOutcome::failure(query, e),
        };

        RetryableJob::new(query, navigable, &self.provider, &self.discovery, sink)
            .with_policy(self.config.retry_policy())
            .with_criterion(SuccessCriterion::NonEmpty)
            .with_filter(|record: &SearchRecord| self.filter.allows(record))
            .run()
            .await
    }

    async fn answer_job(&self, url: &str) -> JobOutcome {
        let sink = match self.open_sink::<AnswerRecord>(self.answer_file(url)).await {
            Ok(sink) => sink,
            Err(e) => return JobOutcome::failure(url, e),
        };
        let navigable = match self.rewriter.rewrite(url) {
            Ok(navigable) => navigable,
            Err(e) => return JobOutcome::failure(url, e),
        };

        RetryableJob::new(url, navigable, &self.provider, &self.answers, sink)
            .with_policy(self.config.retry_policy())
            .with_criterion(SuccessCriterion::Completed)
            .run()
            .await
    }

    async fn open_sink<R>(&self, path: PathBuf) -> HarvestResult<DedupSink<R>>
    where
        R: SinkRecord + FromRaw,
    {
        let mut sink = DedupSink::new(CsvDestination::new(path), self.config.flush_threshold());
        if self.config.resume_from_existing() {
            let preloaded = sink.preload_from_destination().await?;
            if preloaded > 0 {
                debug!(
                    "Resuming {} with {preloaded} known records",
                    sink.destination().path().display()
                );
            }
        }
        Ok(sink)
    }

    fn log_phase(&self, phase: &str, report: &PhaseReport) {
        info!(
            "{phase} phase: {}/{} jobs succeeded, {} records admitted",
            report.succeeded(),
            report.jobs(),
            report.admitted()
        );
        for failure in report.failures() {
            if let Some(error) = failure.error() {
                warn!("{phase} job '{}' failed: {error}", failure.target());
            }
        }
    }
}

/// `dir/name.csv` -> `dir/name_<n>.csv`
fn numbered(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{n}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{n}"),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_keeps_directory_and_extension() {
        assert_eq!(
            numbered(Path::new("out/discovery/rust_books.csv"), 2),
            Path::new("out/discovery/rust_books_2.csv")
        );
        assert_eq!(numbered(Path::new("out/plain"), 3), Path::new("out/plain_3"));
    }
}
