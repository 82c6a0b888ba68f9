//! A single extraction job with bounded retries

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::deadline::with_attempt_deadline;
use super::outcome::JobOutcome;
use super::retry::RetryPolicy;
use super::session::{PageSession, SessionProvider, WaitPolicy};
use super::state::{JobEvent, JobState};
use crate::error::{HarvestError, HarvestResult};
use crate::records::{FromRaw, RawRecord, SinkRecord};
use crate::sink::{BatchDestination, CsvDestination, DedupSink};

/// Page-specific extraction logic supplied per job type
#[allow(async_fn_in_trait)]
pub trait Extractor {
    /// What navigation waits for before `extract` runs
    fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::Load
    }

    /// Pull raw records out of the loaded page
    ///
    /// Any UI interaction needed before the records are visible belongs here,
    /// so a failed interaction counts as a failed attempt.
    async fn extract<S: PageSession>(&self, session: &mut S) -> anyhow::Result<Vec<RawRecord>>;
}

impl<X: Extractor> Extractor for &X {
    fn wait_policy(&self) -> WaitPolicy {
        (**self).wait_policy()
    }

    async fn extract<S: PageSession>(&self, session: &mut S) -> anyhow::Result<Vec<RawRecord>> {
        (**self).extract(session).await
    }
}

/// When an attempt counts as successful
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessCriterion {
    /// At least one raw record was extracted (discovery jobs)
    NonEmpty,
    /// Extraction completed without error, even with zero records
    Completed,
}

type RecordFilter<'a, R> = Box<dyn Fn(&R) -> bool + 'a>;

/// One unit of work: a target, the session to load it in, and the sink its
/// records go to
pub struct RetryableJob<'a, P, X, R, D = CsvDestination>
where
    R: SinkRecord,
    D: BatchDestination<R>,
{
    target: String,
    url: String,
    provider: &'a P,
    extractor: &'a X,
    policy: RetryPolicy,
    criterion: SuccessCriterion,
    filter: Option<RecordFilter<'a, R>>,
    sink: DedupSink<R, D>,
}

impl<'a, P, X, R, D> RetryableJob<'a, P, X, R, D>
where
    P: SessionProvider,
    X: Extractor,
    R: SinkRecord + FromRaw,
    D: BatchDestination<R>,
{
    /// `target` names the job in reports; `url` is what the session navigates to
    pub fn new(
        target: impl Into<String>,
        url: impl Into<String>,
        provider: &'a P,
        extractor: &'a X,
        sink: DedupSink<R, D>,
    ) -> Self {
        Self {
            target: target.into(),
            url: url.into(),
            provider,
            extractor,
            policy: RetryPolicy::default(),
            criterion: SuccessCriterion::Completed,
            filter: None,
            sink,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_criterion(mut self, criterion: SuccessCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Only records passing `filter` reach the sink
    #[must_use]
    pub fn with_filter(mut self, filter: impl Fn(&R) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Run the job to completion
    ///
    /// Never returns an error: every failure becomes `JobOutcome::Failure`.
    pub async fn run(mut self) -> JobOutcome {
        let started = Instant::now();
        info!(target_locator = %self.target, "Job started");

        let mut session = match self.provider.open().await {
            Ok(session) => session,
            Err(e) => {
                let err = HarvestError::SessionUnavailable {
                    target: self.target.clone(),
                    message: format!("{e:#}"),
                };
                error!("{err}");
                return JobOutcome::failure(self.target.clone(), err);
            }
        };

        let attempted = AssertUnwindSafe(self.attempt_loop(&mut session))
            .catch_unwind()
            .await;

        // Released on every path, including a panic inside an attempt
        if let Err(e) = session.close().await {
            warn!(target_locator = %self.target, "Failed to close browser session: {e:#}");
        }

        let raw = match attempted {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => {
                error!(target_locator = %self.target, "Job failed: {err}");
                return JobOutcome::failure(self.target.clone(), err);
            }
            Err(payload) => {
                error!(target_locator = %self.target, "Job panicked during an attempt");
                return JobOutcome::panicked(self.target.clone(), &*payload);
            }
        };

        match self.persist(raw).await {
            Ok(admitted) => {
                let stats = self.sink.stats();
                info!(
                    target_locator = %self.target,
                    "Job succeeded: {admitted} records admitted, {} duplicates dropped, {} rows written in {:.2}s",
                    stats.dropped,
                    stats.rows_written,
                    started.elapsed().as_secs_f64()
                );
                JobOutcome::success(self.target.clone(), admitted)
            }
            Err(err) => {
                error!(target_locator = %self.target, "Persisting records failed: {err}");
                JobOutcome::failure(self.target.clone(), err)
            }
        }
    }

    async fn attempt_loop(&self, session: &mut P::Session) -> HarvestResult<Vec<RawRecord>> {
        let wait = self.extractor.wait_policy();
        let mut state = JobState::Pending.transition(JobEvent::Start {
            max_attempts: self.policy.max_attempts,
        });
        let mut accepted = Vec::new();

        loop {
            match state {
                JobState::Running {
                    attempt,
                    max_attempts,
                } => {
                    let result = with_attempt_deadline(
                        self.attempt(session, attempt, &wait),
                        self.policy.attempt_timeout,
                        &self.target,
                        attempt,
                    )
                    .await;

                    let event = match result {
                        Ok(raw) => {
                            let records = raw.len();
                            accepted = raw;
                            JobEvent::AttemptSucceeded { records }
                        }
                        Err(e) => {
                            warn!(
                                target_locator = %self.target,
                                "Attempt {attempt}/{max_attempts} failed: {e}"
                            );
                            JobEvent::AttemptFailed {
                                reason: e.to_string(),
                            }
                        }
                    };

                    state = state.transition(event);
                    if let JobState::Running { .. } = state {
                        let delay = self.policy.next_delay();
                        debug!(target_locator = %self.target, "Retrying in {delay:?}");
                        tokio::time::sleep(delay).await;
                    }
                }
                JobState::Succeeded { attempts, records } => {
                    debug!(
                        target_locator = %self.target,
                        "Extracted {records} raw records after {attempts} attempt(s)"
                    );
                    return Ok(accepted);
                }
                JobState::Failed {
                    attempts,
                    last_error,
                } => {
                    return Err(HarvestError::JobExhausted {
                        target: self.target.clone(),
                        attempts,
                        last_error,
                    });
                }
                JobState::Pending => {
                    state = state.transition(JobEvent::Start {
                        max_attempts: self.policy.max_attempts,
                    });
                }
            }
        }
    }

    async fn attempt(
        &self,
        session: &mut P::Session,
        attempt: u32,
        wait: &WaitPolicy,
    ) -> HarvestResult<Vec<RawRecord>> {
        debug!(target_locator = %self.target, "Attempt {attempt}: navigating to {}", self.url);

        session
            .navigate(&self.url, wait)
            .await
            .map_err(|e| self.attempt_error(attempt, format!("navigation failed: {e:#}")))?;

        let raw = self
            .extractor
            .extract(session)
            .await
            .map_err(|e| self.attempt_error(attempt, format!("extraction failed: {e:#}")))?;

        if self.criterion == SuccessCriterion::NonEmpty && raw.is_empty() {
            return Err(self.attempt_error(attempt, "extraction returned no records"));
        }

        Ok(raw)
    }

    fn attempt_error(&self, attempt: u32, message: impl Into<String>) -> HarvestError {
        HarvestError::AttemptFailed {
            target: self.target.clone(),
            attempt,
            message: message.into(),
        }
    }

    /// Validate, filter and admit the accepted records, then close the sink
    async fn persist(&mut self, raw: Vec<RawRecord>) -> HarvestResult<usize> {
        let mut admitted = 0;
        let mut filtered = 0;

        for value in &raw {
            let record = R::from_raw(value);
            if let Some(filter) = &self.filter
                && !filter(&record)
            {
                filtered += 1;
                continue;
            }
            if self.sink.admit(record).await? {
                admitted += 1;
            }
        }

        if filtered > 0 {
            debug!(target_locator = %self.target, "Filtered out {filtered} of {} records", raw.len());
        }

        self.sink.close().await?;
        Ok(admitted)
    }
}
