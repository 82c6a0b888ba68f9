//! Bounded-concurrency job scheduling
//!
//! Both entry points admit jobs in input order through a sliding window: a new
//! job starts as soon as any running job settles, never more than `limit` at a
//! time. Every job yields exactly one [`JobOutcome`]; a panicking job becomes a
//! `Failure` and the remaining jobs keep running.
//!
//! - [`run_all`] drives all jobs cooperatively on the calling task. Jobs may
//!   borrow from the caller and need not be `Send`.
//! - [`run_all_spawned`] runs each job on its own tokio task, gated by a
//!   counting semaphore.

use futures::FutureExt;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use log::{debug, error, info};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::HarvestError;
use crate::job::JobOutcome;

fn job_label(index: usize) -> String {
    format!("job #{index}")
}

/// Run every job with at most `limit` unsettled at once, on the current task
///
/// A `limit` of 0 is treated as 1. Outcomes are returned in completion order.
pub async fn run_all<I, F, Fut>(jobs: I, limit: usize) -> Vec<JobOutcome>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = JobOutcome>,
{
    let limit = limit.max(1);
    let mut jobs = jobs.into_iter().enumerate().peekable();
    if jobs.peek().is_none() {
        return Vec::new();
    }

    let mut outcomes = Vec::new();
    let mut in_flight = FuturesUnordered::new();
    let mut started = 0usize;

    for (index, job) in jobs {
        // Block until a slot frees before admitting the next job
        while in_flight.len() >= limit {
            if let Some(outcome) = in_flight.next().await {
                outcomes.push(outcome);
            }
        }

        let label = job_label(index);
        let future = match std::panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(future) => future,
            Err(payload) => {
                error!("{label} panicked before starting");
                outcomes.push(JobOutcome::panicked(label, &*payload));
                continue;
            }
        };

        started += 1;
        debug!("Starting {label} ({} in flight)", in_flight.len() + 1);
        in_flight.push(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(payload) => {
                    error!("{label} panicked");
                    JobOutcome::panicked(label, &*payload)
                }
            }
        });
    }

    while let Some(outcome) = in_flight.next().await {
        outcomes.push(outcome);
    }

    log_summary(started, &outcomes);
    outcomes
}

/// Run every job on its own tokio task with at most `limit` running at once
///
/// A `limit` of 0 is treated as 1. Outcomes are returned in completion order.
pub async fn run_all_spawned<I, F, Fut>(jobs: I, limit: usize) -> Vec<JobOutcome>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = JobOutcome> + Send + 'static,
{
    let limit = limit.max(1);
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut outcomes = Vec::new();
    let mut active_tasks = FuturesUnordered::new();

    for (index, job) in jobs.into_iter().enumerate() {
        // Drain settled tasks while waiting for a permit so outcomes do not pile up
        let permit = loop {
            if let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() {
                break Some(permit);
            }
            match active_tasks.next().await {
                Some(outcome) => outcomes.push(outcome),
                None => break Arc::clone(&semaphore).acquire_owned().await.ok(),
            }
        };

        let label = job_label(index);
        let Some(permit) = permit else {
            error!("Semaphore closed unexpectedly, {label} not started");
            outcomes.push(JobOutcome::failure(
                label.clone(),
                HarvestError::JobPanicked {
                    target: label,
                    message: "scheduler semaphore closed".to_string(),
                },
            ));
            continue;
        };

        debug!("Spawning {label}");
        let handle = tokio::spawn(async move {
            let _permit = permit; // Hold until the job settles
            job().await
        });

        active_tasks.push(async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => {
                    error!("{label} panicked");
                    JobOutcome::panicked(label, &*e.into_panic())
                }
                Err(e) => {
                    error!("{label} was cancelled: {e}");
                    JobOutcome::failure(
                        label.clone(),
                        HarvestError::JobPanicked {
                            target: label,
                            message: e.to_string(),
                        },
                    )
                }
            }
        });
    }

    while let Some(outcome) = active_tasks.next().await {
        outcomes.push(outcome);
    }

    let started = outcomes.len();
    log_summary(started, &outcomes);
    outcomes
}

fn log_summary(started: usize, outcomes: &[JobOutcome]) {
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    info!(
        "Scheduler finished: {started} jobs started, {succeeded} succeeded, {} failed",
        outcomes.len() - succeeded
    );
}
