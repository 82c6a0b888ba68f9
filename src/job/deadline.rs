//! Deadline wrapper for job attempts
//!
//! A stuck browser operation would otherwise hold its concurrency slot
//! forever; the deadline turns it into an ordinary failed attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::{HarvestError, HarvestResult};

/// Run one attempt, failing with `AttemptTimeout` once `timeout` elapses
pub async fn with_attempt_deadline<F, T>(
    operation: F,
    timeout: Option<Duration>,
    target: &str,
    attempt: u32,
) -> HarvestResult<T>
where
    F: Future<Output = HarvestResult<T>>,
{
    let Some(timeout) = timeout else {
        return operation.await;
    };

    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(HarvestError::AttemptTimeout {
            target: target.to_string(),
            attempt,
            timeout,
        }),
    }
}
