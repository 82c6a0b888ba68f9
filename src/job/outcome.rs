//! Per-job results reported back through the scheduler

use std::any::Any;

use crate::error::HarvestError;

/// Result of one job; failures are values, never propagated past the scheduler
#[derive(Debug)]
pub enum JobOutcome {
    /// The job finished and its sink admitted `admitted` new records
    Success { target: String, admitted: usize },
    /// The job gave up; the rest of the run continues
    Failure { target: String, error: HarvestError },
}

impl JobOutcome {
    #[must_use]
    pub fn success(target: impl Into<String>, admitted: usize) -> Self {
        Self::Success {
            target: target.into(),
            admitted,
        }
    }

    #[must_use]
    pub fn failure(target: impl Into<String>, error: HarvestError) -> Self {
        Self::Failure {
            target: target.into(),
            error,
        }
    }

    /// Failure for a job that panicked instead of returning
    #[must_use]
    pub fn panicked(target: impl Into<String>, payload: &(dyn Any + Send)) -> Self {
        let target = target.into();
        let message = panic_message(payload);
        Self::Failure {
            error: HarvestError::JobPanicked {
                target: target.clone(),
                message,
            },
            target,
        }
    }

    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Success { target, .. } | Self::Failure { target, .. } => target,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Records admitted by a successful job
    #[must_use]
    pub fn admitted(&self) -> Option<usize> {
        match self {
            Self::Success { admitted, .. } => Some(*admitted),
            Self::Failure { .. } => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&HarvestError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
