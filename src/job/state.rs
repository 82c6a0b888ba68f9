//! Retry state machine for a single job
//!
//! `Pending -> Running -> {Succeeded, Failed}`, with `Running` looping on
//! itself while attempts remain. The transition function is pure so the retry
//! rules can be checked without a browser or a clock.

/// Where a job is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    /// `attempt` is 1-indexed and never exceeds `max_attempts`
    Running { attempt: u32, max_attempts: u32 },
    Succeeded { attempts: u32, records: usize },
    Failed { attempts: u32, last_error: String },
}

/// Inputs driving the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Start { max_attempts: u32 },
    AttemptSucceeded { records: usize },
    AttemptFailed { reason: String },
}

impl JobState {
    /// Apply one event
    ///
    /// Events that do not apply to the current state leave it unchanged.
    #[must_use]
    pub fn transition(self, event: JobEvent) -> JobState {
        match (self, event) {
            (JobState::Pending, JobEvent::Start { max_attempts }) => JobState::Running {
                attempt: 1,
                max_attempts: max_attempts.max(1),
            },
            (JobState::Running { attempt, .. }, JobEvent::AttemptSucceeded { records }) => {
                JobState::Succeeded {
                    attempts: attempt,
                    records,
                }
            }
            (
                JobState::Running {
                    attempt,
                    max_attempts,
                },
                JobEvent::AttemptFailed { reason },
            ) => {
                if attempt < max_attempts {
                    JobState::Running {
                        attempt: attempt + 1,
                        max_attempts,
                    }
                } else {
                    JobState::Failed {
                        attempts: attempt,
                        last_error: reason,
                    }
                }
            }
            (state, _) => state,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded { .. } | JobState::Failed { .. })
    }

    /// Attempts left after the current one, while running
    #[must_use]
    pub fn remaining_attempts(&self) -> u32 {
        match self {
            JobState::Running {
                attempt,
                max_attempts,
            } => max_attempts - attempt,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(reason: &str) -> JobEvent {
        JobEvent::AttemptFailed {
            reason: reason.to_string(),
        }
    }

    #[test]
    fn start_enters_first_attempt() {
        let state = JobState::Pending.transition(JobEvent::Start { max_attempts: 3 });
        assert_eq!(
            state,
            JobState::Running {
                attempt: 1,
                max_attempts: 3
            }
        );
        assert_eq!(state.remaining_attempts(), 2);
    }

    #[test]
    fn failures_retry_until_attempts_are_consumed() {
        let mut state = JobState::Pending.transition(JobEvent::Start { max_attempts: 3 });
        state = state.transition(failed("timeout"));
        state = state.transition(failed("timeout"));
        assert_eq!(
            state,
            JobState::Running {
                attempt: 3,
                max_attempts: 3
            }
        );

        state = state.transition(failed("no results"));
        assert_eq!(
            state,
            JobState::Failed {
                attempts: 3,
                last_error: "no results".to_string()
            }
        );
        assert!(state.is_terminal());
    }

    #[test]
    fn success_after_retry_records_attempt_count() {
        let state = JobState::Pending
            .transition(JobEvent::Start { max_attempts: 3 })
            .transition(failed("navigation"))
            .transition(JobEvent::AttemptSucceeded { records: 8 });
        assert_eq!(
            state,
            JobState::Succeeded {
                attempts: 2,
                records: 8
            }
        );
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let state = JobState::Pending
            .transition(JobEvent::Start { max_attempts: 0 })
            .transition(failed("boom"));
        assert!(matches!(state, JobState::Failed { attempts: 1, .. }));
    }

    #[test]
    fn terminal_states_ignore_events() {
        let done = JobState::Succeeded {
            attempts: 1,
            records: 2,
        };
        assert_eq!(done.clone().transition(failed("late")), done);

        let pending = JobState::Pending.transition(JobEvent::AttemptSucceeded { records: 1 });
        assert_eq!(pending, JobState::Pending);
    }
}
