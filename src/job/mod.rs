//! Retryable, browser-driven extraction jobs
//!
//! A job opens one browser session, runs navigate + extract attempts under a
//! [`RetryPolicy`], validates the records of the successful attempt into its
//! own sink and closes the session on every exit path.

mod deadline;
mod outcome;
mod retry;
mod retryable;
mod session;
mod state;

pub use deadline::with_attempt_deadline;
pub use outcome::JobOutcome;
pub use retry::RetryPolicy;
pub use retryable::{Extractor, RetryableJob, SuccessCriterion};
pub use session::{PageSession, SessionProvider, WaitPolicy};
pub use state::{JobEvent, JobState};
