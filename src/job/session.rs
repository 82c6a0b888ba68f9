//! Browser session capability used by jobs
//!
//! The page-rendering engine is an external collaborator. Jobs only see these
//! traits; [`crate::browser`] implements them on top of chromiumoxide and the
//! tests implement them with scripted fakes.

use anyhow::Result;
use serde_json::Value;
use std::time::Duration;

/// What `navigate` waits for before returning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitPolicy {
    /// The load event of the navigated document
    Load,
    /// The load event, then until `selector` matches or `timeout` elapses
    Selector { selector: String, timeout: Duration },
}

/// One open page in the remote browser
#[allow(async_fn_in_trait)]
pub trait PageSession {
    /// Navigate to `url` and wait according to `wait`
    async fn navigate(&mut self, url: &str, wait: &WaitPolicy) -> Result<()>;

    /// Run an extraction program in the page and return its JSON result
    async fn evaluate(&mut self, program: &str) -> Result<Value>;

    /// Click the first element matching `selector`
    async fn click(&mut self, selector: &str) -> Result<()>;

    /// Scroll to the bottom of the page and report the resulting page height
    async fn scroll_to_bottom(&mut self) -> Result<u64>;

    /// Release the page
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Hands out sessions; shared by every concurrently running job
#[allow(async_fn_in_trait)]
pub trait SessionProvider {
    type Session: PageSession;

    async fn open(&self) -> Result<Self::Session>;
}

impl<P: SessionProvider> SessionProvider for &P {
    type Session = P::Session;

    async fn open(&self) -> Result<Self::Session> {
        (**self).open().await
    }
}

impl<P: SessionProvider> SessionProvider for std::sync::Arc<P> {
    type Session = P::Session;

    async fn open(&self) -> Result<Self::Session> {
        (**self).open().await
    }
}
