//! chromiumoxide implementation of the job session traits

use anyhow::{Context, Result, anyhow};
use chromiumoxide::Page;
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::launch::{BrowserWrapper, launch_browser};
use super::user_agent::apply_user_agent;
use crate::config::HarvestConfig;
use crate::job::{PageSession, SessionProvider, WaitPolicy};

/// Upper bound for the user-agent override on a fresh page
const USER_AGENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval while waiting for a selector
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(200);

const SCROLL_PROGRAM: &str = r"
    (() => {
        window.scrollTo(0, document.body.scrollHeight);
        return document.body.scrollHeight;
    })()
";

/// Wrap a page operation with an explicit timeout
async fn with_page_timeout<F, T>(operation: F, timeout: Duration, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!(
            "{operation_name} timeout after {} seconds",
            timeout.as_secs()
        )),
    }
}

/// One shared browser; every job gets its own page
pub struct ChromiumProvider {
    wrapper: BrowserWrapper,
    navigation_timeout: Duration,
}

impl ChromiumProvider {
    pub async fn launch(config: &HarvestConfig) -> Result<Self> {
        let wrapper = launch_browser(
            config.headless(),
            config.chrome_data_dir().map(Into::into),
        )
        .await?;
        Ok(Self {
            wrapper,
            navigation_timeout: config.navigation_timeout(),
        })
    }

    /// Close the browser process and remove its temporary profile
    pub async fn shutdown(self) {
        self.wrapper.shutdown().await;
    }
}

impl SessionProvider for ChromiumProvider {
    type Session = ChromiumSession;

    async fn open(&self) -> Result<ChromiumSession> {
        let page = self
            .wrapper
            .browser()
            .new_page("about:blank")
            .await
            .context("Failed to create blank page")?;

        // Must be set before the first real navigation
        match tokio::time::timeout(USER_AGENT_TIMEOUT, apply_user_agent(&page)).await {
            Ok(Ok(())) => debug!("User agent override set"),
            Ok(Err(e)) => warn!("User agent override failed: {e}"),
            Err(_) => warn!("User agent override timed out"),
        }

        Ok(ChromiumSession {
            page: Some(page),
            navigation_timeout: self.navigation_timeout,
        })
    }
}

/// A page owned by one job
///
/// `close` releases it; a session dropped without `close` spawns the close
/// on the current runtime instead.
pub struct ChromiumSession {
    page: Option<Page>,
    navigation_timeout: Duration,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| anyhow!("browser session already closed"))
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let page = self.page()?;
        let start = Instant::now();

        loop {
            if page.find_element(selector).await.is_ok() {
                debug!(
                    "Selector '{selector}' appeared after {:.2}s",
                    start.elapsed().as_secs_f64()
                );
                return Ok(());
            }

            if start.elapsed() >= timeout {
                let url = page.url().await.ok().flatten().unwrap_or_default();
                if url.contains("/sorry/") || url.contains("captcha") {
                    return Err(anyhow!("Presented a CAPTCHA page at {url}"));
                }
                return Err(anyhow!(
                    "Timeout waiting for '{selector}' after {}s on {url}",
                    timeout.as_secs()
                ));
            }

            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }
}

impl PageSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, wait: &WaitPolicy) -> Result<()> {
        let page = self.page()?;

        with_page_timeout(
            async {
                page.goto(url)
                    .await
                    .with_context(|| format!("Failed to navigate to {url}"))?;
                page.wait_for_navigation()
                    .await
                    .context("Failed to wait for page load")?;
                Ok::<(), anyhow::Error>(())
            },
            self.navigation_timeout,
            "Navigation",
        )
        .await?;

        if let WaitPolicy::Selector { selector, timeout } = wait {
            self.wait_for_selector(selector, *timeout).await?;
        }
        Ok(())
    }

    async fn evaluate(&mut self, program: &str) -> Result<Value> {
        let result = self
            .page()?
            .evaluate(program)
            .await
            .context("Script evaluation failed")?;
        // `undefined` results carry no value
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .with_context(|| format!("No element matches '{selector}'"))?;
        element
            .click()
            .await
            .with_context(|| format!("Failed to click '{selector}'"))?;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<u64> {
        let height = self.evaluate(SCROLL_PROGRAM).await?;
        height
            .as_u64()
            .or_else(|| height.as_f64().map(|h| h.max(0.0) as u64))
            .ok_or_else(|| anyhow!("page height is not a number: {height}"))
    }

    async fn close(mut self) -> Result<()> {
        if let Some(page) = self.page.take() {
            page.close().await.context("Failed to close page")?;
        }
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            info!("Browser session dropped without close - closing page in background");
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        warn!("Background page close failed: {e}");
                    }
                });
            }
        }
    }
}
