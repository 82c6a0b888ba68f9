//! Page-specific extraction for the discovery and answer phases

use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::scripts::{
    SEARCH_RESULT_SELECTOR, SORT_MENU_SELECTOR, answers_program, search_results_program,
    select_sort_option_program,
};
use crate::config::HarvestConfig;
use crate::job::{Extractor, PageSession, WaitPolicy};
use crate::records::RawRecord;
use crate::utils::{DEFAULT_SCROLL_MAX_ROUNDS, DEFAULT_SCROLL_SETTLE_MS, DEFAULT_SORT_OPTION_LABEL};

/// Maximum time to wait for search results to render after navigation
const SEARCH_RESULTS_WAIT: Duration = Duration::from_secs(10);

/// Pause after choosing a sort option so the answer list re-renders
const SORT_SETTLE: Duration = Duration::from_millis(1000);

/// A program result must be a JSON array of records
fn into_records(value: Value) -> Result<Vec<RawRecord>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(anyhow!(
            "extraction program returned {} instead of an array",
            match other {
                Value::Null => "null",
                Value::Bool(_) => "a boolean",
                Value::Number(_) => "a number",
                Value::String(_) => "a string",
                _ => "an object",
            }
        )),
    }
}

/// Reads organic results from a search engine results page
#[derive(Debug, Clone)]
pub struct SearchResultsExtractor {
    program: String,
    wait: WaitPolicy,
}

impl Default for SearchResultsExtractor {
    fn default() -> Self {
        Self {
            program: search_results_program(),
            wait: WaitPolicy::Selector {
                selector: SEARCH_RESULT_SELECTOR.to_string(),
                timeout: SEARCH_RESULTS_WAIT,
            },
        }
    }
}

impl SearchResultsExtractor {
    /// Use a custom program and wait policy, e.g. for another search engine
    #[must_use]
    pub fn new(program: impl Into<String>, wait: WaitPolicy) -> Self {
        Self {
            program: program.into(),
            wait,
        }
    }
}

impl Extractor for SearchResultsExtractor {
    fn wait_policy(&self) -> WaitPolicy {
        self.wait.clone()
    }

    async fn extract<S: PageSession>(&self, session: &mut S) -> Result<Vec<RawRecord>> {
        let value = session
            .evaluate(&self.program)
            .await
            .context("Failed to evaluate search results program")?;
        into_records(value)
    }
}

/// Bounds for the lazy-load scroll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSettings {
    pub max_rounds: u32,
    pub settle: Duration,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_SCROLL_MAX_ROUNDS,
            settle: Duration::from_millis(DEFAULT_SCROLL_SETTLE_MS),
        }
    }
}

/// Scroll until the page height stops growing
///
/// Each round scrolls to the bottom and compares the reported height with the
/// previous round; between rounds the page gets `settle` to load more content.
/// Returns the number of scroll rounds performed.
pub async fn scroll_until_stable<S: PageSession>(
    session: &mut S,
    settings: ScrollSettings,
) -> Result<u32> {
    let mut previous: Option<u64> = None;

    for round in 1..=settings.max_rounds {
        let height = session
            .scroll_to_bottom()
            .await
            .with_context(|| format!("Failed to scroll (round {round})"))?;

        if previous == Some(height) {
            debug!("Page height settled at {height}px after {round} scroll rounds");
            return Ok(round);
        }
        previous = Some(height);
        tokio::time::sleep(settings.settle).await;
    }

    debug!(
        "Stopped scrolling after {} rounds, page still growing",
        settings.max_rounds
    );
    Ok(settings.max_rounds)
}

/// Sorts a question page's answers, loads them all, then reads them
#[derive(Debug, Clone)]
pub struct AnswerExtractor {
    sort_option_label: String,
    scroll: ScrollSettings,
    program: String,
}

impl Default for AnswerExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_SORT_OPTION_LABEL, ScrollSettings::default())
    }
}

impl AnswerExtractor {
    #[must_use]
    pub fn new(sort_option_label: impl Into<String>, scroll: ScrollSettings) -> Self {
        Self {
            sort_option_label: sort_option_label.into(),
            scroll,
            program: answers_program(),
        }
    }

    #[must_use]
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(
            config.sort_option_label(),
            ScrollSettings {
                max_rounds: config.scroll_max_rounds(),
                settle: config.scroll_settle(),
            },
        )
    }

    async fn select_sort_option<S: PageSession>(&self, session: &mut S) -> Result<()> {
        session
            .click(SORT_MENU_SELECTOR)
            .await
            .context("Failed to open the sort menu")?;

        let selected = session
            .evaluate(&select_sort_option_program(&self.sort_option_label))
            .await
            .context("Failed to select sort option")?;

        if selected != Value::Bool(true) {
            bail!("Sort option '{}' not found in menu", self.sort_option_label);
        }

        tokio::time::sleep(SORT_SETTLE).await;
        Ok(())
    }
}

impl Extractor for AnswerExtractor {
    async fn extract<S: PageSession>(&self, session: &mut S) -> Result<Vec<RawRecord>> {
        self.select_sort_option(session).await?;
        let rounds = scroll_until_stable(session, self.scroll).await?;
        debug!("Loaded answers with {rounds} scroll rounds");

        let value = session
            .evaluate(&self.program)
            .await
            .context("Failed to evaluate answers program")?;
        into_records(value)
    }
}
