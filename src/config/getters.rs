//! Getter methods and derived settings for `HarvestConfig`

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::{HarvestConfig, ProxySettings};
use crate::error::HarvestResult;
use crate::job::RetryPolicy;
use crate::proxy::{DirectRewriter, ProxyRewriter, UrlRewriter};

impl HarvestConfig {
    #[must_use]
    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    #[must_use]
    pub fn target_domain(&self) -> &str {
        &self.target_domain
    }

    #[must_use]
    pub fn discovery_concurrency(&self) -> usize {
        self.discovery_concurrency
    }

    #[must_use]
    pub fn answer_concurrency(&self) -> usize {
        self.answer_concurrency
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    #[must_use]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    #[must_use]
    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }

    #[must_use]
    pub fn excluded_patterns(&self) -> &[String] {
        &self.excluded_patterns
    }

    #[must_use]
    pub fn excluded_patterns_compiled(&self) -> &[regex::Regex] {
        &self.excluded_patterns_compiled
    }

    #[must_use]
    pub fn search_engine_url(&self) -> &str {
        &self.search_engine_url
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn scroll_max_rounds(&self) -> u32 {
        self.scroll_max_rounds
    }

    #[must_use]
    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    #[must_use]
    pub fn sort_option_label(&self) -> &str {
        &self.sort_option_label
    }

    #[must_use]
    pub fn resume_from_existing(&self) -> bool {
        self.resume_from_existing
    }

    #[must_use]
    pub fn dedup_discovered_urls(&self) -> bool {
        self.dedup_discovered_urls
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&ProxySettings> {
        self.proxy.as_ref()
    }

    #[must_use]
    pub fn chrome_data_dir(&self) -> Option<&Path> {
        self.chrome_data_dir.as_deref()
    }

    /// Retry policy shared by every job of the run
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_delay())
            .with_jitter(Duration::from_millis(self.retry_jitter_ms))
            .with_attempt_timeout(self.attempt_timeout())
    }

    /// Rewriter for the configured proxy, or direct navigation without one
    pub fn url_rewriter(&self) -> HarvestResult<Box<dyn UrlRewriter>> {
        let Some(proxy) = &self.proxy else {
            return Ok(Box::new(DirectRewriter));
        };

        let mut rewriter = ProxyRewriter::new(&proxy.endpoint, proxy.api_key.clone())?;
        if let Some(country) = &proxy.country {
            rewriter = rewriter.with_country(country.clone());
        }
        if let Some(wait) = proxy.render_wait_ms {
            rewriter = rewriter.with_render_wait_ms(wait);
        }
        Ok(Box::new(rewriter))
    }
}
