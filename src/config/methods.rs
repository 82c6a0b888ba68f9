//! Builder methods available for all states
//!
//! This module contains the optional settings that can be applied to the
//! builder regardless of its current type state.

use std::path::PathBuf;

use super::builder::HarvestConfigBuilder;
use super::types::ProxySettings;

impl<State> HarvestConfigBuilder<State> {
    /// Concurrency ceiling for the discovery phase (default 3)
    #[must_use]
    pub fn discovery_concurrency(mut self, limit: usize) -> Self {
        self.discovery_concurrency = limit;
        self
    }

    /// Concurrency ceiling for the answer phase (default 5)
    #[must_use]
    pub fn answer_concurrency(mut self, limit: usize) -> Self {
        self.answer_concurrency = limit;
        self
    }

    /// Maximum navigate + extract attempts per job, including the first (default 3)
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Fixed pause between attempts of the same job (default 2000 ms)
    #[must_use]
    pub fn retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_delay_ms = delay_ms;
        self
    }

    /// Random extra delay in `0..=jitter_ms` added to each retry pause
    ///
    /// Spreads out retries of jobs that failed together, e.g. after the
    /// search engine started rate limiting.
    #[must_use]
    pub fn retry_jitter_ms(mut self, jitter_ms: u64) -> Self {
        self.retry_jitter_ms = jitter_ms;
        self
    }

    /// Deadline for a single attempt; `None` lets an attempt run indefinitely
    ///
    /// An attempt that exceeds the deadline is abandoned and counted as a failed
    /// attempt, so a hung page cannot hold a concurrency slot forever.
    #[must_use]
    pub fn attempt_timeout_secs(mut self, timeout_secs: Option<u64>) -> Self {
        self.attempt_timeout_secs = timeout_secs;
        self
    }

    #[must_use]
    pub fn navigation_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.navigation_timeout_secs = timeout_secs;
        self
    }

    /// Pending records that trigger an automatic flush (default 50)
    #[must_use]
    pub fn flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold;
        self
    }

    /// Replace the excluded URL globs (default `*/profile/*`)
    #[must_use]
    pub fn excluded_patterns(mut self, patterns: Vec<String>) -> Self {
        self.excluded_patterns = patterns;
        self
    }

    #[must_use]
    pub fn search_engine_url(mut self, url: impl Into<String>) -> Self {
        self.search_engine_url = url.into();
        self
    }

    /// Set browser headless mode (default true)
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Bound the lazy-load scroll loop on answer pages
    ///
    /// Scrolling stops once the page height is unchanged after `settle_ms`, or
    /// after `max_rounds` scrolls.
    #[must_use]
    pub fn scroll(mut self, max_rounds: u32, settle_ms: u64) -> Self {
        self.scroll_max_rounds = max_rounds;
        self.scroll_settle_ms = settle_ms;
        self
    }

    #[must_use]
    pub fn sort_option_label(mut self, label: impl Into<String>) -> Self {
        self.sort_option_label = label.into();
        self
    }

    /// Skip records whose identity key is already in the output file
    #[must_use]
    pub fn resume_from_existing(mut self, resume: bool) -> Self {
        self.resume_from_existing = resume;
        self
    }

    /// Collect each discovered URL once even when several queries found it
    #[must_use]
    pub fn dedup_discovered_urls(mut self, dedup: bool) -> Self {
        self.dedup_discovered_urls = dedup;
        self
    }

    #[must_use]
    pub fn proxy(mut self, proxy: Option<ProxySettings>) -> Self {
        self.proxy = proxy;
        self
    }

    #[must_use]
    pub fn chrome_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.chrome_data_dir = dir;
        self
    }
}
