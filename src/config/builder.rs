//! Type-safe builder for `HarvestConfig` using the typestate pattern
//!
//! `output_dir` and `target_domain` must be set, in that order, before
//! `build()` becomes available.

use regex::Regex;
use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::{HarvestConfig, ProxySettings};
use crate::error::{HarvestError, HarvestResult};
use crate::utils::{
    DEFAULT_ANSWER_CONCURRENCY, DEFAULT_ATTEMPT_TIMEOUT_SECS, DEFAULT_DISCOVERY_CONCURRENCY,
    DEFAULT_EXCLUDED_PATTERN, DEFAULT_FLUSH_THRESHOLD, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_NAVIGATION_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_MS, DEFAULT_SCROLL_MAX_ROUNDS,
    DEFAULT_SCROLL_SETTLE_MS, DEFAULT_SEARCH_ENGINE_URL, DEFAULT_SORT_OPTION_LABEL,
};

/// Compile a glob pattern into an anchored regex
///
/// `*` matches any sequence; every other character matches itself.
pub(crate) fn compile_glob_pattern(pattern: &str) -> HarvestResult<Regex> {
    let regex_pattern = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    Regex::new(&format!("^{regex_pattern}$"))
        .map_err(|e| HarvestError::Config(format!("Invalid glob pattern '{pattern}': {e}")))
}

/// Lowercase host from a bare domain or a full URL
fn normalize_domain(domain: &str) -> String {
    let trimmed = domain.trim();
    let host = if trimmed.contains("://") {
        url::Url::parse(trimmed)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    } else {
        trimmed.split('/').next().unwrap_or_default().to_string()
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}

// Type states for the builder
pub struct WithOutputDir;
pub struct WithTargetDomain;

pub struct HarvestConfigBuilder<State = ()> {
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) target_domain: Option<String>,
    pub(crate) discovery_concurrency: usize,
    pub(crate) answer_concurrency: usize,
    pub(crate) max_attempts: u32,
    pub(crate) retry_delay_ms: u64,
    pub(crate) retry_jitter_ms: u64,
    pub(crate) attempt_timeout_secs: Option<u64>,
    pub(crate) navigation_timeout_secs: u64,
    pub(crate) flush_threshold: usize,
    pub(crate) excluded_patterns: Vec<String>,
    pub(crate) search_engine_url: String,
    pub(crate) headless: bool,
    pub(crate) scroll_max_rounds: u32,
    pub(crate) scroll_settle_ms: u64,
    pub(crate) sort_option_label: String,
    pub(crate) resume_from_existing: bool,
    pub(crate) dedup_discovered_urls: bool,
    pub(crate) proxy: Option<ProxySettings>,
    pub(crate) chrome_data_dir: Option<PathBuf>,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for HarvestConfigBuilder<()> {
    fn default() -> Self {
        Self {
            output_dir: None,
            target_domain: None,
            discovery_concurrency: DEFAULT_DISCOVERY_CONCURRENCY,
            answer_concurrency: DEFAULT_ANSWER_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            retry_jitter_ms: 0,
            attempt_timeout_secs: Some(DEFAULT_ATTEMPT_TIMEOUT_SECS),
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            excluded_patterns: vec![DEFAULT_EXCLUDED_PATTERN.to_string()],
            search_engine_url: DEFAULT_SEARCH_ENGINE_URL.to_string(),
            headless: true,
            scroll_max_rounds: DEFAULT_SCROLL_MAX_ROUNDS,
            scroll_settle_ms: DEFAULT_SCROLL_SETTLE_MS,
            sort_option_label: DEFAULT_SORT_OPTION_LABEL.to_string(),
            resume_from_existing: false,
            dedup_discovered_urls: false,
            proxy: None,
            chrome_data_dir: None,
            _phantom: PhantomData,
        }
    }
}

impl HarvestConfig {
    /// Create a builder for configuring a `HarvestConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> HarvestConfigBuilder<()> {
        HarvestConfigBuilder::default()
    }
}

impl<State> HarvestConfigBuilder<State> {
    fn into_state<Next>(self) -> HarvestConfigBuilder<Next> {
        HarvestConfigBuilder {
            output_dir: self.output_dir,
            target_domain: self.target_domain,
            discovery_concurrency: self.discovery_concurrency,
            answer_concurrency: self.answer_concurrency,
            max_attempts: self.max_attempts,
            retry_delay_ms: self.retry_delay_ms,
            retry_jitter_ms: self.retry_jitter_ms,
            attempt_timeout_secs: self.attempt_timeout_secs,
            navigation_timeout_secs: self.navigation_timeout_secs,
            flush_threshold: self.flush_threshold,
            excluded_patterns: self.excluded_patterns,
            search_engine_url: self.search_engine_url,
            headless: self.headless,
            scroll_max_rounds: self.scroll_max_rounds,
            scroll_settle_ms: self.scroll_settle_ms,
            sort_option_label: self.sort_option_label,
            resume_from_existing: self.resume_from_existing,
            dedup_discovered_urls: self.dedup_discovered_urls,
            proxy: self.proxy,
            chrome_data_dir: self.chrome_data_dir,
            _phantom: PhantomData,
        }
    }
}

impl HarvestConfigBuilder<()> {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> HarvestConfigBuilder<WithOutputDir> {
        self.output_dir = Some(dir.into());
        self.into_state()
    }
}

impl HarvestConfigBuilder<WithOutputDir> {
    /// Accepts a bare domain (`quora.com`) or a URL on it (`https://www.quora.com/`)
    pub fn target_domain(
        mut self,
        domain: impl AsRef<str>,
    ) -> HarvestConfigBuilder<WithTargetDomain> {
        self.target_domain = Some(normalize_domain(domain.as_ref()));
        self.into_state()
    }
}

// Build method only available when all required fields are set
impl HarvestConfigBuilder<WithTargetDomain> {
    pub fn build(self) -> HarvestResult<HarvestConfig> {
        let output_dir = self
            .output_dir
            .ok_or_else(|| HarvestError::Config("output_dir is required".to_string()))?;
        let target_domain = self
            .target_domain
            .filter(|d| !d.is_empty())
            .ok_or_else(|| HarvestError::Config("target_domain must not be empty".to_string()))?;

        if self.discovery_concurrency == 0 || self.answer_concurrency == 0 {
            return Err(HarvestError::Config(
                "concurrency limits must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(HarvestError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.flush_threshold == 0 {
            return Err(HarvestError::Config(
                "flush_threshold must be at least 1".to_string(),
            ));
        }
        if self.attempt_timeout_secs == Some(0) {
            return Err(HarvestError::Config(
                "attempt_timeout_secs must be positive when set".to_string(),
            ));
        }

        url::Url::parse(&self.search_engine_url).map_err(|e| {
            HarvestError::Config(format!(
                "invalid search engine URL '{}': {e}",
                self.search_engine_url
            ))
        })?;

        if let Some(proxy) = &self.proxy {
            // Surfaces endpoint/key problems here rather than in the first job
            crate::proxy::ProxyRewriter::new(&proxy.endpoint, proxy.api_key.clone())?;
        }

        // Compile excluded patterns once at config creation
        let excluded_patterns_compiled = self
            .excluded_patterns
            .iter()
            .map(|p| compile_glob_pattern(p))
            .collect::<HarvestResult<Vec<_>>>()?;

        Ok(HarvestConfig {
            output_dir,
            target_domain,
            discovery_concurrency: self.discovery_concurrency,
            answer_concurrency: self.answer_concurrency,
            max_attempts: self.max_attempts,
            retry_delay_ms: self.retry_delay_ms,
            retry_jitter_ms: self.retry_jitter_ms,
            attempt_timeout_secs: self.attempt_timeout_secs,
            navigation_timeout_secs: self.navigation_timeout_secs,
            flush_threshold: self.flush_threshold,
            excluded_patterns: self.excluded_patterns,
            excluded_patterns_compiled,
            search_engine_url: self.search_engine_url,
            headless: self.headless,
            scroll_max_rounds: self.scroll_max_rounds,
            scroll_settle_ms: self.scroll_settle_ms,
            sort_option_label: self.sort_option_label,
            resume_from_existing: self.resume_from_existing,
            dedup_discovered_urls: self.dedup_discovered_urls,
            proxy: self.proxy,
            chrome_data_dir: self.chrome_data_dir,
        })
    }
}
