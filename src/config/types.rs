//! Core configuration types for a harvest run

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for a two-phase harvest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Root directory for `discovery/` and `answers/` output files
    pub(crate) output_dir: PathBuf,

    /// Registrable domain discovered URLs must belong to, e.g. `quora.com`
    ///
    /// **INVARIANT:** lowercase host without scheme, path or trailing dot.
    pub(crate) target_domain: String,

    /// Concurrency ceiling for phase 1 (one job per query)
    pub(crate) discovery_concurrency: usize,
    /// Concurrency ceiling for phase 2 (one job per discovered URL)
    pub(crate) answer_concurrency: usize,

    pub(crate) max_attempts: u32,
    pub(crate) retry_delay_ms: u64,
    /// Upper bound of random extra delay added to `retry_delay_ms`; 0 keeps it fixed
    pub(crate) retry_jitter_ms: u64,

    /// Deadline for one navigate + extract attempt; `None` disables it
    pub(crate) attempt_timeout_secs: Option<u64>,

    /// Timeout for a single `page.goto()` inside an attempt
    pub(crate) navigation_timeout_secs: u64,

    pub(crate) flush_threshold: usize,

    /// Glob patterns (`*` wildcard) a discovered URL must not match
    pub(crate) excluded_patterns: Vec<String>,

    /// Compiled from `excluded_patterns` once at build time
    #[serde(skip)]
    pub(crate) excluded_patterns_compiled: Vec<regex::Regex>,

    pub(crate) search_engine_url: String,
    pub(crate) headless: bool,

    /// Lazy-load scrolling on answer pages
    pub(crate) scroll_max_rounds: u32,
    pub(crate) scroll_settle_ms: u64,

    /// Label of the sort option selected before extracting answers
    pub(crate) sort_option_label: String,

    /// Preload identity keys from files left by an earlier run
    pub(crate) resume_from_existing: bool,

    /// Drop URLs already collected from an earlier discovery file
    pub(crate) dedup_discovered_urls: bool,

    pub(crate) proxy: Option<ProxySettings>,

    /// Chrome profile directory; a temporary one is used when unset
    pub(crate) chrome_data_dir: Option<PathBuf>,
}

/// Connection details for the proxying/rendering service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxySettings {
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub country: Option<String>,
    pub render_wait_ms: Option<u64>,
}

impl ProxySettings {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            country: None,
            render_wait_ms: None,
        }
    }
}
