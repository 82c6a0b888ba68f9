//! Which discovered search results are kept

use regex::Regex;

use crate::config::HarvestConfig;
use crate::records::SearchRecord;
use crate::utils::{INVALID_URL, host_matches_domain};

/// Keeps results on the target domain that match none of the excluded globs
#[derive(Debug, Clone)]
pub struct DomainFilter {
    domain: String,
    excluded: Vec<Regex>,
}

impl DomainFilter {
    #[must_use]
    pub fn new(domain: impl Into<String>, excluded: Vec<Regex>) -> Self {
        Self {
            domain: domain.into(),
            excluded,
        }
    }

    #[must_use]
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(
            config.target_domain(),
            config.excluded_patterns_compiled().to_vec(),
        )
    }

    #[must_use]
    pub fn allows_url(&self, url: &str) -> bool {
        if url == INVALID_URL || !host_matches_domain(url, &self.domain) {
            return false;
        }
        // Patterns are compiled once at config creation
        !self.excluded.iter().any(|pattern| pattern.is_match(url))
    }

    #[must_use]
    pub fn allows(&self, record: &SearchRecord) -> bool {
        self.allows_url(&record.url)
    }
}
