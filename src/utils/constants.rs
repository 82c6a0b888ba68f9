//! Shared configuration constants for answer_harvest
//!
//! This module contains default values and placeholder values used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Placeholder for a missing or empty search result title
pub const DEFAULT_TITLE: &str = "No title";

/// Placeholder for a URL that is missing or does not parse as an absolute URL
pub const INVALID_URL: &str = "Invalid URL";

/// Placeholder for a missing answer author
pub const DEFAULT_AUTHOR: &str = "No author";

/// Placeholder for a missing answer body
pub const DEFAULT_ANSWER: &str = "No answer";

/// Pending records that trigger an automatic sink flush
pub const DEFAULT_FLUSH_THRESHOLD: usize = 50;

/// Attempts per job before it is reported as exhausted
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fixed wait between attempts
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

/// Deadline for a single navigate + extract attempt
///
/// Answer pages scroll for a while before they are fully loaded, so this is
/// generous compared to the navigation timeout.
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 120;

/// Timeout for `page.goto()` plus the configured wait policy
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 60;

/// Concurrent discovery (search result) jobs
pub const DEFAULT_DISCOVERY_CONCURRENCY: usize = 3;

/// Concurrent answer extraction jobs
pub const DEFAULT_ANSWER_CONCURRENCY: usize = 5;

/// Upper bound on scroll rounds while waiting for lazy-loaded answers
pub const DEFAULT_SCROLL_MAX_ROUNDS: u32 = 30;

/// Pause after each scroll before the page height is measured again
pub const DEFAULT_SCROLL_SETTLE_MS: u64 = 1500;

/// Search engine queried by discovery jobs
pub const DEFAULT_SEARCH_ENGINE_URL: &str = "https://www.google.com/search";

/// Answer ordering chosen from the sort menu
pub const DEFAULT_SORT_OPTION_LABEL: &str = "Recent";

/// Profile pages are never treated as discussion threads
pub const DEFAULT_EXCLUDED_PATTERN: &str = "*/profile/*";

/// Desktop Chrome user agent reported by every page
///
/// Update quarterly to stay within a reasonable version window.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
