//! Output file naming for both phases

use convert_case::{Case, Casing};
use std::path::{Path, PathBuf};

use crate::utils::last_path_segment;

/// Maps job targets to the files their sinks write
pub trait FileNaming: Send + Sync {
    /// File holding the search results of one query
    fn discovery_file(&self, output_dir: &Path, query: &str) -> PathBuf;

    /// File holding the answers found at one URL
    fn answer_file(&self, output_dir: &Path, url: &str) -> PathBuf;
}

/// `discovery/<snake_case query>.csv` and `answers/<last path segment>.csv`
#[derive(Debug, Clone, Copy, Default)]
pub struct SlugNaming;

impl SlugNaming {
    fn file_stem(raw: &str, fallback: &str) -> String {
        let stem = sanitize_filename::sanitize(raw);
        let stem = stem.trim_matches(|c: char| c == '.' || c.is_whitespace());
        if stem.is_empty() {
            fallback.to_string()
        } else {
            stem.to_string()
        }
    }
}

impl FileNaming for SlugNaming {
    fn discovery_file(&self, output_dir: &Path, query: &str) -> PathBuf {
        let slug = query.to_case(Case::Snake);
        output_dir
            .join("discovery")
            .join(format!("{}.csv", Self::file_stem(&slug, "query")))
    }

    fn answer_file(&self, output_dir: &Path, url: &str) -> PathBuf {
        let segment = last_path_segment(url).unwrap_or_default();
        output_dir
            .join("answers")
            .join(format!("{}.csv", Self::file_stem(&segment, "index")))
    }
}
