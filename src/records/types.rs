//! Data structures for extracted records

use serde::{Deserialize, Serialize};

/// A ranked search result pointing at a discussion thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Result ranking (1-indexed, 0 when the page did not report one)
    pub rank: u32,

    /// Result title, also the record's identity key
    pub title: String,

    /// Absolute URL, or the `Invalid URL` placeholder
    pub url: String,
}

/// One answer from a discussion thread
///
/// Persisted as `title,answer`: the author occupies the identity column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    #[serde(rename = "title")]
    pub author: String,

    #[serde(rename = "answer")]
    pub body: String,
}

/// Either kind of validated record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedRecord {
    Search(SearchRecord),
    Answer(AnswerRecord),
}

impl ExtractedRecord {
    /// Identity key used for deduplication
    #[must_use]
    pub fn identity_key(&self) -> &str {
        match self {
            Self::Search(r) => r.identity_key(),
            Self::Answer(r) => r.identity_key(),
        }
    }
}

/// Which record variant a raw value should be validated as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Search,
    Answer,
}

/// A record that can be buffered by a sink and written as one CSV row
pub trait SinkRecord: Serialize + Send + 'static {
    /// Header row, in column order
    const HEADERS: &'static [&'static str];

    /// Column holding the identity key
    const IDENTITY_COLUMN: &'static str = "title";

    /// Identity key compared (trimmed) for deduplication
    fn identity_key(&self) -> &str;
}

impl SinkRecord for SearchRecord {
    const HEADERS: &'static [&'static str] = &["rank", "title", "url"];

    fn identity_key(&self) -> &str {
        &self.title
    }
}

impl SinkRecord for AnswerRecord {
    const HEADERS: &'static [&'static str] = &["title", "answer"];

    fn identity_key(&self) -> &str {
        &self.author
    }
}
