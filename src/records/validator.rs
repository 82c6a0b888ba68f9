//! Normalization of raw extracted values into records
//!
//! Validation never fails. A missing, empty or mistyped field is replaced by
//! its placeholder so the sink always receives a well-typed record.

use serde_json::Value;
use tracing::trace;
use url::Url;

use super::types::{AnswerRecord, ExtractedRecord, RecordKind, SearchRecord};
use crate::utils::{DEFAULT_ANSWER, DEFAULT_AUTHOR, DEFAULT_TITLE, INVALID_URL};

/// Build a record from a raw extraction value
pub trait FromRaw: Sized {
    fn from_raw(raw: &Value) -> Self;
}

impl FromRaw for SearchRecord {
    fn from_raw(raw: &Value) -> Self {
        validate_search(raw)
    }
}

impl FromRaw for AnswerRecord {
    fn from_raw(raw: &Value) -> Self {
        validate_answer(raw)
    }
}

/// Validate a raw value as the given record kind
#[must_use]
pub fn validate(kind: RecordKind, raw: &Value) -> ExtractedRecord {
    match kind {
        RecordKind::Search => ExtractedRecord::Search(validate_search(raw)),
        RecordKind::Answer => ExtractedRecord::Answer(validate_answer(raw)),
    }
}

#[must_use]
pub fn validate_search(raw: &Value) -> SearchRecord {
    SearchRecord {
        rank: rank_field(raw.get("rank")),
        title: string_field(raw, &["title"], DEFAULT_TITLE),
        url: url_field(raw.get("url")),
    }
}

/// `author`/`body` are the canonical keys; `title`/`answer` mirror the CSV columns
#[must_use]
pub fn validate_answer(raw: &Value) -> AnswerRecord {
    AnswerRecord {
        author: string_field(raw, &["author", "title"], DEFAULT_AUTHOR),
        body: string_field(raw, &["body", "answer"], DEFAULT_ANSWER),
    }
}

fn string_field(raw: &Value, keys: &[&str], default: &str) -> String {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map_or_else(
            || {
                trace!("Substituting placeholder '{default}' for fields {keys:?}");
                default.to_string()
            },
            str::to_string,
        )
}

fn url_field(value: Option<&Value>) -> String {
    let Some(candidate) = value.and_then(Value::as_str).map(str::trim) else {
        return INVALID_URL.to_string();
    };

    // Syntactic check only; `Url::parse` rejects relative references
    match Url::parse(candidate) {
        Ok(parsed) if parsed.has_host() => candidate.to_string(),
        _ => INVALID_URL.to_string(),
    }
}

fn rank_field(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                u32::try_from(v).unwrap_or(u32::MAX)
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map_or(0, |f| f.min(f64::from(u32::MAX)) as u32)
            }
        }
        Some(Value::String(s)) => s.trim().parse::<u32>().unwrap_or(0),
        _ => 0,
    }
}
