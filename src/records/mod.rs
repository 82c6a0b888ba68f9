//! Extracted record types and their validation
//!
//! Raw records arrive as JSON values from page extraction programs. The
//! validator turns every one of them into a well-formed record, substituting
//! placeholders instead of failing.

mod types;
mod validator;

pub use types::{AnswerRecord, ExtractedRecord, RecordKind, SearchRecord, SinkRecord};
pub use validator::{FromRaw, validate, validate_answer, validate_search};

/// Raw record as produced by an extraction program
pub type RawRecord = serde_json::Value;
