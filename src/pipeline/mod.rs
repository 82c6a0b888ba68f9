//! Discovery → answer pipeline
//!
//! [`Harvester`] composes two scheduler phases over one [`crate::job::SessionProvider`].
//! The page-specific parts (extraction programs, result filter, file naming)
//! live in the sibling modules and can be swapped independently.

pub mod extractors;
pub mod filter;
pub mod naming;
pub mod orchestrator;
pub mod scripts;

pub use extractors::{AnswerExtractor, ScrollSettings, SearchResultsExtractor, scroll_until_stable};
pub use filter::DomainFilter;
pub use naming::{FileNaming, SlugNaming};
pub use orchestrator::{Harvester, PhaseReport, PipelineReport};
