//! Natural-language field extraction.
//!
//! Turns one opaque block of text returned by a text-generation call into
//! prediction fields. Two modes:
//! - `strict`: the prompt asked for literal `LABEL: value` lines.
//! - `loose`: keyword and pattern heuristics over free prose.
//!
//! Both are pure functions of their input. Scoring policy lives in
//! `keywords::KeywordTables` so it can be tuned independently.

pub mod keywords;
pub mod loose;
pub mod strict;

pub use keywords::KeywordTables;
pub use loose::MatchCandidate;
pub use strict::{parse_strict, StrictFields};

/// Why a response could not be turned into a prediction.
///
/// All variants are recoverable: callers substitute a synthetic record
/// (or an unavailability notice in live-only mode).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("Response was empty")]
    EmptyResponse,

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("No match found in response")]
    NoMatches,
}
