pub mod fields;
pub mod lines;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The body cannot be segmented at all. Every other irregularity
    /// degrades to defaults instead of failing.
    #[error("comment body is empty or cannot be segmented")]
    MalformedInput,
}

/// Fields extracted from one comment body. All optional; the caller applies
/// fallbacks (timestamp date, author identity).
#[derive(Debug, Default, Clone, Serialize)]
pub struct ParsedFields {
    pub date: Option<NaiveDate>,
    pub workers: Vec<String>,
    pub tasks: Vec<String>,
}

/// Two-pass parse: body → classified lines → assembled fields.
pub fn parse_body(body: &str) -> Result<ParsedFields, ParseError> {
    if body.trim().is_empty() {
        return Err(ParseError::MalformedInput);
    }
    let lines = lines::classify_lines(body);
    Ok(fields::assemble(&lines))
}

// ── Tests ──
