//! Error type for template parsing.

use thiserror::Error;

/// A template could not be parsed.
///
/// Carries the 1-based line on which the offending tag starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    /// Line of the tag that failed to parse.
    pub line: usize,
    /// Human readable description.
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}
