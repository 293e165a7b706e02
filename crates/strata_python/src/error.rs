//! Error type shared by the lexer and parser.

use thiserror::Error;

/// A tokenization or syntax error.
///
/// Parsing stops at the first error; callers that need a best-effort result
/// switch to a tolerant line scanner instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (at byte {offset})")]
pub struct ParseError {
    /// Byte offset in the source where the error was detected.
    pub offset: u32,
    /// Human-readable description.
    pub message: String,
}

impl ParseError {
    /// Creates a new error at the given byte offset.
    pub fn new(offset: u32, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}
