//! Error types for file analysis.

use std::path::PathBuf;

/// Errors surfaced by [`crate::analyze_file`].
///
/// Malformed source never produces an error: the analyzer falls back to a
/// line scanner instead. Only reading the file can fail.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    /// The source file could not be read.
    #[error("failed to read source file {path}: {source}")]
    Io {
        /// The path that was read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
