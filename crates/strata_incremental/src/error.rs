//! Error types for the orchestrator and its configuration.

use strata_analyzer::AnalyzeError;
use strata_cache::{BackendError, CacheError};
use strata_common::UnitId;

/// Errors returned by [`crate::IncrementalCompiler`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No unit with this id is registered.
    #[error("unknown unit '{id}'")]
    UnknownUnit {
        /// The requested id.
        id: UnitId,
    },

    /// The injected compiler failed. The unit stays invalid, so compiling
    /// it again retries.
    #[error("failed to compile unit '{id}': {source}")]
    Backend {
        /// The unit being compiled.
        id: UnitId,
        /// The compiler's error, unchanged.
        source: BackendError,
    },

    /// The persistent cache could not be saved.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A source file could not be read.
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),
}

/// Errors that can occur when loading or validating a `strata.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn unknown_unit_display() {
        let err = EngineError::UnknownUnit {
            id: UnitId::from("m.py:1:1:deadbeef"),
        };
        assert_eq!(err.to_string(), "unknown unit 'm.py:1:1:deadbeef'");
    }

    #[test]
    fn backend_error_keeps_source() {
        let err = EngineError::Backend {
            id: UnitId::from("m.py:2:3:00000000"),
            source: "native toolchain missing".into(),
        };
        assert!(err.to_string().contains("native toolchain missing"));
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("native toolchain missing"));
    }

    #[test]
    fn cache_error_is_transparent() {
        let err = EngineError::from(CacheError::Serialization {
            reason: "bad json".to_string(),
        });
        assert_eq!(err.to_string(), "serialization error: bad json");
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(
            format!("{err}"),
            "failed to parse configuration: expected '=' at line 3"
        );
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("cache.max_entries must be greater than zero".to_string());
        assert_eq!(
            format!("{err}"),
            "validation error: cache.max_entries must be greater than zero"
        );
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(format!("{err}").starts_with("failed to read configuration:"));
    }
}
