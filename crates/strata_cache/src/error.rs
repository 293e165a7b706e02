//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Loading is fail-safe at the public entry points: a cache that cannot be
/// read starts cold instead. This enum surfaces the cases where a caller
/// asked for the typed outcome (`try_open`, `save`, `put`).
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A cache file could not be encoded or decoded as JSON.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// An output is larger than the whole cache may hold.
    #[error("entry '{key}' is {size} bytes, larger than the {limit} byte cache limit")]
    EntryTooLarge {
        /// The rejected key.
        key: String,
        /// Size of the rejected output in bytes.
        size: u64,
        /// The configured size cap in bytes.
        limit: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = CacheError::Io {
            path: PathBuf::from("/tmp/cache/smart_cache.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cache I/O error"));
        assert!(msg.contains("smart_cache.json"));
    }

    #[test]
    fn serialization_error_display() {
        let err = CacheError::Serialization {
            reason: "expected value at line 1 column 1".to_string(),
        };
        assert!(err.to_string().contains("expected value"));
    }

    #[test]
    fn entry_too_large_display() {
        let err = CacheError::EntryTooLarge {
            key: "m.py:1:3:abcd0123".to_string(),
            size: 2048,
            limit: 1024,
        };
        let msg = err.to_string();
        assert!(msg.contains("m.py:1:3:abcd0123"));
        assert!(msg.contains("2048"));
        assert!(msg.contains("1024"));
    }
}
