//! JSON file helpers shared by the cache implementations.

use crate::error::CacheError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Reads `dir/name` as JSON. A missing file is `Ok(None)`; an unreadable or
/// malformed one is an error.
pub(crate) fn read_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Option<T>, CacheError> {
    let path = dir.join(name);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::Io { path, source: e }),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| CacheError::Serialization {
            reason: format!("{}: {e}", path.display()),
        })
}

/// Writes `value` to `dir/name` as pretty-printed JSON, creating the
/// directory if it doesn't exist.
pub(crate) fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<(), CacheError> {
    std::fs::create_dir_all(dir).map_err(|e| CacheError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(value).map_err(|e| CacheError::Serialization {
        reason: e.to_string(),
    })?;
    std::fs::write(&path, json).map_err(|e| CacheError::Io { path, source: e })
}
