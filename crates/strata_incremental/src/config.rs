//! Engine configuration and `strata.toml` loading.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strata_cache::CacheConfig;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE: &str = "strata.toml";

/// Settings for an [`crate::IncrementalCompiler`].
///
/// All fields are optional in `strata.toml`:
///
/// ```toml
/// cache_dir = ".strata_cache"
/// separator = "\n"
/// predictive_fanout = 2
///
/// [cache]
/// max_entries = 10000
/// max_size_mb = 500
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the persistent cache files.
    pub cache_dir: PathBuf,
    /// Text placed between unit outputs in a file's combined output.
    pub separator: String,
    /// How many predicted successors a cache hit may add to the pending set.
    pub predictive_fanout: usize,
    /// Cache limits and timings.
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".strata_cache"),
            separator: "\n".to_string(),
            predictive_fanout: 2,
            cache: CacheConfig::default(),
        }
    }
}

/// Loads and validates `<project_dir>/strata.toml`.
pub fn load_config(project_dir: &Path) -> Result<EngineConfig, ConfigError> {
    let content = std::fs::read_to_string(project_dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Parses and validates a `strata.toml` from a string.
pub fn load_config_from_str(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.cache_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError("cache_dir must not be empty".to_string()));
    }
    if let Some(name) = config.cache.zero_limit() {
        return Err(ConfigError::ValidationError(format!("{name} must be greater than zero")));
    }
    Ok(())
}
