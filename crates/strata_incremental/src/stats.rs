//! Engine-wide counters.

use serde::Serialize;
use std::fmt;
use strata_cache::CacheStats;

/// Snapshot of the orchestrator's registry plus its cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineStats {
    /// Units registered across all files.
    pub total_units: usize,
    /// Units waiting to be compiled.
    pub pending_units: usize,
    /// Files with a registered generation.
    pub files: usize,
    /// Backend invocations since the engine was created.
    pub compiles: u64,
    /// Compile requests answered without invoking the backend.
    pub reused: u64,
    /// The cache's own counters.
    pub cache: CacheStats,
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} units in {} files, {} pending; {} compiled, {} reused; cache {} entries, {:.1}% hit rate",
            self.total_units,
            self.files,
            self.pending_units,
            self.compiles,
            self.reused,
            self.cache.entries,
            self.cache.hit_rate() * 100.0
        )
    }
}
