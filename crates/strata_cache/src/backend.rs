//! The contract shared by every cache implementation.

use crate::entry::EntryMeta;
use crate::error::CacheError;
use serde::Serialize;
use strata_common::ContentHash;

/// Error type produced by an injected compiler.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Storage for compiler outputs keyed by unit id.
///
/// A read that supplies an expected hash only hits when the stored entry was
/// compiled from content with that hash. A hash mismatch is a miss; it never
/// removes the entry.
pub trait CacheBackend {
    /// Returns the cached output for `key`, counting a hit or a miss.
    fn get(&mut self, key: &str, expected: Option<&ContentHash>) -> Option<String>;

    /// Stores `output` for `key`, replacing any previous entry.
    fn put(&mut self, key: &str, output: &str, hash: ContentHash, meta: EntryMeta) -> Result<(), CacheError>;

    /// Removes `key`. Returns whether an entry was removed.
    fn invalidate(&mut self, key: &str) -> bool;

    /// Removes every entry that lists `dependency` among its dependencies.
    /// Returns the number removed.
    fn invalidate_by_dependency(&mut self, dependency: &str) -> usize;

    /// Whether an entry exists for `key`, regardless of its hash.
    fn contains(&self, key: &str) -> bool;

    /// Whether the entry for `key` was compiled from content with `hash`.
    fn is_valid(&self, key: &str, hash: &ContentHash) -> bool;

    /// Up to `count` keys that have historically been accessed after `key`.
    fn predicted_next(&self, key: &str, count: usize) -> Vec<String>;

    /// Registers the source of a unit that may be compiled in the
    /// background. Caches without a warmup worker ignore this.
    fn remember_source(&mut self, _key: &str, _content: &str, _hash: ContentHash) {}

    /// Counters and sizes.
    fn stats(&self) -> CacheStats;

    /// Writes the cache to its directory.
    fn save(&self) -> Result<(), CacheError>;

    /// Drops every entry, pattern and counter.
    fn clear(&mut self);
}

/// A compiler usable by the warmup worker: unit source in, output out.
pub trait SourceCompiler: Send + Sync {
    /// Compiles one unit's source text.
    fn compile_source(&self, content: &str) -> Result<String, BackendError>;
}

impl<F> SourceCompiler for F
where
    F: Fn(&str) -> Result<String, BackendError> + Send + Sync,
{
    fn compile_source(&self, content: &str) -> Result<String, BackendError> {
        self(content)
    }
}

/// Snapshot of a cache's counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Resident entries.
    pub entries: usize,
    /// Total size of resident outputs in bytes.
    pub total_size_bytes: u64,
    /// Sum of the recorded compile times of resident entries.
    pub total_compile_time_ms: u64,
    /// Reads that returned an output.
    pub hits: u64,
    /// Reads that returned nothing.
    pub misses: u64,
    /// Entries removed to stay under the caps.
    pub evictions: u64,
    /// Entries produced by the warmup worker.
    pub warmups: u64,
    /// Keys with a recorded access pattern.
    pub access_patterns: usize,
    /// Compile and invalidate records held in memory.
    pub history_len: usize,
}

impl CacheStats {
    /// Fraction of reads that hit, or 0 when nothing was read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
