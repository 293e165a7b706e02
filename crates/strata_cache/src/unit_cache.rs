//! The simple persistent cache: one JSON map of entries plus a compile
//! history capped at `history_cap` records. No entry limit, no background
//! work.

use crate::backend::{CacheBackend, CacheStats};
use crate::config::CacheConfig;
use crate::entry::{hottest, CacheEntry, EntryMeta, HotEntry};
use crate::error::CacheError;
use crate::pattern::{AccessPattern, PatternTable};
use crate::persist::{read_json, write_json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use strata_common::{now_millis, ContentHash};

const ENTRIES_FILE: &str = "incremental_cache.json";
const HISTORY_FILE: &str = "compile_history.json";
const PATTERNS_FILE: &str = "prediction_patterns.json";

/// What a history record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileAction {
    /// An output was stored.
    Compile,
    /// An entry was removed.
    Invalidate,
}

/// One line of the compile history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRecord {
    /// The unit id.
    pub unit_id: String,
    /// Hash of the compiled content. Absent for invalidations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<ContentHash>,
    /// Unix milliseconds.
    pub timestamp: u64,
    /// Compile duration. Zero for invalidations.
    #[serde(default)]
    pub compile_time_ms: u64,
    /// Source file of the unit, when known.
    #[serde(default)]
    pub file_path: String,
    /// What happened.
    pub action: CompileAction,
}

/// A cache that stores every output in `incremental_cache.json` and keeps
/// a bounded history of compiles and invalidations.
#[derive(Debug)]
pub struct UnitCache {
    dir: PathBuf,
    history_cap: usize,
    entries: BTreeMap<String, CacheEntry>,
    history: Vec<CompileRecord>,
    patterns: PatternTable,
    hits: u64,
    misses: u64,
}

impl UnitCache {
    /// Opens the cache in `dir`. Unreadable files are logged and the cache
    /// starts cold.
    pub fn open(dir: impl Into<PathBuf>, config: &CacheConfig) -> Self {
        let dir = dir.into();
        match Self::try_open(dir.clone(), config) {
            Ok(cache) => cache,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "discarding unreadable unit cache");
                Self::empty(dir, config)
            }
        }
    }

    /// Opens the cache in `dir`, surfacing read and parse failures.
    pub fn try_open(dir: impl Into<PathBuf>, config: &CacheConfig) -> Result<Self, CacheError> {
        let dir = dir.into();
        let mut cache = Self::empty(dir, config);
        if let Some(entries) = read_json(&cache.dir, ENTRIES_FILE)? {
            cache.entries = entries;
        }
        if let Some(history) = read_json(&cache.dir, HISTORY_FILE)? {
            cache.history = history;
            cache.trim_history();
        }
        if let Some(patterns) = read_json::<BTreeMap<String, AccessPattern>>(&cache.dir, PATTERNS_FILE)? {
            cache.patterns = PatternTable::from_patterns(patterns);
        }
        tracing::debug!(
            dir = %cache.dir.display(),
            entries = cache.entries.len(),
            history = cache.history.len(),
            "opened unit cache"
        );
        Ok(cache)
    }

    fn empty(dir: PathBuf, config: &CacheConfig) -> Self {
        Self {
            dir,
            history_cap: config.history_cap,
            entries: BTreeMap::new(),
            history: Vec::new(),
            patterns: PatternTable::default(),
            hits: 0,
            misses: 0,
        }
    }

    /// The directory this cache persists to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The stored entry for `key`, without counting an access.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// The last `limit` history records, oldest first.
    pub fn compile_history(&self, limit: usize) -> &[CompileRecord] {
        &self.history[self.history.len().saturating_sub(limit)..]
    }

    /// The `limit` most accessed entries.
    pub fn hot_units(&self, limit: usize) -> Vec<HotEntry> {
        hottest(self.entries.values(), limit)
    }

    fn record(&mut self, rec: CompileRecord) {
        self.history.push(rec);
        self.trim_history();
    }

    /// Drops the oldest records beyond `history_cap`.
    fn trim_history(&mut self) {
        let excess = self.history.len().saturating_sub(self.history_cap);
        if excess > 0 {
            self.history.drain(..excess);
        }
    }
}

impl CacheBackend for UnitCache {
    fn get(&mut self, key: &str, expected: Option<&ContentHash>) -> Option<String> {
        match self.entries.get_mut(key) {
            Some(entry) if expected.map_or(true, |h| entry.matches(h)) => {
                entry.touch();
                self.hits += 1;
                let output = entry.output.clone();
                self.patterns.record(key);
                Some(output)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    fn put(&mut self, key: &str, output: &str, hash: ContentHash, meta: EntryMeta) -> Result<(), CacheError> {
        let entry = CacheEntry::new(key, output, hash, meta);
        self.record(CompileRecord {
            unit_id: key.to_string(),
            content_hash: Some(hash),
            timestamp: entry.created_at,
            compile_time_ms: entry.compile_time_ms,
            file_path: entry.file_path.clone(),
            action: CompileAction::Compile,
        });
        self.entries.insert(key.to_string(), entry);
        self.patterns.record(key);
        Ok(())
    }

    fn invalidate(&mut self, key: &str) -> bool {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };
        self.record(CompileRecord {
            unit_id: key.to_string(),
            content_hash: None,
            timestamp: now_millis(),
            compile_time_ms: 0,
            file_path: entry.file_path,
            action: CompileAction::Invalidate,
        });
        true
    }

    fn invalidate_by_dependency(&mut self, dependency: &str) -> usize {
        let doomed: Vec<String> = self
            .entries
            .values()
            .filter(|e| e.dependencies.iter().any(|d| d == dependency))
            .map(|e| e.key.clone())
            .collect();
        doomed.iter().filter(|key| self.invalidate(key)).count()
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn is_valid(&self, key: &str, hash: &ContentHash) -> bool {
        self.entries.get(key).is_some_and(|e| e.matches(hash))
    }

    fn predicted_next(&self, key: &str, count: usize) -> Vec<String> {
        self.patterns.successors(key, count).to_vec()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            total_size_bytes: self.entries.values().map(|e| e.size_bytes).sum(),
            total_compile_time_ms: self.entries.values().map(|e| e.compile_time_ms).sum(),
            hits: self.hits,
            misses: self.misses,
            evictions: 0,
            warmups: 0,
            access_patterns: self.patterns.len(),
            history_len: self.history.len(),
        }
    }

    fn save(&self) -> Result<(), CacheError> {
        write_json(&self.dir, ENTRIES_FILE, &self.entries)?;
        write_json(&self.dir, HISTORY_FILE, &self.history)?;
        write_json(&self.dir, PATTERNS_FILE, self.patterns.patterns())?;
        tracing::debug!(dir = %self.dir.display(), entries = self.entries.len(), "saved unit cache");
        Ok(())
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.history.clear();
        self.patterns.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn h(s: &str) -> ContentHash {
        ContentHash::from_bytes(s.as_bytes())
    }

    fn open(dir: &Path) -> UnitCache {
        UnitCache::open(dir, &CacheConfig::default())
    }

    #[test]
    fn hash_checked_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = open(dir.path());
        cache.put("k", "OUT", h("H1"), EntryMeta::default()).unwrap();
        assert_eq!(cache.get("k", Some(&h("H1"))).as_deref(), Some("OUT"));
        assert_eq!(cache.get("k", Some(&h("H2"))), None);
        assert!(cache.contains("k"), "a hash mismatch must not remove the entry");
        assert_eq!(cache.get("k", None).as_deref(), Some("OUT"));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (2, 1));
    }

    #[test]
    fn is_valid_compares_hash() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = open(dir.path());
        cache.put("k", "o", h("a"), EntryMeta::default()).unwrap();
        assert!(cache.is_valid("k", &h("a")));
        assert!(!cache.is_valid("k", &h("b")));
        assert!(!cache.is_valid("missing", &h("a")));
    }

    #[test]
    fn history_records_compiles_and_invalidations() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = open(dir.path());
        cache.put("a", "1", h("a"), EntryMeta::default()).unwrap();
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        let actions: Vec<_> = cache.compile_history(10).iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![CompileAction::Compile, CompileAction::Invalidate]);
        assert_eq!(cache.compile_history(1)[0].action, CompileAction::Invalidate);
    }

    #[test]
    fn invalidate_by_dependency_removes_dependents() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = open(dir.path());
        let meta = EntryMeta {
            dependencies: vec!["x".to_string()],
            ..EntryMeta::default()
        };
        cache.put("x", "x", h("x"), EntryMeta::default()).unwrap();
        cache.put("get_x", "g", h("g"), meta.clone()).unwrap();
        cache.put("other", "o", h("o"), EntryMeta::default()).unwrap();
        assert_eq!(cache.invalidate_by_dependency("x"), 1);
        assert!(cache.contains("x"));
        assert!(!cache.contains("get_x"));
        assert!(cache.contains("other"));
    }

    #[test]
    fn predictions_follow_access_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = open(dir.path());
        cache.put("a", "1", h("a"), EntryMeta::default()).unwrap();
        cache.put("b", "2", h("b"), EntryMeta::default()).unwrap();
        cache.get("a", None);
        cache.get("b", None);
        assert_eq!(cache.predicted_next("a", 5), vec!["b".to_string()]);
    }

    #[test]
    fn hot_units_by_access_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = open(dir.path());
        cache.put("cold", "c", h("c"), EntryMeta::default()).unwrap();
        cache.put("hot", "h", h("h"), EntryMeta::default()).unwrap();
        cache.get("hot", None);
        cache.get("hot", None);
        let hot = cache.hot_units(1);
        assert_eq!(hot[0].key, "hot");
        assert_eq!(hot[0].access_count, 3);
    }

    #[test]
    fn save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let meta = EntryMeta {
            file_path: "m.py".to_string(),
            line_range: (1, 2),
            compile_time_ms: 5,
            ..EntryMeta::default()
        };
        {
            let mut cache = open(dir.path());
            cache.put("k", "OUT", h("H1"), meta).unwrap();
            cache.save().unwrap();
        }
        let mut cache = UnitCache::try_open(dir.path(), &CacheConfig::default()).unwrap();
        assert_eq!(cache.entry("k").map(|e| e.line_range), Some((1, 2)));
        assert_eq!(cache.get("k", Some(&h("H1"))).as_deref(), Some("OUT"));
        assert_eq!(cache.compile_history(10).len(), 1);
        assert_eq!(cache.stats().total_compile_time_ms, 5);
    }

    #[test]
    fn history_is_capped_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            history_cap: 2,
            ..CacheConfig::default()
        };
        let mut cache = UnitCache::open(dir.path(), &config);
        for key in ["a", "b", "c"] {
            cache.put(key, key, h(key), EntryMeta::default()).unwrap();
        }
        cache.save().unwrap();
        let reopened = UnitCache::open(dir.path(), &config);
        let ids: Vec<_> = reopened.compile_history(10).iter().map(|r| r.unit_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn history_stays_within_cap_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            history_cap: 3,
            ..CacheConfig::default()
        };
        let mut cache = UnitCache::open(dir.path(), &config);
        for i in 0..10 {
            let key = format!("u{i}");
            cache.put(&key, "o", h(&key), EntryMeta::default()).unwrap();
        }
        assert!(cache.invalidate("u9"));
        assert_eq!(cache.stats().history_len, 3);
        let history = cache.compile_history(usize::MAX);
        let ids: Vec<_> = history.iter().map(|r| r.unit_id.as_str()).collect();
        assert_eq!(ids, vec!["u8", "u9", "u9"]);
        assert_eq!(history[2].action, CompileAction::Invalidate);
    }

    #[test]
    fn corrupt_files_start_cold() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ENTRIES_FILE), "not valid json {{{").unwrap();
        assert!(matches!(
            UnitCache::try_open(dir.path(), &CacheConfig::default()),
            Err(CacheError::Serialization { .. })
        ));
        let cache = open(dir.path());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn clear_resets_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = open(dir.path());
        cache.put("k", "v", h("k"), EntryMeta::default()).unwrap();
        cache.get("k", None);
        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
