//! The predictive cache.
//!
//! Entries live in an insertion-ordered store capped by count and total
//! size. Eviction removes the entry with the lowest
//! `access_count * 0.3 - seconds_since_access * 0.001` score, the oldest
//! first on ties. Every access is linked to the previous one, and a hit
//! announces the keys that historically followed it. Announced keys whose
//! source was registered with [`CacheBackend::remember_source`] are
//! compiled by a background worker before they are asked for.

use crate::backend::{CacheBackend, CacheStats, SourceCompiler};
use crate::config::CacheConfig;
use crate::entry::{hottest, CacheEntry, EntryMeta, HotEntry};
use crate::error::CacheError;
use crate::event::{CacheEvent, CacheEventKind, EventLog};
use crate::pattern::{AccessPattern, PatternTable};
use crate::persist::{read_json, write_json};
use crate::warmup::{WarmupJob, WarmupWorker};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use strata_common::{now_millis, ContentHash};

const ENTRIES_FILE: &str = "smart_cache.json";
const PATTERNS_FILE: &str = "access_patterns.json";
const EVENTS_FILE: &str = "cache_events.json";

/// Format version written to `smart_cache.json`. Files with another
/// version are ignored on load.
pub const SMART_CACHE_VERSION: &str = "1";

#[derive(Serialize, Deserialize)]
struct EntriesFile<E> {
    version: String,
    entries: Vec<E>,
}

// ============================================================================
// Shared state
// ============================================================================

struct State {
    store: IndexMap<String, CacheEntry>,
    total_size: u64,
    max_entries: usize,
    max_size_bytes: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    warmups: u64,
    events: EventLog,
    patterns: PatternTable,
    sources: IndexMap<String, (String, ContentHash)>,
}

impl State {
    fn new(config: &CacheConfig) -> Self {
        Self {
            store: IndexMap::new(),
            total_size: 0,
            max_entries: config.max_entries,
            max_size_bytes: config.max_size_bytes(),
            hits: 0,
            misses: 0,
            evictions: 0,
            warmups: 0,
            events: EventLog::new(config.max_events),
            patterns: PatternTable::default(),
            sources: IndexMap::new(),
        }
    }

    fn insert(&mut self, key: &str, output: &str, hash: ContentHash, meta: EntryMeta) -> Result<(), CacheError> {
        let size = output.len() as u64;
        if size > self.max_size_bytes {
            return Err(CacheError::EntryTooLarge {
                key: key.to_string(),
                size,
                limit: self.max_size_bytes,
            });
        }
        self.remove(key);
        while !self.store.is_empty()
            && (self.store.len() >= self.max_entries || self.total_size + size > self.max_size_bytes)
        {
            if self.evict_one().is_none() {
                break;
            }
        }

        let detail = format!("size={size}, compile_time={}ms", meta.compile_time_ms);
        self.store.insert(key.to_string(), CacheEntry::new(key, output, hash, meta));
        self.total_size += size;
        self.events.record(CacheEventKind::Write, key, detail);
        self.patterns.record(key);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.store.shift_remove(key)?;
        self.total_size -= entry.size_bytes;
        Some(entry)
    }

    fn evict_one(&mut self) -> Option<String> {
        let now = now_millis();
        let mut victim: Option<(usize, f64)> = None;
        for (index, entry) in self.store.values().enumerate() {
            let recency_s = now.saturating_sub(entry.last_access) as f64 / 1000.0;
            let score = entry.access_count as f64 * 0.3 - recency_s * 0.001;
            if victim.map_or(true, |(_, best)| score < best) {
                victim = Some((index, score));
            }
        }
        let (index, score) = victim?;
        let (key, entry) = self.store.shift_remove_index(index)?;
        self.total_size -= entry.size_bytes;
        self.evictions += 1;
        self.events.record(CacheEventKind::Evict, &key, format!("evicted, score={score:.3}"));
        tracing::trace!(key = %key, score, "evicted cache entry");
        Some(key)
    }

    /// Handles the prediction side of a hit on `key`: logs a `Predict`
    /// event for each uncached successor and returns the warmup jobs for
    /// those whose source is known.
    fn predict(&mut self, key: &str, fanout: usize) -> Vec<WarmupJob> {
        let predicted: Vec<String> = self
            .patterns
            .successors(key, fanout)
            .iter()
            .filter(|next| !self.store.contains_key(next.as_str()))
            .cloned()
            .collect();
        let mut jobs = Vec::new();
        for next in predicted {
            self.events.record(CacheEventKind::Predict, &next, format!("predicted from {key}"));
            if let Some((content, hash)) = self.sources.get(&next) {
                jobs.push(WarmupJob {
                    key: next.clone(),
                    content: content.clone(),
                    hash: *hash,
                });
            }
        }
        jobs
    }
}

struct Shared {
    state: Mutex<State>,
    compiler: Mutex<Option<Arc<dyn SourceCompiler>>>,
}

impl Shared {
    /// Compiles one warmup job unless the key is already cached. The state
    /// lock is not held while compiling.
    fn warm(&self, job: WarmupJob) {
        if self.state.lock().store.contains_key(&job.key) {
            return;
        }
        let Some(compiler) = self.compiler.lock().clone() else {
            return;
        };

        let started = Instant::now();
        let output = match compiler.compile_source(&job.content) {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(key = %job.key, error = %err, "warmup compile failed");
                return;
            }
        };
        let compile_time_ms = started.elapsed().as_millis() as u64;

        let mut state = self.state.lock();
        let meta = EntryMeta {
            compile_time_ms,
            ..EntryMeta::default()
        };
        match state.insert(&job.key, &output, job.hash, meta) {
            Ok(()) => {
                state.warmups += 1;
                state.events.record(
                    CacheEventKind::Warmup,
                    &job.key,
                    format!("predictive warmup, time={compile_time_ms}ms"),
                );
                tracing::debug!(key = %job.key, compile_time_ms, "warmed cache entry");
            }
            Err(err) => tracing::warn!(key = %job.key, error = %err, "warmup result not stored"),
        }
    }
}

// ============================================================================
// SmartCache
// ============================================================================

/// A size-bounded cache with access prediction and background warmup.
///
/// The cache is saved when dropped; call [`CacheBackend::save`] to observe
/// write errors.
pub struct SmartCache {
    dir: PathBuf,
    config: CacheConfig,
    shared: Arc<Shared>,
    worker: Option<WarmupWorker>,
}

impl SmartCache {
    /// Opens the cache in `dir`. Unreadable files are logged and the cache
    /// starts cold.
    pub fn open(dir: impl Into<PathBuf>, config: CacheConfig) -> Self {
        let dir = dir.into();
        let state = load_state(&dir, &config).unwrap_or_else(|err| {
            tracing::warn!(dir = %dir.display(), error = %err, "discarding unreadable smart cache");
            State::new(&config)
        });
        Self::start(dir, config, state)
    }

    /// Opens the cache in `dir`, surfacing read and parse failures.
    pub fn try_open(dir: impl Into<PathBuf>, config: CacheConfig) -> Result<Self, CacheError> {
        let dir = dir.into();
        let state = load_state(&dir, &config)?;
        Ok(Self::start(dir, config, state))
    }

    fn start(dir: PathBuf, config: CacheConfig, state: State) -> Self {
        tracing::debug!(dir = %dir.display(), entries = state.store.len(), "opened smart cache");
        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            compiler: Mutex::new(None),
        });
        let mut cache = Self {
            dir,
            config,
            shared,
            worker: None,
        };
        if cache.config.enable_warmup {
            let shared = Arc::clone(&cache.shared);
            match WarmupWorker::spawn(cache.config.warmup_queue, cache.config.warmup_poll(), move |job| {
                shared.warm(job)
            }) {
                Ok(worker) => cache.worker = Some(worker),
                Err(err) => tracing::warn!(error = %err, "could not start warmup worker"),
            }
        }
        cache
    }

    /// The directory this cache persists to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The configuration the cache was opened with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Registers the compiler the warmup worker uses.
    pub fn set_compiler(&self, compiler: impl SourceCompiler + 'static) {
        *self.shared.compiler.lock() = Some(Arc::new(compiler));
    }

    /// Queues `key` for background compilation unless it is cached.
    /// Returns whether a job was queued.
    pub fn warmup_unit(&self, key: &str, content: &str, hash: ContentHash) -> bool {
        if self.shared.state.lock().store.contains_key(key) {
            return false;
        }
        self.submit(WarmupJob {
            key: key.to_string(),
            content: content.to_string(),
            hash,
        })
    }

    /// Queues every uncached key in `keys` whose source `provider` can
    /// supply. Returns the number queued.
    pub fn warmup_dependencies<P>(&self, keys: &[String], provider: P) -> usize
    where
        P: Fn(&str) -> Option<(String, ContentHash)>,
    {
        let mut queued = 0;
        for key in keys {
            if self.contains(key) {
                continue;
            }
            let Some((content, hash)) = provider(key) else {
                continue;
            };
            if self.submit(WarmupJob {
                key: key.clone(),
                content,
                hash,
            }) {
                queued += 1;
            }
        }
        queued
    }

    /// Stops the warmup worker, waiting at most the configured join
    /// timeout. Later warmup requests are ignored.
    pub fn stop_warmup(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop(self.config.join_timeout());
        }
    }

    /// The last `count` events, oldest first.
    pub fn recent_events(&self, count: usize) -> Vec<CacheEvent> {
        self.shared.state.lock().events.recent(count)
    }

    /// The `count` most accessed entries.
    pub fn hot_entries(&self, count: usize) -> Vec<HotEntry> {
        hottest(self.shared.state.lock().store.values(), count)
    }

    /// A copy of the stored entry for `key`, without counting an access.
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.shared.state.lock().store.get(key).cloned()
    }

    fn submit(&self, job: WarmupJob) -> bool {
        match &self.worker {
            Some(worker) => worker.submit(job),
            None => false,
        }
    }
}

impl CacheBackend for SmartCache {
    fn get(&mut self, key: &str, expected: Option<&ContentHash>) -> Option<String> {
        let (output, jobs) = {
            let mut state = self.shared.state.lock();
            let state = &mut *state;
            let Some(index) = state.store.get_index_of(key) else {
                state.events.record(CacheEventKind::Miss, key, "");
                state.misses += 1;
                return None;
            };
            if let Some(expected) = expected {
                if !state.store[index].matches(expected) {
                    state.events.record(CacheEventKind::Miss, key, "hash mismatch");
                    state.misses += 1;
                    return None;
                }
            }

            let last = state.store.len() - 1;
            state.store.move_index(index, last);
            let entry = &mut state.store[last];
            entry.touch();
            let output = entry.output.clone();
            state.events.record(CacheEventKind::Hit, key, "");
            state.hits += 1;
            state.patterns.record(key);

            let jobs = if self.config.enable_warmup {
                state.predict(key, self.config.prefetch_fanout)
            } else {
                Vec::new()
            };
            (output, jobs)
        };
        for job in jobs {
            self.submit(job);
        }
        Some(output)
    }

    fn put(&mut self, key: &str, output: &str, hash: ContentHash, meta: EntryMeta) -> Result<(), CacheError> {
        self.shared.state.lock().insert(key, output, hash, meta)
    }

    fn invalidate(&mut self, key: &str) -> bool {
        let mut state = self.shared.state.lock();
        let removed = state.remove(key).is_some();
        if removed {
            state.events.record(CacheEventKind::Evict, key, "invalidated");
        }
        removed
    }

    fn invalidate_by_dependency(&mut self, dependency: &str) -> usize {
        let mut state = self.shared.state.lock();
        let doomed: Vec<String> = state
            .store
            .values()
            .filter(|e| e.dependencies.iter().any(|d| d == dependency))
            .map(|e| e.key.clone())
            .collect();
        for key in &doomed {
            state.remove(key);
            state.events.record(CacheEventKind::Evict, key, format!("dependency {dependency} invalidated"));
        }
        doomed.len()
    }

    fn contains(&self, key: &str) -> bool {
        self.shared.state.lock().store.contains_key(key)
    }

    fn is_valid(&self, key: &str, hash: &ContentHash) -> bool {
        self.shared.state.lock().store.get(key).is_some_and(|e| e.matches(hash))
    }

    fn predicted_next(&self, key: &str, count: usize) -> Vec<String> {
        self.shared.state.lock().patterns.successors(key, count).to_vec()
    }

    fn remember_source(&mut self, key: &str, content: &str, hash: ContentHash) {
        let mut state = self.shared.state.lock();
        state.sources.insert(key.to_string(), (content.to_string(), hash));
        if state.sources.len() > state.max_entries {
            state.sources.shift_remove_index(0);
        }
    }

    fn stats(&self) -> CacheStats {
        let state = self.shared.state.lock();
        CacheStats {
            entries: state.store.len(),
            total_size_bytes: state.total_size,
            total_compile_time_ms: state.store.values().map(|e| e.compile_time_ms).sum(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            warmups: state.warmups,
            access_patterns: state.patterns.len(),
            history_len: 0,
        }
    }

    fn save(&self) -> Result<(), CacheError> {
        let state = self.shared.state.lock();
        let file = EntriesFile {
            version: SMART_CACHE_VERSION.to_string(),
            entries: state.store.values().collect(),
        };
        write_json(&self.dir, ENTRIES_FILE, &file)?;
        write_json(&self.dir, PATTERNS_FILE, state.patterns.patterns())?;
        write_json(&self.dir, EVENTS_FILE, &state.events.recent(self.config.persisted_events))?;
        tracing::debug!(dir = %self.dir.display(), entries = state.store.len(), "saved smart cache");
        Ok(())
    }

    fn clear(&mut self) {
        let mut state = self.shared.state.lock();
        state.store.clear();
        state.total_size = 0;
        state.patterns.clear();
        state.events.clear();
        state.sources.clear();
        state.hits = 0;
        state.misses = 0;
        state.evictions = 0;
        state.warmups = 0;
    }
}

impl Drop for SmartCache {
    fn drop(&mut self) {
        self.stop_warmup();
        if let Err(err) = self.save() {
            tracing::warn!(dir = %self.dir.display(), error = %err, "failed to save smart cache");
        }
    }
}

fn load_state(dir: &Path, config: &CacheConfig) -> Result<State, CacheError> {
    let mut state = State::new(config);
    if let Some(file) = read_json::<EntriesFile<CacheEntry>>(dir, ENTRIES_FILE)? {
        if file.version == SMART_CACHE_VERSION {
            for entry in file.entries {
                state.total_size += entry.size_bytes;
                if let Some(old) = state.store.insert(entry.key.clone(), entry) {
                    state.total_size -= old.size_bytes;
                }
            }
        } else {
            tracing::debug!(found = %file.version, expected = SMART_CACHE_VERSION, "ignoring smart cache from another version");
        }
    }
    if let Some(patterns) = read_json::<BTreeMap<String, AccessPattern>>(dir, PATTERNS_FILE)? {
        state.patterns = PatternTable::from_patterns(patterns);
    }
    if let Some(events) = read_json::<Vec<CacheEvent>>(dir, EVENTS_FILE)? {
        state.events = EventLog::from_events(events, config.max_events);
    }
    Ok(state)
}
