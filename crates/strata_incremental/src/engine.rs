//! The incremental compiler: keeps the live unit registry of every file,
//! decides what to recompile after an edit, and routes compiles through
//! the cache.

use crate::change::{ChangeRecord, UnitState};
use crate::compile::{EchoCompiler, UnitCompiler};
use crate::config::EngineConfig;
use crate::detector::{create_snapshot, Snapshot};
use crate::error::EngineError;
use crate::plan::{first_build, plan_update, Plan};
use crate::stats::EngineStats;
use indexmap::IndexSet;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Instant;
use strata_analyzer::{analyze_source, AnalyzeError, Unit};
use strata_cache::pattern::MAX_SUCCESSORS;
use strata_cache::{CacheBackend, EntryMeta, UnitCache};
use strata_common::UnitId;

/// Runtime state of one live unit.
#[derive(Debug, Clone)]
struct UnitSlot {
    file: String,
    state: UnitState,
    cache_valid: bool,
    output: Option<String>,
}

impl UnitSlot {
    fn new(file: &str, state: UnitState) -> Self {
        Self {
            file: file.to_string(),
            state,
            cache_valid: false,
            output: None,
        }
    }
}

/// Incremental compilation orchestrator.
///
/// Each [`update_source`](Self::update_source) replaces a file's generation
/// of units and queues the ones that must recompile. Compiling goes through
/// the cache first, so a unit whose content was compiled before costs
/// nothing. The orchestrator owns its cache; there is no shared global
/// instance.
pub struct IncrementalCompiler<C: CacheBackend = UnitCache> {
    config: EngineConfig,
    cache: C,
    compiler: Box<dyn UnitCompiler>,
    files: HashMap<String, Snapshot>,
    slots: HashMap<UnitId, UnitSlot>,
    pending: IndexSet<UnitId>,
    compiles: u64,
    reused: u64,
}

impl IncrementalCompiler<UnitCache> {
    /// Creates an engine backed by a [`UnitCache`] in `config.cache_dir`.
    pub fn open(config: EngineConfig) -> Self {
        let cache = UnitCache::open(config.cache_dir.clone(), &config.cache);
        Self::with_cache(cache, config)
    }
}

impl<C: CacheBackend> IncrementalCompiler<C> {
    /// Creates an engine around an existing cache. Until
    /// [`set_compiler`](Self::set_compiler) is called every unit compiles to
    /// its own source text.
    pub fn with_cache(cache: C, config: EngineConfig) -> Self {
        Self {
            config,
            cache,
            compiler: Box::new(EchoCompiler),
            files: HashMap::new(),
            slots: HashMap::new(),
            pending: IndexSet::new(),
            compiles: 0,
            reused: 0,
        }
    }

    /// Replaces the backend used for cache misses.
    pub fn set_compiler(&mut self, compiler: impl UnitCompiler + 'static) {
        self.compiler = Box::new(compiler);
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// The cache, mutably.
    pub fn cache_mut(&mut self) -> &mut C {
        &mut self.cache
    }

    /// Splits `text` into units without touching engine state.
    pub fn analyze_source(&self, file_path: &str, text: &str) -> Vec<Unit> {
        analyze_source(text, file_path)
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Installs a new version of `file_path` and returns what changed.
    ///
    /// The first version of a file reports every unit as added. Later
    /// versions report modified units, the units affected through
    /// dependencies or enclosing scopes, and deleted units. Units that did
    /// not change keep their compiled output, even if their lines moved.
    #[tracing::instrument(level = "debug", skip_all, fields(file = file_path))]
    pub fn update_source(&mut self, file_path: &str, text: &str) -> Vec<ChangeRecord> {
        let mut snapshot = create_snapshot(file_path, text);
        snapshot.units = analyze_source(text, file_path)
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let plan = match self.files.get(file_path) {
            Some(old) => plan_update(old, &snapshot),
            None => first_build(&snapshot),
        };
        self.install(snapshot, plan)
    }

    /// Reads `path` and installs it as with
    /// [`update_source`](Self::update_source). The displayed path is the
    /// file name.
    pub fn update_file(&mut self, path: &Path) -> Result<Vec<ChangeRecord>, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|source| AnalyzeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.update_source(&path.to_string_lossy(), &text))
    }

    /// Registers externally produced units as the current generation of
    /// `file_path`, replacing any previous one. Units without a valid cache
    /// entry are queued for compilation.
    pub fn register_units(&mut self, file_path: &str, units: Vec<Unit>) {
        let text = text_from_units(&units);
        let mut snapshot = create_snapshot(file_path, &text);
        snapshot.units = units.into_iter().map(|u| (u.id.clone(), u)).collect();

        self.retire_file(file_path);
        for unit in snapshot.units.values() {
            self.slots.insert(unit.id.clone(), UnitSlot::new(file_path, UnitState::Unknown));
            if !self.cache.is_valid(unit.id.as_str(), &unit.content_hash) {
                self.queue(unit);
            }
        }
        self.files.insert(file_path.to_string(), snapshot);
    }

    fn install(&mut self, snapshot: Snapshot, plan: Plan) -> Vec<ChangeRecord> {
        let file_path = snapshot.file_path.clone();

        // Outputs inherited by unchanged units, read before anything old is
        // invalidated.
        let mut carried: Vec<(UnitId, String)> = Vec::new();
        for unit in snapshot.units.values() {
            if plan.marks.contains_key(&unit.id) {
                continue;
            }
            let Some(origin) = plan.origins.get(&unit.id) else {
                continue;
            };
            let live = self
                .slots
                .get(origin)
                .filter(|slot| slot.cache_valid)
                .and_then(|slot| slot.output.clone());
            let output = match live {
                Some(output) => Some(output),
                None if self.cache.is_valid(origin.as_str(), &unit.content_hash) => {
                    self.cache.get(origin.as_str(), Some(&unit.content_hash))
                }
                None => None,
            };
            if let Some(output) = output {
                carried.push((unit.id.clone(), output));
            }
        }

        let old_ids: Vec<UnitId> = self
            .files
            .get(&file_path)
            .map(|old| old.units.keys().cloned().collect())
            .unwrap_or_default();
        for id in &old_ids {
            if !snapshot.units.contains_key(id) {
                self.cache.invalidate(id.as_str());
            }
        }
        for id in &plan.superseded {
            let dropped = self.cache.invalidate_by_dependency(id.as_str());
            if dropped > 0 {
                tracing::trace!(unit = %id, dropped, "invalidated dependents of superseded unit");
            }
        }
        // A first generation keeps whatever the cache holds for its ids.
        if !old_ids.is_empty() {
            for id in plan.marks.keys() {
                self.cache.invalidate(id.as_str());
            }
        }

        self.retire_file(&file_path);
        for unit in snapshot.units.values() {
            let state = plan.marks.get(&unit.id).copied().unwrap_or(UnitState::Unchanged);
            self.slots.insert(unit.id.clone(), UnitSlot::new(&file_path, state));
        }
        for (id, output) in carried {
            let Some(unit) = snapshot.units.get(&id) else {
                continue;
            };
            let moved = plan.origins.get(&id).is_some_and(|origin| *origin != id);
            if moved || !self.cache.is_valid(id.as_str(), &unit.content_hash) {
                self.write_through(unit, &output, 0);
            }
            self.settle(&id, output);
        }

        for unit in snapshot.units.values() {
            let Some(slot) = self.slots.get(&unit.id) else {
                continue;
            };
            let needs_compile = plan.marks.contains_key(&unit.id)
                || (!slot.cache_valid && !self.cache.is_valid(unit.id.as_str(), &unit.content_hash));
            if needs_compile {
                self.queue(unit);
            }
        }

        tracing::debug!(
            file = %file_path,
            units = snapshot.units.len(),
            changes = plan.records.len(),
            pending = self.pending.len(),
            "installed generation"
        );
        self.files.insert(file_path, snapshot);
        plan.records
    }

    /// Drops the live slots and pending entries of the current generation
    /// of `file_path`.
    fn retire_file(&mut self, file_path: &str) {
        let Some(old) = self.files.get(file_path) else {
            return;
        };
        for id in old.units.keys() {
            self.slots.remove(id);
            self.pending.shift_remove(id);
        }
    }

    fn queue(&mut self, unit: &Unit) {
        self.pending.insert(unit.id.clone());
        self.cache.remember_source(unit.id.as_str(), &unit.content, unit.content_hash);
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    /// Returns the output of unit `id`, compiling it only when neither the
    /// live registry nor the cache holds output for its current content.
    ///
    /// A backend failure leaves the unit invalid and pending, so a later
    /// call retries it.
    #[tracing::instrument(level = "debug", skip_all, fields(unit = %id))]
    pub fn compile_unit(&mut self, id: &UnitId) -> Result<String, EngineError> {
        let (live, hash) = {
            let slot = self.slots.get(id).ok_or_else(|| unknown(id))?;
            let unit = self.unit(id).ok_or_else(|| unknown(id))?;
            let live = if slot.cache_valid { slot.output.clone() } else { None };
            (live, unit.content_hash)
        };

        let reused = match live {
            Some(output) => Some(output),
            None if self.cache.is_valid(id.as_str(), &hash) => self.cache.get(id.as_str(), Some(&hash)),
            None => None,
        };
        if let Some(output) = reused {
            tracing::trace!("reused cached output");
            self.reused += 1;
            self.settle(id, output.clone());
            self.queue_predictions(id);
            return Ok(output);
        }

        let unit = self.unit(id).ok_or_else(|| unknown(id))?;
        let started = Instant::now();
        let output = self
            .compiler
            .compile(unit)
            .map_err(|source| EngineError::Backend { id: id.clone(), source })?;
        let compile_time_ms = started.elapsed().as_millis() as u64;
        self.compiles += 1;
        self.mark_compiled(id, &output, compile_time_ms)?;
        Ok(output)
    }

    /// Records `output` as the compiled result of unit `id`: the live unit
    /// becomes valid and the output is written to the cache.
    ///
    /// An output the cache refuses is kept in memory and logged.
    pub fn mark_compiled(&mut self, id: &UnitId, output: &str, compile_time_ms: u64) -> Result<(), EngineError> {
        let unit = self.unit(id).ok_or_else(|| unknown(id))?.clone();
        self.write_through(&unit, output, compile_time_ms);
        self.settle(id, output.to_string());
        Ok(())
    }

    /// Compiles every unit pending when called. Units queued by predictions
    /// during the run are left for the next call.
    pub fn compile_all_pending(&mut self) -> Result<BTreeMap<UnitId, String>, EngineError> {
        let batch: Vec<UnitId> = self.pending.iter().cloned().collect();
        let mut outputs = BTreeMap::new();
        for id in batch {
            let output = self.compile_unit(&id)?;
            outputs.insert(id, output);
        }
        Ok(outputs)
    }

    fn write_through(&mut self, unit: &Unit, output: &str, compile_time_ms: u64) {
        let meta = EntryMeta {
            dependencies: unit.dependencies.iter().map(|d| d.to_string()).collect(),
            file_path: unit.file_path.clone(),
            line_range: unit.line_range(),
            compile_time_ms,
        };
        if let Err(err) = self.cache.put(unit.id.as_str(), output, unit.content_hash, meta) {
            tracing::warn!(unit = %unit.id, error = %err, "output not cached, kept in memory");
        }
    }

    fn settle(&mut self, id: &UnitId, output: String) {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.output = Some(output);
            slot.cache_valid = true;
            slot.state = UnitState::Unchanged;
        }
        self.pending.shift_remove(id);
    }

    /// Queues up to `predictive_fanout` units the cache expects to be
    /// requested after `id`, if they are live and not cached.
    fn queue_predictions(&mut self, id: &UnitId) {
        if self.config.predictive_fanout == 0 {
            return;
        }
        for key in self.cache.predicted_next(id.as_str(), self.config.predictive_fanout) {
            let next = UnitId::from(key);
            let wanted = self.slots.get(&next).is_some_and(|slot| !slot.cache_valid)
                && !self.cache.contains(next.as_str());
            if wanted && self.pending.insert(next.clone()) {
                tracing::trace!(predicted = %next, "queued predicted unit");
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Concatenates the outputs of `file_path`'s units in source order,
    /// joined by the configured separator. Units without output are skipped.
    pub fn get_combined_output(&mut self, file_path: &str) -> String {
        let Some(snapshot) = self.files.get(file_path) else {
            return String::new();
        };
        let mut units: Vec<&Unit> = snapshot.units.values().collect();
        units.sort_by_key(|u| u.start_line);

        let mut parts = Vec::with_capacity(units.len());
        for unit in units {
            let live = self
                .slots
                .get(&unit.id)
                .filter(|slot| slot.cache_valid)
                .and_then(|slot| slot.output.clone());
            let output = match live {
                Some(output) => Some(output),
                None => self.cache.get(unit.id.as_str(), Some(&unit.content_hash)),
            };
            if let Some(output) = output.filter(|o| !o.is_empty()) {
                parts.push(output);
            }
        }
        parts.join(&self.config.separator)
    }

    /// Ids waiting to be compiled, in queue order.
    pub fn units_to_compile(&self) -> Vec<UnitId> {
        self.pending.iter().cloned().collect()
    }

    /// The live unit with this id.
    pub fn unit(&self, id: &UnitId) -> Option<&Unit> {
        let slot = self.slots.get(id)?;
        self.files.get(&slot.file)?.units.get(id)
    }

    /// The lifecycle state of the live unit with this id.
    pub fn unit_state(&self, id: &UnitId) -> Option<UnitState> {
        self.slots.get(id).map(|slot| slot.state)
    }

    /// The live units of `file_path` ordered by start line.
    pub fn units_for_file(&self, file_path: &str) -> Vec<&Unit> {
        let mut units: Vec<&Unit> = self
            .files
            .get(file_path)
            .map(|s| s.units.values().collect())
            .unwrap_or_default();
        units.sort_by_key(|u| u.start_line);
        units
    }

    /// The current snapshot of `file_path`.
    pub fn snapshot(&self, file_path: &str) -> Option<&Snapshot> {
        self.files.get(file_path)
    }

    /// Units the cache has seen accessed right after `id`.
    pub fn predictions(&self, id: &UnitId) -> Vec<UnitId> {
        self.cache
            .predicted_next(id.as_str(), MAX_SUCCESSORS)
            .into_iter()
            .map(UnitId::from)
            .collect()
    }

    /// Registry and cache counters.
    pub fn get_stats(&self) -> EngineStats {
        EngineStats {
            total_units: self.slots.len(),
            pending_units: self.pending.len(),
            files: self.files.len(),
            compiles: self.compiles,
            reused: self.reused,
            cache: self.cache.stats(),
        }
    }

    /// Persists the cache.
    pub fn save(&self) -> Result<(), EngineError> {
        self.cache.save()?;
        Ok(())
    }

    /// Forgets every file and unit and empties the cache.
    pub fn clear(&mut self) {
        self.files.clear();
        self.slots.clear();
        self.pending.clear();
        self.compiles = 0;
        self.reused = 0;
        self.cache.clear();
    }
}

fn unknown(id: &UnitId) -> EngineError {
    EngineError::UnknownUnit { id: id.clone() }
}

/// Rebuilds an approximation of a file's text from its units, for the line
/// history of registered generations. Lines no unit covers are blank.
fn text_from_units(units: &[Unit]) -> String {
    let line_count = units.iter().map(|u| u.end_line as usize).max().unwrap_or(0);
    let mut lines: Vec<Option<&str>> = vec![None; line_count];
    for unit in units {
        let start = (unit.start_line as usize).saturating_sub(1);
        for (offset, line) in unit.content.lines().enumerate() {
            if let Some(slot) = lines.get_mut(start + offset) {
                slot.get_or_insert(line);
            }
        }
    }
    let mut text = lines.into_iter().map(|l| l.unwrap_or("")).collect::<Vec<_>>().join("\n");
    if line_count > 0 {
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeKind;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;
    use strata_cache::{BackendError, CacheConfig};

    fn engine(dir: &Path) -> IncrementalCompiler {
        let config = EngineConfig {
            cache_dir: dir.to_path_buf(),
            ..EngineConfig::default()
        };
        IncrementalCompiler::open(config)
    }

    /// A compiler that records the name of every unit it compiles.
    fn counting(log: &Rc<RefCell<Vec<String>>>) -> impl UnitCompiler + 'static {
        let log = Rc::clone(log);
        move |unit: &Unit| -> Result<String, BackendError> {
            log.borrow_mut().push(unit.name.clone());
            Ok(format!("[{}]", unit.content.trim()))
        }
    }

    fn kinds(records: &[ChangeRecord]) -> Vec<ChangeKind> {
        records.iter().map(|r| r.kind).collect()
    }

    #[test]
    fn first_update_queues_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let records = engine.update_source("m.py", "a = 1\nb = a\n");
        assert_eq!(kinds(&records), vec![ChangeKind::Added, ChangeKind::Added]);
        assert_eq!(engine.units_to_compile().len(), 2);
        let first = &records[0].unit_id;
        assert_eq!(engine.unit_state(first), Some(UnitState::Added));
    }

    #[test]
    fn compile_all_then_combine_in_source_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        engine.update_source("m.py", "a = 1\n\nb = 2\n");
        let outputs = engine.compile_all_pending().unwrap();
        assert_eq!(outputs.len(), 2);
        assert!(engine.units_to_compile().is_empty());
        assert_eq!(engine.get_combined_output("m.py"), "a = 1\nb = 2");
        assert_eq!(engine.get_combined_output("missing.py"), "");
    }

    #[test]
    fn unchanged_units_are_not_recompiled_after_an_edit() {
        let dir = tempfile::tempdir().unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = engine(dir.path());
        engine.set_compiler(counting(&log));

        let v1 = "def hello():\n    print(\"Hello\")\n\ndef world():\n    print(\"World\")\n";
        engine.update_source("hw.py", v1);
        engine.compile_all_pending().unwrap();
        assert_eq!(*log.borrow(), vec!["hello", "world"]);

        let v2 = v1.replace("\"Hello\"", "\"Hello, there\"");
        let records = engine.update_source("hw.py", &v2);
        assert_eq!(kinds(&records), vec![ChangeKind::Modified]);
        engine.compile_all_pending().unwrap();
        assert_eq!(*log.borrow(), vec!["hello", "world", "hello"]);
        assert_eq!(
            engine.get_combined_output("hw.py"),
            "[def hello():\n    print(\"Hello, there\")]\n[def world():\n    print(\"World\")]"
        );
    }

    #[test]
    fn moved_units_keep_output_under_new_id() {
        let dir = tempfile::tempdir().unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = engine(dir.path());
        engine.set_compiler(counting(&log));
        engine.update_source("m.py", "a = 1\nb = 2\n");
        engine.compile_all_pending().unwrap();

        let records = engine.update_source("m.py", "z = 0\na = 1\nb = 2\n");
        assert_eq!(records.len(), 1);
        assert_eq!(engine.units_to_compile(), vec![records[0].unit_id.clone()]);
        engine.compile_all_pending().unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b", "z"]);

        let b = engine.units_for_file("m.py")[2].id.clone();
        assert!(engine.cache().is_valid(b.as_str(), &engine.unit(&b).unwrap().content_hash));
        assert_eq!(engine.get_combined_output("m.py"), "[z = 0]\n[a = 1]\n[b = 2]");
    }

    #[test]
    fn backend_failure_leaves_unit_pending() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        engine.set_compiler(|_: &Unit| -> Result<String, BackendError> { Err("backend offline".into()) });
        engine.update_source("m.py", "x = 1\n");
        let err = engine.compile_all_pending().unwrap_err();
        assert!(matches!(err, EngineError::Backend { .. }));
        assert_eq!(engine.units_to_compile().len(), 1);

        engine.set_compiler(EchoCompiler);
        assert_eq!(engine.compile_all_pending().unwrap().len(), 1);
        assert!(engine.units_to_compile().is_empty());
    }

    #[test]
    fn unknown_unit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let err = engine.compile_unit(&UnitId::from("nope.py:1:1:00000000")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownUnit { .. }));
        let err = engine.mark_compiled(&UnitId::from("nope.py:1:1:00000000"), "x", 0).unwrap_err();
        assert!(matches!(err, EngineError::UnknownUnit { .. }));
    }

    #[test]
    fn persistent_cache_serves_a_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let src = "a = 1\nb = 2\n";
        {
            let mut engine = engine(dir.path());
            engine.update_source("m.py", src);
            engine.compile_all_pending().unwrap();
            engine.save().unwrap();
        }
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = engine(dir.path());
        engine.set_compiler(counting(&log));
        let records = engine.update_source("m.py", src);
        assert_eq!(records.len(), 2);
        engine.compile_all_pending().unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(engine.get_stats().reused, 2);
        assert_eq!(engine.get_combined_output("m.py"), "a = 1\nb = 2");
    }

    #[test]
    fn register_units_queues_uncached() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let units = engine.analyze_source("r.py", "a = 1\nb = 2\n");
        engine.register_units("r.py", units);
        assert_eq!(engine.units_to_compile().len(), 2);
        assert_eq!(engine.unit_state(&engine.units_to_compile()[0]), Some(UnitState::Unknown));
        engine.compile_all_pending().unwrap();

        // The rebuilt line history lets a later edit stay local.
        let records = engine.update_source("r.py", "a = 1\nb = 3\n");
        assert_eq!(kinds(&records), vec![ChangeKind::Modified]);
    }

    #[test]
    fn updating_one_file_keeps_other_files_pending() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        engine.update_source("a.py", "a = 1\n");
        engine.update_source("b.py", "b = 1\n");
        assert_eq!(engine.units_to_compile().len(), 2);
        assert_eq!(engine.get_stats().files, 2);
    }

    #[test]
    fn predicted_units_are_queued_on_hits() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        engine.update_source("m.py", "a = 1\nb = 2\n");
        engine.compile_all_pending().unwrap();
        let ids: Vec<UnitId> = engine.units_for_file("m.py").iter().map(|u| u.id.clone()).collect();
        // Reading a then b teaches the cache that b follows a.
        engine.cache_mut().get(ids[0].as_str(), None);
        engine.cache_mut().get(ids[1].as_str(), None);
        assert_eq!(engine.predictions(&ids[0]), vec![ids[1].clone()]);

        engine.cache_mut().invalidate(ids[1].as_str());
        engine.slots.get_mut(&ids[1]).unwrap().cache_valid = false;
        engine.compile_unit(&ids[0]).unwrap();
        assert_eq!(engine.units_to_compile(), vec![ids[1].clone()]);
    }

    #[test]
    fn update_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.py");
        std::fs::write(&path, "x = 1\n").unwrap();
        let mut engine = engine(dir.path());
        assert_eq!(engine.update_file(&path).unwrap().len(), 1);
        let err = engine.update_file(&dir.path().join("missing.py")).unwrap_err();
        assert!(matches!(err, EngineError::Analyze(_)));
    }

    #[test]
    fn clear_forgets_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        engine.update_source("m.py", "x = 1\n");
        engine.compile_all_pending().unwrap();
        engine.clear();
        assert_eq!(engine.get_stats(), EngineStats::default());
    }

    #[test]
    fn smart_cache_backend() {
        let dir = tempfile::tempdir().unwrap();
        let cache_config = CacheConfig {
            enable_warmup: false,
            ..CacheConfig::default()
        };
        let cache = strata_cache::SmartCache::open(dir.path(), cache_config);
        let mut engine = IncrementalCompiler::with_cache(cache, EngineConfig::default());
        engine.update_source("m.py", "x = 1\ny = x\n");
        engine.compile_all_pending().unwrap();
        assert_eq!(engine.get_stats().cache.entries, 2);
        let records = engine.update_source("m.py", "x = 2\ny = x\n");
        assert_eq!(kinds(&records), vec![ChangeKind::Modified, ChangeKind::Affected]);
        assert_eq!(engine.get_stats().cache.entries, 0);
    }

    #[test]
    fn text_from_units_fills_gaps() {
        let units = analyze_source("a = 1\n\nb = 2\n", "t.py");
        assert_eq!(text_from_units(&units), "a = 1\n\nb = 2\n");
        assert_eq!(text_from_units(&[]), "");
    }
}
