//! End-to-end edit sessions: successive versions of a file go through the
//! orchestrator and the recompiled set is checked against the edit.

use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use strata_analyzer::Unit;
use strata_cache::{CacheConfig, SmartCache};
use strata_incremental::{
    load_config, BackendError, CacheBackend, ChangeKind, ChangeRecord, EngineConfig, IncrementalCompiler, UnitState,
    CONFIG_FILE,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn engine_in(dir: &Path) -> IncrementalCompiler {
    IncrementalCompiler::open(EngineConfig {
        cache_dir: dir.join(".strata_cache"),
        ..EngineConfig::default()
    })
}

/// Installs a compiler that upper-cases each unit and logs its name.
fn log_compiles<C: CacheBackend>(engine: &mut IncrementalCompiler<C>) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    engine.set_compiler(move |unit: &Unit| -> Result<String, BackendError> {
        sink.borrow_mut().push(unit.name.clone());
        Ok(unit.content.to_uppercase())
    });
    log
}

fn kinds(records: &[ChangeRecord]) -> Vec<ChangeKind> {
    records.iter().map(|r| r.kind).collect()
}

fn named<C: CacheBackend>(engine: &IncrementalCompiler<C>, records: &[ChangeRecord]) -> Vec<(ChangeKind, String)> {
    records
        .iter()
        .map(|r| {
            let name = engine.unit(&r.unit_id).map(|u| u.name.clone()).unwrap_or_default();
            (r.kind, name)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn hello_world_recompiles_only_the_edited_function() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    let log = log_compiles(&mut engine);

    let v1 = "def hello(): print(\"Hello\")\n\ndef world(): print(\"World\")\n";
    let records = engine.update_source("hello.py", v1);
    assert_eq!(kinds(&records), vec![ChangeKind::Added, ChangeKind::Added]);
    engine.compile_all_pending().unwrap();
    assert_eq!(log.borrow().len(), 2);

    let v2 = v1.replace("\"Hello\"", "\"Hello, Strata\"");
    let records = engine.update_source("hello.py", &v2);
    assert_eq!(named(&engine, &records), vec![(ChangeKind::Modified, "hello".to_string())]);
    engine.compile_all_pending().unwrap();
    assert_eq!(*log.borrow(), vec!["hello", "world", "hello"]);

    assert_eq!(
        engine.get_combined_output("hello.py"),
        "DEF HELLO(): PRINT(\"HELLO, STRATA\")\nDEF WORLD(): PRINT(\"WORLD\")"
    );
}

#[test]
fn repeating_an_update_reports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    let src = "import os\n\nclass A:\n    def f(self):\n        return os.sep\n\nvalue = A()\n";
    assert!(!engine.update_source("m.py", src).is_empty());
    assert!(engine.update_source("m.py", src).is_empty());
    engine.compile_all_pending().unwrap();
    assert!(engine.update_source("m.py", src).is_empty());
    assert!(engine.units_to_compile().is_empty());
}

#[test]
fn first_build_output_is_in_line_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    let src = "a = 1\n\nclass B:\n    n = a\n\nc = B()\n";
    let records = engine.update_source("m.py", src);
    assert!(records.iter().all(|r| r.kind == ChangeKind::Added));
    engine.compile_all_pending().unwrap();

    let combined = engine.get_combined_output("m.py");
    assert!(!combined.is_empty());
    let positions: Vec<usize> = ["a = 1", "class B:", "n = a", "c = B()"]
        .iter()
        .map(|needle| combined.find(needle).unwrap())
        .collect();
    let mut sorted = positions.clone();
    sorted.sort();
    assert_eq!(positions, sorted);
}

#[test]
fn an_unreferenced_statement_edit_stays_local() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    engine.update_source("m.py", "a = 1\nb = 2\nc = 3\n");
    engine.compile_all_pending().unwrap();

    let records = engine.update_source("m.py", "a = 1\nb = 5\nc = 3\n");
    assert_eq!(named(&engine, &records), vec![(ChangeKind::Modified, "b".to_string())]);
    assert_eq!(engine.units_to_compile(), vec![records[0].unit_id.clone()]);
}

#[test]
fn a_changed_value_reaches_every_transitive_user() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    let log = log_compiles(&mut engine);
    let v1 = "x = 10\n\ndef get_x():\n    return x\n\ndef use_x():\n    return get_x()\n";
    engine.update_source("chain.py", v1);
    engine.compile_all_pending().unwrap();
    log.borrow_mut().clear();

    let records = engine.update_source("chain.py", &v1.replace("x = 10", "x = 20"));
    assert_eq!(
        named(&engine, &records),
        vec![
            (ChangeKind::Modified, "x".to_string()),
            (ChangeKind::Affected, "get_x".to_string()),
            (ChangeKind::Affected, "use_x".to_string()),
        ]
    );
    let get_x = &records[1].unit_id;
    assert_eq!(engine.unit_state(get_x), Some(UnitState::Affected));

    engine.compile_all_pending().unwrap();
    assert_eq!(*log.borrow(), vec!["x", "get_x", "use_x"]);
    assert_eq!(engine.unit_state(get_x), Some(UnitState::Unchanged));
}

#[test]
fn a_function_shadowing_an_edited_global_is_affected() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    let v1 = "x = 10\n\ndef f():\n    x = 1\n    return x\n";
    engine.update_source("m.py", v1);
    engine.compile_all_pending().unwrap();

    let records = engine.update_source("m.py", &v1.replace("x = 10", "x = 20"));
    assert_eq!(
        named(&engine, &records),
        vec![(ChangeKind::Modified, "x".to_string()), (ChangeKind::Affected, "f".to_string())]
    );
    assert_eq!(engine.units_to_compile().len(), 2);
}

#[test]
fn a_class_attribute_reading_an_edited_global_is_affected() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    let v1 = "x = 1\n\nclass A:\n    x = x\n";
    engine.update_source("m.py", v1);
    engine.compile_all_pending().unwrap();

    let records = engine.update_source("m.py", &v1.replace("x = 1\n", "x = 2\n"));
    let names: Vec<(ChangeKind, String)> = named(&engine, &records);
    assert_eq!(names[0], (ChangeKind::Modified, "x".to_string()));
    assert!(names.contains(&(ChangeKind::Affected, "A".to_string())));
}

#[test]
fn removing_a_function_reports_it_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    let log = log_compiles(&mut engine);
    engine.update_source("m.py", "x = 1\n\ndef f():\n    return 1\n\ny = 2\n");
    engine.compile_all_pending().unwrap();

    let records = engine.update_source("m.py", "x = 1\n\ny = 2\n");
    assert_eq!(kinds(&records), vec![ChangeKind::Deleted]);
    assert_eq!(records[0].old_lines, Some((3, 4)));
    assert_eq!(records[0].new_lines, None);
    assert!(engine.unit(&records[0].unit_id).is_none());

    // y moved up two lines but keeps its output.
    assert!(engine.units_to_compile().is_empty());
    assert_eq!(log.borrow().len(), 3);
    assert_eq!(engine.get_combined_output("m.py"), "X = 1\nY = 2");
}

#[test]
fn editing_a_method_recompiles_its_class() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    let log = log_compiles(&mut engine);
    let v1 = "class A:\n    def f(self):\n        return 1\n\n    def g(self):\n        return 2\n\nz = 0\n";
    engine.update_source("cls.py", v1);
    engine.compile_all_pending().unwrap();
    log.borrow_mut().clear();

    engine.update_source("cls.py", &v1.replace("return 1", "return 10"));
    engine.compile_all_pending().unwrap();
    assert_eq!(*log.borrow(), vec!["A", "f", "g"]);
}

#[test]
fn broken_source_still_compiles_incrementally() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    let log = log_compiles(&mut engine);
    let v1 = "x = 1\ndef broken(:\n    return x\n";
    assert_eq!(engine.update_source("bad.py", v1).len(), 2);
    engine.compile_all_pending().unwrap();

    let records = engine.update_source("bad.py", "x = 2\ndef broken(:\n    return x\n");
    assert_eq!(kinds(&records), vec![ChangeKind::Modified, ChangeKind::Affected]);
    engine.compile_all_pending().unwrap();
    assert_eq!(log.borrow().len(), 4);
}

// ---------------------------------------------------------------------------
// Sessions and configuration
// ---------------------------------------------------------------------------

#[test]
fn a_new_session_reuses_persisted_output() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("app.py");
    std::fs::write(&source, "def main():\n    return 0\n\nmain()\n").unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        "separator = \"\\n\\n\"\n\n[cache]\nmax_entries = 100\n",
    )
    .unwrap();

    let mut config = load_config(dir.path()).unwrap();
    config.cache_dir = dir.path().join("cache");
    {
        let mut engine = IncrementalCompiler::open(config.clone());
        engine.update_file(&source).unwrap();
        engine.compile_all_pending().unwrap();
        engine.save().unwrap();
    }
    assert!(dir.path().join("cache").join("incremental_cache.json").exists());

    let mut engine = IncrementalCompiler::open(config);
    let log = log_compiles(&mut engine);
    engine.update_file(&source).unwrap();
    engine.compile_all_pending().unwrap();
    assert!(log.borrow().is_empty());

    let file = source.to_string_lossy();
    assert_eq!(engine.get_combined_output(&file), "def main():\n    return 0\n\nmain()");
    let stats = engine.get_stats();
    assert_eq!((stats.compiles, stats.reused), (0, 2));
}

#[test]
fn a_failed_compile_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    engine.update_source("m.py", "a = 1\nb = 2\n");
    engine.set_compiler(|unit: &Unit| -> Result<String, BackendError> {
        if unit.name == "b" {
            Err("native compiler crashed".into())
        } else {
            Ok(unit.content.clone())
        }
    });
    let err = engine.compile_all_pending().unwrap_err();
    assert!(err.to_string().contains("native compiler crashed"));
    assert_eq!(engine.units_to_compile().len(), 1);

    log_compiles(&mut engine);
    let outputs = engine.compile_all_pending().unwrap();
    assert_eq!(outputs.into_values().collect::<Vec<_>>(), vec!["B = 2".to_string()]);
}

#[test]
fn smart_cache_stays_within_its_entry_cap() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SmartCache::open(
        dir.path(),
        CacheConfig {
            max_entries: 3,
            enable_warmup: false,
            ..CacheConfig::default()
        },
    );
    let mut engine = IncrementalCompiler::with_cache(cache, EngineConfig::default());
    engine.update_source("wide.py", "a = 1\nb = 2\nc = 3\nd = 4\ne = 5\n");
    engine.compile_all_pending().unwrap();

    let stats = engine.get_stats();
    assert_eq!(stats.cache.entries, 3);
    assert_eq!(stats.cache.evictions, 2);
    // Live outputs outlast eviction.
    assert_eq!(engine.get_combined_output("wide.py"), "a = 1\nb = 2\nc = 3\nd = 4\ne = 5");
}
