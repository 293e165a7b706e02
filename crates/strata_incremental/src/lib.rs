//! Incremental compilation orchestrator for the Strata build engine.
//!
//! Given successive versions of source files, works out which units
//! changed, which are affected through dependencies or enclosing scopes,
//! and recompiles only those, reusing cached output for everything else.
//!
//! # Architecture
//!
//! - [`detector`] snapshots a file version and aligns its lines against the
//!   previous version.
//! - [`graph`] holds the file-scoped dependency graph used for propagation.
//! - [`IncrementalCompiler`] owns the live unit registry, the pending queue
//!   and a [`CacheBackend`], and routes every compile through the cache.
//! - [`UnitCompiler`] is the seam for the native backend. Without one,
//!   units compile to their own source text.
//! - [`config`] loads `strata.toml`.

#![warn(missing_docs)]

pub mod change;
pub mod compile;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod graph;
mod plan;
pub mod stats;

pub use change::{ChangeKind, ChangeRecord, UnitState};
pub use compile::{EchoCompiler, UnitCompiler};
pub use config::{load_config, load_config_from_str, EngineConfig, CONFIG_FILE};
pub use detector::{changed_lines, create_snapshot, detect_changes, Snapshot};
pub use engine::IncrementalCompiler;
pub use error::{ConfigError, EngineError};
pub use graph::DependencyGraph;
pub use stats::EngineStats;
pub use strata_cache::{BackendError, CacheBackend};
