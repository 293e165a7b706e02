//! Persistent caching of per-unit compiler output for the Strata
//! incremental build engine.
//!
//! # Architecture
//!
//! - [`CacheBackend`] is the contract the orchestrator programs against.
//!   Outputs are keyed by unit id and validated against the content hash
//!   they were compiled from.
//! - [`UnitCache`] is the simple implementation: an unbounded JSON map plus
//!   a compile history.
//! - [`SmartCache`] adds count and size caps with score-based eviction,
//!   access-pattern prediction, an event log, and a background worker that
//!   compiles predicted units before they are requested.
//!
//! Both caches persist as pretty-printed JSON files in a cache directory
//! and start cold when those files cannot be read.

#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod entry;
pub mod error;
pub mod event;
pub mod pattern;
mod persist;
pub mod smart;
pub mod unit_cache;
mod warmup;

pub use backend::{BackendError, CacheBackend, CacheStats, SourceCompiler};
pub use config::CacheConfig;
pub use entry::{CacheEntry, EntryMeta, HotEntry};
pub use error::CacheError;
pub use event::{CacheEvent, CacheEventKind};
pub use pattern::AccessPattern;
pub use smart::SmartCache;
pub use unit_cache::{CompileAction, CompileRecord, UnitCache};
