//! Source analyzer for the Strata incremental build engine.
//!
//! Decomposes a Python file into compilation units: the smallest pieces
//! that can be recompiled on their own. Each unit records the names it
//! reads and binds, and units are linked by file-scoped dependencies so
//! that a change can be propagated to its dependents.
//!
//! The primary path parses the file with [`strata_python`]. Files that do
//! not parse are split by an indentation-driven line scanner, so analysis
//! never fails on malformed input.

#![warn(missing_docs)]

pub mod analyzer;
pub mod deps;
pub mod error;
mod fallback;
pub mod unit;

pub use analyzer::{analyze_file, analyze_source};
pub use deps::link_dependencies;
pub use error::AnalyzeError;
pub use unit::{units_in_range, Unit, UnitKind};
