//! Shared foundational types used across the Strata incremental build engine.
//!
//! This crate provides content hashing, compilation unit identifiers, and a
//! wall-clock helper shared by the analyzer, cache, and orchestrator crates.

#![warn(missing_docs)]

pub mod clock;
pub mod hash;
pub mod unit_id;

pub use clock::now_millis;
pub use hash::{ContentHash, ParseHashError};
pub use unit_id::UnitId;
