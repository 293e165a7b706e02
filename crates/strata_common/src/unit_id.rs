//! Stable identifiers for compilation units.

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Deterministic identifier of a compilation unit.
///
/// Derived from the owning file, the unit's line span, and a prefix of its
/// normalized content hash: `"{file}:{start}:{end}:{hash8}"`. Editing a unit,
/// or moving it to different lines, yields a different id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Builds the id for a unit spanning `start_line..=end_line` of `file`.
    pub fn new(file: &str, start_line: u32, end_line: u32, hash: &ContentHash) -> Self {
        Self(format!("{file}:{start_line}:{end_line}:{}", hash.short()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitId({})", self.0)
    }
}

impl Borrow<str> for UnitId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for UnitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for UnitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
