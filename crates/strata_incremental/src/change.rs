//! Change records and per-unit lifecycle states.

use serde::Serialize;
use std::fmt;
use strata_common::UnitId;

/// Where a live unit is in its compile lifecycle.
///
/// `Unknown` units were registered without analysis history. A unit moves
/// to `Added`, `Modified` or `Affected` when an update marks it, and to
/// `Unchanged` once its output is compiled or taken from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnitState {
    /// Registered, nothing known yet.
    Unknown,
    /// Output is current.
    Unchanged,
    /// First seen in the latest update of a new file.
    Added,
    /// Its own lines changed.
    Modified,
    /// Something it depends on, or its enclosing scope, changed.
    Affected,
}

/// The kind of change a [`ChangeRecord`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeKind {
    /// A unit of a file seen for the first time.
    Added,
    /// A unit whose own lines changed.
    Modified,
    /// A unit that must recompile because of another change.
    Affected,
    /// A unit that no longer exists.
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Affected => "affected",
            ChangeKind::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// One unit-level change reported by an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    /// The unit the record is about. For deletions this is the old id.
    pub unit_id: UnitId,
    /// What happened.
    pub kind: ChangeKind,
    /// Line span in the previous version, if the unit existed there.
    pub old_lines: Option<(u32, u32)>,
    /// Line span in the current version, if the unit exists there.
    pub new_lines: Option<(u32, u32)>,
    /// Short human-readable cause.
    pub reason: String,
}

impl ChangeRecord {
    /// The line used to order records: the new start line, or the old one
    /// for deletions.
    pub fn sort_line(&self) -> u32 {
        self.new_lines.or(self.old_lines).map_or(0, |(start, _)| start)
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.unit_id, self.reason)
    }
}
