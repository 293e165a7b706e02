//! Line-level and unit-level change detection between two versions of a
//! file.

use crate::change::{ChangeKind, ChangeRecord};
use indexmap::IndexMap;
use strata_analyzer::Unit;
use strata_common::{now_millis, ContentHash, UnitId};

/// Immutable record of one version of a file.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The file the snapshot describes.
    pub file_path: String,
    /// Hash of the raw file text.
    pub content_hash: ContentHash,
    /// Hash of every line, trimmed. Blank lines are [`ContentHash::BLANK`].
    pub line_hashes: Vec<ContentHash>,
    /// Units of this version in source order.
    pub units: IndexMap<UnitId, Unit>,
    /// Creation time in Unix milliseconds.
    pub created_at: u64,
}

impl Snapshot {
    /// Number of lines in the snapshot.
    pub fn line_count(&self) -> usize {
        self.line_hashes.len()
    }
}

/// Hashes `text` line by line. The snapshot starts with no units.
pub fn create_snapshot(file_path: &str, text: &str) -> Snapshot {
    Snapshot {
        file_path: file_path.to_string(),
        content_hash: ContentHash::from_bytes(text.as_bytes()),
        line_hashes: text.lines().map(ContentHash::of_line).collect(),
        units: IndexMap::new(),
        created_at: now_millis(),
    }
}

/// Correspondence between the lines of two versions.
///
/// `pairs` holds 0-based `(old, new)` indices of the longest common
/// subsequence of line hashes, ascending in both coordinates. All public
/// line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineAlignment {
    /// Matched `(old, new)` line indices, 0-based.
    pub pairs: Vec<(usize, usize)>,
    new_to_old: Vec<Option<u32>>,
    old_to_new: Vec<Option<u32>>,
}

impl LineAlignment {
    /// New lines with no counterpart in the old version.
    pub fn changed_lines(&self) -> Vec<u32> {
        self.new_to_old
            .iter()
            .enumerate()
            .filter(|(_, old)| old.is_none())
            .map(|(i, _)| i as u32 + 1)
            .collect()
    }

    /// The old line matched to new line `line`.
    pub fn old_line(&self, line: u32) -> Option<u32> {
        let index = (line as usize).checked_sub(1)?;
        self.new_to_old.get(index).copied().flatten()
    }

    /// The new line matched to old line `line`.
    pub fn new_line(&self, line: u32) -> Option<u32> {
        let index = (line as usize).checked_sub(1)?;
        self.old_to_new.get(index).copied().flatten()
    }

    /// Maps a new span to the old span, if both ends are matched.
    pub fn old_span(&self, start: u32, end: u32) -> Option<(u32, u32)> {
        Some((self.old_line(start)?, self.old_line(end)?))
    }

    /// Whether old lines `start..=end` were removed outright: none of them
    /// is matched, and no new line was inserted in their place.
    pub fn is_pure_deletion(&self, start: u32, end: u32) -> bool {
        if (start..=end).any(|line| self.new_line(line).is_some()) {
            return false;
        }
        let before = (1..start).rev().find_map(|line| self.new_line(line)).unwrap_or(0);
        let after = (end + 1..=self.old_to_new.len() as u32)
            .find_map(|line| self.new_line(line))
            .unwrap_or(self.new_to_old.len() as u32 + 1);
        after == before + 1
    }
}

/// Aligns two line-hash sequences with a longest common subsequence.
///
/// Uses the O(n·m) table. Back-tracking takes the diagonal on a match,
/// moves up in the old sequence when that keeps a strictly longer
/// subsequence, and left otherwise.
pub fn align(old: &[ContentHash], new: &[ContentHash]) -> LineAlignment {
    let (m, n) = (old.len(), new.len());
    let mut dp = vec![vec![0u32; n + 1]; m + 1];
    for i in 1..=m {
        for j in 1..=n {
            dp[i][j] = if old[i - 1] == new[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }

    let mut pairs = Vec::with_capacity(dp[m][n] as usize);
    let (mut i, mut j) = (m, n);
    while i > 0 && j > 0 {
        if old[i - 1] == new[j - 1] {
            pairs.push((i - 1, j - 1));
            i -= 1;
            j -= 1;
        } else if dp[i - 1][j] > dp[i][j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    pairs.reverse();

    let mut new_to_old = vec![None; n];
    let mut old_to_new = vec![None; m];
    for &(o, nw) in &pairs {
        new_to_old[nw] = Some(o as u32 + 1);
        old_to_new[o] = Some(nw as u32 + 1);
    }
    LineAlignment {
        pairs,
        new_to_old,
        old_to_new,
    }
}

/// Sorted 1-based numbers of the lines of `new` that are not part of the
/// longest common subsequence with `old`.
pub fn changed_lines(old: &Snapshot, new: &Snapshot) -> Vec<u32> {
    align(&old.line_hashes, &new.line_hashes).changed_lines()
}

/// Compares the unit maps of two snapshots by id.
///
/// Ids only in `old` are deleted, ids only in `new` are added, and ids in
/// both whose content hash differs are modified. Records come out sorted by
/// line.
pub fn detect_changes(old: &Snapshot, new: &Snapshot) -> Vec<ChangeRecord> {
    let mut records = Vec::new();
    for (id, unit) in &old.units {
        if !new.units.contains_key(id) {
            records.push(ChangeRecord {
                unit_id: id.clone(),
                kind: ChangeKind::Deleted,
                old_lines: Some(unit.line_range()),
                new_lines: None,
                reason: "unit deleted".to_string(),
            });
        }
    }
    for (id, unit) in &new.units {
        match old.units.get(id) {
            None => records.push(ChangeRecord {
                unit_id: id.clone(),
                kind: ChangeKind::Added,
                old_lines: None,
                new_lines: Some(unit.line_range()),
                reason: "unit added".to_string(),
            }),
            Some(prev) if prev.content_hash != unit.content_hash => records.push(ChangeRecord {
                unit_id: id.clone(),
                kind: ChangeKind::Modified,
                old_lines: Some(prev.line_range()),
                new_lines: Some(unit.line_range()),
                reason: "content changed".to_string(),
            }),
            Some(_) => {}
        }
    }
    records.sort_by_key(ChangeRecord::sort_line);
    records
}
