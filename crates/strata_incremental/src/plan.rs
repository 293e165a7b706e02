//! Works out which units of a new generation must recompile.

use crate::change::{ChangeKind, ChangeRecord, UnitState};
use crate::detector::{align, LineAlignment, Snapshot};
use crate::graph::DependencyGraph;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use strata_analyzer::{Unit, UnitKind};
use strata_common::UnitId;

/// The outcome of comparing two generations of a file.
#[derive(Debug, Default)]
pub(crate) struct Plan {
    /// Records sorted by line.
    pub(crate) records: Vec<ChangeRecord>,
    /// New units that must recompile, with their new state.
    pub(crate) marks: HashMap<UnitId, UnitState>,
    /// New units mapped to the identical old unit they continue.
    pub(crate) origins: HashMap<UnitId, UnitId>,
    /// Old units that no new unit continues.
    pub(crate) superseded: Vec<UnitId>,
}

/// Every unit of a file seen for the first time is added.
pub(crate) fn first_build(new: &Snapshot) -> Plan {
    let mut plan = Plan::default();
    for unit in new.units.values() {
        plan.marks.insert(unit.id.clone(), UnitState::Added);
        plan.records.push(ChangeRecord {
            unit_id: unit.id.clone(),
            kind: ChangeKind::Added,
            old_lines: None,
            new_lines: Some(unit.line_range()),
            reason: "first analysis".to_string(),
        });
    }
    plan
}

/// Compares `new` against the previous generation `old`.
///
/// A new unit continues an old one when none of its lines changed and the
/// aligned old lines hold an old unit of the same kind and content. Units
/// without such an origin are modified. Names defined by superseded old
/// units, and the dependency graph, spread the change to their users.
/// Finally any affected unit inside a function or class pulls in that scope
/// and everything the scope encloses.
pub(crate) fn plan_update(old: &Snapshot, new: &Snapshot) -> Plan {
    let alignment = align(&old.line_hashes, &new.line_hashes);
    let changed: HashSet<u32> = alignment.changed_lines().into_iter().collect();

    let mut by_span: HashMap<(u32, u32, UnitKind), Vec<&Unit>> = HashMap::new();
    for unit in old.units.values() {
        by_span
            .entry((unit.start_line, unit.end_line, unit.kind))
            .or_default()
            .push(unit);
    }

    let mut marker = Marker::default();
    let mut origins = HashMap::new();
    let mut continued: HashSet<&UnitId> = HashSet::new();
    for unit in new.units.values() {
        let touched = (unit.start_line..=unit.end_line).any(|line| changed.contains(&line));
        let origin = if touched {
            None
        } else {
            find_origin(&alignment, &by_span, &continued, unit)
        };
        match origin {
            Some(prev) => {
                continued.insert(&prev.id);
                origins.insert(unit.id.clone(), prev.id.clone());
            }
            None => {
                marker.mark(&unit.id, UnitState::Modified, "content changed");
            }
        }
    }

    let superseded: Vec<&Unit> = old.units.values().filter(|u| !continued.contains(&u.id)).collect();
    let removed: HashSet<&str> = superseded
        .iter()
        .copied()
        .filter(|u| u.parent.is_none())
        .flat_map(|u| u.definitions.iter().map(String::as_str))
        .collect();
    if !removed.is_empty() {
        for unit in new.units.values() {
            if unit.references.iter().any(|name| removed.contains(name.as_str())) {
                marker.mark(&unit.id, UnitState::Affected, "references a changed definition");
            }
        }
    }

    let graph = DependencyGraph::build(new.units.values());
    if graph.has_cycle() {
        tracing::debug!(file = %new.file_path, "dependency cycle present, whole cycle will be affected");
    }
    let seeds = marker.ids();
    for id in graph.dependents_of(&seeds) {
        marker.mark(&id, UnitState::Affected, "depends on a changed unit");
    }
    expand_to_scopes(new, &graph, &mut marker);

    let mut records = Vec::new();
    for unit in new.units.values() {
        let Some(&(state, reason)) = marker.marks.get(&unit.id) else {
            continue;
        };
        let kind = match state {
            UnitState::Affected => ChangeKind::Affected,
            _ => ChangeKind::Modified,
        };
        let old_lines = origins
            .get(&unit.id)
            .and_then(|id| old.units.get(id))
            .map(Unit::line_range)
            .or_else(|| alignment.old_span(unit.start_line, unit.end_line));
        records.push(ChangeRecord {
            unit_id: unit.id.clone(),
            kind,
            old_lines,
            new_lines: Some(unit.line_range()),
            reason: reason.to_string(),
        });
    }
    for unit in &superseded {
        if alignment.is_pure_deletion(unit.start_line, unit.end_line) {
            records.push(ChangeRecord {
                unit_id: unit.id.clone(),
                kind: ChangeKind::Deleted,
                old_lines: Some(unit.line_range()),
                new_lines: None,
                reason: "unit deleted".to_string(),
            });
        }
    }
    records.sort_by_key(ChangeRecord::sort_line);

    tracing::debug!(
        file = %new.file_path,
        changed_lines = changed.len(),
        marked = marker.marks.len(),
        superseded = superseded.len(),
        "planned update"
    );

    Plan {
        records,
        marks: marker.marks.into_iter().map(|(id, (state, _))| (id, state)).collect(),
        origins,
        superseded: superseded.into_iter().map(|u| u.id.clone()).collect(),
    }
}

fn find_origin<'a>(
    alignment: &LineAlignment,
    by_span: &HashMap<(u32, u32, UnitKind), Vec<&'a Unit>>,
    continued: &HashSet<&UnitId>,
    unit: &Unit,
) -> Option<&'a Unit> {
    let (start, end) = alignment.old_span(unit.start_line, unit.end_line)?;
    if end - start != unit.end_line - unit.start_line {
        return None;
    }
    by_span
        .get(&(start, end, unit.kind))?
        .iter()
        .copied()
        .find(|prev| prev.content_hash == unit.content_hash && !continued.contains(&prev.id))
}

/// Pulls enclosing function and class units, and everything they enclose,
/// into the marked set, then spreads any newly marked unit to its
/// dependents. Repeats until nothing changes.
fn expand_to_scopes(new: &Snapshot, graph: &DependencyGraph, marker: &mut Marker) {
    const REASON: &str = "enclosing scope changed";
    let mut frontier = marker.ids();
    while !frontier.is_empty() {
        let mut pulled = Vec::new();
        for id in &frontier {
            let Some(unit) = new.units.get(id) else {
                continue;
            };
            let scopes = new
                .units
                .values()
                .filter(|s| s.kind.is_scope() && (s.id == unit.id || s.encloses(unit)));
            for scope in scopes {
                if marker.mark(&scope.id, UnitState::Affected, REASON) {
                    pulled.push(scope.id.clone());
                }
                for inner in new.units.values().filter(|u| scope.encloses(u)) {
                    if marker.mark(&inner.id, UnitState::Affected, REASON) {
                        pulled.push(inner.id.clone());
                    }
                }
            }
        }
        let mut reached = Vec::new();
        for id in graph.dependents_of(&pulled) {
            if marker.mark(&id, UnitState::Affected, "depends on a changed unit") {
                reached.push(id);
            }
        }
        pulled.extend(reached);
        frontier = pulled;
    }
}

/// Marked units in marking order. The first mark of a unit wins.
#[derive(Default)]
struct Marker {
    marks: IndexMap<UnitId, (UnitState, &'static str)>,
}

impl Marker {
    fn mark(&mut self, id: &UnitId, state: UnitState, reason: &'static str) -> bool {
        if self.marks.contains_key(id) {
            return false;
        }
        self.marks.insert(id.clone(), (state, reason));
        true
    }

    fn ids(&self) -> Vec<UnitId> {
        self.marks.keys().cloned().collect()
    }
}
