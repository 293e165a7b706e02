//! File-scoped dependency inference between units.

use crate::unit::Unit;
use std::collections::HashMap;
use strata_common::UnitId;

/// Recomputes `dependencies` for every unit.
///
/// Each name defined by a top-level unit maps to all of its defining units.
/// A unit depends on every owner of a name it references, other than
/// itself. Cycles are not rejected.
pub fn link_dependencies(units: &mut [Unit]) {
    let owners = name_owners(units);
    for unit in units.iter_mut() {
        unit.dependencies.clear();
        for name in &unit.references {
            let Some(ids) = owners.get(name.as_str()) else {
                continue;
            };
            for id in ids {
                if *id != unit.id {
                    unit.dependencies.insert(id.clone());
                }
            }
        }
    }
}

/// Maps each name defined at the top level to the units defining it, in
/// source order.
pub fn name_owners(units: &[Unit]) -> HashMap<String, Vec<UnitId>> {
    let mut owners: HashMap<String, Vec<UnitId>> = HashMap::new();
    for unit in units.iter().filter(|u| u.parent.is_none()) {
        for name in &unit.definitions {
            owners.entry(name.clone()).or_default().push(unit.id.clone());
        }
    }
    owners
}
