//! Dependency graph over one generation of units.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};
use strata_analyzer::Unit;
use strata_common::UnitId;

/// Directed graph with an edge from every unit to each unit that depends
/// on it, so walking outgoing edges finds dependents.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<UnitId, ()>,
    nodes: HashMap<UnitId, NodeIndex>,
}

impl DependencyGraph {
    /// Builds the graph from the units' recorded dependencies. Dependencies
    /// on ids outside `units` are ignored.
    pub fn build<'a>(units: impl IntoIterator<Item = &'a Unit>) -> Self {
        let units: Vec<&Unit> = units.into_iter().collect();
        let mut graph = DiGraph::with_capacity(units.len(), 0);
        let mut nodes = HashMap::with_capacity(units.len());
        for unit in &units {
            nodes.insert(unit.id.clone(), graph.add_node(unit.id.clone()));
        }
        for unit in &units {
            let dependent = nodes[&unit.id];
            for dep in &unit.dependencies {
                if let Some(&dependency) = nodes.get(dep) {
                    graph.update_edge(dependency, dependent, ());
                }
            }
        }
        Self { graph, nodes }
    }

    /// Number of units in the graph.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no units.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Whether any dependency cycle exists.
    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Every unit that transitively depends on one of `seeds`, in
    /// breadth-first order. Seeds are never included, even when a cycle
    /// leads back to them.
    pub fn dependents_of<'a>(&self, seeds: impl IntoIterator<Item = &'a UnitId>) -> Vec<UnitId> {
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        for seed in seeds {
            if let Some(&node) = self.nodes.get(seed) {
                if visited.insert(node) {
                    queue.push_back(node);
                }
            }
        }

        let mut reached = Vec::new();
        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if visited.insert(next) {
                    reached.push(self.graph[next].clone());
                    queue.push_back(next);
                }
            }
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_analyzer::analyze_source;

    fn names(units: &[Unit], ids: &[UnitId]) -> Vec<String> {
        ids.iter()
            .map(|id| units.iter().find(|u| &u.id == id).map(|u| u.name.clone()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn transitive_dependents() {
        let src = "x = 10\n\ndef get_x():\n    return x\n\ndef use_x():\n    return get_x()\n\ny = 1\n";
        let units = analyze_source(src, "m.py");
        let graph = DependencyGraph::build(&units);
        assert_eq!(graph.len(), 4);
        assert!(!graph.has_cycle());
        let reached = graph.dependents_of([&units[0].id]);
        assert_eq!(names(&units, &reached), vec!["get_x", "use_x"]);
    }

    #[test]
    fn cycles_terminate_and_include_everything() {
        let src = "def a():\n    return b()\n\ndef b():\n    return a()\n";
        let units = analyze_source(src, "c.py");
        let graph = DependencyGraph::build(&units);
        assert!(graph.has_cycle());
        let reached = graph.dependents_of([&units[0].id]);
        assert_eq!(names(&units, &reached), vec!["b"]);
        let both = graph.dependents_of([&units[0].id, &units[1].id]);
        assert!(both.is_empty());
    }

    #[test]
    fn unknown_seeds_are_ignored() {
        let units = analyze_source("x = 1\n", "m.py");
        let graph = DependencyGraph::build(&units);
        assert!(graph.dependents_of([&UnitId::from("other.py:1:1:00000000")]).is_empty());
        assert!(DependencyGraph::default().is_empty());
    }
}
