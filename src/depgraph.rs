//! C6 — module-level dependency graph (spec §3 "DependencyGraph").
//!
//! Grounded on `original_source/.../dependency/graph_builder.py` and
//! `models.py`: one node per file, one edge per resolved import,
//! transitive queries via BFS, and a lazily-computed cycle cache backed
//! here by `petgraph`'s Tarjan SCC rather than a hand-rolled one.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};

/// Import-edge-backed graph over file paths.
pub struct DependencyGraph {
    graph: DiGraph<Box<str>, ()>,
    index_of: HashMap<Box<str>, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index_of: HashMap::new(),
        }
    }

    fn node_index(&mut self, file_path: &str) -> NodeIndex {
        if let Some(idx) = self.index_of.get(file_path) {
            return *idx;
        }
        let idx = self.graph.add_node(file_path.into());
        self.index_of.insert(file_path.into(), idx);
        idx
    }

    /// Record that `from` imports `to`. Idempotent for the same pair.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let a = self.node_index(from);
        let b = self.node_index(to);
        if !self.graph.contains_edge(a, b) {
            self.graph.add_edge(a, b, ());
        }
    }

    pub fn contains(&self, file_path: &str) -> bool {
        self.index_of.contains_key(file_path)
    }

    /// Direct imports of `file_path`.
    pub fn get_dependencies(&self, file_path: &str) -> Vec<Box<str>> {
        let Some(&idx) = self.index_of.get(file_path) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect()
    }

    /// Files that import `file_path`.
    pub fn get_dependents(&self, file_path: &str) -> Vec<Box<str>> {
        let Some(&idx) = self.index_of.get(file_path) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect()
    }

    /// BFS transitive dependencies up to `max_depth` hops. Monotone in
    /// `max_depth` (spec §8 property 6).
    pub fn get_transitive_dependencies(&self, file_path: &str, max_depth: usize) -> HashSet<Box<str>> {
        self.bfs(file_path, max_depth, petgraph::Direction::Outgoing)
    }

    pub fn get_transitive_dependents(&self, file_path: &str, max_depth: usize) -> HashSet<Box<str>> {
        self.bfs(file_path, max_depth, petgraph::Direction::Incoming)
    }

    fn bfs(&self, start: &str, max_depth: usize, dir: petgraph::Direction) -> HashSet<Box<str>> {
        let Some(&start_idx) = self.index_of.get(start) else {
            return HashSet::new();
        };
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back((start_idx, 0usize));
        visited.insert(start_idx);

        let mut out = HashSet::new();
        while let Some((idx, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for neighbor in self.graph.neighbors_directed(idx, dir) {
                if visited.insert(neighbor) {
                    out.insert(self.graph[neighbor].clone());
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }
        out
    }

    /// Strongly-connected components with more than one member — circular
    /// import groups (spec §8 "circular import A→B→A").
    ///
    /// Recomputed per call: cheap relative to a build's parse/lower cost,
    /// and avoids tracking cache invalidation across `add_dependency`.
    pub fn cycles(&self) -> Vec<Vec<Box<str>>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| scc.into_iter().map(|idx| self.graph[idx].clone()).collect())
            .collect()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependents_is_inverse_of_dependencies() {
        let mut g = DependencyGraph::new();
        g.add_dependency("b.py", "a.py");
        assert_eq!(g.get_dependencies("b.py"), vec!["a.py".into()]);
        assert_eq!(g.get_dependents("a.py"), vec!["b.py".into()]);
    }

    #[test]
    fn transitive_dependencies_are_monotone_in_depth() {
        let mut g = DependencyGraph::new();
        g.add_dependency("c.py", "b.py");
        g.add_dependency("b.py", "a.py");
        let at1 = g.get_transitive_dependencies("c.py", 1);
        let at2 = g.get_transitive_dependencies("c.py", 2);
        assert!(at1.is_subset(&at2));
        assert!(at2.contains(&Box::from("a.py")));
    }

    #[test]
    fn detects_circular_import() {
        let mut g = DependencyGraph::new();
        g.add_dependency("a.py", "b.py");
        g.add_dependency("b.py", "a.py");
        let cycles = g.cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
    }
}
