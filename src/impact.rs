//! C8 — symbol-level impact analysis (spec §4.6).
//!
//! Ported near-verbatim from
//! `original_source/.../graph/impact_analyzer.py`'s `GraphImpactAnalyzer`:
//! direct affected via `called_by`/`imported_by`/incoming
//! `REFERENCES_SYMBOL`/`INHERITS` edges, then a BFS over `called_by` for
//! transitive affected with path tracking, then a `TYPE_CHANGED`/
//! `SIGNATURE_CHANGED` pass over `type_users`.

use crate::config::ImpactConfig;
use crate::semgraph::SemanticGraph;
use crate::types::{EdgeKind, Id};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Deleted,
    SignatureChanged,
    BodyChanged,
    TypeChanged,
    Renamed,
}

#[derive(Debug, Clone)]
pub struct SymbolChange {
    pub fqn: Box<str>,
    pub node_id: Id,
    pub change_type: ChangeType,
    pub file_path: Box<str>,
}

#[derive(Debug, Default)]
pub struct ImpactResult {
    pub changed_symbols: Vec<SymbolChange>,
    pub direct_affected: HashSet<Id>,
    pub transitive_affected: HashSet<Id>,
    pub affected_files: HashSet<Box<str>>,
    pub impact_chains: HashMap<Id, Vec<Id>>,
}

impl ImpactResult {
    pub fn total_affected_count(&self) -> usize {
        self.direct_affected.union(&self.transitive_affected).count()
    }

    pub fn has_signature_changes(&self) -> bool {
        self.changed_symbols
            .iter()
            .any(|s| s.change_type == ChangeType::SignatureChanged)
    }
}

pub struct ImpactAnalyzer<'a> {
    config: &'a ImpactConfig,
}

impl<'a> ImpactAnalyzer<'a> {
    pub fn new(config: &'a ImpactConfig) -> Self {
        Self { config }
    }

    /// Analyze the impact of `changed_symbols` against `graph` plus an
    /// incoming-edge lookup for `REFERENCES_SYMBOL`/`INHERITS` edges
    /// (`incoming`, keyed by target id), and a `node_id -> file_path` map.
    pub fn analyze(
        &self,
        graph: &SemanticGraph,
        incoming: &HashMap<Id, Vec<(Id, EdgeKind)>>,
        node_file: &HashMap<Id, Box<str>>,
        changed_symbols: Vec<SymbolChange>,
    ) -> ImpactResult {
        let mut direct_affected: HashSet<Id> = HashSet::new();
        let mut transitive_affected: HashSet<Id> = HashSet::new();
        let mut impact_chains: HashMap<Id, Vec<Id>> = HashMap::new();

        for symbol in &changed_symbols {
            let direct = self.find_direct_affected(graph, incoming, symbol);
            direct_affected.extend(direct.iter().copied());

            let (transitive, chains) = self.find_transitive_affected(graph, symbol.node_id, &direct);
            transitive_affected.extend(transitive);
            impact_chains.extend(chains);

            if matches!(
                symbol.change_type,
                ChangeType::TypeChanged | ChangeType::SignatureChanged
            ) {
                let type_users = self.find_type_users(graph, incoming, symbol.node_id);
                direct_affected.extend(type_users);
            }
        }

        transitive_affected.retain(|id| !direct_affected.contains(id));

        let mut affected_files = HashSet::new();
        for id in direct_affected.iter().chain(transitive_affected.iter()) {
            if let Some(path) = node_file.get(id) {
                if self.config.include_test_files || !is_test_file(path) {
                    affected_files.insert(path.clone());
                }
            }
        }

        ImpactResult {
            changed_symbols,
            direct_affected,
            transitive_affected,
            affected_files,
            impact_chains,
        }
    }

    fn find_direct_affected(
        &self,
        graph: &SemanticGraph,
        incoming: &HashMap<Id, Vec<(Id, EdgeKind)>>,
        symbol: &SymbolChange,
    ) -> HashSet<Id> {
        let node_id = symbol.node_id;
        let mut affected: HashSet<Id> = HashSet::new();

        affected.extend(graph.called_by(node_id).iter().copied());

        for (source_id, kind) in incoming.get(&node_id).into_iter().flatten() {
            if *kind == EdgeKind::ReferencesSymbol {
                affected.insert(*source_id);
            }
        }

        affected.extend(graph.imported_by(node_id).iter().copied());

        if matches!(symbol.change_type, ChangeType::Deleted | ChangeType::SignatureChanged) {
            for (source_id, kind) in incoming.get(&node_id).into_iter().flatten() {
                if *kind == EdgeKind::Inherits {
                    affected.insert(*source_id);
                }
            }
        }

        affected
    }

    /// BFS over `called_by`, bounded by `max_depth`/`max_affected`,
    /// recording the path from `start_node_id` through each hop.
    fn find_transitive_affected(
        &self,
        graph: &SemanticGraph,
        start_node_id: Id,
        direct_affected: &HashSet<Id>,
    ) -> (HashSet<Id>, HashMap<Id, Vec<Id>>) {
        let mut transitive = HashSet::new();
        let mut chains: HashMap<Id, Vec<Id>> = HashMap::new();

        let mut visited: HashSet<Id> = direct_affected.clone();
        visited.insert(start_node_id);

        let mut queue: VecDeque<(Id, usize, Vec<Id>)> = direct_affected
            .iter()
            .map(|&id| (id, 1, vec![start_node_id, id]))
            .collect();

        while let Some((node_id, depth, path)) = queue.pop_front() {
            if transitive.len() >= self.config.max_affected {
                tracing::warn!(max_affected = self.config.max_affected, "transitive impact analysis truncated");
                break;
            }
            if depth >= self.config.max_depth {
                continue;
            }

            for &caller_id in graph.called_by(node_id) {
                if !visited.insert(caller_id) {
                    continue;
                }
                transitive.insert(caller_id);
                let mut new_path = path.clone();
                new_path.push(caller_id);
                chains.insert(caller_id, new_path.clone());
                queue.push_back((caller_id, depth + 1, new_path));
            }
        }

        (transitive, chains)
    }

    fn find_type_users(
        &self,
        graph: &SemanticGraph,
        incoming: &HashMap<Id, Vec<(Id, EdgeKind)>>,
        type_node_id: Id,
    ) -> HashSet<Id> {
        let mut users: HashSet<Id> = graph.type_users(type_node_id).iter().copied().collect();
        for (source_id, kind) in incoming.get(&type_node_id).into_iter().flatten() {
            if *kind == EdgeKind::ReferencesType {
                users.insert(*source_id);
            }
        }
        users
    }
}

fn is_test_file(path: &str) -> bool {
    const INDICATORS: &[&str] = &[
        "/tests/", "/test/", "_test.py", "_test.ts", "_test.go", ".test.js", ".test.ts", ".spec.js", ".spec.ts",
        "test_",
    ];
    INDICATORS.iter().any(|i| path.contains(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Edge;

    fn id(n: u128) -> Id {
        Id(n)
    }

    #[test]
    fn signature_change_reaches_direct_caller() {
        let mut graph = SemanticGraph::new();
        graph.index_edge(&Edge::new(id(2), id(1), EdgeKind::Calls)); // b.main calls a.add
        let config = ImpactConfig {
            max_depth: 5,
            max_affected: 1000,
            include_test_files: false,
        };
        let analyzer = ImpactAnalyzer::new(&config);
        let mut node_file = HashMap::new();
        node_file.insert(id(1), "a.py".into());
        node_file.insert(id(2), "b.py".into());
        let change = SymbolChange {
            fqn: "a.add".into(),
            node_id: id(1),
            change_type: ChangeType::SignatureChanged,
            file_path: "a.py".into(),
        };
        let result = analyzer.analyze(&graph, &HashMap::new(), &node_file, vec![change]);
        assert!(result.direct_affected.contains(&id(2)));
        assert!(result.affected_files.contains(&Box::from("b.py")));
    }

    #[test]
    fn transitive_affected_excludes_direct() {
        let mut graph = SemanticGraph::new();
        graph.index_edge(&Edge::new(id(2), id(1), EdgeKind::Calls));
        graph.index_edge(&Edge::new(id(3), id(2), EdgeKind::Calls));
        let config = ImpactConfig {
            max_depth: 5,
            max_affected: 1000,
            include_test_files: false,
        };
        let analyzer = ImpactAnalyzer::new(&config);
        let change = SymbolChange {
            fqn: "a.add".into(),
            node_id: id(1),
            change_type: ChangeType::BodyChanged,
            file_path: "a.py".into(),
        };
        let result = analyzer.analyze(&graph, &HashMap::new(), &HashMap::new(), vec![change]);
        assert!(result.direct_affected.contains(&id(2)));
        assert!(result.transitive_affected.contains(&id(3)));
        assert!(!result.transitive_affected.contains(&id(2)));
        assert_eq!(result.impact_chains.get(&id(3)), Some(&vec![id(1), id(2), id(3)]));
    }
}
