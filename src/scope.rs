//! C9 — mode-driven scope expansion (spec §4.7).
//!
//! Ported from `original_source/.../scope_expander.py`'s `ScopeExpander`:
//! the escalation check (`SIGNATURE_CHANGED` forces FAST/BALANCED up to
//! DEEP) runs *before* the mode dispatch, matching the original's
//! ordering, not after. BALANCED's neighbor expansion is capped by
//! `balanced_max_neighbors` the same way the original caps it with
//! `ModeScopeLimit.BALANCED_MAX_NEIGHBORS` — the retrieved pack doesn't
//! carry that constant's numeric value, so the default here (50) is a
//! judgment call, not a ported number.

use crate::config::ScopeConfig;
use crate::depgraph::DependencyGraph;
use crate::impact::ImpactResult;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    Fast,
    Balanced,
    Deep,
    Bootstrap,
    Repair,
}

pub struct ScopeExpander<'a> {
    config: &'a ScopeConfig,
}

impl<'a> ScopeExpander<'a> {
    pub fn new(config: &'a ScopeConfig) -> Self {
        Self { config }
    }

    /// `changed_files`: the L0 change set. `deleted_files`: subset of
    /// `changed_files` that no longer exist, used by REPAIR. An empty
    /// returned set means "process everything" (BOOTSTRAP/whole-repo
    /// DEEP), matching the Python original's `set()` sentinel.
    pub fn expand_scope(
        &self,
        changed_files: &HashSet<Box<str>>,
        deleted_files: &HashSet<Box<str>>,
        mode: ScopeMode,
        total_files: Option<usize>,
        graph: &DependencyGraph,
        impact_result: Option<&ImpactResult>,
    ) -> HashSet<Box<str>> {
        let mode = if let Some(impact) = impact_result {
            if impact.has_signature_changes() && matches!(mode, ScopeMode::Fast | ScopeMode::Balanced) {
                tracing::warn!(
                    original_mode = ?mode,
                    "signature change detected, auto-escalating scope mode to DEEP"
                );
                ScopeMode::Deep
            } else {
                mode
            }
        } else {
            mode
        };

        match mode {
            ScopeMode::Fast => changed_files.clone(),
            ScopeMode::Balanced => self.expand_to_neighbors(
                changed_files,
                graph,
                self.config.balanced_neighbor_depth,
                self.config.balanced_max_neighbors,
            ),
            ScopeMode::Deep => {
                if let Some(impact) = impact_result {
                    if !impact.direct_affected.is_empty() || !impact.transitive_affected.is_empty() {
                        let mut result: HashSet<Box<str>> = changed_files.clone();
                        result.extend(impact.affected_files.iter().cloned());
                        return result;
                    }
                }
                match total_files {
                    Some(total) => {
                        let max_files = self
                            .config
                            .deep_subset_max_files
                            .min((total as f64 * self.config.deep_subset_max_percent) as usize);
                        self.expand_to_neighbors(changed_files, graph, usize::MAX, max_files)
                    }
                    None => HashSet::new(),
                }
            }
            ScopeMode::Bootstrap => HashSet::new(),
            ScopeMode::Repair => self.expand_for_repair(changed_files, deleted_files, graph),
        }
    }

    fn expand_to_neighbors(
        &self,
        changed_files: &HashSet<Box<str>>,
        graph: &DependencyGraph,
        depth: usize,
        max_files: usize,
    ) -> HashSet<Box<str>> {
        let mut result: HashSet<Box<str>> = changed_files.clone();
        let mut visited: HashSet<Box<str>> = changed_files.clone();
        let mut queue: VecDeque<(Box<str>, usize)> = changed_files.iter().map(|f| (f.clone(), 0)).collect();

        while let Some((file_path, current_depth)) = queue.pop_front() {
            if result.len() >= max_files {
                break;
            }
            if current_depth >= depth {
                continue;
            }

            let mut neighbors: Vec<Box<str>> = graph.get_dependencies(&file_path);
            neighbors.extend(graph.get_dependents(&file_path));

            for neighbor in neighbors {
                if visited.insert(neighbor.clone()) {
                    result.insert(neighbor.clone());
                    queue.push_back((neighbor, current_depth + 1));
                    if result.len() >= max_files {
                        break;
                    }
                }
            }
        }
        result
    }

    fn expand_for_repair(
        &self,
        changed_files: &HashSet<Box<str>>,
        deleted_files: &HashSet<Box<str>>,
        graph: &DependencyGraph,
    ) -> HashSet<Box<str>> {
        let mut result: HashSet<Box<str>> = changed_files.clone();
        for deleted in deleted_files {
            result.extend(graph.get_dependents(deleted));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::ImpactResult;

    fn cfg() -> ScopeConfig {
        ScopeConfig {
            balanced_neighbor_depth: 1,
            balanced_max_neighbors: 50,
            deep_subset_max_files: 5_000,
            deep_subset_max_percent: 0.3,
        }
    }

    #[test]
    fn fast_mode_returns_only_changed_files() {
        let config = cfg();
        let expander = ScopeExpander::new(&config);
        let mut changed = HashSet::new();
        changed.insert(Box::from("a.py"));
        let graph = DependencyGraph::new();
        let result = expander.expand_scope(&changed, &HashSet::new(), ScopeMode::Fast, None, &graph, None);
        assert_eq!(result, changed);
    }

    #[test]
    fn balanced_mode_escalates_to_deep_on_signature_change() {
        let config = cfg();
        let expander = ScopeExpander::new(&config);
        let mut changed = HashSet::new();
        changed.insert(Box::from("a.py"));
        let graph = DependencyGraph::new();

        let mut impact = ImpactResult::default();
        impact.changed_symbols.push(crate::impact::SymbolChange {
            fqn: "a.add".into(),
            node_id: crate::types::Id(1),
            change_type: crate::impact::ChangeType::SignatureChanged,
            file_path: "a.py".into(),
        });
        impact.affected_files.insert(Box::from("b.py"));
        impact.direct_affected.insert(crate::types::Id(2));

        let result = expander.expand_scope(
            &changed,
            &HashSet::new(),
            ScopeMode::Balanced,
            None,
            &graph,
            Some(&impact),
        );
        assert!(result.contains(&Box::from("b.py") as &Box<str>));
    }

    #[test]
    fn balanced_mode_caps_at_max_neighbors() {
        let mut config = cfg();
        config.balanced_max_neighbors = 2;
        let expander = ScopeExpander::new(&config);
        let mut graph = DependencyGraph::new();
        graph.add_dependency("root.py", "a.py");
        graph.add_dependency("root.py", "b.py");
        graph.add_dependency("root.py", "c.py");
        let mut changed = HashSet::new();
        changed.insert(Box::from("root.py"));
        let result = expander.expand_scope(&changed, &HashSet::new(), ScopeMode::Balanced, None, &graph, None);
        assert!(result.len() <= 2, "neighbor expansion must respect balanced_max_neighbors");
    }

    #[test]
    fn balanced_mode_expands_one_hop() {
        let config = cfg();
        let expander = ScopeExpander::new(&config);
        let mut graph = DependencyGraph::new();
        graph.add_dependency("b.py", "a.py");
        let mut changed = HashSet::new();
        changed.insert(Box::from("b.py"));
        let result = expander.expand_scope(&changed, &HashSet::new(), ScopeMode::Balanced, None, &graph, None);
        assert!(result.contains(&Box::from("a.py") as &Box<str>));
    }
}
