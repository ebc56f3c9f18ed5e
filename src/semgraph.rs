//! C7 — symbol-level semantic graph (spec §3 "SemanticGraph").
//!
//! Non-owning: holds only node ids, borrowing node data from the
//! `IRDocument`s that own it (spec §3 "Ownership"). Built by scanning
//! every resolved `CALLS`/`REFERENCES_SYMBOL`/`IMPORTS`/`REFERENCES_TYPE`
//! edge across all documents in a snapshot.

use crate::types::{EdgeKind, Id};
use std::collections::HashMap;

/// `called_by`/`imported_by`/`type_users` indexes over resolved edges.
#[derive(Debug, Default)]
pub struct SemanticGraph {
    called_by: HashMap<Id, Vec<Id>>,
    imported_by: HashMap<Id, Vec<Id>>,
    type_users: HashMap<Id, Vec<Id>>,
    referenced_by: HashMap<Id, Vec<Id>>,
    inherited_by: HashMap<Id, Vec<Id>>,
}

impl SemanticGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one resolved edge. Unresolved edges (`is_unresolved()`) are
    /// skipped — they carry no usable `target_id` yet.
    pub fn index_edge(&mut self, edge: &crate::types::Edge) {
        if edge.is_unresolved() {
            return;
        }
        match edge.kind {
            EdgeKind::Calls => self
                .called_by
                .entry(edge.target_id)
                .or_default()
                .push(edge.source_id),
            EdgeKind::Imports | EdgeKind::ImportModule | EdgeKind::ImportFrom | EdgeKind::ImportWildcard => self
                .imported_by
                .entry(edge.target_id)
                .or_default()
                .push(edge.source_id),
            EdgeKind::ReferencesType => self
                .type_users
                .entry(edge.target_id)
                .or_default()
                .push(edge.source_id),
            EdgeKind::ReferencesSymbol | EdgeKind::References => self
                .referenced_by
                .entry(edge.target_id)
                .or_default()
                .push(edge.source_id),
            EdgeKind::Inherits => self
                .inherited_by
                .entry(edge.target_id)
                .or_default()
                .push(edge.source_id),
            _ => {}
        }
    }

    pub fn index_document(&mut self, doc: &crate::irdoc::IRDocument) {
        for edge in &doc.edges {
            self.index_edge(edge);
        }
    }

    pub fn called_by(&self, id: Id) -> &[Id] {
        self.called_by.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn imported_by(&self, id: Id) -> &[Id] {
        self.imported_by.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn type_users(&self, id: Id) -> &[Id] {
        self.type_users.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn referenced_by(&self, id: Id) -> &[Id] {
        self.referenced_by.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn inherited_by(&self, id: Id) -> &[Id] {
        self.inherited_by.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Edge;

    fn id(n: u128) -> Id {
        Id(n)
    }

    #[test]
    fn indexes_resolved_calls_edge() {
        let mut graph = SemanticGraph::new();
        let edge = Edge::new(id(1), id(2), EdgeKind::Calls);
        graph.index_edge(&edge);
        assert_eq!(graph.called_by(id(2)), &[id(1)]);
    }

    #[test]
    fn skips_unresolved_edges() {
        let mut graph = SemanticGraph::new();
        let edge = Edge::unresolved(id(1), EdgeKind::Calls, "missing.fn");
        graph.index_edge(&edge);
        assert!(graph.called_by(id(0)).is_empty());
    }
}
