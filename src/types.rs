//! Core identity and span types shared by every IR layer.
//!
//! Mirrors the teacher's `NonZeroU32`-newtype-id pattern (see
//! `SymbolId`/`FileId` in codanna), generalized to the closed `NodeKind`/
//! `EdgeKind` sets and content-hash ids named in the specification.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A source range. 1-indexed lines, 0-indexed columns, per spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}

/// Closed set of structural node kinds (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Module,
    Import,
    Class,
    Function,
    Method,
    Field,
    Variable,
    Parameter,
    Call,
    Literal,
    Block,
    Statement,
}

/// Closed set of edge kinds (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Contains,
    Defines,
    References,
    ReferencesSymbol,
    ReferencesType,
    Calls,
    Inherits,
    Imports,
    ImportModule,
    ImportFrom,
    ImportWildcard,
    Reads,
    Writes,
}

/// Deterministic 128-bit id, hex-encoded, shared by `Node` and `Edge`.
///
/// `H` is SHA-256 truncated to 128 bits, matching spec §6's
/// "Deterministic IDs" contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Id(pub u128);

impl Id {
    fn from_hash(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&digest[..16]);
        Id(u128::from_be_bytes(buf))
    }

    /// `Node.id = H(file_path, fqn, kind_code, span)`.
    pub fn for_node(file_path: &str, fqn: &str, kind: NodeKind, span: Span) -> Self {
        let mut buf = Vec::with_capacity(file_path.len() + fqn.len() + 32);
        buf.extend_from_slice(file_path.as_bytes());
        buf.push(0);
        buf.extend_from_slice(fqn.as_bytes());
        buf.push(0);
        buf.push(kind as u8);
        buf.extend_from_slice(&span.start_line.to_be_bytes());
        buf.extend_from_slice(&span.start_col.to_be_bytes());
        buf.extend_from_slice(&span.end_line.to_be_bytes());
        buf.extend_from_slice(&span.end_col.to_be_bytes());
        Self::from_hash(&buf)
    }

    /// `Edge.id = H(source_id, target_id, kind_code)`.
    pub fn for_edge(source: Id, target: Id, kind: EdgeKind) -> Self {
        let mut buf = Vec::with_capacity(33);
        buf.extend_from_slice(&source.0.to_be_bytes());
        buf.extend_from_slice(&target.0.to_be_bytes());
        buf.push(kind as u8);
        Self::from_hash(&buf)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// A typed, language-neutral IR node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Id,
    pub kind: NodeKind,
    pub name: Box<str>,
    pub fqn: Box<str>,
    pub file_path: Box<str>,
    pub language: Box<str>,
    pub span: Span,
    #[serde(default)]
    pub attrs: std::collections::BTreeMap<String, serde_json::Value>,
}

impl Node {
    pub fn new(
        kind: NodeKind,
        name: impl Into<Box<str>>,
        fqn: impl Into<Box<str>>,
        file_path: impl Into<Box<str>>,
        language: impl Into<Box<str>>,
        span: Span,
    ) -> Self {
        let fqn = fqn.into();
        let file_path = file_path.into();
        let id = Id::for_node(&file_path, &fqn, kind, span);
        Self {
            id,
            kind,
            name: name.into(),
            fqn,
            file_path,
            language: language.into(),
            span,
            attrs: Default::default(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }
}

/// A typed, directed edge between two node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: Id,
    pub source_id: Id,
    pub target_id: Id,
    pub kind: EdgeKind,
    #[serde(default)]
    pub attrs: std::collections::BTreeMap<String, serde_json::Value>,
    /// Target was not yet known when this edge was produced (C2); patched
    /// in place by the cross-file resolver (C5). `None` once resolved.
    #[serde(default)]
    pub unresolved_target_fqn: Option<Box<str>>,
}

impl Edge {
    pub fn new(source_id: Id, target_id: Id, kind: EdgeKind) -> Self {
        Self {
            id: Id::for_edge(source_id, target_id, kind),
            source_id,
            target_id,
            kind,
            attrs: Default::default(),
            unresolved_target_fqn: None,
        }
    }

    /// Build an edge whose target is not yet resolved. `target_id` is a
    /// nil placeholder until `resolve_to` is called.
    pub fn unresolved(source_id: Id, kind: EdgeKind, target_fqn_guess: impl Into<Box<str>>) -> Self {
        Self {
            id: Id::for_edge(source_id, Id(0), kind),
            source_id,
            target_id: Id(0),
            kind,
            attrs: Default::default(),
            unresolved_target_fqn: Some(target_fqn_guess.into()),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.unresolved_target_fqn.is_some()
    }

    pub fn resolve_to(&mut self, target_id: Id) {
        self.target_id = target_id;
        self.id = Id::for_edge(self.source_id, target_id, self.kind);
        self.unresolved_target_fqn = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_is_deterministic() {
        let span = Span::new(1, 0, 1, 10);
        let a = Node::new(NodeKind::Function, "f", "m.f", "a.py", "python", span);
        let b = Node::new(NodeKind::Function, "f", "m.f", "a.py", "python", span);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn node_id_changes_with_span() {
        let a = Node::new(
            NodeKind::Function,
            "f",
            "m.f",
            "a.py",
            "python",
            Span::new(1, 0, 1, 10),
        );
        let b = Node::new(
            NodeKind::Function,
            "f",
            "m.f",
            "a.py",
            "python",
            Span::new(2, 0, 2, 10),
        );
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn edge_id_depends_on_endpoints_and_kind() {
        let n1 = Id::for_node("a.py", "m.f", NodeKind::Function, Span::new(1, 0, 1, 1));
        let n2 = Id::for_node("a.py", "m.g", NodeKind::Function, Span::new(2, 0, 2, 1));
        let e1 = Edge::new(n1, n2, EdgeKind::Calls);
        let e2 = Edge::new(n1, n2, EdgeKind::Calls);
        let e3 = Edge::new(n1, n2, EdgeKind::References);
        assert_eq!(e1.id, e2.id);
        assert_ne!(e1.id, e3.id);
    }
}
