//! Per-file intermediate representation document (spec §3 IRDocument).
//!
//! `IRDocument` is the unit the generator (C2), semantic layers (C4), and
//! disk cache (C3) all pass around. Ownership follows spec §3
//! "Ownership": the document exclusively owns its nodes/edges/CFG/DFG
//! artifacts.

use crate::error::{FunctionFailure, ParseIssue};
use crate::types::{Edge, Id, Node, Span};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A `(node, role, span)` triple recording where a symbol's name appears
/// in source (spec glossary "Occurrence").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub node_id: Id,
    pub role: OccurrenceRole,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceRole {
    Definition,
    Reference,
}

/// Where a `TypeEntry` got its `type_name` from (spec §4.3 "Typing
/// layer"), in the order the typing layer tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeSource {
    Annotation,
    Literal,
    Builtin,
    CallGraph,
    Oracle,
    Unknown,
}

/// One inferred-type entry (spec §3 IRDocument `types[]`). Keyed by the
/// node it annotates (a parameter, function, or the function containing a
/// call site) plus the span of the specific expression, so two entries on
/// the same node at different spans don't collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub id: Id,
    pub node_id: Id,
    pub file_path: Box<str>,
    pub span: Span,
    pub type_name: Box<str>,
    pub confidence: f64,
    pub source: TypeSource,
}

/// Declared interface of a function/method (spec §3 Signature).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub id: Id,
    pub owner_node_id: Id,
    pub name: Box<str>,
    pub params: Vec<(Box<str>, Box<str>)>,
    pub return_type: Box<str>,
    /// Hash of the declared interface: changing it is a breaking change.
    pub signature_hash: Box<str>,
    /// Hash of the normalized body (whitespace/comments stripped).
    pub body_hash: Box<str>,
    pub raw: Box<str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CfgEdgeKind {
    Sequential,
    True,
    False,
    LoopBack,
    Exception,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfgBlock {
    pub id: Id,
    pub owner_node_id: Id,
    pub is_entry: bool,
    pub is_exit: bool,
    pub is_exception_handler: bool,
    pub reachable: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfgEdge {
    pub source_block_id: Id,
    pub target_block_id: Id,
    pub kind: CfgEdgeKind,
}

/// One function's control-flow graph (spec §3 "CFG / BFG").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfgGraph {
    pub owner_node_id: Id,
    pub blocks: Vec<CfgBlock>,
    pub edges: Vec<CfgEdge>,
}

/// The coarsened block-flow variant of a `CfgGraph`.
pub type BfgGraph = CfgGraph;

/// One function's reaching-definitions snapshot, backed by the
/// structure-of-arrays [`crate::arena::ExpressionArena`] (spec §4.9).
#[derive(Debug, Clone)]
pub struct DfgSnapshot {
    pub owner_node_id: Id,
    pub arena: crate::arena::ExpressionArena,
    /// `reaching_def[var_id]` = index of the most recent defining
    /// expression for that variable, intra-procedurally.
    pub reaching_defs: BTreeMap<u32, usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IRDocumentMeta {
    pub content_hash: Box<str>,
    pub schema_version: Box<str>,
}

/// The per-file record carrying every IR layer (spec §3 IRDocument).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IRDocument {
    pub repo_id: Box<str>,
    pub snapshot_id: Box<str>,
    pub file_path: Box<str>,
    pub language: Box<str>,
    pub schema_version: Box<str>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub occurrences: Vec<Occurrence>,
    #[serde(default)]
    pub signatures: Vec<Signature>,
    #[serde(default)]
    pub cfg_graphs: Vec<CfgGraph>,
    #[serde(default)]
    pub bfg_graphs: Vec<BfgGraph>,
    /// Typing layer output (spec §4.3 step 1): one entry per inferred
    /// expression type, ordered by the source that produced it.
    #[serde(default)]
    pub types: Vec<TypeEntry>,
    pub meta: IRDocumentMeta,
    #[serde(default)]
    pub parse_errors: Vec<ParseIssue>,
    #[serde(default)]
    pub failures: Vec<FunctionFailure>,
    /// Not serialized: rebuilt from `owner_node_id` after semantic layers
    /// run, since `ExpressionArena` holds no `Serialize` impl (process-
    /// local, never cached).
    #[serde(skip)]
    pub dfg_snapshots: Vec<DfgSnapshot>,
}

impl IRDocument {
    pub fn node_by_id(&self, id: Id) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Deduplicate edges with the same `(source, target, kind)`, keeping
    /// the earliest-span occurrence (spec §4.9 "Determinism").
    pub fn dedup_edges(&mut self) {
        use std::collections::HashMap;
        let mut seen: HashMap<(Id, Id, crate::types::EdgeKind), usize> = HashMap::new();
        let mut keep = vec![true; self.edges.len()];
        for (idx, edge) in self.edges.iter().enumerate() {
            let key = (edge.source_id, edge.target_id, edge.kind);
            match seen.get(&key) {
                None => {
                    seen.insert(key, idx);
                }
                Some(_) => {
                    keep[idx] = false;
                }
            }
        }
        let mut kept = Vec::with_capacity(self.edges.len());
        for (edge, keep) in self.edges.drain(..).zip(keep) {
            if keep {
                kept.push(edge);
            }
        }
        self.edges = kept;
    }
}
