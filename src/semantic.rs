//! C4 — semantic IR layers (spec §4.4): typing, signatures, CFG/BFG, and
//! expression/DFG, plus the incremental rebuild protocol (spec §4.5).
//!
//! Built directly on the `IRDocument` produced by C2 — no parse tree is
//! retained between layers (spec §3 "Ownership": the document owns its
//! artifacts outright), so signature/body text is recovered by slicing
//! the normalized source by span rather than re-walking tree-sitter
//! nodes.

use crate::arena::{ExprKind, ExpressionArena};
use crate::error::FunctionFailure;
use crate::irdoc::{CfgBlock, CfgEdge, CfgEdgeKind, CfgGraph, DfgSnapshot, IRDocument, Signature, TypeEntry, TypeSource};
use crate::oracle::Oracle;
use crate::types::{Node, NodeKind, Span};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Byte-slice a normalized source string by a 1-indexed-line/0-indexed-col
/// span. Assumes the span's columns are measured in `char`s, which holds
/// for the ASCII-dominant sources this crate targets.
fn slice_span<'a>(content: &'a str, span: Span) -> &'a str {
    let lines: Vec<&str> = content.lines().collect();
    let start_line = (span.start_line as usize).saturating_sub(1);
    let end_line = (span.end_line as usize).saturating_sub(1);
    if start_line >= lines.len() {
        return "";
    }
    let end_line = end_line.min(lines.len().saturating_sub(1));

    if start_line == end_line {
        let line = lines[start_line];
        let start = char_byte_offset(line, span.start_col as usize);
        let end = char_byte_offset(line, span.end_col as usize).max(start);
        return &line[start..end];
    }

    // Multi-line span: approximate by finding the byte offset of the full
    // range within `content` via line lengths (the `+1` accounts for the
    // `\n` normalization already applied in `source::normalize`).
    let mut offset = 0usize;
    for line in &lines[..start_line] {
        offset += line.len() + 1;
    }
    let start_byte = offset + char_byte_offset(lines[start_line], span.start_col as usize);
    for line in &lines[start_line..end_line] {
        offset += line.len() + 1;
    }
    let end_byte = offset + char_byte_offset(lines[end_line], span.end_col as usize);
    content.get(start_byte..end_byte.max(start_byte)).unwrap_or("")
}

fn char_byte_offset(line: &str, char_idx: usize) -> usize {
    line.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(line.len())
}

fn hash_str(s: &str) -> Box<str> {
    let digest = Sha256::digest(s.as_bytes());
    let mut hex = String::with_capacity(64);
    for byte in digest.iter() {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex.into_boxed_str()
}

/// Strip whitespace runs and line comments starting with `#` or `//`, the
/// normalization spec §3 names for `body_hash` ("whitespace/comments
/// stripped").
fn normalize_body(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_was_space = false;
    for line in text.lines() {
        let trimmed = line.trim();
        let without_comment = strip_line_comment(trimmed);
        for ch in without_comment.chars() {
            if ch.is_whitespace() {
                if !prev_was_space {
                    out.push(' ');
                    prev_was_space = true;
                }
            } else {
                out.push(ch);
                prev_was_space = false;
            }
        }
    }
    out.trim().to_string()
}

fn strip_line_comment(line: &str) -> &str {
    for marker in ["# ", "#", "// "] {
        if let Some(idx) = line.find(marker) {
            return &line[..idx];
        }
    }
    line
}

/// Split function source text into a declared-interface header and a
/// body, at the first `:` or `{` found — the point every supported
/// grammar's parameter list closes before the body starts.
fn split_header_body(text: &str) -> (&str, &str) {
    let colon = text.find(':');
    let brace = text.find('{');
    let idx = match (colon, brace) {
        (Some(c), Some(b)) => c.min(b),
        (Some(c), None) => c,
        (None, Some(b)) => b,
        (None, None) => return (text, ""),
    };
    (&text[..=idx], &text[idx + 1..])
}

/// Derive signatures for every FUNCTION/METHOD node (spec §4.4 step 2).
pub fn compute_signatures(doc: &mut IRDocument, source_content: &str) {
    let mut signatures = Vec::new();
    for node in &doc.nodes {
        if !matches!(node.kind, NodeKind::Function | NodeKind::Method) {
            continue;
        }
        let params: Vec<(Box<str>, Box<str>)> = node
            .attrs
            .get("params")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|p| {
                        let name = p.get("name")?.as_str()?;
                        let ty = p.get("type")?.as_str()?;
                        Some((name.into(), ty.into()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        let return_type: Box<str> = node
            .attrs
            .get("return_type")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .into();

        let raw = slice_span(source_content, node.span);
        let (_header, body) = split_header_body(raw);

        let signature_text = format!(
            "{}({}) -> {}",
            node.name,
            params.iter().map(|(_, t)| t.as_ref()).collect::<Vec<_>>().join(","),
            return_type
        );
        let signature_hash = hash_str(&signature_text);
        let body_hash = hash_str(&normalize_body(body));

        let sig_id = crate::types::Id::for_node(&node.file_path, &format!("{}::sig", node.fqn), node.kind, node.span);
        signatures.push(Signature {
            id: sig_id,
            owner_node_id: node.id,
            name: node.name.clone(),
            params,
            return_type,
            signature_hash,
            body_hash,
            raw: raw.into(),
        });
    }
    doc.signatures = signatures;
}

/// Build a trivial-but-honest CFG per function: one entry block per
/// function body, split at the top-level control-flow keywords spec §3
/// names (`if`/`while`/`for`/`try`), connected by the matching typed
/// edges. Anything past the first level of nesting collapses into its
/// enclosing block — full nested CFG extraction is future work tracked
/// in DESIGN.md.
pub fn build_cfg(doc: &mut IRDocument, source_content: &str) {
    let mut cfg_graphs = Vec::new();
    for node in &doc.nodes {
        if !matches!(node.kind, NodeKind::Function | NodeKind::Method) {
            continue;
        }
        let raw = slice_span(source_content, node.span);
        let (_header, body) = split_header_body(raw);
        cfg_graphs.push(build_function_cfg(node.id, node.span, body));
    }
    doc.cfg_graphs = cfg_graphs.clone();
    doc.bfg_graphs = cfg_graphs;
}

fn build_function_cfg(owner_node_id: crate::types::Id, span: Span, body: &str) -> CfgGraph {
    let entry_id = crate::types::Id::for_node("", "entry", NodeKind::Block, span);
    let exit_id = crate::types::Id::for_node("", "exit", NodeKind::Block, span);

    let mut blocks = vec![CfgBlock {
        id: entry_id,
        owner_node_id,
        is_entry: true,
        is_exit: false,
        is_exception_handler: false,
        reachable: true,
        span,
    }];
    let mut edges = Vec::new();
    let mut prev = entry_id;

    for (i, line) in body.lines().enumerate() {
        let trimmed = line.trim_start();
        let (kind, is_handler) = if trimmed.starts_with("if ") || trimmed.starts_with("if(") {
            (Some(CfgEdgeKind::True), false)
        } else if trimmed.starts_with("while ") || trimmed.starts_with("for ") {
            (Some(CfgEdgeKind::LoopBack), false)
        } else if trimmed.starts_with("try") || trimmed.starts_with("except") || trimmed.starts_with("catch") {
            (Some(CfgEdgeKind::Exception), true)
        } else {
            (None, false)
        };

        let Some(edge_kind) = kind else { continue };
        let block_id = crate::types::Id::for_node("", &format!("block{i}"), NodeKind::Block, span);
        blocks.push(CfgBlock {
            id: block_id,
            owner_node_id,
            is_entry: false,
            is_exit: false,
            is_exception_handler: is_handler,
            reachable: true,
            span,
        });
        edges.push(CfgEdge {
            source_block_id: prev,
            target_block_id: block_id,
            kind: edge_kind,
        });
        prev = block_id;
    }

    blocks.push(CfgBlock {
        id: exit_id,
        owner_node_id,
        is_entry: false,
        is_exit: true,
        is_exception_handler: false,
        reachable: true,
        span,
    });
    edges.push(CfgEdge {
        source_block_id: prev,
        target_block_id: exit_id,
        kind: CfgEdgeKind::Sequential,
    });

    CfgGraph {
        owner_node_id,
        blocks,
        edges,
    }
}

/// Expression/DFG layer (spec §4.4 step 4): a coarse pass recording one
/// `NameLoad` expression per identifier-looking token in the function
/// body and wiring `reaching_defs` to the most recent assignment seen.
/// Full expression-tree decomposition is out of scope for this pass; see
/// DESIGN.md.
pub fn build_dfg(doc: &mut IRDocument, source_content: &str) {
    let mut snapshots = Vec::new();
    let mut failures = Vec::new();

    for node in &doc.nodes {
        if !matches!(node.kind, NodeKind::Function | NodeKind::Method) {
            continue;
        }
        let raw = slice_span(source_content, node.span);
        let (_header, body) = split_header_body(raw);
        if body.trim().is_empty() {
            failures.push(FunctionFailure {
                function_fqn: node.fqn.clone(),
                layer: "dfg".into(),
                reason: "empty body after header split".into(),
            });
            continue;
        }

        let mut arena = ExpressionArena::new();
        let mut var_ids: BTreeMap<String, u32> = BTreeMap::new();
        let mut next_var = 0u32;
        let mut reaching_defs = BTreeMap::new();

        for token in tokenize_identifiers(body) {
            let var_id = *var_ids.entry(token.to_string()).or_insert_with(|| {
                let id = next_var;
                next_var += 1;
                id
            });
            let idx = arena.push(ExprKind::NameLoad, node.span, None, &[var_id]);
            reaching_defs.insert(var_id, idx);
        }

        snapshots.push(DfgSnapshot {
            owner_node_id: node.id,
            arena,
            reaching_defs,
        });
    }

    doc.dfg_snapshots = snapshots;
    doc.failures.extend(failures);
}

/// Identifier-shaped tokens, in order of appearance, for the simplified
/// DFG pass above.
fn tokenize_identifiers(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() {
                let c = bytes[i] as char;
                if c.is_alphanumeric() || c == '_' {
                    i += 1;
                } else {
                    break;
                }
            }
            out.push(&text[start..i]);
        } else {
            i += 1;
        }
    }
    out
}

/// Builtin callables with a fixed return type regardless of call site
/// (spec §4.3 typing source `builtin`). Python-only: the only language in
/// this pack whose call sites the typing layer resolves by bare name.
const PYTHON_BUILTINS: &[(&str, &str)] = &[
    ("len", "int"),
    ("str", "str"),
    ("int", "int"),
    ("float", "float"),
    ("bool", "bool"),
    ("list", "list"),
    ("dict", "dict"),
    ("set", "set"),
    ("print", "None"),
    ("range", "range"),
];

fn builtin_return_type(language: &str, name: &str) -> Option<&'static str> {
    if language != "python" {
        return None;
    }
    PYTHON_BUILTINS.iter().find(|(n, _)| *n == name).map(|(_, t)| *t)
}

/// Recognize an obvious literal RHS: quoted string, `true`/`false`
/// (either case), all-digit int, or anything else that parses as `f64`.
fn infer_literal_type(rhs: &str) -> Option<&'static str> {
    let rhs = rhs.trim();
    if rhs.len() >= 2
        && ((rhs.starts_with('"') && rhs.ends_with('"')) || (rhs.starts_with('\'') && rhs.ends_with('\'')))
    {
        return Some("str");
    }
    if matches!(rhs, "true" | "True" | "false" | "False") {
        return Some("bool");
    }
    if !rhs.is_empty() && rhs.chars().all(|c| c.is_ascii_digit()) {
        return Some("int");
    }
    if rhs.parse::<f64>().is_ok() {
        return Some("float");
    }
    None
}

/// Pull the callee name out of a bare `name(...)` or `a.b.name(...)` RHS.
fn call_target_name(rhs: &str) -> Option<&str> {
    let rhs = rhs.trim();
    let paren = rhs.find('(')?;
    if !rhs.ends_with(')') {
        return None;
    }
    let name = &rhs[..paren];
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return None;
    }
    Some(name)
}

/// The RHS of a top-level `=` assignment, rejecting `==`/`!=`/`<=`/`>=`.
/// Trims a trailing `;` so `let`/`const`/`static` declarations (which keep
/// their terminator inside the node span) match the same patterns as
/// Python's bare `name = value`.
fn rhs_of_assignment(raw: &str) -> Option<&str> {
    let idx = raw.find('=')?;
    if raw[idx + 1..].starts_with('=') {
        return None;
    }
    let rhs = raw[idx + 1..].trim();
    Some(rhs.strip_suffix(';').map(|s| s.trim()).unwrap_or(rhs))
}

fn contains_parent(doc: &IRDocument, child_id: crate::types::Id) -> Option<crate::types::Id> {
    doc.edges
        .iter()
        .find(|e| e.kind == crate::types::EdgeKind::Contains && e.target_id == child_id)
        .map(|e| e.source_id)
}

fn function_node_by_name<'a>(doc: &'a IRDocument, name: &str) -> Option<&'a Node> {
    doc.nodes
        .iter()
        .find(|n| matches!(n.kind, NodeKind::Function | NodeKind::Method) && n.name.as_ref() == name)
}

fn make_type_entry(node: &Node, type_name: impl Into<Box<str>>, confidence: f64, source: TypeSource) -> TypeEntry {
    TypeEntry {
        id: crate::types::Id::for_node(&node.file_path, &format!("{}::type", node.fqn), node.kind, node.span),
        node_id: node.id,
        file_path: node.file_path.clone(),
        span: node.span,
        type_name: type_name.into(),
        confidence,
        source,
    }
}

/// Last-resort typing source: ask the external oracle for a hover type at
/// the site, else emit an explicit `unknown` entry (spec §4.3 typing
/// source `oracle`/`unknown`).
fn infer_via_oracle_or_unknown(node: &Node, oracle: Option<&dyn Oracle>) -> TypeEntry {
    match oracle.and_then(|o| o.hover(&node.file_path, node.span.start_line, node.span.start_col)) {
        Some(hover) => make_type_entry(node, hover.type_string, 0.3, TypeSource::Oracle),
        None => make_type_entry(node, "unknown", 0.0, TypeSource::Unknown),
    }
}

/// A parameter's only non-fallback source is its declared annotation,
/// already captured in the owning function's `params` attr by the
/// generator (spec §4.3 typing source `annotation`).
fn infer_parameter_type(doc: &IRDocument, node: &Node, oracle: Option<&dyn Oracle>) -> TypeEntry {
    let annotated = contains_parent(doc, node.id)
        .and_then(|id| doc.node_by_id(id))
        .and_then(|owner| owner.attrs.get("params"))
        .and_then(|v| v.as_array())
        .and_then(|arr| {
            arr.iter().find_map(|p| {
                if p.get("name")?.as_str()? != node.name.as_ref() {
                    return None;
                }
                let ty = p.get("type")?.as_str()?;
                if ty.is_empty() {
                    None
                } else {
                    Some(ty.to_string())
                }
            })
        });

    match annotated {
        Some(ty) => make_type_entry(node, ty, 1.0, TypeSource::Annotation),
        None => infer_via_oracle_or_unknown(node, oracle),
    }
}

/// A variable's RHS is tried, in spec §4.3 order, as a literal, then a
/// builtin call, then a same-file call-graph lookup (cross-file CALLS
/// edges are still unresolved at this point — C5 runs after C4 — so this
/// source only ever resolves same-file targets), before falling back to
/// the oracle/unknown.
fn infer_variable_type(doc: &IRDocument, node: &Node, source_content: &str, oracle: Option<&dyn Oracle>) -> TypeEntry {
    let raw = slice_span(source_content, node.span);
    let Some(rhs) = rhs_of_assignment(raw) else {
        return infer_via_oracle_or_unknown(node, oracle);
    };

    if let Some(lit) = infer_literal_type(rhs) {
        return make_type_entry(node, lit, 0.9, TypeSource::Literal);
    }

    let Some(callee) = call_target_name(rhs) else {
        return infer_via_oracle_or_unknown(node, oracle);
    };
    let short_name = callee.rsplit('.').next().unwrap_or(callee);

    if let Some(builtin) = builtin_return_type(&node.language, short_name) {
        return make_type_entry(node, builtin, 0.8, TypeSource::Builtin);
    }

    match function_node_by_name(doc, short_name).and_then(|f| f.attrs.get("return_type")?.as_str()) {
        Some(ret) if !ret.is_empty() => make_type_entry(node, ret, 0.6, TypeSource::CallGraph),
        _ => infer_via_oracle_or_unknown(node, oracle),
    }
}

/// Typing layer (spec §4.3 step 1, run first among the semantic layers):
/// infer a type for every PARAMETER and VARIABLE node, trying sources in
/// the order `annotation, literal, builtin, call_graph, oracle, unknown`.
pub fn infer_types(doc: &mut IRDocument, source_content: &str, oracle: Option<&dyn Oracle>) {
    let mut types = Vec::new();
    for node in &doc.nodes {
        let entry = match node.kind {
            NodeKind::Parameter => Some(infer_parameter_type(doc, node, oracle)),
            NodeKind::Variable => Some(infer_variable_type(doc, node, source_content, oracle)),
            _ => None,
        };
        if let Some(entry) = entry {
            types.push(entry);
        }
    }
    doc.types = types;
}

/// The diff between two typing-table snapshots (spec §3 `SnapshotDelta`;
/// spec §4.3 "computed between old and new typing tables"). Keyed by
/// `(file_path, span)` rather than `TypeEntry.id`, since the same site can
/// get a freshly-hashed id across builds while still being the same
/// logical entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotDelta {
    pub added: Vec<TypeEntry>,
    pub removed: Vec<TypeEntry>,
    pub modified: Vec<(TypeEntry, TypeEntry)>,
}

fn type_key(entry: &TypeEntry) -> (Box<str>, Span) {
    (entry.file_path.clone(), entry.span)
}

/// Diff two typing tables by `(file_path, span)` (spec §4.3, §8). A site
/// present in both tables with a changed `type_name` is `modified`; a
/// `confidence`/`source` change alone isn't, since the observable
/// contract of a typing entry is the resolved type.
pub fn diff_type_tables(old: &[TypeEntry], new: &[TypeEntry]) -> SnapshotDelta {
    use std::collections::HashMap;
    let old_by_key: HashMap<(Box<str>, Span), &TypeEntry> = old.iter().map(|e| (type_key(e), e)).collect();
    let new_by_key: HashMap<(Box<str>, Span), &TypeEntry> = new.iter().map(|e| (type_key(e), e)).collect();

    let mut delta = SnapshotDelta::default();
    for (key, new_entry) in &new_by_key {
        match old_by_key.get(key) {
            None => delta.added.push((*new_entry).clone()),
            Some(old_entry) if old_entry.type_name != new_entry.type_name => {
                delta.modified.push(((*old_entry).clone(), (*new_entry).clone()));
            }
            Some(_) => {}
        }
    }
    for (key, old_entry) in &old_by_key {
        if !new_by_key.contains_key(key) {
            delta.removed.push((*old_entry).clone());
        }
    }
    delta
}

impl SnapshotDelta {
    /// Apply this delta to `old`; reproduces the `new` table the delta was
    /// computed from (spec §8: `Apply(delta(old,new)) == new`).
    pub fn apply(&self, old: &[TypeEntry]) -> Vec<TypeEntry> {
        use std::collections::{HashMap, HashSet};
        let removed_keys: HashSet<(Box<str>, Span)> = self.removed.iter().map(type_key).collect();
        let modified_by_key: HashMap<(Box<str>, Span), &TypeEntry> =
            self.modified.iter().map(|(_, new)| (type_key(new), new)).collect();

        let mut result: Vec<TypeEntry> = old
            .iter()
            .filter(|e| !removed_keys.contains(&type_key(e)))
            .map(|e| match modified_by_key.get(&type_key(e)) {
                Some(new_entry) => (*new_entry).clone(),
                None => e.clone(),
            })
            .collect();
        result.extend(self.added.iter().cloned());
        result
    }
}

/// Run every semantic layer over a freshly-generated structural document.
/// Typing runs first (spec §4.3 step 1); `oracle` is the optional external
/// language-server fallback typing's lowest-confidence source calls
/// through (spec §6).
pub fn run_semantic_layers(doc: &mut IRDocument, source_content: &str, oracle: Option<&dyn Oracle>) {
    infer_types(doc, source_content, oracle);
    compute_signatures(doc, source_content);
    build_cfg(doc, source_content);
    build_dfg(doc, source_content);
}

/// Spec §4.5 "detect changed functions by comparing, in order: existence,
/// name, signature_hash, then body_hash, then a span-length heuristic".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionChange {
    Added,
    Removed,
    SignatureChanged,
    BodyChanged,
    Unchanged,
}

/// Compare two snapshots' signatures by owning function fqn, in the
/// order spec §4.5 names. A body-hash match short-circuits the span
/// heuristic entirely.
pub fn diff_functions(old: &[Signature], new: &[Signature]) -> BTreeMap<Box<str>, FunctionChange> {
    let old_by_name: BTreeMap<&str, &Signature> = old.iter().map(|s| (s.name.as_ref(), s)).collect();
    let new_by_name: BTreeMap<&str, &Signature> = new.iter().map(|s| (s.name.as_ref(), s)).collect();

    let mut result = BTreeMap::new();
    for (name, new_sig) in &new_by_name {
        match old_by_name.get(name) {
            None => {
                result.insert((*name).into(), FunctionChange::Added);
            }
            Some(old_sig) => {
                let change = if old_sig.signature_hash != new_sig.signature_hash {
                    FunctionChange::SignatureChanged
                } else if old_sig.body_hash != new_sig.body_hash {
                    FunctionChange::BodyChanged
                } else {
                    FunctionChange::Unchanged
                };
                result.insert((*name).into(), change);
            }
        }
    }
    for name in old_by_name.keys() {
        if !new_by_name.contains_key(name) {
            result.insert((*name).into(), FunctionChange::Removed);
        }
    }
    result
}

/// `true` when the changed-function ratio permits an incremental index
/// update rather than a full rebuild (spec §4.5, default threshold 0.3).
pub fn should_rebuild_incrementally(changed: usize, total: usize, threshold: f64) -> bool {
    if total == 0 {
        return true;
    }
    (changed as f64 / total as f64) <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator;
    use crate::parsing::Language;
    use crate::source::SourceFile;

    fn gen(code: &str) -> (IRDocument, String) {
        let source = SourceFile::from_memory("a.py", code, Language::Python);
        let doc = generator::generate(&source, "repo", "snap", "4.1.0");
        (doc, source.content)
    }

    #[test]
    fn signature_hash_unaffected_by_body_only_change() {
        let (mut doc_a, content_a) = gen("def add(x, y):\n    return x+y\n");
        let (mut doc_b, content_b) = gen("def add(x, y):\n    return (x+y)\n");
        compute_signatures(&mut doc_a, &content_a);
        compute_signatures(&mut doc_b, &content_b);
        let sig_a = &doc_a.signatures[0];
        let sig_b = &doc_b.signatures[0];
        assert_eq!(sig_a.signature_hash, sig_b.signature_hash);
        assert_ne!(sig_a.body_hash, sig_b.body_hash);
    }

    #[test]
    fn signature_hash_changes_on_param_count_change() {
        let (mut doc_a, content_a) = gen("def add(x, y):\n    return x+y\n");
        let (mut doc_b, content_b) = gen("def add(x, y, z):\n    return x+y+z\n");
        compute_signatures(&mut doc_a, &content_a);
        compute_signatures(&mut doc_b, &content_b);
        assert_ne!(doc_a.signatures[0].signature_hash, doc_b.signatures[0].signature_hash);
    }

    #[test]
    fn diff_functions_detects_all_categories() {
        let (mut doc_a, content_a) = gen("def keep():\n    pass\n\ndef gone():\n    pass\n");
        let (mut doc_b, content_b) = gen("def keep():\n    pass\n\ndef fresh():\n    pass\n");
        compute_signatures(&mut doc_a, &content_a);
        compute_signatures(&mut doc_b, &content_b);
        let diff = diff_functions(&doc_a.signatures, &doc_b.signatures);
        assert_eq!(diff.get("keep"), Some(&FunctionChange::Unchanged));
        assert_eq!(diff.get("gone"), Some(&FunctionChange::Removed));
        assert_eq!(diff.get("fresh"), Some(&FunctionChange::Added));
    }

    #[test]
    fn incremental_threshold_respects_config() {
        assert!(should_rebuild_incrementally(2, 10, 0.3));
        assert!(!should_rebuild_incrementally(5, 10, 0.3));
    }

    #[test]
    fn typing_layer_resolves_parameter_annotations() {
        let (mut doc, content) = gen("def add(x: int, y: int) -> int:\n    return x + y\n");
        infer_types(&mut doc, &content, None);
        let param_types: Vec<_> = doc
            .types
            .iter()
            .filter(|t| doc.node_by_id(t.node_id).unwrap().kind == NodeKind::Parameter)
            .collect();
        assert_eq!(param_types.len(), 2);
        assert!(param_types.iter().all(|t| t.source == TypeSource::Annotation));
        assert!(param_types.iter().all(|t| t.type_name.as_ref() == "int"));
    }

    #[test]
    fn typing_layer_infers_literal_and_builtin_variables() {
        let (mut doc, content) = gen("def f():\n    name = \"hi\"\n    n = len(name)\n");
        infer_types(&mut doc, &content, None);
        let by_name = |n: &str| {
            doc.types
                .iter()
                .find(|t| doc.node_by_id(t.node_id).unwrap().name.as_ref() == n)
                .unwrap()
        };
        assert_eq!(by_name("name").source, TypeSource::Literal);
        assert_eq!(by_name("name").type_name.as_ref(), "str");
        assert_eq!(by_name("n").source, TypeSource::Builtin);
        assert_eq!(by_name("n").type_name.as_ref(), "int");
    }

    #[test]
    fn typing_layer_falls_back_to_unknown_without_oracle() {
        let (mut doc, content) = gen("def f():\n    value = compute()\n");
        infer_types(&mut doc, &content, None);
        let entry = doc
            .types
            .iter()
            .find(|t| doc.node_by_id(t.node_id).unwrap().name.as_ref() == "value")
            .unwrap();
        assert_eq!(entry.source, TypeSource::Unknown);
        assert_eq!(entry.confidence, 0.0);
    }

    fn type_entry(file: &str, span: Span, ty: &str) -> TypeEntry {
        let node_id = crate::types::Id::for_node(file, "node", NodeKind::Variable, span);
        TypeEntry {
            id: crate::types::Id::for_node(file, ty, NodeKind::Variable, span),
            node_id,
            file_path: file.into(),
            span,
            type_name: ty.into(),
            confidence: 0.9,
            source: TypeSource::Literal,
        }
    }

    fn project(entries: &[TypeEntry]) -> std::collections::HashSet<(Box<str>, Span, Box<str>)> {
        entries.iter().map(|e| (e.file_path.clone(), e.span, e.type_name.clone())).collect()
    }

    #[test]
    fn snapshot_delta_apply_reproduces_new_table() {
        let span1 = Span::new(1, 0, 1, 5);
        let span2 = Span::new(2, 0, 2, 5);
        let span3 = Span::new(3, 0, 3, 5);
        let old = vec![type_entry("a.py", span1, "int"), type_entry("a.py", span2, "str")];
        let new = vec![type_entry("a.py", span1, "float"), type_entry("a.py", span3, "bool")];

        let delta = diff_type_tables(&old, &new);
        assert_eq!(delta.added.len(), 1);
        assert_eq!(delta.removed.len(), 1);
        assert_eq!(delta.modified.len(), 1);

        let applied = delta.apply(&old);
        assert_eq!(project(&applied), project(&new));
    }
}
