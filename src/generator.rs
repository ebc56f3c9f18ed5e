//! C2 — structural IR generator.
//!
//! Walks a parsed tree-sitter tree maintaining a scope stack (module →
//! class → function, spec §4.1), emitting Layer 1 nodes/edges/occurrences.
//! No typing, no CFG — those are the semantic layers (C4, `crate::semantic`).
//!
//! Grounded on the teacher's per-language `extract_*` walks in
//! `src/parsing/rust.rs`/`python.rs`, generalized to one generic walk over
//! the [`crate::parsing::LanguageLowering`] trait object.

use crate::error::ParseIssue;
use crate::irdoc::{IRDocument, IRDocumentMeta, Occurrence, OccurrenceRole};
use crate::parsing::{lowering_for, ts_parser_for, Language, StructuralKind};
use crate::source::SourceFile;
use crate::types::{Edge, EdgeKind, Id, Node, NodeKind, Span};
use std::collections::HashMap;
use tree_sitter::Node as TsNode;

fn ts_span(node: TsNode) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span::new(
        start.row as u32 + 1,
        start.column as u32,
        end.row as u32 + 1,
        end.column as u32,
    )
}

struct ScopeFrame {
    node_id: Id,
    fqn: String,
    symbols: HashMap<String, Id>,
}

struct GeneratorState<'a> {
    file_path: &'a str,
    language: Language,
    code: &'a str,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    occurrences: Vec<Occurrence>,
    scopes: Vec<ScopeFrame>,
}

impl<'a> GeneratorState<'a> {
    fn current(&self) -> &ScopeFrame {
        self.scopes.last().expect("module scope always present")
    }

    fn lookup(&self, name: &str) -> Option<Id> {
        self.scopes.iter().rev().find_map(|f| f.symbols.get(name).copied())
    }

    fn push_node(
        &mut self,
        kind: NodeKind,
        name: &str,
        fqn: &str,
        span: Span,
        role: OccurrenceRole,
    ) -> Id {
        let node = Node::new(kind, name, fqn, self.file_path, self.language.as_str(), span);
        let id = node.id;
        self.nodes.push(node);
        self.occurrences.push(Occurrence {
            node_id: id,
            role,
            span,
        });
        id
    }

    fn push_edge(&mut self, source_id: Id, target_id: Id, kind: EdgeKind) {
        self.edges.push(Edge::new(source_id, target_id, kind));
    }

    fn set_attr(&mut self, id: Id, key: &str, value: serde_json::Value) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            node.attrs.insert(key.to_string(), value);
        }
    }

    fn child_fqn(&self, name: &str) -> String {
        let parent = &self.current().fqn;
        if parent.is_empty() {
            name.to_string()
        } else {
            format!("{parent}.{name}")
        }
    }
}

/// Generate Layer 1 structural IR for one source file.
pub fn generate(
    source: &SourceFile,
    repo_id: &str,
    snapshot_id: &str,
    schema_version: &str,
) -> IRDocument {
    let mut parse_errors = Vec::new();
    let mut parser = match ts_parser_for(source.language) {
        Ok(p) => p,
        Err(reason) => {
            parse_errors.push(ParseIssue {
                span: Span::new(1, 0, 1, 0),
                message: reason,
            });
            return empty_document(source, repo_id, snapshot_id, schema_version, parse_errors);
        }
    };

    let Some(tree) = parser.parse(&source.content, None) else {
        parse_errors.push(ParseIssue {
            span: Span::new(1, 0, 1, 0),
            message: "tree-sitter returned no tree".to_string(),
        });
        return empty_document(source, repo_id, snapshot_id, schema_version, parse_errors);
    };

    let root = tree.root_node();
    collect_parse_errors(root, &mut parse_errors);

    let lowering = lowering_for(source.language);
    let module_name = module_stem(&source.path);
    let module_span = ts_span(root);

    let file_path = source.path.to_string_lossy().into_owned();
    let mut state = GeneratorState {
        file_path: &file_path,
        language: source.language,
        code: &source.content,
        nodes: Vec::new(),
        edges: Vec::new(),
        occurrences: Vec::new(),
        scopes: Vec::new(),
    };

    let module_id = state.push_node(
        NodeKind::Module,
        &module_name,
        &module_name,
        module_span,
        OccurrenceRole::Definition,
    );
    state.scopes.push(ScopeFrame {
        node_id: module_id,
        fqn: module_name,
        symbols: HashMap::new(),
    });

    walk(root, lowering.as_ref(), &mut state);

    let mut doc = IRDocument {
        repo_id: repo_id.into(),
        snapshot_id: snapshot_id.into(),
        file_path: file_path.into_boxed_str(),
        language: source.language.as_str().into(),
        schema_version: schema_version.into(),
        nodes: state.nodes,
        edges: state.edges,
        occurrences: state.occurrences,
        signatures: Vec::new(),
        cfg_graphs: Vec::new(),
        bfg_graphs: Vec::new(),
        types: Vec::new(),
        meta: IRDocumentMeta {
            content_hash: source.content_hash.clone().into_boxed_str(),
            schema_version: schema_version.into(),
        },
        parse_errors,
        failures: Vec::new(),
        dfg_snapshots: Vec::new(),
    };
    doc.dedup_edges();
    doc
}

fn walk(node: TsNode, lowering: &dyn crate::parsing::LanguageLowering, state: &mut GeneratorState) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match lowering.classify(child.kind()) {
            Some(StructuralKind::Class) => handle_container(child, lowering, state, NodeKind::Class, true),
            Some(StructuralKind::Function) => {
                handle_container(child, lowering, state, NodeKind::Function, false)
            }
            Some(StructuralKind::Method) => {
                handle_container(child, lowering, state, NodeKind::Method, false)
            }
            Some(StructuralKind::Variable) => handle_variable(child, lowering, state),
            Some(StructuralKind::Call) => handle_call(child, lowering, state),
            Some(StructuralKind::Import) => handle_import(child, lowering, state),
            _ => walk(child, lowering, state),
        }
    }
}

fn handle_container(
    node: TsNode,
    lowering: &dyn crate::parsing::LanguageLowering,
    state: &mut GeneratorState,
    kind: NodeKind,
    emit_inherits: bool,
) {
    let Some(name) = lowering.extract_name(node, state.code) else {
        walk(node, lowering, state);
        return;
    };
    let fqn = state.child_fqn(name);
    let span = ts_span(node);
    let parent_id = state.current().node_id;
    let id = state.push_node(kind, name, &fqn, span, OccurrenceRole::Definition);
    state
        .scopes
        .last_mut()
        .expect("scope present")
        .symbols
        .insert(name.to_string(), id);
    state.push_edge(parent_id, id, EdgeKind::Contains);
    if matches!(kind, NodeKind::Function | NodeKind::Method) {
        state.push_edge(parent_id, id, EdgeKind::Defines);
    }

    if emit_inherits {
        for base in lowering.extract_bases(node, state.code) {
            let target_fqn = state.child_fqn(base);
            let edge = Edge::unresolved(id, EdgeKind::Inherits, target_fqn);
            state.edges.push(edge);
        }
    }

    let params = lowering.extract_params(node, state.code);
    for (param_name, _ty) in &params {
        if param_name.is_empty() {
            continue;
        }
        let param_fqn = format!("{fqn}.{param_name}");
        let param_id = state.push_node(
            NodeKind::Parameter,
            param_name,
            &param_fqn,
            span,
            OccurrenceRole::Definition,
        );
        state.push_edge(id, param_id, EdgeKind::Contains);
    }

    if matches!(kind, NodeKind::Function | NodeKind::Method) {
        let return_type = lowering.extract_return_type(node, state.code);
        let params_json: Vec<serde_json::Value> = params
            .iter()
            .map(|(n, t)| serde_json::json!({"name": n, "type": t}))
            .collect();
        state.set_attr(id, "params", serde_json::Value::Array(params_json));
        state.set_attr(id, "return_type", serde_json::Value::String(return_type.to_string()));
    }

    state.scopes.push(ScopeFrame {
        node_id: id,
        fqn,
        symbols: HashMap::new(),
    });
    walk(node, lowering, state);
    state.scopes.pop();
}

fn handle_variable(node: TsNode, lowering: &dyn crate::parsing::LanguageLowering, state: &mut GeneratorState) {
    let Some(name) = lowering.extract_name(node, state.code) else {
        walk(node, lowering, state);
        return;
    };
    let fqn = state.child_fqn(name);
    let span = ts_span(node);
    let parent_id = state.current().node_id;
    let id = state.push_node(NodeKind::Variable, name, &fqn, span, OccurrenceRole::Definition);
    state
        .scopes
        .last_mut()
        .expect("scope present")
        .symbols
        .insert(name.to_string(), id);
    state.push_edge(parent_id, id, EdgeKind::Contains);
    walk(node, lowering, state);
}

fn handle_call(node: TsNode, lowering: &dyn crate::parsing::LanguageLowering, state: &mut GeneratorState) {
    if let Some((callee, span)) = lowering.call_target(node, state.code) {
        let source_id = state.current().node_id;
        state.occurrences.push(Occurrence {
            node_id: source_id,
            role: OccurrenceRole::Reference,
            span,
        });
        match state.lookup(callee) {
            Some(target_id) => state.push_edge(source_id, target_id, EdgeKind::Calls),
            None => {
                let edge = Edge::unresolved(source_id, EdgeKind::Calls, callee);
                state.edges.push(edge);
            }
        }
    }
    walk(node, lowering, state);
}

fn handle_import(node: TsNode, lowering: &dyn crate::parsing::LanguageLowering, state: &mut GeneratorState) {
    let specs = lowering.extract_imports(node, state.code);
    let parent_id = state.current().node_id;
    for spec in specs {
        let display_name: &str = spec
            .imported_name
            .as_deref()
            .or(spec.alias.as_deref())
            .unwrap_or(&spec.module_path);
        let import_fqn = format!("{}::import::{}", state.current().fqn, display_name);
        let id = state.push_node(
            NodeKind::Import,
            display_name,
            &import_fqn,
            spec.span,
            OccurrenceRole::Definition,
        );
        state.push_edge(parent_id, id, EdgeKind::Contains);

        let edge_kind = if spec.is_wildcard {
            EdgeKind::ImportWildcard
        } else if spec.imported_name.is_some() {
            EdgeKind::ImportFrom
        } else {
            EdgeKind::ImportModule
        };
        let target_guess = match &spec.imported_name {
            Some(name) => format!("{}.{}", spec.module_path, name),
            None => spec.module_path.to_string(),
        };
        let mut edge = Edge::unresolved(id, edge_kind, target_guess);
        edge.attrs.insert(
            "module_path".to_string(),
            serde_json::Value::String(spec.module_path.to_string()),
        );
        state.edges.push(edge);
        let mut imports_edge = Edge::unresolved(parent_id, EdgeKind::Imports, spec.module_path.to_string());
        imports_edge.attrs = edge.attrs.clone();
        state.edges.push(imports_edge);
    }
}

fn collect_parse_errors(node: TsNode, out: &mut Vec<ParseIssue>) {
    if node.is_error() || node.is_missing() {
        out.push(ParseIssue {
            span: ts_span(node),
            message: format!("syntax error at '{}'", node.kind()),
        });
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_parse_errors(child, out);
    }
}

fn module_stem(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string())
}

fn empty_document(
    source: &SourceFile,
    repo_id: &str,
    snapshot_id: &str,
    schema_version: &str,
    parse_errors: Vec<ParseIssue>,
) -> IRDocument {
    IRDocument {
        repo_id: repo_id.into(),
        snapshot_id: snapshot_id.into(),
        file_path: source.path.to_string_lossy().into_owned().into_boxed_str(),
        language: source.language.as_str().into(),
        schema_version: schema_version.into(),
        nodes: Vec::new(),
        edges: Vec::new(),
        occurrences: Vec::new(),
        signatures: Vec::new(),
        cfg_graphs: Vec::new(),
        bfg_graphs: Vec::new(),
        types: Vec::new(),
        meta: IRDocumentMeta {
            content_hash: source.content_hash.clone().into_boxed_str(),
            schema_version: schema_version.into(),
        },
        parse_errors,
        failures: Vec::new(),
        dfg_snapshots: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gen_py(code: &str) -> IRDocument {
        let source = SourceFile::from_memory("a.py", code, Language::Python);
        generate(&source, "repo", "snap", "4.1.0")
    }

    #[test]
    fn pure_add_produces_function_node() {
        let doc = gen_py("def add(x, y):\n    return x + y\n");
        let func = doc
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Function && n.name.as_ref() == "add")
            .expect("add function node present");
        assert_eq!(func.fqn.as_ref(), "a.add");
    }

    #[test]
    fn call_to_unknown_symbol_is_unresolved() {
        let doc = gen_py("def main():\n    return add(1, 2)\n");
        let call_edge = doc
            .edges
            .iter()
            .find(|e| e.kind == EdgeKind::Calls)
            .expect("calls edge present");
        assert!(call_edge.is_unresolved());
        assert_eq!(call_edge.unresolved_target_fqn.as_deref(), Some("add"));
    }

    #[test]
    fn call_to_local_symbol_resolves_immediately() {
        let doc = gen_py("def add(x, y):\n    return x + y\n\ndef main():\n    return add(1, 2)\n");
        let add_id = doc
            .nodes
            .iter()
            .find(|n| n.name.as_ref() == "add")
            .unwrap()
            .id;
        let call_edge = doc.edges.iter().find(|e| e.kind == EdgeKind::Calls).unwrap();
        assert!(!call_edge.is_unresolved());
        assert_eq!(call_edge.target_id, add_id);
    }

    #[test]
    fn partial_parse_records_parse_errors_but_keeps_siblings() {
        let doc = gen_py("def f(:\n    pass\n\ndef g():\n    pass\n");
        assert!(!doc.parse_errors.is_empty());
        assert!(doc.nodes.iter().any(|n| n.name.as_ref() == "g"));
    }

    #[test]
    fn import_from_emits_import_node_and_unresolved_edge() {
        let doc = gen_py("from a import add\n");
        let import_node = doc
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Import)
            .expect("import node present");
        assert_eq!(import_node.name.as_ref(), "add");
        let import_edge = doc
            .edges
            .iter()
            .find(|e| e.kind == EdgeKind::ImportFrom)
            .expect("import_from edge present");
        assert!(import_edge.is_unresolved());
    }
}
