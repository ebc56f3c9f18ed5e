//! C5 — cross-file symbol resolver (spec §4.4).
//!
//! Input: every `IRDocument` in a snapshot. Output: a `GlobalContext`
//! holding the merged symbol table and import resolutions, with
//! `CALLS`/`REFERENCES_SYMBOL`/`IMPORT_*` edges patched in place wherever
//! their target became known. Never invents a symbol — an edge the
//! resolver cannot place keeps its `unresolved_target_fqn` guess.

use crate::irdoc::IRDocument;
use crate::types::{EdgeKind, Id, NodeKind};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Internal,
    ExternalStdlib,
    ExternalPackage,
    Unresolved,
}

#[derive(Debug, Clone)]
pub struct ImportResolution {
    pub target_module_path: Box<str>,
    pub kind: ImportKind,
}

/// The merged, read-only view over one snapshot's symbol space.
#[derive(Debug, Default)]
pub struct GlobalContext {
    /// `fqn -> (file_path, node_id)`, keyed on the fully-qualified name
    /// the generator assigned (spec §4.1 scope-stack fqn).
    pub symbol_table: HashMap<Box<str>, (Box<str>, Id)>,
    pub import_resolutions: Vec<ImportResolution>,
}

const PYTHON_STDLIB: &[&str] = &["os", "sys", "re", "json", "typing", "collections", "itertools", "math"];
const GO_STDLIB: &[&str] = &["fmt", "os", "strings", "strconv", "sync", "errors", "context"];
const NODE_BUILTINS: &[&str] = &["fs", "path", "http", "util", "events", "stream"];
const RUST_STD: &[&str] = &["std", "core", "alloc"];

fn is_stdlib(language: &str, module_path: &str) -> bool {
    let root = module_path.split(['.', ':', '/']).next().unwrap_or(module_path);
    match language {
        "python" => PYTHON_STDLIB.contains(&root),
        "go" => GO_STDLIB.contains(&root),
        "javascript" | "typescript" => NODE_BUILTINS.contains(&root),
        "rust" => RUST_STD.contains(&root),
        _ => false,
    }
}

/// Build the global symbol table and patch every unresolved edge across
/// `docs` in place.
pub fn resolve(docs: &mut [IRDocument]) -> GlobalContext {
    let mut ctx = GlobalContext::default();

    for doc in docs.iter() {
        for node in &doc.nodes {
            if matches!(
                node.kind,
                NodeKind::Function | NodeKind::Method | NodeKind::Class | NodeKind::Variable | NodeKind::Field
            ) {
                ctx.symbol_table
                    .entry(node.fqn.clone())
                    .or_insert_with(|| (doc.file_path.clone(), node.id));
            }
        }
    }

    // Module-path index: file stem (no extension) -> file_path, for
    // resolution order step (2) "absolute intra-repo imports".
    let module_index: HashMap<Box<str>, Box<str>> = docs
        .iter()
        .map(|doc| {
            let stem = std::path::Path::new(doc.file_path.as_ref())
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            (stem.into_boxed_str(), doc.file_path.clone())
        })
        .collect();

    for doc in docs.iter_mut() {
        let language = doc.language.clone();
        let doc_fqn_prefix = std::path::Path::new(doc.file_path.as_ref())
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        for edge in doc.edges.iter_mut() {
            if !edge.is_unresolved() {
                continue;
            }
            let guess = edge.unresolved_target_fqn.clone().unwrap_or_default();

            match edge.kind {
                EdgeKind::Calls | EdgeKind::ReferencesSymbol => {
                    if let Some(target_id) = resolve_symbol_reference(&ctx, &doc_fqn_prefix, &guess) {
                        edge.resolve_to(target_id);
                    }
                }
                EdgeKind::ImportModule | EdgeKind::ImportFrom | EdgeKind::ImportWildcard | EdgeKind::Imports => {
                    let module_path = edge
                        .attrs
                        .get("module_path")
                        .and_then(|v| v.as_str())
                        .unwrap_or(&guess)
                        .to_string();
                    let root_segment = module_path.split(['.', ':', '/']).next().unwrap_or(&module_path);
                    if let Some(target_path) = module_index.get(root_segment) {
                        if let Some(target_id) = resolve_in_module(&ctx, target_path, &guess) {
                            edge.resolve_to(target_id);
                        }
                    }
                }
                EdgeKind::Inherits => {
                    if let Some(target_id) = resolve_symbol_reference(&ctx, &doc_fqn_prefix, &guess) {
                        edge.resolve_to(target_id);
                    }
                }
                _ => {}
            }

            if edge.is_unresolved() {
                let kind = if matches!(
                    edge.kind,
                    EdgeKind::ImportModule | EdgeKind::ImportFrom | EdgeKind::ImportWildcard | EdgeKind::Imports
                ) {
                    classify_import(&language, &guess, &module_index)
                } else {
                    ImportKind::Unresolved
                };
                ctx.import_resolutions.push(ImportResolution {
                    target_module_path: guess.clone(),
                    kind,
                });
            }
        }
    }

    ctx
}

fn classify_import(language: &str, guess: &str, module_index: &HashMap<Box<str>, Box<str>>) -> ImportKind {
    let root = guess.split(['.', ':', '/']).next().unwrap_or(guess);
    if module_index.contains_key(root) {
        ImportKind::Internal
    } else if is_stdlib(language, guess) {
        ImportKind::ExternalStdlib
    } else {
        ImportKind::ExternalPackage
    }
}

/// Tiered lookup: (1) local — exact fqn match within the calling file's
/// own module prefix; (2) same-language cross-file match by bare name;
/// (3) cross-file public-only fallback (names not underscore-prefixed).
fn resolve_symbol_reference(ctx: &GlobalContext, local_module: &str, name: &str) -> Option<Id> {
    let local_fqn = format!("{local_module}.{name}");
    if let Some((_, id)) = ctx.symbol_table.get(local_fqn.as_str()) {
        return Some(*id);
    }
    if let Some((_, id)) = ctx.symbol_table.get(name) {
        return Some(*id);
    }
    for (fqn, (_, id)) in &ctx.symbol_table {
        if fqn.ends_with(&format!(".{name}")) && !name.starts_with('_') {
            return Some(*id);
        }
    }
    None
}

fn resolve_in_module(ctx: &GlobalContext, target_file: &str, guess: &str) -> Option<Id> {
    let module_stem = std::path::Path::new(target_file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = guess.rsplit('.').next().unwrap_or(guess);
    let target_fqn = format!("{module_stem}.{name}");
    ctx.symbol_table.get(target_fqn.as_str()).map(|(_, id)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator;
    use crate::parsing::Language;
    use crate::source::SourceFile;

    #[test]
    fn resolves_cross_file_call_after_import() {
        let a = SourceFile::from_memory("a.py", "def add(x, y):\n    return x+y\n", Language::Python);
        let b = SourceFile::from_memory(
            "b.py",
            "from a import add\n\ndef main():\n    return add(1, 2)\n",
            Language::Python,
        );
        let mut docs = vec![
            generator::generate(&a, "repo", "snap", "4.1.0"),
            generator::generate(&b, "repo", "snap", "4.1.0"),
        ];
        resolve(&mut docs);

        let b_doc = &docs[1];
        let calls_edge = b_doc
            .edges
            .iter()
            .find(|e| e.kind == EdgeKind::Calls)
            .expect("calls edge present");
        assert!(!calls_edge.is_unresolved(), "CALLS edge should resolve to a.add");

        let import_edge = b_doc
            .edges
            .iter()
            .find(|e| e.kind == EdgeKind::ImportFrom)
            .expect("import_from edge present");
        assert!(!import_edge.is_unresolved());
    }

    #[test]
    fn unresolved_reference_keeps_target_fqn_guess() {
        let a = SourceFile::from_memory("a.py", "def main():\n    return missing()\n", Language::Python);
        let mut docs = vec![generator::generate(&a, "repo", "snap", "4.1.0")];
        resolve(&mut docs);
        let edge = docs[0].edges.iter().find(|e| e.kind == EdgeKind::Calls).unwrap();
        assert!(edge.is_unresolved());
        assert_eq!(edge.unresolved_target_fqn.as_deref(), Some("missing"));
    }
}
