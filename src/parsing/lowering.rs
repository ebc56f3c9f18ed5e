//! The per-language trait boundary the generic structural generator (C2,
//! see `crate::generator`) walks against.
//!
//! The teacher's per-language parsers (`rust.rs`, `python.rs`, ...) each
//! hand-roll their own tree walk and symbol extraction end to end. That
//! design fit the teacher's `Symbol`-centric output; this crate's IR is
//! node/edge based and shared across five languages with one scope-stack
//! walk (spec §4.1), so the per-language surface is narrowed to just the
//! classification and extraction primitives that differ language to
//! language — field names, import syntax, call-expression shape — and the
//! walk itself lives once in `generator.rs`.

use crate::parsing::Language;
use tree_sitter::Node as TsNode;

/// What role a tree-sitter node plays in the structural IR (spec §3
/// node kinds, restricted to what C2 emits — no CFG/type info yet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralKind {
    Module,
    Class,
    Function,
    Method,
    Variable,
    Field,
    Parameter,
    Call,
    Import,
}

/// One resolved-or-not import target, as lexically written.
#[derive(Debug, Clone)]
pub struct ImportSpec {
    /// Dotted/slashed module path as written, e.g. `a.b` or `./a`.
    pub module_path: Box<str>,
    /// Specific name imported, e.g. `from a import add` → `Some("add")`.
    pub imported_name: Option<Box<str>>,
    pub alias: Option<Box<str>>,
    pub is_wildcard: bool,
    pub span: crate::types::Span,
}

/// Per-language primitives the generic generator calls into.
///
/// Implementations are thin: classification is a `match` over
/// `TsNode::kind()`, and extraction reads tree-sitter's named fields
/// (`child_by_field_name`), matching the teacher's `rust.rs`/`python.rs`
/// pattern of walking fields rather than positional children.
pub trait LanguageLowering: Send + Sync {
    fn language(&self) -> Language;

    fn ts_language(&self) -> tree_sitter::Language;

    /// Classify a tree-sitter node kind string into a structural role, if
    /// it names one of the kinds this crate's IR tracks.
    fn classify(&self, ts_kind: &str) -> Option<StructuralKind>;

    /// The `name` field's text for a class/function/method/variable node.
    fn extract_name<'a>(&self, node: TsNode, code: &'a str) -> Option<&'a str> {
        node.child_by_field_name("name")
            .map(|n| &code[n.byte_range()])
    }

    /// `(param_name, type_str)` pairs for a function/method node. Untyped
    /// parameters carry an empty type string.
    fn extract_params(&self, node: TsNode, code: &str) -> Vec<(Box<str>, Box<str>)>;

    /// Declared return type text, empty string if absent/untyped.
    fn extract_return_type(&self, node: TsNode, code: &str) -> Box<str>;

    /// Import specs produced by an import-statement node (spec §4.1
    /// "one Node per import... plus an edge IMPORTS/IMPORT_MODULE/
    /// IMPORT_FROM/IMPORT_WILDCARD").
    fn extract_imports(&self, node: TsNode, code: &str) -> Vec<ImportSpec>;

    /// The callee name and its span for a call-expression node.
    fn call_target<'a>(&self, node: TsNode, code: &'a str) -> Option<(&'a str, crate::types::Span)>;

    /// Whether a `class`-role node lists base classes, and their names
    /// (for `INHERITS` edges). Default: no inheritance.
    fn extract_bases<'a>(&self, _node: TsNode, _code: &'a str) -> Vec<&'a str> {
        Vec::new()
    }
}
