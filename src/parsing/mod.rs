//! Multi-language parsing: tree-sitter grammar selection plus the
//! per-language lowering primitives in [`lowering`].
//!
//! Grounded on the teacher's `src/parsing/{language.rs,factory.rs}` split
//! between language enumeration and parser construction.

pub mod go;
pub mod javascript;
pub mod language;
pub mod lowering;
pub mod python;
pub mod rust;
pub mod typescript;

pub use language::Language;
pub use lowering::{ImportSpec, LanguageLowering, StructuralKind};

use tree_sitter::Parser;

/// Build a tree-sitter `Parser` already configured with `language`'s
/// grammar (teacher's `RustParser::new` pattern, generalized).
pub fn ts_parser_for(language: Language) -> Result<Parser, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&lowering_for(language).ts_language())
        .map_err(|e| format!("failed to set {language} grammar: {e}"))?;
    Ok(parser)
}

/// Resolve the lowering implementation for `language`.
pub fn lowering_for(language: Language) -> Box<dyn LanguageLowering> {
    match language {
        Language::Rust => Box::new(rust::RustLowering),
        Language::Python => Box::new(python::PythonLowering),
        Language::JavaScript => Box::new(javascript::JavaScriptLowering),
        Language::TypeScript => Box::new(typescript::TypeScriptLowering),
        Language::Go => Box::new(go::GoLowering),
    }
}
