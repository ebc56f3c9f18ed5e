use super::javascript::{call_target_js, classify_js, extract_bases_js, extract_imports_js, extract_params_js};
use super::lowering::{ImportSpec, LanguageLowering, StructuralKind};
use super::Language;
use crate::types::Span;
use tree_sitter::Node as TsNode;

pub struct TypeScriptLowering;

impl LanguageLowering for TypeScriptLowering {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn ts_language(&self) -> tree_sitter::Language {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    }

    fn classify(&self, ts_kind: &str) -> Option<StructuralKind> {
        match ts_kind {
            "interface_declaration" | "type_alias_declaration" => Some(StructuralKind::Class),
            other => classify_js(other),
        }
    }

    fn extract_params(&self, node: TsNode, code: &str) -> Vec<(Box<str>, Box<str>)> {
        extract_params_js(node, code)
    }

    fn extract_return_type(&self, node: TsNode, code: &str) -> Box<str> {
        node.child_by_field_name("return_type")
            .map(|n| code[n.byte_range()].trim_start_matches(':').trim().to_string())
            .unwrap_or_default()
            .into_boxed_str()
    }

    fn extract_imports(&self, node: TsNode, code: &str) -> Vec<ImportSpec> {
        extract_imports_js(node, code)
    }

    fn call_target<'a>(&self, node: TsNode, code: &'a str) -> Option<(&'a str, Span)> {
        call_target_js(node, code)
    }

    fn extract_bases<'a>(&self, node: TsNode, code: &'a str) -> Vec<&'a str> {
        extract_bases_js(node, code)
    }
}
