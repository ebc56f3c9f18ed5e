use super::lowering::{ImportSpec, LanguageLowering, StructuralKind};
use super::Language;
use crate::types::Span;
use tree_sitter::Node as TsNode;

pub struct RustLowering;

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

impl LanguageLowering for RustLowering {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn ts_language(&self) -> tree_sitter::Language {
        tree_sitter_rust::LANGUAGE.into()
    }

    fn classify(&self, ts_kind: &str) -> Option<StructuralKind> {
        match ts_kind {
            "source_file" => Some(StructuralKind::Module),
            "mod_item" => Some(StructuralKind::Module),
            "struct_item" | "enum_item" | "trait_item" | "impl_item" => Some(StructuralKind::Class),
            "function_item" => Some(StructuralKind::Function),
            "let_declaration" | "const_item" | "static_item" => Some(StructuralKind::Variable),
            "field_declaration" => Some(StructuralKind::Field),
            "parameter" | "self_parameter" => Some(StructuralKind::Parameter),
            "call_expression" => Some(StructuralKind::Call),
            "use_declaration" => Some(StructuralKind::Import),
            _ => None,
        }
    }

    fn extract_params(&self, node: TsNode, code: &str) -> Vec<(Box<str>, Box<str>)> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for child in params.children(&mut cursor) {
            match child.kind() {
                "parameter" => {
                    let name = child
                        .child_by_field_name("pattern")
                        .map(|n| code[n.byte_range()].to_string())
                        .unwrap_or_default();
                    let ty = child
                        .child_by_field_name("type")
                        .map(|n| code[n.byte_range()].to_string())
                        .unwrap_or_default();
                    out.push((name.into_boxed_str(), ty.into_boxed_str()));
                }
                "self_parameter" => {
                    out.push(("self".into(), "".into()));
                }
                _ => {}
            }
        }
        out
    }

    fn extract_return_type(&self, node: TsNode, code: &str) -> Box<str> {
        node.child_by_field_name("return_type")
            .map(|n| code[n.byte_range()].to_string().into_boxed_str())
            .unwrap_or_else(|| "".into())
    }

    fn extract_imports(&self, node: TsNode, code: &str) -> Vec<ImportSpec> {
        let mut out = Vec::new();
        if let Some(tree) = node.child_by_field_name("argument") {
            collect_use_tree(tree, code, String::new(), &mut out);
        }
        out
    }

    fn call_target<'a>(&self, node: TsNode, code: &'a str) -> Option<(&'a str, Span)> {
        let func = node.child_by_field_name("function")?;
        let name_node = match func.kind() {
            "field_expression" => func.child_by_field_name("field")?,
            _ => func,
        };
        Some((&code[name_node.byte_range()], ts_span(name_node)))
    }
}

fn collect_use_tree(node: TsNode, code: &str, prefix: String, out: &mut Vec<ImportSpec>) {
    match node.kind() {
        "identifier" | "scoped_identifier" | "crate" | "self" | "super" => {
            let segment = &code[node.byte_range()];
            let path = if prefix.is_empty() {
                segment.to_string()
            } else {
                format!("{prefix}::{segment}")
            };
            out.push(ImportSpec {
                module_path: path.into_boxed_str(),
                imported_name: None,
                alias: None,
                is_wildcard: false,
                span: ts_span(node),
            });
        }
        "use_as_clause" => {
            if let (Some(path_node), Some(alias_node)) = (
                node.child_by_field_name("path"),
                node.child_by_field_name("alias"),
            ) {
                let path = &code[path_node.byte_range()];
                out.push(ImportSpec {
                    module_path: path.into(),
                    imported_name: None,
                    alias: Some(code[alias_node.byte_range()].into()),
                    is_wildcard: false,
                    span: ts_span(node),
                });
            }
        }
        "use_wildcard" => {
            out.push(ImportSpec {
                module_path: prefix.into_boxed_str(),
                imported_name: None,
                alias: None,
                is_wildcard: true,
                span: ts_span(node),
            });
        }
        "scoped_use_list" | "use_list" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_use_tree(child, code, prefix.clone(), out);
            }
        }
        "use_tree" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_use_tree(child, code, prefix.clone(), out);
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_use_tree(child, code, prefix.clone(), out);
            }
        }
    }
}
