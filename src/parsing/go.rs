use super::lowering::{ImportSpec, LanguageLowering, StructuralKind};
use super::Language;
use crate::types::Span;
use tree_sitter::Node as TsNode;

pub struct GoLowering;

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

impl LanguageLowering for GoLowering {
    fn language(&self) -> Language {
        Language::Go
    }

    fn ts_language(&self) -> tree_sitter::Language {
        tree_sitter_go::LANGUAGE.into()
    }

    fn classify(&self, ts_kind: &str) -> Option<StructuralKind> {
        match ts_kind {
            "source_file" => Some(StructuralKind::Module),
            "type_declaration" | "type_spec" | "struct_type" | "interface_type" => {
                Some(StructuralKind::Class)
            }
            "function_declaration" => Some(StructuralKind::Function),
            "method_declaration" => Some(StructuralKind::Method),
            "var_declaration" | "short_var_declaration" | "const_declaration" => {
                Some(StructuralKind::Variable)
            }
            "parameter_declaration" => Some(StructuralKind::Parameter),
            "call_expression" => Some(StructuralKind::Call),
            "import_spec" => Some(StructuralKind::Import),
            _ => None,
        }
    }

    fn extract_name<'a>(&self, node: TsNode, code: &'a str) -> Option<&'a str> {
        match node.kind() {
            "method_declaration" => node
                .child_by_field_name("name")
                .map(|n| &code[n.byte_range()]),
            _ => node
                .child_by_field_name("name")
                .map(|n| &code[n.byte_range()]),
        }
    }

    fn extract_params(&self, node: TsNode, code: &str) -> Vec<(Box<str>, Box<str>)> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for child in params.children(&mut cursor) {
            if child.kind() != "parameter_declaration" {
                continue;
            }
            let ty = child
                .child_by_field_name("type")
                .map(|n| code[n.byte_range()].to_string())
                .unwrap_or_default();
            let mut named = false;
            let mut inner = child.walk();
            for sub in child.children(&mut inner) {
                if sub.kind() == "identifier" {
                    named = true;
                    out.push((code[sub.byte_range()].into(), ty.clone().into_boxed_str()));
                }
            }
            if !named {
                out.push(("".into(), ty.into_boxed_str()));
            }
        }
        out
    }

    fn extract_return_type(&self, node: TsNode, code: &str) -> Box<str> {
        node.child_by_field_name("result")
            .map(|n| code[n.byte_range()].to_string().into_boxed_str())
            .unwrap_or_else(|| "".into())
    }

    fn extract_imports(&self, node: TsNode, code: &str) -> Vec<ImportSpec> {
        if node.kind() != "import_spec" {
            return Vec::new();
        }
        let path_node = node.child_by_field_name("path");
        let module_path = path_node
            .map(|n| code[n.byte_range()].trim_matches('"').to_string())
            .unwrap_or_default();
        let alias = node
            .child_by_field_name("name")
            .map(|n| code[n.byte_range()].into());
        let is_wildcard = alias.as_deref() == Some(".");
        vec![ImportSpec {
            module_path: module_path.into_boxed_str(),
            imported_name: None,
            alias,
            is_wildcard,
            span: ts_span(node),
        }]
    }

    fn call_target<'a>(&self, node: TsNode, code: &'a str) -> Option<(&'a str, Span)> {
        let func = node.child_by_field_name("function")?;
        let name_node = match func.kind() {
            "selector_expression" => func.child_by_field_name("field")?,
            _ => func,
        };
        Some((&code[name_node.byte_range()], ts_span(name_node)))
    }
}
