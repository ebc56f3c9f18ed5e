use super::lowering::{ImportSpec, LanguageLowering, StructuralKind};
use super::Language;
use crate::types::Span;
use tree_sitter::Node as TsNode;

pub struct JavaScriptLowering;

pub(super) fn ts_span(node: TsNode) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span::new(
        start.row as u32 + 1,
        start.column as u32,
        end.row as u32 + 1,
        end.column as u32,
    )
}

impl LanguageLowering for JavaScriptLowering {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn ts_language(&self) -> tree_sitter::Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn classify(&self, ts_kind: &str) -> Option<StructuralKind> {
        classify_js(ts_kind)
    }

    fn extract_params(&self, node: TsNode, code: &str) -> Vec<(Box<str>, Box<str>)> {
        extract_params_js(node, code)
    }

    fn extract_return_type(&self, _node: TsNode, _code: &str) -> Box<str> {
        "".into()
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

pub(super) fn classify_js(ts_kind: &str) -> Option<StructuralKind> {
    match ts_kind {
        "program" => Some(StructuralKind::Module),
        "class_declaration" => Some(StructuralKind::Class),
        "function_declaration" | "function" | "arrow_function" | "generator_function_declaration" => {
            Some(StructuralKind::Function)
        }
        "method_definition" => Some(StructuralKind::Method),
        "variable_declarator" => Some(StructuralKind::Variable),
        "required_parameter" | "optional_parameter" | "identifier" => Some(StructuralKind::Parameter),
        "call_expression" => Some(StructuralKind::Call),
        "import_statement" => Some(StructuralKind::Import),
        _ => None,
    }
}

pub(super) fn extract_params_js(node: TsNode, code: &str) -> Vec<(Box<str>, Box<str>)> {
    let Some(params) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for child in params.children(&mut cursor) {
        match child.kind() {
            "identifier" => out.push((code[child.byte_range()].into(), "".into())),
            "required_parameter" | "optional_parameter" => {
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
            "assignment_pattern" => {
                let name = child
                    .child_by_field_name("left")
                    .map(|n| code[n.byte_range()].to_string())
                    .unwrap_or_default();
                out.push((name.into_boxed_str(), "".into()));
            }
            _ => {}
        }
    }
    out
}

pub(super) fn extract_imports_js(node: TsNode, code: &str) -> Vec<ImportSpec> {
    if node.kind() != "import_statement" {
        return Vec::new();
    }
    let mut out = Vec::new();
    let module_path: Box<str> = node
        .child_by_field_name("source")
        .map(|n| code[n.byte_range()].trim_matches(|c| c == '"' || c == '\'').to_string())
        .unwrap_or_default()
        .into_boxed_str();

    let Some(clause) = node.named_children(&mut node.walk()).find(|n| n.kind() == "import_clause") else {
        out.push(ImportSpec {
            module_path,
            imported_name: None,
            alias: None,
            is_wildcard: false,
            span: ts_span(node),
        });
        return out;
    };
    let mut cursor = clause.walk();
    for child in clause.children(&mut cursor) {
        match child.kind() {
            "identifier" => out.push(ImportSpec {
                module_path: module_path.clone(),
                imported_name: Some("default".into()),
                alias: Some(code[child.byte_range()].into()),
                is_wildcard: false,
                span: ts_span(child),
            }),
            "namespace_import" => out.push(ImportSpec {
                module_path: module_path.clone(),
                imported_name: None,
                alias: None,
                is_wildcard: true,
                span: ts_span(child),
            }),
            "named_imports" => {
                let mut inner = child.walk();
                for spec in child.children(&mut inner) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let name_node = spec.child_by_field_name("name");
                    let alias_node = spec.child_by_field_name("alias");
                    out.push(ImportSpec {
                        module_path: module_path.clone(),
                        imported_name: name_node.map(|n| code[n.byte_range()].into()),
                        alias: alias_node.map(|n| code[n.byte_range()].into()),
                        is_wildcard: false,
                        span: ts_span(spec),
                    });
                }
            }
            _ => {}
        }
    }
    out
}

pub(super) fn call_target_js<'a>(node: TsNode, code: &'a str) -> Option<(&'a str, Span)> {
    let func = node.child_by_field_name("function")?;
    let name_node = match func.kind() {
        "member_expression" => func.child_by_field_name("property")?,
        _ => func,
    };
    Some((&code[name_node.byte_range()], ts_span(name_node)))
}

pub(super) fn extract_bases_js<'a>(node: TsNode, code: &'a str) -> Vec<&'a str> {
    let Some(heritage) = node.child_by_field_name("superclass") else {
        return Vec::new();
    };
    vec![&code[heritage.byte_range()]]
}
