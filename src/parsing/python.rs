use super::lowering::{ImportSpec, LanguageLowering, StructuralKind};
use super::Language;
use crate::types::Span;
use tree_sitter::Node as TsNode;

pub struct PythonLowering;

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

impl LanguageLowering for PythonLowering {
    fn language(&self) -> Language {
        Language::Python
    }

    fn ts_language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn classify(&self, ts_kind: &str) -> Option<StructuralKind> {
        match ts_kind {
            "module" => Some(StructuralKind::Module),
            "class_definition" => Some(StructuralKind::Class),
            "function_definition" => Some(StructuralKind::Function),
            "assignment" => Some(StructuralKind::Variable),
            "parameter" | "identifier" | "typed_parameter" | "default_parameter" => {
                Some(StructuralKind::Parameter)
            }
            "call" => Some(StructuralKind::Call),
            "import_statement" | "import_from_statement" => Some(StructuralKind::Import),
            _ => None,
        }
    }

    fn extract_name<'a>(&self, node: TsNode, code: &'a str) -> Option<&'a str> {
        match node.kind() {
            "assignment" => {
                let left = node.child_by_field_name("left")?;
                Some(&code[left.byte_range()])
            }
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
            match child.kind() {
                "identifier" => {
                    out.push((code[child.byte_range()].into(), "".into()));
                }
                "typed_parameter" => {
                    let name = child
                        .child(0)
                        .map(|n| code[n.byte_range()].to_string())
                        .unwrap_or_default();
                    let ty = child
                        .child_by_field_name("type")
                        .map(|n| code[n.byte_range()].to_string())
                        .unwrap_or_default();
                    out.push((name.into_boxed_str(), ty.into_boxed_str()));
                }
                "default_parameter" | "typed_default_parameter" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| code[n.byte_range()].to_string())
                        .unwrap_or_default();
                    let ty = child
                        .child_by_field_name("type")
                        .map(|n| code[n.byte_range()].to_string())
                        .unwrap_or_default();
                    out.push((name.into_boxed_str(), ty.into_boxed_str()));
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
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if matches!(child.kind(), "dotted_name" | "aliased_import") {
                        out.push(import_from_name_node(child, code));
                    }
                }
            }
            "import_from_statement" => {
                let module_node = node.child_by_field_name("module_name");
                let module_path = module_node
                    .map(|n| code[n.byte_range()].to_string())
                    .unwrap_or_default();
                let mut cursor = node.walk();
                let mut saw_name = false;
                let module_id = module_node.map(|n| n.id());
                for child in node.children(&mut cursor) {
                    match child.kind() {
                        "wildcard_import" => {
                            out.push(ImportSpec {
                                module_path: module_path.clone().into_boxed_str(),
                                imported_name: None,
                                alias: None,
                                is_wildcard: true,
                                span: ts_span(node),
                            });
                        }
                        "dotted_name" if Some(child.id()) != module_id => {
                            saw_name = true;
                            out.push(ImportSpec {
                                module_path: module_path.clone().into_boxed_str(),
                                imported_name: Some(code[child.byte_range()].into()),
                                alias: None,
                                is_wildcard: false,
                                span: ts_span(child),
                            });
                        }
                        "aliased_import" => {
                            saw_name = true;
                            let name_node = child.child_by_field_name("name");
                            let alias_node = child.child_by_field_name("alias");
                            out.push(ImportSpec {
                                module_path: module_path.clone().into_boxed_str(),
                                imported_name: name_node
                                    .map(|n| code[n.byte_range()].into()),
                                alias: alias_node.map(|n| code[n.byte_range()].into()),
                                is_wildcard: false,
                                span: ts_span(child),
                            });
                        }
                        _ => {}
                    }
                }
                if !saw_name && out.is_empty() {
                    out.push(ImportSpec {
                        module_path: module_path.into_boxed_str(),
                        imported_name: None,
                        alias: None,
                        is_wildcard: false,
                        span: ts_span(node),
                    });
                }
            }
            _ => {}
        }
        out
    }

    fn call_target<'a>(&self, node: TsNode, code: &'a str) -> Option<(&'a str, Span)> {
        let func = node.child_by_field_name("function")?;
        let name_node = match func.kind() {
            "attribute" => func.child_by_field_name("attribute")?,
            _ => func,
        };
        Some((&code[name_node.byte_range()], ts_span(name_node)))
    }

    fn extract_bases<'a>(&self, node: TsNode, code: &'a str) -> Vec<&'a str> {
        let Some(args) = node.child_by_field_name("superclasses") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = args.walk();
        for child in args.children(&mut cursor) {
            if child.kind() == "identifier" {
                out.push(&code[child.byte_range()]);
            }
        }
        out
    }
}

fn import_from_name_node(node: TsNode, code: &str) -> ImportSpec {
    if node.kind() == "aliased_import" {
        let name_node = node.child_by_field_name("name");
        let alias_node = node.child_by_field_name("alias");
        ImportSpec {
            module_path: name_node
                .map(|n| code[n.byte_range()].to_string())
                .unwrap_or_default()
                .into_boxed_str(),
            imported_name: None,
            alias: alias_node.map(|n| code[n.byte_range()].into()),
            is_wildcard: false,
            span: ts_span(node),
        }
    } else {
        ImportSpec {
            module_path: code[node.byte_range()].into(),
            imported_name: None,
            alias: None,
            is_wildcard: false,
            span: ts_span(node),
        }
    }
}
