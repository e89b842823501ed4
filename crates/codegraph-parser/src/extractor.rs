//! Node extraction (spec §4.2.1): walks a parsed TypeScript file top-down —
//! file → top-level functions → classes (methods, properties) → interfaces
//! (properties) → type aliases → top-level variables → object-literal and
//! factory-return methods — and builds the intermediate per-node bookkeeping
//! [`edges`] needs to emit CALLS/TAKES/RETURNS/EXTENDS/IMPLEMENTS/HAS_TYPE/
//! HAS_PROPERTY/REFERENCES/INCLUDES/ALIAS_FOR.
//!
//! Ordering is a contract, not an optimization: later phases rely on earlier
//! phases having already registered their names in the type/callable tables.

use std::collections::HashMap;

use codegraph_core::{
    generate_node_id, ClassPayload, Edge, FunctionPayload, InterfacePayload, MethodPayload, Node,
    NodeId, NodePayload, NodeType, Parameter, SyntheticTypePayload, SymbolPath, TypeAliasPayload,
    Visibility,
};
use thiserror::Error;
use tree_sitter::Node as TsNode;

use crate::context::ExtractionContext;
use crate::import_map::{build_import_map, ImportMap};
use crate::normalize::normalize_type_text;
use crate::source_tree::SourceTree;
use crate::util::{
    direct_child_of_any_kind, direct_child_of_kind, direct_children_of_kind, node_location,
    node_text,
};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Parse(#[from] crate::source_tree::ParseError),
}

/// The node set and edge set emitted for one file (spec §4.2: "Output:
/// `(nodes, edges)`").
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Per-file ingestion outcome report (spec §4.2.3).
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub file_path: String,
    pub nodes_added: usize,
    pub edges_added: usize,
    pub error: Option<String>,
}

/// A function-like thing whose body is walked for CALLS/REFERENCES/INCLUDES
/// and whose signature is walked for TAKES/RETURNS: a top-level function, a
/// class method, an arrow/function-expression assigned to a variable, or an
/// object-literal/synthetic-type method.
pub(crate) struct FunctionLike<'t> {
    pub id: NodeId,
    pub body: Option<TsNode<'t>>,
    pub params: Vec<Parameter>,
    pub return_type: Option<String>,
    /// Set for top-level factory functions: the synthetic type this function
    /// implicitly returns when it has no explicit return-type annotation.
    pub implicit_return_synthetic: Option<NodeId>,
    /// The enclosing class's name, for methods — resolves `this.x()` calls.
    pub owner_class: Option<String>,
}

pub(crate) struct ClassLike {
    pub id: NodeId,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    /// `(property_name, type_text)`.
    pub properties: Vec<(String, String)>,
}

pub(crate) struct InterfaceLike {
    pub id: NodeId,
    pub extends: Vec<String>,
    pub properties: Vec<(String, String)>,
}

pub(crate) struct TypeAliasLike {
    pub id: NodeId,
    pub aliased_type: String,
}

pub(crate) struct VariableLike {
    pub id: NodeId,
    pub type_text: Option<String>,
}

/// Collects node extraction output plus the bookkeeping `edges::build_edges`
/// consumes. Lives only for the duration of one file's extraction.
pub(crate) struct Collector<'a, 't> {
    pub content: &'a str,
    pub file_path: &'a str,
    pub package: &'a str,
    pub import_map: ImportMap,
    pub nodes: Vec<Node>,
    /// Local declaration name -> node ID, used both as the type map (spec
    /// §4.2.2) and the local-callable table for CALLS resolution.
    pub local_names: HashMap<String, NodeId>,
    /// Factory variable name -> its synthetic `ReturnType<typeof X>` node ID.
    pub synthetic_by_factory: HashMap<String, NodeId>,
    pub functions: Vec<FunctionLike<'t>>,
    pub classes: Vec<ClassLike>,
    pub interfaces: Vec<InterfaceLike>,
    pub type_aliases: Vec<TypeAliasLike>,
    pub variables: Vec<VariableLike>,
}

pub fn extract(
    source: &dyn SourceTree,
    ctx: &ExtractionContext<'_>,
) -> ExtractionOutcome {
    let content = source.content();
    let root = source.root();
    let import_map = build_import_map(root, content, &ctx.file_path);

    let mut collector = Collector {
        content,
        file_path: &ctx.file_path,
        package: &ctx.package,
        import_map,
        nodes: Vec::new(),
        local_names: HashMap::new(),
        synthetic_by_factory: HashMap::new(),
        functions: Vec::new(),
        classes: Vec::new(),
        interfaces: Vec::new(),
        type_aliases: Vec::new(),
        variables: Vec::new(),
    };

    let mut cursor = root.walk();
    let top_level: Vec<TsNode<'_>> = root.children(&mut cursor).collect();

    // Phase 1 — top-level functions.
    for top in &top_level {
        let decl = unwrap_export(*top);
        if decl.kind() == "function_declaration" {
            collect_function_declaration(&mut collector, decl);
        }
    }

    // Phase 2 — classes (+ methods, + properties).
    for top in &top_level {
        let decl = unwrap_export(*top);
        if decl.kind() == "class_declaration" {
            collect_class(&mut collector, decl, is_exported(*top));
        }
    }

    // Phase 3 — interfaces (+ properties).
    for top in &top_level {
        let decl = unwrap_export(*top);
        if decl.kind() == "interface_declaration" {
            collect_interface(&mut collector, decl, is_exported(*top));
        }
    }

    // Phase 4 — type aliases.
    for top in &top_level {
        let decl = unwrap_export(*top);
        if decl.kind() == "type_alias_declaration" {
            collect_type_alias(&mut collector, decl, is_exported(*top));
        }
    }

    // Phase 5 — top-level variables (+ factory synthetic types) and
    // Phase 6 — object-literal methods, interleaved per-declarator since a
    // variable's shape (factory vs. plain object vs. scalar) is decided here.
    for top in &top_level {
        let decl = unwrap_export(*top);
        if decl.kind() == "lexical_declaration" || decl.kind() == "variable_declaration" {
            collect_variable_statement(&mut collector, decl, is_exported(*top));
        }
    }

    let edges = crate::edges::build_edges(&collector, ctx);
    ExtractionOutcome {
        nodes: collector.nodes,
        edges,
    }
}

fn unwrap_export(node: TsNode<'_>) -> TsNode<'_> {
    if node.kind() == "export_statement" {
        let mut cursor = node.walk();
        if let Some(inner) = node.children(&mut cursor).find(|c| {
            matches!(
                c.kind(),
                "function_declaration"
                    | "class_declaration"
                    | "interface_declaration"
                    | "type_alias_declaration"
                    | "lexical_declaration"
                    | "variable_declaration"
            )
        }) {
            return inner;
        }
    }
    node
}

fn is_exported(node: TsNode<'_>) -> bool {
    node.kind() == "export_statement"
}

fn is_async(content: &str, node: TsNode<'_>) -> bool {
    direct_child_of_kind(node, "async").is_some()
        || node_text(content, node).trim_start().starts_with("async")
}

fn function_name(content: &str, node: TsNode<'_>) -> Option<String> {
    direct_child_of_any_kind(node, &["identifier", "property_identifier"]).map(|n| node_text(content, n))
}

fn collect_parameters(content: &str, node: TsNode<'_>) -> Vec<Parameter> {
    let Some(params) = direct_child_of_kind(node, "formal_parameters") else {
        return Vec::new();
    };
    let mut cursor = params.walk();
    params
        .children(&mut cursor)
        .filter(|c| {
            matches!(
                c.kind(),
                "required_parameter" | "optional_parameter" | "identifier" | "rest_pattern"
            )
        })
        .map(|param| {
            let name = direct_child_of_any_kind(
                param,
                &["identifier", "object_pattern", "array_pattern", "rest_pattern"],
            )
            .map(|n| node_text(content, n))
            .unwrap_or_else(|| node_text(content, param));
            let type_text = direct_child_of_kind(param, "type_annotation")
                .map(|t| normalize_type_text(&strip_colon(&node_text(content, t))));
            Parameter { name, type_text }
        })
        .collect()
}

fn strip_colon(raw: &str) -> String {
    raw.trim_start_matches(':').trim().to_string()
}

fn return_type_text(content: &str, node: TsNode<'_>) -> Option<String> {
    direct_child_of_kind(node, "type_annotation")
        .map(|t| normalize_type_text(&strip_colon(&node_text(content, t))))
}

fn function_body(node: TsNode<'_>) -> Option<TsNode<'_>> {
    direct_child_of_any_kind(node, &["statement_block", "object", "parenthesized_expression"])
}

fn collect_function_declaration<'t>(collector: &mut Collector<'_, 't>, decl: TsNode<'t>) {
    let Some(name) = function_name(collector.content, decl) else {
        return;
    };
    let (start_line, end_line) = node_location(decl);
    let params = collect_parameters(collector.content, decl);
    let return_type = return_type_text(collector.content, decl);
    let id = generate_node_id(collector.file_path, NodeType::Function, &SymbolPath::leaf(&name));

    collector.local_names.insert(name.clone(), id.clone());

    let body = function_body(decl);
    let implicit_return_synthetic = if return_type.is_none() {
        maybe_register_factory(collector, &name, decl, body, start_line, end_line)
    } else {
        None
    };

    collector.nodes.push(Node {
        id: id.clone(),
        name,
        package: collector.package.to_string(),
        file_path: collector.file_path.to_string(),
        start_line,
        end_line,
        exported: true,
        content_hash: None,
        snippet: node_text(collector.content, decl),
        payload: NodePayload::Function(FunctionPayload {
            parameters: params.clone(),
            return_type: return_type.clone(),
            is_async: is_async(collector.content, decl),
        }),
    });

    collector.functions.push(FunctionLike {
        id,
        body,
        params,
        return_type,
        implicit_return_synthetic,
        owner_class: None,
    });
}

/// If `body` returns (or is) an object literal, emits a `SyntheticType` node
/// named `ReturnType<typeof name>` plus one `Function` node per method on
/// that literal, and returns the synthetic node's ID so the caller can wire
/// an implicit RETURNS edge (spec §4.2.1, §4.2.2).
fn maybe_register_factory<'t>(
    collector: &mut Collector<'_, 't>,
    factory_name: &str,
    _decl: TsNode<'t>,
    body: Option<TsNode<'t>>,
    fallback_start: u32,
    fallback_end: u32,
) -> Option<NodeId> {
    let object_literal = body.and_then(find_returned_object)?;
    let (start_line, end_line) = node_location(object_literal);
    let (start_line, end_line) = if start_line == 0 {
        (fallback_start, fallback_end)
    } else {
        (start_line, end_line)
    };

    let synthetic_name = format!("ReturnType<typeof {factory_name}>");
    let synthetic_id = generate_node_id(
        collector.file_path,
        NodeType::SyntheticType,
        &SymbolPath::leaf(&synthetic_name),
    );

    collector.nodes.push(Node {
        id: synthetic_id.clone(),
        name: synthetic_name.clone(),
        package: collector.package.to_string(),
        file_path: collector.file_path.to_string(),
        start_line,
        end_line,
        exported: false,
        content_hash: None,
        snippet: node_text(collector.content, object_literal),
        payload: NodePayload::SyntheticType(SyntheticTypePayload),
    });
    collector.synthetic_by_factory.insert(factory_name.to_string(), synthetic_id.clone());

    collect_object_literal_methods(collector, &synthetic_name, object_literal);

    Some(synthetic_id)
}

/// `() => ({...})`, `() => { return {...}; }`, `function() { return {...}; }`.
fn find_returned_object<'t>(body: TsNode<'t>) -> Option<TsNode<'t>> {
    match body.kind() {
        "object" => Some(body),
        "parenthesized_expression" => {
            let mut cursor = body.walk();
            body.children(&mut cursor).find(|c| c.kind() == "object" || c.kind() == "parenthesized_expression")
                .and_then(find_returned_object)
        }
        "statement_block" => {
            let mut found = None;
            let mut cursor = body.walk();
            for stmt in body.children(&mut cursor) {
                if stmt.kind() == "return_statement" {
                    let mut inner_cursor = stmt.walk();
                    if let Some(arg) = stmt
                        .children(&mut inner_cursor)
                        .find(|c| c.kind() == "object" || c.kind() == "parenthesized_expression")
                    {
                        found = find_returned_object(arg);
                        if found.is_some() {
                            break;
                        }
                    }
                }
            }
            found
        }
        _ => None,
    }
}

/// Emits a `Function` node per property that is a method-shorthand, function
/// expression, or arrow function on an object literal, named
/// `{parent_name}.{method_name}` (spec §4.2.1).
fn collect_object_literal_methods<'t>(collector: &mut Collector<'_, 't>, parent_name: &str, object: TsNode<'t>) {
    let mut cursor = object.walk();
    for member in object.children(&mut cursor) {
        let (prop_name, fn_node): (String, Option<TsNode<'t>>) = match member.kind() {
            "method_definition" => {
                let name = function_name(collector.content, member).unwrap_or_default();
                (name, Some(member))
            }
            "pair" => {
                let Some(key) = direct_child_of_any_kind(
                    member,
                    &["property_identifier", "string", "identifier"],
                ) else {
                    continue;
                };
                let name = node_text(collector.content, key).trim_matches(['"', '\'']).to_string();
                let value = direct_child_of_any_kind(member, &["arrow_function", "function_expression"]);
                (name, value)
            }
            _ => continue,
        };
        let Some(fn_node) = fn_node else { continue };
        if prop_name.is_empty() {
            continue;
        }

        let (start_line, end_line) = node_location(member);
        let params = collect_parameters(collector.content, fn_node);
        let return_type = return_type_text(collector.content, fn_node);
        let symbol = SymbolPath::leaf(parent_name).join(&prop_name);
        let id = generate_node_id(collector.file_path, NodeType::Function, &symbol);
        collector.local_names.insert(format!("{parent_name}.{prop_name}"), id.clone());

        let body = function_body(fn_node);
        collector.nodes.push(Node {
            id: id.clone(),
            name: prop_name,
            package: collector.package.to_string(),
            file_path: collector.file_path.to_string(),
            start_line,
            end_line,
            exported: false,
            content_hash: None,
            snippet: node_text(collector.content, member),
            payload: NodePayload::Function(FunctionPayload {
                parameters: params.clone(),
                return_type: return_type.clone(),
                is_async: is_async(collector.content, fn_node),
            }),
        });
        collector.functions.push(FunctionLike {
            id,
            body,
            params,
            return_type,
            implicit_return_synthetic: None,
            owner_class: None,
        });
    }
}

fn heritage_names(content: &str, class_decl: TsNode<'_>, clause_kind: &str) -> Vec<String> {
    let Some(heritage) = direct_child_of_kind(class_decl, "class_heritage") else {
        return Vec::new();
    };
    let Some(clause) = direct_child_of_kind(heritage, clause_kind) else {
        return Vec::new();
    };
    let mut cursor = clause.walk();
    clause
        .children(&mut cursor)
        .filter(|c| matches!(c.kind(), "type_identifier" | "generic_type" | "identifier"))
        .map(|n| normalize_type_text(&node_text(content, n)))
        .collect()
}

fn collect_class<'t>(collector: &mut Collector<'_, 't>, decl: TsNode<'t>, exported: bool) {
    let Some(name) = direct_child_of_any_kind(decl, &["type_identifier", "identifier"])
        .map(|n| node_text(collector.content, n))
    else {
        return;
    };
    let (start_line, end_line) = node_location(decl);
    let id = generate_node_id(collector.file_path, NodeType::Class, &SymbolPath::leaf(&name));
    collector.local_names.insert(name.clone(), id.clone());

    let extends = heritage_names(collector.content, decl, "extends_clause").into_iter().next();
    let implements = heritage_names(collector.content, decl, "implements_clause");

    let mut properties = Vec::new();
    if let Some(body) = direct_child_of_kind(decl, "class_body") {
        let mut cursor = body.walk();
        let members: Vec<TsNode<'t>> = body.children(&mut cursor).collect();
        for member in &members {
            match member.kind() {
                "method_definition" => {
                    collect_method(collector, *member, &name, &id);
                }
                "public_field_definition" | "field_definition" => {
                    if let Some(prop_name) = direct_child_of_kind(*member, "property_identifier")
                        .map(|n| node_text(collector.content, n))
                    {
                        if let Some(type_text) = direct_child_of_kind(*member, "type_annotation")
                            .map(|t| normalize_type_text(&strip_colon(&node_text(collector.content, t))))
                        {
                            properties.push((prop_name, type_text));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    collector.nodes.push(Node {
        id: id.clone(),
        name,
        package: collector.package.to_string(),
        file_path: collector.file_path.to_string(),
        start_line,
        end_line,
        exported,
        content_hash: None,
        snippet: node_text(collector.content, decl),
        payload: NodePayload::Class(ClassPayload {
            extends: extends.clone(),
            implements: implements.clone(),
        }),
    });

    collector.classes.push(ClassLike {
        id,
        extends,
        implements,
        properties,
    });
}

fn collect_method<'t>(collector: &mut Collector<'_, 't>, member: TsNode<'t>, class_name: &str, _class_id: &NodeId) {
    let Some(name) = function_name(collector.content, member) else {
        return;
    };
    let (start_line, end_line) = node_location(member);
    let params = collect_parameters(collector.content, member);
    let return_type = return_type_text(collector.content, member);
    let symbol = SymbolPath::leaf(class_name).join(&name);
    let id = generate_node_id(collector.file_path, NodeType::Method, &symbol);
    collector.local_names.insert(format!("{class_name}.{name}"), id.clone());

    let visibility = if direct_child_of_kind(member, "private").is_some() {
        Visibility::Private
    } else if direct_child_of_kind(member, "protected").is_some() {
        Visibility::Protected
    } else {
        Visibility::Public
    };
    let is_static = direct_child_of_kind(member, "static").is_some();

    let body = function_body(member);
    collector.nodes.push(Node {
        id: id.clone(),
        name,
        package: collector.package.to_string(),
        file_path: collector.file_path.to_string(),
        start_line,
        end_line,
        exported: false,
        content_hash: None,
        snippet: node_text(collector.content, member),
        payload: NodePayload::Method(MethodPayload {
            parameters: params.clone(),
            return_type: return_type.clone(),
            is_async: is_async(collector.content, member),
            visibility,
            is_static,
        }),
    });
    collector.functions.push(FunctionLike {
        id,
        body,
        params,
        return_type,
        implicit_return_synthetic: None,
        owner_class: Some(class_name.to_string()),
    });
}

fn collect_interface(collector: &mut Collector<'_, '_>, decl: TsNode<'_>, exported: bool) {
    let Some(name) = direct_child_of_kind(decl, "type_identifier").map(|n| node_text(collector.content, n))
    else {
        return;
    };
    let (start_line, end_line) = node_location(decl);
    let id = generate_node_id(collector.file_path, NodeType::Interface, &SymbolPath::leaf(&name));
    collector.local_names.insert(name.clone(), id.clone());

    let extends = direct_child_of_any_kind(decl, &["extends_type_clause", "extends_clause"])
        .map(|clause| {
            let mut cursor = clause.walk();
            clause
                .children(&mut cursor)
                .filter(|c| matches!(c.kind(), "type_identifier" | "generic_type"))
                .map(|n| normalize_type_text(&node_text(collector.content, n)))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let mut properties = Vec::new();
    if let Some(body) = direct_child_of_kind(decl, "interface_body") {
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            match member.kind() {
                "property_signature" => {
                    if let Some(prop_name) =
                        direct_child_of_kind(member, "property_identifier").map(|n| node_text(collector.content, n))
                    {
                        if let Some(type_text) = direct_child_of_kind(member, "type_annotation")
                            .map(|t| normalize_type_text(&strip_colon(&node_text(collector.content, t))))
                        {
                            properties.push((prop_name, type_text));
                        }
                    }
                }
                "method_signature" => {
                    if let Some(prop_name) = function_name(collector.content, member) {
                        let return_type = return_type_text(collector.content, member).unwrap_or_default();
                        properties.push((prop_name, return_type));
                    }
                }
                _ => {}
            }
        }
    }

    collector.nodes.push(Node {
        id: id.clone(),
        name,
        package: collector.package.to_string(),
        file_path: collector.file_path.to_string(),
        start_line,
        end_line,
        exported,
        content_hash: None,
        snippet: node_text(collector.content, decl),
        payload: NodePayload::Interface(InterfacePayload { extends: extends.clone() }),
    });

    collector.interfaces.push(InterfaceLike { id, extends, properties });
}

fn collect_type_alias(collector: &mut Collector<'_, '_>, decl: TsNode<'_>, exported: bool) {
    let Some(name) = direct_child_of_kind(decl, "type_identifier").map(|n| node_text(collector.content, n)) else {
        return;
    };
    let (start_line, end_line) = node_location(decl);
    let id = generate_node_id(collector.file_path, NodeType::TypeAlias, &SymbolPath::leaf(&name));
    collector.local_names.insert(name.clone(), id.clone());

    // The aliased type is whatever comes after `=`: the last non-`type`,
    // non-name, non-`=` child.
    let mut cursor = decl.walk();
    let children: Vec<TsNode<'_>> = decl.children(&mut cursor).collect();
    let aliased_type = children
        .iter()
        .rev()
        .find(|c| !matches!(c.kind(), "type" | "type_identifier" | "=" | ";" | "type_parameters"))
        .map(|n| normalize_type_text(&node_text(collector.content, *n)))
        .unwrap_or_default();

    collector.nodes.push(Node {
        id: id.clone(),
        name,
        package: collector.package.to_string(),
        file_path: collector.file_path.to_string(),
        start_line,
        end_line,
        exported,
        content_hash: None,
        snippet: node_text(collector.content, decl),
        payload: NodePayload::TypeAlias(TypeAliasPayload {
            aliased_type: aliased_type.clone(),
        }),
    });

    collector.type_aliases.push(TypeAliasLike { id, aliased_type });
}

fn collect_variable_statement<'t>(collector: &mut Collector<'_, 't>, decl: TsNode<'t>, exported: bool) {
    let is_const = node_text(collector.content, decl).trim_start().starts_with("const");
    let mut cursor = decl.walk();
    let declarators: Vec<TsNode<'t>> = direct_children_of_kind(decl, "variable_declarator");
    let _ = &mut cursor;

    for declarator in declarators {
        let Some(name) = direct_child_of_any_kind(declarator, &["identifier"]).map(|n| node_text(collector.content, n))
        else {
            continue;
        };
        let type_text = direct_child_of_kind(declarator, "type_annotation")
            .map(|t| normalize_type_text(&strip_colon(&node_text(collector.content, t))));
        let initializer = direct_child_of_any_kind(
            declarator,
            &["arrow_function", "function_expression", "object", "call_expression"],
        );

        match initializer.map(|n| n.kind()) {
            Some("arrow_function") | Some("function_expression") => {
                // "Variables whose initializer is an arrow or function
                // expression are skipped (a Function node carries them
                // instead)" — spec §4.2.1.
                let fn_node = initializer.unwrap();
                let (start_line, end_line) = node_location(decl);
                let params = collect_parameters(collector.content, fn_node);
                let return_type = type_text.clone().or_else(|| return_type_text(collector.content, fn_node));
                let id = generate_node_id(collector.file_path, NodeType::Function, &SymbolPath::leaf(&name));
                collector.local_names.insert(name.clone(), id.clone());

                let body = function_body(fn_node);
                let implicit_return_synthetic = if return_type.is_none() {
                    maybe_register_factory(collector, &name, fn_node, body, start_line, end_line)
                } else {
                    None
                };

                collector.nodes.push(Node {
                    id: id.clone(),
                    name,
                    package: collector.package.to_string(),
                    file_path: collector.file_path.to_string(),
                    start_line,
                    end_line,
                    exported,
                    content_hash: None,
                    snippet: node_text(collector.content, decl),
                    payload: NodePayload::Function(FunctionPayload {
                        parameters: params.clone(),
                        return_type: return_type.clone(),
                        is_async: is_async(collector.content, fn_node),
                    }),
                });
                collector.functions.push(FunctionLike {
                    id,
                    body,
                    params,
                    return_type,
                    implicit_return_synthetic,
                    owner_class: None,
                });
            }
            Some("object") => {
                let (start_line, end_line) = node_location(declarator);
                let id = generate_node_id(collector.file_path, NodeType::Variable, &SymbolPath::leaf(&name));
                collector.local_names.insert(name.clone(), id.clone());
                collector.nodes.push(Node {
                    id: id.clone(),
                    name: name.clone(),
                    package: collector.package.to_string(),
                    file_path: collector.file_path.to_string(),
                    start_line,
                    end_line,
                    exported,
                    content_hash: None,
                    snippet: node_text(collector.content, declarator),
                    payload: NodePayload::Variable(codegraph_core::VariablePayload {
                        is_const,
                        variable_type: type_text.clone(),
                    }),
                });
                collector.variables.push(VariableLike { id, type_text });
                collect_object_literal_methods(collector, &name, initializer.unwrap());
            }
            _ => {
                let (start_line, end_line) = node_location(declarator);
                let id = generate_node_id(collector.file_path, NodeType::Variable, &SymbolPath::leaf(&name));
                collector.local_names.insert(name.clone(), id.clone());
                collector.nodes.push(Node {
                    id: id.clone(),
                    name,
                    package: collector.package.to_string(),
                    file_path: collector.file_path.to_string(),
                    start_line,
                    end_line,
                    exported,
                    content_hash: None,
                    snippet: node_text(collector.content, declarator),
                    payload: NodePayload::Variable(codegraph_core::VariablePayload {
                        is_const,
                        variable_type: type_text.clone(),
                    }),
                });
                collector.variables.push(VariableLike { id, type_text });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExtractionContext;
    use crate::source_tree::TypeScriptSource;
    use codegraph_core::NodeType;

    fn extract_src(src: &str) -> ExtractionOutcome {
        let source = TypeScriptSource::parse(src).unwrap();
        let ctx = ExtractionContext::new("src/a.ts", "root");
        extract(&source, &ctx)
    }

    #[test]
    fn extracts_top_level_function() {
        let out = extract_src("export function add(a: number, b: number): number { return a + b; }");
        let node = out.nodes.iter().find(|n| n.name == "add").unwrap();
        assert_eq!(node.node_type(), NodeType::Function);
        assert!(node.exported);
        match &node.payload {
            NodePayload::Function(f) => {
                assert_eq!(f.parameters.len(), 2);
                assert_eq!(f.return_type.as_deref(), Some("number"));
            }
            _ => panic!("expected function payload"),
        }
    }

    #[test]
    fn extracts_class_with_method_and_heritage() {
        let src = r#"
            class Base {}
            interface Saveable {}
            class UserService extends Base implements Saveable {
                private name: string;
                async save(): Promise<void> {}
            }
        "#;
        let out = extract_src(src);
        let class = out.nodes.iter().find(|n| n.name == "UserService").unwrap();
        match &class.payload {
            NodePayload::Class(c) => {
                assert_eq!(c.extends.as_deref(), Some("Base"));
                assert_eq!(c.implements, vec!["Saveable".to_string()]);
            }
            _ => panic!("expected class payload"),
        }
        let method = out
            .nodes
            .iter()
            .find(|n| n.id.symbol_path() == Some("UserService.save"))
            .unwrap();
        assert_eq!(method.node_type(), NodeType::Method);
    }

    #[test]
    fn factory_function_emits_synthetic_type_and_methods() {
        let src = r#"
            function makeCounter() {
                return {
                    increment() { return 1; },
                };
            }
        "#;
        let out = extract_src(src);
        assert!(out
            .nodes
            .iter()
            .any(|n| n.name == "ReturnType<typeof makeCounter>" && n.node_type() == NodeType::SyntheticType));
        assert!(out
            .nodes
            .iter()
            .any(|n| n.id.symbol_path() == Some("ReturnType<typeof makeCounter>.increment")));
    }

    #[test]
    fn object_literal_variable_emits_methods_under_its_name() {
        let src = r#"
            const api = {
                list() { return []; },
                create: () => null,
            };
        "#;
        let out = extract_src(src);
        assert!(out.nodes.iter().any(|n| n.id.symbol_path() == Some("api.list")));
        assert!(out.nodes.iter().any(|n| n.id.symbol_path() == Some("api.create")));
    }

    #[test]
    fn plain_variable_records_const_and_type() {
        let out = extract_src("export const MAX: number = 10;");
        let node = out.nodes.iter().find(|n| n.name == "MAX").unwrap();
        match &node.payload {
            NodePayload::Variable(v) => {
                assert!(v.is_const);
                assert_eq!(v.variable_type.as_deref(), Some("number"));
            }
            _ => panic!("expected variable payload"),
        }
    }

    #[test]
    fn type_alias_records_aliased_text() {
        let out = extract_src("type ID = string | number;");
        let node = out.nodes.iter().find(|n| n.name == "ID").unwrap();
        match &node.payload {
            NodePayload::TypeAlias(t) => assert_eq!(t.aliased_type, "string | number"),
            _ => panic!("expected type alias payload"),
        }
    }
}
