//! Edge extraction (spec §4.2.2): CALLS, TAKES, RETURNS, EXTENDS, IMPLEMENTS,
//! HAS_TYPE, HAS_PROPERTY, REFERENCES, INCLUDES, ALIAS_FOR. Runs after node
//! extraction, over the bookkeeping [`crate::extractor::Collector`] built.
//! Never consults the graph store — every edge references a node by ID,
//! resolved either locally or through the [`crate::context::ImportResolver`]
//! seam.

use std::collections::HashMap;

use codegraph_core::{Edge, EdgeType, LineRange, NodeId, ReferenceContext, TypeUseContext};
use tree_sitter::Node as TsNode;

use crate::context::ExtractionContext;
use crate::extractor::Collector;
use crate::normalize::{base_type_name, generic_argument, is_generic_wrapper, is_primitive_type};
use crate::util::node_text;

pub(crate) fn build_edges(collector: &Collector<'_, '_>, ctx: &ExtractionContext<'_>) -> Vec<Edge> {
    let mut edges = Vec::new();
    let type_map = build_type_map(collector, ctx);
    let callable_map = build_callable_map(collector, ctx);

    for class in &collector.classes {
        if let Some(target) = class.extends.as_ref().and_then(|name| type_map.get(name)) {
            edges.push(Edge::new(class.id.clone(), target.clone(), EdgeType::Extends));
        }
        for implemented in &class.implements {
            if let Some(target) = type_map.get(implemented) {
                edges.push(Edge::new(class.id.clone(), target.clone(), EdgeType::Implements));
            }
        }
        for (_, type_text) in &class.properties {
            emit_type_edges(&mut edges, &class.id, type_text, EdgeType::HasProperty, &type_map);
        }
    }

    for iface in &collector.interfaces {
        for extended in &iface.extends {
            if let Some(target) = type_map.get(extended) {
                edges.push(Edge::new(iface.id.clone(), target.clone(), EdgeType::Extends));
            }
        }
        for (_, type_text) in &iface.properties {
            emit_type_edges(&mut edges, &iface.id, type_text, EdgeType::HasProperty, &type_map);
        }
    }

    for variable in &collector.variables {
        if let Some(type_text) = &variable.type_text {
            emit_type_edges(&mut edges, &variable.id, type_text, EdgeType::HasType, &type_map);
        }
    }

    for alias in &collector.type_aliases {
        if let Some(factory) = factory_name_of_return_type(&alias.aliased_type) {
            if let Some(synthetic) = collector.synthetic_by_factory.get(factory) {
                edges.push(Edge::new(alias.id.clone(), synthetic.clone(), EdgeType::AliasFor));
            }
        }
    }

    for func in &collector.functions {
        for param in &func.params {
            if let Some(type_text) = &param.type_text {
                emit_type_edges(&mut edges, &func.id, type_text, EdgeType::Takes, &type_map);
            }
        }
        match (&func.return_type, &func.implicit_return_synthetic) {
            (Some(rt), _) => emit_type_edges(&mut edges, &func.id, rt, EdgeType::Returns, &type_map),
            (None, Some(synthetic)) => {
                edges.push(Edge::new(func.id.clone(), synthetic.clone(), EdgeType::Returns));
            }
            (None, None) => {}
        }

        if let Some(body) = func.body {
            collect_calls_and_references(
                &mut edges,
                collector.content,
                &func.id,
                body,
                &callable_map,
                func.owner_class.as_deref(),
            );
            collect_includes(&mut edges, collector.content, &func.id, body, &callable_map);
        }
    }

    edges
}

/// Local interfaces/classes/type-aliases plus import-resolved names (spec
/// §4.2.2's "type map").
fn build_type_map(collector: &Collector<'_, '_>, ctx: &ExtractionContext<'_>) -> HashMap<String, NodeId> {
    let mut map = HashMap::new();
    for (name, id) in &collector.local_names {
        if matches!(id.parts().map(|(_, t, _)| t), Some("Class") | Some("Interface") | Some("TypeAlias")) {
            map.insert(name.clone(), id.clone());
        }
    }
    merge_import_resolutions(&mut map, collector, ctx);
    map
}

/// Local functions/methods plus import-resolved callables, used for CALLS,
/// REFERENCES, and INCLUDES resolution.
fn build_callable_map(collector: &Collector<'_, '_>, ctx: &ExtractionContext<'_>) -> HashMap<String, NodeId> {
    let mut map = HashMap::new();
    for (name, id) in &collector.local_names {
        if matches!(id.parts().map(|(_, t, _)| t), Some("Function") | Some("Method") | Some("Class")) {
            map.insert(name.clone(), id.clone());
        }
    }
    merge_import_resolutions(&mut map, collector, ctx);
    map
}

fn merge_import_resolutions(map: &mut HashMap<String, NodeId>, collector: &Collector<'_, '_>, ctx: &ExtractionContext<'_>) {
    let Some(registry) = ctx.project_registry else {
        return;
    };
    for (local_name, binding) in collector.import_map.iter() {
        let Some(source_file) = &binding.source_file else {
            continue; // bare/package specifier: nothing in the graph to target
        };
        if let Some(id) = registry.resolve(source_file, &binding.imported_name) {
            map.insert(local_name.clone(), id);
        }
    }
}

fn type_use_context(edge_type: EdgeType) -> TypeUseContext {
    match edge_type {
        EdgeType::Takes => TypeUseContext::Parameter,
        EdgeType::Returns => TypeUseContext::Return,
        EdgeType::HasProperty => TypeUseContext::Property,
        _ => TypeUseContext::Variable,
    }
}

/// Splits a normalized type expression on top-level `|`/`&` and strips a
/// trailing `[]`, descends into generic-wrapper type arguments, skips
/// primitives, and emits an edge for whatever base type name resolves in
/// `type_map` (spec §4.2.2).
fn emit_type_edges(edges: &mut Vec<Edge>, source: &NodeId, type_text: &str, edge_type: EdgeType, type_map: &HashMap<String, NodeId>) {
    for leaf in split_type_expression(type_text) {
        let base = base_type_name(&leaf);
        if base.is_empty() || is_primitive_type(base) {
            continue;
        }
        if is_generic_wrapper(base) {
            if let Some(arg) = generic_argument(&leaf) {
                emit_type_edges(edges, source, arg, edge_type, type_map);
            }
            continue;
        }
        if let Some(target) = type_map.get(base) {
            let mut edge = Edge::new(source.clone(), target.clone(), edge_type);
            edge.metadata.context = Some(type_use_context(edge_type));
            edges.push(edge);
        }
    }
}

fn split_type_expression(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '<' | '[' => {
                depth += 1;
                current.push(ch);
            }
            '>' | ']' => {
                depth -= 1;
                current.push(ch);
            }
            '|' | '&' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
        .into_iter()
        .map(|p| p.trim().trim_end_matches("[]").trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn factory_name_of_return_type(aliased: &str) -> Option<&str> {
    aliased.strip_prefix("ReturnType<typeof ")?.strip_suffix('>')
}

fn resolve_callable(content: &str, node: TsNode<'_>, callable_map: &HashMap<String, NodeId>, owner_class: Option<&str>) -> Option<NodeId> {
    match node.kind() {
        "identifier" => callable_map.get(&node_text(content, node)).cloned(),
        "member_expression" => {
            let object = node.child_by_field_name("object")?;
            let property = node.child_by_field_name("property")?;
            let prop_name = node_text(content, property);
            let object_text = node_text(content, object);
            if object_text == "this" {
                let class = owner_class?;
                return callable_map.get(&format!("{class}.{prop_name}")).cloned();
            }
            callable_map
                .get(&format!("{object_text}.{prop_name}"))
                .cloned()
                .or_else(|| callable_map.get(&prop_name).cloned())
        }
        _ => None,
    }
}

/// Walks a function/method body recording CALLS (with aggregated
/// `call_count`/`call_sites`) and REFERENCES (non-call uses, tagged with
/// their syntactic context) edges to anything resolvable in `callable_map`
/// (spec §4.2.2).
fn collect_calls_and_references(
    edges: &mut Vec<Edge>,
    content: &str,
    source: &NodeId,
    body: TsNode<'_>,
    callable_map: &HashMap<String, NodeId>,
    owner_class: Option<&str>,
) {
    let mut call_sites: HashMap<NodeId, Vec<LineRange>> = HashMap::new();
    let mut reference_hits: HashMap<NodeId, ReferenceContext> = HashMap::new();
    walk_calls_and_refs(content, body, callable_map, owner_class, &mut call_sites, &mut reference_hits);

    for (target, sites) in call_sites {
        let mut edge = Edge::new(source.clone(), target, EdgeType::Calls);
        edge.metadata.call_count = Some(sites.len() as u32);
        edge.metadata.call_sites = Some(sites);
        edges.push(edge);
    }
    for (target, reference_context) in reference_hits {
        let mut edge = Edge::new(source.clone(), target, EdgeType::References);
        edge.metadata.reference_context = Some(reference_context);
        edges.push(edge);
    }
}

fn record_reference(
    content: &str,
    node: TsNode<'_>,
    callable_map: &HashMap<String, NodeId>,
    owner_class: Option<&str>,
    refs: &mut HashMap<NodeId, ReferenceContext>,
    context: ReferenceContext,
) {
    if matches!(node.kind(), "identifier" | "member_expression") {
        if let Some(target) = resolve_callable(content, node, callable_map, owner_class) {
            refs.entry(target).or_insert(context);
        }
    }
}

fn walk_calls_and_refs(
    content: &str,
    node: TsNode<'_>,
    callable_map: &HashMap<String, NodeId>,
    owner_class: Option<&str>,
    calls: &mut HashMap<NodeId, Vec<LineRange>>,
    refs: &mut HashMap<NodeId, ReferenceContext>,
) {
    match node.kind() {
        "call_expression" => {
            if let Some(func_node) = node.child_by_field_name("function") {
                if let Some(target) = resolve_callable(content, func_node, callable_map, owner_class) {
                    let start_line = node.start_position().row as u32 + 1;
                    let end_line = node.end_position().row as u32 + 1;
                    calls.entry(target).or_default().push(LineRange { start_line, end_line });
                }
            }
            if let Some(arguments) = node.child_by_field_name("arguments") {
                let mut cursor = arguments.walk();
                for arg in arguments.children(&mut cursor) {
                    record_reference(content, arg, callable_map, owner_class, refs, ReferenceContext::Callback);
                    walk_calls_and_refs(content, arg, callable_map, owner_class, calls, refs);
                }
            }
            return;
        }
        "return_statement" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                record_reference(content, child, callable_map, owner_class, refs, ReferenceContext::Return);
            }
        }
        "assignment_expression" => {
            if let Some(right) = node.child_by_field_name("right") {
                record_reference(content, right, callable_map, owner_class, refs, ReferenceContext::Assignment);
            }
        }
        "pair" => {
            if let Some(value) = node.child_by_field_name("value") {
                record_reference(content, value, callable_map, owner_class, refs, ReferenceContext::Property);
            }
        }
        "array" => {
            let mut cursor = node.walk();
            for element in node.children(&mut cursor) {
                record_reference(content, element, callable_map, owner_class, refs, ReferenceContext::Array);
            }
        }
        "expression_statement" => {
            if let Some(expr) = node.child(0) {
                record_reference(content, expr, callable_map, owner_class, refs, ReferenceContext::Access);
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_calls_and_refs(content, child, callable_map, owner_class, calls, refs);
    }
}

/// Capitalized identifiers used in markup-component position (spec §4.2.2).
/// `tree-sitter-typescript`'s plain TS grammar never produces `jsx_*` nodes,
/// so this only fires for sources parsed with [`Dialect::Tsx`] (selected by
/// [`TypeScriptSource::parse_for_path`] for `.tsx` files) — a no-op on
/// ordinary `.ts` input, not dead code.
fn collect_includes(edges: &mut Vec<Edge>, content: &str, source: &NodeId, body: TsNode<'_>, callable_map: &HashMap<String, NodeId>) {
    walk_jsx(content, body, source, callable_map, edges);
}

fn walk_jsx(content: &str, node: TsNode<'_>, source: &NodeId, callable_map: &HashMap<String, NodeId>, edges: &mut Vec<Edge>) {
    if matches!(node.kind(), "jsx_opening_element" | "jsx_self_closing_element") {
        let name_node = node
            .child_by_field_name("name")
            .or_else(|| crate::util::direct_child_of_kind(node, "identifier"));
        if let Some(name_node) = name_node {
            let name = node_text(content, name_node);
            if name.chars().next().is_some_and(char::is_uppercase) {
                if let Some(target) = callable_map.get(&name) {
                    edges.push(Edge::new(source.clone(), target.clone(), EdgeType::Includes));
                }
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_jsx(content, child, source, callable_map, edges);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExtractionContext;
    use crate::extractor::extract;
    use crate::source_tree::{Dialect, TypeScriptSource};
    use codegraph_core::NodeType;

    fn extract_src(src: &str) -> crate::extractor::ExtractionOutcome {
        let source = TypeScriptSource::parse(src).unwrap();
        let ctx = ExtractionContext::new("src/a.ts", "root");
        extract(&source, &ctx)
    }

    fn extract_tsx_src(src: &str) -> crate::extractor::ExtractionOutcome {
        let source = TypeScriptSource::parse_as(src, Dialect::Tsx).unwrap();
        let ctx = ExtractionContext::new("src/a.tsx", "root");
        extract(&source, &ctx)
    }

    #[test]
    fn calls_edge_aggregates_call_sites() {
        let src = r#"
            function helper() {}
            function run() {
                helper();
                helper();
            }
        "#;
        let out = extract_src(src);
        let edge = out
            .edges
            .iter()
            .find(|e| e.edge_type == EdgeType::Calls && e.source.symbol_path() == Some("run"))
            .unwrap();
        assert_eq!(edge.metadata.call_count, Some(2));
        assert_eq!(edge.metadata.call_sites.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn takes_and_returns_edges_resolve_local_interface() {
        let src = r#"
            interface User {}
            function save(user: User): User { return user; }
        "#;
        let out = extract_src(src);
        let user_id = out.nodes.iter().find(|n| n.name == "User").unwrap().id.clone();
        assert!(out.edges.iter().any(|e| e.edge_type == EdgeType::Takes && e.target == user_id));
        assert!(out.edges.iter().any(|e| e.edge_type == EdgeType::Returns && e.target == user_id));
    }

    #[test]
    fn promise_wrapper_descends_to_inner_type() {
        let src = r#"
            interface User {}
            class Repo {
                async find(): Promise<User> { return null as any; }
            }
        "#;
        let out = extract_src(src);
        let user_id = out.nodes.iter().find(|n| n.name == "User").unwrap().id.clone();
        assert!(out.edges.iter().any(|e| e.edge_type == EdgeType::Returns && e.target == user_id));
    }

    #[test]
    fn this_call_resolves_via_owner_class() {
        let src = r#"
            class Service {
                helper() {}
                run() { this.helper(); }
            }
        "#;
        let out = extract_src(src);
        let helper_id = out
            .nodes
            .iter()
            .find(|n| n.id.symbol_path() == Some("Service.helper"))
            .unwrap()
            .id
            .clone();
        assert!(out
            .edges
            .iter()
            .any(|e| e.edge_type == EdgeType::Calls && e.target == helper_id));
    }

    #[test]
    fn callback_argument_emits_reference_edge() {
        let src = r#"
            function onDone() {}
            function run(cb: () => void) { schedule(onDone); }
        "#;
        let out = extract_src(src);
        let target = out.nodes.iter().find(|n| n.name == "onDone").unwrap().id.clone();
        assert!(out
            .edges
            .iter()
            .any(|e| e.edge_type == EdgeType::References
                && e.target == target
                && e.metadata.reference_context == Some(ReferenceContext::Callback)));
    }

    #[test]
    fn includes_edge_links_a_tsx_component_to_the_jsx_element_it_renders() {
        let src = r#"
            function Header() { return null; }
            function App() {
                return <Header />;
            }
        "#;
        let out = extract_tsx_src(src);
        let header_id = out.nodes.iter().find(|n| n.name == "Header").unwrap().id.clone();
        let app_id = out.nodes.iter().find(|n| n.name == "App").unwrap().id.clone();
        assert!(out
            .edges
            .iter()
            .any(|e| e.edge_type == EdgeType::Includes && e.source == app_id && e.target == header_id));
    }

    #[test]
    fn alias_for_links_type_alias_to_synthetic_factory_type() {
        let src = r#"
            function makeStore() {
                return { get() { return 1; } };
            }
            type Store = ReturnType<typeof makeStore>;
        "#;
        let out = extract_src(src);
        let synthetic = out
            .nodes
            .iter()
            .find(|n| n.node_type() == NodeType::SyntheticType)
            .unwrap()
            .id
            .clone();
        let alias = out.nodes.iter().find(|n| n.name == "Store").unwrap().id.clone();
        assert!(out
            .edges
            .iter()
            .any(|e| e.edge_type == EdgeType::AliasFor && e.source == alias && e.target == synthetic));
    }

    #[test]
    fn extends_and_implements_resolve_to_local_declarations() {
        let src = r#"
            class Base {}
            interface Saveable {}
            class Impl extends Base implements Saveable {}
        "#;
        let out = extract_src(src);
        let base = out.nodes.iter().find(|n| n.name == "Base").unwrap().id.clone();
        let saveable = out.nodes.iter().find(|n| n.name == "Saveable").unwrap().id.clone();
        assert!(out.edges.iter().any(|e| e.edge_type == EdgeType::Extends && e.target == base));
        assert!(out
            .edges
            .iter()
            .any(|e| e.edge_type == EdgeType::Implements && e.target == saveable));
    }
}
