//! Output formatting (component C11, spec §4.10): a textual graph-layout
//! diagram, display-name disambiguation, call-site-aware snippet extraction,
//! and the `mcp`/`mermaid` rendering formats.

use std::collections::{HashMap, HashSet, VecDeque};

use codegraph_core::{Edge, EdgeType, LineRange, Node, NodeId, NodeType};

use crate::engine::QueryResult;

/// A small-function threshold below which the whole snippet is shown rather
/// than windowed around call sites (spec §4.10).
const SMALL_FUNCTION_THRESHOLD: usize = 15;
/// Baseline context-lines budget; divided by the result-set size so smaller
/// results get more surrounding context per node (spec §4.10 "inversely
/// proportional to the number of nodes being shown").
const BASE_CONTEXT_BUDGET: usize = 40;
const MIN_CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Mcp,
    Mermaid,
}

/// The rendered dependency diagram plus first-appearance node order (spec
/// §4.10 "Graph layout").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphLayout {
    pub text: String,
    pub node_order: Vec<NodeId>,
}

struct Adjacency {
    all_nodes: Vec<NodeId>,
    outgoing: HashMap<NodeId, Vec<Edge>>,
    incoming_count: HashMap<NodeId, usize>,
}

fn build_adjacency(edges: &[Edge]) -> Adjacency {
    let mut all_nodes = Vec::new();
    let mut seen = HashSet::new();
    let mut outgoing: HashMap<NodeId, Vec<Edge>> = HashMap::new();
    let mut incoming_count: HashMap<NodeId, usize> = HashMap::new();

    for edge in edges {
        if seen.insert(edge.source.clone()) {
            all_nodes.push(edge.source.clone());
        }
        if seen.insert(edge.target.clone()) {
            all_nodes.push(edge.target.clone());
        }
        outgoing.entry(edge.source.clone()).or_default().push(edge.clone());
        *incoming_count.entry(edge.target.clone()).or_insert(0) += 1;
    }

    Adjacency {
        all_nodes,
        outgoing,
        incoming_count,
    }
}

/// Builds the graph-layout diagram (spec §4.10 steps 1-5): roots (and, absent
/// any, a pseudo-root per unvisited cycle) seed a DFS; linear single-
/// incoming/single-outgoing chains collapse onto one line; branches start a
/// new line per outgoing edge.
pub fn build_layout(edges: &[Edge], display: &HashMap<NodeId, String>) -> GraphLayout {
    if edges.is_empty() {
        return GraphLayout::default();
    }

    let adj = build_adjacency(edges);
    let mut visited = HashSet::new();
    let mut rendered_as_start = HashSet::new();
    let mut node_order = Vec::new();
    let mut lines = Vec::new();

    let name = |id: &NodeId| display.get(id).cloned().unwrap_or_else(|| id.as_str().to_string());

    fn mark_visited(id: &NodeId, visited: &mut HashSet<NodeId>, node_order: &mut Vec<NodeId>) {
        if visited.insert(id.clone()) {
            node_order.push(id.clone());
        }
    }

    fn walk(
        node: &NodeId,
        adj: &Adjacency,
        visited: &mut HashSet<NodeId>,
        rendered_as_start: &mut HashSet<NodeId>,
        node_order: &mut Vec<NodeId>,
        lines: &mut Vec<String>,
        name: &impl Fn(&NodeId) -> String,
    ) {
        let Some(outs) = adj.outgoing.get(node) else {
            return;
        };
        for first_edge in outs {
            let mut line = name(node);
            let mut chain_members: HashSet<NodeId> = HashSet::new();
            chain_members.insert(node.clone());

            let mut current_edge = first_edge.clone();
            let final_target = loop {
                line.push_str(&format!(" --{}--> {}", current_edge.edge_type, name(&current_edge.target)));
                let target = current_edge.target.clone();
                mark_visited(&target, visited, node_order);
                chain_members.insert(target.clone());

                let target_outs = adj.outgoing.get(&target);
                let indegree = *adj.incoming_count.get(&target).unwrap_or(&0);
                let collapsible = matches!(target_outs, Some(v) if v.len() == 1) && indegree == 1;

                if collapsible {
                    let next_edge = target_outs.unwrap()[0].clone();
                    if chain_members.contains(&next_edge.target) {
                        break target; // cycle back into this line; stop collapsing
                    }
                    current_edge = next_edge;
                    continue;
                }
                break target;
            };

            lines.push(line);

            if adj.outgoing.get(&final_target).is_some() && rendered_as_start.insert(final_target.clone()) {
                walk(&final_target, adj, visited, rendered_as_start, node_order, lines, name);
            }
        }
    }

    let roots: Vec<NodeId> = adj
        .all_nodes
        .iter()
        .filter(|n| adj.incoming_count.get(*n).copied().unwrap_or(0) == 0)
        .cloned()
        .collect();

    for root in &roots {
        mark_visited(root, &mut visited, &mut node_order);
        if rendered_as_start.insert(root.clone()) {
            walk(root, &adj, &mut visited, &mut rendered_as_start, &mut node_order, &mut lines, &name);
        }
    }

    // Rootless cycles: every remaining unvisited node becomes a pseudo-root
    // (spec §4.10 step 4).
    for node in &adj.all_nodes {
        if visited.contains(node) {
            continue;
        }
        mark_visited(node, &mut visited, &mut node_order);
        if rendered_as_start.insert(node.clone()) {
            walk(node, &adj, &mut visited, &mut rendered_as_start, &mut node_order, &mut lines, &name);
        }
    }

    GraphLayout {
        text: lines.join("\n"),
        node_order,
    }
}

fn minimal_unique_suffixes(paths: &[String]) -> Vec<String> {
    let split: Vec<Vec<&str>> = paths.iter().map(|p| p.split('/').collect()).collect();
    let max_len = split.iter().map(|s| s.len()).max().unwrap_or(1);

    for k in 1..=max_len {
        let suffixes: Vec<String> = split
            .iter()
            .map(|segs| {
                let start = segs.len().saturating_sub(k);
                segs[start..].join("/")
            })
            .collect();
        let unique: HashSet<&String> = suffixes.iter().collect();
        if unique.len() == suffixes.len() {
            return suffixes;
        }
    }
    paths.to_vec()
}

/// Computes one display name per node (spec §4.10 "Display-name
/// disambiguation"): the alias-substituted base name, disambiguated by type
/// and then by minimal unique file-path suffix when names collide.
pub fn compute_display_names(nodes: &[Node], alias_map: &HashMap<String, String>) -> HashMap<NodeId, String> {
    let mut groups: HashMap<String, Vec<&Node>> = HashMap::new();
    for node in nodes {
        let base = alias_map.get(&node.name).cloned().unwrap_or_else(|| node.name.clone());
        groups.entry(base).or_default().push(node);
    }

    let mut result = HashMap::new();
    for (base, group) in groups {
        if group.len() == 1 {
            result.insert(group[0].id.clone(), base);
            continue;
        }

        let mut by_type: HashMap<NodeType, Vec<&Node>> = HashMap::new();
        for node in &group {
            by_type.entry(node.node_type()).or_default().push(node);
        }

        if by_type.len() > 1 {
            for (node_type, subgroup) in by_type {
                if subgroup.len() == 1 {
                    result.insert(subgroup[0].id.clone(), format!("{base} ({node_type})"));
                } else {
                    let paths: Vec<String> = subgroup.iter().map(|n| n.file_path.clone()).collect();
                    let suffixes = minimal_unique_suffixes(&paths);
                    for (node, suffix) in subgroup.iter().zip(suffixes) {
                        result.insert(node.id.clone(), format!("{base} ({node_type}, {suffix})"));
                    }
                }
            }
        } else {
            let paths: Vec<String> = group.iter().map(|n| n.file_path.clone()).collect();
            let suffixes = minimal_unique_suffixes(&paths);
            for (node, suffix) in group.iter().zip(suffixes) {
                result.insert(node.id.clone(), format!("{base} ({suffix})"));
            }
        }
    }
    result
}

fn context_lines_budget(node_count: usize) -> usize {
    (BASE_CONTEXT_BUDGET / node_count.max(1)).max(MIN_CONTEXT_LINES)
}

fn collect_call_sites(edges: &[Edge], node_id: &NodeId) -> Vec<LineRange> {
    edges
        .iter()
        .filter(|e| e.edge_type == EdgeType::Calls && (e.source == *node_id || e.target == *node_id))
        .filter_map(|e| e.metadata.call_sites.clone())
        .flatten()
        .collect()
}

/// Extracts the portion of `node`'s snippet worth showing: the whole body
/// for small nodes, else windows around each call-site range merged with
/// `"... N lines omitted ..."` gaps and `> `-marked call-site lines (spec
/// §4.10 "Snippet extraction").
fn extract_snippet(node: &Node, call_sites: &[LineRange], context_lines: usize) -> String {
    let lines: Vec<&str> = node.snippet.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    if lines.len() <= SMALL_FUNCTION_THRESHOLD || call_sites.is_empty() {
        return node.snippet.clone();
    }

    let to_local = |file_line: u32| file_line.saturating_sub(node.start_line) as usize;

    let mut windows: Vec<(usize, usize)> = call_sites
        .iter()
        .map(|r| {
            let start = to_local(r.start_line).saturating_sub(context_lines);
            let end = (to_local(r.end_line) + context_lines).min(lines.len() - 1);
            (start, end)
        })
        .collect();
    windows.sort();

    let mut merged: Vec<(usize, usize)> = Vec::new();
    for window in windows.drain(..) {
        match merged.last_mut() {
            Some(last) if window.0 <= last.1 + 1 => last.1 = last.1.max(window.1),
            _ => merged.push(window),
        }
    }

    let call_site_lines: HashSet<usize> = call_sites
        .iter()
        .flat_map(|r| to_local(r.start_line)..=to_local(r.end_line))
        .collect();

    let mut out = String::new();
    let mut prev_end: Option<usize> = None;
    for (start, end) in merged {
        if let Some(prev) = prev_end {
            if start > prev + 1 {
                out.push_str(&format!("... {} lines omitted ...\n", start - prev - 1));
            }
        }
        for i in start..=end {
            out.push_str(if call_site_lines.contains(&i) { "> " } else { "  " });
            out.push_str(lines[i]);
            out.push('\n');
        }
        prev_end = Some(end);
    }
    out
}

fn format_mcp(result: &QueryResult, layout: &GraphLayout, display: &HashMap<NodeId, String>) -> String {
    let mut out = String::new();
    out.push_str("## Graph\n");
    if layout.text.is_empty() {
        out.push_str("(no edges)\n");
    } else {
        out.push_str(&layout.text);
        out.push('\n');
    }

    out.push_str("\n## Nodes\n");
    let budget = context_lines_budget(result.nodes.len());
    for node in &result.nodes {
        let name = display.get(&node.id).cloned().unwrap_or_else(|| node.name.clone());
        out.push_str(&format!("\n### {name}\n"));
        out.push_str(&format!("- type: {}\n", node.node_type()));
        out.push_str(&format!("- file: {}:{}-{}\n", node.file_path, node.start_line, node.end_line));
        let call_sites = collect_call_sites(&result.edges, &node.id);
        let snippet = extract_snippet(node, &call_sites, budget);
        if !snippet.is_empty() {
            out.push_str("```\n");
            out.push_str(&snippet);
            out.push_str("```\n");
        }
    }
    out
}

fn sanitize_mermaid_id(id: &NodeId) -> String {
    id.as_str()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

fn connected_components(edges: &[Edge]) -> Vec<Vec<Edge>> {
    let mut touching: HashMap<NodeId, Vec<usize>> = HashMap::new();
    for (i, edge) in edges.iter().enumerate() {
        touching.entry(edge.source.clone()).or_default().push(i);
        touching.entry(edge.target.clone()).or_default().push(i);
    }

    let mut visited = vec![false; edges.len()];
    let mut components = Vec::new();
    for start in 0..edges.len() {
        if visited[start] {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited[start] = true;
        while let Some(idx) = queue.pop_front() {
            component.push(edges[idx].clone());
            let edge = &edges[idx];
            for node in [&edge.source, &edge.target] {
                if let Some(neighbors) = touching.get(node) {
                    for &n in neighbors {
                        if !visited[n] {
                            visited[n] = true;
                            queue.push_back(n);
                        }
                    }
                }
            }
        }
        components.push(component);
    }
    components
}

fn format_mermaid(result: &QueryResult, display: &HashMap<NodeId, String>) -> String {
    let components = connected_components(&result.edges);
    let mut out = String::new();
    for (i, component) in components.iter().enumerate() {
        if components.len() > 1 {
            out.push_str(&format!("%% component {}\n", i + 1));
        }
        out.push_str("graph TD\n");
        for edge in component {
            let source_name = display.get(&edge.source).cloned().unwrap_or_else(|| edge.source.as_str().to_string());
            let target_name = display.get(&edge.target).cloned().unwrap_or_else(|| edge.target.as_str().to_string());
            out.push_str(&format!(
                "  {}[\"{}\"] -->|{}| {}[\"{}\"]\n",
                sanitize_mermaid_id(&edge.source),
                source_name,
                edge.edge_type,
                sanitize_mermaid_id(&edge.target),
                target_name
            ));
        }
        out.push('\n');
    }
    out
}

/// Renders a [`QueryResult`] in the requested format (spec §4.10 "Formats").
pub fn render(result: &QueryResult, format: OutputFormat) -> String {
    let display = compute_display_names(&result.nodes, &result.alias_map);
    match format {
        OutputFormat::Mcp => {
            let layout = build_layout(&result.edges, &display);
            format_mcp(result, &layout, &display)
        }
        OutputFormat::Mermaid => format_mermaid(result, &display),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{generate_node_id, ClassPayload, FunctionPayload, NodePayload, SymbolPath};

    fn function(file: &str, name: &str) -> Node {
        let id = generate_node_id(file, NodeType::Function, &SymbolPath::leaf(name));
        Node {
            id,
            name: name.to_string(),
            package: "root".to_string(),
            file_path: codegraph_core::normalize_path(file),
            start_line: 1,
            end_line: 2,
            exported: true,
            content_hash: None,
            snippet: format!("function {name}() {{}}"),
            payload: NodePayload::Function(FunctionPayload::default()),
        }
    }

    fn class_node(file: &str, name: &str) -> Node {
        let id = generate_node_id(file, NodeType::Class, &SymbolPath::leaf(name));
        Node {
            id,
            name: name.to_string(),
            package: "root".to_string(),
            file_path: codegraph_core::normalize_path(file),
            start_line: 1,
            end_line: 10,
            exported: true,
            content_hash: None,
            snippet: format!("class {name} {{}}"),
            payload: NodePayload::Class(ClassPayload::default()),
        }
    }

    #[test]
    fn empty_edge_list_yields_empty_layout() {
        let layout = build_layout(&[], &HashMap::new());
        assert_eq!(layout.text, "");
        assert!(layout.node_order.is_empty());
    }

    /// S3 — branching and chain collapse.
    #[test]
    fn branches_and_collapses_a_linear_tail() {
        let root = NodeId::new("root");
        let left = NodeId::new("left");
        let right = NodeId::new("right");
        let right_child = NodeId::new("rightChild");

        let edges = vec![
            Edge::new(root.clone(), left.clone(), EdgeType::Calls),
            Edge::new(root.clone(), right.clone(), EdgeType::Calls),
            Edge::new(right.clone(), right_child.clone(), EdgeType::Calls),
        ];

        let display: HashMap<NodeId, String> = [
            (root.clone(), "root".to_string()),
            (left.clone(), "left".to_string()),
            (right.clone(), "right".to_string()),
            (right_child.clone(), "rightChild".to_string()),
        ]
        .into_iter()
        .collect();

        let layout = build_layout(&edges, &display);
        assert_eq!(
            layout.text,
            "root --CALLS--> left\nroot --CALLS--> right --CALLS--> rightChild"
        );
    }

    #[test]
    fn rootless_cycle_is_still_fully_rendered() {
        let a = NodeId::new("a");
        let b = NodeId::new("b");
        let edges = vec![
            Edge::new(a.clone(), b.clone(), EdgeType::Calls),
            Edge::new(b.clone(), a.clone(), EdgeType::Calls),
        ];
        let display: HashMap<NodeId, String> =
            [(a.clone(), "a".to_string()), (b.clone(), "b".to_string())].into_iter().collect();

        let layout = build_layout(&edges, &display);
        assert_eq!(layout.node_order.len(), 2);
        assert!(!layout.text.is_empty());
    }

    /// S4 — name disambiguation by type.
    #[test]
    fn disambiguates_same_name_different_type() {
        let f = function("a.ts", "format");
        let c = class_node("a.ts", "format");
        let names = compute_display_names(&[f.clone(), c.clone()], &HashMap::new());
        assert_eq!(names.get(&f.id), Some(&"format (Function)".to_string()));
        assert_eq!(names.get(&c.id), Some(&"format (Class)".to_string()));
    }

    #[test]
    fn single_occurrence_name_is_displayed_as_is() {
        let f = function("a.ts", "unique");
        let names = compute_display_names(&[f.clone()], &HashMap::new());
        assert_eq!(names.get(&f.id), Some(&"unique".to_string()));
    }

    #[test]
    fn same_type_different_file_disambiguates_by_path_suffix() {
        let a = function("src/a/thing.ts", "helper");
        let b = function("src/b/thing.ts", "helper");
        let names = compute_display_names(&[a.clone(), b.clone()], &HashMap::new());
        assert_eq!(names.get(&a.id), Some(&"helper (a/thing.ts)".to_string()));
        assert_eq!(names.get(&b.id), Some(&"helper (b/thing.ts)".to_string()));
    }

    #[test]
    fn alias_map_substitutes_synthetic_type_names() {
        let synthetic = Node {
            id: generate_node_id("a.ts", NodeType::SyntheticType, &SymbolPath::leaf("ReturnType<typeof make>")),
            name: "ReturnType<typeof make>".to_string(),
            package: "root".to_string(),
            file_path: "a.ts".to_string(),
            start_line: 1,
            end_line: 1,
            exported: false,
            content_hash: None,
            snippet: String::new(),
            payload: NodePayload::SyntheticType(codegraph_core::SyntheticTypePayload),
        };
        let mut alias_map = HashMap::new();
        alias_map.insert("ReturnType<typeof make>".to_string(), "Widget".to_string());

        let names = compute_display_names(&[synthetic.clone()], &alias_map);
        assert_eq!(names.get(&synthetic.id), Some(&"Widget".to_string()));
    }

    #[test]
    fn mcp_format_contains_graph_and_nodes_sections() {
        let a = function("a.ts", "A");
        let b = function("a.ts", "B");
        let edge = Edge::new(a.id.clone(), b.id.clone(), EdgeType::Calls);
        let result = QueryResult {
            edges: vec![edge],
            nodes: vec![a, b],
            alias_map: HashMap::new(),
            max_nodes: None,
            message: None,
        };
        let rendered = render(&result, OutputFormat::Mcp);
        assert!(rendered.contains("## Graph"));
        assert!(rendered.contains("## Nodes"));
        assert!(rendered.contains("--CALLS-->"));
    }

    #[test]
    fn mermaid_format_emits_one_component_per_disconnected_subgraph() {
        let a = function("a.ts", "A");
        let b = function("a.ts", "B");
        let c = function("a.ts", "C");
        let d = function("a.ts", "D");
        let result = QueryResult {
            edges: vec![
                Edge::new(a.id.clone(), b.id.clone(), EdgeType::Calls),
                Edge::new(c.id.clone(), d.id.clone(), EdgeType::Calls),
            ],
            nodes: vec![a, b, c, d],
            alias_map: HashMap::new(),
            max_nodes: None,
            message: None,
        };
        let rendered = render(&result, OutputFormat::Mermaid);
        assert_eq!(rendered.matches("%% component").count(), 2);
    }

    #[test]
    fn snippet_extraction_returns_whole_body_for_small_functions() {
        let node = function("a.ts", "tiny");
        let snippet = extract_snippet(&node, &[], 5);
        assert_eq!(snippet, node.snippet);
    }
}
