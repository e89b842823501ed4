//! Query engine (component C10, spec §4.9): `dependencies_of`, `dependents_of`,
//! `paths_between`, and the `connect_seeds` multi-source BFS that backs
//! topic-search composition. Depends on the graph store and the resolver, but
//! never on extraction (spec §9 "module boundaries").

use std::collections::{HashMap, HashSet, VecDeque};

use codegraph_core::{Edge, Node, NodeId, NodeType, Result};
use codegraph_graph::{CodeGraph, Direction, PathOptions, TraversalOptions};

use crate::resolver::{self, apply_class_method_fallback, ClassMethodFallback, Resolution};

/// A resolved query's output (spec §4.10's `QueryResult`, minus formatting
/// concerns which live in [`crate::formatter`]).
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub edges: Vec<Edge>,
    pub nodes: Vec<Node>,
    pub alias_map: HashMap<String, String>,
    pub max_nodes: Option<usize>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    pub max_nodes: Option<usize>,
}

fn hydrate(graph: &CodeGraph, edges: &[Edge]) -> Result<Vec<Node>> {
    let mut ids: Vec<NodeId> = Vec::new();
    let mut seen = HashSet::new();
    for edge in edges {
        if seen.insert(edge.source.clone()) {
            ids.push(edge.source.clone());
        }
        if seen.insert(edge.target.clone()) {
            ids.push(edge.target.clone());
        }
    }
    graph.get_nodes(&ids)
}

/// Builds the `alias_map` from `ALIAS_FOR` edges among `nodes`: a synthetic
/// type's bare name maps to the name of the type alias it resolves to (spec
/// §4.10 "Display-name disambiguation").
fn build_alias_map(graph: &CodeGraph, nodes: &[Node]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for node in nodes {
        if node.node_type() != NodeType::SyntheticType {
            continue;
        }
        let Ok(edges) = graph.query_dependencies(
            &node.id,
            &TraversalOptions {
                max_depth: 1,
                edge_types: vec![codegraph_core::EdgeType::AliasFor],
            },
        ) else {
            continue;
        };
        for edge in edges {
            if let Ok(Some(target)) = graph.get_node(&edge.target) {
                map.insert(node.name.clone(), target.name.clone());
            }
        }
    }
    map
}

/// Outcome of resolving a symbol (with class-method fallback) for a
/// directional traversal: either a resolved starting point plus the edges
/// already traversed along `direction`, or a message to surface as-is (spec
/// §7 "the query path never throws across the facade" — resolution
/// failures and disambiguation prompts are messages, not thrown errors).
enum ResolvedStart {
    Found {
        node_id: NodeId,
        file_path_was_resolved: bool,
        message: Option<String>,
        edges: Vec<Edge>,
    },
    Message(String),
}

/// Resolves `symbol`, applying the class-method fallback when the initial
/// resolution is a Class and `traverse` yields nothing. `traverse` is forward
/// for `dependencies_of`, reverse for `dependents_of`.
fn resolve_with_class_fallback(
    graph: &CodeGraph,
    symbol: &str,
    file_path: Option<&str>,
    options: &TraversalOptions,
    direction: Direction,
) -> Result<ResolvedStart> {
    let resolution = resolver::resolve_symbol(graph, symbol, file_path);
    match resolution {
        Resolution::NotFound { message } => Ok(ResolvedStart::Message(message)),
        Resolution::Ambiguous { candidates } => Ok(ResolvedStart::Message(format!(
            "'{}' is ambiguous: {}",
            symbol,
            candidates
                .iter()
                .map(|c| format!("{} ({})", c.node_id, c.file_path))
                .collect::<Vec<_>>()
                .join(", ")
        ))),
        Resolution::Resolved {
            node_id,
            file_path_was_resolved,
            message,
        } => {
            let edges = traverse(graph, &node_id, options, direction)?;
            if !edges.is_empty() {
                return Ok(ResolvedStart::Found {
                    node_id,
                    file_path_was_resolved,
                    message,
                    edges,
                });
            }

            let Some(node) = graph.get_node(&node_id)? else {
                return Ok(ResolvedStart::Found {
                    node_id,
                    file_path_was_resolved,
                    message,
                    edges,
                });
            };
            if node.node_type() != NodeType::Class {
                return Ok(ResolvedStart::Found {
                    node_id,
                    file_path_was_resolved,
                    message,
                    edges,
                });
            }

            let methods = resolver::methods_of_class(graph, &node);
            let mut connected = Vec::new();
            for method in &methods {
                if !traverse(graph, &method.id, options, direction)?.is_empty() {
                    connected.push(method.clone());
                }
            }

            match apply_class_method_fallback(&node, &connected) {
                ClassMethodFallback::Resolved { node_id: method_id, message } => {
                    let edges = traverse(graph, &method_id, options, direction)?;
                    Ok(ResolvedStart::Found {
                        node_id: method_id,
                        file_path_was_resolved,
                        message: Some(message),
                        edges,
                    })
                }
                ClassMethodFallback::Ambiguous { message } => Ok(ResolvedStart::Message(message)),
                ClassMethodFallback::NoEligibleMethod => Ok(ResolvedStart::Found {
                    node_id,
                    file_path_was_resolved,
                    message,
                    edges,
                }),
            }
        }
    }
}

fn traverse(graph: &CodeGraph, start: &NodeId, options: &TraversalOptions, direction: Direction) -> Result<Vec<Edge>> {
    match direction {
        Direction::Forward => graph.query_dependencies(start, options),
        Direction::Reverse => graph.query_dependents(start, options),
    }
}

/// Spec §4.9 #1: forward traversal from the resolved symbol. The input node
/// is excluded from `nodes` unless its file path was auto-resolved (so the
/// caller can see what got picked).
pub fn dependencies_of(
    graph: &CodeGraph,
    file_path: Option<&str>,
    symbol: &str,
    traversal: &TraversalOptions,
    query_options: &QueryOptions,
) -> Result<QueryResult> {
    run_directional(graph, file_path, symbol, traversal, query_options, Direction::Forward)
}

/// Spec §4.9 #2: symmetric to `dependencies_of`, reverse traversal.
pub fn dependents_of(
    graph: &CodeGraph,
    file_path: Option<&str>,
    symbol: &str,
    traversal: &TraversalOptions,
    query_options: &QueryOptions,
) -> Result<QueryResult> {
    run_directional(graph, file_path, symbol, traversal, query_options, Direction::Reverse)
}

fn run_directional(
    graph: &CodeGraph,
    file_path: Option<&str>,
    symbol: &str,
    traversal: &TraversalOptions,
    query_options: &QueryOptions,
    direction: Direction,
) -> Result<QueryResult> {
    let (start, file_path_was_resolved, message, mut edges) =
        match resolve_with_class_fallback(graph, symbol, file_path, traversal, direction)? {
            ResolvedStart::Message(message) => {
                return Ok(QueryResult {
                    message: Some(message),
                    max_nodes: query_options.max_nodes,
                    ..Default::default()
                })
            }
            ResolvedStart::Found {
                node_id,
                file_path_was_resolved,
                message,
                edges,
            } => (node_id, file_path_was_resolved, message, edges),
        };

    if let Some(max) = query_options.max_nodes {
        edges.truncate(max);
    }

    let mut nodes = hydrate(graph, &edges)?;
    if !file_path_was_resolved {
        nodes.retain(|n| n.id != start);
    }

    let alias_map = build_alias_map(graph, &nodes);
    Ok(QueryResult {
        edges,
        nodes,
        alias_map,
        max_nodes: query_options.max_nodes,
        message,
    })
}

/// Spec §4.9 #3: resolves both ends, rejects `from == to`, tries the forward
/// direction then the reverse (in case the caller gave it backwards), and
/// returns the first path found.
pub fn paths_between(
    graph: &CodeGraph,
    from_file: Option<&str>,
    from_symbol: &str,
    to_file: Option<&str>,
    to_symbol: &str,
    options: &PathOptions,
) -> Result<QueryResult> {
    let from = match resolver::resolve_symbol(graph, from_symbol, from_file) {
        Resolution::Resolved { node_id, .. } => node_id,
        Resolution::Ambiguous { .. } => {
            return Ok(QueryResult {
                message: Some(format!("'{from_symbol}' is ambiguous")),
                ..Default::default()
            })
        }
        Resolution::NotFound { message } => return Ok(QueryResult { message: Some(message), ..Default::default() }),
    };
    let to = match resolver::resolve_symbol(graph, to_symbol, to_file) {
        Resolution::Resolved { node_id, .. } => node_id,
        Resolution::Ambiguous { .. } => {
            return Ok(QueryResult {
                message: Some(format!("'{to_symbol}' is ambiguous")),
                ..Default::default()
            })
        }
        Resolution::NotFound { message } => return Ok(QueryResult { message: Some(message), ..Default::default() }),
    };

    if from == to {
        return Ok(QueryResult {
            message: Some("paths_between requires two distinct symbols".to_string()),
            ..Default::default()
        });
    }

    let mut paths = graph.query_paths(&from, &to, options)?;
    if paths.is_empty() {
        paths = graph.query_paths(&to, &from, options)?;
    }

    let Some(path) = paths.into_iter().next() else {
        return Ok(QueryResult::default());
    };

    let nodes = hydrate(graph, &path.edges)?;
    let alias_map = build_alias_map(graph, &nodes);
    Ok(QueryResult {
        edges: path.edges,
        nodes,
        alias_map,
        max_nodes: None,
        message: None,
    })
}

/// Spec §4.9 "connect_seeds": multi-source BFS from `seeds` (bounded depth,
/// default 4), collecting every node reachable from ≥2 distinct seeds
/// ("meeting points"), then every edge on a path from any seed to any
/// meeting point.
pub fn connect_seeds(graph: &CodeGraph, seeds: &[NodeId], max_depth: u32) -> Result<QueryResult> {
    if seeds.len() < 2 {
        return Ok(QueryResult::default());
    }

    // `reached_by[node] = set of seed indices that can reach it`, and
    // `via[(seed_index, node)] = the edge used to arrive there`, so a path
    // back from any meeting point to its seed can be reconstructed.
    let mut reached_by: HashMap<NodeId, HashSet<usize>> = HashMap::new();
    let mut via: HashMap<(usize, NodeId), Edge> = HashMap::new();

    for (seed_idx, seed) in seeds.iter().enumerate() {
        if graph.get_node(seed)?.is_none() {
            continue;
        }
        reached_by.entry(seed.clone()).or_default().insert(seed_idx);

        let mut visited = HashSet::new();
        visited.insert(seed.clone());
        let mut frontier = VecDeque::new();
        frontier.push_back((seed.clone(), 0u32));

        while let Some((current, depth)) = frontier.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let edges = graph.query_dependencies(&current, &TraversalOptions::default())?;
            for edge in edges {
                if visited.insert(edge.target.clone()) {
                    reached_by.entry(edge.target.clone()).or_default().insert(seed_idx);
                    via.insert((seed_idx, edge.target.clone()), edge.clone());
                    frontier.push_back((edge.target.clone(), depth + 1));
                }
            }
        }
    }

    let meeting_points: Vec<NodeId> = reached_by
        .iter()
        .filter(|(_, seed_set)| seed_set.len() >= 2)
        .map(|(node, _)| node.clone())
        .collect();

    let mut edges = Vec::new();
    let mut seen_keys = HashSet::new();
    for point in &meeting_points {
        let seed_set = &reached_by[point];
        for &seed_idx in seed_set {
            let mut cursor = point.clone();
            while let Some(edge) = via.get(&(seed_idx, cursor.clone())) {
                let key = (edge.source.clone(), edge.target.clone(), edge.edge_type);
                if seen_keys.insert(key) {
                    edges.push(edge.clone());
                }
                cursor = edge.source.clone();
                if cursor == seeds[seed_idx] {
                    break;
                }
            }
        }
    }

    let nodes = hydrate(graph, &edges)?;
    let alias_map = build_alias_map(graph, &nodes);
    Ok(QueryResult {
        edges,
        nodes,
        alias_map,
        max_nodes: None,
        message: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{generate_node_id, ClassPayload, EdgeType, FunctionPayload, MethodPayload, NodePayload, SymbolPath};

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
            snippet: String::new(),
            payload: NodePayload::Function(FunctionPayload::default()),
        }
    }

    fn class(file: &str, name: &str) -> Node {
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
            snippet: String::new(),
            payload: NodePayload::Class(ClassPayload::default()),
        }
    }

    fn method(file: &str, class_name: &str, method_name: &str) -> Node {
        let id = generate_node_id(file, NodeType::Method, &SymbolPath::new([class_name, method_name]));
        Node {
            id,
            name: method_name.to_string(),
            package: "root".to_string(),
            file_path: codegraph_core::normalize_path(file),
            start_line: 2,
            end_line: 4,
            exported: false,
            content_hash: None,
            snippet: String::new(),
            payload: NodePayload::Method(MethodPayload::default()),
        }
    }

    fn open_graph() -> (tempfile::TempDir, CodeGraph) {
        let dir = tempfile::tempdir().unwrap();
        let graph = CodeGraph::open(&dir.path().join("graph.db")).unwrap();
        (dir, graph)
    }

    /// S1 — linear chain depth bound, through the engine's public surface.
    #[test]
    fn dependencies_of_honors_max_depth() {
        let (_dir, graph) = open_graph();
        let a = function("a.ts", "A");
        let b = function("a.ts", "B");
        let c = function("a.ts", "C");
        let d = function("a.ts", "D");
        graph.add_nodes(vec![a.clone(), b.clone(), c.clone(), d.clone()]).unwrap();
        graph
            .add_edges(vec![
                Edge::new(a.id.clone(), b.id.clone(), EdgeType::Calls),
                Edge::new(b.id.clone(), c.id.clone(), EdgeType::Calls),
                Edge::new(c.id.clone(), d.id.clone(), EdgeType::Calls),
            ])
            .unwrap();

        let options = TraversalOptions {
            max_depth: 1,
            ..Default::default()
        };
        let result = dependencies_of(&graph, Some("a.ts"), "A", &options, &QueryOptions::default()).unwrap();
        assert_eq!(result.edges, vec![Edge::new(a.id.clone(), b.id, EdgeType::Calls)]);
    }

    /// S5 — class-method fallback (single), through the engine.
    #[test]
    fn dependencies_of_falls_back_to_the_sole_connected_method() {
        let (_dir, graph) = open_graph();
        let user_service = class("user.ts", "UserService");
        let save = method("user.ts", "UserService", "save");
        let db = function("db.ts", "write");
        graph.add_nodes(vec![user_service.clone(), save.clone(), db.clone()]).unwrap();
        graph
            .add_edges(vec![Edge::new(save.id.clone(), db.id.clone(), EdgeType::Calls)])
            .unwrap();

        let result = dependencies_of(
            &graph,
            Some("user.ts"),
            "UserService",
            &TraversalOptions::default(),
            &QueryOptions::default(),
        )
        .unwrap();

        assert_eq!(result.message, Some("Resolved 'UserService' to UserService.save".to_string()));
        assert_eq!(result.edges, vec![Edge::new(save.id, db.id, EdgeType::Calls)]);
    }

    /// §7 "the query path never throws across the facade" — identical
    /// endpoints render as a message, not a thrown error.
    #[test]
    fn paths_between_rejects_identical_endpoints() {
        let (_dir, graph) = open_graph();
        let a = function("a.ts", "A");
        graph.add_nodes(vec![a]).unwrap();
        let result = paths_between(
            &graph,
            Some("a.ts"),
            "A",
            Some("a.ts"),
            "A",
            &PathOptions::default(),
        )
        .unwrap();
        assert_eq!(
            result.message,
            Some("paths_between requires two distinct symbols".to_string())
        );
        assert!(result.edges.is_empty());
    }

    /// S2 — path finding, through the engine.
    #[test]
    fn paths_between_finds_the_unique_path() {
        let (_dir, graph) = open_graph();
        let a = function("a.ts", "A");
        let b = function("a.ts", "B");
        let d = function("a.ts", "D");
        graph.add_nodes(vec![a.clone(), b.clone(), d.clone()]).unwrap();
        graph
            .add_edges(vec![
                Edge::new(a.id.clone(), b.id.clone(), EdgeType::Calls),
                Edge::new(b.id.clone(), d.id.clone(), EdgeType::Calls),
            ])
            .unwrap();

        let result = paths_between(&graph, Some("a.ts"), "A", Some("a.ts"), "D", &PathOptions::default()).unwrap();
        assert_eq!(result.edges.len(), 2);
    }

    #[test]
    fn paths_between_tries_the_reverse_direction_when_forward_is_empty() {
        let (_dir, graph) = open_graph();
        let a = function("a.ts", "A");
        let b = function("a.ts", "B");
        graph.add_nodes(vec![a.clone(), b.clone()]).unwrap();
        graph
            .add_edges(vec![Edge::new(b.id.clone(), a.id.clone(), EdgeType::Calls)])
            .unwrap();

        // Caller asks A -> B but the only edge runs B -> A.
        let result = paths_between(&graph, Some("a.ts"), "A", Some("a.ts"), "B", &PathOptions::default()).unwrap();
        assert_eq!(result.edges, vec![Edge::new(b.id, a.id, EdgeType::Calls)]);
    }

    #[test]
    fn connect_seeds_finds_a_meeting_point_reachable_from_both() {
        let (_dir, graph) = open_graph();
        let s1 = function("a.ts", "S1");
        let s2 = function("a.ts", "S2");
        let meet = function("a.ts", "Meet");
        graph.add_nodes(vec![s1.clone(), s2.clone(), meet.clone()]).unwrap();
        graph
            .add_edges(vec![
                Edge::new(s1.id.clone(), meet.id.clone(), EdgeType::Calls),
                Edge::new(s2.id.clone(), meet.id.clone(), EdgeType::Calls),
            ])
            .unwrap();

        let result = connect_seeds(&graph, &[s1.id.clone(), s2.id.clone()], 4).unwrap();
        assert_eq!(result.edges.len(), 2);
        assert!(result.nodes.iter().any(|n| n.id == meet.id));
    }

    #[test]
    fn connect_seeds_is_empty_with_fewer_than_two_seeds() {
        let (_dir, graph) = open_graph();
        let s1 = function("a.ts", "S1");
        graph.add_nodes(vec![s1.clone()]).unwrap();
        let result = connect_seeds(&graph, &[s1.id], 4).unwrap();
        assert!(result.edges.is_empty());
    }
}
