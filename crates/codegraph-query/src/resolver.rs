//! Symbol resolution (component C9, spec §4.6). Turns a `(symbol, file_path?)`
//! pair into exactly one of `{resolved, ambiguous, not_found}` — the resolver
//! never returns anything else, which is what makes it safe for the query
//! engine (C10) to match on the result without a fallthrough case.

use codegraph_core::{Node, NodeId, NodeType};
use codegraph_graph::CodeGraph;

use crate::edit_distance::sort_by_distance_to;

/// One candidate in an [`Resolution::Ambiguous`] result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub node_id: NodeId,
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved {
        node_id: NodeId,
        /// Set when `file_path` was given but ignored in favor of a unique
        /// global match (spec §4.6 step 2).
        file_path_was_resolved: bool,
        message: Option<String>,
    },
    Ambiguous {
        candidates: Vec<Candidate>,
    },
    NotFound {
        message: String,
    },
}

fn to_candidates(nodes: Vec<Node>) -> Vec<Candidate> {
    nodes
        .into_iter()
        .map(|n| Candidate {
            node_id: n.id,
            file_path: n.file_path,
        })
        .collect()
}

/// Resolves `symbol` in `file_path`'s scope when given, else globally (spec
/// §4.6 resolution order 1-4). When `file_path` is given and nothing matches
/// inside it (step 1), the resolver falls back to a global lookup (step 2):
/// a unique global match resolves with `file_path_was_resolved = true`, more
/// than one is ambiguous, and none falls through to the not-found message.
pub fn resolve_symbol(graph: &CodeGraph, symbol: &str, file_path: Option<&str>) -> Resolution {
    match file_path {
        Some(file) => {
            let scoped = graph.find_nodes_by_symbol(symbol, Some(file));
            match scoped.len() {
                1 => Resolution::Resolved {
                    node_id: scoped[0].id.clone(),
                    file_path_was_resolved: false,
                    message: None,
                },
                n if n > 1 => Resolution::Ambiguous {
                    candidates: to_candidates(scoped),
                },
                _ => {
                    let global = graph.find_nodes_by_symbol(symbol, None);
                    match global.len() {
                        1 => Resolution::Resolved {
                            node_id: global[0].id.clone(),
                            file_path_was_resolved: true,
                            message: None,
                        },
                        n if n > 1 => Resolution::Ambiguous {
                            candidates: to_candidates(global),
                        },
                        _ => Resolution::NotFound {
                            message: compose_not_found(graph, symbol, file),
                        },
                    }
                }
            }
        }
        None => {
            let global = graph.find_nodes_by_symbol(symbol, None);
            match global.len() {
                1 => Resolution::Resolved {
                    node_id: global[0].id.clone(),
                    file_path_was_resolved: false,
                    message: None,
                },
                n if n > 1 => Resolution::Ambiguous {
                    candidates: to_candidates(global),
                },
                _ => Resolution::NotFound {
                    message: format!("Symbol '{symbol}' not found."),
                },
            }
        }
    }
}

fn compose_not_found(graph: &CodeGraph, symbol: &str, file_path: &str) -> String {
    let in_file = graph.nodes_in_file(file_path);
    if in_file.is_empty() {
        return format!("File '{file_path}' is not indexed.");
    }

    let elsewhere = graph.find_nodes_by_symbol(symbol, None);
    if !elsewhere.is_empty() {
        let mut files: Vec<String> = elsewhere.into_iter().map(|n| n.file_path).collect();
        files.sort();
        files.dedup();
        sort_by_distance_to(&mut files, file_path, |f| f.as_str());
        return format!(
            "Symbol '{symbol}' not found at {file_path}. Found '{symbol}' in: {}.",
            files.join(", ")
        );
    }

    let mut names: Vec<String> = in_file.into_iter().map(|n| n.name).collect();
    names.sort();
    names.dedup();
    sort_by_distance_to(&mut names, symbol, |n| n.as_str());
    format!(
        "Symbol '{symbol}' not found at {file_path}. Available symbols in this file: {}.",
        names.join(", ")
    )
}

/// Every method belonging to `class` (spec §4.6 "class-method fallback").
/// Methods share the class's file and their symbol path is `{ClassName}.{method}`.
pub fn methods_of_class(graph: &CodeGraph, class: &Node) -> Vec<Node> {
    let prefix = format!("{}.", class.name);
    graph
        .nodes_in_file(&class.file_path)
        .into_iter()
        .filter(|n| {
            n.node_type() == NodeType::Method
                && n.id
                    .symbol_path()
                    .map(|s| s.starts_with(&prefix))
                    .unwrap_or(false)
        })
        .collect()
}

/// Outcome of applying the class-method fallback (spec §4.6): either a single
/// method auto-resolved with an explanatory message, a multi-candidate
/// disambiguation that halts the query, or no eligible method at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassMethodFallback {
    Resolved { node_id: NodeId, message: String },
    Ambiguous { message: String },
    NoEligibleMethod,
}

/// Applies the fallback given which of `class`'s methods have non-empty
/// traversal results for the relation the caller actually asked about —
/// the query engine computes that traversal per method and passes the
/// already-filtered subset in here.
pub fn apply_class_method_fallback(class: &Node, connected_methods: &[Node]) -> ClassMethodFallback {
    match connected_methods.len() {
        0 => ClassMethodFallback::NoEligibleMethod,
        1 => ClassMethodFallback::Resolved {
            node_id: connected_methods[0].id.clone(),
            message: format!("Resolved '{}' to {}.{}", class.name, class.name, method_name(&connected_methods[0])),
        },
        _ => {
            let mut names: Vec<String> = connected_methods
                .iter()
                .map(|m| format!("{}.{}", class.name, method_name(m)))
                .collect();
            names.sort();
            ClassMethodFallback::Ambiguous {
                message: format!("Multiple methods of '{}' match: {}", class.name, names.join(", ")),
            }
        }
    }
}

fn method_name(node: &Node) -> &str {
    node.id.symbol_path().and_then(|s| s.rsplit('.').next()).unwrap_or(&node.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{generate_node_id, ClassPayload, FunctionPayload, MethodPayload, NodePayload, SymbolPath};

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

    #[test]
    fn resolves_a_unique_symbol_in_the_given_file() {
        let (_dir, graph) = open_graph();
        let f = function("src/a.ts", "doThing");
        graph.add_nodes(vec![f.clone()]).unwrap();

        let resolution = resolve_symbol(&graph, "doThing", Some("src/a.ts"));
        assert_eq!(
            resolution,
            Resolution::Resolved {
                node_id: f.id,
                file_path_was_resolved: false,
                message: None
            }
        );
    }

    #[test]
    fn ambiguous_when_multiple_nodes_share_a_name_in_file() {
        let (_dir, graph) = open_graph();
        // Two distinct nodes can't share an ID, but find_nodes_by_symbol with
        // no file match can surface >1 candidate globally.
        let a = function("src/a.ts", "dup");
        let b = function("src/b.ts", "dup");
        graph.add_nodes(vec![a, b]).unwrap();

        let resolution = resolve_symbol(&graph, "dup", None);
        assert!(matches!(resolution, Resolution::Ambiguous { .. }));
    }

    #[test]
    fn falls_back_to_a_unique_global_match_when_the_file_has_no_hit() {
        let (_dir, graph) = open_graph();
        let f = function("src/b.ts", "doThing");
        graph.add_nodes(vec![f.clone()]).unwrap();

        // src/a.ts has no node named doThing, but it's the only one globally.
        let resolution = resolve_symbol(&graph, "doThing", Some("src/a.ts"));
        assert_eq!(
            resolution,
            Resolution::Resolved {
                node_id: f.id,
                file_path_was_resolved: true,
                message: None
            }
        );
    }

    #[test]
    fn falls_back_to_ambiguous_when_multiple_global_matches_exist_outside_the_file() {
        let (_dir, graph) = open_graph();
        let a = function("src/b.ts", "dup");
        let b = function("src/c.ts", "dup");
        graph.add_nodes(vec![a, b]).unwrap();

        let resolution = resolve_symbol(&graph, "dup", Some("src/a.ts"));
        assert!(matches!(resolution, Resolution::Ambiguous { .. }));
    }

    #[test]
    fn not_found_reports_unindexed_file() {
        let (_dir, graph) = open_graph();
        let resolution = resolve_symbol(&graph, "doThing", Some("src/never.ts"));
        assert_eq!(
            resolution,
            Resolution::NotFound {
                message: "File 'src/never.ts' is not indexed.".to_string()
            }
        );
    }

    #[test]
    fn not_found_suggests_the_symbol_found_in_other_files() {
        let (_dir, graph) = open_graph();
        graph.add_nodes(vec![function("src/a.ts", "marker"), function("src/b.ts", "helper")]).unwrap();

        let resolution = resolve_symbol(&graph, "helper", Some("src/a.ts"));
        assert_eq!(
            resolution,
            Resolution::NotFound {
                message: "Symbol 'helper' not found at src/a.ts. Found 'helper' in: src/b.ts.".to_string()
            }
        );
    }

    #[test]
    fn not_found_lists_available_symbols_in_file() {
        let (_dir, graph) = open_graph();
        graph
            .add_nodes(vec![function("src/a.ts", "save"), function("src/a.ts", "savings")])
            .unwrap();

        let resolution = resolve_symbol(&graph, "saving", Some("src/a.ts"));
        match resolution {
            Resolution::NotFound { message } => {
                assert!(message.starts_with("Symbol 'saving' not found at src/a.ts. Available symbols in this file: "));
                assert!(message.contains("savings"));
                assert!(message.contains("save"));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    /// S5 — class-method fallback (single).
    #[test]
    fn class_method_fallback_resolves_the_sole_connected_method() {
        let class_node = class("src/user.ts", "UserService");
        let save = method("src/user.ts", "UserService", "save");

        let outcome = apply_class_method_fallback(&class_node, std::slice::from_ref(&save));
        assert_eq!(
            outcome,
            ClassMethodFallback::Resolved {
                node_id: save.id,
                message: "Resolved 'UserService' to UserService.save".to_string()
            }
        );
    }

    #[test]
    fn class_method_fallback_disambiguates_multiple_connected_methods() {
        let class_node = class("src/user.ts", "UserService");
        let save = method("src/user.ts", "UserService", "save");
        let delete = method("src/user.ts", "UserService", "delete");

        let outcome = apply_class_method_fallback(&class_node, &[save, delete]);
        assert!(matches!(outcome, ClassMethodFallback::Ambiguous { .. }));
    }

    #[test]
    fn class_method_fallback_is_none_when_no_method_qualifies() {
        let class_node = class("src/user.ts", "UserService");
        let outcome = apply_class_method_fallback(&class_node, &[]);
        assert_eq!(outcome, ClassMethodFallback::NoEligibleMethod);
    }

    #[test]
    fn methods_of_class_only_returns_that_classs_methods() {
        let (_dir, graph) = open_graph();
        let class_node = class("src/user.ts", "UserService");
        let save = method("src/user.ts", "UserService", "save");
        let other_class_method = method("src/user.ts", "OtherService", "run");
        graph
            .add_nodes(vec![class_node.clone(), save.clone(), other_class_method])
            .unwrap();

        let methods = methods_of_class(&graph, &class_node);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].id, save.id);
    }
}
