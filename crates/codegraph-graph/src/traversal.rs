//! Reachability queries (BFS) and bounded simple-path enumeration (DFS with
//! path-so-far tracking), per spec §4.1 and the "cyclic call graphs" design
//! note in §9. Operates over in-memory snapshots of the edge set so depth-
//! bounded traversal never touches RocksDB on the hot path.

use std::collections::{HashMap, HashSet};

use codegraph_core::{Edge, EdgeKey, EdgeType, NodeId};
use dashmap::DashMap;

use crate::index::EdgeIndex;

pub const DEFAULT_MAX_DEPTH: u32 = 100;
pub const DEFAULT_MAX_PATHS: usize = 3;

#[derive(Debug, Clone)]
pub struct TraversalOptions {
    pub max_depth: u32,
    pub edge_types: Vec<EdgeType>,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            edge_types: EdgeType::default_traversal_set().to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathOptions {
    pub max_depth: u32,
    pub max_paths: usize,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_paths: DEFAULT_MAX_PATHS,
        }
    }
}

/// One simple path: its node sequence and the specific edge connecting each
/// consecutive pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<Edge>,
}

impl Path {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Every distinct edge in the subgraph reachable from `start`, restricted to
/// `options.edge_types` and `options.max_depth` hops. Dangling edges (whose
/// other endpoint was removed from `edges`) are skipped by construction.
pub fn reachable_edges(
    edges: &DashMap<EdgeKey, Edge>,
    index: &EdgeIndex,
    start: &NodeId,
    options: &TraversalOptions,
    direction: Direction,
) -> Vec<Edge> {
    let mut visited_nodes = HashSet::new();
    visited_nodes.insert(start.clone());
    let mut frontier = vec![start.clone()];
    let mut seen_edges = HashSet::new();
    let mut result = Vec::new();
    let mut depth = 0;

    while depth < options.max_depth && !frontier.is_empty() {
        let mut next_frontier = Vec::new();
        for node in &frontier {
            let candidate_keys = match direction {
                Direction::Forward => index.outgoing(node),
                Direction::Reverse => index.incoming(node),
            };
            for key in candidate_keys {
                if !options.edge_types.contains(&key.edge_type) {
                    continue;
                }
                if seen_edges.contains(&key) {
                    continue;
                }
                let Some(edge) = edges.get(&key) else {
                    continue; // dangling: no stored edge for this key
                };
                seen_edges.insert(key.clone());
                result.push(edge.value().clone());

                let neighbor = match direction {
                    Direction::Forward => key.target.clone(),
                    Direction::Reverse => key.source.clone(),
                };
                if visited_nodes.insert(neighbor.clone()) {
                    next_frontier.push(neighbor);
                }
            }
        }
        frontier = next_frontier;
        depth += 1;
    }

    result
}

/// Enumerates simple paths from `from` to `to`, ordered shortest-first, up
/// to `options.max_paths`. When multiple edges connect the same adjacent
/// pair, the one with the lowest [`EdgeType::ordinal`] is chosen (spec
/// §4.1), so each neighbor is visited at most once per DFS branch.
pub fn enumerate_paths(
    edges: &DashMap<EdgeKey, Edge>,
    index: &EdgeIndex,
    from: &NodeId,
    to: &NodeId,
    options: &PathOptions,
) -> Vec<Path> {
    let mut results = Vec::new();
    let mut path_nodes = vec![from.clone()];
    let mut path_keys: Vec<EdgeKey> = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(from.clone());

    dfs_paths(
        edges,
        index,
        to,
        &mut path_nodes,
        &mut path_keys,
        &mut visited,
        options.max_depth,
        &mut results,
    );

    results.sort_by_key(Path::len);
    results.truncate(options.max_paths);
    results
}

#[allow(clippy::too_many_arguments)]
fn dfs_paths(
    edges: &DashMap<EdgeKey, Edge>,
    index: &EdgeIndex,
    target: &NodeId,
    path_nodes: &mut Vec<NodeId>,
    path_keys: &mut Vec<EdgeKey>,
    visited: &mut HashSet<NodeId>,
    depth_remaining: u32,
    results: &mut Vec<Path>,
) {
    if depth_remaining == 0 {
        return;
    }
    let current = path_nodes.last().expect("path always has a head").clone();

    let mut best_per_neighbor: HashMap<NodeId, EdgeKey> = HashMap::new();
    for key in index.outgoing(&current) {
        if !EdgeType::default_traversal_set().contains(&key.edge_type) {
            continue;
        }
        if edges.get(&key).is_none() {
            continue; // dangling
        }
        best_per_neighbor
            .entry(key.target.clone())
            .and_modify(|existing| {
                if key.edge_type.ordinal() < existing.edge_type.ordinal() {
                    *existing = key.clone();
                }
            })
            .or_insert(key);
    }

    let mut neighbors: Vec<_> = best_per_neighbor.into_iter().collect();
    neighbors.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));

    for (neighbor, key) in neighbors {
        if visited.contains(&neighbor) {
            continue;
        }
        visited.insert(neighbor.clone());
        path_nodes.push(neighbor.clone());
        path_keys.push(key.clone());

        if &neighbor == target {
            let path_edges = path_keys
                .iter()
                .map(|k| edges.get(k).expect("checked above").value().clone())
                .collect();
            results.push(Path {
                nodes: path_nodes.clone(),
                edges: path_edges,
            });
        } else {
            dfs_paths(
                edges,
                index,
                target,
                path_nodes,
                path_keys,
                visited,
                depth_remaining - 1,
                results,
            );
        }

        path_nodes.pop();
        path_keys.pop();
        visited.remove(&neighbor);
    }
}
