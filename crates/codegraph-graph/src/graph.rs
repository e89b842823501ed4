//! The graph store's public surface (spec §4.1, component C2).

use std::collections::HashSet;
use std::path::Path as StdPath;

use codegraph_core::{CodeGraphError, Edge, EdgeKey, EdgeType, Node, NodeId, Result};
use dashmap::DashMap;

use crate::index::EdgeIndex;
use crate::storage::RocksStore;
use crate::traversal::{self, Direction, Path, PathOptions, TraversalOptions};

/// RocksDB-backed, cache-fronted graph store. Nodes are cached individually
/// on read; the full edge set is held in memory (rebuilt from RocksDB at
/// open time) since reachability and path queries need random access to the
/// whole adjacency structure and the graph store is, per spec §5, accessed
/// through a single writer at a time.
pub struct CodeGraph {
    storage: RocksStore,
    node_cache: DashMap<NodeId, Node>,
    edges: DashMap<EdgeKey, Edge>,
    index: EdgeIndex,
}

impl CodeGraph {
    pub fn open(path: &StdPath) -> Result<Self> {
        let storage = RocksStore::open(path)?;
        let graph = Self {
            storage,
            node_cache: DashMap::new(),
            edges: DashMap::new(),
            index: EdgeIndex::new(),
        };
        graph.load_into_memory()?;
        Ok(graph)
    }

    fn load_into_memory(&self) -> Result<()> {
        for node in self.storage.iter_nodes()? {
            self.node_cache.insert(node.id.clone(), node);
        }
        for edge in self.storage.iter_edges()? {
            let key = edge.key();
            self.index.insert(key.clone());
            self.edges.insert(key, edge);
        }
        Ok(())
    }

    pub fn storage_path(&self) -> &StdPath {
        self.storage.path()
    }

    /// Upserts nodes atomically; fails fast on the first invalid node in the
    /// batch (spec §4.1).
    pub fn add_nodes(&self, nodes: Vec<Node>) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        self.storage.put_nodes(&nodes)?;
        for node in nodes {
            self.node_cache.insert(node.id.clone(), node);
        }
        Ok(())
    }

    /// Upserts edges atomically; replaces any edge sharing the same
    /// `(source, target, type)` key.
    pub fn add_edges(&self, edges: Vec<Edge>) -> Result<()> {
        if edges.is_empty() {
            return Ok(());
        }
        self.storage.put_edges(&edges)?;
        for edge in edges {
            let key = edge.key();
            self.index.insert(key.clone());
            self.edges.insert(key, edge);
        }
        Ok(())
    }

    /// Idempotent: removing a not-yet-indexed file is a no-op. Cascades
    /// eagerly in both directions: outgoing edges of the removed nodes and
    /// incoming edges from elsewhere that would otherwise dangle are deleted
    /// in the same operation (the decided policy for spec §9's Open
    /// Question — see `DESIGN.md`).
    pub fn remove_file_nodes(&self, file_path: &str) -> Result<()> {
        let normalized = codegraph_core::normalize_path(file_path);
        let removed_ids: Vec<NodeId> = self
            .node_cache
            .iter()
            .filter(|entry| entry.value().file_path == normalized)
            .map(|entry| entry.key().clone())
            .collect();

        if removed_ids.is_empty() {
            return Ok(());
        }

        let removed_set: HashSet<NodeId> = removed_ids.iter().cloned().collect();
        let mut edges_to_delete: Vec<Edge> = Vec::new();
        for id in &removed_ids {
            for key in self.index.outgoing(id) {
                if let Some(edge) = self.edges.get(&key) {
                    edges_to_delete.push(edge.value().clone());
                }
            }
            for key in self.index.incoming(id) {
                if removed_set.contains(&key.source) {
                    continue; // already captured as an outgoing edge above
                }
                if let Some(edge) = self.edges.get(&key) {
                    edges_to_delete.push(edge.value().clone());
                }
            }
        }

        self.storage.delete_edges(&edges_to_delete)?;
        self.storage.delete_nodes(&removed_ids)?;

        for edge in &edges_to_delete {
            let key = edge.key();
            self.index.remove(&key);
            self.edges.remove(&key);
        }
        for id in &removed_ids {
            self.node_cache.remove(id);
        }
        Ok(())
    }

    pub fn clear_all(&self) -> Result<()> {
        self.storage.clear_all()?;
        self.node_cache.clear();
        self.edges.clear();
        self.index.clear();
        Ok(())
    }

    pub fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        Ok(self.node_cache.get(id).map(|entry| entry.value().clone()))
    }

    /// Empty input returns empty output without querying storage (spec §8
    /// boundary behavior). Missing IDs are silently omitted.
    pub fn get_nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.node_cache.get(id).map(|entry| entry.value().clone()))
            .collect())
    }

    /// Every node recorded under `file_path`, in no particular order. Used by
    /// the query layer to tell "file never indexed" apart from "file indexed,
    /// symbol just isn't in it" (spec §4.6).
    pub fn nodes_in_file(&self, file_path: &str) -> Vec<Node> {
        let normalized = codegraph_core::normalize_path(file_path);
        self.node_cache
            .iter()
            .filter(|entry| entry.value().file_path == normalized)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Capped at 10 results (spec §4.1).
    pub fn find_nodes_by_symbol(&self, symbol: &str, file_path: Option<&str>) -> Vec<Node> {
        const LIMIT: usize = 10;
        let symbol_lower = symbol.to_lowercase();
        let normalized_file = file_path.map(codegraph_core::normalize_path);

        let mut matches: Vec<Node> = self
            .node_cache
            .iter()
            .filter_map(|entry| {
                let node = entry.value();
                let matched = match &normalized_file {
                    Some(file) => {
                        node.file_path == *file
                            && (node
                                .id
                                .symbol_path()
                                .map(|s| s == symbol)
                                .unwrap_or(false)
                                || node.name.to_lowercase() == symbol_lower)
                    }
                    None => {
                        node.name.to_lowercase() == symbol_lower
                            || node.name.to_lowercase().ends_with(&format!(".{symbol_lower}"))
                            || node
                                .id
                                .symbol_path()
                                .map(|s| {
                                    s.split('.')
                                        .any(|segment| segment.to_lowercase() == symbol_lower)
                                })
                                .unwrap_or(false)
                    }
                };
                matched.then(|| node.clone())
            })
            .collect();

        matches.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        matches.truncate(LIMIT);
        matches
    }

    pub fn query_dependencies(&self, start: &NodeId, options: &TraversalOptions) -> Result<Vec<Edge>> {
        self.ensure_node_exists(start)?;
        Ok(traversal::reachable_edges(
            &self.edges,
            &self.index,
            start,
            options,
            Direction::Forward,
        ))
    }

    pub fn query_dependents(&self, start: &NodeId, options: &TraversalOptions) -> Result<Vec<Edge>> {
        self.ensure_node_exists(start)?;
        Ok(traversal::reachable_edges(
            &self.edges,
            &self.index,
            start,
            options,
            Direction::Reverse,
        ))
    }

    pub fn query_paths(&self, from: &NodeId, to: &NodeId, options: &PathOptions) -> Result<Vec<Path>> {
        self.ensure_node_exists(from)?;
        self.ensure_node_exists(to)?;
        Ok(traversal::enumerate_paths(&self.edges, &self.index, from, to, options))
    }

    fn ensure_node_exists(&self, id: &NodeId) -> Result<()> {
        if self.node_cache.contains_key(id) {
            Ok(())
        } else {
            Err(CodeGraphError::not_found(format!("node '{id}' does not exist")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{generate_node_id, FunctionPayload, NodePayload, NodeType, SymbolPath};

    fn node(file: &str, name: &str) -> Node {
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

    fn open_graph() -> (tempfile::TempDir, CodeGraph) {
        let dir = tempfile::tempdir().unwrap();
        let graph = CodeGraph::open(&dir.path().join("graph.db")).unwrap();
        (dir, graph)
    }

    #[test]
    fn get_nodes_empty_input_short_circuits() {
        let (_dir, graph) = open_graph();
        assert_eq!(graph.get_nodes(&[]).unwrap(), Vec::new());
    }

    #[test]
    fn remove_file_nodes_is_idempotent_on_unindexed_file() {
        let (_dir, graph) = open_graph();
        graph.remove_file_nodes("src/never-indexed.ts").unwrap();
    }

    #[test]
    fn remove_file_nodes_cascades_outgoing_edges() {
        let (_dir, graph) = open_graph();
        let a = node("src/a.ts", "fnA");
        let b = node("src/b.ts", "fnB");
        graph.add_nodes(vec![a.clone(), b.clone()]).unwrap();
        graph
            .add_edges(vec![Edge::new(a.id.clone(), b.id.clone(), EdgeType::Calls)])
            .unwrap();

        graph.remove_file_nodes("src/a.ts").unwrap();

        assert!(graph.get_node(&a.id).unwrap().is_none());
        assert!(graph.get_node(&b.id).unwrap().is_some());
        let deps = graph
            .query_dependents(&b.id, &TraversalOptions::default())
            .unwrap();
        assert!(deps.is_empty());
    }

    #[test]
    fn remove_file_nodes_cascades_dangling_incoming_edges() {
        let (_dir, graph) = open_graph();
        let a = node("src/a.ts", "fnA");
        let b = node("src/b.ts", "fnB");
        graph.add_nodes(vec![a.clone(), b.clone()]).unwrap();
        graph
            .add_edges(vec![Edge::new(a.id.clone(), b.id.clone(), EdgeType::Calls)])
            .unwrap();

        // Remove the edge's target's file; the edge must not dangle.
        graph.remove_file_nodes("src/b.ts").unwrap();

        let deps = graph
            .query_dependencies(&a.id, &TraversalOptions::default())
            .unwrap();
        assert!(deps.is_empty());
    }

    #[test]
    fn find_nodes_by_symbol_caps_at_ten() {
        let (_dir, graph) = open_graph();
        let nodes: Vec<Node> = (0..15).map(|i| node(&format!("src/f{i}.ts"), "dup")).collect();
        graph.add_nodes(nodes).unwrap();
        let matches = graph.find_nodes_by_symbol("dup", None);
        assert_eq!(matches.len(), 10);
    }

    #[test]
    fn nodes_in_file_is_empty_for_an_unindexed_file() {
        let (_dir, graph) = open_graph();
        assert!(graph.nodes_in_file("src/never-indexed.ts").is_empty());
    }

    #[test]
    fn nodes_in_file_returns_only_that_files_nodes() {
        let (_dir, graph) = open_graph();
        let a = node("src/a.ts", "fnA");
        let b = node("src/b.ts", "fnB");
        graph.add_nodes(vec![a.clone(), b]).unwrap();
        let in_a = graph.nodes_in_file("src/a.ts");
        assert_eq!(in_a.len(), 1);
        assert_eq!(in_a[0].id, a.id);
    }

    #[test]
    fn query_dependencies_on_missing_node_errors() {
        let (_dir, graph) = open_graph();
        let err = graph
            .query_dependencies(&NodeId::new("missing"), &TraversalOptions::default())
            .unwrap_err();
        assert!(matches!(err, CodeGraphError::NotFound(_)));
    }
}
