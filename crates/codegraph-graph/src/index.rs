//! In-memory `by_source` / `by_target` edge indices, copy-on-write so reads
//! stay lock-free. Grounded in the teacher's `InMemoryEdgeStore` indexing
//! pattern (`codegraph-graph/src/edges.rs`), adapted from `EdgeId` keys to
//! the spec's `(source, target, type)` edge identity.

use std::sync::Arc;

use codegraph_core::{EdgeKey, NodeId};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct EdgeIndex {
    by_source: DashMap<NodeId, Arc<Vec<EdgeKey>>>,
    by_target: DashMap<NodeId, Arc<Vec<EdgeKey>>>,
}

impl EdgeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: EdgeKey) {
        Self::push(&self.by_source, key.source.clone(), key.clone());
        Self::push(&self.by_target, key.target.clone(), key);
    }

    pub fn remove(&self, key: &EdgeKey) {
        Self::pull(&self.by_source, &key.source, key);
        Self::pull(&self.by_target, &key.target, key);
    }

    pub fn outgoing(&self, node: &NodeId) -> Vec<EdgeKey> {
        self.by_source
            .get(node)
            .map(|entry| entry.value().as_ref().clone())
            .unwrap_or_default()
    }

    pub fn incoming(&self, node: &NodeId) -> Vec<EdgeKey> {
        self.by_target
            .get(node)
            .map(|entry| entry.value().as_ref().clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        self.by_source.clear();
        self.by_target.clear();
    }

    fn push(map: &DashMap<NodeId, Arc<Vec<EdgeKey>>>, node: NodeId, key: EdgeKey) {
        match map.get_mut(&node) {
            Some(mut entry) => {
                let mut next = entry.value().as_ref().clone();
                next.push(key);
                *entry = Arc::new(next);
            }
            None => {
                map.insert(node, Arc::new(vec![key]));
            }
        }
    }

    fn pull(map: &DashMap<NodeId, Arc<Vec<EdgeKey>>>, node: &NodeId, key: &EdgeKey) {
        let Some(mut entry) = map.get_mut(node) else {
            return;
        };
        let current = entry.value();
        if current.len() == 1 && &current[0] == key {
            drop(entry);
            map.remove(node);
            return;
        }
        let mut next = current.as_ref().clone();
        if let Some(pos) = next.iter().position(|existing| existing == key) {
            next.remove(pos);
        }
        *entry = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::EdgeType;

    fn key(source: &str, target: &str) -> EdgeKey {
        EdgeKey::new(NodeId::new(source), NodeId::new(target), EdgeType::Calls)
    }

    #[test]
    fn outgoing_and_incoming_reflect_inserts() {
        let index = EdgeIndex::new();
        index.insert(key("a", "b"));
        index.insert(key("a", "c"));
        assert_eq!(index.outgoing(&NodeId::new("a")).len(), 2);
        assert_eq!(index.incoming(&NodeId::new("b")).len(), 1);
        assert!(index.incoming(&NodeId::new("z")).is_empty());
    }

    #[test]
    fn remove_drops_the_entry_when_last() {
        let index = EdgeIndex::new();
        let k = key("a", "b");
        index.insert(k.clone());
        index.remove(&k);
        assert!(index.outgoing(&NodeId::new("a")).is_empty());
        assert!(index.incoming(&NodeId::new("b")).is_empty());
    }
}
