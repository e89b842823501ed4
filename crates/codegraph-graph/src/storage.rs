//! RocksDB-backed persistence for nodes and edges (spec §6 "Persisted state
//! layout"): a single file, schema versioned by an integer; a mismatch
//! triggers a full reindex (the caller's responsibility — this module only
//! detects the mismatch and clears the store).

use std::path::{Path, PathBuf};

use codegraph_core::{CodeGraphError, Edge, Node, NodeId, Result};
use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamilyDescriptor, DBCompressionType, DBWithThreadMode,
    MultiThreaded, Options, WriteBatch,
};

type Db = DBWithThreadMode<MultiThreaded>;

const NODES_CF: &str = "nodes";
const EDGES_CF: &str = "edges";
const METADATA_CF: &str = "metadata";

const SCHEMA_VERSION: u32 = 1;
const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

fn bincode_config() -> bincode::config::Configuration {
    bincode::config::standard()
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode_config())
        .map_err(|e| CodeGraphError::storage(format!("encode failed: {e}")))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::serde::decode_from_slice(bytes, bincode_config())
        .map(|(value, _)| value)
        .map_err(|e| CodeGraphError::storage(format!("decode failed: {e}")))
}

/// Edges are keyed by their `(source, type, target)` identity triple, NUL-
/// separated. Node IDs and edge-type tags never contain a NUL byte.
fn edge_storage_key(source: &NodeId, edge_type: codegraph_core::EdgeType, target: &NodeId) -> Vec<u8> {
    let mut key = Vec::with_capacity(source.as_str().len() + target.as_str().len() + 16);
    key.extend_from_slice(source.as_str().as_bytes());
    key.push(0);
    key.extend_from_slice(edge_type.to_string().as_bytes());
    key.push(0);
    key.extend_from_slice(target.as_str().as_bytes());
    key
}

/// The on-disk, append-only-by-batch store. Callers are responsible for
/// keeping the in-memory caches in [`crate::graph::CodeGraph`] consistent —
/// this type only guarantees what RocksDB guarantees.
pub struct RocksStore {
    db: Db,
    path: PathBuf,
}

impl RocksStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_compression_type(DBCompressionType::Zstd);

        let block_cache = Cache::new_lru_cache(64 * 1024 * 1024);
        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_block_cache(&block_cache);
        block_opts.set_bloom_filter(10.0, false);
        db_opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(NODES_CF, Options::default()),
            ColumnFamilyDescriptor::new(EDGES_CF, Options::default()),
            ColumnFamilyDescriptor::new(METADATA_CF, Options::default()),
        ];

        let db = Db::open_cf_descriptors(&db_opts, path, cf_descriptors)
            .map_err(|e| CodeGraphError::storage(format!("failed to open graph store: {e}")))?;

        let store = Self {
            db,
            path: path.to_path_buf(),
        };
        store.reconcile_schema_version()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cf(&self, name: &str) -> std::sync::Arc<rocksdb::BoundColumnFamily<'_>> {
        self.db
            .cf_handle(name)
            .unwrap_or_else(|| panic!("missing column family '{name}' — open() always creates it"))
    }

    fn reconcile_schema_version(&self) -> Result<()> {
        let metadata_cf = self.cf(METADATA_CF);
        let stored = self
            .db
            .get_cf(&metadata_cf, SCHEMA_VERSION_KEY)
            .map_err(|e| CodeGraphError::storage(e.to_string()))?;

        match stored {
            Some(bytes) if bytes.len() == 4 => {
                let version = u32::from_le_bytes(bytes[..4].try_into().unwrap());
                if version != SCHEMA_VERSION {
                    tracing::warn!(
                        stored_version = version,
                        current_version = SCHEMA_VERSION,
                        "graph store schema version mismatch, clearing for full reindex"
                    );
                    self.clear_all()?;
                    self.write_schema_version()?;
                }
            }
            _ => self.write_schema_version()?,
        }
        Ok(())
    }

    fn write_schema_version(&self) -> Result<()> {
        let metadata_cf = self.cf(METADATA_CF);
        self.db
            .put_cf(&metadata_cf, SCHEMA_VERSION_KEY, SCHEMA_VERSION.to_le_bytes())
            .map_err(|e| CodeGraphError::storage(e.to_string()))
    }

    pub fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        let cf = self.cf(NODES_CF);
        match self
            .db
            .get_cf(&cf, id.as_str().as_bytes())
            .map_err(|e| CodeGraphError::storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn iter_nodes(&self) -> Result<Vec<Node>> {
        let cf = self.cf(NODES_CF);
        let mut nodes = Vec::new();
        for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
            let (_, value) = item.map_err(|e| CodeGraphError::storage(e.to_string()))?;
            nodes.push(decode(&value)?);
        }
        Ok(nodes)
    }

    pub fn iter_edges(&self) -> Result<Vec<Edge>> {
        let cf = self.cf(EDGES_CF);
        let mut edges = Vec::new();
        for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
            let (_, value) = item.map_err(|e| CodeGraphError::storage(e.to_string()))?;
            edges.push(decode(&value)?);
        }
        Ok(edges)
    }

    /// Upserts a batch of nodes atomically. Fails fast (before touching the
    /// database) on the first invalid node (spec §4.1).
    pub fn put_nodes(&self, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            if !node.has_valid_line_range() {
                return Err(CodeGraphError::validation(format!(
                    "node {} has an invalid line range ({}..{})",
                    node.id,
                    node.start_line,
                    node.end_line
                )));
            }
        }
        let cf = self.cf(NODES_CF);
        let mut batch = WriteBatch::default();
        for node in nodes {
            batch.put_cf(&cf, node.id.as_str().as_bytes(), encode(node)?);
        }
        self.db
            .write(batch)
            .map_err(|e| CodeGraphError::storage(format!("node batch write failed: {e}")))
    }

    pub fn put_edges(&self, edges: &[Edge]) -> Result<()> {
        let cf = self.cf(EDGES_CF);
        let mut batch = WriteBatch::default();
        for edge in edges {
            let key = edge_storage_key(&edge.source, edge.edge_type, &edge.target);
            batch.put_cf(&cf, key, encode(edge)?);
        }
        self.db
            .write(batch)
            .map_err(|e| CodeGraphError::storage(format!("edge batch write failed: {e}")))
    }

    pub fn delete_nodes(&self, ids: &[NodeId]) -> Result<()> {
        let cf = self.cf(NODES_CF);
        let mut batch = WriteBatch::default();
        for id in ids {
            batch.delete_cf(&cf, id.as_str().as_bytes());
        }
        self.db
            .write(batch)
            .map_err(|e| CodeGraphError::storage(format!("node batch delete failed: {e}")))
    }

    pub fn delete_edges(&self, edges: &[Edge]) -> Result<()> {
        let cf = self.cf(EDGES_CF);
        let mut batch = WriteBatch::default();
        for edge in edges {
            let key = edge_storage_key(&edge.source, edge.edge_type, &edge.target);
            batch.delete_cf(&cf, key);
        }
        self.db
            .write(batch)
            .map_err(|e| CodeGraphError::storage(format!("edge batch delete failed: {e}")))
    }

    pub fn clear_all(&self) -> Result<()> {
        for cf_name in [NODES_CF, EDGES_CF] {
            let cf = self.cf(cf_name);
            let mut batch = WriteBatch::default();
            for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
                let (key, _) = item.map_err(|e| CodeGraphError::storage(e.to_string()))?;
                batch.delete_cf(&cf, key);
            }
            self.db
                .write(batch)
                .map_err(|e| CodeGraphError::storage(format!("clear_all failed: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{generate_node_id, EdgeType, FunctionPayload, NodePayload, NodeType, SymbolPath};

    fn sample_node(name: &str) -> Node {
        let id = generate_node_id("src/a.ts", NodeType::Function, &SymbolPath::leaf(name));
        Node {
            id,
            name: name.to_string(),
            package: "root".to_string(),
            file_path: "src/a.ts".to_string(),
            start_line: 1,
            end_line: 2,
            exported: true,
            content_hash: None,
            snippet: format!("function {name}() {{}}"),
            payload: NodePayload::Function(FunctionPayload::default()),
        }
    }

    #[test]
    fn put_and_get_node_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(&dir.path().join("graph.db")).unwrap();
        let node = sample_node("doThing");
        store.put_nodes(&[node.clone()]).unwrap();
        let fetched = store.get_node(&node.id).unwrap().unwrap();
        assert_eq!(fetched, node);
    }

    #[test]
    fn rejects_invalid_line_range_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(&dir.path().join("graph.db")).unwrap();
        let mut bad = sample_node("broken");
        bad.start_line = 5;
        bad.end_line = 1;
        let good = sample_node("ok");
        let err = store.put_nodes(&[good.clone(), bad]).unwrap_err();
        assert!(matches!(err, CodeGraphError::Validation(_)));
        assert!(store.get_node(&good.id).unwrap().is_none());
    }

    #[test]
    fn put_and_iter_edges() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(&dir.path().join("graph.db")).unwrap();
        let a = sample_node("a");
        let b = sample_node("b");
        let edge = Edge::new(a.id.clone(), b.id.clone(), EdgeType::Calls);
        store.put_edges(&[edge.clone()]).unwrap();
        let all = store.iter_edges().unwrap();
        assert_eq!(all, vec![edge]);
    }

    #[test]
    fn clear_all_removes_nodes_and_edges() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(&dir.path().join("graph.db")).unwrap();
        let a = sample_node("a");
        let b = sample_node("b");
        let edge = Edge::new(a.id.clone(), b.id.clone(), EdgeType::Calls);
        store.put_nodes(&[a.clone(), b.clone()]).unwrap();
        store.put_edges(&[edge]).unwrap();
        store.clear_all().unwrap();
        assert!(store.iter_nodes().unwrap().is_empty());
        assert!(store.iter_edges().unwrap().is_empty());
    }

    #[test]
    fn schema_version_mismatch_clears_store() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("graph.db");
        {
            let store = RocksStore::open(&db_path).unwrap();
            store.put_nodes(&[sample_node("a")]).unwrap();
            let metadata_cf = store.cf(METADATA_CF);
            store
                .db
                .put_cf(&metadata_cf, SCHEMA_VERSION_KEY, 999u32.to_le_bytes())
                .unwrap();
        }
        let reopened = RocksStore::open(&db_path).unwrap();
        assert!(reopened.iter_nodes().unwrap().is_empty());
    }
}
