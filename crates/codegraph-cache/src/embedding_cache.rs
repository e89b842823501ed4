//! Content-hash addressed embedding cache (spec §4.4, §3.3): entries never
//! expire automatically, so there is no TTL/eviction machinery here — that
//! distinguishes this cache from a general-purpose LRU cache.

use std::sync::Arc;

use codegraph_core::CodeGraphError;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

/// `lowercase hex(sha256(content))` — the cache key and the value recorded as
/// a node's `content_hash` once the embed that produced it succeeds (spec
/// §4.7 step 3).
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `get`/`get_batch`/`set`/`close` over a content-hash keyed vector map (spec
/// §4.4). Safe under concurrent reads and serialized writes (spec §5).
#[derive(Clone, Default)]
pub struct EmbeddingCache {
    entries: Arc<DashMap<String, Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, hash: &str) -> Option<Vec<f32>> {
        self.entries.get(hash).map(|v| v.clone())
    }

    /// `{hash: vector}` for every hash present; absent hashes are simply
    /// omitted from the result rather than mapped to `None` (spec §4.4).
    pub fn get_batch(&self, hashes: &[String]) -> std::collections::HashMap<String, Vec<f32>> {
        hashes
            .iter()
            .filter_map(|h| self.get(h).map(|v| (h.clone(), v)))
            .collect()
    }

    pub fn set(&self, hash: String, vector: Vec<f32>) {
        self.entries.insert(hash, vector);
    }

    /// No-op beyond dropping in-memory state: there is no on-disk handle to
    /// flush for this backend, but the method is kept as the stable shutdown
    /// seam the ingestion orchestrator calls (spec §4.4).
    pub fn close(&self) -> Result<(), CodeGraphError> {
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
