//! The searchable document store and query surface (spec §4.5): one BM25
//! index plus per-document embeddings, queried in full-text, vector, or
//! hybrid mode.

use std::collections::HashMap;

use codegraph_core::{NodeId, NodeType};
use globset::Glob;
use parking_lot::RwLock;

use crate::search::bm25::{Bm25Index, Bm25Params};
use crate::search::combiner::combine_scores;

const DEFAULT_BATCH_SIZE: usize = 500;
const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct SearchDocument {
    pub id: NodeId,
    pub symbol: String,
    pub file: String,
    pub node_type: NodeType,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone)]
pub struct QueryFilters {
    pub node_types: Option<Vec<NodeType>>,
    pub file_glob: Option<String>,
    pub limit: usize,
}

impl Default for QueryFilters {
    fn default() -> Self {
        Self {
            node_types: None,
            file_glob: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum QueryMode {
    FullText,
    Vector { similarity_threshold: f32 },
    Hybrid { similarity_threshold: f32 },
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub document: SearchDocument,
    pub score: f32,
}

struct Inner {
    docs: Vec<SearchDocument>,
    bm25: Bm25Index,
}

/// Thread-safe: readers and the serialized ingestion writer share one index
/// behind a [`parking_lot::RwLock`] (spec §5).
pub struct HybridIndex {
    inner: RwLock<Inner>,
}

impl Default for HybridIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl HybridIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                docs: Vec::new(),
                bm25: Bm25Index::new(),
            }),
        }
    }

    /// Appends `documents` in chunks of [`DEFAULT_BATCH_SIZE`] so a large
    /// initial ingest doesn't hold the write lock for the whole batch.
    pub fn insert_batch(&self, documents: Vec<SearchDocument>) {
        for chunk in documents.chunks(DEFAULT_BATCH_SIZE) {
            let mut inner = self.inner.write();
            for doc in chunk {
                let doc_id = inner.docs.len();
                inner.bm25.add_document(doc_id, &format!("{} {}", doc.symbol, doc.content));
                inner.docs.push(doc.clone());
            }
            inner.bm25.finalize();
        }
    }

    /// BM25 postings have no delete operation, so removing a file's
    /// documents rebuilds the index from the surviving set rather than
    /// patching postings in place.
    pub fn remove_by_file(&self, file: &str) {
        let mut inner = self.inner.write();
        let surviving: Vec<SearchDocument> = inner.docs.drain(..).filter(|d| d.file != file).collect();
        let mut bm25 = Bm25Index::new();
        for (doc_id, doc) in surviving.iter().enumerate() {
            bm25.add_document(doc_id, &format!("{} {}", doc.symbol, doc.content));
        }
        bm25.finalize();
        inner.docs = surviving;
        inner.bm25 = bm25;
    }

    pub fn len(&self) -> usize {
        self.inner.read().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().docs.is_empty()
    }

    pub fn search(&self, mode: QueryMode, query: &str, query_embedding: Option<&[f32]>, filters: &QueryFilters) -> Vec<SearchHit> {
        let inner = self.inner.read();
        let glob = filters.file_glob.as_deref().and_then(|g| Glob::new(g).ok()).map(|g| g.compile_matcher());

        let candidates: Vec<usize> = inner
            .docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| match &filters.node_types {
                Some(types) => types.contains(&doc.node_type),
                None => true,
            })
            .filter(|(_, doc)| match &glob {
                Some(g) => g.is_match(&doc.file),
                None => true,
            })
            .map(|(i, _)| i)
            .collect();

        let limit = if filters.limit == 0 { DEFAULT_LIMIT } else { filters.limit };

        let mut hits: Vec<SearchHit> = match mode {
            QueryMode::FullText => {
                let bm25_scores = inner.bm25.score(query, Bm25Params::default());
                let candidate_scores: HashMap<usize, f32> = candidates
                    .iter()
                    .filter_map(|i| bm25_scores.get(i).map(|s| (*i, *s)))
                    .collect();
                let max_bm25 = candidate_scores.values().cloned().fold(0.0f32, f32::max);
                candidate_scores
                    .into_iter()
                    .map(|(i, score)| SearchHit {
                        document: inner.docs[i].clone(),
                        score: if max_bm25 == 0.0 { 0.0 } else { score / max_bm25 },
                    })
                    .collect()
            }
            QueryMode::Vector { similarity_threshold } => {
                let Some(query_vec) = query_embedding else {
                    return Vec::new();
                };
                candidates
                    .iter()
                    .filter_map(|&i| {
                        let doc = &inner.docs[i];
                        let sim = cosine_similarity(query_vec, doc.embedding.as_deref()?);
                        (sim >= similarity_threshold).then_some(SearchHit {
                            document: doc.clone(),
                            score: sim,
                        })
                    })
                    .collect()
            }
            QueryMode::Hybrid { similarity_threshold } => {
                let Some(query_vec) = query_embedding else {
                    return Vec::new();
                };
                let bm25_scores = inner.bm25.score(query, Bm25Params::default());
                let max_bm25 = candidates
                    .iter()
                    .filter_map(|i| bm25_scores.get(i).cloned())
                    .fold(0.0f32, f32::max);

                candidates
                    .iter()
                    .filter_map(|&i| {
                        let doc = &inner.docs[i];
                        let sim = cosine_similarity(query_vec, doc.embedding.as_deref()?);
                        if sim < similarity_threshold {
                            return None;
                        }
                        let bm25 = bm25_scores.get(&i).copied().unwrap_or(0.0);
                        Some(SearchHit {
                            document: doc.clone(),
                            score: combine_scores(bm25, max_bm25, sim),
                        })
                    })
                    .collect()
            }
        };

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        hits
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
