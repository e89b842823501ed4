//! The per-file ingestion pipeline (spec §4.7): extract, embed (with
//! fallback), then write nodes before edges to the graph store and a search
//! document per node to the hybrid index. Callers clear any prior data for
//! the file (`remove_file_nodes` + `remove_by_file`) before calling this when
//! reindexing — this function only ever adds.

use codegraph_core::Result;
use codegraph_graph::CodeGraph;
use codegraph_parser::{extract, ExtractionContext, SourceTree};
use codegraph_vector::{EmbeddingPool, HybridIndex, InferenceBackend, SearchDocument};

use codegraph_cache::EmbeddingCache;

use crate::fallback::embed_with_fallback;

/// One file's ingestion outcome (spec §4.2.3, reused here per file).
#[derive(Debug, Clone)]
pub struct FileIndexResult {
    pub file_path: String,
    pub nodes_added: usize,
    pub edges_added: usize,
}

pub async fn ingest_file<B: InferenceBackend>(
    graph: &CodeGraph,
    search_index: &HybridIndex,
    pool: &EmbeddingPool<B>,
    cache: &EmbeddingCache,
    document_prefix: Option<&str>,
    source: &dyn SourceTree,
    ctx: &ExtractionContext<'_>,
) -> Result<FileIndexResult> {
    let outcome = extract(source, ctx);

    let mut enriched_nodes = Vec::with_capacity(outcome.nodes.len());
    let mut search_docs = Vec::with_capacity(outcome.nodes.len());

    for mut node in outcome.nodes {
        let embedded = embed_with_fallback(pool, cache, document_prefix, &node).await?;
        node.content_hash = Some(embedded.content_hash);
        search_docs.push(SearchDocument {
            id: node.id.clone(),
            symbol: node.name.clone(),
            file: node.file_path.clone(),
            node_type: node.node_type(),
            content: node.snippet.clone(),
            embedding: Some(embedded.vector),
        });
        enriched_nodes.push(node);
    }

    let nodes_added = enriched_nodes.len();
    let edges_added = outcome.edges.len();

    graph.add_nodes(enriched_nodes)?;
    search_index.insert_batch(search_docs);
    graph.add_edges(outcome.edges)?;

    Ok(FileIndexResult {
        file_path: ctx.file_path.clone(),
        nodes_added,
        edges_added,
    })
}

/// Clears a file's prior state from both stores before re-running the
/// pipeline for it (spec §4.7 "Callers are responsible for clearing prior
/// data for the file").
pub fn clear_file(graph: &CodeGraph, search_index: &HybridIndex, file_path: &str) -> Result<()> {
    graph.remove_file_nodes(file_path)?;
    search_index.remove_by_file(file_path);
    Ok(())
}
