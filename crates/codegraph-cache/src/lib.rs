//! Content-hash addressed embedding cache (component C5, spec §4.4).

pub mod embedding_cache;

pub use embedding_cache::{content_hash, EmbeddingCache};
