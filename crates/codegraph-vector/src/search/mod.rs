//! Hybrid full-text + vector search (component C6, spec §4.5).

pub mod bm25;
pub mod combiner;
pub mod index;

pub use index::{HybridIndex, QueryFilters, QueryMode, SearchDocument, SearchHit};
