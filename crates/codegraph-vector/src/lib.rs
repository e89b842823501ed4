//! Embedding pool and hybrid search (components C4/C6, spec §4.3, §4.5).

pub mod backend;
pub mod content;
pub mod fake;
pub mod onnx_provider;
pub mod pool;
pub mod search;

pub use backend::{InferenceBackend, InferenceContext};
pub use content::prepare_document_content;
pub use fake::{DeterministicFakeBackend, FakeContext};
pub use onnx_provider::{OnnxBackend, OnnxConfig, OnnxContext};
pub use pool::{EmbeddingPool, DEFAULT_POOL_SIZE};
pub use search::{HybridIndex, QueryFilters, QueryMode, SearchDocument, SearchHit};

pub use codegraph_core::{CodeGraphError, NodeId, Result};
