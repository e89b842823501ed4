//! The inference-backend seam (spec §6 "Inference backend: loads a model from
//! disk and exposes `create_context({threads})` and `context.embed(text) ->
//! vector`"). The pool depends only on these two traits, never on a concrete
//! runtime, matching the extractor's `SourceTree` decoupling pattern.

use codegraph_core::CodeGraphError;

/// Loads a model once and mints independent inference contexts.
pub trait InferenceBackend: Send + Sync {
    type Context: InferenceContext;

    /// `threads` is the per-context thread affinity the pool computed as
    /// `max(1, cpu_count / pool_size)` (spec §4.3).
    fn create_context(&self, threads: usize) -> Result<Self::Context, CodeGraphError>;
}

/// One inference context. Contexts are not `Sync` — the pool hands out
/// exclusive ownership of one at a time via [`crate::pool::EmbeddingPool`].
pub trait InferenceContext: Send {
    /// Embeds already-prepared text (prefix applied, not yet truncated by the
    /// caller). Returns [`CodeGraphError::ContextOverflow`] when the prepared
    /// text exceeds the backend's context window — the caller (C7) is
    /// expected to retry with a shorter input (spec §4.3, §4.7).
    fn embed(&self, text: &str) -> Result<Vec<f32>, CodeGraphError>;
}
