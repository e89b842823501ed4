//! The shared error type (spec §7 "Error Handling Design").
//!
//! Resolution errors are *not* represented here — the spec requires they
//! render as a message string on the success path of the query facade, never
//! as a thrown error (§7 "the query path never throws across the facade").

use thiserror::Error;

/// Error kinds bubbled fatally for an operation. Extraction errors are
/// collected per-file by the ingestion orchestrator rather than propagated
/// through this type (§4.2.3) — callers build an aggregate result instead of
/// returning early.
#[derive(Debug, Error)]
pub enum CodeGraphError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("node not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// A recognizable, distinguishable overflow signal (spec §4.3
    /// "context-overflow error"). Carries the length that was rejected so
    /// the progressive-truncation fallback can decide its next attempt.
    #[error("content of length {attempted_len} exceeds the model's context size")]
    ContextOverflow { attempted_len: usize },

    /// Embedding backend faults other than overflow (model missing, backend
    /// crash) — fatal for the current operation (§7).
    #[error("embedding backend error: {0}")]
    Embedding(String),

    /// Intermediate components must translate any library-specific
    /// cancellation signal into this kind (§5 "Cancellation").
    #[error("operation cancelled")]
    Cancelled,
}

impl CodeGraphError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_context_overflow(&self) -> bool {
        matches!(self, Self::ContextOverflow { .. })
    }

    pub fn context_overflow(attempted_len: usize) -> Self {
        Self::ContextOverflow { attempted_len }
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CodeGraphError>;
