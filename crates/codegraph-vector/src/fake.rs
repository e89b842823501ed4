//! A deterministic, dependency-free [`InferenceBackend`] for tests (spec §4.4
//! "test-friendly deterministic fake"): no ONNX runtime or model files
//! required, same content hashes in, same vectors out.

use codegraph_core::CodeGraphError;

use crate::backend::{InferenceBackend, InferenceContext};

pub const FAKE_DIMENSIONS: usize = 32;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Seeds a linear-congruential generator from the content hash of `text` and
/// draws an L2-normalized unit vector of `dimensions` length — same input,
/// same output, every time, with no model loaded.
fn deterministic_unit_vector(text: &str, dimensions: usize) -> Vec<f32> {
    let mut state = fnv1a(text.as_bytes()).max(1);
    let mut raw = Vec::with_capacity(dimensions);
    for _ in 0..dimensions {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let component = ((state >> 40) as f64 / (1u64 << 24) as f64) - 0.5;
        raw.push(component as f32);
    }
    let norm = raw.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|v| v / norm).collect()
    } else {
        raw
    }
}

pub struct FakeContext {
    dimensions: usize,
    overflow_threshold: Option<usize>,
}

impl InferenceContext for FakeContext {
    fn embed(&self, text: &str) -> Result<Vec<f32>, CodeGraphError> {
        if let Some(threshold) = self.overflow_threshold {
            if text.len() > threshold {
                return Err(CodeGraphError::context_overflow(text.len()));
            }
        }
        Ok(deterministic_unit_vector(text, self.dimensions))
    }
}

/// Mints [`FakeContext`]s. `overflow_threshold` lets tests exercise the
/// progressive-truncation fallback (spec §4.7) without a real context window.
#[derive(Clone, Copy)]
pub struct DeterministicFakeBackend {
    dimensions: usize,
    overflow_threshold: Option<usize>,
}

impl DeterministicFakeBackend {
    pub fn new() -> Self {
        Self {
            dimensions: FAKE_DIMENSIONS,
            overflow_threshold: None,
        }
    }

    pub fn with_overflow_threshold(threshold: usize) -> Self {
        Self {
            dimensions: FAKE_DIMENSIONS,
            overflow_threshold: Some(threshold),
        }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            overflow_threshold: None,
        }
    }
}

impl Default for DeterministicFakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for DeterministicFakeBackend {
    type Context = FakeContext;

    fn create_context(&self, _threads: usize) -> Result<Self::Context, CodeGraphError> {
        Ok(FakeContext {
            dimensions: self.dimensions,
            overflow_threshold: self.overflow_threshold,
        })
    }
}
