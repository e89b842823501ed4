//! ONNX-backed [`InferenceBackend`]/[`InferenceContext`] (spec §6 "Inference
//! backend", §4.3). Grounded on the teacher's mean-pooling-over-attention-mask
//! pipeline, simplified to one text per `embed()` call and one `Session` per
//! context rather than one shared session behind a lock — that's what lets
//! each pool context get its own `intra_threads` affinity (spec §4.3).
//!
//! Unlike the teacher, this loads tokenizer and model files from a local
//! directory only: resolving models and other external binary artifacts from
//! a hub is an external-collaborator concern, not something this crate does.

use std::path::PathBuf;

use codegraph_core::CodeGraphError;
use ndarray::{Array2, Axis};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tokenizers::Tokenizer;

use crate::backend::{InferenceBackend, InferenceContext};

const DEFAULT_MODEL_FILE: &str = "model.onnx";
const DEFAULT_TOKENIZER_FILE: &str = "tokenizer.json";

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    pub model_dir: PathBuf,
    pub model_file: String,
    pub tokenizer_file: String,
    pub max_sequence_length: usize,
}

impl OnnxConfig {
    pub fn new(model_dir: impl Into<PathBuf>, max_sequence_length: usize) -> Self {
        Self {
            model_dir: model_dir.into(),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            tokenizer_file: DEFAULT_TOKENIZER_FILE.to_string(),
            max_sequence_length,
        }
    }

    fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    fn tokenizer_path(&self) -> PathBuf {
        self.model_dir.join(&self.tokenizer_file)
    }
}

/// Loaded once per process: holds the tokenizer (cheap to share) and the
/// config needed to mint a fresh [`Session`] per pool context.
pub struct OnnxBackend {
    tokenizer: Tokenizer,
    config: OnnxConfig,
}

impl OnnxBackend {
    pub fn load(config: OnnxConfig) -> Result<Self, CodeGraphError> {
        let model_path = config.model_path();
        if !model_path.exists() {
            return Err(CodeGraphError::embedding(format!(
                "ONNX model file not found at {}",
                model_path.display()
            )));
        }
        let tokenizer = Tokenizer::from_file(config.tokenizer_path())
            .map_err(|e| CodeGraphError::embedding(format!("failed to load tokenizer: {e}")))?;
        Ok(Self { tokenizer, config })
    }
}

impl InferenceBackend for OnnxBackend {
    type Context = OnnxContext;

    fn create_context(&self, threads: usize) -> Result<Self::Context, CodeGraphError> {
        let session = Session::builder()
            .map_err(|e| CodeGraphError::embedding(format!("session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| CodeGraphError::embedding(format!("optimization level: {e}")))?
            .with_intra_threads(threads)
            .map_err(|e| CodeGraphError::embedding(format!("intra_threads: {e}")))?
            .commit_from_file(self.config.model_path())
            .map_err(|e| CodeGraphError::embedding(format!("loading model: {e}")))?;

        Ok(OnnxContext {
            session,
            tokenizer: self.tokenizer.clone(),
            max_sequence_length: self.config.max_sequence_length,
        })
    }
}

pub struct OnnxContext {
    session: Session,
    tokenizer: Tokenizer,
    max_sequence_length: usize,
}

impl OnnxContext {
    fn encode(&self, text: &str) -> Result<(Vec<i64>, Vec<i64>), CodeGraphError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| CodeGraphError::embedding(format!("tokenization failed: {e}")))?;
        let ids: Vec<i64> = encoding.get_ids().iter().map(|&x| x as i64).collect();
        if ids.len() > self.max_sequence_length {
            // The caller (ingestion's progressive-truncation fallback) is expected to
            // retry with a shorter input; silently truncating here would hide that
            // the embedded content no longer matches the requested snippet (spec §4.7).
            return Err(CodeGraphError::context_overflow(text.len()));
        }
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&x| if x > 0 { 1 } else { 0 })
            .collect();
        Ok((ids, mask))
    }
}

impl InferenceContext for OnnxContext {
    fn embed(&self, text: &str) -> Result<Vec<f32>, CodeGraphError> {
        let (ids, mask) = self.encode(text)?;
        let seq_len = ids.len();

        let mut arr_ids = Array2::<i64>::zeros((1, seq_len));
        let mut arr_mask = Array2::<i64>::zeros((1, seq_len));
        let arr_type_ids = Array2::<i64>::zeros((1, seq_len));
        arr_ids.row_mut(0).assign(&ndarray::ArrayView1::from(ids.as_slice()));
        arr_mask.row_mut(0).assign(&ndarray::ArrayView1::from(mask.as_slice()));

        let input_ids_v =
            Value::from_array(arr_ids.clone().into_dyn()).map_err(|e| CodeGraphError::embedding(format!("input_ids tensor: {e}")))?;
        let attention_mask_v =
            Value::from_array(arr_mask.clone().into_dyn()).map_err(|e| CodeGraphError::embedding(format!("attention_mask tensor: {e}")))?;
        let token_type_ids_v = Value::from_array(arr_type_ids.into_dyn())
            .map_err(|e| CodeGraphError::embedding(format!("token_type_ids tensor: {e}")))?;

        let mut named: Vec<(String, ort::session::SessionInputValue<'_>)> = Vec::new();
        for input in &self.session.inputs {
            let name = input.name.to_lowercase();
            if name.contains("input_ids") || name == "input" {
                named.push((input.name.clone(), input_ids_v.clone().into()));
            } else if name.contains("attention") || name.contains("mask") {
                named.push((input.name.clone(), attention_mask_v.clone().into()));
            } else if name.contains("token_type") || name.contains("segment") {
                named.push((input.name.clone(), token_type_ids_v.clone().into()));
            }
        }
        if named.is_empty() {
            named.push(("input_ids".into(), input_ids_v.into()));
            named.push(("attention_mask".into(), attention_mask_v.into()));
        }

        let outputs = self
            .session
            .run(named)
            .map_err(|e| CodeGraphError::embedding(format!("inference failed: {e}")))?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| CodeGraphError::embedding(format!("reading output tensor: {e}")))?;
        let arr_dyn = ndarray::Array::from_shape_vec(shape.to_ixdyn(), data.to_vec())
            .map_err(|e| CodeGraphError::embedding(format!("reshaping output: {e}")))?;

        let pooled = if arr_dyn.ndim() == 2 {
            arr_dyn
                .into_dimensionality::<ndarray::Ix2>()
                .map_err(|e| CodeGraphError::embedding(format!("expected 2D output: {e}")))?
                .row(0)
                .to_vec()
        } else if arr_dyn.ndim() == 3 {
            let arr3 = arr_dyn
                .into_dimensionality::<ndarray::Ix3>()
                .map_err(|e| CodeGraphError::embedding(format!("expected 3D output: {e}")))?;
            let hidden = arr3.len_of(Axis(2));
            let mut summed = vec![0.0f32; hidden];
            let mut count = 0.0f32;
            for (token_idx, &m) in mask.iter().enumerate() {
                if m == 0 {
                    continue;
                }
                count += 1.0;
                for h in 0..hidden {
                    summed[h] += arr3[[0, token_idx, h]];
                }
            }
            let denom = if count <= 0.0 { 1.0 } else { count };
            summed.into_iter().map(|v| v / denom).collect()
        } else {
            return Err(CodeGraphError::embedding("unexpected ONNX output rank; expected 2D or 3D tensor"));
        };

        let norm = pooled.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-12);
        Ok(pooled.into_iter().map(|x| x / norm).collect())
    }
}

