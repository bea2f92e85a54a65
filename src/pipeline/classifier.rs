//! Classifier port — the contract with the pretrained multi-head backbone.
//!
//! The network itself is an opaque checkpoint: one normalized input in, three
//! logit heads out, in a single deterministic inference-mode evaluation
//! (dropout and similar stochastic layers disabled). Weights load once at
//! process start and are immutable afterwards, so a loaded classifier is safe
//! for unlimited concurrent readers.

use super::preprocess::NormalizedInput;
use super::types::{HeadOutputs, ModelVariant};
use super::GradeError;

/// Spatial resolution the backbone was trained at (square input).
pub const INPUT_SIZE: u32 = 224;

/// Per-channel normalization constants from the backbone's training
/// distribution (ACNE04). Part of the checkpoint contract — never
/// configurable per call.
pub const CHANNEL_MEAN: [f32; 3] = [0.458_151_52, 0.361_242, 0.293_482_66];
pub const CHANNEL_STD: [f32; 3] = [0.281_476_9, 0.226_204_44, 0.201_325_41];

/// Count-head width of the shipped label-distribution-smoothing checkpoint.
/// Informational: fusion accepts any non-empty count head, so a retrained
/// checkpoint with a different bin count needs no code change here.
pub const SHIPPED_COUNT_BINS: usize = 65;

/// The pretrained multi-head network, as seen by the pipeline.
///
/// Implementations must be deterministic: identical inputs produce
/// bit-identical head outputs across repeated calls.
pub trait AcneClassifier: Send + Sync {
    /// Classification-head width this checkpoint was deployed with.
    fn variant(&self) -> ModelVariant;

    /// Run one forward evaluation and return the three heads exactly as
    /// emitted (no reordering, truncation, or padding).
    fn infer(&self, input: &NormalizedInput) -> Result<HeadOutputs, GradeError>;
}

// ═══════════════════════════════════════════════════════════
// ONNX Runtime adapter — behind `onnx-classifier` feature
// ═══════════════════════════════════════════════════════════

#[cfg(feature = "onnx-classifier")]
mod onnx {
    use std::path::Path;
    use std::sync::Mutex;

    use ndarray::Axis;
    use ort::session::Session;

    use super::{AcneClassifier, HeadOutputs, ModelVariant, NormalizedInput, SHIPPED_COUNT_BINS};
    use crate::pipeline::GradeError;

    /// ONNX-exported acne backbone.
    ///
    /// Expects a checkpoint with three outputs in order: classification
    /// logits, count logits, count-to-class logits.
    ///
    /// Uses interior mutability (Mutex) because `ort::Session::run` requires
    /// `&mut self` but the `AcneClassifier` trait exposes `&self` for
    /// ergonomic shared usage.
    pub struct OnnxClassifier {
        session: Mutex<Session>,
        variant: ModelVariant,
    }

    impl OnnxClassifier {
        /// Load the checkpoint once. A missing or corrupt file is
        /// startup-fatal for the caller: the process must not serve until
        /// this succeeds.
        pub fn load(checkpoint: &Path, variant: ModelVariant) -> Result<Self, GradeError> {
            if !checkpoint.exists() {
                return Err(GradeError::ModelUnavailable(format!(
                    "checkpoint not found at {}",
                    checkpoint.display()
                )));
            }

            let session = Session::builder()
                .map_err(|e: ort::Error| GradeError::ModelUnavailable(e.to_string()))?
                .with_intra_threads(2)
                .map_err(|e: ort::Error| GradeError::ModelUnavailable(e.to_string()))?
                .commit_from_file(checkpoint)
                .map_err(|e: ort::Error| {
                    GradeError::ModelUnavailable(format!("ONNX load failed: {e}"))
                })?;

            // Three heads: classification, count, count-to-class
            if session.outputs.len() != 3 {
                return Err(GradeError::ModelContract(format!(
                    "checkpoint declares {} outputs, expected 3",
                    session.outputs.len()
                )));
            }

            tracing::info!(
                checkpoint = %checkpoint.display(),
                ?variant,
                "Acne classifier loaded"
            );

            Ok(Self {
                session: Mutex::new(session),
                variant,
            })
        }

        /// Extract one head as a flat `[1, N]` logit vector.
        fn extract_head(value: &ort::value::DynValue, idx: usize) -> Result<Vec<f32>, GradeError> {
            let (shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| GradeError::ModelContract(format!("head {idx} extraction: {e}")))?;

            // Batched single image: [1, N]
            if shape.len() != 2 || shape[0] != 1 {
                return Err(GradeError::ModelContract(format!(
                    "head {idx} has shape {shape:?}, expected [1, N]"
                )));
            }

            Ok(data.to_vec())
        }
    }

    impl AcneClassifier for OnnxClassifier {
        fn variant(&self) -> ModelVariant {
            self.variant
        }

        fn infer(&self, input: &NormalizedInput) -> Result<HeadOutputs, GradeError> {
            use ort::value::TensorRef;

            // [3, H, W] -> [1, 3, H, W]
            let batched = input.tensor.clone().insert_axis(Axis(0));
            let tensor = TensorRef::from_array_view(&batched)
                .map_err(|e| GradeError::ModelContract(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| GradeError::ModelUnavailable("session lock poisoned".into()))?;

            let outputs = session
                .run(ort::inputs![tensor])
                .map_err(|e| GradeError::ModelContract(format!("ONNX inference failed: {e}")))?;

            let count_logits = Self::extract_head(&outputs[1], 1)?;
            if count_logits.len() != SHIPPED_COUNT_BINS {
                // Fusion accepts any non-empty count head; surfaced for
                // checkpoint-swap debugging only.
                tracing::debug!(
                    bins = count_logits.len(),
                    shipped = SHIPPED_COUNT_BINS,
                    "Count head width differs from the shipped checkpoint"
                );
            }

            Ok(HeadOutputs {
                class_logits: Self::extract_head(&outputs[0], 0)?,
                count_logits,
                count_to_class_logits: Self::extract_head(&outputs[2], 2)?,
            })
        }
    }
}

#[cfg(feature = "onnx-classifier")]
pub use onnx::OnnxClassifier;
