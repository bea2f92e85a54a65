//! Hayashi — facial acne severity assessment.
//!
//! Converts a raw face photo into a calibrated four-level severity label
//! and a blemish count by fusing the output heads of a pretrained
//! multi-head classifier. The crate covers the reproducible core only:
//! preprocessing, the classifier contract, prediction fusion, scale
//! mapping, per-side aggregation, and the legacy journal-score mapping.
//! Transport, persistence, and the network's training are collaborators
//! behind the exported types.

pub mod config;
pub mod journal;
pub mod pipeline;

pub use pipeline::{
    aggregate_sides, fuse_heads, label_from_clinical_score, AcneClassifier, AcneGrader,
    FusedResult, GradeError, GradeOutcome, HeadOutputs, ModelVariant, NormalizedInput,
    OverallResult, Preprocessor, ScaleLabel, SeverityLabel, Side, SideResult,
};

#[cfg(feature = "onnx-classifier")]
pub use pipeline::OnnxClassifier;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries and integration harnesses.
/// Respects `RUST_LOG`, falling back to the crate-scoped default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
