use std::env;
use std::path::PathBuf;

use crate::pipeline::types::ModelVariant;

/// Application-level constants
pub const APP_NAME: &str = "Hayashi";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

/// Get the application data directory
/// ~/Hayashi/ on all platforms (user-visible)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Hayashi")
}

/// Get the models directory (ONNX checkpoints)
pub fn models_dir() -> PathBuf {
    app_data_dir().join("models")
}

/// Default checkpoint path for a deployed variant.
pub fn checkpoint_path(variant: ModelVariant) -> PathBuf {
    let file = match variant {
        ModelVariant::FineGrained => "acne-lds.onnx",
        ModelVariant::Coarse => "acne-hayashi.onnx",
    };
    models_dir().join(file)
}

/// Classifier deployment configuration, fixed at process start.
///
/// The variant is a process-level decision, never per request: the fusion
/// stage branches on it and the checkpoint must match.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub variant: ModelVariant,
    pub checkpoint: PathBuf,
}

impl ModelConfig {
    /// Read from `HAYASHI_MODEL_VARIANT` / `HAYASHI_CHECKPOINT`, defaulting
    /// to the fine-grained LDS checkpoint in the models directory. An
    /// unrecognized variant string falls back to the default rather than
    /// guessing a head width.
    pub fn from_env() -> Self {
        let variant = env::var("HAYASHI_MODEL_VARIANT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(ModelVariant::FineGrained);

        let checkpoint = env::var("HAYASHI_CHECKPOINT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| checkpoint_path(variant));

        Self {
            variant,
            checkpoint,
        }
    }
}
