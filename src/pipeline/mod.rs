//! Severity assessment pipeline: raw photo in, Hayashi-scale judgment out.
//!
//! Data flows one way: bytes → [`preprocess`] → [`classifier`] → [`fusion`]
//! → [`scale`] → per-side result → [`aggregate`]. Every stage is synchronous
//! and stateless per call; the loaded classifier weights are the only shared
//! state and are immutable for the process lifetime.

pub mod types;
pub mod preprocess;
pub mod classifier;
pub mod fusion;
pub mod scale;
pub mod aggregate;
pub mod grader;

pub use types::*;
pub use preprocess::*;
pub use classifier::*;
pub use fusion::*;
pub use scale::*;
pub use aggregate::*;
pub use grader::*;

use thiserror::Error;

/// Pipeline error taxonomy.
///
/// Per-image failures (`InvalidImage`) are recoverable: the caller reports
/// them and skips that side. `ModelUnavailable` is startup-fatal — the
/// process must not serve until the checkpoint loads. `ModelContract` is a
/// logic bug between adapter and checkpoint and is never coerced away.
#[derive(Error, Debug)]
pub enum GradeError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Classifier unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Classifier contract violation: {0}")]
    ModelContract(String),

    #[error("Severity index {0} is outside the Hayashi scale")]
    UnknownSeverityIndex(usize),

    #[error("No successfully graded sides to aggregate")]
    EmptyResultSet,
}
