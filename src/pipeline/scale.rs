//! Scale mapping: fused class indices and legacy clinical scores → labels.
//!
//! Two independent mappings share the four-level vocabulary. The live
//! pipeline maps severity indices 0..=3 and treats anything else as a logic
//! bug. Historical journal records instead carry half-point clinical scores
//! (0, 0.5, …, 3); those may contain out-of-range legacy values, so that
//! mapping degrades to an explicit `Unknown` label rather than failing.
//! The seven-point table is a stable contract with stored records — do not
//! change it without a migration plan.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::SeverityLabel;
use super::GradeError;

impl SeverityLabel {
    /// Total over `{0, 1, 2, 3}`; anything else is
    /// [`GradeError::UnknownSeverityIndex`]. Defensive — unreachable when
    /// the index comes from fusion, which only produces 0..=3.
    pub fn from_index(index: usize) -> Result<Self, GradeError> {
        match index {
            0 => Ok(SeverityLabel::Clear),
            1 => Ok(SeverityLabel::Mild),
            2 => Ok(SeverityLabel::Moderate),
            3 => Ok(SeverityLabel::Severe),
            other => Err(GradeError::UnknownSeverityIndex(other)),
        }
    }
}

/// Display label for journal history, where legacy records may carry scores
/// outside the defined half-point set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleLabel {
    Clear,
    Mild,
    Moderate,
    Severe,
    Unknown,
}

impl fmt::Display for ScaleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleLabel::Clear => write!(f, "Clear"),
            ScaleLabel::Mild => write!(f, "Mild"),
            ScaleLabel::Moderate => write!(f, "Moderate"),
            ScaleLabel::Severe => write!(f, "Severe"),
            ScaleLabel::Unknown => write!(f, "Unknown"),
        }
    }
}

impl From<SeverityLabel> for ScaleLabel {
    fn from(label: SeverityLabel) -> Self {
        match label {
            SeverityLabel::Clear => ScaleLabel::Clear,
            SeverityLabel::Mild => ScaleLabel::Mild,
            SeverityLabel::Moderate => ScaleLabel::Moderate,
            SeverityLabel::Severe => ScaleLabel::Severe,
        }
    }
}

/// Map a clinical half-point score onto the four-level scale.
///
/// 0–0.5 → Clear, 1–1.5 → Mild, 2–2.5 → Moderate, 3 → Severe. The stored
/// records compare scores exactly, so any value off the seven defined
/// points (0.7, 3.5, -1, NaN) maps to `Unknown`.
pub fn label_from_clinical_score(score: f64) -> ScaleLabel {
    // Work in half-point units so every defined score is an exact integer
    let doubled = score * 2.0;
    if !doubled.is_finite() || doubled.fract() != 0.0 {
        return ScaleLabel::Unknown;
    }

    match doubled as i64 {
        0 | 1 => ScaleLabel::Clear,
        2 | 3 => ScaleLabel::Mild,
        4 | 5 => ScaleLabel::Moderate,
        6 => ScaleLabel::Severe,
        _ => ScaleLabel::Unknown,
    }
}
