//! Shared pipeline types — sides, labels, fused results, head outputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which side of the face a photo shows. Submission order is meaningful:
/// aggregation tie-breaks resolve to the earliest submitted side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    Front,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
            Side::Front => write!(f, "front"),
        }
    }
}

/// Four-level Hayashi severity vocabulary. A pure function of the fused
/// severity index (0→Clear … 3→Severe); see [`SeverityLabel::from_index`]
/// in the scale module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeverityLabel {
    Clear,
    Mild,
    Moderate,
    Severe,
}

impl fmt::Display for SeverityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeverityLabel::Clear => write!(f, "Clear"),
            SeverityLabel::Mild => write!(f, "Mild"),
            SeverityLabel::Moderate => write!(f, "Moderate"),
            SeverityLabel::Severe => write!(f, "Severe"),
        }
    }
}

/// Deployed classification-head width. Fixed at process configuration time,
/// never per request; fusion branches on this explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelVariant {
    /// 13-class head (label-distribution-smoothing checkpoint), regrouped
    /// into the four Hayashi buckets at fusion time.
    FineGrained,
    /// 4-class head predicting the Hayashi scale directly.
    Coarse,
}

impl ModelVariant {
    /// Expected length of the classification head for this variant.
    pub fn class_width(self) -> usize {
        match self {
            ModelVariant::FineGrained => 13,
            ModelVariant::Coarse => 4,
        }
    }
}

impl FromStr for ModelVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fine-grained" | "fine_grained" | "lds" => Ok(ModelVariant::FineGrained),
            "coarse" | "hayashi" => Ok(ModelVariant::Coarse),
            other => Err(format!("Unknown model variant: {other}")),
        }
    }
}

/// The classifier's three output heads for one image, exactly as emitted.
///
/// Lengths are validated at fusion time: the classification head must match
/// the declared variant, the count-to-class head must be 4 wide, and the
/// count head must be non-empty. Nothing is truncated or padded.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadOutputs {
    pub class_logits: Vec<f32>,
    pub count_logits: Vec<f32>,
    pub count_to_class_logits: Vec<f32>,
}

/// One complete severity judgment for one image. Never partial: an image
/// either yields both fields or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedResult {
    /// Hayashi class index, always in `0..=3`.
    pub severity_index: usize,
    /// Predicted blemish count, always ≥ 1 (count bins are 1-indexed).
    pub blemish_count: u32,
}

/// Per-side assessment, immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideResult {
    pub side: Side,
    pub severity_label: SeverityLabel,
    #[serde(flatten)]
    pub fused: FusedResult,
}

/// Reduction over all successfully graded sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallResult {
    /// Most frequent per-side label; frequency ties go to the earliest
    /// submitted side.
    pub overall_label: SeverityLabel,
    /// Sum of per-side blemish counts.
    pub total_blemish_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_class_widths() {
        assert_eq!(ModelVariant::FineGrained.class_width(), 13);
        assert_eq!(ModelVariant::Coarse.class_width(), 4);
    }

    #[test]
    fn variant_parses_common_spellings() {
        assert_eq!("fine-grained".parse(), Ok(ModelVariant::FineGrained));
        assert_eq!("LDS".parse(), Ok(ModelVariant::FineGrained));
        assert_eq!("coarse".parse(), Ok(ModelVariant::Coarse));
        assert!("resnet".parse::<ModelVariant>().is_err());
    }

    #[test]
    fn side_result_serializes_flat() {
        let result = SideResult {
            side: Side::Left,
            severity_label: SeverityLabel::Mild,
            fused: FusedResult {
                severity_index: 1,
                blemish_count: 7,
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["side"], "left");
        assert_eq!(json["severityLabel"], "Mild");
        assert_eq!(json["severityIndex"], 1);
        assert_eq!(json["blemishCount"], 7);
    }

    #[test]
    fn side_display_lowercase() {
        assert_eq!(Side::Front.to_string(), "front");
    }
}
