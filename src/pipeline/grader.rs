//! Grading orchestrator: per-side evaluation with error isolation, then
//! aggregation over whatever sides succeeded.
//!
//! The grader owns a preprocessor and a shared handle to the loaded
//! classifier; both are immutable after construction, so one grader serves
//! concurrent callers without interior state. Sides are independent — they
//! may be evaluated in any order or in parallel by the caller.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::aggregate::aggregate_sides;
use super::classifier::AcneClassifier;
use super::fusion::fuse_heads;
use super::preprocess::Preprocessor;
use super::types::{OverallResult, Side, SideResult};
use super::{GradeError, SeverityLabel};

/// A side that failed to grade, with the error that isolated it.
#[derive(Debug)]
pub struct SideFailure {
    pub side: Side,
    pub error: GradeError,
}

/// Outcome of one multi-side assessment.
///
/// `sides` keeps submission order; `skipped` records sides whose images were
/// rejected without affecting the rest. The id is fresh per assessment and
/// is what the persistence collaborator files the record under.
#[derive(Debug)]
pub struct GradeOutcome {
    pub assessment_id: Uuid,
    pub sides: Vec<SideResult>,
    pub skipped: Vec<SideFailure>,
    pub overall: OverallResult,
}

/// Full pipeline front door: photo bytes in, Hayashi judgment out.
pub struct AcneGrader {
    preprocessor: Preprocessor,
    classifier: Arc<dyn AcneClassifier>,
}

impl AcneGrader {
    /// Grader with the production preprocessor (EXIF correction on).
    pub fn new(classifier: Arc<dyn AcneClassifier>) -> Self {
        Self {
            preprocessor: Preprocessor::new(),
            classifier,
        }
    }

    /// Swap the preprocessing pipeline (tests, pre-rotated inputs).
    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Grade one side: preprocess → infer → fuse → label.
    ///
    /// Stateless per call; returns a complete [`SideResult`] or the error
    /// that stopped it. Nothing partial is ever produced.
    pub fn grade_side(&self, side: Side, image_bytes: &[u8]) -> Result<SideResult, GradeError> {
        let input = self.preprocessor.prepare(image_bytes)?;
        let heads = self.classifier.infer(&input)?;
        let fused = fuse_heads(self.classifier.variant(), &heads)?;
        let severity_label = SeverityLabel::from_index(fused.severity_index)?;

        info!(
            %side,
            %severity_label,
            blemish_count = fused.blemish_count,
            "Side graded"
        );

        Ok(SideResult {
            side,
            severity_label,
            fused,
        })
    }

    /// Grade every submitted side and aggregate the successes.
    ///
    /// Per-image errors are isolated: one undecodable side is recorded in
    /// `skipped` and the remaining sides still grade and aggregate. Only
    /// when no side succeeds does this fail, with
    /// [`GradeError::EmptyResultSet`].
    pub fn grade(&self, submissions: &[(Side, &[u8])]) -> Result<GradeOutcome, GradeError> {
        let mut sides = Vec::with_capacity(submissions.len());
        let mut skipped = Vec::new();

        for (side, bytes) in submissions {
            match self.grade_side(*side, bytes) {
                Ok(result) => sides.push(result),
                Err(error) => {
                    warn!(%side, %error, "Skipping side");
                    skipped.push(SideFailure { side: *side, error });
                }
            }
        }

        let overall = aggregate_sides(&sides)?;

        Ok(GradeOutcome {
            assessment_id: Uuid::new_v4(),
            sides,
            skipped,
            overall,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::preprocess::NormalizedInput;
    use crate::pipeline::types::{HeadOutputs, ModelVariant};

    use std::io::Cursor;

    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

    /// Deterministic stand-in for the checkpoint: emits fixed logits,
    /// optionally broken ones for contract tests.
    struct FixedClassifier {
        variant: ModelVariant,
        heads: HeadOutputs,
    }

    impl FixedClassifier {
        fn coarse(class: Vec<f32>, count: Vec<f32>, count_to_class: Vec<f32>) -> Self {
            Self {
                variant: ModelVariant::Coarse,
                heads: HeadOutputs {
                    class_logits: class,
                    count_logits: count,
                    count_to_class_logits: count_to_class,
                },
            }
        }
    }

    impl AcneClassifier for FixedClassifier {
        fn variant(&self) -> ModelVariant {
            self.variant
        }

        fn infer(&self, _input: &NormalizedInput) -> Result<HeadOutputs, GradeError> {
            Ok(self.heads.clone())
        }
    }

    fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn mild_grader() -> AcneGrader {
        // Fused scores point at index 1, count bin 4 → 5 blemishes
        AcneGrader::new(Arc::new(FixedClassifier::coarse(
            vec![0.0, 3.0, 0.0, 0.0],
            vec![0.0, 0.1, 0.0, 0.0, 0.9],
            vec![0.0, 2.0, 0.0, 0.0],
        )))
    }

    #[test]
    fn grades_one_side_end_to_end() {
        let result = mild_grader()
            .grade_side(Side::Left, &png_bytes(320, 240, [150, 110, 90]))
            .unwrap();

        assert_eq!(result.side, Side::Left);
        assert_eq!(result.severity_label, SeverityLabel::Mild);
        assert_eq!(result.fused.severity_index, 1);
        assert_eq!(result.fused.blemish_count, 5);
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let grader = mild_grader();
        let bytes = png_bytes(200, 260, [140, 100, 80]);
        let a = grader.grade_side(Side::Front, &bytes).unwrap();
        let b = grader.grade_side(Side::Front, &bytes).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bad_side_is_isolated_from_good_sides() {
        let grader = mild_grader();
        let good = png_bytes(100, 100, [120, 90, 70]);
        let garbage = vec![0xFF; 512];

        let outcome = grader
            .grade(&[
                (Side::Left, good.as_slice()),
                (Side::Right, garbage.as_slice()),
                (Side::Front, good.as_slice()),
            ])
            .unwrap();

        assert_eq!(outcome.sides.len(), 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].side, Side::Right);
        assert!(matches!(
            outcome.skipped[0].error,
            GradeError::InvalidImage(_)
        ));
        // Aggregation proceeds over the two successes
        assert_eq!(outcome.overall.overall_label, SeverityLabel::Mild);
        assert_eq!(outcome.overall.total_blemish_count, 10);
    }

    #[test]
    fn all_sides_failing_yields_empty_result_set() {
        let grader = mild_grader();
        let garbage = vec![0x00; 512];

        let result = grader.grade(&[
            (Side::Left, garbage.as_slice()),
            (Side::Right, garbage.as_slice()),
        ]);
        assert!(matches!(result, Err(GradeError::EmptyResultSet)));
    }

    #[test]
    fn contract_violation_surfaces_not_coerced() {
        // 5-wide classification head on a coarse checkpoint
        let grader = AcneGrader::new(Arc::new(FixedClassifier::coarse(
            vec![0.0; 5],
            vec![1.0],
            vec![0.0; 4],
        )));
        let result = grader.grade_side(Side::Front, &png_bytes(64, 64, [100, 100, 100]));
        assert!(matches!(result, Err(GradeError::ModelContract(_))));
    }

    #[test]
    fn outcome_ids_are_unique_per_assessment() {
        let grader = mild_grader();
        let bytes = png_bytes(80, 80, [130, 95, 75]);
        let a = grader.grade(&[(Side::Front, bytes.as_slice())]).unwrap();
        let b = grader.grade(&[(Side::Front, bytes.as_slice())]).unwrap();
        assert_ne!(a.assessment_id, b.assessment_id);
    }
}
