//! Prediction fusion: three classifier heads → one severity judgment.
//!
//! The fine-grained checkpoint scores 13 classes which regroup onto the four
//! Hayashi buckets by summing fixed index ranges; the coarse checkpoint
//! scores the buckets directly. Classification evidence and the auxiliary
//! count-to-class head are averaged 50/50, then first-maximum argmax picks
//! the severity index. The count head's bins are 1-indexed: bin 0 already
//! means "one blemish", so the predicted count is `argmax + 1` and can never
//! be zero. That never-zero floor is a calibration property of the trained
//! model and is preserved as-is.

use super::types::{FusedResult, HeadOutputs, ModelVariant};
use super::GradeError;

/// Fine-grained class indices contributing to each Hayashi bucket.
const FINE_BUCKETS: [std::ops::Range<usize>; 4] = [0..1, 1..4, 4..10, 10..13];

/// Width of the auxiliary count-to-class head (always the Hayashi scale).
const COUNT_TO_CLASS_WIDTH: usize = 4;

/// Regroup classification logits into the four Hayashi buckets.
///
/// Coarse logits pass through unchanged; fine-grained logits are summed over
/// the fixed, non-overlapping `FINE_BUCKETS` ranges. A head of any other
/// length is a contract violation — never truncated or padded.
pub fn coarsen_class_logits(
    variant: ModelVariant,
    class_logits: &[f32],
) -> Result<[f32; 4], GradeError> {
    if class_logits.len() != variant.class_width() {
        return Err(GradeError::ModelContract(format!(
            "classification head has {} logits, {:?} variant expects {}",
            class_logits.len(),
            variant,
            variant.class_width()
        )));
    }

    match variant {
        ModelVariant::Coarse => Ok([
            class_logits[0],
            class_logits[1],
            class_logits[2],
            class_logits[3],
        ]),
        ModelVariant::FineGrained => {
            let mut buckets = [0.0f32; 4];
            for (bucket, range) in buckets.iter_mut().zip(FINE_BUCKETS) {
                *bucket = class_logits[range].iter().sum();
            }
            Ok(buckets)
        }
    }
}

/// Fuse the three heads into one complete [`FusedResult`].
///
/// Deterministic: identical head outputs yield a bit-identical result on
/// every call.
pub fn fuse_heads(variant: ModelVariant, heads: &HeadOutputs) -> Result<FusedResult, GradeError> {
    let coarse = coarsen_class_logits(variant, &heads.class_logits)?;

    if heads.count_to_class_logits.len() != COUNT_TO_CLASS_WIDTH {
        return Err(GradeError::ModelContract(format!(
            "count-to-class head has {} logits, expected {COUNT_TO_CLASS_WIDTH}",
            heads.count_to_class_logits.len()
        )));
    }
    if heads.count_logits.is_empty() {
        return Err(GradeError::ModelContract(
            "count head emitted no logits".into(),
        ));
    }

    let mut fused = [0.0f32; 4];
    for i in 0..COUNT_TO_CLASS_WIDTH {
        fused[i] = 0.5 * coarse[i] + 0.5 * heads.count_to_class_logits[i];
    }

    let severity_index = argmax_first(&fused);
    let count_index = argmax_first(&heads.count_logits);

    Ok(FusedResult {
        severity_index,
        // Bins are 1-indexed: bin 0 is "one blemish"
        blemish_count: count_index as u32 + 1,
    })
}

/// Index of the maximum value; ties resolve to the lowest index.
/// NaN entries never win (strict greater-than comparison).
fn argmax_first(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if values[best].is_nan() || *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heads(class: Vec<f32>, count: Vec<f32>, count_to_class: Vec<f32>) -> HeadOutputs {
        HeadOutputs {
            class_logits: class,
            count_logits: count,
            count_to_class_logits: count_to_class,
        }
    }

    // ── Bucket regrouping ──

    #[test]
    fn fine_grained_buckets_sum_fixed_ranges() {
        let logits: Vec<f32> = (1..=13).map(|v| v as f32).collect();
        let coarse = coarsen_class_logits(ModelVariant::FineGrained, &logits).unwrap();
        // Ranges [0,1), [1,4), [4,10), [10,13)
        assert_eq!(coarse, [1.0, 9.0, 45.0, 36.0]);
    }

    #[test]
    fn coarse_logits_pass_through() {
        let logits = vec![0.1, 0.2, 0.3, 0.4];
        let coarse = coarsen_class_logits(ModelVariant::Coarse, &logits).unwrap();
        assert_eq!(coarse, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn wrong_class_width_is_contract_violation() {
        let twelve = vec![0.0; 12];
        assert!(matches!(
            coarsen_class_logits(ModelVariant::FineGrained, &twelve),
            Err(GradeError::ModelContract(_))
        ));
        let thirteen = vec![0.0; 13];
        assert!(matches!(
            coarsen_class_logits(ModelVariant::Coarse, &thirteen),
            Err(GradeError::ModelContract(_))
        ));
    }

    // ── Fusion ──

    #[test]
    fn fusion_averages_class_and_count_evidence() {
        // Class head votes index 1, count-to-class votes index 2 harder
        let h = heads(
            vec![0.0, 2.0, 0.0, 0.0],
            vec![1.0],
            vec![0.0, 0.0, 6.0, 0.0],
        );
        let fused = fuse_heads(ModelVariant::Coarse, &h).unwrap();
        // Fused scores: [0, 1, 3, 0]
        assert_eq!(fused.severity_index, 2);
    }

    #[test]
    fn fusion_tie_breaks_to_lowest_index() {
        // Fused scores come out [0.3, 0.3, 0.1, 0.1]
        let h = heads(
            vec![0.3, 0.3, 0.1, 0.1],
            vec![1.0],
            vec![0.3, 0.3, 0.1, 0.1],
        );
        let fused = fuse_heads(ModelVariant::Coarse, &h).unwrap();
        assert_eq!(fused.severity_index, 0, "First maximum must win ties");
    }

    #[test]
    fn count_bins_are_one_indexed() {
        let h = heads(
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.1, 0.9, 0.2],
            vec![1.0, 0.0, 0.0, 0.0],
        );
        let fused = fuse_heads(ModelVariant::Coarse, &h).unwrap();
        assert_eq!(fused.blemish_count, 2, "Bin 1 means two blemishes");
    }

    #[test]
    fn blemish_count_is_never_zero() {
        // Even when bin 0 dominates, the count floors at 1
        let h = heads(
            vec![1.0, 0.0, 0.0, 0.0],
            vec![9.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0, 0.0],
        );
        let fused = fuse_heads(ModelVariant::Coarse, &h).unwrap();
        assert_eq!(fused.blemish_count, 1);
    }

    #[test]
    fn severity_index_in_range_for_both_variants() {
        let fine = heads(
            (0..13).map(|v| (v as f32) * 0.7 - 3.0).collect(),
            vec![0.2, 0.8, 0.5],
            vec![-1.0, 0.5, 2.0, 0.0],
        );
        let fused = fuse_heads(ModelVariant::FineGrained, &fine).unwrap();
        assert!(fused.severity_index <= 3);
        assert!(fused.blemish_count >= 1);

        let coarse = heads(
            vec![-2.0, -1.0, 3.0, 1.0],
            vec![0.2, 0.8, 0.5],
            vec![-1.0, 0.5, 2.0, 0.0],
        );
        let fused = fuse_heads(ModelVariant::Coarse, &coarse).unwrap();
        assert!(fused.severity_index <= 3);
        assert!(fused.blemish_count >= 1);
    }

    #[test]
    fn fusion_is_deterministic() {
        let h = heads(
            (0..13).map(|v| (v as f32).sin()).collect(),
            (0..65).map(|v| (v as f32).cos()).collect(),
            vec![0.4, 0.1, 0.9, 0.2],
        );
        let a = fuse_heads(ModelVariant::FineGrained, &h).unwrap();
        let b = fuse_heads(ModelVariant::FineGrained, &h).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bad_auxiliary_heads_are_contract_violations() {
        let short_cou2cls = heads(vec![1.0, 0.0, 0.0, 0.0], vec![1.0], vec![0.0; 3]);
        assert!(matches!(
            fuse_heads(ModelVariant::Coarse, &short_cou2cls),
            Err(GradeError::ModelContract(_))
        ));

        let empty_count = heads(vec![1.0, 0.0, 0.0, 0.0], vec![], vec![0.0; 4]);
        assert!(matches!(
            fuse_heads(ModelVariant::Coarse, &empty_count),
            Err(GradeError::ModelContract(_))
        ));
    }

    // ── Argmax ──

    #[test]
    fn argmax_ignores_nan() {
        assert_eq!(argmax_first(&[0.5, f32::NAN, 0.7]), 2);
        assert_eq!(argmax_first(&[f32::NAN, 0.1]), 1);
    }

    #[test]
    fn argmax_single_element() {
        assert_eq!(argmax_first(&[42.0]), 0);
    }
}
