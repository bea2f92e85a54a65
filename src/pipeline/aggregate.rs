//! Aggregation: per-side results → one overall judgment.
//!
//! A deterministic reduction over the submission-ordered side results. It
//! runs only after every requested side has finished (or failed); callers
//! must guarantee at least one successful side.

use tracing::debug;

use super::types::{OverallResult, SideResult};
use super::GradeError;

/// Reduce a non-empty, submission-ordered slice of side results.
///
/// Overall label = most frequent per-side label; a frequency tie resolves
/// to the label of the earliest side in the slice. Total count = sum of the
/// per-side blemish counts. The per-side results themselves are left for
/// detailed display — nothing here mutates them.
pub fn aggregate_sides(sides: &[SideResult]) -> Result<OverallResult, GradeError> {
    let first = sides.first().ok_or(GradeError::EmptyResultSet)?;

    // First-encounter scan: a later label must be strictly more frequent
    // to displace an earlier one.
    let mut overall_label = first.severity_label;
    let mut best_count = 0usize;
    for side in sides {
        let count = sides
            .iter()
            .filter(|s| s.severity_label == side.severity_label)
            .count();
        if count > best_count {
            best_count = count;
            overall_label = side.severity_label;
        }
    }

    let total_blemish_count = sides.iter().map(|s| s.fused.blemish_count).sum();

    debug!(
        sides = sides.len(),
        %overall_label,
        total_blemish_count,
        "Aggregated side results"
    );

    Ok(OverallResult {
        overall_label,
        total_blemish_count,
    })
}
