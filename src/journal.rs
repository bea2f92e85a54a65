//! Skin journal — legacy longitudinal records and their history view.
//!
//! Consumed when rendering a user's assessment history: stored entries carry
//! per-side clinical half-point scores and blemish counts under their
//! original camelCase field names. Persistence itself lives with an external
//! collaborator; this module only parses exported records and derives the
//! values the history view shows (labels, count deltas, the trend series).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::scale::{label_from_clinical_score, ScaleLabel};

/// Per-entry assessment scores, camelCase to match the stored documents.
/// Every field is optional — old records predate some of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSet {
    pub left_classification: Option<f64>,
    pub right_classification: Option<f64>,
    pub total_classification: Option<f64>,
    pub left_pimple_count: Option<i64>,
    pub right_pimple_count: Option<i64>,
    pub total_pimple_count: Option<i64>,
}

/// One stored journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Document id assigned by the store.
    pub id: String,
    pub date: DateTime<Utc>,
    /// Free-text body lines.
    #[serde(default)]
    pub body: Vec<String>,
    /// Photo URLs attached to the entry.
    #[serde(default)]
    pub media: Vec<String>,
    pub scores: Option<ScoreSet>,
}

/// Parse a JSON export of journal entries.
pub fn parse_entries(json: &str) -> Result<Vec<JournalEntry>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Display label for a stored clinical score; a missing score shows as
/// `Unknown`, same as an off-scale one.
pub fn classification_text(score: Option<f64>) -> ScaleLabel {
    match score {
        Some(s) => label_from_clinical_score(s),
        None => ScaleLabel::Unknown,
    }
}

/// Blemish-count change against the previous entry. `None` when either
/// entry has no count recorded.
pub fn count_delta(current: Option<i64>, previous: Option<i64>) -> Option<i64> {
    Some(current? - previous?)
}

/// Render a count + delta for the history view: `"7 blemishes (+2.0)"`,
/// `"7 blemishes (no change)"`, or `"N/A"` when no count was recorded.
/// The one-decimal signed delta is the stored records' historical
/// presentation and is kept as-is.
pub fn format_count_and_delta(count: Option<i64>, delta: Option<i64>) -> String {
    let Some(count) = count else {
        return "N/A".to_string();
    };
    let count_str = format!("{count} blemishes");
    match delta {
        Some(0) => format!("{count_str} (no change)"),
        Some(d) => format!("{count_str} ({:+.1})", d as f64),
        None => count_str,
    }
}

/// Entries whose date falls in `start..=end`, original order preserved.
pub fn entries_between(
    entries: &[JournalEntry],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<&JournalEntry> {
    entries
        .iter()
        .filter(|e| {
            let date = e.date.date_naive();
            start <= date && date <= end
        })
        .collect()
}

/// (date, total blemish count) pairs for the trend chart. Entries without
/// a recorded total default to 0, matching the historical chart behavior.
pub fn count_series(entries: &[JournalEntry]) -> Vec<(NaiveDate, i64)> {
    entries
        .iter()
        .map(|e| {
            let total = e
                .scores
                .as_ref()
                .and_then(|s| s.total_pimple_count)
                .unwrap_or(0);
            (e.date.date_naive(), total)
        })
        .collect()
}
