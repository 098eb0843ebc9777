//! Run summary assembly.

use crate::model::{AggregateStats, MapStats, MatchSummary, ReconSummary};

/// Combine the per-stage counters into the run summary.
///
/// Rates are `None` when no grade rows were processed: an empty snapshot
/// produces a diagnostic summary instead of a division by zero.
pub fn compute_summary(
    aggregation: AggregateStats,
    matching: MatchSummary,
    mapping: MapStats,
) -> ReconSummary {
    let rate = |part: usize| -> Option<f64> {
        (mapping.processed > 0).then(|| round2(part as f64 / mapping.processed as f64 * 100.0))
    };

    ReconSummary {
        section_match_rate: rate(mapping.section_matches),
        fallback_match_rate: rate(mapping.fallback_matches),
        unmatched_rate: rate(mapping.no_matches),
        aggregation,
        matching,
        mapping,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
