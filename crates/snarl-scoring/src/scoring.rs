//! Composite pattern scoring.
//!
//! Five component scores — classification confidence, structural
//! complexity, recency, volume significance, uniqueness — are combined
//! with fixed weights into one bounded composite, then scaled by the
//! submitter's reputation multiplier. The published score is re-clamped to
//! `[0, 1]`: reputation influences ranking, but the reported score stays
//! bounded.

use snarl_core::constants::{
    RECENCY_HORIZON_SECS, VOLUME_REFERENCE_UNITS, WEIGHT_CLASSIFICATION, WEIGHT_COMPLEXITY,
    WEIGHT_RECENCY, WEIGHT_UNIQUENESS, WEIGHT_VOLUME,
};
use snarl_core::types::ComponentScores;

/// Linear falloff of the newest edge timestamp over the recency horizon.
///
/// A pattern detected now scores `1.0`; one whose newest transaction is a
/// month old scores `0.0`. Timestamps in the future clamp to `1.0`.
pub fn recency_score(newest_edge_timestamp: u64, now: u64) -> f64 {
    let age = now.saturating_sub(newest_edge_timestamp);
    if age >= RECENCY_HORIZON_SECS {
        return 0.0;
    }
    1.0 - age as f64 / RECENCY_HORIZON_SECS as f64
}

/// Log-scaled volume significance, saturating at the reference volume.
pub fn volume_score(total_volume_units: f64) -> f64 {
    if total_volume_units <= 0.0 {
        return 0.0;
    }
    let score = (1.0 + total_volume_units).log10() / (1.0 + VOLUME_REFERENCE_UNITS).log10();
    score.clamp(0.0, 1.0)
}

/// Weighted composite of the five component scores, clamped to `[0, 1]`.
pub fn composite_score(scores: &ComponentScores) -> f64 {
    let weighted = WEIGHT_CLASSIFICATION * scores.confidence
        + WEIGHT_COMPLEXITY * scores.complexity
        + WEIGHT_RECENCY * scores.recency
        + WEIGHT_VOLUME * scores.volume
        + WEIGHT_UNIQUENESS * scores.uniqueness;
    weighted.clamp(0.0, 1.0)
}

/// The externally reported score: composite times the reputation
/// multiplier, re-clamped to `[0, 1]`.
pub fn published_score(composite: f64, reputation_multiplier: f64) -> f64 {
    (composite * reputation_multiplier).clamp(0.0, 1.0)
}
