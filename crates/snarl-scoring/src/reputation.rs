//! Per-submitter reputation tracking.
//!
//! Every classified result feeds back into the submitter's running
//! statistics: verified/rejected counters, exponential moving averages of
//! score and complexity, duplicate and gaming penalties. From those the
//! tracker derives a bounded multiplier that scales future scores, so a
//! history of quality pays and a history of gaming costs.
//!
//! The `historical_ratio` input has no in-engine derivation; it is
//! injected by an external feed via [`ReputationTracker::set_historical_ratio`]
//! and defaults to a neutral 0.5, which zeroes the balance penalty.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use snarl_core::constants::{
    EMA_ALPHA, GAMING_PENALTY_STEP, HISTORICAL_RATIO_DEFAULT, MULTIPLIER_MAX, MULTIPLIER_MIN,
};

/// Running reputation statistics for one submitter.
///
/// Created lazily on the first submission and mutated in place for the
/// lifetime of the submitter.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReputationState {
    pub submitter_id: String,

    pub total_submissions: u64,
    pub verified_submissions: u64,
    pub rejected_submissions: u64,

    /// EMA of final scores over verified submissions.
    pub avg_score: f64,
    /// EMA of complexity scores over verified submissions.
    pub avg_complexity: f64,
    pub success_rate: f64,

    /// Externally fed ratio of historical vs freshly mined patterns.
    pub historical_ratio: f64,
    pub duplicate_count: u64,
    pub gaming_penalty_score: f64,

    /// Bounded multiplier applied to this submitter's scores.
    pub multiplier: f64,

    pub first_submission_at: u64,
    pub last_submission_at: u64,
    pub updated_at: u64,
}

impl ReputationState {
    fn new(submitter_id: &str, now: u64) -> Self {
        Self {
            submitter_id: submitter_id.to_string(),
            total_submissions: 0,
            verified_submissions: 0,
            rejected_submissions: 0,
            avg_score: 0.0,
            avg_complexity: 0.0,
            success_rate: 0.0,
            historical_ratio: HISTORICAL_RATIO_DEFAULT,
            duplicate_count: 0,
            gaming_penalty_score: 0.0,
            multiplier: 1.0,
            first_submission_at: now,
            last_submission_at: now,
            updated_at: now,
        }
    }

    fn ema(old: f64, value: f64) -> f64 {
        EMA_ALPHA * value + (1.0 - EMA_ALPHA) * old
    }

    /// Recompute the multiplier from the current statistics.
    fn recompute_multiplier(&mut self) {
        let mut multiplier = 1.0;

        if self.historical_ratio < 0.3 {
            multiplier -= 0.5 * (0.3 - self.historical_ratio);
        }

        let gaming_penalty = (0.1 * self.duplicate_count as f64 + self.gaming_penalty_score)
            .min(0.8);
        multiplier -= gaming_penalty;

        if self.success_rate > 0.9 && self.avg_score > 0.7 && self.total_submissions > 50 {
            multiplier += 0.3;
        } else if self.success_rate > 0.8 && self.avg_score > 0.6 {
            multiplier += 0.1;
        }

        self.multiplier = multiplier.clamp(MULTIPLIER_MIN, MULTIPLIER_MAX);
    }
}

/// What a classified result contributes to the submitter's reputation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReputationUpdate {
    pub verified: bool,
    pub final_score: f64,
    pub complexity_score: f64,
    pub is_duplicate: bool,
    /// The gaming verdict rejected the submission outright.
    pub gaming_rejected: bool,
}

/// Tracker holding one [`ReputationState`] per submitter.
///
/// Updates run inside a `DashMap` entry, so read-modify-write is
/// serialized per submitter while distinct submitters proceed in parallel.
#[derive(Default)]
pub struct ReputationTracker {
    states: DashMap<String, ReputationState>,
}

impl ReputationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one classified result into the submitter's state and return
    /// the updated snapshot.
    pub fn record(&self, submitter: &str, update: ReputationUpdate, now: u64) -> ReputationState {
        let mut state = self
            .states
            .entry(submitter.to_string())
            .or_insert_with(|| ReputationState::new(submitter, now));

        state.total_submissions += 1;
        state.last_submission_at = now;

        if update.is_duplicate {
            state.duplicate_count += 1;
        }
        if update.gaming_rejected {
            state.gaming_penalty_score += GAMING_PENALTY_STEP;
        }

        if update.verified {
            state.verified_submissions += 1;
            state.avg_score = ReputationState::ema(state.avg_score, update.final_score);
            state.avg_complexity =
                ReputationState::ema(state.avg_complexity, update.complexity_score);
        } else {
            state.rejected_submissions += 1;
        }

        state.success_rate = state.verified_submissions as f64 / state.total_submissions as f64;
        state.recompute_multiplier();
        state.updated_at = now;

        debug!(
            submitter,
            total = state.total_submissions,
            success_rate = state.success_rate,
            multiplier = state.multiplier,
            "reputation updated"
        );
        state.clone()
    }

    /// Inject the externally derived historical-pattern ratio and
    /// recompute the multiplier.
    pub fn set_historical_ratio(&self, submitter: &str, ratio: f64, now: u64) -> ReputationState {
        let mut state = self
            .states
            .entry(submitter.to_string())
            .or_insert_with(|| ReputationState::new(submitter, now));
        state.historical_ratio = ratio.clamp(0.0, 1.0);
        state.recompute_multiplier();
        state.updated_at = now;
        state.clone()
    }

    /// Snapshot of a submitter's state, if any submission has been seen.
    pub fn get(&self, submitter: &str) -> Option<ReputationState> {
        self.states.get(submitter).map(|s| s.clone())
    }

    /// Current multiplier for a submitter; `1.0` for unknown submitters.
    pub fn multiplier(&self, submitter: &str) -> f64 {
        self.states.get(submitter).map(|s| s.multiplier).unwrap_or(1.0)
    }

    /// Number of tracked submitters.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
