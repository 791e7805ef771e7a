//! # snarl-scoring
//! Incentive layer: pattern-type classification, per-submitter reputation,
//! and the bounded composite score.

pub mod classify;
pub mod reputation;
pub mod scoring;

pub use classify::classify_pattern;
pub use reputation::{ReputationState, ReputationTracker, ReputationUpdate};
pub use scoring::{composite_score, published_score, recency_score, volume_score};
