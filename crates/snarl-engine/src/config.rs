//! Engine configuration.
//!
//! Provides [`EngineConfig`] with the deployment-tunable thresholds of the
//! pipeline. Defaults come from [`snarl_core::constants`]; score weights
//! and multiplier bounds are protocol-fixed and not configurable here.

use snarl_core::constants::{
    DISCOVERY_GRACE_SECS, DUPLICATE_SIMILARITY_THRESHOLD, MAX_GRAPH_EDGES, MAX_GRAPH_NODES,
    RATE_LIMIT_MAX_SUBMISSIONS, RATE_LIMIT_WINDOW_SECS, RECENT_WINDOW_SECS,
    SIGNATURE_CANDIDATE_THRESHOLD,
};

/// Configuration for a [`PatternEngine`](crate::PatternEngine) instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum nodes accepted before a graph is refused unanalyzed.
    pub max_graph_nodes: usize,
    /// Maximum edges accepted before a graph is refused unanalyzed.
    pub max_graph_edges: usize,
    /// Grace period for shared first-discovery credit.
    pub discovery_grace_secs: u64,
    /// Tier-2 signature similarity for duplicate candidates.
    pub signature_candidate_threshold: f64,
    /// Tier-3 similarity above which a pattern is a structural duplicate.
    pub duplicate_similarity_threshold: f64,
    /// Sliding-window length for per-submitter rate limiting.
    pub rate_limit_window_secs: u64,
    /// Maximum submissions per submitter inside one window.
    pub rate_limit_max_submissions: usize,
    /// How long submissions stay visible to the coordination and farming
    /// analyses.
    pub recent_window_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_graph_nodes: MAX_GRAPH_NODES,
            max_graph_edges: MAX_GRAPH_EDGES,
            discovery_grace_secs: DISCOVERY_GRACE_SECS,
            signature_candidate_threshold: SIGNATURE_CANDIDATE_THRESHOLD,
            duplicate_similarity_threshold: DUPLICATE_SIMILARITY_THRESHOLD,
            rate_limit_window_secs: RATE_LIMIT_WINDOW_SECS,
            rate_limit_max_submissions: RATE_LIMIT_MAX_SUBMISSIONS,
            recent_window_secs: RECENT_WINDOW_SECS,
        }
    }
}
