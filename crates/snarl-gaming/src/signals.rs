//! The four gaming signal analyses.
//!
//! Each analysis sits behind its own trait so policy can evolve (or be
//! replaced per deployment) without touching the aggregation logic in
//! [`detector`](crate::detector). The default implementations compute real
//! statistics over the submitted graph and the recent-submission window.
//!
//! All reports carry a `flagged` bit and a confidence in `[0, 1]`; only
//! flagged signals contribute to the aggregate gaming probability.

use std::collections::BTreeSet;

use snarl_core::constants::{
    ADDRESS_AGE_THRESHOLD_SECS, ADDRESS_OVERLAP_THRESHOLD, CIRCULAR_RATIO_THRESHOLD,
    CLUSTER_GAP_SECS, CORRELATION_SPAN_SECS, DUST_AMOUNT_UNITS, DUST_RATIO_THRESHOLD,
    FARMING_THRESHOLD, NEW_ADDRESS_RATIO_THRESHOLD, ROUND_NUMBER_BIAS_THRESHOLD,
    TEMPORAL_CLUSTERING_THRESHOLD,
};
use snarl_core::traits::AddressAgeOracle;
use snarl_core::types::EvidenceGraph;
use snarl_graph::GraphMetrics;

/// Summary of one submission retained in the recent window, the context
/// the coordination and farming analyses run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentSubmission {
    pub submitter_id: String,
    /// When the engine observed the submission.
    pub observed_at: u64,
    /// Distinct addresses appearing in the submission's graph.
    pub addresses: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Address age
// ---------------------------------------------------------------------------

/// Outcome of the address-age analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressAgeReport {
    pub new_address_count: usize,
    pub total_address_count: usize,
    pub new_address_ratio: f64,
    pub flagged: bool,
    pub confidence: f64,
}

/// Flags patterns whose addresses are mostly freshly created — a mark of
/// synthetic activity staged for submission.
pub trait AddressAgeAnalysis: Send + Sync {
    fn analyze(
        &self,
        graph: &EvidenceGraph,
        oracle: &dyn AddressAgeOracle,
        now: u64,
    ) -> AddressAgeReport;
}

/// Default policy: ratio of known-new addresses against a fixed threshold.
///
/// Addresses the oracle has no data for count as old, so an unavailable
/// oracle degrades to a no-op rather than a false positive.
#[derive(Debug, Clone)]
pub struct ThresholdAddressAge {
    pub age_threshold_secs: u64,
    pub ratio_threshold: f64,
}

impl Default for ThresholdAddressAge {
    fn default() -> Self {
        Self {
            age_threshold_secs: ADDRESS_AGE_THRESHOLD_SECS,
            ratio_threshold: NEW_ADDRESS_RATIO_THRESHOLD,
        }
    }
}

impl AddressAgeAnalysis for ThresholdAddressAge {
    fn analyze(
        &self,
        graph: &EvidenceGraph,
        oracle: &dyn AddressAgeOracle,
        now: u64,
    ) -> AddressAgeReport {
        let addresses = graph.unique_addresses();
        let total_address_count = addresses.len();
        let new_address_count = addresses
            .iter()
            .filter(|address| {
                oracle
                    .age_secs(address, now)
                    .is_some_and(|age| age < self.age_threshold_secs)
            })
            .count();

        let new_address_ratio = if total_address_count == 0 {
            0.0
        } else {
            new_address_count as f64 / total_address_count as f64
        };
        let flagged = new_address_ratio > self.ratio_threshold;

        AddressAgeReport {
            new_address_count,
            total_address_count,
            new_address_ratio,
            flagged,
            confidence: if flagged { new_address_ratio } else { 0.0 },
        }
    }
}

// ---------------------------------------------------------------------------
// Complexity authenticity
// ---------------------------------------------------------------------------

/// Outcome of the complexity-authenticity analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticityReport {
    pub circular_ratio: f64,
    pub dust_ratio: f64,
    pub temporal_clustering: f64,
    pub round_number_bias: f64,
    pub flagged: bool,
    pub confidence: f64,
}

/// Detects complexity inflated to farm the complexity score rather than
/// reflecting real fund movement.
pub trait AuthenticityAnalysis: Send + Sync {
    fn analyze(&self, graph: &EvidenceGraph, metrics: &GraphMetrics) -> AuthenticityReport;
}

/// Default policy: four sub-signals, flagged artificial when at least two
/// exceed their thresholds. Confidence is the fraction of tripped
/// sub-signals.
#[derive(Debug, Clone)]
pub struct SubSignalAuthenticity {
    pub circular_threshold: f64,
    pub dust_threshold: f64,
    pub clustering_threshold: f64,
    pub round_number_threshold: f64,
}

impl Default for SubSignalAuthenticity {
    fn default() -> Self {
        Self {
            circular_threshold: CIRCULAR_RATIO_THRESHOLD,
            dust_threshold: DUST_RATIO_THRESHOLD,
            clustering_threshold: TEMPORAL_CLUSTERING_THRESHOLD,
            round_number_threshold: ROUND_NUMBER_BIAS_THRESHOLD,
        }
    }
}

impl AuthenticityAnalysis for SubSignalAuthenticity {
    fn analyze(&self, graph: &EvidenceGraph, metrics: &GraphMetrics) -> AuthenticityReport {
        let circular_ratio = metrics.cyclic_edge_ratio;
        let dust_ratio = dust_ratio(graph);
        let temporal_clustering = temporal_clustering(graph);
        let round_number_bias = round_number_bias(graph);

        let mut tripped = 0;
        if circular_ratio > self.circular_threshold {
            tripped += 1;
        }
        if dust_ratio > self.dust_threshold {
            tripped += 1;
        }
        if temporal_clustering > self.clustering_threshold {
            tripped += 1;
        }
        if round_number_bias > self.round_number_threshold {
            tripped += 1;
        }

        AuthenticityReport {
            circular_ratio,
            dust_ratio,
            temporal_clustering,
            round_number_bias,
            flagged: tripped >= 2,
            confidence: tripped as f64 / 4.0,
        }
    }
}

/// Fraction of edges moving less than the dust threshold.
fn dust_ratio(graph: &EvidenceGraph) -> f64 {
    if graph.edges.is_empty() {
        return 0.0;
    }
    let dust = graph
        .edges
        .iter()
        .filter(|edge| edge.amount.to_f64() < DUST_AMOUNT_UNITS)
        .count();
    dust as f64 / graph.edge_count() as f64
}

/// Fraction of consecutive sorted-timestamp gaps at most [`CLUSTER_GAP_SECS`]
/// apart. Bursts of machine-paced transactions push this toward 1.
fn temporal_clustering(graph: &EvidenceGraph) -> f64 {
    if graph.edges.len() < 2 {
        return 0.0;
    }
    let mut timestamps: Vec<u64> = graph.edges.iter().map(|e| e.timestamp).collect();
    timestamps.sort_unstable();

    let clustered = timestamps
        .windows(2)
        .filter(|pair| pair[1] - pair[0] <= CLUSTER_GAP_SECS)
        .count();
    clustered as f64 / (timestamps.len() - 1) as f64
}

/// Fraction of amounts with at most one significant fractional digit.
/// Organic transfers carry fees and slippage; hand-picked ones are round.
fn round_number_bias(graph: &EvidenceGraph) -> f64 {
    if graph.edges.is_empty() {
        return 0.0;
    }
    let round = graph
        .edges
        .iter()
        .filter(|edge| edge.amount.fractional_digits() <= 1)
        .count();
    round as f64 / graph.edge_count() as f64
}

// ---------------------------------------------------------------------------
// Coordination
// ---------------------------------------------------------------------------

/// Outcome of the coordination analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinationReport {
    pub timing_correlation: bool,
    pub address_overlap: bool,
    pub flagged: bool,
    pub confidence: f64,
}

/// Detects multiple submitters working one pattern: correlated submission
/// timing or heavy address overlap with a recent submission.
pub trait CoordinationAnalysis: Send + Sync {
    fn analyze(
        &self,
        addresses: &BTreeSet<String>,
        recent: &[RecentSubmission],
    ) -> CoordinationReport;
}

/// Default policy: a burst of three or more recent submissions inside a
/// short span, or Jaccard address overlap above a threshold.
#[derive(Debug, Clone)]
pub struct WindowCoordination {
    pub correlation_span_secs: u64,
    pub overlap_threshold: f64,
}

impl Default for WindowCoordination {
    fn default() -> Self {
        Self {
            correlation_span_secs: CORRELATION_SPAN_SECS,
            overlap_threshold: ADDRESS_OVERLAP_THRESHOLD,
        }
    }
}

impl CoordinationAnalysis for WindowCoordination {
    fn analyze(
        &self,
        addresses: &BTreeSet<String>,
        recent: &[RecentSubmission],
    ) -> CoordinationReport {
        let timing_correlation = {
            let mut times: Vec<u64> = recent.iter().map(|r| r.observed_at).collect();
            times.sort_unstable();
            times
                .windows(3)
                .any(|run| run[2] - run[0] <= self.correlation_span_secs)
        };

        let address_overlap = recent.iter().any(|other| {
            let shared = addresses.intersection(&other.addresses).count();
            let union = addresses.union(&other.addresses).count();
            union > 0 && shared as f64 / union as f64 > self.overlap_threshold
        });

        let indicators = timing_correlation as usize + address_overlap as usize;
        CoordinationReport {
            timing_correlation,
            address_overlap,
            flagged: indicators >= 1,
            confidence: indicators as f64 / 2.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Farming
// ---------------------------------------------------------------------------

/// Outcome of the farming analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct FarmingReport {
    /// Submissions by this submitter inside the window, counting the one
    /// under analysis.
    pub recent_submission_count: usize,
    pub flagged: bool,
    pub confidence: f64,
}

/// Detects one submitter pumping out near-duplicate patterns to farm
/// rewards.
pub trait FarmingAnalysis: Send + Sync {
    fn analyze(&self, submitter: &str, recent: &[RecentSubmission]) -> FarmingReport;
}

/// Default policy: flag when the submitter's recent-window count exceeds a
/// fixed threshold.
#[derive(Debug, Clone)]
pub struct RateFarming {
    pub threshold: usize,
}

impl Default for RateFarming {
    fn default() -> Self {
        Self {
            threshold: FARMING_THRESHOLD,
        }
    }
}

impl FarmingAnalysis for RateFarming {
    fn analyze(&self, submitter: &str, recent: &[RecentSubmission]) -> FarmingReport {
        // The submission being analyzed is not yet in the window; it is
        // the +1 here, so the sixth of six rapid submissions trips a
        // threshold of five.
        let recent_submission_count = 1 + recent
            .iter()
            .filter(|r| r.submitter_id == submitter)
            .count();
        let flagged = recent_submission_count > self.threshold;
        FarmingReport {
            recent_submission_count,
            flagged,
            confidence: if flagged { 0.8 } else { 0.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snarl_core::traits::NullAddressAgeOracle;
    use snarl_core::types::{GraphEdge, GraphNode, NodeType};
    use snarl_graph::analyze;

    // -------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------

    fn edge(from: &str, to: &str, amount: &str, ts: u64) -> GraphEdge {
        GraphEdge {
            from: from.into(),
            to: to.into(),
            amount: amount.parse().unwrap(),
            tx_hash: format!("0x{from}{to}{ts}"),
            timestamp: ts,
            metadata: serde_json::Map::new(),
        }
    }

    fn graph(edges: Vec<GraphEdge>) -> EvidenceGraph {
        let mut addresses: Vec<String> = edges
            .iter()
            .flat_map(|e| [e.from.clone(), e.to.clone()])
            .collect();
        addresses.sort();
        addresses.dedup();
        EvidenceGraph {
            nodes: addresses
                .into_iter()
                .map(|address| GraphNode {
                    address,
                    node_type: NodeType::Unknown,
                })
                .collect(),
            edges,
        }
    }

    fn recent(submitter: &str, at: u64, addrs: &[&str]) -> RecentSubmission {
        RecentSubmission {
            submitter_id: submitter.into(),
            observed_at: at,
            addresses: addrs.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Oracle that reports every address as `age` seconds old.
    struct FixedAgeOracle(u64);

    impl AddressAgeOracle for FixedAgeOracle {
        fn age_secs(&self, _address: &str, _now: u64) -> Option<u64> {
            Some(self.0)
        }
    }

    // --- address age ---

    #[test]
    fn unknown_ages_never_flag() {
        let g = graph(vec![edge("a", "b", "1", 100)]);
        let report = ThresholdAddressAge::default().analyze(&g, &NullAddressAgeOracle, 1_000);
        assert_eq!(report.new_address_ratio, 0.0);
        assert!(!report.flagged);
        assert_eq!(report.confidence, 0.0);
    }

    #[test]
    fn fresh_addresses_flag() {
        let g = graph(vec![edge("a", "b", "1", 100), edge("b", "c", "1", 200)]);
        let oracle = FixedAgeOracle(24 * 3600); // one day old
        let report = ThresholdAddressAge::default().analyze(&g, &oracle, 1_000);
        assert_eq!(report.new_address_count, 3);
        assert!(report.flagged);
        assert_eq!(report.confidence, 1.0);
    }

    #[test]
    fn old_addresses_do_not_flag() {
        let g = graph(vec![edge("a", "b", "1", 100)]);
        let oracle = FixedAgeOracle(90 * 24 * 3600); // three months old
        let report = ThresholdAddressAge::default().analyze(&g, &oracle, 1_000);
        assert!(!report.flagged);
    }

    // --- authenticity sub-signals ---

    #[test]
    fn dust_ratio_counts_tiny_amounts() {
        let g = graph(vec![
            edge("a", "b", "0.0001", 100),
            edge("b", "c", "0.0005", 200),
            edge("c", "d", "50", 300),
            edge("d", "e", "75", 400),
        ]);
        assert!((dust_ratio(&g) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn temporal_clustering_detects_bursts() {
        // Three edges seconds apart, one an hour later.
        let g = graph(vec![
            edge("a", "b", "1", 1_000),
            edge("b", "c", "1", 1_010),
            edge("c", "d", "1", 1_020),
            edge("d", "e", "1", 5_000),
        ]);
        assert!((temporal_clustering(&g) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn temporal_clustering_needs_two_edges() {
        let g = graph(vec![edge("a", "b", "1", 100)]);
        assert_eq!(temporal_clustering(&g), 0.0);
    }

    #[test]
    fn round_number_bias_counts_round_amounts() {
        let g = graph(vec![
            edge("a", "b", "100", 100),
            edge("b", "c", "2.5", 200),
            edge("c", "d", "0.137954", 300),
            edge("d", "e", "19.99", 400),
        ]);
        assert!((round_number_bias(&g) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn organic_graph_is_authentic() {
        let g = graph(vec![
            edge("a", "b", "13.370021", 1_000),
            edge("b", "c", "12.991144", 5_000),
            edge("c", "d", "12.500963", 9_000),
        ]);
        let metrics = analyze(&g).unwrap();
        let report = SubSignalAuthenticity::default().analyze(&g, &metrics);
        assert!(!report.flagged);
        assert!(report.confidence < 0.5);
    }

    #[test]
    fn two_tripped_signals_flag_artificial() {
        // Round amounts in a tight burst: round-number bias and temporal
        // clustering both trip.
        let g = graph(vec![
            edge("a", "b", "100", 1_000),
            edge("b", "c", "100", 1_005),
            edge("c", "d", "100", 1_010),
            edge("d", "e", "100", 1_015),
        ]);
        let metrics = analyze(&g).unwrap();
        let report = SubSignalAuthenticity::default().analyze(&g, &metrics);
        assert!(report.temporal_clustering > 0.8);
        assert!(report.round_number_bias > 0.6);
        assert!(report.flagged);
        assert_eq!(report.confidence, 0.5);
    }

    #[test]
    fn circular_ratio_comes_from_metrics() {
        let g = graph(vec![
            edge("a", "b", "7.13", 1_000),
            edge("b", "c", "7.02", 5_000),
            edge("c", "a", "6.94", 9_000),
        ]);
        let metrics = analyze(&g).unwrap();
        let report = SubSignalAuthenticity::default().analyze(&g, &metrics);
        assert_eq!(report.circular_ratio, 1.0);
    }

    // --- coordination ---

    #[test]
    fn empty_window_is_uncoordinated() {
        let addrs: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let report = WindowCoordination::default().analyze(&addrs, &[]);
        assert!(!report.flagged);
        assert_eq!(report.confidence, 0.0);
    }

    #[test]
    fn timing_burst_flags_coordination() {
        let addrs: BTreeSet<String> = ["x"].iter().map(|s| s.to_string()).collect();
        let window = vec![
            recent("m1", 1_000, &["p"]),
            recent("m2", 1_010, &["q"]),
            recent("m3", 1_020, &["r"]),
        ];
        let report = WindowCoordination::default().analyze(&addrs, &window);
        assert!(report.timing_correlation);
        assert!(!report.address_overlap);
        assert!(report.flagged);
        assert_eq!(report.confidence, 0.5);
    }

    #[test]
    fn spread_out_window_has_no_timing_correlation() {
        let addrs: BTreeSet<String> = ["x"].iter().map(|s| s.to_string()).collect();
        let window = vec![
            recent("m1", 1_000, &["p"]),
            recent("m2", 2_000, &["q"]),
            recent("m3", 3_000, &["r"]),
        ];
        let report = WindowCoordination::default().analyze(&addrs, &window);
        assert!(!report.timing_correlation);
    }

    #[test]
    fn heavy_address_overlap_flags_coordination() {
        let addrs: BTreeSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let window = vec![recent("m2", 1_000, &["a", "b", "c", "d"])];
        let report = WindowCoordination::default().analyze(&addrs, &window);
        assert!(report.address_overlap);
        assert!(report.flagged);
    }

    #[test]
    fn half_overlap_is_not_flagged() {
        // Jaccard of {a,b} vs {b,c} is 1/3, under the 0.5 threshold.
        let addrs: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let window = vec![recent("m2", 1_000, &["b", "c"])];
        let report = WindowCoordination::default().analyze(&addrs, &window);
        assert!(!report.address_overlap);
    }

    #[test]
    fn both_indicators_give_full_confidence() {
        let addrs: BTreeSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let window = vec![
            recent("m1", 1_000, &["a", "b", "c"]),
            recent("m2", 1_005, &["p"]),
            recent("m3", 1_010, &["q"]),
        ];
        let report = WindowCoordination::default().analyze(&addrs, &window);
        assert!(report.timing_correlation);
        assert!(report.address_overlap);
        assert_eq!(report.confidence, 1.0);
    }

    // --- farming ---

    #[test]
    fn farming_counts_only_this_submitter() {
        let window = vec![
            recent("m1", 1_000, &["a"]),
            recent("m1", 1_100, &["b"]),
            recent("m2", 1_200, &["c"]),
        ];
        let report = RateFarming::default().analyze("m1", &window);
        // Two prior plus the submission under analysis.
        assert_eq!(report.recent_submission_count, 3);
        assert!(!report.flagged);
    }

    #[test]
    fn sixth_rapid_submission_flags_farming() {
        let window: Vec<RecentSubmission> = (0..5)
            .map(|i| recent("m1", 1_000 + i * 60, &["a"]))
            .collect();
        let report = RateFarming::default().analyze("m1", &window);
        assert_eq!(report.recent_submission_count, 6);
        assert!(report.flagged);
        assert_eq!(report.confidence, 0.8);
    }

    #[test]
    fn fifth_submission_is_still_allowed() {
        let window: Vec<RecentSubmission> = (0..FARMING_THRESHOLD - 1)
            .map(|i| recent("m1", 1_000 + i as u64 * 60, &["a"]))
            .collect();
        let report = RateFarming::default().analyze("m1", &window);
        assert_eq!(report.recent_submission_count, FARMING_THRESHOLD);
        assert!(!report.flagged);
    }
}
