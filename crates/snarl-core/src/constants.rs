//! Engine constants. Score weights and bounds are protocol-fixed; the
//! remaining values are defaults that the engine configuration may
//! override per deployment.

/// Maximum nodes an evidence graph may contain before analysis is refused.
///
/// Enforced before any traversal runs so an adversarial submission cannot
/// buy unbounded CPU with a single oversized graph.
pub const MAX_GRAPH_NODES: usize = 10_000;

/// Maximum edges an evidence graph may contain before analysis is refused.
pub const MAX_GRAPH_EDGES: usize = 50_000;

/// Grace period after a first discovery during which an independent second
/// submitter of the same canonical digest still receives partial credit.
pub const DISCOVERY_GRACE_SECS: u64 = 300;

/// Tier-2 signature similarity above which a corpus entry becomes a
/// candidate for detailed comparison.
pub const SIGNATURE_CANDIDATE_THRESHOLD: f64 = 0.7;

/// Tier-3 detailed similarity above which a pattern is a structural
/// duplicate.
pub const DUPLICATE_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Sliding-window length for per-submitter rate limiting.
pub const RATE_LIMIT_WINDOW_SECS: u64 = 3600;

/// Maximum submissions per submitter inside one rate-limit window.
pub const RATE_LIMIT_MAX_SUBMISSIONS: usize = 10;

/// Addresses younger than this are "new" for the address-age analysis.
pub const ADDRESS_AGE_THRESHOLD_SECS: u64 = 30 * 24 * 3600;

/// New-address ratio above which the address-age analysis flags.
pub const NEW_ADDRESS_RATIO_THRESHOLD: f64 = 0.7;

/// Circular-transaction ratio sub-signal threshold.
pub const CIRCULAR_RATIO_THRESHOLD: f64 = 0.5;

/// Dust-transaction ratio sub-signal threshold.
pub const DUST_RATIO_THRESHOLD: f64 = 0.3;

/// Temporal-clustering sub-signal threshold.
pub const TEMPORAL_CLUSTERING_THRESHOLD: f64 = 0.8;

/// Round-number-bias sub-signal threshold.
pub const ROUND_NUMBER_BIAS_THRESHOLD: f64 = 0.6;

/// Edges with an amount below this many whole units are dust.
pub const DUST_AMOUNT_UNITS: f64 = 0.001;

/// Consecutive edge timestamps closer than this count as one temporal
/// cluster.
pub const CLUSTER_GAP_SECS: u64 = 60;

/// A run of three or more recent submissions inside this span indicates
/// coordinated timing.
pub const CORRELATION_SPAN_SECS: u64 = 30;

/// Jaccard address overlap with a recent submission above which
/// coordination is flagged.
pub const ADDRESS_OVERLAP_THRESHOLD: f64 = 0.5;

/// Recent submissions per submitter per window above which farming is
/// flagged.
pub const FARMING_THRESHOLD: usize = 5;

/// How long submissions stay in the cross-submitter recent window.
pub const RECENT_WINDOW_SECS: u64 = 3600;

/// Gaming probability above which a submission is rejected outright.
pub const GAMING_REJECT_PROBABILITY: f64 = 0.8;

/// Gaming probability above which a submission is flagged for review.
pub const GAMING_REVIEW_PROBABILITY: f64 = 0.5;

/// Sources sampled for the approximate-diameter BFS.
pub const DIAMETER_SAMPLE: usize = 32;

// ---------------------------------------------------------------------------
// Scoring (protocol-fixed)
// ---------------------------------------------------------------------------

/// Weight of the classification confidence in the composite score.
pub const WEIGHT_CLASSIFICATION: f64 = 0.25;
/// Weight of structural complexity in the composite score.
pub const WEIGHT_COMPLEXITY: f64 = 0.30;
/// Weight of recency in the composite score.
pub const WEIGHT_RECENCY: f64 = 0.20;
/// Weight of volume significance in the composite score.
pub const WEIGHT_VOLUME: f64 = 0.15;
/// Weight of uniqueness in the composite score.
pub const WEIGHT_UNIQUENESS: f64 = 0.10;

/// Horizon over which the recency score decays linearly to zero.
pub const RECENCY_HORIZON_SECS: u64 = 30 * 24 * 3600;

/// Whole-unit volume at which the volume-significance score saturates.
pub const VOLUME_REFERENCE_UNITS: f64 = 1_000_000.0;

/// Smoothing factor for the reputation exponential moving averages.
pub const EMA_ALPHA: f64 = 0.1;

/// Lower bound of the reputation multiplier.
pub const MULTIPLIER_MIN: f64 = 0.1;
/// Upper bound of the reputation multiplier.
pub const MULTIPLIER_MAX: f64 = 2.0;

/// Gaming penalty added to a submitter's reputation per rejected verdict.
pub const GAMING_PENALTY_STEP: f64 = 0.1;

/// Neutral default for the externally supplied historical-pattern ratio.
pub const HISTORICAL_RATIO_DEFAULT: f64 = 0.5;
