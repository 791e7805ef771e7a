//! Protocol types: evidence graphs, submissions, and classified results.
//!
//! Submitters ("miners") report suspicious activity as small transaction
//! graphs. The engine derives everything else — digests, signatures,
//! scores — and hands a [`ClassifiedResult`] to the storage collaborator.
//! All timestamps are Unix seconds.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::{AmountError, ValidationError};

/// A 32-byte digest value.
///
/// Used for exact and canonical pattern digests (SHA-256).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// The zero digest (32 zero bytes).
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse from a 64-character lowercase or uppercase hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Stable identifier of a classified pattern.
///
/// Derived from the exact digest plus submission identity, so the same
/// graph submitted by two miners yields two distinct pattern ids while the
/// digest still collapses them for deduplication.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct PatternId(pub [u8; 32]);

impl PatternId {
    /// Derive the id as `blake3(exact_digest ‖ submitter ‖ detected_at)`.
    pub fn derive(exact_digest: &Digest, submitter: &str, detected_at: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(exact_digest.as_bytes());
        hasher.update(submitter.as_bytes());
        hasher.update(&detected_at.to_le_bytes());
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Role of an address in the evidence graph.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Externally owned account.
    Eoa,
    /// Smart contract.
    Contract,
    /// Known exchange address.
    Exchange,
    /// Known mixing or tumbling service.
    Mixer,
    #[default]
    Unknown,
}

/// A blockchain address participating in the pattern.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GraphNode {
    pub address: String,
    #[serde(default)]
    pub node_type: NodeType,
}

/// A transaction between two addresses.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub amount: Amount,
    /// On-chain transaction hash used by the verification collaborator.
    pub tx_hash: String,
    /// Unix timestamp of the transaction.
    pub timestamp: u64,
    /// Free-form per-transaction annotations (gas fees, block number, …).
    /// Unknown or ill-typed fields are ignored, never fatal.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// The evidence graph of a suspected pattern. Immutable once submitted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct EvidenceGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl EvidenceGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All distinct addresses appearing as an edge endpoint.
    pub fn unique_addresses(&self) -> BTreeSet<&str> {
        let mut addresses = BTreeSet::new();
        for edge in &self.edges {
            addresses.insert(edge.from.as_str());
            addresses.insert(edge.to.as_str());
        }
        addresses
    }

    /// Total transferred volume across all edges.
    pub fn total_volume(&self) -> Result<Amount, AmountError> {
        self.edges
            .iter()
            .try_fold(Amount::ZERO, |acc, edge| {
                acc.checked_add(edge.amount).ok_or(AmountError::Overflow)
            })
    }

    /// Timestamp of the most recent edge, or `None` for an empty graph.
    pub fn newest_edge_timestamp(&self) -> Option<u64> {
        self.edges.iter().map(|e| e.timestamp).max()
    }

    /// Structural invariant: at least one node and one edge.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.nodes.is_empty() {
            return Err(ValidationError::EmptyNodes);
        }
        if self.edges.is_empty() {
            return Err(ValidationError::EmptyEdges);
        }
        Ok(())
    }
}

/// The unit of work entering the engine.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Submission {
    pub graph: EvidenceGraph,
    pub blockchain: String,
    pub asset_symbol: String,
    pub submitter_id: String,
    /// When the submitter claims to have detected the pattern.
    pub detected_at: u64,
}

impl Submission {
    /// Reject structurally invalid submissions before any state is touched.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.graph.validate()?;
        if self.blockchain.trim().is_empty() {
            return Err(ValidationError::MissingBlockchain);
        }
        if self.asset_symbol.trim().is_empty() {
            return Err(ValidationError::MissingAsset);
        }
        if self.submitter_id.trim().is_empty() {
            return Err(ValidationError::MissingSubmitter);
        }
        Ok(())
    }
}

/// Compact structural summary of a graph used for cheap similarity
/// pre-filtering before detailed comparison.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GraphSignature {
    pub node_count: usize,
    pub edge_count: usize,
    /// Maximum combined in+out degree over all addresses.
    pub max_degree: usize,
    /// Number of strongly connected components containing a cycle.
    pub cycle_count: usize,
    /// Approximate directed diameter (longest observed shortest path).
    pub diameter: usize,
    /// Mean local clustering coefficient of the undirected projection.
    pub clustering_coefficient: f64,
    /// Histogram: `degree_distribution[d]` = addresses with degree `d`.
    pub degree_distribution: Vec<usize>,
}

/// Normalized absolute difference, `0` when both values are zero.
fn norm_diff(a: usize, b: usize) -> f64 {
    let max = a.max(b);
    if max == 0 {
        0.0
    } else {
        a.abs_diff(b) as f64 / max as f64
    }
}

impl GraphSignature {
    /// Coarse similarity in `[0, 1]` from normalized count differences.
    ///
    /// Symmetric: `a.similarity_score(&b) == b.similarity_score(&a)`.
    pub fn similarity_score(&self, other: &Self) -> f64 {
        let node_diff = norm_diff(self.node_count, other.node_count);
        let edge_diff = norm_diff(self.edge_count, other.edge_count);
        let degree_diff = norm_diff(self.max_degree, other.max_degree);
        (1.0 - (node_diff + edge_diff + degree_diff) / 3.0).max(0.0)
    }
}

/// First-discovery record for one canonical digest. Append-only: the first
/// write wins and is never overwritten.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DiscoveryRecord {
    pub canonical_digest: Digest,
    pub first_submitter: String,
    pub first_seen_at: u64,
}

/// Credit resolution for one discovery registration.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoveryOutcome {
    pub is_first: bool,
    pub within_grace: bool,
    pub first_submitter: String,
    pub first_seen_at: u64,
    /// `1.0` first discovery, `0.5` within the grace period, `0.0` late.
    pub credit_multiplier: f64,
}

/// Result of on-chain verification by the external collaborator.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct VerificationReport {
    pub is_valid: bool,
    pub transactions_verified: usize,
    pub total_transactions: usize,
    /// Collaborator's own confidence in `[0, 1]`.
    pub confidence: f64,
    pub errors: Vec<String>,
}

impl VerificationReport {
    /// Overall verification score: fraction verified weighted by the
    /// collaborator confidence; `0` for invalid or empty reports.
    pub fn score(&self) -> f64 {
        if !self.is_valid || self.total_transactions == 0 {
            return 0.0;
        }
        self.transactions_verified as f64 / self.total_transactions as f64 * self.confidence
    }
}

/// Outcome of on-chain verification as recorded on the classified result.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Failed,
    /// The collaborator was unavailable; the pattern is scored but never
    /// treated as verified.
    Unknown,
}

/// Categories of malicious transaction patterns.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Breaking large transfers into many small ones.
    Smurfing,
    /// Long chains built to obscure the origin of funds.
    Layering,
    /// Funds moving in loops.
    CircularTransfer,
    /// Reciprocal transfers creating artificial volume.
    WashTrading,
    /// Flows through known mixing services.
    MixerTumbler,
    /// A single dominant transfer out of proportion with the rest.
    SuspiciousVolume,
    /// High-frequency bursts of micro-transactions.
    RapidFire,
    /// Novel shape matching no known category.
    Custom,
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Smurfing => "smurfing",
            Self::Layering => "layering",
            Self::CircularTransfer => "circular_transfer",
            Self::WashTrading => "wash_trading",
            Self::MixerTumbler => "mixer_tumbler",
            Self::SuspiciousVolume => "suspicious_volume",
            Self::RapidFire => "rapid_fire",
            Self::Custom => "custom",
        };
        f.write_str(s)
    }
}

/// Heuristic gaming indicators attached to a classified result.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GamingFlag {
    SuspiciousAddressAges,
    ArtificialComplexity,
    CoordinationDetected,
    PatternFarming,
    RateLimitExceeded,
}

impl fmt::Display for GamingFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SuspiciousAddressAges => "suspicious_address_ages",
            Self::ArtificialComplexity => "artificial_complexity",
            Self::CoordinationDetected => "coordination_detected",
            Self::PatternFarming => "pattern_farming",
            Self::RateLimitExceeded => "rate_limit_exceeded",
        };
        f.write_str(s)
    }
}

/// Final disposition of a submission.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    #[default]
    Accept,
    FlagForReview,
    Reject,
}

/// The five component scores feeding the composite.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct ComponentScores {
    pub confidence: f64,
    pub complexity: f64,
    pub uniqueness: f64,
    pub volume: f64,
    pub recency: f64,
}

/// The single output of the engine: one per submission, immutable, handed
/// to the storage collaborator.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClassifiedResult {
    pub pattern_id: PatternId,
    pub submission: Submission,
    pub pattern_type: PatternType,
    pub scores: ComponentScores,
    /// Composite score in `[0, 1]` after the reputation multiplier.
    pub final_score: f64,
    pub verification_status: VerificationStatus,
    pub verification_confidence: f64,
    pub is_duplicate: bool,
    /// Discovery credit in `[0, 1]` from the first-discovery rule.
    pub discovery_credit: f64,
    pub gaming_flags: Vec<GamingFlag>,
    pub decision: Decision,
    pub classified_at: u64,
}
