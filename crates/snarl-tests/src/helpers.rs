//! Shared test helpers for the E2E and integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use snarl_core::error::VerifyError;
use snarl_core::traits::{ChainVerifier, Clock, ManualClock, MemoryPatternStore, NullAddressAgeOracle, PatternStore};
use snarl_core::types::{
    EvidenceGraph, GraphEdge, GraphNode, NodeType, Submission, VerificationReport,
};
use snarl_engine::{EngineConfig, PatternEngine};

/// Fixed submission-time origin for deterministic clocks.
pub const T0: u64 = 1_700_000_000;

/// Build an edge with empty metadata.
pub fn edge(from: &str, to: &str, amount: &str, ts: u64) -> GraphEdge {
    GraphEdge {
        from: from.into(),
        to: to.into(),
        amount: amount.parse().unwrap(),
        tx_hash: format!("0x{from}-{to}-{ts}"),
        timestamp: ts,
        metadata: serde_json::Map::new(),
    }
}

/// Build a graph whose node list is derived from the edge endpoints.
pub fn graph_from_edges(edges: Vec<GraphEdge>) -> EvidenceGraph {
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

/// Wrap a graph in a submission.
pub fn submission(submitter: &str, graph: EvidenceGraph, detected_at: u64) -> Submission {
    Submission {
        graph,
        blockchain: "ethereum".into(),
        asset_symbol: "ETH".into(),
        submitter_id: submitter.into(),
        detected_at,
    }
}

/// A minimal three-edge cycle: `A → B → C → A`.
pub fn cycle_submission(submitter: &str, detected_at: u64) -> Submission {
    let graph = graph_from_edges(vec![
        edge("0xAlpha", "0xBravo", "100.5", detected_at - 9_000),
        edge("0xBravo", "0xCharlie", "99.25", detected_at - 5_000),
        edge("0xCharlie", "0xAlpha", "98.75", detected_at - 1_000),
    ]);
    submission(submitter, graph, detected_at)
}

/// A layering-shaped chain with organic amounts and spread-out timing.
pub fn chain_submission(submitter: &str, detected_at: u64, salt: u64) -> Submission {
    let a = format!("0xa{salt}");
    let b = format!("0xb{salt}");
    let c = format!("0xc{salt}");
    let d = format!("0xd{salt}");
    let graph = graph_from_edges(vec![
        edge(&a, &b, "120.370021", detected_at - 9_000),
        edge(&b, &c, "119.911387", detected_at - 5_000),
        edge(&c, &d, "119.420554", detected_at - 1_000),
    ]);
    submission(submitter, graph, detected_at)
}

// ---------------------------------------------------------------------------
// LedgerVerifier
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct LedgerTx {
    from: String,
    to: String,
    amount: snarl_core::amount::Amount,
    timestamp: u64,
}

/// Amount mismatch tolerance: `1e-6` whole units, in raw mantissa steps.
const AMOUNT_TOLERANCE_RAW: u128 = snarl_core::amount::AMOUNT_PRECISION / 1_000_000;

/// Timestamp mismatch tolerance: benign indexing skew up to one hour.
const TIMESTAMP_TOLERANCE_SECS: u64 = 3_600;

/// In-memory stand-in for the on-chain verification collaborator.
///
/// Holds a seeded ledger of transactions keyed by hash. Verification
/// compares each submitted edge against the ledger with the production
/// tolerance rules: amounts may differ by up to `1e-6` units and
/// timestamps by up to an hour; endpoint addresses match case-insensitively.
pub struct LedgerVerifier {
    ledger: RwLock<HashMap<String, LedgerTx>>,
    available: AtomicBool,
}

impl LedgerVerifier {
    pub fn new() -> Self {
        Self {
            ledger: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Seed the ledger with every edge of a graph as on-chain truth.
    pub fn seed_graph(&self, graph: &EvidenceGraph) {
        let mut ledger = self.ledger.write();
        for e in &graph.edges {
            ledger.insert(
                e.tx_hash.to_lowercase(),
                LedgerTx {
                    from: e.from.to_lowercase(),
                    to: e.to.to_lowercase(),
                    amount: e.amount,
                    timestamp: e.timestamp,
                },
            );
        }
    }

    /// Simulate the collaborator going down (or back up).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Default for LedgerVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainVerifier for LedgerVerifier {
    async fn verify_pattern(
        &self,
        submission: &Submission,
    ) -> Result<VerificationReport, VerifyError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(VerifyError::Unavailable("ledger offline".into()));
        }

        let ledger = self.ledger.read();
        let total_transactions = submission.graph.edge_count();
        let mut transactions_verified = 0;
        let mut errors = Vec::new();

        for e in &submission.graph.edges {
            let Some(tx) = ledger.get(&e.tx_hash.to_lowercase()) else {
                errors.push(format!("transaction not found: {}", e.tx_hash));
                continue;
            };
            if tx.from != e.from.to_lowercase() || tx.to != e.to.to_lowercase() {
                errors.push(format!("endpoint mismatch: {}", e.tx_hash));
                continue;
            }
            if tx.amount.raw().abs_diff(e.amount.raw()) > AMOUNT_TOLERANCE_RAW {
                errors.push(format!("amount mismatch: {}", e.tx_hash));
                continue;
            }
            if tx.timestamp.abs_diff(e.timestamp) > TIMESTAMP_TOLERANCE_SECS {
                errors.push(format!("timestamp mismatch: {}", e.tx_hash));
                continue;
            }
            transactions_verified += 1;
        }

        Ok(VerificationReport {
            is_valid: transactions_verified == total_transactions && total_transactions > 0,
            transactions_verified,
            total_transactions,
            confidence: 0.95,
            errors,
        })
    }
}

// ---------------------------------------------------------------------------
// Engine harness
// ---------------------------------------------------------------------------

/// A fully wired engine over in-memory collaborators and a manual clock.
pub struct TestEngine {
    pub engine: PatternEngine,
    pub verifier: Arc<LedgerVerifier>,
    pub store: Arc<MemoryPatternStore>,
    pub clock: Arc<ManualClock>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let verifier = Arc::new(LedgerVerifier::new());
        let store = Arc::new(MemoryPatternStore::new());
        let clock = Arc::new(ManualClock::new(T0));
        let engine = PatternEngine::new(
            config,
            Arc::clone(&verifier) as Arc<dyn ChainVerifier>,
            Arc::clone(&store) as Arc<dyn PatternStore>,
            Arc::new(NullAddressAgeOracle),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        Self {
            engine,
            verifier,
            store,
            clock,
        }
    }

    /// Seed the ledger so a submission verifies cleanly.
    pub fn seed(&self, submission: &Submission) {
        self.verifier.seed_graph(&submission.graph);
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}
