//! The classification pipeline.
//!
//! [`PatternEngine::classify`] takes one submission through validation,
//! the size ceiling, the rate-limit gate, graph analysis, the integrity
//! gate (dedup + discovery), the adversarial gate (gaming analysis),
//! on-chain verification, and scoring, producing exactly one
//! [`ClassifiedResult`]. Duplicates, gaming rejections, and rate-limit
//! rejections are classification outcomes, not errors.
//!
//! Shared state (dedup corpus, discovery registry, reputation map, rate
//! windows) lives behind entry-level critical sections; the collaborator
//! calls (`ChainVerifier`, `PatternStore`) run outside all of them, so no
//! lock is ever held across an `.await`.

use std::sync::Arc;

use tracing::{info, warn};

use snarl_core::error::{GraphError, SnarlError};
use snarl_core::traits::{AddressAgeOracle, ChainVerifier, Clock, PatternStore};
use snarl_core::types::{
    ClassifiedResult, ComponentScores, Decision, GamingFlag, PatternId, PatternType, Submission,
    VerificationStatus,
};
use snarl_gaming::{GamingDetector, RecentSubmission, SubmissionGuard, Watchlist};
use snarl_graph::analyze;
use snarl_integrity::{canonical_digest, exact_digest, DeduplicationEngine, DiscoveryRegistry};
use snarl_scoring::{
    classify_pattern, composite_score, published_score, recency_score, volume_score,
    ReputationState, ReputationTracker, ReputationUpdate,
};

use crate::config::EngineConfig;
use crate::recent::RecentWindow;

/// The adjudication engine. One instance serves all submitters.
pub struct PatternEngine {
    config: EngineConfig,
    dedup: DeduplicationEngine,
    discovery: DiscoveryRegistry,
    detector: GamingDetector,
    guard: SubmissionGuard,
    watchlist: Watchlist,
    reputation: ReputationTracker,
    recent: RecentWindow,
    verifier: Arc<dyn ChainVerifier>,
    store: Arc<dyn PatternStore>,
    clock: Arc<dyn Clock>,
}

impl PatternEngine {
    pub fn new(
        config: EngineConfig,
        verifier: Arc<dyn ChainVerifier>,
        store: Arc<dyn PatternStore>,
        oracle: Arc<dyn AddressAgeOracle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dedup = DeduplicationEngine::new(
            config.signature_candidate_threshold,
            config.duplicate_similarity_threshold,
        );
        let discovery = DiscoveryRegistry::new(config.discovery_grace_secs);
        let guard = SubmissionGuard::new(
            config.rate_limit_window_secs,
            config.rate_limit_max_submissions,
        );
        let recent = RecentWindow::new(config.recent_window_secs);
        Self {
            config,
            dedup,
            discovery,
            detector: GamingDetector::new(oracle),
            guard,
            watchlist: Watchlist::new(),
            reputation: ReputationTracker::new(),
            recent,
            verifier,
            store,
            clock,
        }
    }

    /// Classify one submission. The single public entry point.
    ///
    /// Returns `Err` only for structurally invalid or oversized input,
    /// before any shared state is touched; everything else, including
    /// duplicates and rejections, is a [`ClassifiedResult`].
    pub async fn classify(&self, submission: Submission) -> Result<ClassifiedResult, SnarlError> {
        submission.validate()?;
        self.check_size(&submission)?;

        let now = self.clock.now();
        let submitter = submission.submitter_id.clone();

        if !self.guard.allow(&submitter, now) {
            return self.reject_rate_limited(submission, now).await;
        }

        let metrics = analyze(&submission.graph)?;
        let signature = metrics.signature();

        let exact = exact_digest(&submission.graph)?;
        let canonical = canonical_digest(&submission.graph)?;
        let pattern_id = PatternId::derive(&exact, &submitter, submission.detected_at);

        // Integrity gate. Duplicates still consult the registry so the
        // grace-period credit rule applies to them.
        let dedup_outcome = self.dedup.check_and_insert(exact, pattern_id, &signature);
        let discovery = self.discovery.register(canonical, &submitter, now);

        // Adversarial gate.
        let recent = self.recent.snapshot(now);
        let verdict = self.detector.analyze(&submission, &metrics, &recent, now);

        // On-chain verification, outside all critical sections. An
        // unavailable collaborator downgrades to `Unknown`, never to
        // silently verified.
        let (verification_status, verification_confidence) =
            match self.verifier.verify_pattern(&submission).await {
                Ok(report) => {
                    let status = if report.is_valid {
                        VerificationStatus::Verified
                    } else {
                        VerificationStatus::Failed
                    };
                    (status, report.score())
                }
                Err(err) => {
                    warn!(%err, submitter = %submitter, "verification collaborator unavailable");
                    (VerificationStatus::Unknown, 0.0)
                }
            };

        let (pattern_type, classification_confidence) =
            classify_pattern(&submission.graph, &metrics);

        let newest_edge = submission
            .graph
            .newest_edge_timestamp()
            .unwrap_or(submission.detected_at);
        let total_volume = submission.graph.total_volume()?;
        let scores = ComponentScores {
            confidence: classification_confidence,
            complexity: metrics.complexity_score(),
            uniqueness: dedup_outcome.uniqueness_score(),
            volume: volume_score(total_volume.to_f64()),
            recency: recency_score(newest_edge, now),
        };

        // Score against the reputation as it stood when the submission
        // arrived; the result feeds back into the tracker afterwards.
        let multiplier = self.reputation.multiplier(&submitter);
        let final_score = published_score(composite_score(&scores), multiplier);

        let mut decision = verdict.decision;
        if decision == Decision::Reject {
            if let Some(flag) = verdict.flags.first() {
                self.watchlist.add(&submitter, &flag.to_string(), now);
            }
        } else if decision == Decision::Accept && self.watchlist.contains(&submitter) {
            // Watchlisted submitters never pass silently.
            decision = Decision::FlagForReview;
        }

        let recent_entry = RecentSubmission {
            submitter_id: submitter.clone(),
            observed_at: now,
            addresses: submission
                .graph
                .unique_addresses()
                .into_iter()
                .map(str::to_string)
                .collect(),
        };

        let result = ClassifiedResult {
            pattern_id,
            submission,
            pattern_type,
            scores,
            final_score,
            verification_status,
            verification_confidence,
            is_duplicate: dedup_outcome.is_duplicate(),
            discovery_credit: discovery.credit_multiplier,
            gaming_flags: verdict.flags.clone(),
            decision,
            classified_at: now,
        };

        self.reputation.record(
            &submitter,
            ReputationUpdate {
                verified: verification_status == VerificationStatus::Verified,
                final_score,
                complexity_score: result.scores.complexity,
                is_duplicate: result.is_duplicate,
                gaming_rejected: verdict.decision == Decision::Reject,
            },
            now,
        );
        self.recent.record(recent_entry, now);
        self.persist(&result).await;

        info!(
            pattern = %result.pattern_id,
            submitter = %result.submission.submitter_id,
            pattern_type = %result.pattern_type,
            score = result.final_score,
            duplicate = result.is_duplicate,
            credit = result.discovery_credit,
            ?decision,
            "submission classified"
        );
        Ok(result)
    }

    /// Reputation snapshot for a submitter, if one has submitted.
    pub fn reputation(&self, submitter: &str) -> Option<ReputationState> {
        self.reputation.get(submitter)
    }

    /// Whether a submitter is on the suspicion watchlist.
    pub fn is_watchlisted(&self, submitter: &str) -> bool {
        self.watchlist.contains(submitter)
    }

    /// Number of distinct patterns in the deduplication corpus.
    pub fn corpus_len(&self) -> usize {
        self.dedup.len()
    }

    /// Inject the externally derived historical-pattern ratio for a
    /// submitter.
    pub fn set_historical_ratio(&self, submitter: &str, ratio: f64) -> ReputationState {
        self.reputation
            .set_historical_ratio(submitter, ratio, self.clock.now())
    }

    /// Size ceiling per deployment config; refused graphs are never
    /// analyzed. [`analyze`] enforces the protocol-wide hard caps on top.
    fn check_size(&self, submission: &Submission) -> Result<(), GraphError> {
        let graph = &submission.graph;
        if graph.node_count() > self.config.max_graph_nodes {
            warn!(
                submitter = %submission.submitter_id,
                nodes = graph.node_count(),
                "oversized graph refused"
            );
            return Err(GraphError::TooManyNodes {
                count: graph.node_count(),
                max: self.config.max_graph_nodes,
            });
        }
        if graph.edge_count() > self.config.max_graph_edges {
            warn!(
                submitter = %submission.submitter_id,
                edges = graph.edge_count(),
                "oversized graph refused"
            );
            return Err(GraphError::TooManyEdges {
                count: graph.edge_count(),
                max: self.config.max_graph_edges,
            });
        }
        Ok(())
    }

    /// Build, persist, and return the result for a throttled submission.
    /// No analysis runs and no integrity state is touched.
    async fn reject_rate_limited(
        &self,
        submission: Submission,
        now: u64,
    ) -> Result<ClassifiedResult, SnarlError> {
        self.watchlist
            .add(&submission.submitter_id, "rate_limit_exceeded", now);
        let exact = exact_digest(&submission.graph)?;
        let pattern_id = PatternId::derive(&exact, &submission.submitter_id, submission.detected_at);

        let result = ClassifiedResult {
            pattern_id,
            submission,
            pattern_type: PatternType::Custom,
            scores: ComponentScores::default(),
            final_score: 0.0,
            verification_status: VerificationStatus::Pending,
            verification_confidence: 0.0,
            is_duplicate: false,
            discovery_credit: 0.0,
            gaming_flags: vec![GamingFlag::RateLimitExceeded],
            decision: Decision::Reject,
            classified_at: now,
        };
        self.persist(&result).await;
        Ok(result)
    }

    async fn persist(&self, result: &ClassifiedResult) {
        if let Err(err) = self.store.insert(result).await {
            warn!(%err, pattern = %result.pattern_id, "pattern store insert failed");
        }
    }
}
