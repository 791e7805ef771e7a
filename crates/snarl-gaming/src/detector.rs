//! Aggregation of the gaming signals into one verdict.
//!
//! The detector runs the four analyses from [`signals`](crate::signals)
//! independently, collects the flags and confidences of the ones that
//! tripped, and derives the accept/flag/reject decision. A coordination
//! flag rejects outright regardless of the aggregate probability.

use std::sync::Arc;

use tracing::warn;

use snarl_core::constants::{GAMING_REJECT_PROBABILITY, GAMING_REVIEW_PROBABILITY};
use snarl_core::traits::AddressAgeOracle;
use snarl_core::types::{Decision, GamingFlag, Submission};
use snarl_graph::GraphMetrics;

use crate::signals::{
    AddressAgeAnalysis, AuthenticityAnalysis, CoordinationAnalysis, FarmingAnalysis, RateFarming,
    RecentSubmission, SubSignalAuthenticity, ThresholdAddressAge, WindowCoordination,
};

/// Aggregate verdict over all gaming signals.
#[derive(Debug, Clone, PartialEq)]
pub struct GamingVerdict {
    /// Flags of the analyses that tripped.
    pub flags: Vec<GamingFlag>,
    /// Confidence per tripped flag, in `[0, 1]`.
    pub confidences: Vec<(GamingFlag, f64)>,
    /// Mean confidence across tripped flags; `0` when none tripped.
    pub overall_probability: f64,
    pub decision: Decision,
}

impl GamingVerdict {
    pub fn is_flagged(&self, flag: GamingFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// A verdict with no flags and an accept decision.
    pub fn clean() -> Self {
        Self {
            flags: Vec::new(),
            confidences: Vec::new(),
            overall_probability: 0.0,
            decision: Decision::Accept,
        }
    }
}

/// Runs the gaming analyses over a submission plus the recent-submission
/// window and aggregates them into a [`GamingVerdict`].
pub struct GamingDetector {
    address_age: Box<dyn AddressAgeAnalysis>,
    authenticity: Box<dyn AuthenticityAnalysis>,
    coordination: Box<dyn CoordinationAnalysis>,
    farming: Box<dyn FarmingAnalysis>,
    oracle: Arc<dyn AddressAgeOracle>,
    reject_probability: f64,
    review_probability: f64,
}

impl GamingDetector {
    /// Detector with the default signal policies.
    pub fn new(oracle: Arc<dyn AddressAgeOracle>) -> Self {
        Self::with_policies(
            oracle,
            Box::new(ThresholdAddressAge::default()),
            Box::new(SubSignalAuthenticity::default()),
            Box::new(WindowCoordination::default()),
            Box::new(RateFarming::default()),
        )
    }

    /// Detector with injected signal policies.
    pub fn with_policies(
        oracle: Arc<dyn AddressAgeOracle>,
        address_age: Box<dyn AddressAgeAnalysis>,
        authenticity: Box<dyn AuthenticityAnalysis>,
        coordination: Box<dyn CoordinationAnalysis>,
        farming: Box<dyn FarmingAnalysis>,
    ) -> Self {
        Self {
            address_age,
            authenticity,
            coordination,
            farming,
            oracle,
            reject_probability: GAMING_REJECT_PROBABILITY,
            review_probability: GAMING_REVIEW_PROBABILITY,
        }
    }

    /// Run all analyses and aggregate the verdict.
    pub fn analyze(
        &self,
        submission: &Submission,
        metrics: &GraphMetrics,
        recent: &[RecentSubmission],
        now: u64,
    ) -> GamingVerdict {
        let mut flags = Vec::new();
        let mut confidences = Vec::new();

        let age = self
            .address_age
            .analyze(&submission.graph, self.oracle.as_ref(), now);
        if age.flagged {
            flags.push(GamingFlag::SuspiciousAddressAges);
            confidences.push((GamingFlag::SuspiciousAddressAges, age.confidence));
        }

        let authenticity = self.authenticity.analyze(&submission.graph, metrics);
        if authenticity.flagged {
            flags.push(GamingFlag::ArtificialComplexity);
            confidences.push((GamingFlag::ArtificialComplexity, authenticity.confidence));
        }

        let addresses = submission
            .graph
            .unique_addresses()
            .into_iter()
            .map(str::to_string)
            .collect();
        let coordination = self.coordination.analyze(&addresses, recent);
        if coordination.flagged {
            flags.push(GamingFlag::CoordinationDetected);
            confidences.push((GamingFlag::CoordinationDetected, coordination.confidence));
        }

        let farming = self.farming.analyze(&submission.submitter_id, recent);
        if farming.flagged {
            flags.push(GamingFlag::PatternFarming);
            confidences.push((GamingFlag::PatternFarming, farming.confidence));
        }

        let overall_probability = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().map(|(_, c)| c).sum::<f64>() / confidences.len() as f64
        };

        let decision = if overall_probability > self.reject_probability || coordination.flagged {
            Decision::Reject
        } else if overall_probability > self.review_probability {
            Decision::FlagForReview
        } else {
            Decision::Accept
        };

        if decision != Decision::Accept {
            warn!(
                submitter = %submission.submitter_id,
                probability = overall_probability,
                ?flags,
                ?decision,
                "gaming analysis flagged submission"
            );
        }

        GamingVerdict {
            flags,
            confidences,
            overall_probability,
            decision,
        }
    }
}
