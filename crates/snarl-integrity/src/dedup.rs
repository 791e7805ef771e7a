//! Tiered duplicate detection over a corpus of previously seen patterns.
//!
//! Tier 1 is an O(1) exact-digest lookup. Tier 2 scans stored structural
//! signatures for coarse candidates. Tier 3 runs a detailed signature
//! comparison on each candidate. The corpus stores signatures, not graphs,
//! so memory per entry is bounded.
//!
//! # Concurrency
//!
//! Check-then-insert for one exact digest is a single `DashMap` entry
//! critical section: two concurrent identical submissions cannot both
//! classify as novel. While the entry is held, only the signature map is
//! ever locked (exact → signatures, never the reverse), so the lock order
//! is acyclic.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use snarl_core::constants::{DUPLICATE_SIMILARITY_THRESHOLD, SIGNATURE_CANDIDATE_THRESHOLD};
use snarl_core::types::{Digest, GraphSignature, PatternId};

/// Outcome of a duplicate check.
#[derive(Debug, Clone, PartialEq)]
pub enum DedupOutcome {
    /// Not seen before; the pattern was added to the corpus.
    Novel,
    /// Byte-identical (after normalization) to a stored pattern.
    ExactDuplicate { original: PatternId },
    /// Structurally indistinguishable from a stored pattern.
    StructuralDuplicate { original: PatternId, similarity: f64 },
}

impl DedupOutcome {
    pub fn is_duplicate(&self) -> bool {
        !matches!(self, Self::Novel)
    }

    /// Uniqueness component score: `1` novel, `1 − similarity` for a
    /// structural near-miss, `0` for an exact duplicate.
    pub fn uniqueness_score(&self) -> f64 {
        match self {
            Self::Novel => 1.0,
            Self::ExactDuplicate { .. } => 0.0,
            Self::StructuralDuplicate { similarity, .. } => (1.0 - similarity).max(0.0),
        }
    }
}

/// Corpus of seen patterns with tiered duplicate lookup.
pub struct DeduplicationEngine {
    /// Tier 1: exact digest → pattern that first produced it.
    exact: DashMap<Digest, PatternId>,
    /// Tiers 2–3: pattern → structural signature.
    signatures: DashMap<PatternId, GraphSignature>,
    candidate_threshold: f64,
    duplicate_threshold: f64,
}

impl DeduplicationEngine {
    pub fn new(candidate_threshold: f64, duplicate_threshold: f64) -> Self {
        Self {
            exact: DashMap::new(),
            signatures: DashMap::new(),
            candidate_threshold,
            duplicate_threshold,
        }
    }

    /// Engine with the default 0.7 candidate / 0.85 duplicate thresholds.
    pub fn with_defaults() -> Self {
        Self::new(SIGNATURE_CANDIDATE_THRESHOLD, DUPLICATE_SIMILARITY_THRESHOLD)
    }

    /// Number of stored corpus entries.
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    /// Check a pattern against the corpus; insert it when novel.
    ///
    /// Duplicates are not inserted — the corpus keeps the first sighting
    /// only.
    pub fn check_and_insert(
        &self,
        exact_digest: Digest,
        pattern_id: PatternId,
        signature: &GraphSignature,
    ) -> DedupOutcome {
        match self.exact.entry(exact_digest) {
            Entry::Occupied(entry) => {
                let original = *entry.get();
                debug!(digest = %exact_digest, %original, "dedup: exact duplicate");
                DedupOutcome::ExactDuplicate { original }
            }
            Entry::Vacant(slot) => {
                if let Some((original, similarity)) = self.best_structural_match(signature) {
                    debug!(
                        %original,
                        similarity,
                        "dedup: structural duplicate"
                    );
                    return DedupOutcome::StructuralDuplicate {
                        original,
                        similarity,
                    };
                }
                slot.insert(pattern_id);
                self.signatures.insert(pattern_id, signature.clone());
                DedupOutcome::Novel
            }
        }
    }

    /// Tiers 2–3: coarse candidate scan, then detailed comparison.
    fn best_structural_match(&self, signature: &GraphSignature) -> Option<(PatternId, f64)> {
        let mut best: Option<(PatternId, f64)> = None;
        for item in self.signatures.iter() {
            let coarse = signature.similarity_score(item.value());
            if coarse <= self.candidate_threshold {
                continue;
            }
            let detailed = detailed_similarity(signature, item.value());
            if detailed > self.duplicate_threshold
                && best.map(|(_, s)| detailed > s).unwrap_or(true)
            {
                best = Some((*item.key(), detailed));
            }
        }
        best
    }
}

fn relative_similarity(a: usize, b: usize) -> f64 {
    let max = a.max(b);
    if max == 0 {
        1.0
    } else {
        1.0 - a.abs_diff(b) as f64 / max as f64
    }
}

/// Histogram intersection of two degree distributions, normalized by the
/// larger total mass.
fn histogram_overlap(a: &[usize], b: &[usize]) -> f64 {
    let total_a: usize = a.iter().sum();
    let total_b: usize = b.iter().sum();
    let max_total = total_a.max(total_b);
    if max_total == 0 {
        return 1.0;
    }
    let shared: usize = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| x.min(y))
        .sum();
    shared as f64 / max_total as f64
}

/// Tier-3 detailed structural comparison of two signatures.
///
/// Extends the coarse count similarity with cycle count, diameter,
/// clustering, and degree-histogram overlap. Identical signatures score
/// exactly `1.0`; symmetric in its arguments.
pub fn detailed_similarity(a: &GraphSignature, b: &GraphSignature) -> f64 {
    let counts = a.similarity_score(b);
    let cycles = relative_similarity(a.cycle_count, b.cycle_count);
    let diameter = relative_similarity(a.diameter, b.diameter);
    let clustering = 1.0 - (a.clustering_coefficient - b.clustering_coefficient).abs().min(1.0);
    let histogram = histogram_overlap(&a.degree_distribution, &b.degree_distribution);

    0.40 * counts + 0.15 * cycles + 0.15 * diameter + 0.10 * clustering + 0.20 * histogram
}
