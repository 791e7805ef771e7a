//! First-discovery race resolution.
//!
//! The registry maps each canonical digest to the submitter who reported it
//! first. Repeat registrations inside the grace period earn partial credit
//! (network propagation means two honest miners can find the same pattern
//! seconds apart); later ones earn nothing. Records are append-only: the
//! first write wins and is never overwritten.
//!
//! # Concurrency
//!
//! Check-then-insert for one canonical digest runs inside a single
//! `DashMap` entry critical section, so two concurrent submissions of the
//! same pattern cannot both be credited as first discoverer.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use snarl_core::constants::DISCOVERY_GRACE_SECS;
use snarl_core::types::{Digest, DiscoveryOutcome, DiscoveryRecord};

/// Registry of first discoveries keyed by canonical digest.
pub struct DiscoveryRegistry {
    records: DashMap<Digest, DiscoveryRecord>,
    grace_period_secs: u64,
}

impl DiscoveryRegistry {
    pub fn new(grace_period_secs: u64) -> Self {
        Self {
            records: DashMap::new(),
            grace_period_secs,
        }
    }

    /// Registry with the default 300-second grace period.
    pub fn with_defaults() -> Self {
        Self::new(DISCOVERY_GRACE_SECS)
    }

    /// Number of registered discoveries.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register a sighting of `canonical_digest` by `submitter` at `now` and
    /// resolve the credit it earns.
    ///
    /// The first submitter earns full credit. A *different* submitter inside
    /// the grace period earns half credit, and nothing after it. The
    /// original discoverer keeps full credit on their own resubmissions.
    pub fn register(&self, canonical_digest: Digest, submitter: &str, now: u64) -> DiscoveryOutcome {
        match self.records.entry(canonical_digest) {
            Entry::Occupied(entry) => {
                let record = entry.get();
                if record.first_submitter == submitter {
                    debug!(
                        digest = %canonical_digest,
                        submitter,
                        "discovery: resubmission by original discoverer"
                    );
                    return DiscoveryOutcome {
                        is_first: false,
                        within_grace: false,
                        first_submitter: record.first_submitter.clone(),
                        first_seen_at: record.first_seen_at,
                        credit_multiplier: 1.0,
                    };
                }

                let elapsed = now.saturating_sub(record.first_seen_at);
                let within_grace = elapsed <= self.grace_period_secs;
                let credit_multiplier = if within_grace { 0.5 } else { 0.0 };
                debug!(
                    digest = %canonical_digest,
                    submitter,
                    first = %record.first_submitter,
                    elapsed,
                    credit_multiplier,
                    "discovery: repeat sighting"
                );
                DiscoveryOutcome {
                    is_first: false,
                    within_grace,
                    first_submitter: record.first_submitter.clone(),
                    first_seen_at: record.first_seen_at,
                    credit_multiplier,
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(DiscoveryRecord {
                    canonical_digest,
                    first_submitter: submitter.to_string(),
                    first_seen_at: now,
                });
                info!(digest = %canonical_digest, submitter, "discovery: first sighting");
                DiscoveryOutcome {
                    is_first: true,
                    within_grace: false,
                    first_submitter: submitter.to_string(),
                    first_seen_at: now,
                    credit_multiplier: 1.0,
                }
            }
        }
    }

    /// Look up the discovery record for a digest, if any.
    pub fn get(&self, canonical_digest: &Digest) -> Option<DiscoveryRecord> {
        self.records.get(canonical_digest).map(|r| r.clone())
    }
}

impl Default for DiscoveryRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
