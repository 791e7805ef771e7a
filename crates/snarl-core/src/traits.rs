//! Trait interfaces to the engine's external collaborators.
//!
//! These traits define the contracts at the engine boundary:
//! - [`ChainVerifier`] — on-chain verification of submitted transactions
//! - [`PatternStore`] — persistence of classified results
//! - [`AddressAgeOracle`] — address-creation-time lookups for gaming checks
//! - [`Clock`] — injectable time source so window logic is deterministic
//!   under test
//!
//! The engine never blocks inside its own critical sections on any of
//! these; collaborator calls happen outside all shared-state locks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{StoreError, VerifyError};
use crate::types::{ClassifiedResult, PatternId, Submission, VerificationReport, VerificationStatus};

/// On-chain verification of a submitted pattern.
///
/// Implementations look up each edge's transaction hash and compare the
/// recorded details against the chain. Matching is tolerant: amounts may
/// differ by up to `1e-6` units and timestamps by up to one hour (benign
/// indexing skew), anything beyond that is a mismatch.
///
/// A failed *lookup* is an error ([`VerifyError`]); a completed lookup
/// with mismatches is a valid [`VerificationReport`] with `is_valid =
/// false`.
#[async_trait]
pub trait ChainVerifier: Send + Sync {
    async fn verify_pattern(&self, submission: &Submission)
        -> Result<VerificationReport, VerifyError>;
}

/// Aggregate statistics over stored classified results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoreStats {
    pub total: usize,
    pub verified: usize,
    pub failed: usize,
    pub unknown: usize,
    pub pending: usize,
    /// Mean final score over all stored results, `0` when empty.
    pub average_score: f64,
}

/// Persistence of classified results.
///
/// The production backend is external to this repository; the contract is
/// a plain insert/query surface so an in-memory fake can stand in for
/// tests and a shared backend can be swapped in later.
#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn insert(&self, result: &ClassifiedResult) -> Result<(), StoreError>;

    async fn get(&self, id: &PatternId) -> Result<Option<ClassifiedResult>, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

/// Address-creation-time lookups for the address-age gaming analysis.
///
/// Returns the age of `address` in seconds as of `now`, or `None` when the
/// oracle has no data. Unknown ages are treated as *old* by callers so an
/// unavailable oracle can never produce a false positive.
pub trait AddressAgeOracle: Send + Sync {
    fn age_secs(&self, address: &str, now: u64) -> Option<u64>;
}

/// Oracle with no data source; every lookup returns `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAddressAgeOracle;

impl AddressAgeOracle for NullAddressAgeOracle {
    fn age_secs(&self, _address: &str, _now: u64) -> Option<u64> {
        None
    }
}

/// Injectable time source (Unix seconds).
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Manually advanced clock for deterministic tests and replay.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self(AtomicU64::new(now))
    }

    pub fn set(&self, now: u64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// In-memory [`PatternStore`] used by tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryPatternStore {
    results: RwLock<HashMap<PatternId, ClassifiedResult>>,
}

impl MemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.read().is_empty()
    }
}

#[async_trait]
impl PatternStore for MemoryPatternStore {
    async fn insert(&self, result: &ClassifiedResult) -> Result<(), StoreError> {
        self.results
            .write()
            .insert(result.pattern_id, result.clone());
        Ok(())
    }

    async fn get(&self, id: &PatternId) -> Result<Option<ClassifiedResult>, StoreError> {
        Ok(self.results.read().get(id).cloned())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let results = self.results.read();
        let mut stats = StoreStats {
            total: results.len(),
            ..StoreStats::default()
        };
        let mut score_sum = 0.0;
        for result in results.values() {
            match result.verification_status {
                VerificationStatus::Verified => stats.verified += 1,
                VerificationStatus::Failed => stats.failed += 1,
                VerificationStatus::Unknown => stats.unknown += 1,
                VerificationStatus::Pending => stats.pending += 1,
            }
            score_sum += result.final_score;
        }
        if stats.total > 0 {
            stats.average_score = score_sum / stats.total as f64;
        }
        Ok(stats)
    }
}
