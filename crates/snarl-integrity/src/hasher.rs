//! Canonical pattern digests.
//!
//! Two digests are derived from every evidence graph:
//!
//! - the *exact* digest — case-normalized addresses, exact amounts, exact
//!   timestamps, edges sorted lexicographically. Invariant to address
//!   casing and input edge order, sensitive to everything else.
//! - the *canonical* digest — amounts rounded to six decimal places and
//!   edges sorted by `(timestamp, rounded amount)`. Collapses benign
//!   precision noise without forgiving reordering tricks.
//!
//! Both are pure functions: the normalized edge tuples are encoded with
//! bincode (standard config) for a deterministic byte layout, then hashed
//! with SHA-256.

use sha2::{Digest as _, Sha256};

use snarl_core::error::SnarlError;
use snarl_core::types::{Digest, EvidenceGraph};

/// Normalized edge tuple fed to the digest:
/// `(from, to, amount as decimal string, timestamp)`.
type EdgeTuple = (String, String, String, u64);

/// Domain tags keep the two digest families from ever colliding when they
/// share a keyspace.
const EXACT_TAG: &[u8] = b"snarl/exact/v1";
const CANONICAL_TAG: &[u8] = b"snarl/canonical/v1";

fn hash_tuples(tag: &[u8], tuples: &[EdgeTuple]) -> Result<Digest, SnarlError> {
    let encoded = bincode::encode_to_vec(tuples, bincode::config::standard())
        .map_err(|e| SnarlError::Encoding(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(&encoded);
    Ok(Digest(hasher.finalize().into()))
}

/// Exact digest for tier-1 duplicate detection.
pub fn exact_digest(graph: &EvidenceGraph) -> Result<Digest, SnarlError> {
    let mut tuples: Vec<EdgeTuple> = graph
        .edges
        .iter()
        .map(|edge| {
            (
                edge.from.to_lowercase(),
                edge.to.to_lowercase(),
                edge.amount.to_decimal_string(),
                edge.timestamp,
            )
        })
        .collect();
    tuples.sort();
    hash_tuples(EXACT_TAG, &tuples)
}

/// Canonical digest for near-duplicate collapsing and discovery credit.
pub fn canonical_digest(graph: &EvidenceGraph) -> Result<Digest, SnarlError> {
    let mut normalized: Vec<_> = graph
        .edges
        .iter()
        .map(|edge| {
            let rounded = edge.amount.round_micros();
            (
                edge.timestamp,
                rounded,
                edge.from.to_lowercase(),
                edge.to.to_lowercase(),
            )
        })
        .collect();
    normalized.sort();

    let tuples: Vec<EdgeTuple> = normalized
        .into_iter()
        .map(|(ts, amount, from, to)| (from, to, amount.to_decimal_string(), ts))
        .collect();
    hash_tuples(CANONICAL_TAG, &tuples)
}
