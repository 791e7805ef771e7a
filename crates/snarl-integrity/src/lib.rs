//! # snarl-integrity
//! Pattern integrity gate: canonical digests, tiered duplicate detection,
//! and first-discovery race resolution.

pub mod dedup;
pub mod discovery;
pub mod hasher;

pub use dedup::{DedupOutcome, DeduplicationEngine};
pub use discovery::DiscoveryRegistry;
pub use hasher::{canonical_digest, exact_digest};
