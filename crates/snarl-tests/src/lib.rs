//! Integration test suite for the Snarl engine.
//!
//! This crate contains the end-to-end, adversarial, and concurrency tests
//! plus the shared fixtures they run on. The in-memory
//! [`LedgerVerifier`](helpers::LedgerVerifier) stands in for the on-chain
//! verification collaborator with the production tolerance rules.

pub mod helpers;
