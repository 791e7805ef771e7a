//! Error types for the Snarl engine.
//!
//! Duplicate detection and gaming rejection are classification *outcomes*
//! carried inside [`ClassifiedResult`](crate::types::ClassifiedResult),
//! not errors — every structurally valid submission yields exactly one
//! result.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("graph has no nodes")] EmptyNodes,
    #[error("graph has no edges")] EmptyEdges,
    #[error("blockchain not specified")] MissingBlockchain,
    #[error("asset symbol not specified")] MissingAsset,
    #[error("submitter not specified")] MissingSubmitter,
}

/// Graphs that exceed the size ceiling are refused before any traversal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("too many nodes: {count} > {max}")] TooManyNodes { count: usize, max: usize },
    #[error("too many edges: {count} > {max}")] TooManyEdges { count: usize, max: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("malformed amount: {0:?}")] Malformed(String),
    #[error("too many fractional digits: {got} > {max}")] TooManyDecimals { got: usize, max: usize },
    #[error("amount overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("verifier unavailable: {0}")] Unavailable(String),
    #[error("verification timed out")] Timeout,
    #[error("blockchain not supported: {0}")] UnsupportedChain(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")] Unavailable(String),
    #[error("serialization: {0}")] Serialization(String),
}

#[derive(Error, Debug)]
pub enum SnarlError {
    #[error(transparent)] Validation(#[from] ValidationError),
    #[error(transparent)] Graph(#[from] GraphError),
    #[error(transparent)] Amount(#[from] AmountError),
    #[error(transparent)] Verify(#[from] VerifyError),
    #[error(transparent)] Store(#[from] StoreError),
    #[error("encoding: {0}")] Encoding(String),
}
