//! # snarl-graph
//! Structural analysis of evidence graphs: SCC decomposition, depth and
//! cycle metrics, signatures, and the complexity score.

pub mod analyzer;
pub mod scc;

pub use analyzer::{analyze, check_size, GraphMetrics};
