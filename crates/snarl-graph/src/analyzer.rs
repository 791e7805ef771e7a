//! Structural metrics over an evidence graph.
//!
//! Everything here is a pure function of the submitted graph: no shared
//! state, no I/O. The expensive questions (depth, cycles) are answered on
//! the SCC condensation so cost stays O(V+E) regardless of how tangled the
//! submission is; [`check_size`] bounds V and E up front.
//!
//! Depth is the longest path through the condensation DAG, each component
//! contributing its node count. For acyclic graphs this is exactly the
//! longest simple path (in edges); inside a cycle it is an upper-bound
//! approximation, which is acceptable for a complexity heuristic.

use std::collections::BTreeMap;
use std::collections::VecDeque;

use tracing::debug;

use snarl_core::constants::{DIAMETER_SAMPLE, MAX_GRAPH_EDGES, MAX_GRAPH_NODES};
use snarl_core::error::GraphError;
use snarl_core::types::{EvidenceGraph, GraphSignature};

use crate::scc::tarjan_scc;

/// Hubs above this degree skip the quadratic neighbor scan and contribute
/// a local coefficient of zero.
const CLUSTERING_DEGREE_CAP: usize = 64;

/// Derived structural metrics of one evidence graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphMetrics {
    /// Declared node count.
    pub node_count: usize,
    pub edge_count: usize,
    /// Distinct addresses appearing as edge endpoints.
    pub unique_address_count: usize,
    /// Longest path length in edges (condensation upper bound on cycles).
    pub depth: usize,
    /// Number of strongly connected components containing a cycle.
    pub cycle_count: usize,
    /// Maximum combined in+out degree.
    pub max_degree: usize,
    /// Longest shortest path observed from sampled BFS sources.
    pub diameter: usize,
    /// Edges per declared node.
    pub branching_factor: f64,
    /// Mean local clustering coefficient over the undirected projection.
    pub clustering_coefficient: f64,
    /// `degree_distribution[d]` = addresses with combined degree `d`.
    pub degree_distribution: Vec<usize>,
    /// Fraction of edges lying inside a cyclic component.
    pub cyclic_edge_ratio: f64,
}

impl GraphMetrics {
    /// The compact signature stored in the deduplication corpus.
    pub fn signature(&self) -> GraphSignature {
        GraphSignature {
            node_count: self.node_count,
            edge_count: self.edge_count,
            max_degree: self.max_degree,
            cycle_count: self.cycle_count,
            diameter: self.diameter,
            clustering_coefficient: self.clustering_coefficient,
            degree_distribution: self.degree_distribution.clone(),
        }
    }

    /// Structural complexity in `[0, 1]`:
    /// `min(1, depth·addresses/100) + min(0.3, 0.1·cycles) + min(0.2,
    /// 0.1·branching)`, clamped.
    pub fn complexity_score(&self) -> f64 {
        let base = ((self.depth * self.unique_address_count) as f64 / 100.0).min(1.0);
        let cycle_bonus = (0.1 * self.cycle_count as f64).min(0.3);
        let branching_bonus = (0.1 * self.branching_factor).min(0.2);
        (base + cycle_bonus + branching_bonus).clamp(0.0, 1.0)
    }
}

/// Refuse graphs above the size ceiling before any traversal runs.
pub fn check_size(graph: &EvidenceGraph) -> Result<(), GraphError> {
    if graph.node_count() > MAX_GRAPH_NODES {
        return Err(GraphError::TooManyNodes {
            count: graph.node_count(),
            max: MAX_GRAPH_NODES,
        });
    }
    if graph.edge_count() > MAX_GRAPH_EDGES {
        return Err(GraphError::TooManyEdges {
            count: graph.edge_count(),
            max: MAX_GRAPH_EDGES,
        });
    }
    Ok(())
}

/// Compute all structural metrics for a graph within the size ceiling.
pub fn analyze(graph: &EvidenceGraph) -> Result<GraphMetrics, GraphError> {
    check_size(graph)?;

    // Deterministic address → index mapping over edge endpoints.
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    for edge in &graph.edges {
        let next = index.len();
        index.entry(edge.from.as_str()).or_insert(next);
        let next = index.len();
        index.entry(edge.to.as_str()).or_insert(next);
    }
    let n = index.len();

    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut degree: Vec<usize> = vec![0; n];
    for edge in &graph.edges {
        let u = index[edge.from.as_str()];
        let v = index[edge.to.as_str()];
        adj[u].push(v);
        degree[u] += 1;
        degree[v] += 1;
    }

    let max_degree = degree.iter().copied().max().unwrap_or(0);
    let mut degree_distribution = vec![0usize; max_degree + 1];
    for &d in &degree {
        degree_distribution[d] += 1;
    }

    let scc = tarjan_scc(&adj);
    let cyclic: Vec<bool> = (0..scc.components.len())
        .map(|c| scc.is_cyclic(c, &adj))
        .collect();
    let cycle_count = cyclic.iter().filter(|&&c| c).count();

    let cyclic_edges = graph
        .edges
        .iter()
        .filter(|edge| {
            let cu = scc.component_of[index[edge.from.as_str()]];
            let cv = scc.component_of[index[edge.to.as_str()]];
            cu == cv && cyclic[cu]
        })
        .count();
    let cyclic_edge_ratio = if graph.edges.is_empty() {
        0.0
    } else {
        cyclic_edges as f64 / graph.edge_count() as f64
    };

    let depth = condensation_depth(&adj, &scc);
    let diameter = approximate_diameter(&adj);
    let clustering_coefficient = clustering_coefficient(&adj, n);

    let node_count = graph.node_count();
    let branching_factor = if node_count == 0 {
        0.0
    } else {
        graph.edge_count() as f64 / node_count as f64
    };

    let metrics = GraphMetrics {
        node_count,
        edge_count: graph.edge_count(),
        unique_address_count: n,
        depth,
        cycle_count,
        max_degree,
        diameter,
        branching_factor,
        clustering_coefficient,
        degree_distribution,
        cyclic_edge_ratio,
    };

    debug!(
        nodes = metrics.node_count,
        edges = metrics.edge_count,
        depth = metrics.depth,
        cycles = metrics.cycle_count,
        "graph analyzed"
    );

    Ok(metrics)
}

/// Longest path through the SCC condensation, in edges.
///
/// Tarjan emits components in reverse topological order, so every
/// condensation edge points to a lower component index and a single
/// ascending pass computes the memoized longest paths.
fn condensation_depth(adj: &[Vec<usize>], scc: &crate::scc::SccResult) -> usize {
    let k = scc.components.len();
    if k == 0 {
        return 0;
    }

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (u, outs) in adj.iter().enumerate() {
        let cu = scc.component_of[u];
        for &v in outs {
            let cv = scc.component_of[v];
            if cu != cv {
                successors[cu].push(cv);
            }
        }
    }
    for succ in &mut successors {
        succ.sort_unstable();
        succ.dedup();
    }

    let mut longest = vec![0usize; k];
    let mut best = 0usize;
    for c in 0..k {
        let downstream = successors[c].iter().map(|&s| longest[s]).max().unwrap_or(0);
        longest[c] = scc.components[c].len() + downstream;
        best = best.max(longest[c]);
    }
    best.saturating_sub(1)
}

/// Approximate directed diameter: the longest finite shortest path found
/// by BFS from the first [`DIAMETER_SAMPLE`] nodes.
fn approximate_diameter(adj: &[Vec<usize>]) -> usize {
    let n = adj.len();
    let mut diameter = 0usize;
    let mut dist = vec![usize::MAX; n];
    let mut queue = VecDeque::new();

    for source in 0..n.min(DIAMETER_SAMPLE) {
        dist.fill(usize::MAX);
        dist[source] = 0;
        queue.clear();
        queue.push_back(source);
        while let Some(u) = queue.pop_front() {
            for &v in &adj[u] {
                if dist[v] == usize::MAX {
                    dist[v] = dist[u] + 1;
                    diameter = diameter.max(dist[v]);
                    queue.push_back(v);
                }
            }
        }
    }
    diameter
}

/// Mean local clustering coefficient over the undirected projection,
/// averaged across nodes with degree ≥ 2.
fn clustering_coefficient(adj: &[Vec<usize>], n: usize) -> f64 {
    use std::collections::BTreeSet;

    let mut undirected: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for (u, outs) in adj.iter().enumerate() {
        for &v in outs {
            if u != v {
                undirected[u].insert(v);
                undirected[v].insert(u);
            }
        }
    }

    let mut sum = 0.0;
    let mut counted = 0usize;
    for neighbors in &undirected {
        let k = neighbors.len();
        if k < 2 {
            continue;
        }
        counted += 1;
        if k > CLUSTERING_DEGREE_CAP {
            // Hub: quadratic scan skipped, coefficient treated as zero.
            continue;
        }
        let nodes: Vec<usize> = neighbors.iter().copied().collect();
        let mut links = 0usize;
        for i in 0..nodes.len() {
            for j in i + 1..nodes.len() {
                if undirected[nodes[i]].contains(&nodes[j]) {
                    links += 1;
                }
            }
        }
        sum += 2.0 * links as f64 / (k * (k - 1)) as f64;
    }

    if counted == 0 {
        0.0
    } else {
        sum / counted as f64
    }
}
