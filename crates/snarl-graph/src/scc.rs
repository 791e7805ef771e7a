//! Strongly connected components via iterative Tarjan.
//!
//! A cycle exists iff some SCC has two or more nodes, or a single node
//! carries a self-loop. That makes cycle detection and counting O(V+E),
//! replacing per-node DFS replays that go exponential on branching graphs.
//!
//! The traversal uses an explicit frame stack — adversarial submissions
//! must not be able to overflow the call stack with a deep chain.

/// SCC decomposition of a directed graph given as adjacency lists.
#[derive(Debug, Clone)]
pub struct SccResult {
    /// Component index per node.
    pub component_of: Vec<usize>,
    /// Node lists per component, in reverse topological order of the
    /// condensation (components with no outgoing condensation edges come
    /// first).
    pub components: Vec<Vec<usize>>,
}

impl SccResult {
    /// Whether the component contains a cycle: more than one node, or a
    /// single node with a self-loop.
    pub fn is_cyclic(&self, component: usize, adj: &[Vec<usize>]) -> bool {
        let nodes = &self.components[component];
        if nodes.len() > 1 {
            return true;
        }
        let v = nodes[0];
        adj[v].contains(&v)
    }

    /// Number of components containing a cycle.
    pub fn cyclic_component_count(&self, adj: &[Vec<usize>]) -> usize {
        (0..self.components.len())
            .filter(|&c| self.is_cyclic(c, adj))
            .count()
    }
}

const UNVISITED: usize = usize::MAX;

/// Tarjan's algorithm, iterative formulation.
pub fn tarjan_scc(adj: &[Vec<usize>]) -> SccResult {
    let n = adj.len();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut component_of = vec![UNVISITED; n];
    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut next_index = 0usize;

    // Explicit DFS frames: (node, next unexplored child position).
    let mut frames: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        frames.push((root, 0));

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            if frame.1 < adj[v].len() {
                let w = adj[v][frame.1];
                frame.1 += 1;
                if index[w] == UNVISITED {
                    index[w] = next_index;
                    lowlink[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    frames.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
            } else {
                frames.pop();
                if let Some(parent) = frames.last() {
                    let p = parent.0;
                    lowlink[p] = lowlink[p].min(lowlink[v]);
                }
                if lowlink[v] == index[v] {
                    // v is the root of a component; pop the stack down to it.
                    let mut component = Vec::new();
                    while let Some(w) = stack.pop() {
                        on_stack[w] = false;
                        component_of[w] = components.len();
                        component.push(w);
                        if w == v {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
    }

    SccResult {
        component_of,
        components,
    }
}
