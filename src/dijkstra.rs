//! Shortest-path searches over residual arcs: binary-heap Dijkstra for
//! non-negative costs, the potential-reduced variant used by the
//! min-cost solver, and Bellman-Ford as both its initializer and its
//! fallback when reduced costs turn materially negative.

use crate::control::RunControl;
use crate::numerics::{NodeID, PARENT_SENTINEL, approx_positive};
use crate::residual_graph::ResidualGraph;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

#[derive(Debug, Default)]
pub struct DistanceResult {
    pub distances: FxHashMap<NodeID, f64>,
    pub parents: FxHashMap<NodeID, NodeID>,
    pub canceled: bool,
    /// Set when the potential variant had to rerun Bellman-Ford. The
    /// distances are then raw-cost distances, not reduced ones.
    pub used_bellman_ford: bool,
    pub negative_cycle: bool,
}

/// Min-heap entry; ties resolve on ascending node id so runs replay
/// identically.
struct HeapEntry {
    distance: f64,
    node: NodeID,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.node == other.node
    }
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reusable searcher; the heap allocation survives across runs.
#[derive(Default)]
pub struct Dijkstra {
    heap: BinaryHeap<HeapEntry>,
}

impl Dijkstra {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard relaxation over arcs with residual above epsilon.
    /// Costs must be non-negative; use the potential variant or
    /// Bellman-Ford otherwise.
    pub fn run(
        &mut self,
        graph: &ResidualGraph,
        source: NodeID,
        eps: f64,
        control: &mut RunControl,
    ) -> DistanceResult {
        self.search(graph, source, None, eps, 0., control)
    }

    /// Dijkstra over reduced costs `c(u,v) + phi(u) - phi(v)`. Tiny
    /// negative round-off clamps to zero; anything below the fallback
    /// threshold aborts the search and reruns Bellman-Ford on the raw
    /// costs, flagged in the result.
    pub fn run_with_potentials(
        &mut self,
        graph: &ResidualGraph,
        source: NodeID,
        potentials: &FxHashMap<NodeID, f64>,
        eps: f64,
        fallback_threshold: f64,
        control: &mut RunControl,
    ) -> DistanceResult {
        self.search(graph, source, Some(potentials), eps, fallback_threshold, control)
    }

    fn search(
        &mut self,
        graph: &ResidualGraph,
        source: NodeID,
        potentials: Option<&FxHashMap<NodeID, f64>>,
        eps: f64,
        fallback_threshold: f64,
        control: &mut RunControl,
    ) -> DistanceResult {
        let start = Instant::now();
        let mut result = DistanceResult::default();
        if !graph.contains_node(source) {
            return result;
        }
        let threshold = fallback_threshold.max(eps);
        let mut settled: FxHashSet<NodeID> = FxHashSet::default();
        self.heap.clear();
        self.heap.push(HeapEntry {
            distance: 0.,
            node: source,
        });
        result.distances.insert(source, 0.);
        result.parents.insert(source, PARENT_SENTINEL);

        while let Some(HeapEntry { distance, node }) = self.heap.pop() {
            if control.interrupted() {
                result.canceled = true;
                return result;
            }
            if !settled.insert(node) {
                continue;
            }
            for edge in graph.edges_from(node) {
                if !approx_positive(edge.residual, eps) {
                    continue;
                }
                let mut arc_cost = edge.cost;
                if let Some(phi) = potentials {
                    arc_cost += phi.get(&node).copied().unwrap_or(0.)
                        - phi.get(&edge.to).copied().unwrap_or(0.);
                    if arc_cost < -threshold {
                        debug!(
                            "reduced cost {arc_cost} on ({node},{}) below -{threshold}, \
                             falling back to Bellman-Ford",
                            edge.to
                        );
                        let mut fallback = bellman_ford(graph, source, eps, control);
                        fallback.used_bellman_ford = true;
                        return fallback;
                    }
                    if arc_cost < 0. {
                        arc_cost = 0.;
                    }
                }
                let next = distance + arc_cost;
                let improved = result
                    .distances
                    .get(&edge.to)
                    .is_none_or(|&known| next < known);
                if improved {
                    result.distances.insert(edge.to, next);
                    result.parents.insert(edge.to, node);
                    self.heap.push(HeapEntry {
                        distance: next,
                        node: edge.to,
                    });
                }
            }
        }
        debug!(
            "dijkstra settled {} nodes in {:?}",
            settled.len(),
            start.elapsed()
        );
        result
    }
}

/// |V|-1 relaxation rounds over arcs with residual above epsilon,
/// iterating nodes ascending and arcs in insertion order. One extra
/// round detects a negative cycle, which marks the result invalid.
pub fn bellman_ford(
    graph: &ResidualGraph,
    source: NodeID,
    eps: f64,
    control: &mut RunControl,
) -> DistanceResult {
    let start = Instant::now();
    let mut result = DistanceResult::default();
    if !graph.contains_node(source) {
        return result;
    }
    let nodes = graph.collect_sorted_nodes();
    result.distances.insert(source, 0.);
    result.parents.insert(source, PARENT_SENTINEL);

    let rounds = nodes.len().saturating_sub(1);
    for round in 0..rounds {
        let mut changed = false;
        for &node in &nodes {
            if control.interrupted() {
                result.canceled = true;
                return result;
            }
            let Some(&distance) = result.distances.get(&node) else {
                continue;
            };
            for edge in graph.edges_from(node) {
                if !approx_positive(edge.residual, eps) {
                    continue;
                }
                let next = distance + edge.cost;
                let improved = result
                    .distances
                    .get(&edge.to)
                    .is_none_or(|&known| next < known - eps);
                if improved {
                    result.distances.insert(edge.to, next);
                    result.parents.insert(edge.to, node);
                    changed = true;
                }
            }
        }
        if !changed {
            debug!("bellman-ford converged after {} rounds", round + 1);
            break;
        }
    }

    // one verification round: any further improvement means a cycle
    for &node in &nodes {
        let Some(&distance) = result.distances.get(&node) else {
            continue;
        };
        for edge in graph.edges_from(node) {
            if !approx_positive(edge.residual, eps) {
                continue;
            }
            let next = distance + edge.cost;
            if result
                .distances
                .get(&edge.to)
                .is_some_and(|&known| next < known - eps)
            {
                debug!("negative cycle through ({node},{})", edge.to);
                result.negative_cycle = true;
                return result;
            }
        }
    }
    debug!(
        "bellman-ford labeled {} nodes in {:?}",
        result.distances.len(),
        start.elapsed()
    );
    result
}
