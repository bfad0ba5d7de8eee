//! Minimum-cost flow. The primary solver is Successive Shortest Paths
//! with node potentials: Bellman-Ford seeds the potentials (arbitrary
//! arc costs, negative included), then every round runs Dijkstra over
//! reduced costs and augments along the cheapest s-t path. A
//! cycle-cancelling solver is kept as the cross-check variant: max
//! flow first, then cancel negative-cost residual cycles until none
//! remain.

use crate::dijkstra::{Dijkstra, bellman_ford};
use crate::dinic::Dinic;
use crate::max_flow::{FlowResult, MaxFlow, SolveStatus, SolverOptions};
use crate::numerics::{NodeID, approx_positive};
use crate::path;
use crate::residual_graph::ResidualGraph;
use log::debug;
use rustc_hash::FxHashMap;
use std::time::Instant;

#[derive(Default)]
pub struct SuccessiveShortestPaths {
    dijkstra: Dijkstra,
}

impl SuccessiveShortestPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes up to `demand` units (all that fit when `None`) at
    /// minimum cost. `Feasible` marks a demand that could only be met
    /// partially; the partial flow is still cost-optimal for its
    /// amount.
    pub fn min_cost_flow(
        &mut self,
        graph: &mut ResidualGraph,
        source: NodeID,
        sink: NodeID,
        demand: Option<f64>,
        options: &SolverOptions,
    ) -> FlowResult {
        let start = Instant::now();
        let eps = options.epsilon();
        let max_iterations = options.max_iterations();
        let mut control = options.control();
        let mut result = FlowResult::new();

        if !graph.contains_node(source) || !graph.contains_node(sink) {
            return result;
        }

        let seed = bellman_ford(graph, source, eps, &mut control);
        if seed.canceled {
            result.status = SolveStatus::Canceled;
            return result;
        }
        if seed.negative_cycle {
            result.status = SolveStatus::NegativeCycle;
            return result;
        }
        let mut potentials: FxHashMap<NodeID, f64> = seed.distances;

        loop {
            if control.interrupted() {
                result.status = SolveStatus::Canceled;
                break;
            }
            if result.iterations >= max_iterations {
                result.status = SolveStatus::IterationLimit;
                break;
            }
            if let Some(required) = demand
                && result.flow >= required - eps
            {
                break;
            }

            let search = self.dijkstra.run_with_potentials(
                graph,
                source,
                &potentials,
                eps,
                options.fallback_threshold(),
                &mut control,
            );
            if search.canceled {
                result.status = SolveStatus::Canceled;
                break;
            }
            if search.negative_cycle {
                result.status = SolveStatus::NegativeCycle;
                break;
            }
            if search.used_bellman_ford {
                result.used_bellman_ford = true;
            }
            if !search.parents.contains_key(&sink) {
                break;
            }

            let augmenting = path::reconstruct(&search.parents, source, sink);
            let mut bottleneck = path::find_min_capacity(graph, &augmenting);
            if let Some(required) = demand {
                bottleneck = bottleneck.min(required - result.flow);
            }
            if !approx_positive(bottleneck, eps) {
                break;
            }
            path::augment(graph, &augmenting, bottleneck);
            result.flow += bottleneck;
            result.iterations += 1;

            // keep reduced costs non-negative for the next round
            if search.used_bellman_ford {
                potentials = search.distances;
            } else {
                for (node, distance) in &search.distances {
                    *potentials.entry(*node).or_insert(0.) += distance;
                }
            }
        }

        if result.status == SolveStatus::Optimal
            && demand.is_some_and(|required| result.flow < required - eps)
        {
            result.status = SolveStatus::Feasible;
        }
        result.cost = graph.total_cost();
        debug_assert!(graph.check_invariants(eps));
        debug!(
            "ssp routed {} at cost {} in {} augmentations, {:?}",
            result.flow,
            result.cost,
            result.iterations,
            start.elapsed()
        );
        result
    }
}

/// Cross-check variant: compute a max flow cost-blind, then improve it
/// by cancelling negative residual cycles.
#[derive(Default)]
pub struct CycleCanceling {
    dinic: Dinic,
}

impl CycleCanceling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_cost_flow(
        &mut self,
        graph: &mut ResidualGraph,
        source: NodeID,
        sink: NodeID,
        options: &SolverOptions,
    ) -> FlowResult {
        let mut result = self.dinic.max_flow(graph, source, sink, options);
        if result.status != SolveStatus::Optimal {
            result.cost = graph.total_cost();
            return result;
        }
        let canceled = cancel_negative_cycles(graph, options, &mut result);
        result.cost = graph.total_cost();
        debug!("cycle canceling removed {canceled} cycles");
        result
    }
}

/// Cancels negative-cost residual cycles until none remain or the run
/// is interrupted. Returns the number of cycles canceled.
pub fn cancel_negative_cycles(
    graph: &mut ResidualGraph,
    options: &SolverOptions,
    result: &mut FlowResult,
) -> usize {
    let eps = options.epsilon();
    let max_iterations = options.max_iterations();
    let mut control = options.control();
    let mut canceled = 0usize;

    loop {
        if control.interrupted() {
            result.status = SolveStatus::Canceled;
            break;
        }
        if canceled >= max_iterations {
            result.status = SolveStatus::IterationLimit;
            break;
        }
        let Some(cycle) = find_negative_cycle(graph, eps) else {
            break;
        };
        let bottleneck = path::find_min_capacity(graph, &cycle);
        if !approx_positive(bottleneck, eps) {
            break;
        }
        path::augment(graph, &cycle, bottleneck);
        canceled += 1;
    }
    debug_assert!(graph.check_invariants(eps));
    canceled
}

/// Bellman-Ford over the whole residual graph (every node seeded at
/// distance zero) to locate one negative cycle. The returned sequence
/// is closed: first and last node coincide.
fn find_negative_cycle(graph: &ResidualGraph, eps: f64) -> Option<Vec<NodeID>> {
    let nodes = graph.collect_sorted_nodes();
    let n = nodes.len();
    let mut distance: FxHashMap<NodeID, f64> =
        nodes.iter().map(|&node| (node, 0.)).collect();
    let mut parent: FxHashMap<NodeID, NodeID> = FxHashMap::default();
    let mut witness = None;

    for _ in 0..n {
        witness = None;
        for &from in &nodes {
            let from_distance = distance[&from];
            for edge in graph.edges_from(from) {
                if !approx_positive(edge.residual, eps) {
                    continue;
                }
                let next = from_distance + edge.cost;
                if next < distance[&edge.to] - eps {
                    distance.insert(edge.to, next);
                    parent.insert(edge.to, from);
                    witness = Some(edge.to);
                }
            }
        }
        if witness.is_none() {
            return None;
        }
    }

    // a node updated in round n sits downstream of a cycle; walking n
    // parents lands inside it
    let mut inside = witness?;
    for _ in 0..n {
        inside = *parent.get(&inside)?;
    }
    let mut cycle = vec![inside];
    let mut node = *parent.get(&inside)?;
    while node != inside {
        cycle.push(node);
        node = *parent.get(&node)?;
    }
    cycle.push(inside);
    cycle.reverse();
    Some(cycle)
}
