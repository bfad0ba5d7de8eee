//! Dinic's algorithm: phases of level labeling followed by a blocking
//! flow. The level map comes from a plain BFS out of the source; the
//! blocking flow is a DFS that only descends arcs one level down and
//! keeps a current-arc pointer per node so exhausted arcs are never
//! rescanned within a phase.

use crate::bfs::Bfs;
use crate::max_flow::{FlowResult, MaxFlow, SolveStatus, SolverOptions};
use crate::numerics::{NodeID, approx_positive};
use crate::residual_graph::ResidualGraph;
use log::debug;
use rustc_hash::FxHashMap;
use std::time::Instant;

#[derive(Default)]
pub struct Dinic {
    bfs: Bfs,
    levels: FxHashMap<NodeID, usize>,
    current_arc: FxHashMap<NodeID, usize>,
    bfs_count: usize,
}

impl Dinic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends one augmenting path worth of flow through the level
    /// graph, at most `limit`. Exhausted arcs advance the node's
    /// current-arc pointer for the rest of the phase.
    fn blocking_dfs(
        &mut self,
        graph: &mut ResidualGraph,
        node: NodeID,
        sink: NodeID,
        limit: f64,
        eps: f64,
    ) -> f64 {
        if node == sink {
            return limit;
        }
        let level = self.levels.get(&node).copied().unwrap_or(usize::MAX);
        loop {
            let arc = *self.current_arc.entry(node).or_insert(0);
            if arc >= graph.out_degree(node) {
                return 0.;
            }
            let (to, residual) = {
                let edge = &graph.edges_from(node)[arc];
                (edge.to, edge.residual)
            };
            let descends = self.levels.get(&to) == Some(&(level + 1));
            if descends && approx_positive(residual, eps) {
                let pushed = self.blocking_dfs(graph, to, sink, limit.min(residual), eps);
                if approx_positive(pushed, eps) {
                    graph.update_flow(node, to, pushed);
                    return pushed;
                }
            }
            *self.current_arc.get_mut(&node).unwrap() += 1;
        }
    }
}

impl MaxFlow for Dinic {
    fn max_flow(
        &mut self,
        graph: &mut ResidualGraph,
        source: NodeID,
        sink: NodeID,
        options: &SolverOptions,
    ) -> FlowResult {
        let start = Instant::now();
        let eps = options.epsilon();
        let max_iterations = options.max_iterations();
        let mut control = options.control();
        let mut result = FlowResult::new();
        self.bfs_count = 0;

        'phases: loop {
            if control.interrupted() {
                result.status = SolveStatus::Canceled;
                break;
            }
            self.levels = self.bfs.levels(graph, source, eps);
            self.bfs_count += 1;
            if !self.levels.contains_key(&sink) {
                break;
            }
            self.current_arc.clear();

            loop {
                if control.interrupted() {
                    result.status = SolveStatus::Canceled;
                    break 'phases;
                }
                if result.iterations >= max_iterations {
                    result.status = SolveStatus::IterationLimit;
                    break 'phases;
                }
                let pushed = self.blocking_dfs(graph, source, sink, f64::INFINITY, eps);
                if !approx_positive(pushed, eps) {
                    break;
                }
                result.flow += pushed;
                result.iterations += 1;
            }
        }

        debug_assert!(graph.check_invariants(eps));
        debug!(
            "dinic pushed {} in {} paths over {} phases, {:?}",
            result.flow,
            result.iterations,
            self.bfs_count,
            start.elapsed()
        );
        result
    }
}
