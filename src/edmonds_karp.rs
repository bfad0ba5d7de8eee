//! Edmonds-Karp: repeated breadth-first augmentation. The simplest of
//! the max-flow family and the reference the others are checked
//! against in the tests.

use crate::bfs::Bfs;
use crate::max_flow::{FlowResult, MaxFlow, SolveStatus, SolverOptions};
use crate::numerics::{NodeID, approx_positive};
use crate::path;
use crate::residual_graph::ResidualGraph;
use log::debug;
use std::time::Instant;

/// Reusable solver; consecutive runs share the BFS scratch.
#[derive(Default)]
pub struct EdmondsKarp {
    bfs: Bfs,
}

impl EdmondsKarp {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MaxFlow for EdmondsKarp {
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

        loop {
            if control.interrupted() {
                result.status = SolveStatus::Canceled;
                break;
            }
            if result.iterations >= max_iterations {
                result.status = SolveStatus::IterationLimit;
                break;
            }
            let search = self.bfs.run(graph, source, sink, eps);
            if !search.found {
                break;
            }
            let augmenting = path::reconstruct(&search.parents, source, sink);
            let bottleneck = path::find_min_capacity(graph, &augmenting);
            if !approx_positive(bottleneck, eps) {
                break;
            }
            path::augment(graph, &augmenting, bottleneck);
            result.flow += bottleneck;
            result.iterations += 1;
        }

        debug_assert!(graph.check_invariants(eps));
        debug!(
            "edmonds-karp pushed {} in {} augmentations, {:?}",
            result.flow,
            result.iterations,
            start.elapsed()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::CancelToken;

    fn solve(edges: &[(NodeID, NodeID, f64)], source: NodeID, sink: NodeID) -> FlowResult {
        let mut graph = ResidualGraph::new();
        for &(from, to, capacity) in edges {
            graph.add_edge_with_reverse(from, to, capacity, 0.);
        }
        EdmondsKarp::new().max_flow(&mut graph, source, sink, &SolverOptions::default())
    }

    #[test]
    fn max_flow_diamond() {
        let result = solve(
            &[(1, 2, 10.), (1, 3, 10.), (2, 4, 10.), (3, 4, 10.)],
            1,
            4,
        );
        assert_eq!(result.flow, 20.);
        assert_eq!(result.status, SolveStatus::Optimal);
    }

    #[test]
    fn max_flow_linear_bottleneck() {
        let result = solve(&[(1, 2, 10.), (2, 3, 5.), (3, 4, 10.)], 1, 4);
        assert_eq!(result.flow, 5.);
    }

    #[test]
    fn max_flow_clr() {
        let result = solve(
            &[
                (0, 1, 16.),
                (0, 2, 13.),
                (1, 2, 10.),
                (1, 3, 12.),
                (2, 1, 4.),
                (2, 4, 14.),
                (3, 2, 9.),
                (3, 5, 20.),
                (4, 3, 7.),
                (4, 5, 4.),
            ],
            0,
            5,
        );
        assert_eq!(result.flow, 23.);
        assert_eq!(result.status, SolveStatus::Optimal);
    }

    #[test]
    fn single_arc_is_its_own_bottleneck() {
        let result = solve(&[(1, 2, 42.)], 1, 2);
        assert_eq!(result.flow, 42.);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn disconnected_sink_means_zero_flow() {
        let result = solve(&[(1, 2, 10.), (3, 4, 10.)], 1, 4);
        assert_eq!(result.flow, 0.);
        assert_eq!(result.status, SolveStatus::Optimal);
    }

    #[test]
    fn iteration_cap_reports_partial_flow() {
        let options = SolverOptions {
            max_iterations: 1,
            ..Default::default()
        };
        let mut graph = ResidualGraph::new();
        for &(from, to, capacity) in &[(1, 2, 10.), (1, 3, 10.), (2, 4, 10.), (3, 4, 10.)] {
            graph.add_edge_with_reverse(from, to, capacity, 0.);
        }
        let result = EdmondsKarp::new().max_flow(&mut graph, 1, 4, &options);
        assert_eq!(result.status, SolveStatus::IterationLimit);
        assert_eq!(result.flow, 10.);
        // the partial flow is a valid lower bound and the graph stays sound
        assert!(graph.check_invariants(1e-9));
    }

    #[test]
    fn pre_canceled_run_pushes_nothing() {
        let token = CancelToken::new();
        token.cancel();
        let options = SolverOptions {
            cancel: Some(token),
            ..Default::default()
        };
        let mut graph = ResidualGraph::new();
        graph.add_edge_with_reverse(1, 2, 10., 0.);
        let result = EdmondsKarp::new().max_flow(&mut graph, 1, 2, &options);
        assert!(result.is_canceled());
        assert_eq!(result.flow, 0.);
    }
}
