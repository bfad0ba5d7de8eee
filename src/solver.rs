//! The solver facade the surrounding service talks to. A `FlowSolver`
//! owns one residual graph (leased from the process pool) for the
//! lifetime of a request: materialize, solve with a chosen algorithm,
//! read statistics and flows, reset, solve again. The free functions
//! below cover the one-shot cases.

use crate::bfs::Bfs;
use crate::codec::{self, EdgeFlow};
use crate::dijkstra::{Dijkstra, DistanceResult};
use crate::dinic::Dinic;
use crate::edmonds_karp::EdmondsKarp;
use crate::max_flow::{FlowResult, MaxFlow, SolverOptions};
use crate::min_cost_flow::{CycleCanceling, SuccessiveShortestPaths};
use crate::network::{Network, NetworkError};
use crate::numerics::{NodeID, approx_positive};
use crate::path;
use crate::pool;
use crate::push_relabel::PushRelabel;
use crate::residual_graph::ResidualGraph;
use crate::statistics::{self, Bottleneck, FlowStatistics, GraphStatistics};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    EdmondsKarp,
    Dinic,
    PushRelabelFifo,
    PushRelabelHighest,
    PushRelabelLowest,
    SuccessiveShortestPaths,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::EdmondsKarp,
        Algorithm::Dinic,
        Algorithm::PushRelabelFifo,
        Algorithm::PushRelabelHighest,
        Algorithm::PushRelabelLowest,
        Algorithm::SuccessiveShortestPaths,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::EdmondsKarp => "edmonds-karp",
            Algorithm::Dinic => "dinic",
            Algorithm::PushRelabelFifo => "push-relabel-fifo",
            Algorithm::PushRelabelHighest => "push-relabel-highest",
            Algorithm::PushRelabelLowest => "push-relabel-lowest",
            Algorithm::SuccessiveShortestPaths => "ssp",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = SolverError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "edmonds-karp" | "edmonds_karp" => Ok(Algorithm::EdmondsKarp),
            "dinic" => Ok(Algorithm::Dinic),
            "push-relabel-fifo" | "push_relabel_fifo" => Ok(Algorithm::PushRelabelFifo),
            "push-relabel-highest" | "push_relabel_highest" => Ok(Algorithm::PushRelabelHighest),
            "push-relabel-lowest" | "push_relabel_lowest" => Ok(Algorithm::PushRelabelLowest),
            "ssp" | "successive-shortest-paths" => Ok(Algorithm::SuccessiveShortestPaths),
            other => Err(SolverError::UnknownAlgorithm(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("invalid graph: {0}")]
    InvalidGraph(#[from] NetworkError),
    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub struct FlowSolver {
    graph: Option<ResidualGraph>,
    source: NodeID,
    sink: NodeID,
    options: SolverOptions,
}

impl FlowSolver {
    /// Validates the network and materializes its residual graph.
    pub fn new(network: &Network, options: SolverOptions) -> Result<Self, SolverError> {
        let graph = codec::materialize(network)?;
        Ok(Self {
            graph: Some(graph),
            source: network.source,
            sink: network.sink,
            options,
        })
    }

    fn graph_mut(&mut self) -> &mut ResidualGraph {
        self.graph.as_mut().expect("graph released")
    }

    pub fn residual_graph(&self) -> &ResidualGraph {
        self.graph.as_ref().expect("graph released")
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Runs the chosen algorithm on the current residual state.
    /// Consecutive solves continue from the flows already routed; call
    /// `reset` in between for independent runs.
    pub fn solve(&mut self, algorithm: Algorithm) -> FlowResult {
        let (source, sink) = (self.source, self.sink);
        let options = self.options.clone();
        let graph = self.graph_mut();
        match algorithm {
            Algorithm::EdmondsKarp => EdmondsKarp::new().max_flow(graph, source, sink, &options),
            Algorithm::Dinic => Dinic::new().max_flow(graph, source, sink, &options),
            Algorithm::PushRelabelFifo => {
                PushRelabel::fifo().max_flow(graph, source, sink, &options)
            }
            Algorithm::PushRelabelHighest => {
                PushRelabel::highest_label().max_flow(graph, source, sink, &options)
            }
            Algorithm::PushRelabelLowest => {
                PushRelabel::lowest_label().max_flow(graph, source, sink, &options)
            }
            Algorithm::SuccessiveShortestPaths => SuccessiveShortestPaths::new()
                .min_cost_flow(graph, source, sink, None, &options),
        }
    }

    /// Minimum-cost routing of `demand` units (everything when
    /// `None`).
    pub fn min_cost_flow(&mut self, demand: Option<f64>) -> FlowResult {
        let (source, sink) = (self.source, self.sink);
        let options = self.options.clone();
        SuccessiveShortestPaths::new().min_cost_flow(self.graph_mut(), source, sink, demand, &options)
    }

    /// The cycle-cancelling cross-check variant.
    pub fn min_cost_flow_by_cycle_canceling(&mut self) -> FlowResult {
        let (source, sink) = (self.source, self.sink);
        let options = self.options.clone();
        CycleCanceling::new().min_cost_flow(self.graph_mut(), source, sink, &options)
    }

    pub fn dijkstra(&mut self, from: NodeID) -> DistanceResult {
        let eps = self.options.epsilon();
        let mut control = self.options.control();
        Dijkstra::new().run(self.graph_mut(), from, eps, &mut control)
    }

    pub fn bfs_level(&mut self, from: NodeID) -> FxHashMap<NodeID, usize> {
        let eps = self.options.epsilon();
        Bfs::new().levels(self.graph_mut(), from, eps)
    }

    /// Up to `max_paths` shortest s-t paths (0 for the default bound),
    /// each annotated with its bottleneck capacity and arc cost.
    pub fn all_shortest_paths(&mut self, max_paths: usize) -> Vec<path::Path> {
        let (source, sink) = (self.source, self.sink);
        let eps = self.options.epsilon();
        let graph = self.graph_mut();
        Bfs::new()
            .all_shortest_paths(graph, source, sink, max_paths, eps)
            .into_iter()
            .map(|nodes| {
                let bottleneck = path::find_min_capacity(graph, &nodes);
                path::Path::trace(graph, nodes, bottleneck)
            })
            .collect()
    }

    pub fn flow_statistics(&self) -> FlowStatistics {
        statistics::flow_statistics(
            self.residual_graph(),
            self.source,
            self.options.epsilon(),
            statistics::DEFAULT_BOTTLENECK_THRESHOLD,
        )
    }

    pub fn find_bottlenecks(&self, threshold: f64) -> Vec<Bottleneck> {
        statistics::find_bottlenecks(
            self.residual_graph(),
            self.source,
            self.options.epsilon(),
            threshold,
        )
    }

    /// Per-arc flow view (codec form: net flow and utilization).
    pub fn flows(&self) -> Vec<EdgeFlow> {
        codec::extract_flows(self.residual_graph())
    }

    /// Source side of the minimum cut and the saturated arcs crossing
    /// it. Meaningful after a completed max-flow run.
    pub fn min_cut(&mut self) -> (FxHashSet<NodeID>, Vec<(NodeID, NodeID)>) {
        let eps = self.options.epsilon();
        let source = self.source;
        let graph = self.graph_mut();
        let reachable = Bfs::new().reachable(graph, source, eps);
        let mut cut = Vec::new();
        for &from in &reachable {
            for edge in graph.edges_from(from) {
                if !edge.is_reverse
                    && edge.original > 0.
                    && !reachable.contains(&edge.to)
                    && !approx_positive(edge.residual, eps)
                {
                    cut.push((from, edge.to));
                }
            }
        }
        cut.sort_unstable();
        (reachable, cut)
    }

    /// Zeroes all routed flow; a full inverse of any solve history.
    pub fn reset(&mut self) {
        self.graph_mut().reset();
    }
}

impl Drop for FlowSolver {
    fn drop(&mut self) {
        if let Some(graph) = self.graph.take() {
            pool::global().release_graph(graph);
        }
    }
}

/// One-shot solve over a network description.
pub fn solve(
    network: &Network,
    algorithm: Algorithm,
    options: SolverOptions,
) -> Result<FlowResult, SolverError> {
    let mut solver = FlowSolver::new(network, options)?;
    Ok(solver.solve(algorithm))
}

/// Structural statistics of the input network.
pub fn statistics(network: &Network) -> GraphStatistics {
    statistics::graph_statistics(network)
}

/// Runs every algorithm on its own materialization of the network in
/// parallel and reports the flow value each one reached. All values
/// agree within epsilon on a well-formed network; disagreement points
/// at a bug or a non-optimal termination status.
pub fn cross_validate(
    network: &Network,
    options: &SolverOptions,
) -> Result<Vec<(Algorithm, f64)>, SolverError> {
    network.validate()?;
    Algorithm::ALL
        .par_iter()
        .map(|&algorithm| {
            let mut solver = FlowSolver::new(network, options.clone())?;
            Ok((algorithm, solver.solve(algorithm).flow))
        })
        .collect()
}

/// Shortest distances from `from` in a fresh materialization.
pub fn dijkstra(
    network: &Network,
    from: NodeID,
    options: SolverOptions,
) -> Result<DistanceResult, SolverError> {
    let mut solver = FlowSolver::new(network, options)?;
    Ok(solver.dijkstra(from))
}

/// BFS levels from `from` in a fresh materialization.
pub fn bfs_level(
    network: &Network,
    from: NodeID,
    options: SolverOptions,
) -> Result<FxHashMap<NodeID, usize>, SolverError> {
    let mut solver = FlowSolver::new(network, options)?;
    Ok(solver.bfs_level(from))
}
