//! Types shared by the whole max-flow family: the options every entry
//! point accepts, the structured result with its status discriminant,
//! and the trait the individual algorithms implement.

use crate::control::{CancelToken, RunControl};
use crate::numerics::{DEFAULT_EPSILON, NodeID};
use crate::residual_graph::ResidualGraph;
use std::time::Duration;

pub const DEFAULT_MAX_ITERATIONS: usize = 1_000_000;

/// How a solver run ended. Every status except `Optimal` still carries
/// a valid lower-bound flow in the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    /// Ran to completion; the flow is maximal (and for the min-cost
    /// solver, cost-optimal for the amount pushed).
    Optimal,
    /// The min-cost solver met only part of the requested demand.
    Feasible,
    Canceled,
    IterationLimit,
    NegativeCycle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlowResult {
    pub flow: f64,
    /// Total cost of the routed flow; filled by the min-cost solver,
    /// zero for the pure max-flow algorithms.
    pub cost: f64,
    pub iterations: usize,
    pub status: SolveStatus,
    pub used_bellman_ford: bool,
}

impl FlowResult {
    pub fn new() -> Self {
        Self {
            flow: 0.,
            cost: 0.,
            iterations: 0,
            status: SolveStatus::Optimal,
            used_bellman_ford: false,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.status == SolveStatus::Canceled
    }
}

impl Default for FlowResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-run configuration. The defaults match the documented behavior;
/// a zero-value field never means "unbounded".
#[derive(Clone, Debug, Default)]
pub struct SolverOptions {
    pub epsilon: f64,
    pub max_iterations: usize,
    /// Discharges between global relabels; `None` means |V|.
    pub global_relabel_freq: Option<usize>,
    /// Reduced-cost magnitude that triggers the Bellman-Ford fallback;
    /// values below epsilon are raised to epsilon.
    pub fallback_threshold: f64,
    pub disable_gap_heuristic: bool,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl SolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epsilon(&self) -> f64 {
        if self.epsilon > 0. {
            self.epsilon
        } else {
            DEFAULT_EPSILON
        }
    }

    pub fn max_iterations(&self) -> usize {
        if self.max_iterations > 0 {
            self.max_iterations
        } else {
            DEFAULT_MAX_ITERATIONS
        }
    }

    pub fn fallback_threshold(&self) -> f64 {
        self.fallback_threshold.max(self.epsilon())
    }

    pub fn global_relabel_freq(&self, number_of_nodes: usize) -> usize {
        self.global_relabel_freq
            .unwrap_or(number_of_nodes)
            .max(1)
    }

    /// A fresh interruption guard for one run. The deadline starts
    /// counting here, so build it when the run starts.
    pub fn control(&self) -> RunControl {
        RunControl::new(self.timeout, self.cancel.clone())
    }
}

/// The seam the solver facade dispatches through; implemented by
/// Edmonds-Karp, Dinic and the Push-Relabel variants.
pub trait MaxFlow {
    fn max_flow(
        &mut self,
        graph: &mut ResidualGraph,
        source: NodeID,
        sink: NodeID,
        options: &SolverOptions,
    ) -> FlowResult;
}
