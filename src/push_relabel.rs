//! Push-Relabel with the FIFO, highest-label and lowest-label
//! selection rules. One engine carries the push, relabel, discharge,
//! gap-heuristic and global-relabel machinery; the variants differ
//! only in which active node is discharged next, factored out as the
//! `ActiveNodeSelector` strategy.
//!
//! Nodes are renumbered into dense indices (ascending id) at the start
//! of a run so heights, excesses and current-arc pointers live in
//! plain vectors and the bucket queue can index directly.

use crate::bfs::Bfs;
use crate::bucket_queue::BucketQueue;
use crate::max_flow::{FlowResult, MaxFlow, SolveStatus, SolverOptions};
use crate::numerics::{NodeID, approx_positive};
use crate::residual_graph::ResidualGraph;
use bitvec::vec::BitVec;
use log::debug;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::time::Instant;

/// Strategy seam: tracks the set of active nodes and decides which one
/// is discharged next. Pushing a node twice is idempotent.
pub trait ActiveNodeSelector {
    fn resize(&mut self, members: usize, max_height: usize);
    fn push(&mut self, index: usize, height: usize);
    fn pop(&mut self) -> Option<usize>;
    fn update_height(&mut self, index: usize, old_height: usize, new_height: usize);
    fn is_empty(&self) -> bool;
    fn clear(&mut self);
}

/// First-in-first-out discharge order.
#[derive(Default)]
pub struct FifoSelector {
    queue: VecDeque<usize>,
    queued: BitVec,
}

impl ActiveNodeSelector for FifoSelector {
    fn resize(&mut self, members: usize, _max_height: usize) {
        self.queue.clear();
        self.queued.clear();
        self.queued.resize(members, false);
    }

    fn push(&mut self, index: usize, _height: usize) {
        if !self.queued[index] {
            self.queued.set(index, true);
            self.queue.push_back(index);
        }
    }

    fn pop(&mut self) -> Option<usize> {
        let index = self.queue.pop_front()?;
        self.queued.set(index, false);
        Some(index)
    }

    fn update_height(&mut self, _index: usize, _old_height: usize, _new_height: usize) {
        // queue position is independent of height
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.queued.fill(false);
    }
}

/// Discharges the active node with the greatest height first.
#[derive(Default)]
pub struct HighestLabelSelector {
    buckets: BucketQueue,
}

impl ActiveNodeSelector for HighestLabelSelector {
    fn resize(&mut self, members: usize, max_height: usize) {
        self.buckets = BucketQueue::new(members, max_height);
    }

    fn push(&mut self, index: usize, height: usize) {
        self.buckets.push(index, height);
    }

    fn pop(&mut self) -> Option<usize> {
        self.buckets.pop_highest().map(|(index, _)| index)
    }

    fn update_height(&mut self, index: usize, old_height: usize, new_height: usize) {
        self.buckets.update_height(index, old_height, new_height);
    }

    fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }
}

/// Discharges the active node with the smallest height first.
#[derive(Default)]
pub struct LowestLabelSelector {
    buckets: BucketQueue,
}

impl ActiveNodeSelector for LowestLabelSelector {
    fn resize(&mut self, members: usize, max_height: usize) {
        self.buckets = BucketQueue::new(members, max_height);
    }

    fn push(&mut self, index: usize, height: usize) {
        self.buckets.push(index, height);
    }

    fn pop(&mut self) -> Option<usize> {
        self.buckets.pop_lowest().map(|(index, _)| index)
    }

    fn update_height(&mut self, index: usize, old_height: usize, new_height: usize) {
        self.buckets.update_height(index, old_height, new_height);
    }

    fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }
}

pub struct PushRelabel<S: ActiveNodeSelector> {
    selector: S,
    bfs: Bfs,
    nodes: Vec<NodeID>,
    index: FxHashMap<NodeID, usize>,
    height: Vec<usize>,
    excess: Vec<f64>,
    height_count: Vec<usize>,
    current_arc: Vec<usize>,
    source: usize,
    sink: usize,
    gap_enabled: bool,
}

pub type PushRelabelFifo = PushRelabel<FifoSelector>;
pub type PushRelabelHighest = PushRelabel<HighestLabelSelector>;
pub type PushRelabelLowest = PushRelabel<LowestLabelSelector>;

impl PushRelabel<FifoSelector> {
    pub fn fifo() -> Self {
        Self::with_selector(FifoSelector::default())
    }
}

impl PushRelabel<HighestLabelSelector> {
    pub fn highest_label() -> Self {
        Self::with_selector(HighestLabelSelector::default())
    }
}

impl PushRelabel<LowestLabelSelector> {
    pub fn lowest_label() -> Self {
        Self::with_selector(LowestLabelSelector::default())
    }
}

impl<S: ActiveNodeSelector> PushRelabel<S> {
    pub fn with_selector(selector: S) -> Self {
        Self {
            selector,
            bfs: Bfs::new(),
            nodes: Vec::new(),
            index: FxHashMap::default(),
            height: Vec::new(),
            excess: Vec::new(),
            height_count: Vec::new(),
            current_arc: Vec::new(),
            source: 0,
            sink: 0,
            gap_enabled: true,
        }
    }

    fn prepare(&mut self, graph: &mut ResidualGraph, source: NodeID, sink: NodeID) -> bool {
        self.nodes = graph.sorted_nodes().to_vec();
        self.index.clear();
        for (position, &node) in self.nodes.iter().enumerate() {
            self.index.insert(node, position);
        }
        let Some(&source_index) = self.index.get(&source) else {
            return false;
        };
        let Some(&sink_index) = self.index.get(&sink) else {
            return false;
        };
        self.source = source_index;
        self.sink = sink_index;

        let n = self.nodes.len();
        self.height.clear();
        self.height.resize(n, 0);
        self.excess.clear();
        self.excess.resize(n, 0.);
        self.current_arc.clear();
        self.current_arc.resize(n, 0);
        self.height_count.clear();
        self.height_count.resize(2 * n + 2, 0);

        self.height[self.source] = n;
        for position in 0..n {
            self.height_count[self.height[position]] += 1;
        }
        self.selector.resize(n, 2 * n + 1);
        true
    }

    fn activate(&mut self, index: usize, eps: f64) {
        if index != self.source && index != self.sink && approx_positive(self.excess[index], eps) {
            self.selector.push(index, self.height[index]);
        }
    }

    /// Saturates every out-arc of the source, creating the initial
    /// excesses.
    fn saturate_source(&mut self, graph: &mut ResidualGraph, eps: f64) {
        let source_id = self.nodes[self.source];
        let targets: Vec<(NodeID, f64)> = graph
            .edges_from(source_id)
            .iter()
            .filter(|edge| approx_positive(edge.residual, eps))
            .map(|edge| (edge.to, edge.residual))
            .collect();
        for (to, residual) in targets {
            graph.update_flow(source_id, to, residual);
            let v = self.index[&to];
            self.excess[v] += residual;
            self.excess[self.source] -= residual;
            self.activate(v, eps);
        }
    }

    /// Raises `u` to one above its lowest admissible neighbor. Returns
    /// false when `u` has no residual arc left at all (trapped excess)
    /// or the new height would leave the bucket range.
    fn relabel(&mut self, graph: &ResidualGraph, u: usize, eps: f64) -> bool {
        let node_id = self.nodes[u];
        let mut lowest = usize::MAX;
        for edge in graph.edges_from(node_id) {
            if approx_positive(edge.residual, eps) {
                lowest = lowest.min(self.height[self.index[&edge.to]]);
            }
        }
        if lowest == usize::MAX {
            return false;
        }
        let new_height = lowest + 1;
        if new_height >= self.height_count.len() {
            return false;
        }
        let old_height = self.height[u];
        self.height_count[old_height] -= 1;
        self.height[u] = new_height;
        self.height_count[new_height] += 1;
        self.selector.update_height(u, old_height, new_height);
        self.current_arc[u] = 0;

        if self.gap_enabled && self.height_count[old_height] == 0 && old_height < self.nodes.len()
        {
            self.close_gap(old_height);
        }
        true
    }

    /// Every node strictly between the emptied height and |V| can no
    /// longer reach the sink; jump them all to |V|+1.
    fn close_gap(&mut self, gap: usize) {
        let n = self.nodes.len();
        debug!("gap at height {gap}, disconnecting everything above");
        for w in 0..n {
            if w == self.source || w == self.sink {
                continue;
            }
            let h = self.height[w];
            if h > gap && h < n {
                self.height_count[h] -= 1;
                self.height[w] = n + 1;
                self.height_count[n + 1] += 1;
                self.selector.update_height(w, h, n + 1);
                self.current_arc[w] = 0;
            }
        }
    }

    /// Recomputes exact heights by reverse BFS from the sink; nodes
    /// that cannot reach it move to |V|+1, the source stays at |V|.
    /// The selector is rebuilt for the surviving active nodes.
    fn global_relabel(&mut self, graph: &mut ResidualGraph, eps: f64) {
        let sink_id = self.nodes[self.sink];
        let n = self.nodes.len();
        let distances = self.bfs.reverse_levels(graph, sink_id, eps);

        self.height_count.fill(0);
        for w in 0..n {
            self.height[w] = if w == self.source {
                n
            } else {
                distances.get(&self.nodes[w]).copied().unwrap_or(n + 1)
            };
            self.height_count[self.height[w]] += 1;
            self.current_arc[w] = 0;
        }
        self.selector.clear();
        for w in 0..n {
            self.activate(w, eps);
        }
    }

    /// Pushes out of `u` until its excess is gone or it gets stuck.
    fn discharge(&mut self, graph: &mut ResidualGraph, u: usize, eps: f64) {
        let node_id = self.nodes[u];
        while approx_positive(self.excess[u], eps) {
            let arc = self.current_arc[u];
            if arc >= graph.out_degree(node_id) {
                if !self.relabel(graph, u, eps) {
                    // trapped: the next global relabel sinks its height
                    return;
                }
                continue;
            }
            let (to, residual) = {
                let edge = &graph.edges_from(node_id)[arc];
                (edge.to, edge.residual)
            };
            let v = self.index[&to];
            if approx_positive(residual, eps) && self.height[u] == self.height[v] + 1 {
                let delta = self.excess[u].min(residual);
                graph.update_flow(node_id, to, delta);
                self.excess[u] -= delta;
                self.excess[v] += delta;
                self.activate(v, eps);
            } else {
                self.current_arc[u] += 1;
            }
        }
    }
}

impl<S: ActiveNodeSelector> MaxFlow for PushRelabel<S> {
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

        if !self.prepare(graph, source, sink) {
            return result;
        }
        self.gap_enabled = !options.disable_gap_heuristic;
        let relabel_freq = options.global_relabel_freq(self.nodes.len());
        let mut since_global_relabel = 0usize;

        self.saturate_source(graph, eps);

        while let Some(u) = self.selector.pop() {
            if control.interrupted() {
                result.status = SolveStatus::Canceled;
                break;
            }
            if result.iterations >= max_iterations {
                result.status = SolveStatus::IterationLimit;
                break;
            }
            self.discharge(graph, u, eps);
            result.iterations += 1;
            since_global_relabel += 1;
            if since_global_relabel >= relabel_freq {
                self.global_relabel(graph, eps);
                since_global_relabel = 0;
            }
        }

        result.flow = self.excess[self.sink];
        debug_assert!(graph.check_invariants(eps));
        debug!(
            "push-relabel reached {} after {} discharges, {:?}",
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

    const CLR: [(NodeID, NodeID, f64); 10] = [
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
    ];

    fn build(edges: &[(NodeID, NodeID, f64)]) -> ResidualGraph {
        let mut graph = ResidualGraph::new();
        for &(from, to, capacity) in edges {
            graph.add_edge_with_reverse(from, to, capacity, 0.);
        }
        graph
    }

    fn assert_conserved(graph: &ResidualGraph, source: NodeID, sink: NodeID) {
        let nodes = graph.collect_sorted_nodes();
        for &node in &nodes {
            if node == source || node == sink {
                continue;
            }
            let outflow: f64 = graph
                .edges_from(node)
                .iter()
                .map(|edge| (edge.original - edge.residual).max(0.))
                .sum();
            let inflow: f64 = nodes
                .iter()
                .filter_map(|&from| graph.get_edge(from, node))
                .map(|edge| (edge.original - edge.residual).max(0.))
                .sum();
            assert!(
                (inflow - outflow).abs() < 1e-6,
                "conservation violated at {node}: in {inflow}, out {outflow}"
            );
        }
    }

    #[test]
    fn max_flow_clr_fifo() {
        let mut graph = build(&CLR);
        let result = PushRelabel::fifo().max_flow(&mut graph, 0, 5, &SolverOptions::default());
        assert_eq!(result.flow, 23.);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert_conserved(&graph, 0, 5);
    }

    #[test]
    fn max_flow_clr_highest_label() {
        let mut graph = build(&CLR);
        let result =
            PushRelabel::highest_label().max_flow(&mut graph, 0, 5, &SolverOptions::default());
        assert_eq!(result.flow, 23.);
        assert_conserved(&graph, 0, 5);
    }

    #[test]
    fn max_flow_clr_lowest_label() {
        let mut graph = build(&CLR);
        let result =
            PushRelabel::lowest_label().max_flow(&mut graph, 0, 5, &SolverOptions::default());
        assert_eq!(result.flow, 23.);
        assert_conserved(&graph, 0, 5);
    }

    #[test]
    fn max_flow_diamond_all_variants() {
        let edges = [(1, 2, 10.), (1, 3, 10.), (2, 4, 10.), (3, 4, 10.)];
        for result in [
            PushRelabel::fifo().max_flow(&mut build(&edges), 1, 4, &SolverOptions::default()),
            PushRelabel::highest_label().max_flow(
                &mut build(&edges),
                1,
                4,
                &SolverOptions::default(),
            ),
            PushRelabel::lowest_label().max_flow(
                &mut build(&edges),
                1,
                4,
                &SolverOptions::default(),
            ),
        ] {
            assert_eq!(result.flow, 20.);
        }
    }

    #[test]
    fn bottleneck_limits_the_flow() {
        let mut graph = build(&[(1, 2, 10.), (2, 3, 5.), (3, 4, 10.)]);
        let result = PushRelabel::fifo().max_flow(&mut graph, 1, 4, &SolverOptions::default());
        assert_eq!(result.flow, 5.);
        assert_conserved(&graph, 1, 4);
    }

    #[test]
    fn gap_heuristic_off_matches_on() {
        let options = SolverOptions {
            disable_gap_heuristic: true,
            ..Default::default()
        };
        let mut graph = build(&CLR);
        let result = PushRelabel::highest_label().max_flow(&mut graph, 0, 5, &options);
        assert_eq!(result.flow, 23.);
    }

    #[test]
    fn frequent_global_relabel_is_still_exact() {
        let options = SolverOptions {
            global_relabel_freq: Some(1),
            ..Default::default()
        };
        let mut graph = build(&CLR);
        let result = PushRelabel::fifo().max_flow(&mut graph, 0, 5, &options);
        assert_eq!(result.flow, 23.);
        assert_conserved(&graph, 0, 5);
    }

    #[test]
    fn missing_terminals_mean_zero_flow() {
        let mut graph = build(&[(1, 2, 10.)]);
        let result = PushRelabel::fifo().max_flow(&mut graph, 1, 9, &SolverOptions::default());
        assert_eq!(result.flow, 0.);
    }

    #[test]
    fn back_arc_network() {
        let edges = [
            (0, 1, 7.),
            (0, 2, 3.),
            (1, 2, 1.),
            (1, 3, 6.),
            (2, 4, 8.),
            (3, 5, 2.),
            (3, 2, 3.),
            (4, 3, 2.),
            (4, 5, 8.),
        ];
        for result in [
            PushRelabel::fifo().max_flow(&mut build(&edges), 0, 5, &SolverOptions::default()),
            PushRelabel::highest_label().max_flow(
                &mut build(&edges),
                0,
                5,
                &SolverOptions::default(),
            ),
            PushRelabel::lowest_label().max_flow(
                &mut build(&edges),
                0,
                5,
                &SolverOptions::default(),
            ),
        ] {
            assert_eq!(result.flow, 9.);
        }
    }
}
