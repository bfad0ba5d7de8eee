//! Augmenting-path primitives shared by every path-based algorithm:
//! unwinding a parent map into a node sequence, finding the bottleneck
//! residual along it, and committing flow arc by arc.

use crate::network::Network;
use crate::numerics::{NodeID, PARENT_SENTINEL};
use crate::residual_graph::ResidualGraph;
use itertools::Itertools;
use rustc_hash::FxHashMap;

/// An s-t path with its aggregates: the flow it can (or did) carry,
/// the summed arc cost, and the summed declared edge length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    pub nodes: Vec<NodeID>,
    pub flow: f64,
    pub cost: f64,
    pub length: f64,
}

impl Path {
    /// Builds a path record for a traced node sequence, aggregating
    /// arc costs from the residual graph. Lengths live on the input
    /// network; see `with_lengths`.
    pub fn trace(graph: &ResidualGraph, nodes: Vec<NodeID>, flow: f64) -> Self {
        let cost = nodes
            .iter()
            .tuple_windows()
            .filter_map(|(&from, &to)| graph.get_edge(from, to).map(|edge| edge.cost))
            .sum();
        Self {
            nodes,
            flow,
            cost,
            length: 0.,
        }
    }

    /// Aggregates the declared edge lengths along the path.
    pub fn with_lengths(mut self, network: &Network) -> Self {
        self.length = self
            .nodes
            .iter()
            .tuple_windows()
            .filter_map(|(&from, &to)| network.edges.get(&(from, to)).map(|edge| edge.length))
            .sum();
        self
    }
}

/// Walks parent links from `sink` back to `source`. Returns an empty
/// path when the sink never entered the parent map or the chain does
/// not close at the source.
pub fn reconstruct(
    parents: &FxHashMap<NodeID, NodeID>,
    source: NodeID,
    sink: NodeID,
) -> Vec<NodeID> {
    if !parents.contains_key(&sink) {
        return Vec::new();
    }
    let mut path = vec![sink];
    let mut node = sink;
    while node != source {
        if path.len() > parents.len() {
            // malformed parent chain
            return Vec::new();
        }
        match parents.get(&node) {
            Some(&parent) if parent != PARENT_SENTINEL => {
                path.push(parent);
                node = parent;
            }
            _ => return Vec::new(),
        }
    }
    path.reverse();
    path
}

/// Minimum residual capacity along the path. Degenerate inputs (fewer
/// than two nodes, a missing arc, nothing to bound the minimum) all
/// report 0, meaning unusable for augmentation.
pub fn find_min_capacity(graph: &ResidualGraph, path: &[NodeID]) -> f64 {
    if path.len() < 2 {
        return 0.;
    }
    let mut bottleneck = f64::INFINITY;
    for (&from, &to) in path.iter().tuple_windows() {
        match graph.get_edge(from, to) {
            Some(edge) => bottleneck = bottleneck.min(edge.residual),
            None => return 0.,
        }
    }
    if bottleneck.is_infinite() { 0. } else { bottleneck }
}

/// Pushes `flow` across every consecutive arc of the path.
pub fn augment(graph: &mut ResidualGraph, path: &[NodeID], flow: f64) {
    for (&from, &to) in path.iter().tuple_windows() {
        graph.update_flow(from, to, flow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> ResidualGraph {
        let mut graph = ResidualGraph::new();
        graph.add_edge_with_reverse(1, 2, 10., 0.);
        graph.add_edge_with_reverse(2, 3, 5., 0.);
        graph.add_edge_with_reverse(3, 4, 10., 0.);
        graph
    }

    #[test]
    fn reconstructs_the_exact_sequence() {
        let mut parents = FxHashMap::default();
        parents.insert(1, PARENT_SENTINEL);
        parents.insert(2, 1);
        parents.insert(3, 2);
        parents.insert(4, 3);
        assert_eq!(reconstruct(&parents, 1, 4), vec![1, 2, 3, 4]);
    }

    #[test]
    fn absent_sink_means_no_path() {
        let mut parents = FxHashMap::default();
        parents.insert(1, PARENT_SENTINEL);
        parents.insert(2, 1);
        assert!(reconstruct(&parents, 1, 4).is_empty());
    }

    #[test]
    fn broken_chain_means_no_path() {
        // sink present but its ancestry never reaches the source
        let mut parents = FxHashMap::default();
        parents.insert(4, 3);
        parents.insert(3, PARENT_SENTINEL);
        assert!(reconstruct(&parents, 1, 4).is_empty());
    }

    #[test]
    fn bottleneck_of_the_chain() {
        let graph = chain();
        assert_eq!(find_min_capacity(&graph, &[1, 2, 3, 4]), 5.);
        assert_eq!(find_min_capacity(&graph, &[1, 2]), 10.);
    }

    #[test]
    fn degenerate_paths_have_no_capacity() {
        let graph = chain();
        assert_eq!(find_min_capacity(&graph, &[]), 0.);
        assert_eq!(find_min_capacity(&graph, &[1]), 0.);
        // missing arc
        assert_eq!(find_min_capacity(&graph, &[1, 4]), 0.);
    }

    #[test]
    fn traced_path_aggregates_cost_and_length() {
        use crate::network::{NetworkEdge, network_from_edges};

        let mut graph = ResidualGraph::new();
        graph.add_edge_with_reverse(1, 2, 10., 2.);
        graph.add_edge_with_reverse(2, 3, 5., 3.);

        let mut network = network_from_edges(&[(1, 2, 10.), (2, 3, 5.)], 1, 3);
        network.add_edge(NetworkEdge::new(1, 2, 10.).with_length(7.));
        network.add_edge(NetworkEdge::new(2, 3, 5.).with_length(5.));

        let path = Path::trace(&graph, vec![1, 2, 3], 5.).with_lengths(&network);
        assert_eq!(path.flow, 5.);
        assert_eq!(path.cost, 5.);
        assert_eq!(path.length, 12.);
    }

    #[test]
    fn augment_updates_every_arc_and_its_reverse() {
        let mut graph = chain();
        augment(&mut graph, &[1, 2, 3, 4], 5.);

        assert_eq!(graph.get_edge(1, 2).unwrap().residual, 5.);
        assert_eq!(graph.get_edge(2, 3).unwrap().residual, 0.);
        assert_eq!(graph.get_edge(3, 4).unwrap().residual, 5.);
        assert_eq!(graph.get_edge(2, 1).unwrap().residual, 5.);
        assert_eq!(graph.get_edge(3, 2).unwrap().residual, 5.);
        assert_eq!(graph.get_edge(4, 3).unwrap().residual, 5.);
    }
}
