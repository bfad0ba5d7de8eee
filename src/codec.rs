//! Boundary codec between the caller's network description and the
//! solver's residual graph. Materialization validates first and adds
//! nodes and arcs in ascending key order, so the residual graph's
//! insertion order (and with it every downstream iteration) is a pure
//! function of the input. The post-solve view derives per-arc flow
//! from `original - residual`, the only reading that stays correct
//! under reverse-edge and anti-parallel cancellation.

use crate::network::{Network, NetworkError};
use crate::numerics::NodeID;
use crate::pool;
use crate::residual_graph::ResidualGraph;

/// One forward arc of the post-solve flow view.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeFlow {
    pub from: NodeID,
    pub to: NodeID,
    pub flow: f64,
    pub capacity: f64,
    /// `flow / capacity`, clamped to [0, 1].
    pub utilization: f64,
}

/// Builds the residual graph for a validated network. The graph comes
/// from the process-wide pool; hand it back with
/// `pool::global().release_graph` when done.
pub fn materialize(network: &Network) -> Result<ResidualGraph, NetworkError> {
    network.validate()?;
    let mut graph = pool::global().acquire_graph();

    let mut node_ids: Vec<NodeID> = network.nodes.keys().copied().collect();
    node_ids.sort_unstable();
    for id in node_ids {
        graph.add_node(id);
    }

    let mut edge_keys: Vec<(NodeID, NodeID)> = network.edges.keys().copied().collect();
    edge_keys.sort_unstable();
    for key in &edge_keys {
        let edge = &network.edges[key];
        graph.add_edge_with_reverse(edge.from, edge.to, edge.capacity, edge.cost);
        if edge.bidirectional {
            // the opposite direction is a declared arc of its own,
            // not a cancellation arc
            graph.add_edge_with_reverse(edge.to, edge.from, edge.capacity, edge.cost);
        }
    }

    // warm start: replay pre-existing flow the caller declared
    for key in &edge_keys {
        let edge = &network.edges[key];
        if edge.current_flow > 0. {
            graph.update_flow(edge.from, edge.to, edge.current_flow.min(edge.capacity));
        }
    }
    Ok(graph)
}

/// The flow on every declared (non-reverse) arc, ascending by
/// (from, to).
pub fn extract_flows(graph: &ResidualGraph) -> Vec<EdgeFlow> {
    let mut flows = Vec::new();
    for from in graph.collect_sorted_nodes() {
        let mut arcs: Vec<&crate::residual_graph::ResidualEdge> = graph
            .edges_from(from)
            .iter()
            .filter(|edge| !edge.is_reverse)
            .collect();
        arcs.sort_by_key(|edge| edge.to);
        for edge in arcs {
            let flow = (edge.original - edge.residual).max(0.);
            let utilization = if edge.original > 0. {
                (flow / edge.original).clamp(0., 1.)
            } else {
                0.
            };
            flows.push(EdgeFlow {
                from,
                to: edge.to,
                flow,
                capacity: edge.original,
                utilization,
            });
        }
    }
    flows
}
