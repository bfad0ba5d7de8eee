//! Post-solve analysis: structural metrics over the input network,
//! flow metrics over the solved residual graph, and the bottleneck
//! report with its severity classification. Arcs touching a virtual
//! node (negative id) participate in flow but never in an aggregate
//! here.

use crate::bfs::Bfs;
use crate::network::{Network, NodeKind};
use crate::numerics::{NodeID, approx_positive, approx_zero, is_virtual};
use crate::residual_graph::ResidualGraph;
use rustc_hash::{FxHashMap, FxHashSet};

pub const DEFAULT_BOTTLENECK_THRESHOLD: f64 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Fixed utilization bands; the thresholds are part of the
    /// reporting contract.
    pub fn from_utilization(utilization: f64) -> Self {
        if utilization >= 0.99 {
            Severity::Critical
        } else if utilization >= 0.95 {
            Severity::High
        } else if utilization >= 0.90 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EfficiencyGrade {
    A,
    B,
    C,
    D,
    F,
}

impl EfficiencyGrade {
    pub fn from_average_utilization(utilization: f64) -> Self {
        if utilization >= 0.8 {
            EfficiencyGrade::A
        } else if utilization >= 0.6 {
            EfficiencyGrade::B
        } else if utilization >= 0.4 {
            EfficiencyGrade::C
        } else if utilization >= 0.2 {
            EfficiencyGrade::D
        } else {
            EfficiencyGrade::F
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bottleneck {
    pub from: NodeID,
    pub to: NodeID,
    pub utilization: f64,
    /// Share of the network's total flow carried by this arc.
    pub impact: f64,
    pub severity: Severity,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub warehouse_count: usize,
    pub delivery_point_count: usize,
    pub total_capacity: f64,
    pub average_edge_length: f64,
    pub density: f64,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub is_connected: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowStatistics {
    pub total_flow: f64,
    pub total_cost: f64,
    /// Mean utilization over arcs that carry flow.
    pub average_utilization: f64,
    pub saturated_edges: usize,
    pub zero_flow_edges: usize,
    pub active_edges: usize,
    pub efficiency: EfficiencyGrade,
    pub bottlenecks: Vec<Bottleneck>,
}

impl Default for EfficiencyGrade {
    fn default() -> Self {
        EfficiencyGrade::F
    }
}

/// Structural metrics of the declared network.
pub fn graph_statistics(network: &Network) -> GraphStatistics {
    let mut stats = GraphStatistics::default();
    let mut degrees: FxHashMap<NodeID, usize> = FxHashMap::default();

    for node in network.nodes.values() {
        if is_virtual(node.id) {
            continue;
        }
        stats.node_count += 1;
        degrees.entry(node.id).or_insert(0);
        match node.kind {
            NodeKind::Warehouse => stats.warehouse_count += 1,
            NodeKind::DeliveryPoint => stats.delivery_point_count += 1,
            _ => {}
        }
    }

    let mut total_length = 0.;
    for edge in network.edges.values() {
        if is_virtual(edge.from) || is_virtual(edge.to) {
            continue;
        }
        stats.edge_count += 1;
        stats.total_capacity += edge.capacity;
        total_length += edge.length;
        *degrees.entry(edge.from).or_insert(0) += 1;
        *degrees.entry(edge.to).or_insert(0) += 1;
    }

    if stats.edge_count > 0 {
        stats.average_edge_length = total_length / stats.edge_count as f64;
    }
    if stats.node_count > 1 {
        stats.density =
            stats.edge_count as f64 / (stats.node_count as f64 * (stats.node_count as f64 - 1.));
    }
    if stats.node_count > 0 {
        stats.min_degree = degrees.values().copied().min().unwrap_or(0);
        stats.max_degree = degrees.values().copied().max().unwrap_or(0);
        stats.avg_degree = degrees.values().sum::<usize>() as f64 / stats.node_count as f64;
    }
    stats.is_connected = source_reaches_sink(network);
    stats
}

/// BFS over the declared edges (bidirectional ones in both directions)
/// from the network's source; connected means the sink is reached.
fn source_reaches_sink(network: &Network) -> bool {
    if !network.nodes.contains_key(&network.source) || !network.nodes.contains_key(&network.sink) {
        return false;
    }
    let mut adjacency: FxHashMap<NodeID, Vec<NodeID>> = FxHashMap::default();
    let mut keys: Vec<&(NodeID, NodeID)> = network.edges.keys().collect();
    keys.sort_unstable();
    for &(from, to) in keys {
        adjacency.entry(from).or_default().push(to);
        if network.edges[&(from, to)].bidirectional {
            adjacency.entry(to).or_default().push(from);
        }
    }
    let mut visited: FxHashSet<NodeID> = FxHashSet::default();
    let mut stack = vec![network.source];
    visited.insert(network.source);
    while let Some(node) = stack.pop() {
        if node == network.sink {
            return true;
        }
        for &next in adjacency.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
            if visited.insert(next) {
                stack.push(next);
            }
        }
    }
    false
}

/// Flow metrics over a solved residual graph. `threshold` bounds the
/// bottleneck report; pass `DEFAULT_BOTTLENECK_THRESHOLD` unless the
/// caller asks otherwise.
pub fn flow_statistics(
    graph: &ResidualGraph,
    source: NodeID,
    eps: f64,
    threshold: f64,
) -> FlowStatistics {
    let mut stats = FlowStatistics {
        total_cost: graph.total_cost(),
        ..Default::default()
    };

    for edge in graph.edges_from(source) {
        if edge.is_reverse || is_virtual(edge.to) || is_virtual(source) {
            continue;
        }
        stats.total_flow += (edge.original - edge.residual).max(0.);
    }

    let mut utilization_sum = 0.;
    for from in graph.collect_sorted_nodes() {
        for edge in graph.edges_from(from) {
            if edge.is_reverse || is_virtual(from) || is_virtual(edge.to) {
                continue;
            }
            let flow = (edge.original - edge.residual).max(0.);
            if approx_zero(flow, eps) {
                stats.zero_flow_edges += 1;
                continue;
            }
            stats.active_edges += 1;
            if !approx_positive(edge.residual, eps) {
                stats.saturated_edges += 1;
            }
            let utilization = if edge.original > 0. {
                (flow / edge.original).clamp(0., 1.)
            } else {
                0.
            };
            utilization_sum += utilization;
            if utilization >= threshold {
                stats.bottlenecks.push(Bottleneck {
                    from,
                    to: edge.to,
                    utilization,
                    impact: 0.,
                    severity: Severity::from_utilization(utilization),
                });
            }
        }
    }

    if stats.active_edges > 0 {
        stats.average_utilization = utilization_sum / stats.active_edges as f64;
    }
    stats.efficiency = EfficiencyGrade::from_average_utilization(stats.average_utilization);
    for bottleneck in &mut stats.bottlenecks {
        bottleneck.impact = if stats.total_flow > 0. {
            (graph.flow_on(bottleneck.from, bottleneck.to) / stats.total_flow).clamp(0., 1.)
        } else {
            0.
        };
    }
    stats.bottlenecks.sort_by(|a, b| {
        b.utilization
            .partial_cmp(&a.utilization)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (a.from, a.to).cmp(&(b.from, b.to)))
    });
    stats
}

/// The bottleneck report alone, without the rest of the metrics.
pub fn find_bottlenecks(graph: &ResidualGraph, source: NodeID, eps: f64, threshold: f64) -> Vec<Bottleneck> {
    flow_statistics(graph, source, eps, threshold).bottlenecks
}

/// Undirected components of the residual graph, for connectivity
/// diagnostics over solved networks.
pub fn connected_components(graph: &mut ResidualGraph) -> Vec<Vec<NodeID>> {
    Bfs::new().connected_components(graph)
}
