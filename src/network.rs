//! Caller-facing description of a logistics network. A `Network` is
//! what the surrounding service hands to the solver: plain nodes and
//! directed edges with capacities, costs and road metadata. It is
//! validated here and materialized into a residual graph by the codec.

use crate::numerics::{NodeID, PARENT_SENTINEL};
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Unspecified,
    Warehouse,
    DeliveryPoint,
    Intersection,
    Source,
    Sink,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    pub id: NodeID,
    pub kind: NodeKind,
    pub coordinates: Option<(f64, f64)>,
    pub supply: Option<f64>,
    pub demand: Option<f64>,
    pub metadata: FxHashMap<String, String>,
}

impl Node {
    pub fn new(id: NodeID, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NetworkEdge {
    pub from: NodeID,
    pub to: NodeID,
    pub capacity: f64,
    pub cost: f64,
    pub length: f64,
    pub road_type: String,
    pub bidirectional: bool,
    pub current_flow: f64,
}

impl NetworkEdge {
    pub fn new(from: NodeID, to: NodeID, capacity: f64) -> Self {
        Self {
            from,
            to,
            capacity,
            cost: 0.,
            length: 0.,
            road_type: String::new(),
            bidirectional: false,
            current_flow: 0.,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    pub fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum NetworkError {
    #[error("edge ({0},{1}) has negative capacity {2}")]
    NegativeCapacity(NodeID, NodeID, f64),
    #[error("edge ({0},{0}) is a self loop")]
    SelfLoop(NodeID),
    #[error("edge ({0},{1}) references undeclared node {2}")]
    DanglingEdge(NodeID, NodeID, NodeID),
    #[error("source and sink are both {0}")]
    SourceIsSink(NodeID),
    #[error("node {0} is not declared")]
    MissingNode(NodeID),
    #[error("node id -1 is reserved")]
    ReservedNodeId,
}

/// A capacitated directed graph with a designated source and sink.
/// Nodes and edges are kept in maps keyed the way the caller declared
/// them; deterministic iteration is the residual graph's job.
#[derive(Clone, Debug, Default)]
pub struct Network {
    pub nodes: FxHashMap<NodeID, Node>,
    pub edges: FxHashMap<(NodeID, NodeID), NetworkEdge>,
    pub source: NodeID,
    pub sink: NodeID,
    pub name: String,
    pub metadata: FxHashMap<String, String>,
}

impl Network {
    pub fn new(name: &str, source: NodeID, sink: NodeID) -> Self {
        Self {
            source,
            sink,
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    /// Inserts an edge, replacing any previous declaration of the same
    /// (from, to) pair. Parallel declarations are merged later by the
    /// residual graph, not here.
    pub fn add_edge(&mut self, edge: NetworkEdge) {
        self.edges.insert((edge.from, edge.to), edge);
    }

    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn number_of_edges(&self) -> usize {
        self.edges.len()
    }

    /// Checks the input invariants before any solver touches the
    /// network. No mutation has happened when this fails.
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.source == self.sink {
            return Err(NetworkError::SourceIsSink(self.source));
        }
        for id in [self.source, self.sink] {
            if !self.nodes.contains_key(&id) {
                return Err(NetworkError::MissingNode(id));
            }
        }
        if self.nodes.contains_key(&PARENT_SENTINEL) {
            return Err(NetworkError::ReservedNodeId);
        }
        for edge in self.edges.values() {
            if edge.from == edge.to {
                return Err(NetworkError::SelfLoop(edge.from));
            }
            if edge.capacity < 0. {
                return Err(NetworkError::NegativeCapacity(
                    edge.from,
                    edge.to,
                    edge.capacity,
                ));
            }
            for endpoint in [edge.from, edge.to] {
                if !self.nodes.contains_key(&endpoint) {
                    return Err(NetworkError::DanglingEdge(edge.from, edge.to, endpoint));
                }
            }
        }
        Ok(())
    }
}

/// Convenience constructor used all over the test suite: nodes are
/// declared implicitly by the edge list.
pub fn network_from_edges(
    edges: &[(NodeID, NodeID, f64)],
    source: NodeID,
    sink: NodeID,
) -> Network {
    let mut network = Network::new("test", source, sink);
    for &(from, to, capacity) in edges {
        network.add_node(Node::new(from, NodeKind::Intersection));
        network.add_node(Node::new(to, NodeKind::Intersection));
        network.add_edge(NetworkEdge::new(from, to, capacity));
    }
    network.add_node(Node::new(source, NodeKind::Source));
    network.add_node(Node::new(sink, NodeKind::Sink));
    network
}
