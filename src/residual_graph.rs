//! The residual graph every flow algorithm in this crate operates on.
//!
//! Each node stores its outgoing residual arcs twice over one storage:
//! an insertion-ordered `Vec` (the deterministic form handed to the
//! algorithms) and a target-id index into that `Vec` (the map form for
//! O(1) arc lookup). Reverse arcs synthesized by the solver and
//! anti-parallel arcs declared by the caller are distinct concepts and
//! must never be conflated: a declared (v,u) keeps `is_reverse ==
//! false` and its own original capacity, and it absorbs cancellation
//! credit when flow is pushed along (u,v).

use crate::numerics::NodeID;
use log::debug;
use rustc_hash::FxHashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct ResidualEdge {
    pub to: NodeID,
    /// Remaining push capacity. Kept equal to `original - flow` on
    /// every arc, reverse or not.
    pub residual: f64,
    pub original: f64,
    pub cost: f64,
    /// Net flow pushed along this arc so far. Runs negative on the
    /// counter-directed arc of an anti-parallel pair; external
    /// reporting must derive flow as `original - residual` instead.
    pub flow: f64,
    pub is_reverse: bool,
}

impl ResidualEdge {
    fn forward(to: NodeID, capacity: f64, cost: f64) -> Self {
        Self {
            to,
            residual: capacity,
            original: capacity,
            cost,
            flow: 0.,
            is_reverse: false,
        }
    }

    fn reverse(to: NodeID, forward_cost: f64) -> Self {
        Self {
            to,
            residual: 0.,
            original: 0.,
            cost: -forward_cost,
            flow: 0.,
            is_reverse: true,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct AdjacencyList {
    edges: Vec<ResidualEdge>,
    index: FxHashMap<NodeID, usize>,
}

impl AdjacencyList {
    fn position(&self, to: NodeID) -> Option<usize> {
        self.index.get(&to).copied()
    }

    fn push(&mut self, edge: ResidualEdge) {
        self.index.insert(edge.to, self.edges.len());
        self.edges.push(edge);
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResidualGraph {
    adjacency: FxHashMap<NodeID, AdjacencyList>,
    sorted_nodes: Option<Vec<NodeID>>,
    incoming: FxHashMap<NodeID, Vec<NodeID>>,
    incoming_dirty: bool,
}

impl ResidualGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeID) {
        if !self.adjacency.contains_key(&node) {
            self.adjacency.insert(node, AdjacencyList::default());
            self.invalidate_caches();
        }
    }

    pub fn contains_node(&self, node: NodeID) -> bool {
        self.adjacency.contains_key(&node)
    }

    pub fn number_of_nodes(&self) -> usize {
        self.adjacency.len()
    }

    /// Counts every stored residual arc, reverse arcs included.
    pub fn number_of_edges(&self) -> usize {
        self.adjacency.values().map(|list| list.edges.len()).sum()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeID> + '_ {
        self.adjacency.keys().copied()
    }

    /// Adds a forward arc. Parallel declarations of the same (from, to)
    /// pair merge their capacities onto the first declaration, which
    /// also keeps its cost. A previously synthesized reverse arc in
    /// this slot is replaced outright.
    pub fn add_edge(&mut self, from: NodeID, to: NodeID, capacity: f64, cost: f64) {
        self.add_node(from);
        self.add_node(to);
        let list = self.adjacency.get_mut(&from).unwrap();
        match list.position(to) {
            Some(pos) if !list.edges[pos].is_reverse => {
                // parallel declaration: accumulate, first cost wins
                let edge = &mut list.edges[pos];
                edge.residual += capacity;
                edge.original += capacity;
            }
            Some(pos) => {
                // a solver-made reverse arc never shadows a declared arc
                list.edges[pos] = ResidualEdge::forward(to, capacity, cost);
            }
            None => list.push(ResidualEdge::forward(to, capacity, cost)),
        }
        self.invalidate_caches();
    }

    /// Adds the cancellation arc for a forward (to, from) declaration.
    /// A no-op when any arc (from, to) already exists: an anti-parallel
    /// arc declared by the caller must keep its capacity, and a second
    /// reverse declaration has nothing to add.
    pub fn add_reverse_edge(&mut self, from: NodeID, to: NodeID, forward_cost: f64) {
        self.add_node(from);
        self.add_node(to);
        let list = self.adjacency.get_mut(&from).unwrap();
        if list.position(to).is_none() {
            list.push(ResidualEdge::reverse(to, forward_cost));
            self.invalidate_caches();
        }
    }

    /// The convenience form the codec uses for every declared arc.
    pub fn add_edge_with_reverse(&mut self, from: NodeID, to: NodeID, capacity: f64, cost: f64) {
        self.add_edge(from, to, capacity, cost);
        self.add_reverse_edge(to, from, cost);
    }

    pub fn get_edge(&self, from: NodeID, to: NodeID) -> Option<&ResidualEdge> {
        let list = self.adjacency.get(&from)?;
        list.position(to).map(|pos| &list.edges[pos])
    }

    fn get_edge_mut(&mut self, from: NodeID, to: NodeID) -> Option<&mut ResidualEdge> {
        let list = self.adjacency.get_mut(&from)?;
        list.position(to).map(move |pos| &mut list.edges[pos])
    }

    /// Map-form view of a node's outgoing arcs, keyed by target.
    /// Iteration order is the hash map's; use `edges_from` wherever
    /// order matters.
    pub fn neighbors(&self, from: NodeID) -> impl Iterator<Item = (NodeID, &ResidualEdge)> {
        self.adjacency
            .get(&from)
            .into_iter()
            .flat_map(|list| list.index.iter().map(|(&to, &pos)| (to, &list.edges[pos])))
    }

    /// Insertion-ordered outgoing arcs; the form every algorithm
    /// iterates so identical inputs replay identically.
    pub fn edges_from(&self, from: NodeID) -> &[ResidualEdge] {
        self.adjacency
            .get(&from)
            .map(|list| list.edges.as_slice())
            .unwrap_or(&[])
    }

    pub fn out_degree(&self, from: NodeID) -> usize {
        self.edges_from(from).len()
    }

    /// Applies `flow` to the arc (from, to) and credits the opposite
    /// direction in one step. The opposite arc may be a synthesized
    /// reverse or a caller-declared anti-parallel arc; if neither
    /// exists yet a reverse arc is created holding exactly the pushed
    /// amount. Callers push at most the bottleneck, so `residual`
    /// stays non-negative up to float slack.
    pub fn update_flow(&mut self, from: NodeID, to: NodeID, flow: f64) {
        let cost = match self.get_edge_mut(from, to) {
            Some(edge) => {
                edge.flow += flow;
                edge.residual -= flow;
                edge.cost
            }
            None => {
                debug_assert!(false, "update_flow on missing arc ({from},{to})");
                return;
            }
        };
        match self.get_edge_mut(to, from) {
            Some(opposite) => {
                opposite.residual += flow;
                opposite.flow -= flow;
            }
            None => {
                let list = self.adjacency.get_mut(&to).unwrap();
                let mut edge = ResidualEdge::reverse(from, cost);
                edge.residual = flow;
                edge.flow = -flow;
                list.push(edge);
                self.incoming_dirty = true;
            }
        }
    }

    /// Node ids ascending; rebuilt lazily after any mutation.
    pub fn sorted_nodes(&mut self) -> &[NodeID] {
        if self.sorted_nodes.is_none() {
            let mut nodes: Vec<NodeID> = self.adjacency.keys().copied().collect();
            nodes.sort_unstable();
            self.sorted_nodes = Some(nodes);
        }
        self.sorted_nodes.as_deref().unwrap()
    }

    /// Allocation-paying variant for shared read-only contexts.
    pub fn collect_sorted_nodes(&self) -> Vec<NodeID> {
        let mut nodes: Vec<NodeID> = self.adjacency.keys().copied().collect();
        nodes.sort_unstable();
        nodes
    }

    /// In-neighbors of `to`, ids ascending. The cache stores topology
    /// only; residual capacities are read live through `get_edge` so
    /// pushes between rebuilds cannot stale it.
    pub fn incoming(&mut self, to: NodeID) -> &[NodeID] {
        if self.incoming_dirty {
            self.rebuild_incoming();
        }
        self.incoming
            .get(&to)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    fn rebuild_incoming(&mut self) {
        debug!(
            "rebuilding incoming cache for {} nodes",
            self.adjacency.len()
        );
        self.incoming.clear();
        for (&from, list) in &self.adjacency {
            for edge in &list.edges {
                self.incoming.entry(edge.to).or_default().push(from);
            }
        }
        for list in self.incoming.values_mut() {
            list.sort_unstable();
        }
        self.incoming_dirty = false;
    }

    fn invalidate_caches(&mut self) {
        self.sorted_nodes = None;
        self.incoming_dirty = true;
    }

    /// Empties the graph while keeping top-level capacity, so pooled
    /// instances do not re-grow their tables in steady state.
    pub fn clear(&mut self) {
        self.adjacency.clear();
        self.incoming.clear();
        self.sorted_nodes = None;
        self.incoming_dirty = false;
    }

    /// Zeroes all flow: forward arcs recover their full original
    /// capacity, reverse arcs collapse back to zero. Anti-parallel
    /// arcs each recover their own declared capacity.
    pub fn reset(&mut self) {
        for list in self.adjacency.values_mut() {
            for edge in &mut list.edges {
                edge.flow = 0.;
                edge.residual = if edge.is_reverse { 0. } else { edge.original };
            }
        }
        self.invalidate_caches();
    }

    /// Routed flow on one arc for external reporting. Derived from
    /// `original - residual`, never from the stored `flow` field,
    /// which is unreliable once anti-parallel cancellation happened.
    pub fn flow_on(&self, from: NodeID, to: NodeID) -> f64 {
        self.get_edge(from, to)
            .map(|edge| (edge.original - edge.residual).max(0.))
            .unwrap_or(0.)
    }

    /// Total cost of the routed flow, summed over non-reverse arcs.
    pub fn total_cost(&self) -> f64 {
        self.adjacency
            .values()
            .flat_map(|list| list.edges.iter())
            .filter(|edge| !edge.is_reverse)
            .map(|edge| (edge.original - edge.residual).max(0.) * edge.cost)
            .sum()
    }

    /// In O(V+E) checks the residual bookkeeping: residual capacities
    /// are non-negative up to slack, `residual == original - flow`
    /// everywhere, reverse arcs carry no original capacity, and the
    /// per-node index mirrors the edge list.
    pub fn check_invariants(&self, eps: f64) -> bool {
        self.adjacency.values().all(|list| {
            list.edges.len() == list.index.len()
                && list
                    .index
                    .iter()
                    .all(|(&to, &pos)| list.edges.get(pos).map(|e| e.to) == Some(to))
                && list.edges.iter().all(|edge| {
                    let slack = eps * (1. + edge.original.abs());
                    edge.residual >= -slack
                        && (edge.residual - (edge.original - edge.flow)).abs() <= slack
                        && (!edge.is_reverse || edge.original == 0.)
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::DEFAULT_EPSILON;

    #[test]
    fn parallel_declarations_merge_capacity_first_cost_wins() {
        let mut graph = ResidualGraph::new();
        graph.add_edge(1, 2, 10., 3.);
        graph.add_edge(1, 2, 7., 99.);

        let edge = graph.get_edge(1, 2).unwrap();
        assert_eq!(edge.original, 17.);
        assert_eq!(edge.residual, 17.);
        assert_eq!(edge.cost, 3.);
        assert!(!edge.is_reverse);
        assert!(graph.check_invariants(DEFAULT_EPSILON));
    }

    #[test]
    fn declared_arc_replaces_synthesized_reverse() {
        let mut graph = ResidualGraph::new();
        graph.add_edge_with_reverse(1, 2, 10., 2.);
        assert!(graph.get_edge(2, 1).unwrap().is_reverse);

        graph.add_edge(2, 1, 5., 4.);
        let edge = graph.get_edge(2, 1).unwrap();
        assert!(!edge.is_reverse);
        assert_eq!(edge.original, 5.);
        assert_eq!(edge.cost, 4.);
    }

    #[test]
    fn reverse_never_overwrites_declared_arc() {
        let mut graph = ResidualGraph::new();
        graph.add_edge(1, 2, 10., 1.);
        graph.add_edge(2, 1, 5., 1.);
        // codec adds the reverse pair for both declarations
        graph.add_reverse_edge(2, 1, 1.);
        graph.add_reverse_edge(1, 2, 1.);

        assert_eq!(graph.get_edge(1, 2).unwrap().original, 10.);
        assert_eq!(graph.get_edge(2, 1).unwrap().original, 5.);
        assert!(!graph.get_edge(1, 2).unwrap().is_reverse);
        assert!(!graph.get_edge(2, 1).unwrap().is_reverse);
    }

    #[test]
    fn anti_parallel_push_credits_the_declared_opposite() {
        let mut graph = ResidualGraph::new();
        graph.add_edge_with_reverse(1, 2, 10., 0.);
        graph.add_edge_with_reverse(2, 1, 5., 0.);
        graph.add_edge_with_reverse(2, 3, 20., 0.);

        graph.update_flow(1, 2, 8.);
        graph.update_flow(2, 3, 8.);

        assert_eq!(graph.get_edge(1, 2).unwrap().residual, 2.);
        assert_eq!(graph.get_edge(2, 1).unwrap().residual, 13.);
        assert!(!graph.get_edge(1, 2).unwrap().is_reverse);
        assert!(!graph.get_edge(2, 1).unwrap().is_reverse);
        assert!(graph.check_invariants(DEFAULT_EPSILON));
    }

    #[test]
    fn push_synthesizes_missing_reverse_arc() {
        let mut graph = ResidualGraph::new();
        graph.add_edge(1, 2, 10., 4.);
        graph.update_flow(1, 2, 6.);

        let reverse = graph.get_edge(2, 1).unwrap();
        assert!(reverse.is_reverse);
        assert_eq!(reverse.residual, 6.);
        assert_eq!(reverse.original, 0.);
        assert_eq!(reverse.cost, -4.);
        assert!(graph.check_invariants(DEFAULT_EPSILON));
    }

    #[test]
    fn reset_restores_both_anti_parallel_originals() {
        let mut graph = ResidualGraph::new();
        graph.add_edge_with_reverse(1, 2, 10., 0.);
        graph.add_edge_with_reverse(2, 1, 5., 0.);
        graph.update_flow(1, 2, 8.);

        graph.reset();
        assert_eq!(graph.get_edge(1, 2).unwrap().residual, 10.);
        assert_eq!(graph.get_edge(2, 1).unwrap().residual, 5.);
        assert_eq!(graph.get_edge(1, 2).unwrap().flow, 0.);

        // reset is idempotent
        graph.reset();
        assert_eq!(graph.get_edge(1, 2).unwrap().residual, 10.);
        assert_eq!(graph.get_edge(2, 1).unwrap().residual, 5.);
    }

    #[test]
    fn clone_is_independent() {
        let mut graph = ResidualGraph::new();
        graph.add_edge_with_reverse(1, 2, 10., 0.);
        let clone = graph.clone();

        graph.update_flow(1, 2, 10.);
        assert_eq!(graph.get_edge(1, 2).unwrap().residual, 0.);
        assert_eq!(clone.get_edge(1, 2).unwrap().residual, 10.);
        assert_eq!(clone.get_edge(1, 2).unwrap().flow, 0.);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut graph = ResidualGraph::new();
        graph.add_edge(1, 5, 1., 0.);
        graph.add_edge(1, 2, 1., 0.);
        graph.add_edge(1, 9, 1., 0.);

        let order: Vec<NodeID> = graph.edges_from(1).iter().map(|e| e.to).collect();
        assert_eq!(order, vec![5, 2, 9]);
    }

    #[test]
    fn sorted_nodes_ascending_and_rebuilt_on_mutation() {
        let mut graph = ResidualGraph::new();
        graph.add_edge(7, 2, 1., 0.);
        assert_eq!(graph.sorted_nodes(), &[2, 7]);

        graph.add_node(-4);
        assert_eq!(graph.sorted_nodes(), &[-4, 2, 7]);
    }

    #[test]
    fn incoming_cache_tracks_synthesized_arcs() {
        let mut graph = ResidualGraph::new();
        graph.add_edge(1, 3, 4., 0.);
        graph.add_edge(2, 3, 4., 0.);
        assert_eq!(graph.incoming(3), &[1, 2]);
        assert_eq!(graph.incoming(1), &[] as &[NodeID]);

        // the push creates (3,1), which the cache must pick up
        graph.update_flow(1, 3, 2.);
        assert_eq!(graph.incoming(1), &[3]);
    }

    #[test]
    fn clear_empties_everything() {
        let mut graph = ResidualGraph::new();
        graph.add_edge_with_reverse(1, 2, 10., 0.);
        graph.clear();

        assert_eq!(graph.number_of_nodes(), 0);
        assert_eq!(graph.number_of_edges(), 0);
        assert!(graph.get_edge(1, 2).is_none());
        assert!(graph.sorted_nodes().is_empty());
    }

    #[test]
    fn neighbor_map_matches_the_ordered_list() {
        let mut graph = ResidualGraph::new();
        graph.add_edge(1, 5, 2., 0.);
        graph.add_edge(1, 2, 3., 0.);

        let mut by_target: Vec<(NodeID, f64)> = graph
            .neighbors(1)
            .map(|(to, edge)| (to, edge.residual))
            .collect();
        by_target.sort_by_key(|&(to, _)| to);
        assert_eq!(by_target, vec![(2, 3.), (5, 2.)]);
        assert!(graph.neighbors(9).next().is_none());
    }

    #[test]
    fn missing_arc_lookup() {
        let graph = ResidualGraph::new();
        assert!(graph.get_edge(1, 2).is_none());
        assert!(graph.edges_from(1).is_empty());
        assert_eq!(graph.out_degree(1), 0);
    }
}
