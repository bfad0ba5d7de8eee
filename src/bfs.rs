//! Breadth-first traversals over the residual graph: the s-t search
//! behind Edmonds-Karp, the level labeling behind Dinic, the reverse
//! search behind Push-Relabel's global relabel, and the reachability
//! and component queries behind the statistics layer. Arcs at or below
//! the epsilon residual are invisible to every traversal here.

use crate::numerics::{NodeID, PARENT_SENTINEL, approx_positive};
use crate::residual_graph::ResidualGraph;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use std::time::Instant;

/// Bound on `all_shortest_paths` enumeration when the caller passes 0.
pub const DEFAULT_MAX_PATHS: usize = 100;

/// FIFO queue over a plain vector with a head cursor. Popping moves
/// the cursor instead of shifting elements, and `clear` rewinds it, so
/// a reused queue settles at its high-water allocation.
#[derive(Debug, Default)]
pub struct CursorQueue {
    items: Vec<NodeID>,
    head: usize,
}

impl CursorQueue {
    pub fn clear(&mut self) {
        self.items.clear();
        self.head = 0;
    }

    pub fn push(&mut self, node: NodeID) {
        self.items.push(node);
    }

    pub fn pop(&mut self) -> Option<NodeID> {
        let node = self.items.get(self.head).copied();
        if node.is_some() {
            self.head += 1;
        }
        node
    }

    pub fn is_empty(&self) -> bool {
        self.head >= self.items.len()
    }
}

/// Output of an s-t search. The source's parent is the `-1` sentinel.
#[derive(Debug, Default)]
pub struct BfsResult {
    pub found: bool,
    pub parents: FxHashMap<NodeID, NodeID>,
    pub visited: FxHashSet<NodeID>,
}

/// Reusable searcher; consecutive runs reuse the queue allocation.
#[derive(Debug, Default)]
pub struct Bfs {
    queue: CursorQueue,
}

impl Bfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward BFS along arcs with residual above epsilon, terminating
    /// early when the sink is discovered.
    pub fn run(
        &mut self,
        graph: &ResidualGraph,
        source: NodeID,
        sink: NodeID,
        eps: f64,
    ) -> BfsResult {
        let start = Instant::now();
        let mut result = BfsResult::default();
        if !graph.contains_node(source) {
            return result;
        }
        self.queue.clear();
        self.queue.push(source);
        result.parents.insert(source, PARENT_SENTINEL);
        result.visited.insert(source);

        while let Some(node) = self.queue.pop() {
            for edge in graph.edges_from(node) {
                if !approx_positive(edge.residual, eps) || result.visited.contains(&edge.to) {
                    continue;
                }
                result.visited.insert(edge.to);
                result.parents.insert(edge.to, node);
                if edge.to == sink {
                    result.found = true;
                    debug!("BFS reached sink after {:?}", start.elapsed());
                    return result;
                }
                self.queue.push(edge.to);
            }
        }
        debug!("BFS exhausted after {:?} (sink unreached)", start.elapsed());
        result
    }

    /// BFS distance of every node reachable from `source`; unreachable
    /// nodes are absent from the map, not infinite.
    pub fn levels(
        &mut self,
        graph: &ResidualGraph,
        source: NodeID,
        eps: f64,
    ) -> FxHashMap<NodeID, usize> {
        let mut levels = FxHashMap::default();
        if !graph.contains_node(source) {
            return levels;
        }
        self.queue.clear();
        self.queue.push(source);
        levels.insert(source, 0);

        while let Some(node) = self.queue.pop() {
            let depth = levels[&node];
            for edge in graph.edges_from(node) {
                if approx_positive(edge.residual, eps) && !levels.contains_key(&edge.to) {
                    levels.insert(edge.to, depth + 1);
                    self.queue.push(edge.to);
                }
            }
        }
        levels
    }

    /// BFS over incoming arcs whose residual is above epsilon,
    /// starting at the sink. Push-Relabel's global relabel reads these
    /// distances as exact height labels.
    pub fn reverse_levels(
        &mut self,
        graph: &mut ResidualGraph,
        sink: NodeID,
        eps: f64,
    ) -> FxHashMap<NodeID, usize> {
        let start = Instant::now();
        let mut levels = FxHashMap::default();
        if !graph.contains_node(sink) {
            return levels;
        }
        self.queue.clear();
        self.queue.push(sink);
        levels.insert(sink, 0);

        while let Some(node) = self.queue.pop() {
            let depth = levels[&node];
            let predecessors: Vec<NodeID> = graph.incoming(node).to_vec();
            for from in predecessors {
                if levels.contains_key(&from) {
                    continue;
                }
                let admissible = graph
                    .get_edge(from, node)
                    .is_some_and(|edge| approx_positive(edge.residual, eps));
                if admissible {
                    levels.insert(from, depth + 1);
                    self.queue.push(from);
                }
            }
        }
        debug!(
            "reverse BFS labeled {} nodes in {:?}",
            levels.len(),
            start.elapsed()
        );
        levels
    }

    /// Calls `visit(node, depth)` for every node discovered from
    /// `source`; returning false stops the traversal. The number of
    /// visited nodes is returned.
    pub fn run_with_callback<F>(
        &mut self,
        graph: &ResidualGraph,
        source: NodeID,
        eps: f64,
        mut visit: F,
    ) -> usize
    where
        F: FnMut(NodeID, usize) -> bool,
    {
        if !graph.contains_node(source) {
            return 0;
        }
        let mut depths = FxHashMap::default();
        self.queue.clear();
        self.queue.push(source);
        depths.insert(source, 0usize);
        let mut visited = 0;

        while let Some(node) = self.queue.pop() {
            let depth = depths[&node];
            visited += 1;
            if !visit(node, depth) {
                break;
            }
            for edge in graph.edges_from(node) {
                if approx_positive(edge.residual, eps) && !depths.contains_key(&edge.to) {
                    depths.insert(edge.to, depth + 1);
                    self.queue.push(edge.to);
                }
            }
        }
        visited
    }

    /// Directed reachability along residual arcs.
    pub fn reachable(
        &mut self,
        graph: &ResidualGraph,
        source: NodeID,
        eps: f64,
    ) -> FxHashSet<NodeID> {
        let mut reached = FxHashSet::default();
        self.run_with_callback(graph, source, eps, |node, _| {
            reached.insert(node);
            true
        });
        reached
    }

    /// Undirected components: any stored arc connects both endpoints
    /// regardless of residual capacity. Components and their members
    /// come out in ascending id order.
    pub fn connected_components(&mut self, graph: &mut ResidualGraph) -> Vec<Vec<NodeID>> {
        let nodes = graph.sorted_nodes().to_vec();
        let mut assigned: FxHashSet<NodeID> = FxHashSet::default();
        let mut components = Vec::new();

        for seed in nodes {
            if assigned.contains(&seed) {
                continue;
            }
            let mut component = Vec::new();
            self.queue.clear();
            self.queue.push(seed);
            assigned.insert(seed);
            while let Some(node) = self.queue.pop() {
                component.push(node);
                let mut neighbors: Vec<NodeID> =
                    graph.edges_from(node).iter().map(|edge| edge.to).collect();
                neighbors.extend_from_slice(graph.incoming(node));
                for next in neighbors {
                    if assigned.insert(next) {
                        self.queue.push(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// Enumerates up to `max_paths` shortest s-t paths by DFS inside
    /// the level graph; 0 requests the default bound. Never unbounded.
    pub fn all_shortest_paths(
        &mut self,
        graph: &ResidualGraph,
        source: NodeID,
        sink: NodeID,
        max_paths: usize,
        eps: f64,
    ) -> Vec<Vec<NodeID>> {
        let bound = if max_paths == 0 {
            DEFAULT_MAX_PATHS
        } else {
            max_paths
        };
        let levels = self.levels(graph, source, eps);
        let mut paths = Vec::new();
        if !levels.contains_key(&sink) {
            return paths;
        }
        let mut trail = vec![source];
        collect_level_paths(graph, &levels, sink, eps, bound, &mut trail, &mut paths);
        paths
    }
}

fn collect_level_paths(
    graph: &ResidualGraph,
    levels: &FxHashMap<NodeID, usize>,
    sink: NodeID,
    eps: f64,
    bound: usize,
    trail: &mut Vec<NodeID>,
    paths: &mut Vec<Vec<NodeID>>,
) {
    if paths.len() >= bound {
        return;
    }
    let node = *trail.last().unwrap();
    if node == sink {
        paths.push(trail.clone());
        return;
    }
    let depth = levels[&node];
    for edge in graph.edges_from(node) {
        if !approx_positive(edge.residual, eps) {
            continue;
        }
        if levels.get(&edge.to) != Some(&(depth + 1)) {
            continue;
        }
        trail.push(edge.to);
        collect_level_paths(graph, levels, sink, eps, bound, trail, paths);
        trail.pop();
        if paths.len() >= bound {
            return;
        }
    }
}
