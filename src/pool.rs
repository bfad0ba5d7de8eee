//! Process-wide object pool. Residual graphs and per-run scratch
//! structures are recycled through per-kind free-lists so steady-state
//! solving does not re-grow hash tables on every request. A no-pool
//! build (allocate per call) behaves identically; the pool only trades
//! allocations.

use crate::numerics::NodeID;
use crate::residual_graph::ResidualGraph;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::{Mutex, OnceLock};

static GLOBAL: OnceLock<Pool> = OnceLock::new();

/// The lazily initialized process-wide instance. Teardown is implicit
/// at process exit.
pub fn global() -> &'static Pool {
    GLOBAL.get_or_init(Pool::default)
}

#[derive(Default)]
pub struct Pool {
    graphs: Mutex<Vec<ResidualGraph>>,
    node_maps: Mutex<Vec<FxHashMap<NodeID, f64>>>,
    node_sets: Mutex<Vec<FxHashSet<NodeID>>>,
    node_lists: Mutex<Vec<Vec<NodeID>>>,
}

impl Pool {
    /// Hands out an empty residual graph, reusing a recycled one when
    /// available.
    pub fn acquire_graph(&self) -> ResidualGraph {
        self.graphs
            .lock()
            .map(|mut list| list.pop())
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// Returns a graph to the free-list. The graph is cleared here, so
    /// callers hand back whatever state they ended with.
    pub fn release_graph(&self, mut graph: ResidualGraph) {
        graph.clear();
        if let Ok(mut list) = self.graphs.lock() {
            list.push(graph);
        }
    }

    /// Acquires the scratch bundle for one solver run. Everything in
    /// it returns to the pool collectively when the scope is released
    /// or dropped.
    pub fn scratch(&self) -> Scratch<'_> {
        let take_map = || self.node_maps.lock().map(|mut l| l.pop()).ok().flatten();
        let take_set = || self.node_sets.lock().map(|mut l| l.pop()).ok().flatten();
        let take_list = || self.node_lists.lock().map(|mut l| l.pop()).ok().flatten();
        Scratch {
            pool: self,
            flow: take_map().unwrap_or_default(),
            distance: take_map().unwrap_or_default(),
            visited: take_set().unwrap_or_default(),
            order: take_list().unwrap_or_default(),
            released: false,
        }
    }
}

/// A pooled-resources scope: id-keyed maps, a visited set and an id
/// list, cleared on acquisition and given back as one unit.
pub struct Scratch<'a> {
    pool: &'a Pool,
    pub flow: FxHashMap<NodeID, f64>,
    pub distance: FxHashMap<NodeID, f64>,
    pub visited: FxHashSet<NodeID>,
    pub order: Vec<NodeID>,
    released: bool,
}

impl Scratch<'_> {
    /// Releases everything back to the pool. Calling twice is a no-op.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for mut map in [
            std::mem::take(&mut self.flow),
            std::mem::take(&mut self.distance),
        ] {
            map.clear();
            if let Ok(mut list) = self.pool.node_maps.lock() {
                list.push(map);
            }
        }
        let mut visited = std::mem::take(&mut self.visited);
        visited.clear();
        if let Ok(mut list) = self.pool.node_sets.lock() {
            list.push(visited);
        }
        let mut order = std::mem::take(&mut self.order);
        order.clear();
        if let Ok(mut list) = self.pool.node_lists.lock() {
            list.push(order);
        }
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
