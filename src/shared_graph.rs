//! Read/write-lock facade around one residual graph, for the rare
//! case of concurrent analytics against a stable snapshot. Solver runs
//! themselves stay single-threaded on graphs they own exclusively;
//! this wrapper only serializes access when several readers share one
//! solved graph.

use crate::residual_graph::ResidualGraph;
use crate::solver::SolverError;
use std::sync::RwLock;

pub struct SharedResidualGraph {
    inner: RwLock<ResidualGraph>,
}

impl SharedResidualGraph {
    pub fn new(graph: ResidualGraph) -> Self {
        Self {
            inner: RwLock::new(graph),
        }
    }

    /// Runs `reader` under the shared lock. A poisoned lock means a
    /// writer panicked mid-mutation; the graph must be treated as
    /// poisoned too and discarded.
    pub fn read<T>(&self, reader: impl FnOnce(&ResidualGraph) -> T) -> Result<T, SolverError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| SolverError::Internal("residual graph lock poisoned".to_string()))?;
        Ok(reader(&guard))
    }

    /// Runs `writer` under the exclusive lock.
    pub fn write<T>(&self, writer: impl FnOnce(&mut ResidualGraph) -> T) -> Result<T, SolverError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| SolverError::Internal("residual graph lock poisoned".to_string()))?;
        Ok(writer(&mut guard))
    }

    pub fn into_inner(self) -> Result<ResidualGraph, SolverError> {
        self.inner
            .into_inner()
            .map_err(|_| SolverError::Internal("residual graph lock poisoned".to_string()))
    }
}
