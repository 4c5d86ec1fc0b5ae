//! The unit of work handed to an execution engine.

use crate::emitter::{self, EmitError};
use crate::reducer::{self, ReduceError};
use crate::types::{Cell, GridConfig, OutputKey, ResultBlock, TaggedPayload};

/// A block multiplication job: the map and reduce functions bound to one grid.
///
/// Both stages are pure, so an engine may call them from any thread, in any
/// order, and re-run them after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiplyJob {
    grid: GridConfig,
}

impl MultiplyJob {
    pub fn new(grid: GridConfig) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    /// Map stage for one input cell.
    pub fn map(&self, cell: &Cell) -> Result<Vec<(OutputKey, TaggedPayload)>, EmitError> {
        emitter::emit(cell, &self.grid)
    }

    /// Reduce stage for one fully grouped key.
    pub fn reduce(
        &self,
        key: OutputKey,
        payloads: &[TaggedPayload],
    ) -> Result<ResultBlock, ReduceError> {
        reducer::reduce(key, payloads, &self.grid)
    }
}
