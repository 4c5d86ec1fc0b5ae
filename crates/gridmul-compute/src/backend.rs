//! Execution engine trait and job-level errors.
//!
//! The [`ExecutionEngine`] trait abstracts over the substrate that runs the
//! map, shuffle and reduce phases of a [`MultiplyJob`] so that the driver stays
//! independent of where the work actually happens (calling thread, thread
//! pool, or a future multi-process pool).

use gridmul_core::reducer::ReduceError;
use gridmul_core::{Cell, MultiplyJob, OutputKey, ResultBlock};
use thiserror::Error;

/// Errors originating from execution engines.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine not available: {0}")]
    Unavailable(String),

    #[error("{} key reduction(s) failed, first: {}", failures.len(), first_failure(failures))]
    ReductionFailed { failures: Vec<ReduceError> },
}

fn first_failure(failures: &[ReduceError]) -> String {
    failures
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".into())
}

impl EngineError {
    /// Keys whose reductions failed.
    pub fn failed_keys(&self) -> Vec<OutputKey> {
        match self {
            EngineError::Unavailable(_) => Vec::new(),
            EngineError::ReductionFailed { failures } => failures.iter().map(|e| e.key()).collect(),
        }
    }
}

/// Describes an execution engine.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub name: String,
    pub engine_type: EngineType,
    pub workers: usize,
}

/// The kind of execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineType {
    Serial,
    Cpu,
}

/// Everything a completed job produced.
#[derive(Debug, Clone)]
pub struct JobOutput {
    /// One dense block per output key, sorted by key.
    pub blocks: Vec<ResultBlock>,
    /// Cells the map stage refused to route (out of range or non-finite).
    pub rejected_cells: usize,
}

/// Abstraction over execution engines.
///
/// An engine must:
/// - apply [`MultiplyJob::map`] to every input cell, counting (not failing on)
///   cells the map stage rejects;
/// - group payloads by key and finish the whole map phase before any
///   reduction starts;
/// - call [`MultiplyJob::reduce`] exactly once per key of the grid, including
///   keys that received no payloads;
/// - fail the whole job if any reduction fails, reporting every failing key.
pub trait ExecutionEngine: Send + Sync {
    /// Return information about the engine.
    fn info(&self) -> EngineInfo;

    /// Run `job` over `input` and block until every key is reduced.
    fn submit(&self, job: &MultiplyJob, input: &[Cell]) -> Result<JobOutput, EngineError>;
}

/// Split reduction outcomes into sorted blocks or a job failure.
pub(crate) fn collect_results(
    outcomes: Vec<Result<ResultBlock, ReduceError>>,
) -> Result<Vec<ResultBlock>, EngineError> {
    let mut blocks = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(block) => blocks.push(block),
            Err(e) => failures.push(e),
        }
    }

    if !failures.is_empty() {
        failures.sort_by_key(ReduceError::key);
        return Err(EngineError::ReductionFailed { failures });
    }
    blocks.sort_by_key(|b| b.key);
    Ok(blocks)
}
