//! Serial engine: every phase on the calling thread.
//!
//! Deterministic and dependency-free; used as the reference the parallel
//! engines are compared against, and for small inputs where thread start-up
//! would dominate.

use gridmul_core::{Cell, MultiplyJob};

use crate::backend::{collect_results, EngineError, EngineInfo, EngineType, ExecutionEngine, JobOutput};
use crate::shuffle::KeyGroups;

/// Engine that maps, groups and reduces sequentially.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialEngine;

impl SerialEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionEngine for SerialEngine {
    fn info(&self) -> EngineInfo {
        EngineInfo {
            name: "Serial".into(),
            engine_type: EngineType::Serial,
            workers: 1,
        }
    }

    fn submit(&self, job: &MultiplyJob, input: &[Cell]) -> Result<JobOutput, EngineError> {
        let mut groups = KeyGroups::seeded(job.grid());
        for cell in input {
            groups.map_cell(job, cell);
        }
        let rejected_cells = groups.rejected();
        log::debug!(
            "Serial map phase: {} cells -> {} payloads over {} keys ({} rejected)",
            input.len(),
            groups.payload_count(),
            groups.key_count(),
            rejected_cells
        );

        let outcomes = groups
            .into_groups()
            .into_iter()
            .map(|(key, payloads)| job.reduce(key, &payloads))
            .collect();

        let blocks = collect_results(outcomes)?;
        Ok(JobOutput {
            blocks,
            rejected_cells,
        })
    }
}
