//! CPU engine using Rayon for shared-memory parallelism.
//!
//! The map phase folds cells into per-worker [`KeyGroups`] which are then
//! merged; `collect`-ing the merged grouping is the barrier between the two
//! phases. Each key is then reduced as an independent Rayon task that owns
//! its payloads and dense working blocks.

use rayon::prelude::*;

use gridmul_core::{Cell, MultiplyJob};

use crate::backend::{collect_results, EngineError, EngineInfo, EngineType, ExecutionEngine, JobOutput};
use crate::shuffle::KeyGroups;

/// CPU engine that parallelises both phases across threads via Rayon.
pub struct CpuEngine {
    num_threads: usize,
    pool: Option<rayon::ThreadPool>,
}

impl CpuEngine {
    /// Create a CPU engine on Rayon's global pool.
    pub fn new() -> Self {
        Self {
            num_threads: rayon::current_num_threads(),
            pool: None,
        }
    }

    /// Create a CPU engine with a dedicated pool of `num_threads` threads.
    pub fn with_threads(num_threads: usize) -> Result<Self, EngineError> {
        if num_threads == 0 {
            return Err(EngineError::Unavailable(
                "CPU engine needs at least one thread".into(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("gridmul-worker-{i}"))
            .build()
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        Ok(Self {
            num_threads,
            pool: Some(pool),
        })
    }

    fn run(&self, job: &MultiplyJob, input: &[Cell]) -> Result<JobOutput, EngineError> {
        let mapped = input
            .par_iter()
            .fold(KeyGroups::default, |mut groups, cell| {
                groups.map_cell(job, cell);
                groups
            })
            .reduce(KeyGroups::default, KeyGroups::merge);
        let groups = KeyGroups::seeded(job.grid()).merge(mapped);
        let rejected_cells = groups.rejected();
        log::debug!(
            "CPU map phase: {} cells -> {} payloads over {} keys ({} rejected)",
            input.len(),
            groups.payload_count(),
            groups.key_count(),
            rejected_cells
        );

        let outcomes = groups
            .into_groups()
            .into_par_iter()
            .map(|(key, payloads)| job.reduce(key, &payloads))
            .collect();

        let blocks = collect_results(outcomes)?;
        Ok(JobOutput {
            blocks,
            rejected_cells,
        })
    }
}

impl Default for CpuEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionEngine for CpuEngine {
    fn info(&self) -> EngineInfo {
        EngineInfo {
            name: format!("CPU ({} threads)", self.num_threads),
            engine_type: EngineType::Cpu,
            workers: self.num_threads,
        }
    }

    fn submit(&self, job: &MultiplyJob, input: &[Cell]) -> Result<JobOutput, EngineError> {
        match &self.pool {
            Some(pool) => pool.install(|| self.run(job, input)),
            None => self.run(job, input),
        }
    }
}
