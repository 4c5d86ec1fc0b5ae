//! Job runner: ties together input loading, the execution engine and output.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use gridmul_compute::{CpuEngine, ExecutionEngine, SerialEngine};
use gridmul_core::assembly::check_complete;
use gridmul_core::generate::generate_cells;
use gridmul_core::records::{format_block, format_record, parse_records};
use gridmul_core::{Cell, GridConfig, MultiplyJob, ResultBlock};

use crate::config::{default_grid_dim, EngineConfig, EngineKind, InputSpec, JobConfig};

/// Grids at or below this many keys run on the serial engine under `auto`.
const AUTO_SERIAL_MAX_KEYS: usize = 4;

/// Input cells plus the number of records rejected while parsing them.
pub struct LoadedInput {
    pub cells: Vec<Cell>,
    pub rejected_records: usize,
}

/// Results from a job run.
pub struct RunOutput {
    pub grid: GridConfig,
    pub blocks: Vec<ResultBlock>,
    /// Records rejected by the parser plus cells rejected by the map stage.
    pub rejected: usize,
    pub elapsed: Duration,
}

/// Load the input cells described by the job.
pub fn load_input(job: &JobConfig, grid: &GridConfig) -> Result<LoadedInput> {
    match &job.input {
        InputSpec::File { path } => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input {}", path.display()))?;
            let batch = parse_records(&content);
            for err in batch.rejected.iter().take(10) {
                log::warn!("Rejected record: {}", err);
            }
            if batch.rejected.len() > 10 {
                log::warn!("... and {} more rejected records", batch.rejected.len() - 10);
            }
            Ok(LoadedInput {
                cells: batch.cells,
                rejected_records: batch.rejected.len(),
            })
        }
        InputSpec::Generated { .. } => {
            let spec = job
                .input
                .synthetic()
                .context("Generated input without synthetic parameters")?;
            let cells = generate_cells(grid, &spec)?;
            Ok(LoadedInput {
                cells,
                rejected_records: 0,
            })
        }
    }
}

/// Create an execution engine from the engine configuration.
///
/// - `serial` - always run on the calling thread.
/// - `cpu` - Rayon engine, with a dedicated pool when `threads` is set.
/// - `auto` (default) - serial for tiny grids, CPU otherwise.
pub fn create_engine(config: &EngineConfig, grid: &GridConfig) -> Result<Arc<dyn ExecutionEngine>> {
    let kind = match config.kind {
        EngineKind::Auto if grid.key_count() <= AUTO_SERIAL_MAX_KEYS => EngineKind::Serial,
        EngineKind::Auto => EngineKind::Cpu,
        other => other,
    };

    let engine: Arc<dyn ExecutionEngine> = match (kind, config.threads) {
        (EngineKind::Serial, _) => Arc::new(SerialEngine::new()),
        (_, Some(threads)) => Arc::new(CpuEngine::with_threads(threads)?),
        (_, None) => Arc::new(CpuEngine::new()),
    };
    log::info!("Engine: {}", engine.info().name);
    Ok(engine)
}

/// Run one job: load input, submit it to the engine and check the result set.
pub fn run_job(job: &JobConfig) -> Result<RunOutput> {
    let grid = job.grid()?;
    let input = load_input(job, &grid)?;
    let engine = create_engine(&job.engine, &grid)?;
    execute(&grid, &input, engine.as_ref())
}

/// Submit already-loaded input to an engine.
pub fn execute(
    grid: &GridConfig,
    input: &LoadedInput,
    engine: &dyn ExecutionEngine,
) -> Result<RunOutput> {
    let job = MultiplyJob::new(*grid);
    log::debug!(
        "Submitting {} cells: order={}, grid={}x{}, block_size={}",
        input.cells.len(),
        grid.order(),
        grid.grid_dim(),
        grid.grid_dim(),
        grid.block_size()
    );

    let start = Instant::now();
    let output = engine.submit(&job, &input.cells).with_context(|| {
        format!(
            "Job failed on {} ({} records rejected before submission)",
            engine.info().name,
            input.rejected_records
        )
    })?;
    let elapsed = start.elapsed();

    check_complete(grid, &output.blocks).context("Engine returned an incomplete result set")?;

    let rejected = input.rejected_records + output.rejected_cells;
    if rejected > 0 {
        log::warn!(
            "{} malformed records excluded ({} unparseable, {} out of range)",
            rejected,
            input.rejected_records,
            output.rejected_cells
        );
    }
    let checksum: f64 = output.blocks.iter().map(ResultBlock::sum).sum();
    log::info!("Completed {} blocks in {:?}, checksum {:.6e}", output.blocks.len(), elapsed, checksum);

    Ok(RunOutput {
        grid: *grid,
        blocks: output.blocks,
        rejected,
        elapsed,
    })
}

/// Timing summary for one matrix order from [`run_bench`].
pub struct BenchReport {
    pub grid: GridConfig,
    pub runs: Vec<Duration>,
    pub mean: Duration,
}

/// Benchmark the job, or sweep `[bench] orders` when that list is set.
///
/// A sweep picks each order's grid with [`default_grid_dim`] and needs
/// generated input, since a record file fixes a single order.
pub fn run_bench(job: &JobConfig) -> Result<Vec<BenchReport>> {
    if job.bench.orders.is_empty() {
        let grid = job.grid()?;
        return Ok(vec![bench_grid(job, grid)?]);
    }
    if let InputSpec::File { path } = &job.input {
        bail!(
            "An order sweep needs generated input, not the record file {}",
            path.display()
        );
    }

    let mut reports = Vec::with_capacity(job.bench.orders.len());
    for &order in &job.bench.orders {
        let grid_dim = default_grid_dim(order);
        let grid = GridConfig::new(order, grid_dim)
            .with_context(|| format!("Invalid bench grid: order={order}, grid_dim={grid_dim}"))?;
        println!(
            "Order {} ({}x{} grid, block size {})",
            order,
            grid_dim,
            grid_dim,
            grid.block_size()
        );
        reports.push(bench_grid(job, grid)?);
    }
    Ok(reports)
}

/// Run one grid `warmup + repetitions` times, timing only the measured runs.
///
/// Input is loaded once and reused for every repetition.
fn bench_grid(job: &JobConfig, grid: GridConfig) -> Result<BenchReport> {
    let input = load_input(job, &grid)?;
    let engine = create_engine(&job.engine, &grid)?;
    let warmup = job.bench.warmup;
    let repetitions = job.bench.repetitions.max(1);

    let mut runs = Vec::with_capacity(repetitions);
    for rep in 1..=warmup + repetitions {
        let out = execute(&grid, &input, engine.as_ref())?;
        if rep <= warmup {
            println!("  Warmup run {}/{}: {:.2} ms", rep, warmup, millis(out.elapsed));
        } else {
            println!(
                "  Measured run {}/{}: {:.2} ms",
                rep - warmup,
                repetitions,
                millis(out.elapsed)
            );
            runs.push(out.elapsed);
        }
    }

    let total: Duration = runs.iter().sum();
    let mean = total / runs.len() as u32;
    Ok(BenchReport { grid, runs, mean })
}

pub fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1e3
}

/// Write one line per block (`block_row,block_col,v0,...`) in row-major key order.
///
/// The file opens with `#` comment lines carrying run metadata; every other
/// line is a block record.
pub fn write_blocks_csv(output: &RunOutput, path: &Path) -> Result<()> {
    let mut file = create_output(path)?;

    writeln!(file, "# gridmul block product")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        file,
        "# order: {}, grid_dim: {}, block_size: {}",
        output.grid.order(),
        output.grid.grid_dim(),
        output.grid.block_size()
    )?;
    writeln!(file, "# rejected_records: {}", output.rejected)?;
    writeln!(file, "#")?;

    for block in &output.blocks {
        writeln!(file, "{}", format_block(block))?;
    }
    finish_output(file, path)?;

    println!("Blocks written to: {}", path.display());
    Ok(())
}

/// Write the blocks as a JSON array.
pub fn write_blocks_json(blocks: &[ResultBlock], path: &Path) -> Result<()> {
    let mut file = create_output(path)?;
    serde_json::to_writer_pretty(&mut file, blocks)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    finish_output(file, path)?;

    println!("Blocks (JSON) written to: {}", path.display());
    Ok(())
}

/// Write the non-zero result cells as `block_row,block_col,inner_row,inner_col,value`.
pub fn write_result_cells_csv(blocks: &[ResultBlock], path: &Path) -> Result<()> {
    let mut file = create_output(path)?;
    writeln!(file, "block_row,block_col,inner_row,inner_col,value")?;
    for block in blocks {
        for (r, c, v) in block.nonzeros() {
            writeln!(file, "{},{},{},{},{}", block.key.row, block.key.col, r, c, v)?;
        }
    }
    finish_output(file, path)?;

    println!("Result cells written to: {}", path.display());
    Ok(())
}

/// Write input cells as records, one per line.
pub fn write_records(cells: &[Cell], path: &Path) -> Result<()> {
    let mut file = create_output(path)?;
    for cell in cells {
        writeln!(file, "{}", format_record(cell))?;
    }
    finish_output(file, path)
}

fn create_output(path: &Path) -> Result<std::io::BufWriter<std::fs::File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(std::io::BufWriter::new(file))
}

/// Flush buffered output, surfacing any deferred write error.
fn finish_output(mut file: std::io::BufWriter<std::fs::File>, path: &Path) -> Result<()> {
    file.flush()
        .with_context(|| format!("Failed to write {}", path.display()))
}
