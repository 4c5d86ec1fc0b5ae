//! TOML configuration deserialisation for multiplication jobs.

use std::path::{Path, PathBuf};

use anyhow::Context;
use gridmul_core::generate::SyntheticSpec;
use gridmul_core::GridConfig;
use serde::Deserialize;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub matrix: MatrixConfig,
    pub input: InputSpec,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub bench: BenchConfig,
}

/// Matrix geometry from TOML.
#[derive(Debug, Deserialize)]
pub struct MatrixConfig {
    /// Matrix order N.
    pub order: usize,
    /// Blocks per dimension G. Chosen from `order` when omitted.
    #[serde(default)]
    pub grid_dim: Option<usize>,
}

/// Input source: either a record file or seeded synthetic data.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InputSpec {
    File {
        path: PathBuf,
    },
    Generated {
        #[serde(default = "default_density")]
        density: f64,
        #[serde(default)]
        seed: u64,
        #[serde(default)]
        mirror: bool,
    },
}

fn default_density() -> f64 {
    0.2
}

impl InputSpec {
    /// Synthetic parameters, if this input is generated.
    pub fn synthetic(&self) -> Option<SyntheticSpec> {
        match self {
            InputSpec::File { .. } => None,
            InputSpec::Generated {
                density,
                seed,
                mirror,
            } => Some(SyntheticSpec {
                density: *density,
                seed: *seed,
                mirror: *mirror,
            }),
        }
    }
}

/// Which execution engine to run the job on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Serial for tiny grids, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Serial,
}

/// Engine configuration.
#[derive(Debug, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub kind: EngineKind,
    /// Dedicated worker count for the CPU engine (default: Rayon's global pool).
    #[serde(default)]
    pub threads: Option<usize>,
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save dense blocks as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_blocks: bool,
    /// Whether to also save blocks as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
    /// Whether to save the non-zero result cells as CSV (default: false).
    #[serde(default)]
    pub save_cells: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_blocks: true,
            save_json: false,
            save_cells: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// Benchmark repetitions.
#[derive(Debug, Deserialize)]
pub struct BenchConfig {
    #[serde(default = "default_warmup")]
    pub warmup: usize,
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
    /// Matrix orders to sweep, each on its default grid. Empty benchmarks
    /// the `[matrix]` geometry only.
    #[serde(default)]
    pub orders: Vec<usize>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            warmup: default_warmup(),
            repetitions: default_repetitions(),
            orders: Vec::new(),
        }
    }
}

fn default_warmup() -> usize {
    2
}
fn default_repetitions() -> usize {
    5
}

impl JobConfig {
    /// Resolve the grid geometry, picking a grid dimension if none is set.
    pub fn grid(&self) -> anyhow::Result<GridConfig> {
        let order = self.matrix.order;
        let grid_dim = self
            .matrix
            .grid_dim
            .unwrap_or_else(|| default_grid_dim(order));
        GridConfig::new(order, grid_dim)
            .with_context(|| format!("Invalid grid: order={order}, grid_dim={grid_dim}"))
    }
}

/// Pick a grid dimension for an `order x order` matrix.
///
/// Aims for blocks of about 100 rows with at least a 2x2 grid, then lowers
/// the result to the nearest divisor of `order`.
pub fn default_grid_dim(order: usize) -> usize {
    if order == 0 {
        return 1;
    }
    let mut g = (order / 100).max(2).min(order);
    while order % g != 0 {
        g -= 1;
    }
    g
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: JobConfig = toml::from_str(&content)?;
    Ok(config)
}
