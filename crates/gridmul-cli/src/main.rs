//! gridmul command-line interface.
//!
//! Run block-partitioned matrix products from TOML configuration files:
//! ```sh
//! gridmul-cli run job.toml
//! gridmul-cli validate job.toml
//! gridmul-cli generate --order 400 --density 0.1 -o cells.csv
//! gridmul-cli bench job.toml
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use gridmul_core::generate::{generate_cells, SyntheticSpec};
use gridmul_core::GridConfig;

#[derive(Parser)]
#[command(name = "gridmul-cli")]
#[command(about = "gridmul: block-partitioned matrix multiplication")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a multiplication job from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running the job.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// Write a synthetic A/B record file.
    Generate {
        /// Matrix order N.
        #[arg(long)]
        order: usize,
        /// Blocks per dimension (chosen from the order when omitted).
        #[arg(long)]
        grid_dim: Option<usize>,
        /// Probability that a cell is non-zero.
        #[arg(long, default_value_t = 0.2)]
        density: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Emit B as an exact copy of A.
        #[arg(long)]
        mirror: bool,
        /// Output record file.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Time repeated runs of a job, optionally sweeping `[bench] orders`.
    Bench {
        /// Path to the job configuration file.
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("gridmul block multiplier");
            println!("========================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_job(&job)?;
            println!(
                "Reduced {} blocks ({}x{} grid, block size {}) in {:.2} ms",
                result.blocks.len(),
                result.grid.grid_dim(),
                result.grid.grid_dim(),
                result.grid.block_size(),
                runner::millis(result.elapsed)
            );
            if result.rejected > 0 {
                println!("Malformed records excluded: {}", result.rejected);
            }

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            if job.output.save_blocks {
                runner::write_blocks_csv(&result, &out_dir.join("blocks.csv"))?;
            }
            if job.output.save_json {
                runner::write_blocks_json(&result.blocks, &out_dir.join("blocks.json"))?;
            }
            if job.output.save_cells {
                runner::write_result_cells_csv(&result.blocks, &out_dir.join("cells.csv"))?;
            }

            println!("Job complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let grid = job.grid()?;
            if let config::InputSpec::File { path } = &job.input {
                if !path.exists() {
                    anyhow::bail!("Input file not found: {}", path.display());
                }
            }
            println!("Configuration is valid: {}", config.display());
            println!(
                "  order {}, grid {}x{}, block size {}",
                grid.order(),
                grid.grid_dim(),
                grid.grid_dim(),
                grid.block_size()
            );
            Ok(())
        }
        Commands::Generate {
            order,
            grid_dim,
            density,
            seed,
            mirror,
            output,
        } => {
            let grid_dim = grid_dim.unwrap_or_else(|| config::default_grid_dim(order));
            let grid = GridConfig::new(order, grid_dim)?;
            let spec = SyntheticSpec {
                density,
                seed,
                mirror,
            };
            let cells = generate_cells(&grid, &spec)?;
            runner::write_records(&cells, &output)?;
            println!(
                "Wrote {} records ({}x{} grid, block size {}) to {}",
                cells.len(),
                grid.grid_dim(),
                grid.grid_dim(),
                grid.block_size(),
                output.display()
            );
            Ok(())
        }
        Commands::Bench { config } => {
            let job = config::load_config(&config)?;
            println!("Benchmark: {}", config.display());
            let reports = runner::run_bench(&job)?;
            println!();
            println!("{:>8} {:>6} {:>10} {:>12} {:>12}", "order", "grid", "block", "mean ms", "fastest ms");
            for report in &reports {
                let fastest = report.runs.iter().min().copied().unwrap_or_default();
                println!(
                    "{:>8} {:>6} {:>10} {:>12.2} {:>12.2}",
                    report.grid.order(),
                    report.grid.grid_dim(),
                    report.grid.block_size(),
                    runner::millis(report.mean),
                    runner::millis(fastest)
                );
            }
            Ok(())
        }
    }
}
